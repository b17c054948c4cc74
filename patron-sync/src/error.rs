//! Error types for patron-sync
//!
//! Fetch-phase errors are fatal for the run and leave outputs untouched.
//! Per-record problems never surface here; the fetcher logs and contains them.

use thiserror::Error;

/// Membership API errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credential rejected (401/403)
    #[error("Authentication rejected by membership API (HTTP {0}); check the access token")]
    Auth(u16),

    /// HTTP 429; the run is abandoned and the next scheduled run tries again
    #[error("Rate limited by membership API")]
    RateLimited { retry_after: Option<String> },

    /// Connection failure or timeout, after the single retry
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// Any other non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// The API pointed back at a page already fetched
    #[error("Pagination loop: next page {0} was already fetched")]
    PaginationLoop(String),

    /// Page body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// HTTP client or request URL could not be built
    #[error("Client setup error: {0}")]
    Setup(String),
}

/// A single member that cannot be turned into a supporter
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("member has no id")]
    MissingId,
}

/// Pipeline error
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to write outputs: {0}")]
    Output(#[from] patron_common::Error),
}

/// Result type for pipeline runs
pub type SyncResult<T> = Result<T, SyncError>;
