//! patron-sync library interface
//!
//! Fetches a campaign's active supporters, classifies them into
//! Notus / Zephyrus / Boreas by tenure and writes the CSV and JSON files the
//! static site reads.

pub mod classifier;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod writer;

pub use crate::classifier::{ClassifiedSupporter, Tier, TierCounts};
pub use crate::error::{FetchError, MalformedRecord, SyncError, SyncResult};
pub use crate::fetcher::PatreonClient;
pub use crate::models::Supporter;
pub use crate::pipeline::{run, SyncSummary};
pub use crate::writer::OutputWriter;
