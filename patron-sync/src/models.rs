//! Supporter record shared by the fetch, classify and write stages

use chrono::{DateTime, Utc};

/// One active supporter as returned by the membership API
///
/// Held in memory for the duration of a single run only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supporter {
    /// Platform member id (unique within a campaign)
    pub member_id: String,
    /// Name shown on the site
    pub displayed_name: String,
    /// Start of the current pledge relationship; `None` when the platform
    /// omitted it or sent something unparseable
    pub pledge_start: Option<DateTime<Utc>>,
    /// Last charge timestamp exactly as the platform reported it
    pub last_payment_timestamp: Option<String>,
}

impl Supporter {
    pub fn new(member_id: impl Into<String>, displayed_name: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            displayed_name: displayed_name.into(),
            pledge_start: None,
            last_payment_timestamp: None,
        }
    }

    /// Builder pattern: set pledge start
    pub fn with_pledge_start(mut self, pledge_start: DateTime<Utc>) -> Self {
        self.pledge_start = Some(pledge_start);
        self
    }

    /// Builder pattern: set last payment timestamp
    pub fn with_last_payment(mut self, timestamp: impl Into<String>) -> Self {
        self.last_payment_timestamp = Some(timestamp.into());
        self
    }
}
