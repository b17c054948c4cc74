//! Test Helper Utilities
//!
//! Shared utilities for testing patron-sync

#![allow(dead_code)]

pub mod flaky_server;
pub mod mock_api;

pub use flaky_server::FlakyServer;
pub use mock_api::{MockApi, MockMember, PaginationStyle};

use chrono::{DateTime, TimeZone, Utc};
use patron_common::config::SyncConfig;
use std::path::Path;

/// Fixed "now" so tier boundaries don't drift between runs
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

/// Config pointing at the mock API and a scratch data dir
pub fn test_config(api: &MockApi, data_dir: &Path) -> SyncConfig {
    SyncConfig {
        access_token: "test-token".to_string(),
        campaign_id: "4242".to_string(),
        api_base_url: api.base_url().to_string(),
        data_dir: data_dir.to_path_buf(),
        page_size: 100,
        log_level: "debug".to_string(),
    }
}

/// `count` active members named `Patron NNN`, all with the same pledge start
pub fn numbered_members(count: usize, pledge_start: &str) -> Vec<MockMember> {
    (0..count)
        .map(|i| MockMember::active(&format!("mem-{:03}", i), &format!("Patron {:03}", i), pledge_start))
        .collect()
}
