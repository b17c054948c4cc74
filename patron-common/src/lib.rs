//! # Patron Sync Common Library
//!
//! Shared code for the patron sync pipeline:
//! - Error type used by configuration and output writing
//! - Configuration resolution (flags, environment, TOML, defaults)
//! - Time helpers for tenure calculation

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
