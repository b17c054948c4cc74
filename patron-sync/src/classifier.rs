//! Tenure-based tier classification
//!
//! Tier is a pure function of pledge start and the run's `now`; nothing is
//! stored between runs, so a supporter moves up a tier on the first run
//! after crossing a threshold.

use crate::models::Supporter;
use chrono::{DateTime, Utc};
use patron_common::time::whole_months_between;
use serde::Serialize;
use std::fmt;

/// Tenure (months) at which a supporter becomes Zephyrus
pub const ZEPHYRUS_MIN_MONTHS: u32 = 6;
/// Tenure (months) at which a supporter becomes Boreas
pub const BOREAS_MIN_MONTHS: u32 = 12;

/// Supporter tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    /// Under six months
    Notus,
    /// Six to eleven months
    Zephyrus,
    /// Twelve months or more
    Boreas,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Notus, Tier::Zephyrus, Tier::Boreas];

    /// Map tenure to tier; lower bounds are inclusive
    pub fn from_tenure(months: u32) -> Self {
        if months >= BOREAS_MIN_MONTHS {
            Tier::Boreas
        } else if months >= ZEPHYRUS_MIN_MONTHS {
            Tier::Zephyrus
        } else {
            Tier::Notus
        }
    }

    /// Label written to patrons.json
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Notus => "NOTUS",
            Tier::Zephyrus => "ZEPHYRUS",
            Tier::Boreas => "BOREAS",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Supporter plus the tier computed for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSupporter {
    pub supporter: Supporter,
    pub tenure_months: u32,
    pub tier: Tier,
}

/// Whole months of tenure; a missing pledge start counts as zero
pub fn tenure_months(pledge_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    pledge_start
        .map(|start| whole_months_between(start, now))
        .unwrap_or(0)
}

/// Tier for one supporter at `now`
pub fn classify(supporter: &Supporter, now: DateTime<Utc>) -> Tier {
    Tier::from_tenure(tenure_months(supporter.pledge_start, now))
}

/// Classify every supporter, keeping fetch order
pub fn classify_all(supporters: Vec<Supporter>, now: DateTime<Utc>) -> Vec<ClassifiedSupporter> {
    supporters
        .into_iter()
        .map(|supporter| {
            let tenure_months = tenure_months(supporter.pledge_start, now);
            ClassifiedSupporter {
                tier: Tier::from_tenure(tenure_months),
                tenure_months,
                supporter,
            }
        })
        .collect()
}

/// Per-tier supporter counts for run reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub notus: usize,
    pub zephyrus: usize,
    pub boreas: usize,
}

impl TierCounts {
    pub fn from_classified(classified: &[ClassifiedSupporter]) -> Self {
        let mut counts = Self::default();
        for entry in classified {
            match entry.tier {
                Tier::Notus => counts.notus += 1,
                Tier::Zephyrus => counts.zephyrus += 1,
                Tier::Boreas => counts.boreas += 1,
            }
        }
        counts
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Notus => self.notus,
            Tier::Zephyrus => self.zephyrus,
            Tier::Boreas => self.boreas,
        }
    }

    pub fn total(&self) -> usize {
        self.notus + self.zephyrus + self.boreas
    }
}
