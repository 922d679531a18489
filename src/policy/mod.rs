//! Decides what a run writes to the history file.
//!
//! - `throttle`: saves the whole snapshot at most once per interval.
//! - `change`: saves only stations whose prices moved since their last row.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    declare::{Column, StationRecord},
    history::HistoryRepository,
};

pub mod change;
pub mod throttle;

#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Policy {
    /// 每小時最多儲存一次完整快照
    #[default]
    Throttle,
    /// 只儲存價格有變動的加油站
    Change,
}

impl Policy {
    /// Column layout of a history file created under this policy.
    pub fn columns(&self) -> Vec<Column> {
        match self {
            Policy::Throttle => Column::with_city(),
            Policy::Change => Column::without_city(),
        }
    }

    /// Whether a single failed location aborts the whole run.
    pub fn aborts_on_fetch_failure(&self) -> bool {
        matches!(self, Policy::Change)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Append `rows`; `with_header` is set only when the history file is new.
    Write {
        rows: Vec<StationRecord>,
        with_header: bool,
    },
    /// Nothing is written this run.
    Skip { minutes_since_last_save: f64 },
}

/// Runs the configured policy against the history and the new snapshot.
pub fn plan<H: HistoryRepository + ?Sized>(
    policy: Policy,
    history: &H,
    snapshot: Vec<StationRecord>,
    now: NaiveDateTime,
    save_interval_minutes: f64,
) -> Plan {
    match policy {
        Policy::Throttle => throttle::plan(history, snapshot, now, save_interval_minutes),
        Policy::Change => change::plan(history, snapshot),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_policy_from_str() {
        assert_eq!(Policy::from_str("throttle").unwrap(), Policy::Throttle);
        assert_eq!(Policy::from_str("Change").unwrap(), Policy::Change);
        assert!(Policy::from_str("hourly").is_err());
        assert_eq!(Policy::Change.to_string(), "change");
    }

    #[test]
    fn test_policy_columns() {
        assert!(Policy::Throttle.columns().contains(&Column::City));
        assert!(!Policy::Change.columns().contains(&Column::City));
        assert_eq!(Policy::Change.columns().last(), Some(&Column::Timestamp));
    }
}
