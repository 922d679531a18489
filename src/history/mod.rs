//! Access to the saved price history.
//!
//! The policies only see [`HistoryRepository`], so they run the same against
//! the CSV file and the in-memory store used in tests.

use anyhow::Result;
use chrono::NaiveDateTime;
use hashbrown::HashMap;

use crate::{
    declare::{FuelPrices, StationRecord},
    util::map::vec_to_hashmap,
};

pub mod csv;
#[cfg(test)]
pub mod memory;

pub trait HistoryRepository {
    /// Whether the store has been created.
    fn exists(&self) -> bool;

    /// Every saved row in file order.
    fn read_all(&self) -> Result<Vec<StationRecord>>;

    /// Appends rows, writing the header first when `with_header` is set.
    /// Returns the number of rows written.
    fn append(&mut self, rows: &[StationRecord], with_header: bool) -> Result<usize>;

    /// Timestamp of the most recent row, `None` when nothing is saved yet.
    fn max_timestamp(&self) -> Result<Option<NaiveDateTime>> {
        Ok(self.read_all()?.iter().map(|r| r.timestamp).max())
    }

    /// Last saved prices per station identifier.
    fn latest_by_key(&self) -> Result<HashMap<String, FuelPrices>> {
        Ok(latest_prices(self.read_all()?))
    }
}

/// Sorts by timestamp and keeps the last row of each station. Rows with the
/// same timestamp keep their file order, so the later one wins.
pub fn latest_prices(mut records: Vec<StationRecord>) -> HashMap<String, FuelPrices> {
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    vec_to_hashmap(records)
        .into_iter()
        .map(|(id, record)| (id, record.prices))
        .collect()
}
