use hashbrown::HashMap;

use crate::{
    declare::{FuelPrices, StationRecord},
    history::HistoryRepository,
    logging,
    policy::Plan,
};

/// Keeps the snapshot rows whose prices differ from the station's last saved
/// row, plus every station that has no saved row at all.
pub fn select_changed(
    snapshot: Vec<StationRecord>,
    latest: &HashMap<String, FuelPrices>,
) -> Vec<StationRecord> {
    snapshot
        .into_iter()
        .filter(|record| match latest.get(&record.id) {
            Some(last) => record.prices.changed_since(last),
            None => true,
        })
        .collect()
}

pub fn plan<H: HistoryRepository + ?Sized>(history: &H, snapshot: Vec<StationRecord>) -> Plan {
    if !history.exists() {
        logging::info_console(format!(
            "No history file found. Writing all {} stations.",
            snapshot.len()
        ));
        return Plan::Write {
            rows: snapshot,
            with_header: true,
        };
    }

    match history.latest_by_key() {
        Ok(latest) => {
            let rows = select_changed(snapshot, &latest);
            logging::info_console(format!("{} stations changed since last save.", rows.len()));
            Plan::Write {
                rows,
                with_header: false,
            }
        }
        Err(why) => {
            // 無法比對時整批寫入
            logging::error_console(format!(
                "Could not compare with history: {}. Appending all {} stations.",
                why,
                snapshot.len()
            ));
            logging::error_file_async(format!("Failed to diff history because {:?}", why));
            Plan::Write {
                rows: snapshot,
                with_header: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{history::memory::MemoryHistory, util::datetime};

    use super::*;

    fn record(id: &str, at: &str, diesel: Option<Decimal>, e5: Option<Decimal>) -> StationRecord {
        StationRecord {
            id: id.to_string(),
            prices: FuelPrices {
                diesel,
                e5,
                e10: Some(dec!(1.75)),
            },
            timestamp: datetime::parse_timestamp(at).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_fuel_changed_qualifies() {
        let history = MemoryHistory::with_rows(vec![record(
            "a",
            "2026-03-01 09:00:00",
            Some(dec!(1.70)),
            Some(dec!(1.80)),
        )]);
        let snapshot = vec![record("a", "2026-03-01 10:00:00", Some(dec!(1.70)), Some(dec!(1.85)))];

        assert_eq!(
            plan(&history, snapshot.clone()),
            Plan::Write {
                rows: snapshot,
                with_header: false
            }
        );
    }

    #[test]
    fn test_unchanged_is_dropped() {
        let history = MemoryHistory::with_rows(vec![record(
            "a",
            "2026-03-01 09:00:00",
            Some(dec!(1.70)),
            Some(dec!(1.80)),
        )]);
        let snapshot = vec![record(
            "a",
            "2026-03-01 10:00:00",
            Some(dec!(1.700)),
            Some(dec!(1.80)),
        )];

        assert_eq!(
            plan(&history, snapshot),
            Plan::Write {
                rows: vec![],
                with_header: false
            }
        );
    }

    #[test]
    fn test_compares_with_latest_row_per_station() {
        let history = MemoryHistory::with_rows(vec![
            record("a", "2026-03-01 11:00:00", Some(dec!(1.65)), Some(dec!(1.80))),
            record("a", "2026-03-01 08:00:00", Some(dec!(1.70)), Some(dec!(1.80))),
        ]);

        // 與 11:00 那筆相同，與 08:00 那筆不同
        let same_as_latest = vec![record(
            "a",
            "2026-03-01 12:00:00",
            Some(dec!(1.65)),
            Some(dec!(1.80)),
        )];
        let latest = history.latest_by_key().unwrap();

        assert!(select_changed(same_as_latest, &latest).is_empty());
    }

    #[test]
    fn test_new_station_always_qualifies() {
        let history = MemoryHistory::with_rows(vec![record(
            "a",
            "2026-03-01 09:00:00",
            Some(dec!(1.70)),
            Some(dec!(1.80)),
        )]);
        let snapshot = vec![
            record("a", "2026-03-01 10:00:00", Some(dec!(1.70)), Some(dec!(1.80))),
            record("b", "2026-03-01 10:00:00", Some(dec!(1.70)), Some(dec!(1.80))),
        ];

        match plan(&history, snapshot) {
            Plan::Write { rows, with_header } => {
                assert!(!with_header);
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].id, "b");
            }
            other => panic!("unexpected plan: {:?}", other),
        }
    }

    #[test]
    fn test_missing_price_counts_as_change() {
        let history = MemoryHistory::with_rows(vec![record(
            "a",
            "2026-03-01 09:00:00",
            None,
            Some(dec!(1.80)),
        )]);
        let latest = history.latest_by_key().unwrap();
        let snapshot = vec![record("a", "2026-03-01 10:00:00", None, Some(dec!(1.80)))];

        assert_eq!(select_changed(snapshot, &latest).len(), 1);
    }

    #[test]
    fn test_no_history_writes_everything_with_header() {
        let history = MemoryHistory::new();

        assert_eq!(
            plan(&history, vec![]),
            Plan::Write {
                rows: vec![],
                with_header: true
            }
        );
    }

    #[test]
    fn test_unreadable_history_appends_everything() {
        let history = MemoryHistory::corrupt();
        let snapshot = vec![record("a", "2026-03-01 10:00:00", Some(dec!(1.70)), None)];

        assert_eq!(
            plan(&history, snapshot.clone()),
            Plan::Write {
                rows: snapshot,
                with_header: false
            }
        );
    }
}
