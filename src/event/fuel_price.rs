use anyhow::Result;
use chrono::NaiveDateTime;

use crate::{
    config::{App, SETTINGS},
    crawler::{self, tankerkoenig::Tankerkoenig, StationSource},
    history::{csv::CsvHistory, HistoryRepository},
    logging,
    policy::{self, Plan, Policy},
    report,
    util::datetime,
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// No location delivered data; nothing printed or saved.
    NoData,
    /// A failed fetch ended the run under the change policy.
    Aborted,
    /// Rows appended to the history.
    Saved(usize),
    /// The throttle interval has not passed yet.
    Skipped,
    /// No station changed its prices.
    NoChanges,
}

/// 以設定檔中的地點、API 與歷史檔執行一次
pub async fn execute() -> Result<()> {
    let app: &App = &SETTINGS;

    if app.tankerkoenig.api_key.trim().is_empty() {
        logging::warn_file_async(
            "TANKER_API_KEY is not set, the API will reject every request".to_string(),
        );
    }

    let source = Tankerkoenig::from_settings(&app.tankerkoenig);
    let mut history = CsvHistory::new(app.history_path(), app.history.policy.columns());
    let outcome = run(app, &source, &mut history, datetime::now()).await?;

    logging::info_file_async(format!(
        "fuel_price::execute({}, {}) finished with {:?}",
        app.history.policy,
        history.path().display(),
        outcome
    ));

    Ok(())
}

/// Fetches a snapshot, prints it and lets the configured policy decide what
/// goes into `history`.
///
/// `now` is the fetch time stamped on every row and the reference for the
/// throttle interval.
pub async fn run<S, H>(
    app: &App,
    source: &S,
    history: &mut H,
    now: NaiveDateTime,
) -> Result<Outcome>
where
    S: StationSource + ?Sized,
    H: HistoryRepository + ?Sized,
{
    let policy = app.history.policy;
    let locations = app.valid_locations();

    let snapshot = match crawler::fetch_snapshot(
        source,
        &locations,
        now,
        policy.aborts_on_fetch_failure(),
    )
    .await
    {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            logging::info_console("No data fetched at all. Exiting.".to_string());
            return Ok(Outcome::NoData);
        }
        Err(why) => {
            logging::error_file_async(format!("Aborting fuel price run because {:?}", why));
            return Ok(Outcome::Aborted);
        }
    };

    println!("{}", report::render(&snapshot, &policy.columns()));

    let interval = app.history.save_interval_minutes;
    match policy::plan(policy, history, snapshot, now, interval) {
        Plan::Write { rows, with_header } => {
            if policy == Policy::Change && rows.is_empty() && !with_header {
                logging::info_console("No price changes".to_string());
                return Ok(Outcome::NoChanges);
            }

            let saved = history.append(&rows, with_header)?;
            logging::info_console(format!(
                "Saved {} rows to history at {}",
                saved,
                datetime::format_timestamp(&now)
            ));

            Ok(Outcome::Saved(saved))
        }
        Plan::Skip {
            minutes_since_last_save,
        } => {
            logging::info_file_async(format!(
                "Skip saving, last save was {:.1} minutes ago",
                minutes_since_last_save
            ));
            logging::info_console(format!(
                "Skipped saving – less than {} minutes since last save.",
                interval
            ));

            Ok(Outcome::Skipped)
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::{
        declare::{FuelPrices, Location, StationRecord},
        history::memory::MemoryHistory,
    };

    use super::*;

    /// Every location reports one station with a fixed diesel price.
    struct FakeSource {
        diesel: rust_decimal::Decimal,
    }

    #[async_trait]
    impl StationSource for FakeSource {
        async fn fetch_stations(
            &self,
            location: &Location,
            fetched_at: NaiveDateTime,
        ) -> Result<Vec<StationRecord>> {
            if location.name == "Down" {
                return Err(anyhow!("timed out"));
            }

            Ok(vec![StationRecord {
                id: format!("{}-aral", location.name),
                name: "Aral".to_string(),
                brand: "ARAL".to_string(),
                prices: FuelPrices {
                    diesel: Some(self.diesel),
                    e5: Some(dec!(1.799)),
                    e10: Some(dec!(1.739)),
                },
                city: Some(location.name.clone()),
                timestamp: fetched_at,
                ..Default::default()
            }])
        }
    }

    fn app(policy: Policy, names: &[&str]) -> App {
        let mut app = App {
            locations: names
                .iter()
                .map(|name| Location::new(name, 49.4, 8.1, 10.0))
                .collect(),
            ..Default::default()
        };
        app.history.policy = policy;
        app
    }

    fn at(s: &str) -> NaiveDateTime {
        datetime::parse_timestamp(s).unwrap()
    }

    #[tokio::test]
    async fn test_throttle_saves_once_per_hour() {
        let app = app(Policy::Throttle, &["Kaiserslautern", "Down", "Mannheim"]);
        let source = FakeSource { diesel: dec!(1.659) };
        let mut history = MemoryHistory::new();

        let first = run(&app, &source, &mut history, at("2026-03-01 10:00:00")).await;
        let again = run(&app, &source, &mut history, at("2026-03-01 10:59:59")).await;
        let later = run(&app, &source, &mut history, at("2026-03-01 11:00:00")).await;

        assert_eq!(first.unwrap(), Outcome::Saved(2));
        assert_eq!(again.unwrap(), Outcome::Skipped);
        assert_eq!(later.unwrap(), Outcome::Saved(2));
        assert_eq!(history.rows().len(), 4);
        assert_eq!(history.header_writes(), 1);
    }

    #[tokio::test]
    async fn test_no_data_writes_nothing() {
        let app = app(Policy::Throttle, &["Down"]);
        let source = FakeSource { diesel: dec!(1.659) };
        let mut history = MemoryHistory::new();

        let outcome = run(&app, &source, &mut history, datetime::now()).await.unwrap();

        assert_eq!(outcome, Outcome::NoData);
        assert!(!history.exists());
    }

    #[tokio::test]
    async fn test_change_writes_only_moved_prices() {
        let app = app(Policy::Change, &["Mannheim"]);
        let mut history = MemoryHistory::new();

        let first = run(
            &app,
            &FakeSource { diesel: dec!(1.659) },
            &mut history,
            at("2026-03-01 10:00:00"),
        )
        .await;
        let same = run(
            &app,
            &FakeSource { diesel: dec!(1.659) },
            &mut history,
            at("2026-03-01 10:05:00"),
        )
        .await;
        let moved = run(
            &app,
            &FakeSource { diesel: dec!(1.649) },
            &mut history,
            at("2026-03-01 10:10:00"),
        )
        .await;

        assert_eq!(first.unwrap(), Outcome::Saved(1));
        assert_eq!(same.unwrap(), Outcome::NoChanges);
        assert_eq!(moved.unwrap(), Outcome::Saved(1));
        assert_eq!(history.rows()[1].prices.diesel, Some(dec!(1.649)));
        assert_eq!(history.header_writes(), 1);
    }

    #[tokio::test]
    async fn test_change_aborts_on_failed_fetch() {
        let app = app(Policy::Change, &["Down"]);
        let source = FakeSource { diesel: dec!(1.659) };
        let mut history = MemoryHistory::new();

        let outcome = run(&app, &source, &mut history, datetime::now()).await.unwrap();

        assert_eq!(outcome, Outcome::Aborted);
        assert!(!history.exists());
    }

    #[tokio::test]
    #[ignore]
    async fn test_execute() {
        dotenv::dotenv().ok();
        logging::debug_file_async("開始 fuel_price::execute".to_string());

        if let Err(why) = execute().await {
            logging::debug_file_async(format!("Failed to fuel_price::execute because {:?}", why));
        }

        logging::debug_file_async("結束 fuel_price::execute".to_string());
        logging::flush();
    }
}
