use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{
    declare::{Location, StationRecord},
    error::Error,
    logging,
};

/// Tankerkönig 加油站價格 API
pub mod tankerkoenig;

#[async_trait]
pub trait StationSource {
    /// Stations around `location`, stamped with the location name and `fetched_at`.
    async fn fetch_stations(
        &self,
        location: &Location,
        fetched_at: NaiveDateTime,
    ) -> Result<Vec<StationRecord>>;
}

/// Fetches every location in order, one request at a time.
///
/// With `abort_on_failure` the first failed location ends the run with its
/// error. Otherwise failures are logged and skipped, and `Ok(None)` means
/// that no location delivered data at all.
pub async fn fetch_snapshot<S: StationSource + ?Sized>(
    source: &S,
    locations: &[Location],
    fetched_at: NaiveDateTime,
    abort_on_failure: bool,
) -> Result<Option<Vec<StationRecord>>> {
    let mut snapshot = Vec::new();
    let mut delivered = 0;

    for location in locations {
        match source.fetch_stations(location, fetched_at).await {
            Ok(stations) => {
                logging::info_console(format!(
                    "✓ {}: {} stations fetched",
                    location.name,
                    stations.len()
                ));
                delivered += 1;
                snapshot.extend(stations);
            }
            Err(why) => {
                let msg = match why.downcast_ref::<Error>() {
                    Some(Error::ApiNotOk { .. }) => {
                        format!("✗ {}: API returned not ok", location.name)
                    }
                    _ => format!("✗ {}: Error fetching data – {}", location.name, why),
                };
                logging::error_console(msg);
                logging::error_file_async(format!(
                    "Failed to fetch stations for {} because {:?}",
                    location.name, why
                ));

                if abort_on_failure {
                    return Err(why);
                }
            }
        }
    }

    if delivered == 0 {
        return Ok(None);
    }

    Ok(Some(snapshot))
}
