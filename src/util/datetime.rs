use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDateTime, SubsecRound};

/// 歷史檔中時間欄位的格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Other layouts accepted when reading an existing history file.
const LENIENT_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Current local wall-clock time truncated to whole seconds, so a stored
/// timestamp reads back as exactly the value that was used for the decision.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD HH:MM:SS` timestamp, tolerating fractional seconds
/// and the ISO `T` separator.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Ok(ts);
    }

    LENIENT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| anyhow!("'{}' is not a timestamp", s))
}

/// Minutes elapsed from `earlier` to `later`, negative if the clock went back.
pub fn minutes_between(earlier: &NaiveDateTime, later: &NaiveDateTime) -> f64 {
    (*later - *earlier).num_milliseconds() as f64 / 60_000.0
}
