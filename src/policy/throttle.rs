use chrono::NaiveDateTime;

use crate::{
    declare::StationRecord,
    history::HistoryRepository,
    logging,
    policy::Plan,
    util::datetime,
};

/// Outcome of the time gate, decided once per run before anything is written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throttle {
    /// 沒有歷史檔，第一次執行
    FirstRun,
    /// 歷史檔讀不到任何時間，當作重新開始
    Unreadable,
    /// 距離上次儲存已達間隔
    Due { minutes_since_last_save: f64 },
    /// 距離上次儲存未滿間隔
    Skip { minutes_since_last_save: f64 },
}

impl Throttle {
    pub fn should_save(&self) -> bool {
        !matches!(self, Throttle::Skip { .. })
    }

    /// Minutes since the newest saved row, when there is one.
    pub fn minutes_since_last_save(&self) -> Option<f64> {
        match self {
            Throttle::Due {
                minutes_since_last_save,
            }
            | Throttle::Skip {
                minutes_since_last_save,
            } => Some(*minutes_since_last_save),
            _ => None,
        }
    }
}

/// The interval is inclusive: exactly `interval_minutes` is due.
pub fn is_due(minutes_since_last_save: f64, interval_minutes: f64) -> bool {
    minutes_since_last_save >= interval_minutes
}

pub fn decide<H: HistoryRepository + ?Sized>(
    history: &H,
    now: NaiveDateTime,
    interval_minutes: f64,
) -> Throttle {
    if !history.exists() {
        logging::info_console("No history file found. This is the first run.".to_string());
        return Throttle::FirstRun;
    }

    let last_saved_at = match history.max_timestamp() {
        Ok(Some(ts)) => ts,
        Ok(None) => {
            logging::info_console("History file holds no rows. Will save fresh.".to_string());
            return Throttle::Unreadable;
        }
        Err(why) => {
            logging::error_console(format!(
                "Could not read history file: {}. Will save fresh.",
                why
            ));
            logging::error_file_async(format!("Failed to read history because {:?}", why));
            return Throttle::Unreadable;
        }
    };

    let minutes_since_last_save = datetime::minutes_between(&last_saved_at, &now);
    let due = is_due(minutes_since_last_save, interval_minutes);
    logging::info_console(format!(
        "Last save was {} minutes ago. Saving: {}",
        minutes_since_last_save as i64, due
    ));

    if due {
        Throttle::Due {
            minutes_since_last_save,
        }
    } else {
        Throttle::Skip {
            minutes_since_last_save,
        }
    }
}

/// Saves the whole snapshot when the gate is open, otherwise nothing.
pub fn plan<H: HistoryRepository + ?Sized>(
    history: &H,
    snapshot: Vec<StationRecord>,
    now: NaiveDateTime,
    interval_minutes: f64,
) -> Plan {
    let decision = decide(history, now, interval_minutes);
    if decision.should_save() {
        return Plan::Write {
            rows: snapshot,
            with_header: !history.exists(),
        };
    }

    Plan::Skip {
        minutes_since_last_save: decision.minutes_since_last_save().unwrap_or_default(),
    }
}
