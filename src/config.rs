use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{declare::Location, logging, policy::Policy};

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub tankerkoenig: Tankerkoenig,
    #[serde(default)]
    pub history: History,
    #[serde(default)]
    pub system: System,
    #[serde(default = "default_locations")]
    pub locations: Vec<Location>,
}

const TANKER_API_KEY: &str = "TANKER_API_KEY";
const TANKER_API_URL: &str = "TANKER_API_URL";
const TANKER_TIMEOUT_SECS: &str = "TANKER_TIMEOUT_SECS";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Tankerkoenig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Tankerkoenig {
    fn default() -> Self {
        Tankerkoenig {
            api_key: String::new(),
            url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Tankerkoenig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const FUEL_HISTORY_FILE: &str = "FUEL_HISTORY_FILE";
const FUEL_POLICY: &str = "FUEL_POLICY";
const FUEL_SAVE_INTERVAL_MINUTES: &str = "FUEL_SAVE_INTERVAL_MINUTES";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct History {
    #[serde(default = "default_history_path")]
    pub path: String,
    #[serde(default)]
    pub policy: Policy,
    #[serde(default = "default_save_interval_minutes")]
    pub save_interval_minutes: f64,
}

impl Default for History {
    fn default() -> Self {
        History {
            path: default_history_path(),
            policy: Policy::default(),
            save_interval_minutes: default_save_interval_minutes(),
        }
    }
}

const FUEL_SCHEDULE: &str = "FUEL_SCHEDULE";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct System {
    /// 六欄位的 cron 表示式，空字串代表只執行一次
    #[serde(default)]
    pub schedule: String,
}

fn default_api_url() -> String {
    "https://creativecommons.tankerkoenig.de/json/list.php".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_history_path() -> String {
    "fuel_history.csv".to_string()
}

fn default_save_interval_minutes() -> f64 {
    60.0
}

fn default_locations() -> Vec<Location> {
    vec![
        Location::new("Kaiserslautern", 49.4401, 7.7491, 10.0),
        Location::new("Neustadt", 49.3517, 8.1381, 10.0),
        Location::new("Mannheim", 49.4875, 8.4660, 10.0),
    ]
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| match App::get() {
    Ok(app) => app,
    Err(why) => {
        logging::error_console(format!(
            "I can't read the config context because {:?}, using defaults",
            why
        ));
        App::from_env()
    }
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::from_env())
    }

    /// 從 env 中讀取設定值，其餘使用預設值
    fn from_env() -> Self {
        App {
            locations: default_locations(),
            ..Default::default()
        }
        .override_with_env()
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(api_key) = env::var(TANKER_API_KEY) {
            self.tankerkoenig.api_key = api_key;
        }

        if let Ok(url) = env::var(TANKER_API_URL) {
            self.tankerkoenig.url = url;
        }

        if let Ok(secs) = env::var(TANKER_TIMEOUT_SECS) {
            self.tankerkoenig.timeout_secs =
                u64::from_str(&secs).unwrap_or(default_timeout_secs());
        }

        if let Ok(path) = env::var(FUEL_HISTORY_FILE) {
            self.history.path = path;
        }

        if let Ok(policy) = env::var(FUEL_POLICY) {
            match Policy::from_str(&policy) {
                Ok(p) => self.history.policy = p,
                Err(why) => logging::error_console(format!(
                    "Unknown {} '{}' because {:?}, keeping {}",
                    FUEL_POLICY, policy, why, self.history.policy
                )),
            }
        }

        if let Ok(minutes) = env::var(FUEL_SAVE_INTERVAL_MINUTES) {
            self.history.save_interval_minutes =
                f64::from_str(&minutes).unwrap_or(default_save_interval_minutes());
        }

        if let Ok(schedule) = env::var(FUEL_SCHEDULE) {
            self.system.schedule = schedule;
        }

        self
    }

    /// Locations the API will accept. Invalid entries are logged and dropped.
    pub fn valid_locations(&self) -> Vec<Location> {
        self.locations
            .iter()
            .filter(|location| match location.validate() {
                Ok(_) => true,
                Err(why) => {
                    logging::error_file_async(format!("Skip location because {:?}", why));
                    false
                }
            })
            .cloned()
            .collect()
    }

    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(&self.history.path)
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_defaults() {
        let app: App = serde_json::from_str(r#"{"tankerkoenig": {"api_key": "k"}}"#).unwrap();

        assert_eq!(app.tankerkoenig.api_key, "k");
        assert_eq!(app.tankerkoenig.timeout(), Duration::from_secs(10));
        assert_eq!(app.history.path, "fuel_history.csv");
        assert_eq!(app.history.policy, Policy::Throttle);
        assert_eq!(app.history.save_interval_minutes, 60.0);
        assert!(app.system.schedule.is_empty());
        assert_eq!(app.locations.len(), 3);
        assert_eq!(app.locations[0].name, "Kaiserslautern");
    }

    #[test]
    fn test_json_override() {
        let app: App = serde_json::from_str(
            r#"{
                "history": {"path": "data/prices.csv", "policy": "change"},
                "locations": [{"name": "Berlin", "lat": 52.52, "lng": 13.405, "rad": 5}]
            }"#,
        )
        .unwrap();

        assert_eq!(app.history.policy, Policy::Change);
        assert_eq!(app.history_path(), PathBuf::from("data/prices.csv"));
        assert_eq!(app.locations, vec![Location::new("Berlin", 52.52, 13.405, 5.0)]);
    }

    #[test]
    fn test_valid_locations() {
        let app = App {
            locations: vec![
                Location::new("Mannheim", 49.4875, 8.4660, 10.0),
                Location::new("Nowhere", 120.0, 8.0, 10.0),
            ],
            ..Default::default()
        };

        let valid = app.valid_locations();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].name, "Mannheim");
    }
}
