//! # Tankerkönig 價格採集模組
//!
//! 透過 Tankerkönig 的 `list.php` 端點，依座標與半徑取得附近加油站的即時油價。
//!
//! - 來源域名：`creativecommons.tankerkoenig.de`
//! - 存取方式：HTTP GET 搭配 `apikey` 查詢參數
//! - 資料授權：CC BY 4.0

use std::time::Duration;

use concat_string::concat_string;

use crate::{config, declare::Location};

/// 附近加油站清單子模組。
pub mod list;

/// Tankerkönig 價格採集器。
pub struct Tankerkoenig {
    url: String,
    api_key: String,
    timeout: Duration,
}

impl Tankerkoenig {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Self {
        Tankerkoenig {
            url: url.to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    pub fn from_settings(settings: &config::Tankerkoenig) -> Self {
        Self::new(&settings.url, &settings.api_key, settings.timeout())
    }

    /// `list.php` query for one location, sorted by distance, all fuel types.
    ///
    /// The key is sent even when empty; the API then answers with an error.
    fn list_url(&self, location: &Location) -> String {
        concat_string!(
            self.url,
            "?lat=",
            location.lat.to_string(),
            "&lng=",
            location.lng.to_string(),
            "&rad=",
            location.rad.to_string(),
            "&sort=dist&type=all&apikey=",
            urlencoding::encode(&self.api_key)
        )
    }
}
