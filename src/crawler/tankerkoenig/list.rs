use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{de, Deserializer};
use serde_derive::Deserialize;
use serde_json::Value;

use crate::{
    crawler::{tankerkoenig::Tankerkoenig, StationSource},
    declare::{self, FuelPrices, Location, StationRecord},
    error::Error,
    util,
};

/// `list.php` 的回應。
#[derive(Deserialize, Debug)]
struct ListResponse {
    ok: bool,
    /// 失敗時的說明，例如 API 金鑰無效。
    #[serde(default)]
    message: String,
    #[serde(default)]
    stations: Vec<Station>,
}

/// 單一加油站。
#[derive(Deserialize, Debug)]
struct Station {
    id: String,
    #[serde(default, deserialize_with = "text")]
    name: String,
    #[serde(default, deserialize_with = "text")]
    brand: String,
    #[serde(default, deserialize_with = "text")]
    street: String,
    #[serde(default, deserialize_with = "text")]
    place: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    /// 與查詢座標的距離 (km)。
    #[serde(default)]
    dist: Option<f64>,
    #[serde(default, deserialize_with = "price")]
    diesel: Option<Decimal>,
    #[serde(default, deserialize_with = "price")]
    e5: Option<Decimal>,
    #[serde(default, deserialize_with = "price")]
    e10: Option<Decimal>,
    #[serde(default, rename = "isOpen")]
    is_open: Option<bool>,
    #[serde(default, rename = "houseNumber", deserialize_with = "text")]
    house_number: String,
    /// 郵遞區號，API 以數字回傳。
    #[serde(default, rename = "postCode", deserialize_with = "text")]
    post_code: String,
}

impl Station {
    fn into_record(self, city: &str, fetched_at: NaiveDateTime) -> StationRecord {
        StationRecord {
            id: self.id,
            name: self.name,
            brand: self.brand,
            street: self.street,
            place: self.place,
            lat: self.lat,
            lng: self.lng,
            dist: self.dist,
            prices: FuelPrices {
                diesel: self.diesel,
                e5: self.e5,
                e10: self.e10,
            },
            is_open: self.is_open,
            house_number: self.house_number,
            post_code: self.post_code,
            city: Some(city.to_string()),
            timestamp: fetched_at,
        }
    }
}

/// 價格可能是數字、`null` 或 `false`（該站沒有此油品）。
///
/// The decimal is parsed from the JSON number's text so 1.789 stays 1.789.
fn price<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match <Value as de::Deserialize>::deserialize(deserializer)? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map(Some)
            .map_err(de::Error::custom),
        Value::String(s) => declare::parse_price(&s).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

/// 文字欄位可能是 `null`，郵遞區號則是數字。
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match <Value as de::Deserialize>::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Turns a decoded response into records, or [`Error::ApiNotOk`].
fn into_records(
    response: ListResponse,
    location: &Location,
    fetched_at: NaiveDateTime,
) -> Result<Vec<StationRecord>> {
    if !response.ok {
        return Err(Error::ApiNotOk {
            location: location.name.clone(),
            message: response.message,
        }
        .into());
    }

    Ok(response
        .stations
        .into_iter()
        .map(|station| station.into_record(&location.name, fetched_at))
        .collect())
}

#[async_trait]
impl StationSource for Tankerkoenig {
    /// 取得指定地點附近加油站的即時油價。
    ///
    /// # 參數
    /// * `location` - 查詢的座標與半徑。
    /// * `fetched_at` - 寫入每筆資料的抓取時間。
    ///
    /// # 回傳
    /// * 成功時回傳依距離排序的加油站；
    ///   網路錯誤、逾時或非 JSON 回應為 [`Error::Network`]，
    ///   `ok` 為 false 時為 [`Error::ApiNotOk`]。
    async fn fetch_stations(
        &self,
        location: &Location,
        fetched_at: NaiveDateTime,
    ) -> Result<Vec<StationRecord>> {
        let url = self.list_url(location);
        let response = util::http::get_json::<ListResponse>(&url, self.timeout).await?;

        into_records(response, location, fetched_at)
    }
}
