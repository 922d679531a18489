use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::util::{datetime, map::Keyable};

/// Tankerkönig 允許的最大搜尋半徑 (km)
pub const MAX_RADIUS_KM: f64 = 25.0;

/// 追蹤的地點
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// 搜尋半徑 (km)
    pub rad: f64,
}

impl Location {
    pub fn new(name: &str, lat: f64, lng: f64, rad: f64) -> Self {
        Location {
            name: name.to_string(),
            lat,
            lng,
            rad,
        }
    }

    /// Checks that the coordinates and radius are something the API accepts.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("location name is empty"));
        }

        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(anyhow!("{}: latitude {} out of range", self.name, self.lat));
        }

        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(anyhow!("{}: longitude {} out of range", self.name, self.lng));
        }

        if !(self.rad > 0.0 && self.rad <= MAX_RADIUS_KM) {
            return Err(anyhow!(
                "{}: radius {} km must be within (0, {}]",
                self.name,
                self.rad,
                MAX_RADIUS_KM
            ));
        }

        Ok(())
    }
}

/// 三種油品的價格，空值代表該站未提供
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuelPrices {
    pub diesel: Option<Decimal>,
    pub e5: Option<Decimal>,
    pub e10: Option<Decimal>,
}

impl FuelPrices {
    /// Returns true when any of diesel/e5/e10 differs from `last`.
    ///
    /// A missing price on either side never counts as equal, so a station
    /// that does not report a fuel type keeps qualifying as changed.
    pub fn changed_since(&self, last: &FuelPrices) -> bool {
        price_changed(self.diesel, last.diesel)
            || price_changed(self.e5, last.e5)
            || price_changed(self.e10, last.e10)
    }
}

fn price_changed(current: Option<Decimal>, last: Option<Decimal>) -> bool {
    match (current, last) {
        (Some(current), Some(last)) => current != last,
        _ => true,
    }
}

/// History file columns, named the way the API names its JSON keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
pub enum Column {
    #[strum(serialize = "id")]
    Id,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "brand")]
    Brand,
    #[strum(serialize = "street")]
    Street,
    #[strum(serialize = "place")]
    Place,
    #[strum(serialize = "lat")]
    Lat,
    #[strum(serialize = "lng")]
    Lng,
    #[strum(serialize = "dist")]
    Dist,
    #[strum(serialize = "diesel")]
    Diesel,
    #[strum(serialize = "e5")]
    E5,
    #[strum(serialize = "e10")]
    E10,
    #[strum(serialize = "isOpen")]
    IsOpen,
    #[strum(serialize = "houseNumber")]
    HouseNumber,
    #[strum(serialize = "postCode")]
    PostCode,
    #[strum(serialize = "city")]
    City,
    #[strum(serialize = "timestamp")]
    Timestamp,
}

/// API 回傳的欄位順序
const STATION_COLUMNS: [Column; 14] = [
    Column::Id,
    Column::Name,
    Column::Brand,
    Column::Street,
    Column::Place,
    Column::Lat,
    Column::Lng,
    Column::Dist,
    Column::Diesel,
    Column::E5,
    Column::E10,
    Column::IsOpen,
    Column::HouseNumber,
    Column::PostCode,
];

impl Column {
    /// Station columns followed by `city` and `timestamp`.
    pub fn with_city() -> Vec<Column> {
        let mut columns = STATION_COLUMNS.to_vec();
        columns.push(Column::City);
        columns.push(Column::Timestamp);
        columns
    }

    /// Station columns followed by `timestamp` only.
    pub fn without_city() -> Vec<Column> {
        let mut columns = STATION_COLUMNS.to_vec();
        columns.push(Column::Timestamp);
        columns
    }
}

/// 某個加油站在抓取當下的狀態
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub street: String,
    pub place: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub dist: Option<f64>,
    pub prices: FuelPrices,
    pub is_open: Option<bool>,
    pub house_number: String,
    pub post_code: String,
    pub city: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl Keyable for StationRecord {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl StationRecord {
    /// Renders one column as the text stored in the history file.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Id => self.id.clone(),
            Column::Name => self.name.clone(),
            Column::Brand => self.brand.clone(),
            Column::Street => self.street.clone(),
            Column::Place => self.place.clone(),
            Column::Lat => float_cell(self.lat),
            Column::Lng => float_cell(self.lng),
            Column::Dist => float_cell(self.dist),
            Column::Diesel => price_cell(self.prices.diesel),
            Column::E5 => price_cell(self.prices.e5),
            Column::E10 => price_cell(self.prices.e10),
            Column::IsOpen => match self.is_open {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => String::new(),
            },
            Column::HouseNumber => self.house_number.clone(),
            Column::PostCode => self.post_code.clone(),
            Column::City => self.city.clone().unwrap_or_default(),
            Column::Timestamp => datetime::format_timestamp(&self.timestamp),
        }
    }

    /// Parses one stored cell back into the record.
    pub fn set_cell(&mut self, column: Column, value: &str) -> Result<()> {
        match column {
            Column::Id => self.id = value.to_string(),
            Column::Name => self.name = value.to_string(),
            Column::Brand => self.brand = value.to_string(),
            Column::Street => self.street = value.to_string(),
            Column::Place => self.place = value.to_string(),
            Column::Lat => self.lat = parse_float(value)?,
            Column::Lng => self.lng = parse_float(value)?,
            Column::Dist => self.dist = parse_float(value)?,
            Column::Diesel => self.prices.diesel = parse_price(value)?,
            Column::E5 => self.prices.e5 = parse_price(value)?,
            Column::E10 => self.prices.e10 = parse_price(value)?,
            Column::IsOpen => self.is_open = parse_bool(value)?,
            Column::HouseNumber => self.house_number = value.to_string(),
            Column::PostCode => self.post_code = value.to_string(),
            Column::City => {
                self.city = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            Column::Timestamp => self.timestamp = datetime::parse_timestamp(value)?,
        }

        Ok(())
    }
}

fn float_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn price_cell(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn is_blank(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("nan")
}

fn parse_float(value: &str) -> Result<Option<f64>> {
    if is_blank(value) {
        return Ok(None);
    }

    value
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|why| anyhow!("'{}' is not a number: {}", value, why))
}

/// 空字串與 `false` 都代表沒有價格
pub fn parse_price(value: &str) -> Result<Option<Decimal>> {
    if is_blank(value) || value.trim().eq_ignore_ascii_case("false") {
        return Ok(None);
    }

    Decimal::from_str(value.trim())
        .or_else(|_| Decimal::from_scientific(value.trim()))
        .map(Some)
        .map_err(|why| anyhow!("'{}' is not a price: {}", value, why))
}

fn parse_bool(value: &str) -> Result<Option<bool>> {
    match value.trim() {
        "" => Ok(None),
        "True" | "true" | "1" => Ok(Some(true)),
        "False" | "false" | "0" => Ok(Some(false)),
        other => Err(anyhow!("'{}' is not a boolean", other)),
    }
}
