use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A place returned by the location search endpoint.
///
/// Identity is `id`; the gateway guarantees it is unique within one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub id: i64,
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    /// Canonical URL slug, e.g. `london-city-of-london-greater-london-united-kingdom`
    pub url: String,
}

impl LocationCandidate {
    /// "Name, Region, Country" with empty parts skipped
    pub fn display_name(&self) -> String {
        [&self.name, &self.region, &self.country]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Where a weather reading was taken, as reported by the current-weather endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub tz_id: String,
    pub localtime_epoch: i64,
    /// Local wall-clock time, e.g. `2024-12-07 14:05`
    pub localtime: String,
}

impl LocationInfo {
    /// The reading's instant in UTC, if the epoch is representable
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.localtime_epoch, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    /// Protocol-relative path, e.g. `//cdn.weatherapi.com/weather/64x64/day/116.png`
    pub icon: String,
}

impl Condition {
    /// Absolute https URL for the condition icon
    pub fn icon_url(&self) -> String {
        if self.icon.starts_with("//") {
            format!("https:{}", self.icon)
        } else {
            self.icon.clone()
        }
    }
}

/// Current conditions. Values are carried as the API reports them; rounding
/// is left to whoever renders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_f: f64,
    pub condition: Condition,
    pub humidity: u8,
    pub feelslike_f: f64,
    pub uv: f64,
}

/// One point-in-time weather reading for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: LocationInfo,
    pub current: CurrentConditions,
}
