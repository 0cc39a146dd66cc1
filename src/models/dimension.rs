use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Generated integer key of a dimension row.
pub type SurrogateKey = i32;

/// Natural key of the location dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationKey {
    /// Hourly warehouse: `dim_location(latitude, longitude)`.
    Coordinates { latitude: f64, longitude: f64 },
    /// Daily warehouse: `dim_location(location)`.
    Named(String),
}

impl LocationKey {
    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        LocationKey::Coordinates {
            latitude,
            longitude,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        LocationKey::Named(name.into())
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationKey::Coordinates {
                latitude,
                longitude,
            } => write!(f, "({}, {})", latitude, longitude),
            LocationKey::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Natural key of the time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeKey {
    /// Hourly warehouse: `dim_time(date, hour)`.
    Hour { date: NaiveDate, hour: u32 },
    /// Daily warehouse: `dim_date(date)` with year/month/day decomposition.
    Day(NaiveDate),
}

impl TimeKey {
    pub fn hour_of(timestamp: NaiveDateTime) -> Self {
        TimeKey::Hour {
            date: timestamp.date(),
            hour: timestamp.hour(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            TimeKey::Hour { date, .. } => *date,
            TimeKey::Day(date) => *date,
        }
    }

    pub fn year(&self) -> i32 {
        self.date().year()
    }

    pub fn month(&self) -> u32 {
        self.date().month()
    }

    pub fn day(&self) -> u32 {
        self.date().day()
    }
}

impl std::fmt::Display for TimeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeKey::Hour { date, hour } => write!(f, "{} {:02}h", date, hour),
            TimeKey::Day(date) => write!(f, "{}", date),
        }
    }
}
