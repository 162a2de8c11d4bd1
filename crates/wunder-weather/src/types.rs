use serde::{Deserialize, Serialize};

use crate::lenient::{lenient_f64, lenient_i64, lenient_text};

/// Geographic coordinate, as stored in a participant status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Current conditions reduced to what a status carries.
///
/// Every field is optional: upstream gaps are carried through as absent
/// rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Temperature, whole degrees Fahrenheit
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub temp: Option<i64>,
    /// Wind speed, mph
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub speed: Option<f64>,
    /// Feels-like temperature, whole degrees Fahrenheit
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub like: Option<i64>,
    /// Relative humidity as reported (e.g. "65%")
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub humidity: Option<String>,
    /// Pressure in inches as reported
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub pressure: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    /// Wind direction as reported (e.g. "NNW")
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub direction: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub icon: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub sunrise: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub sunset: Option<String>,
}

/// One forecast day as stored in a status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Day start, epoch seconds
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<i64>,
    /// High, degrees Fahrenheit as reported
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub high: Option<String>,
    /// Low, degrees Fahrenheit as reported
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub low: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub icon: Option<String>,
}

/// Normalized result of one weather lookup, ready to be written as a status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub location: Option<Coordinate>,
    pub city: Option<String>,
    pub current: CurrentConditions,
    pub daily: Vec<DailyForecast>,
}
