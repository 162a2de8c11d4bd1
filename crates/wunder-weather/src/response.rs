//! Wire shape of the combined conditions/geolookup/forecast/astronomy request.
//!
//! Only the fields the bubble consumes are modeled. The provider reports most
//! numbers as strings, so numeric fields accept either form, and anything
//! missing or unreadable is left as `None`.

use serde::Deserialize;

use crate::lenient::{lenient_f64, lenient_i64, lenient_text};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub response: Option<ResponseMeta>,
    #[serde(default)]
    pub location: Option<GeoLookup>,
    #[serde(default)]
    pub current_observation: Option<CurrentObservation>,
    #[serde(default)]
    pub forecast: Option<Forecast>,
    #[serde(default)]
    pub sun_phase: Option<SunPhase>,
}

impl WeatherResponse {
    /// Error object the provider embeds in an otherwise successful reply.
    pub fn api_error(&self) -> Option<&ApiErrorBody> {
        self.response.as_ref().and_then(|r| r.error.as_ref())
    }

    /// Forecast days in provider order (empty when the section is missing).
    pub fn forecast_days(&self) -> &[ForecastDay] {
        self.forecast
            .as_ref()
            .and_then(|f| f.simpleforecast.as_ref())
            .map(|s| s.forecastday.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

/// Reverse geocode of the requested coordinate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoLookup {
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentObservation {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temp_f: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub feelslike_f: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub wind_mph: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub relative_humidity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pressure_in: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub weather: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub wind_dir: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub simpleforecast: Option<SimpleForecast>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimpleForecast {
    #[serde(default)]
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastDay {
    #[serde(default)]
    pub date: Option<ForecastDate>,
    #[serde(default)]
    pub high: Option<Temperature>,
    #[serde(default)]
    pub low: Option<Temperature>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastDate {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub epoch: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Temperature {
    #[serde(default, deserialize_with = "lenient_text")]
    pub fahrenheit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SunPhase {
    #[serde(default)]
    pub sunrise: Option<ClockTime>,
    #[serde(default)]
    pub sunset: Option<ClockTime>,
}

/// Hour/minute pair from the astronomy section. The minute is kept verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClockTime {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub hour: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub minute: Option<String>,
}
