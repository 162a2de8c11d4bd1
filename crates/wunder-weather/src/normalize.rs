//! Reduce a provider reply to the small status record written into the payload.
//!
//! The status is meant to stay well under a kilobyte, so only the handful of
//! fields the bubble displays survive.

use crate::response::{ClockTime, CurrentObservation, ForecastDay, GeoLookup, WeatherResponse};
use crate::types::{Coordinate, CurrentConditions, DailyForecast, Observation};

/// Forecast days kept in a status.
pub const FORECAST_DAYS: usize = 3;

/// Normalize a full provider reply.
pub fn normalize(response: &WeatherResponse) -> Observation {
    let lookup = response.location.as_ref();

    Observation {
        location: lookup.and_then(coordinate),
        city: lookup.and_then(city_label),
        current: conditions(
            response.current_observation.as_ref(),
            response.sun_phase.as_ref().and_then(|s| s.sunrise.as_ref()),
            response.sun_phase.as_ref().and_then(|s| s.sunset.as_ref()),
        ),
        daily: forecast(response.forecast_days()),
    }
}

/// The coordinate the provider resolved, so it matches the reported weather.
fn coordinate(lookup: &GeoLookup) -> Option<Coordinate> {
    Some(Coordinate::new(lookup.lat?, lookup.lon?))
}

/// `"<city>, <region>"`.
fn city_label(lookup: &GeoLookup) -> Option<String> {
    let city = lookup.city.as_deref()?;
    let state = lookup.state.as_deref()?;
    Some(format!("{}, {}", city, state))
}

fn conditions(
    observation: Option<&CurrentObservation>,
    sunrise: Option<&ClockTime>,
    sunset: Option<&ClockTime>,
) -> CurrentConditions {
    let mut current = CurrentConditions {
        sunrise: sunrise.and_then(clock_label),
        sunset: sunset.and_then(clock_label),
        ..Default::default()
    };

    if let Some(obs) = observation {
        current.temp = obs.temp_f.map(round_half_up);
        current.speed = obs.wind_mph;
        current.like = obs.feelslike_f.map(round_half_up);
        current.humidity = obs.relative_humidity.clone();
        current.pressure = obs.pressure_in.clone();
        current.description = obs.weather.clone();
        current.direction = obs.wind_dir.clone();
        current.icon = obs.icon.clone();
    }

    current
}

/// First `FORECAST_DAYS` entries, in provider order.
fn forecast(days: &[ForecastDay]) -> Vec<DailyForecast> {
    days.iter()
        .take(FORECAST_DAYS)
        .map(|day| DailyForecast {
            date: day.date.as_ref().and_then(|d| d.epoch),
            high: day.high.as_ref().and_then(|t| t.fahrenheit.clone()),
            low: day.low.as_ref().and_then(|t| t.fahrenheit.clone()),
            icon: day.icon.clone(),
        })
        .collect()
}

/// `"<hour mod 12>:<minute><AM|PM>"`.
///
/// Noon and midnight both render hour `0`; the marker comes from the
/// unreduced hour. Existing payloads carry this form, so it is kept as is.
pub fn clock_label(time: &ClockTime) -> Option<String> {
    let hour = time.hour?;
    let minute = time.minute.as_deref()?;
    let marker = if hour < 12 { "AM" } else { "PM" };
    Some(format!("{}:{}{}", hour % 12, minute, marker))
}

/// Nearest integer, halves rounding toward positive infinity.
fn round_half_up(value: f64) -> i64 {
    let rounded = value.round();
    if value - rounded == 0.5 {
        (rounded + 1.0) as i64
    } else {
        rounded as i64
    }
}
