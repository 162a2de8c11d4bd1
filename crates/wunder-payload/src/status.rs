use serde::{Deserialize, Serialize};
use wunder_weather::lenient::{lenient_list, lenient_text, lenient_value};
use wunder_weather::{Coordinate, CurrentConditions, DailyForecast, Observation};

/// Fields that make a status usable, in payload key order.
pub const STATUS_KEYS: [&str; 5] = ["location", "city", "time", "current", "daily"];

/// One participant's shared location and weather.
///
/// The baseline payload carries the owner's copy of these fields; everyone
/// else's lives in the replicated mapping. Fields that don't read as the
/// expected shape come back unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStatus {
    #[serde(
        default,
        deserialize_with = "lenient_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Coordinate>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    /// ISO-8601 instant the status was produced
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub current: Option<CurrentConditions>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub daily: Option<Vec<DailyForecast>>,
}

impl ParticipantStatus {
    /// Status stamped with `time`, built from a normalized observation.
    pub fn from_observation(observation: Observation, time: String) -> Self {
        Self {
            location: observation.location,
            city: observation.city,
            time: Some(time),
            current: Some(observation.current),
            daily: Some(observation.daily),
        }
    }

    /// Names of the completeness fields still unset.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            self.location.is_some(),
            self.city.is_some(),
            self.time.is_some(),
            self.current.is_some(),
            self.daily.is_some(),
        ];
        STATUS_KEYS
            .iter()
            .zip(present)
            .filter(|(_, set)| !set)
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Fill unset fields from `other`, leaving set ones alone.
    /// Returns true if anything changed.
    pub(crate) fn fill_missing(&mut self, other: ParticipantStatus) -> bool {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
            if slot.is_none() && value.is_some() {
                *slot = value;
                true
            } else {
                false
            }
        }

        let mut changed = fill(&mut self.location, other.location);
        changed |= fill(&mut self.city, other.city);
        changed |= fill(&mut self.time, other.time);
        changed |= fill(&mut self.current, other.current);
        changed |= fill(&mut self.daily, other.daily);
        changed
    }
}

/// Host layout hint written at the top level of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutHint {
    #[serde(default = "default_ratio")]
    pub ratio: f64,
    /// Host-specific keys carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_ratio() -> f64 {
    1.0
}

impl Default for LayoutHint {
    fn default() -> Self {
        Self {
            ratio: default_ratio(),
            extra: serde_json::Map::new(),
        }
    }
}

/// The record written once into the conversation stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselinePayload {
    /// Session rendezvous key; also the replica namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(
        rename = "initialLayout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_layout: Option<LayoutHint>,
    /// The owner's status
    #[serde(flatten)]
    pub status: ParticipantStatus,
}

impl BaselinePayload {
    pub fn with_uuid(uuid: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            ..Default::default()
        }
    }

    /// Case-insensitive session identity comparison.
    pub fn same_session(&self, other: &BaselinePayload) -> bool {
        match (&self.uuid, &other.uuid) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}
