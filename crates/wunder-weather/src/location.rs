//! One-shot position queries.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use wunder_core::{GeolocationConfig, LocationError};

use crate::types::Coordinate;

/// Options for a single position query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the provider may return
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(20),
            maximum_age: Duration::from_secs(1),
        }
    }
}

impl From<&GeolocationConfig> for PositionOptions {
    fn from(config: &GeolocationConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: Duration::from_millis(config.timeout_ms),
            maximum_age: Duration::from_millis(config.maximum_age_ms),
        }
    }
}

/// Platform positioning service.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self, options: PositionOptions) -> Result<Coordinate, LocationError>;
}

/// Always answers with the same coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

#[async_trait]
impl GeolocationProvider for FixedLocation {
    async fn current_position(&self, _options: PositionOptions) -> Result<Coordinate, LocationError> {
        Ok(self.0)
    }
}

/// Stand-in for hosts with no positioning service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocationService;

#[async_trait]
impl GeolocationProvider for NoLocationService {
    async fn current_position(&self, _options: PositionOptions) -> Result<Coordinate, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// Provider described by the config: the fixed coordinate if set, otherwise none.
pub fn from_config(config: &GeolocationConfig) -> Arc<dyn GeolocationProvider> {
    match config.fixed {
        Some(fixed) => Arc::new(FixedLocation(Coordinate::new(fixed.latitude, fixed.longitude))),
        None => Arc::new(NoLocationService),
    }
}
