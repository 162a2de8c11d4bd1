//! Locate-and-forecast pipeline.
//!
//! One run asks the positioning service for a fix, requests weather for it,
//! normalizes the reply, and records it in the payload store. Runs never
//! overlap: a request made while one is in flight is dropped.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use wunder_core::{AppError, LocationError, WeatherError};
use wunder_payload::{PayloadStore, StatusWrite};
use wunder_weather::{normalize, GeolocationProvider, PositionOptions, WeatherClient};

use crate::fetch_state::FetchState;

/// Why a run was abandoned.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Weather(#[from] WeatherError),
}

impl FetchError {
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Location(e) => e.user_message(),
            FetchError::Weather(e) => e.user_message(),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Location(e) => AppError::Location(e),
            FetchError::Weather(e) => AppError::Weather(e),
        }
    }
}

/// Terminal outcome of `locate_and_forecast`.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Another run was in flight, or the run was not allowed to start
    Skipped,
    Completed(StatusWrite),
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, FetchOutcome::Completed(_))
    }
}

/// Last abandoned run, kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub detail: String,
    pub user_message: &'static str,
}

impl From<&FetchError> for FetchFailure {
    fn from(err: &FetchError) -> Self {
        Self {
            detail: err.to_string(),
            user_message: err.user_message(),
        }
    }
}

/// Resets the state to idle however the run ends, including when the run's
/// future is dropped before completing.
struct InFlight {
    state: Arc<Mutex<FetchState>>,
}

impl InFlight {
    fn acquire(state: &Arc<Mutex<FetchState>>) -> Option<Self> {
        let mut current = state.lock();
        if !current.can_start() {
            return None;
        }
        *current = FetchState::Fetching;
        Some(Self {
            state: state.clone(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut current = self.state.lock();
        *current = current.on_done();
    }
}

/// Single-flight weather acquisition for one session. Clones share the
/// in-flight flag.
#[derive(Clone)]
pub struct FetchOrchestrator {
    state: Arc<Mutex<FetchState>>,
    last_failure: Arc<Mutex<Option<FetchFailure>>>,
    geolocation: Arc<dyn GeolocationProvider>,
    weather: Arc<dyn WeatherClient>,
    store: PayloadStore,
    options: PositionOptions,
}

impl FetchOrchestrator {
    pub fn new(
        geolocation: Arc<dyn GeolocationProvider>,
        weather: Arc<dyn WeatherClient>,
        store: PayloadStore,
        options: PositionOptions,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(FetchState::Idle)),
            last_failure: Arc::new(Mutex::new(None)),
            geolocation,
            weather,
            store,
            options,
        }
    }

    pub fn state(&self) -> FetchState {
        *self.state.lock()
    }

    pub fn is_fetching(&self) -> bool {
        self.state() == FetchState::Fetching
    }

    /// The most recent failure, cleared by the next completed run.
    pub fn last_failure(&self) -> Option<FetchFailure> {
        self.last_failure.lock().clone()
    }

    /// Run the pipeline unless one is already in flight.
    ///
    /// Failures leave the store untouched; there is no retry.
    pub async fn locate_and_forecast(&self) -> FetchOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.state) else {
            tracing::debug!("Weather update already in flight");
            return FetchOutcome::Skipped;
        };

        match self.run().await {
            Ok(write) => {
                *self.last_failure.lock() = None;
                FetchOutcome::Completed(write)
            }
            Err(e) => {
                tracing::warn!("Weather update abandoned: {}", e);
                *self.last_failure.lock() = Some(FetchFailure::from(&e));
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn run(&self) -> Result<StatusWrite, FetchError> {
        // Bounded here too, in case the provider ignores its own timeout.
        let position = tokio::time::timeout(
            self.options.timeout,
            self.geolocation.current_position(self.options),
        )
        .await
        .map_err(|_| LocationError::Timeout)??;
        tracing::info!("Got location: {}, {}", position.latitude, position.longitude);

        let response = self.weather.fetch(position).await?;
        let observation = normalize(&response);
        tracing::debug!("Weather for {:?}", observation.city);

        Ok(self.store.record_observation(observation))
    }
}
