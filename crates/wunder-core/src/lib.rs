pub mod config;
pub mod error;

pub use config::{
    Config, ConfigIssue, FixedCoordinate, GeolocationConfig, ReplicaConfig, ValidationReport,
    WeatherConfig,
};
pub use error::{AppError, ConfigError, LocationError, NetworkError, ReplicaError, WeatherError};

use anyhow::Result;

/// Initialize logging for the embedding host.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("WunderBubble core initialized");
    }
    Ok(())
}
