//! Error types shared by the WunderBubble crates.
//!
//! Each layer has its own enum; all of them fold into `AppError`, whose
//! `user_message()` is what a host puts on screen.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Sharing error: {0}")]
    Replica(#[from] ReplicaError),
}

impl AppError {
    /// Short message for the bubble's UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Location(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Replica(e) => e.user_message(),
        }
    }
}

/// HTTP transport failures.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::Unreachable(_) => "No network connection. Try again once you're back online.",
            NetworkError::Timeout => "The network is slow right now. Try again in a moment.",
            NetworkError::Status { code, .. } if *code >= 500 => {
                "Weather Underground is having trouble. Try again later."
            }
            NetworkError::Status { .. } => "The request was refused. Try again.",
            NetworkError::Malformed(_) => "Got an answer we couldn't read. Try again.",
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return NetworkError::Timeout;
        }
        if err.is_decode() {
            return NetworkError::Malformed(err.to_string());
        }
        match err.status() {
            Some(status) => NetworkError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            },
            None => NetworkError::Unreachable(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "WunderBubble is misconfigured. Check its settings.",
        }
    }
}

/// Position query failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("No location service available")]
    ServiceUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => "Allow location access to share your weather.",
            LocationError::ServiceUnavailable => "This device can't report its location.",
            LocationError::Timeout => "Finding your location took too long. Try again.",
            LocationError::Other(_) => "Your location couldn't be determined.",
        }
    }
}

/// Weather provider failures.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Error object embedded in an otherwise successful reply
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API key rejected")]
    InvalidApiKey,

    #[error("Unreadable reply: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network(e) => e.user_message(),
            WeatherError::Provider(_) => "No weather is available for this spot right now.",
            WeatherError::InvalidApiKey => "The weather API key was rejected. Check settings.",
            WeatherError::Parse(_) => "The weather report couldn't be read. Try again.",
        }
    }
}

/// Replicated status store failures.
#[derive(Debug, Error)]
pub enum ReplicaError {
    #[error("Replica for {0} is gone")]
    Closed(String),

    #[error("Invalid namespace {0:?}")]
    InvalidNamespace(String),

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error(transparent)]
    Transport(#[from] NetworkError),

    #[error("Replica encoding error: {0}")]
    Encoding(String),
}

impl ReplicaError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ReplicaError::Closed(_) => "Sharing has ended for this conversation.",
            ReplicaError::InvalidNamespace(_) => "This bubble can't be shared.",
            ReplicaError::ZeroPollInterval => "WunderBubble is misconfigured. Check its settings.",
            ReplicaError::Transport(e) => e.user_message(),
            ReplicaError::Encoding(_) => "Shared weather couldn't be read.",
        }
    }
}
