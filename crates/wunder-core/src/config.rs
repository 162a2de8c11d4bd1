use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Placeholder written into fresh config files until a real key is supplied.
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY";

/// One problem found by `Config::validate`, tied to the offending key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Problems found in a configuration. Errors block startup; warnings only
/// degrade it (no forecasts, no sharing).
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    fn warn(&mut self, field: &'static str, message: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    /// Errors on one line, for `ConfigError::Invalid`.
    pub fn error_summary(&self) -> String {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        parts.join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Position query settings
    #[serde(default)]
    pub geolocation: GeolocationConfig,

    /// Status replication settings
    #[serde(default)]
    pub replica: ReplicaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the combined conditions/forecast API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Provider API key (path segment of every request)
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base URL of the condition icon sets
    #[serde(default = "default_icon_base_url")]
    pub icon_base_url: String,

    /// Icon set name (one path segment)
    #[serde(default = "default_icon_set")]
    pub icon_set: String,

    /// Icon file extension, without the dot
    #[serde(default = "default_icon_format")]
    pub icon_format: String,

    /// Provider website, used for "open in browser" links
    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,
}

fn default_api_base_url() -> String {
    "https://api.wunderground.com/api/".to_string()
}

fn default_api_key() -> String {
    std::env::var("WUNDER_API_KEY").unwrap_or_else(|_| API_KEY_PLACEHOLDER.to_string())
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_icon_base_url() -> String {
    "https://icons.wxug.com/i/c/".to_string()
}

fn default_icon_set() -> String {
    "k".to_string()
}

fn default_icon_format() -> String {
    "gif".to_string()
}

fn default_web_base_url() -> String {
    "https://www.wunderground.com".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: default_api_key(),
            request_timeout_secs: default_request_timeout_secs(),
            icon_base_url: default_icon_base_url(),
            icon_set: default_icon_set(),
            icon_format: default_icon_format(),
            web_base_url: default_web_base_url(),
        }
    }
}

impl WeatherConfig {
    /// Check if the API key is set (not the placeholder)
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != API_KEY_PLACEHOLDER
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A configured coordinate for hosts without a positioning service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,

    /// Upper bound for a single position query
    #[serde(default = "default_geolocation_timeout_ms")]
    pub timeout_ms: u64,

    /// Oldest cached position the provider may hand back
    #[serde(default = "default_maximum_age_ms")]
    pub maximum_age_ms: u64,

    #[serde(default)]
    pub fixed: Option<FixedCoordinate>,
}

fn default_high_accuracy() -> bool {
    true
}

fn default_geolocation_timeout_ms() -> u64 {
    20_000
}

fn default_maximum_age_ms() -> u64 {
    1_000
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: default_high_accuracy(),
            timeout_ms: default_geolocation_timeout_ms(),
            maximum_age_ms: default_maximum_age_ms(),
            fixed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Root of the REST replica (e.g. a realtime database URL); unset keeps
    /// statuses in memory only
    #[serde(default)]
    pub base_url: Option<String>,

    /// How often the REST replica is polled for snapshots
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl ReplicaConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Config {
    /// `wunderbubble/config.toml` under the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("No platform config directory")?;
        Ok(dir.join("wunderbubble").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Read `path`. A missing file is created with the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Malformed config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Writing default config to {}", path.display());
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => {
                Err(e).with_context(|| format!("Cannot read config file {}", path.display()))
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Config does not serialize")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Cannot write config file {}", path.display()))
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let urls = [
            ("weather.api_base_url", Some(&self.weather.api_base_url)),
            ("weather.icon_base_url", Some(&self.weather.icon_base_url)),
            ("weather.web_base_url", Some(&self.weather.web_base_url)),
            ("replica.base_url", self.replica.base_url.as_ref()),
        ];
        for (field, url) in urls {
            if let Some(problem) = url.and_then(|u| http_url_problem(u)) {
                report.error(field, problem);
            }
        }

        if !self.weather.has_api_key() {
            report.warn("weather.api_key", "no API key set, forecasts will fail");
        }
        if self.weather.request_timeout_secs == 0 {
            report.error("weather.request_timeout_secs", "must be greater than 0");
        }
        if self.weather.icon_set.is_empty() || self.weather.icon_set.contains('/') {
            report.error("weather.icon_set", "must be a single path segment");
        }

        if self.geolocation.timeout_ms == 0 {
            report.error("geolocation.timeout_ms", "must be greater than 0");
        }
        if let Some(fixed) = self.geolocation.fixed {
            if !(-90.0..=90.0).contains(&fixed.latitude)
                || !(-180.0..=180.0).contains(&fixed.longitude)
            {
                report.error("geolocation.fixed", "coordinate out of range");
            }
        }

        if self.replica.base_url.is_none() {
            report.warn("replica", "no replica set, statuses stay on this device");
        } else if self.replica.poll_interval_secs == 0 {
            report.error("replica.poll_interval_secs", "must be greater than 0");
        }

        report
    }
}

/// Why `raw` isn't a usable http(s) endpoint, if it isn't.
fn http_url_problem(raw: &str) -> Option<String> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => return Some(format!("not a URL ({})", e)),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Some(format!("expected http or https, got {}", url.scheme()));
    }
    if url.host().is_none() {
        return Some("missing host".to_string());
    }
    None
}
