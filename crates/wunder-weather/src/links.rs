//! Icon and website URLs for provider data.

use wunder_core::WeatherConfig;

use crate::types::Coordinate;

const FORECAST_PAGE_PATH: &str = "/cgi-bin/findweather/getForecast?query=";

/// Where to load a condition icon from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// No icon was reported; hosts show their bundled "not available" image.
    NotAvailable,
    Url(String),
}

#[derive(Debug, Clone)]
pub struct ProviderLinks {
    icon_base_url: String,
    icon_set: String,
    icon_format: String,
    web_base_url: String,
}

impl ProviderLinks {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            icon_base_url: config.icon_base_url.trim_end_matches('/').to_string(),
            icon_set: config.icon_set.clone(),
            icon_format: config.icon_format.clone(),
            web_base_url: config.web_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `<icon-base>/<icon-set>/<icon-name>.<ext>`
    pub fn icon_url(&self, icon: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            self.icon_base_url, self.icon_set, icon, self.icon_format
        )
    }

    pub fn icon_source(&self, icon: Option<&str>) -> IconSource {
        match icon {
            Some(name) if !name.is_empty() => IconSource::Url(self.icon_url(name)),
            _ => IconSource::NotAvailable,
        }
    }

    /// Provider homepage, or the forecast page for `location`.
    pub fn web_url(&self, location: Option<Coordinate>) -> String {
        match location {
            Some(at) => format!(
                "{}{}{},{}",
                self.web_base_url, FORECAST_PAGE_PATH, at.latitude, at.longitude
            ),
            None => self.web_base_url.clone(),
        }
    }
}

impl Default for ProviderLinks {
    fn default() -> Self {
        Self::new(&WeatherConfig::default())
    }
}
