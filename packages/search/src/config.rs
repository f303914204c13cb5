//! Search configuration loaded from TOML.
//!
//! A default configuration is embedded at compile time from
//! `config/default.toml`. A user file replaces it entirely, and the
//! `SPOTTED_BASE_URL` and `SPOTTED_CITY` environment variables override the
//! backend URL and the city last.

use std::path::Path;

use serde::Deserialize;

use crate::SearchError;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Environment variable overriding [`BackendConfig::base_url`].
pub const BASE_URL_ENV: &str = "SPOTTED_BASE_URL";

/// Environment variable overriding [`SearchDefaults::city`].
pub const CITY_ENV: &str = "SPOTTED_CITY";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Backend connection settings.
    pub backend: BackendConfig,
    /// Defaults applied to every round.
    pub search: SearchDefaults,
}

/// How to reach the spatial backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL, without a trailing slash (e.g. `"http://localhost:8080"`).
    pub base_url: String,
    /// Per-request timeout in seconds; `None` waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Per-round defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchDefaults {
    /// City whose index is searched.
    pub city: String,
    /// Whether circle searches match points outside the circle.
    #[serde(default)]
    pub external: bool,
}

impl SearchConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the text is not a valid
    /// configuration.
    pub fn from_toml(text: &str) -> Result<Self, SearchError> {
        let mut config: Self = toml::de::from_str(text).map_err(|e| SearchError::Config {
            message: e.to_string(),
        })?;
        config.backend.base_url = config.backend.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// The embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, SearchError> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, SearchError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Loads `path` if given, else the embedded default, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the configuration cannot be read or
    /// parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, SearchError> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::embedded()?,
        };
        config.apply_overrides(
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(CITY_ENV).ok(),
        );
        Ok(config)
    }

    /// Replaces the base URL and city with non-empty override values.
    pub fn apply_overrides(&mut self, base_url: Option<String>, city: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.is_empty()) {
            log::debug!("Backend URL overridden to {url}");
            self.backend.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(city) = city.filter(|c| !c.is_empty()) {
            log::debug!("City overridden to {city}");
            self.search.city = city;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = SearchConfig::embedded().unwrap();
        assert!(!config.backend.base_url.is_empty());
        assert!(!config.backend.base_url.ends_with('/'));
        assert!(!config.search.city.is_empty());
        assert!(!config.search.external);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = SearchConfig::from_toml(
            r#"
            [backend]
            base_url = "https://orion.example.org/"

            [search]
            city = "Santander"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "https://orion.example.org");
        assert_eq!(config.backend.timeout_secs, None);
        assert_eq!(config.search.city, "Santander");
    }

    #[test]
    fn overrides_replace_non_empty_values() {
        let mut config = SearchConfig::embedded().unwrap();
        config.apply_overrides(Some("http://10.0.0.1:9000/".to_string()), Some(String::new()));
        assert_eq!(config.backend.base_url, "http://10.0.0.1:9000");
        assert_eq!(config.search.city, "Helsinki");
    }

    #[test]
    fn missing_section_is_an_error() {
        assert!(matches!(
            SearchConfig::from_toml("[backend]\nbase_url = \"x\"\n"),
            Err(SearchError::Config { .. })
        ));
    }
}
