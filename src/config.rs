//! Service configuration.
//!
//! The monitored locations and alert rules come from a TOML file; the
//! webhook URL (a bearer secret) and an optional history path override come
//! from the environment, with `.env` honoured.
//!
//! ```toml
//! history_file = "history.json"
//!
//! [rain_notify]
//! enabled = true
//! threshold = 40
//!
//! [weather_notify]
//! enabled = true
//!
//! [[locations]]
//! id = "tokyo_hq"
//! name = "東京本社"
//! prefecture_id = "13"
//! area_id = "東京地方"
//! ```

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::alert::ConditionKeywords;
use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";
pub const ENV_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
pub const ENV_HISTORY_FILE: &str = "HISTORY_FILE_PATH";
pub const DEFAULT_HISTORY_FILE: &str = "history.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

/// A monitored location: one area of one prefecture feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationConfig {
    pub id: String,
    /// Display name used in messages.
    pub name: String,
    /// Feed key, e.g. "13" for Tokyo.
    pub prefecture_id: String,
    /// Area id within the feed, e.g. "東京地方".
    pub area_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RainNotifyConfig {
    pub enabled: bool,
    pub threshold: i32,
}

impl Default for RainNotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WeatherNotifyConfig {
    pub enabled: bool,
    /// Custom keyword list; the default condition table when absent.
    pub keywords: Option<Vec<String>>,
}

impl Default for WeatherNotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: None,
        }
    }
}

impl WeatherNotifyConfig {
    pub fn condition_keywords(&self) -> ConditionKeywords {
        match &self.keywords {
            Some(keywords) => ConditionKeywords::from_keywords(keywords),
            None => ConditionKeywords::default(),
        }
    }
}

/// Timeout and retry policy shared by feed fetch and webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    locations: Vec<LocationConfig>,
    #[serde(default)]
    rain_notify: RainNotifyConfig,
    #[serde(default)]
    weather_notify: WeatherNotifyConfig,
    #[serde(default)]
    http: HttpConfig,
    history_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub locations: Vec<LocationConfig>,
    pub rain_notify: RainNotifyConfig,
    pub weather_notify: WeatherNotifyConfig,
    pub http: HttpConfig,
    pub slack_webhook_url: String,
    pub history_file: PathBuf,
}

impl AppConfig {
    /// Build a configuration from TOML text and already-resolved environment
    /// values. `history_override` takes precedence over `history_file`.
    pub fn from_toml_str(
        text: &str,
        slack_webhook_url: Option<String>,
        history_override: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;

        let slack_webhook_url = slack_webhook_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingEnv(ENV_WEBHOOK_URL))?;

        let history_file = history_override
            .or(file.history_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE));

        let config = AppConfig {
            locations: file.locations,
            rain_notify: file.rain_notify,
            weather_notify: file.weather_notify,
            http: file.http,
            slack_webhook_url,
            history_file,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.locations.is_empty() {
            return Err(ConfigError::Invalid("at least one location is required".to_string()));
        }

        let mut seen = HashSet::new();
        for location in &self.locations {
            let fields = [
                ("id", &location.id),
                ("name", &location.name),
                ("prefecture_id", &location.prefecture_id),
                ("area_id", &location.area_id),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "location '{}' has an empty {}",
                    location.id, field
                )));
            }
            if !seen.insert(location.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate location id '{}'",
                    location.id
                )));
            }
        }

        if !(0..=100).contains(&self.rain_notify.threshold) {
            return Err(ConfigError::Invalid(format!(
                "rain_notify.threshold must be 0-100, got {}",
                self.rain_notify.threshold
            )));
        }

        if self.http.max_retries == 0 {
            return Err(ConfigError::Invalid("http.max_retries must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Load the config file at `path`, resolving the webhook URL and history
/// path from the environment (after loading `.env`, if present).
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    dotenv::dotenv().ok();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    AppConfig::from_toml_str(
        &text,
        env::var(ENV_WEBHOOK_URL).ok(),
        env::var(ENV_HISTORY_FILE).ok().map(PathBuf::from),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
