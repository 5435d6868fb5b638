//! Core data types for the weather alert service.
//!
//! This module defines the shared domain model imported by all other modules:
//! the normalized forecast extracted from a prefecture feed, the alerts
//! derived from it, and the error taxonomy for each stage of a run.
//! It contains no logic and no I/O beyond trivial conversions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Forecast types
// ---------------------------------------------------------------------------

/// Rain probability for one time slot of the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RainfallPeriod {
    pub hour_range: String, // "00-06", "06-12", "12-18", "18-24"
    pub probability: i32,   // "-" and unparsable text normalize to 0
}

impl RainfallPeriod {
    pub fn new(hour_range: impl Into<String>, probability: i32) -> Self {
        Self {
            hour_range: hour_range.into(),
            probability,
        }
    }
}

/// Today's forecast for a single area of a prefecture feed.
///
/// `rainfall_periods` keeps feed order and may be empty; extraction never
/// fabricates periods. Temperatures are `None` whenever the feed value is
/// missing or unparsable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherForecast {
    pub prefecture: String,
    pub area: String,
    pub date: String, // feed-native, e.g. "2026/01/09"
    pub weather_summary: String,
    pub weather_detail: String,
    pub temp_max: Option<i32>,
    pub temp_min: Option<i32>,
    pub rainfall_periods: Vec<RainfallPeriod>,
}

// ---------------------------------------------------------------------------
// Alert types
// ---------------------------------------------------------------------------

/// Raised when at least one period reaches the rain threshold.
///
/// `alert_periods` holds only the qualifying periods, in feed order, and is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RainAlert {
    pub location_name: String,
    pub area: String,
    pub date: String,
    pub alert_periods: Vec<RainfallPeriod>,
}

/// Raised when the forecast detail mentions a special weather condition
/// (thunder, snow, sleet, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherAlert {
    pub location_name: String,
    pub area: String,
    pub date: String,
    pub weather_detail: String,
    /// Canonical labels in first-seen keyword order, without duplicates.
    pub detected_conditions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Notification type
// ---------------------------------------------------------------------------

/// Kind of notification recorded in the history ledger.
///
/// Persisted as a lowercase string. Strings other than `rain` and `weather`
/// survive a load/save cycle as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    Rain,
    Weather,
    Other(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Rain => "rain",
            NotificationType::Weather => "weather",
            NotificationType::Other(name) => name,
        }
    }
}

impl From<&str> for NotificationType {
    fn from(value: &str) -> Self {
        match value {
            "rain" => NotificationType::Rain,
            "weather" => NotificationType::Weather,
            other => NotificationType::Other(other.to_string()),
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        NotificationType::from(value.as_str())
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Structural problems that prevent a forecast from being extracted.
///
/// All variants are fatal for the location being processed and never for
/// the run as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The document is not well-formed XML.
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    /// No `pref` element exists below the document root.
    #[error("pref element not found")]
    MissingPrefectureNode,
    /// The prefecture has no area with the requested id.
    #[error("area not found: {0}")]
    AreaNotFound(String),
    /// The area exists but carries no forecast entries.
    #[error("info element not found")]
    MissingInfoNode,
}

/// Failure to retrieve a feed document after exhausting retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-2xx HTTP response from the feed host.
    #[error("HTTP error: {0}")]
    Status(u16),
    /// Connection, timeout, or body decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure to deliver a notification after exhausting retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The webhook answered with something other than 200.
    #[error("webhook rejected message: HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}
