//! drk7 prefecture forecast feed client and extractor.
//!
//! Retrieves the per-prefecture weather XML published at drk7.jp and
//! extracts today's forecast for a single area.
//!
//! Feed: https://www.drk7.jp/weather/xml/{prefecture_id}.xml
//!
//! Document shape:
//!   weatherforecast > pref[id] > area[id] > info[date]
//!     > weather, weather_detail
//!     > temperature > range[centigrade="max"|"min"]
//!     > rainfallchance > period[hour]

use std::time::Duration;

use crate::ingest::xml::{Element, parse_document};
use crate::model::{ExtractionError, FetchError, RainfallPeriod, WeatherForecast};
use crate::retry::RetryPolicy;

pub const DRK7_BASE_URL: &str = "https://www.drk7.jp/weather/xml";

// ============================================================================
// Fetching
// ============================================================================

/// Source of raw feed documents, keyed by prefecture.
///
/// Implementations own their transport, timeout and retry policy; a returned
/// error means every attempt has already been exhausted.
pub trait FeedSource {
    fn fetch(&self, prefecture_id: &str) -> Result<String, FetchError>;
}

pub fn build_feed_url(base_url: &str, prefecture_id: &str) -> String {
    format!("{}/{}.xml", base_url.trim_end_matches('/'), prefecture_id)
}

/// Blocking HTTP client for the drk7 feed.
pub struct Drk7Feed {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl Drk7Feed {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: DRK7_BASE_URL.to_string(),
            retry,
        })
    }

    /// Point the client at a different host (mirrors, local fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

impl FeedSource for Drk7Feed {
    fn fetch(&self, prefecture_id: &str) -> Result<String, FetchError> {
        let url = build_feed_url(&self.base_url, prefecture_id);
        self.retry.run("fetch_feed", |_| self.fetch_once(&url))
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Convert rain probability text to a percentage.
///
/// `"-"`, empty and non-numeric text normalize to 0. Any other integer,
/// negative included, is kept as is.
pub fn parse_rainfall_probability(value: &str) -> i32 {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        return 0;
    }
    value.parse().unwrap_or(0)
}

fn parse_temperature(text: &str) -> Option<i32> {
    text.trim().parse().ok()
}

/// Scan `range` entries for the max/min tagged temperatures. An entry that
/// fails to parse leaves its field absent.
fn extract_temperatures(info: &Element) -> (Option<i32>, Option<i32>) {
    let mut temp_max = None;
    let mut temp_min = None;

    if let Some(temperature) = info.child("temperature") {
        for range in temperature.children_named("range") {
            let value = parse_temperature(&range.text);
            match range.attr("centigrade") {
                Some("max") => temp_max = value,
                Some("min") => temp_min = value,
                _ => {}
            }
        }
    }

    (temp_max, temp_min)
}

fn extract_rainfall_periods(info: &Element) -> Vec<RainfallPeriod> {
    info.child("rainfallchance")
        .map(|chance| {
            chance
                .children_named("period")
                .map(|period| RainfallPeriod {
                    hour_range: period.attr("hour").unwrap_or("").to_string(),
                    probability: parse_rainfall_probability(&period.text),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Extract today's forecast for `area_id` from a prefecture feed document.
///
/// Structural checks run in order and fail fast: well-formed XML, a `pref`
/// element, an `area` child whose `id` equals `area_id` (first match wins),
/// and at least one `info` entry. Once those pass, extraction cannot fail;
/// missing text fields become empty strings and bad temperatures `None`.
pub fn parse_forecast(document: &str, area_id: &str) -> Result<WeatherForecast, ExtractionError> {
    let root = parse_document(document)?;

    let pref = root
        .find_descendant("pref")
        .ok_or(ExtractionError::MissingPrefectureNode)?;

    let area = pref
        .children_named("area")
        .find(|a| a.attr("id") == Some(area_id))
        .ok_or_else(|| ExtractionError::AreaNotFound(area_id.to_string()))?;

    // The first info entry is today's forecast.
    let info = area.child("info").ok_or(ExtractionError::MissingInfoNode)?;

    let (temp_max, temp_min) = extract_temperatures(info);

    Ok(WeatherForecast {
        prefecture: pref.attr("id").unwrap_or("").to_string(),
        area: area_id.to_string(),
        date: info.attr("date").unwrap_or("").to_string(),
        weather_summary: info.child_text("weather").to_string(),
        weather_detail: info.child_text("weather_detail").to_string(),
        temp_max,
        temp_min,
        rainfall_periods: extract_rainfall_periods(info),
    })
}

// ============================================================================
// Tests
// ============================================================================


// ---------------------------------------------------------------------------
// Live feed check
// ---------------------------------------------------------------------------
//
// Marked #[ignore] so normal test runs don't depend on drk7.jp availability.
// Run manually with:
//   cargo test -- --ignored live_feed
