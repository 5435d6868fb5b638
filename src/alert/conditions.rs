//! Special weather condition detection (thunder, snow, sleet, ...).
//!
//! The forecast's free-text detail is scanned for keywords. Several keywords
//! map onto one display label (kana and kanji spellings of sleet, hail and
//! graupel), and the order of the keyword table decides the order of the
//! detected labels.

use crate::model::{WeatherAlert, WeatherForecast};

/// Default keyword → label table, in scan order.
pub const DEFAULT_CONDITION_KEYWORDS: &[(&str, &str)] = &[
    ("雷", "雷"),
    ("雪", "雪"),
    ("みぞれ", "みぞれ"),
    ("霙", "みぞれ"),
    ("あられ", "あられ"),
    ("霰", "あられ"),
    ("ひょう", "ひょう"),
    ("雹", "ひょう"),
    ("暴風", "暴風"),
    ("大雨", "大雨"),
    ("大雪", "大雪"),
];

/// Ordered keyword table used by `check_weather_alert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionKeywords {
    entries: Vec<(String, String)>,
}

impl Default for ConditionKeywords {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_CONDITION_KEYWORDS.iter().copied())
    }
}

impl ConditionKeywords {
    pub fn from_pairs<K, L>(pairs: impl IntoIterator<Item = (K, L)>) -> Self
    where
        K: Into<String>,
        L: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, l)| (k.into(), l.into()))
                .collect(),
        }
    }

    /// Build a table from a keyword list. Keywords known to the default
    /// table keep their canonical label; any other keyword is its own label.
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self::from_pairs(keywords.iter().map(|keyword| {
            let keyword = keyword.as_ref();
            let label = DEFAULT_CONDITION_KEYWORDS
                .iter()
                .find(|(k, _)| *k == keyword)
                .map(|(_, label)| *label)
                .unwrap_or(keyword);
            (keyword.to_string(), label.to_string())
        }))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels whose keywords appear in `text`, in table order, deduplicated.
    pub fn detect(&self, text: &str) -> Vec<String> {
        let mut detected: Vec<String> = Vec::new();
        for (keyword, label) in &self.entries {
            if text.contains(keyword.as_str()) && !detected.contains(label) {
                detected.push(label.clone());
            }
        }
        detected
    }
}

/// Returns a weather alert if the forecast detail mentions any condition in
/// `keywords`, or `None` when nothing matches.
pub fn check_weather_alert(
    forecast: &WeatherForecast,
    location_name: &str,
    keywords: &ConditionKeywords,
) -> Option<WeatherAlert> {
    let detected_conditions = keywords.detect(&forecast.weather_detail);
    if detected_conditions.is_empty() {
        return None;
    }

    Some(WeatherAlert {
        location_name: location_name.to_string(),
        area: forecast.area.clone(),
        date: forecast.date.clone(),
        weather_detail: forecast.weather_detail.clone(),
        detected_conditions,
    })
}
