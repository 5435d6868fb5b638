//! Message text for rain and weather alerts.
//!
//! Output is Slack mrkdwn: emoji shortcodes plus fenced blocks for the
//! rainfall table and the forecast detail.

use crate::model::{RainAlert, RainfallPeriod, WeatherAlert};

/// Default condition label → emoji shortcode table, in lookup order.
pub const DEFAULT_CONDITION_EMOJI: &[(&str, &str)] = &[
    ("雷", ":zap:"),
    ("雪", ":snowflake:"),
    ("みぞれ", ":cloud_with_snow:"),
    ("あられ", ":cloud_with_snow:"),
    ("ひょう", ":cloud_with_snow:"),
    ("暴風", ":dash:"),
    ("大雨", ":rain_cloud:"),
    ("大雪", ":snowflake:"),
];

pub const FALLBACK_EMOJI: &str = ":warning:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionEmoji {
    entries: Vec<(String, String)>,
}

impl Default for ConditionEmoji {
    fn default() -> Self {
        Self {
            entries: DEFAULT_CONDITION_EMOJI
                .iter()
                .map(|(label, emoji)| (label.to_string(), emoji.to_string()))
                .collect(),
        }
    }
}

impl ConditionEmoji {
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, emoji)| emoji.as_str())
    }

    /// Emoji of the first condition that has one, else `FALLBACK_EMOJI`.
    pub fn for_conditions(&self, conditions: &[String]) -> &str {
        conditions
            .iter()
            .find_map(|c| self.get(c))
            .unwrap_or(FALLBACK_EMOJI)
    }
}

fn format_rainfall_table(periods: &[RainfallPeriod]) -> String {
    let mut lines = vec![
        "```".to_string(),
        "+----------+------+".to_string(),
        "|  時間帯  | 確率 |".to_string(),
        "+----------+------+".to_string(),
    ];

    for period in periods {
        let hour = format!("{}時", period.hour_range);
        let prob = format!("{}%", period.probability);
        lines.push(format!("| {:^8} | {:>4} |", hour, prob));
    }

    lines.push("+----------+------+".to_string());
    lines.push("```".to_string());
    lines.join("\n")
}

pub fn format_rain_message(alert: &RainAlert) -> String {
    [
        format!(":umbrella_with_rain_drops: {} - 雨の可能性があります", alert.location_name),
        String::new(),
        format!(":round_pushpin: {}の降水確率", alert.area),
        format_rainfall_table(&alert.alert_periods),
        String::new(),
        "傘をお忘れなく！".to_string(),
    ]
    .join("\n")
}

pub fn format_weather_message(alert: &WeatherAlert, emoji: &ConditionEmoji) -> String {
    let icon = emoji.for_conditions(&alert.detected_conditions);
    let conditions = alert.detected_conditions.join("・");

    [
        format!("{} {} - {}の予報", icon, alert.location_name, conditions),
        String::new(),
        format!(":round_pushpin: {}", alert.area),
        format!("```{}```", alert.weather_detail),
        String::new(),
        "お出かけの際はご注意ください。".to_string(),
    ]
    .join("\n")
}
