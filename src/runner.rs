//! One notification cycle over every configured location.
//!
//! For each location, in configured order: fetch the prefecture feed,
//! extract the area forecast, evaluate every enabled alert type unless it was
//! already notified today (or `force` is set), then deliver each alert and
//! record the delivery in the history immediately.
//!
//! Fetch and extraction failures skip the location. A delivery failure stops
//! the run; the history is still saved so deliveries that already went out
//! are not repeated by the next run.

use std::path::Path;

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};

use crate::alert::{ConditionKeywords, check_rain_alert, check_weather_alert};
use crate::config::{AppConfig, LocationConfig};
use crate::history::{DEFAULT_KEEP_DAYS, NotificationHistory, load_history, save_history};
use crate::ingest::drk7::{FeedSource, parse_forecast};
use crate::logging::{self, LocationFailure};
use crate::model::{DeliveryError, NotificationType, WeatherForecast};
use crate::notify::Notifier;
use crate::notify::format::{ConditionEmoji, format_rain_message, format_weather_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Evaluate and log, but neither deliver nor touch the history file.
    pub dry_run: bool,
    /// Ignore the history when deciding whether to evaluate.
    pub force: bool,
    /// The day notifications are recorded against.
    pub today: NaiveDate,
    pub keep_days: i64,
}

impl RunOptions {
    pub fn new(dry_run: bool, force: bool) -> Self {
        Self {
            dry_run,
            force,
            today: Local::now().date_naive(),
            keep_days: DEFAULT_KEEP_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Notifications delivered and recorded.
    pub sent: usize,
    /// Alert types skipped because they were already notified today.
    pub suppressed: usize,
    /// Locations skipped because of fetch or extraction failures.
    pub skipped_locations: usize,
    /// Messages printed instead of delivered in dry-run mode.
    pub previews: usize,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to deliver {kind} notification for {location_id}: {source}")]
    Delivery {
        location_id: String,
        kind: NotificationType,
        source: DeliveryError,
    },
}

pub struct Runner<'a, F: FeedSource, N: Notifier> {
    config: &'a AppConfig,
    feed: &'a F,
    notifier: &'a N,
    keywords: ConditionKeywords,
    emoji: ConditionEmoji,
}

impl<'a, F: FeedSource, N: Notifier> Runner<'a, F, N> {
    pub fn new(config: &'a AppConfig, feed: &'a F, notifier: &'a N) -> Self {
        Self {
            config,
            feed,
            notifier,
            keywords: config.weather_notify.condition_keywords(),
            emoji: ConditionEmoji::default(),
        }
    }

    pub fn with_emoji(mut self, emoji: ConditionEmoji) -> Self {
        self.emoji = emoji;
        self
    }

    /// Load the history, prune it, process every location, and persist the
    /// history if anything was delivered.
    pub fn run_cycle(&self, options: &RunOptions) -> Result<RunSummary, RunError> {
        let path = self.config.history_file.as_path();
        let mut history = load_history(path);
        info!(records = history.len(), path = %path.display(), "loaded notification history");

        history.cleanup_old_records_at(options.keep_days, options.today);

        let mut summary = RunSummary::default();
        let outcome = self.process_locations(&mut history, &mut summary, options);

        if !options.dry_run && summary.sent > 0 {
            persist(&history, path);
        }

        logging::log_run_summary(
            self.config.locations.len(),
            summary.sent,
            summary.suppressed,
            summary.skipped_locations,
        );

        outcome.map(|()| summary)
    }

    /// Process every location against an in-memory history.
    pub fn process_locations(
        &self,
        history: &mut NotificationHistory,
        summary: &mut RunSummary,
        options: &RunOptions,
    ) -> Result<(), RunError> {
        for location in &self.config.locations {
            let forecast = match self.load_forecast(location) {
                Ok(forecast) => forecast,
                Err(failure) => {
                    logging::log_location_failure(&location.id, &failure);
                    summary.skipped_locations += 1;
                    continue;
                }
            };

            log_forecast(location, &forecast);

            // Both types are decided before either is delivered.
            let mut pending = Vec::new();
            if self.config.rain_notify.enabled {
                if let Some(message) =
                    self.evaluate_rain(location, &forecast, history, summary, options)
                {
                    pending.push((NotificationType::Rain, message));
                }
            }
            if self.config.weather_notify.enabled {
                if let Some(message) =
                    self.evaluate_weather(location, &forecast, history, summary, options)
                {
                    pending.push((NotificationType::Weather, message));
                }
            }

            for (kind, message) in pending {
                self.dispatch(location, kind, &message, history, summary, options)?;
            }
        }
        Ok(())
    }

    fn load_forecast(&self, location: &LocationConfig) -> Result<WeatherForecast, LocationFailure> {
        info!(location = %location.id, name = %location.name, prefecture = %location.prefecture_id, "fetching forecast");
        let document = self.feed.fetch(&location.prefecture_id)?;
        Ok(parse_forecast(&document, &location.area_id)?)
    }

    fn already_notified(
        &self,
        location: &LocationConfig,
        kind: &NotificationType,
        history: &NotificationHistory,
        options: &RunOptions,
    ) -> bool {
        !options.force && history.was_notified_today(&location.id, kind, options.today)
    }

    fn evaluate_rain(
        &self,
        location: &LocationConfig,
        forecast: &WeatherForecast,
        history: &NotificationHistory,
        summary: &mut RunSummary,
        options: &RunOptions,
    ) -> Option<String> {
        if self.already_notified(location, &NotificationType::Rain, history, options) {
            info!(location = %location.id, kind = "rain", "already notified today");
            summary.suppressed += 1;
            return None;
        }

        let threshold = self.config.rain_notify.threshold;
        match check_rain_alert(forecast, threshold, &location.name) {
            Some(alert) => {
                let periods: Vec<&str> =
                    alert.alert_periods.iter().map(|p| p.hour_range.as_str()).collect();
                info!(location = %location.id, threshold, periods = ?periods, "rain alert");
                Some(format_rain_message(&alert))
            }
            None => {
                info!(location = %location.id, threshold, "rain probability below threshold");
                None
            }
        }
    }

    fn evaluate_weather(
        &self,
        location: &LocationConfig,
        forecast: &WeatherForecast,
        history: &NotificationHistory,
        summary: &mut RunSummary,
        options: &RunOptions,
    ) -> Option<String> {
        if self.already_notified(location, &NotificationType::Weather, history, options) {
            info!(location = %location.id, kind = "weather", "already notified today");
            summary.suppressed += 1;
            return None;
        }

        match check_weather_alert(forecast, &location.name, &self.keywords) {
            Some(alert) => {
                info!(location = %location.id, conditions = ?alert.detected_conditions, "weather alert");
                Some(format_weather_message(&alert, &self.emoji))
            }
            None => {
                info!(location = %location.id, "no special weather");
                None
            }
        }
    }

    fn dispatch(
        &self,
        location: &LocationConfig,
        kind: NotificationType,
        message: &str,
        history: &mut NotificationHistory,
        summary: &mut RunSummary,
        options: &RunOptions,
    ) -> Result<(), RunError> {
        if options.dry_run {
            info!(location = %location.id, kind = %kind, "[DRY-RUN] notification not sent");
            println!("{}", "-".repeat(40));
            println!("{}", message);
            println!("{}", "-".repeat(40));
            summary.previews += 1;
            return Ok(());
        }

        self.notifier
            .deliver(message)
            .map_err(|source| RunError::Delivery {
                location_id: location.id.clone(),
                kind: kind.clone(),
                source,
            })?;

        info!(location = %location.id, kind = %kind, "notification sent");
        history.add_record(&location.id, kind, options.today);
        summary.sent += 1;
        Ok(())
    }
}

fn log_forecast(location: &LocationConfig, forecast: &WeatherForecast) {
    let rainfall = forecast
        .rainfall_periods
        .iter()
        .map(|p| format!("{}={}%", p.hour_range, p.probability))
        .collect::<Vec<_>>()
        .join(", ");
    info!(
        location = %location.id,
        date = %forecast.date,
        rainfall = %rainfall,
        detail = %forecast.weather_detail,
        "forecast extracted"
    );
}

fn persist(history: &NotificationHistory, path: &Path) {
    match save_history(history, path) {
        Ok(()) => info!(records = history.len(), path = %path.display(), "history saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to save history"),
    }
}
