//! Notification history: which (day, location, type) combinations have
//! already been notified.
//!
//! The ledger is append-only and enforces no uniqueness of its own. The
//! at-most-once-per-day guarantee comes from callers checking
//! `was_notified_today` before delivering, or from `record_if_absent`,
//! which performs the check and the append as one step.
//!
//! # Clock injection
//! Time-dependent operations have an `_at` variant taking the current date or
//! timestamp explicitly; the plain variants use the local clock. Tests use the
//! `_at` forms so retention is deterministic.
//!
//! # Persistence
//! Loading is tolerant: a missing file is an empty history, and under
//! `CorruptStateHandling::ResetToEmpty` an unreadable file or invalid records
//! are dropped with a warning. Saving is strict and returns I/O errors.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::NotificationType;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Retention window applied once per run before any evaluation.
pub const DEFAULT_KEEP_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One delivered notification. All fields are persisted as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub date: String,        // "2026-01-09"
    pub location_id: String, // "tokyo_hq"
    pub notification_type: NotificationType,
    pub sent_at: String, // RFC 3339 timestamp
}

impl NotificationRecord {
    fn matches(&self, location_id: &str, kind: &NotificationType, date: &str) -> bool {
        self.date == date && self.location_id == location_id && &self.notification_type == kind
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationHistory {
    records: Vec<NotificationRecord>,
}

impl NotificationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<NotificationRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if any record matches all three fields exactly.
    pub fn was_notified_today(
        &self,
        location_id: &str,
        kind: &NotificationType,
        target_date: NaiveDate,
    ) -> bool {
        let date = format_date(target_date);
        self.records
            .iter()
            .any(|r| r.matches(location_id, kind, &date))
    }

    /// Append a record stamped with the current local time.
    ///
    /// Does not check for duplicates; gate with `was_notified_today` (or an
    /// explicit force override) before calling.
    pub fn add_record(&mut self, location_id: &str, kind: NotificationType, target_date: NaiveDate) {
        self.add_record_at(location_id, kind, target_date, Local::now());
    }

    pub fn add_record_at(
        &mut self,
        location_id: &str,
        kind: NotificationType,
        target_date: NaiveDate,
        sent_at: DateTime<Local>,
    ) {
        self.records.push(NotificationRecord {
            date: format_date(target_date),
            location_id: location_id.to_string(),
            notification_type: kind,
            sent_at: sent_at.to_rfc3339(),
        });
    }

    /// Append a record only if no matching one exists. Returns whether a
    /// record was added.
    pub fn record_if_absent(
        &mut self,
        location_id: &str,
        kind: NotificationType,
        target_date: NaiveDate,
    ) -> bool {
        if self.was_notified_today(location_id, &kind, target_date) {
            return false;
        }
        self.add_record(location_id, kind, target_date);
        true
    }

    /// Drop records older than `keep_days` relative to today's local date.
    pub fn cleanup_old_records(&mut self, keep_days: i64) {
        self.cleanup_old_records_at(keep_days, Local::now().date_naive());
    }

    /// Keep records whose age in days relative to `today` is at most
    /// `keep_days`:
    ///   age <= keep_days  →  kept
    ///   age >  keep_days  →  dropped
    /// Records with an unparsable date are always dropped. Future-dated
    /// records have a negative age and are kept.
    pub fn cleanup_old_records_at(&mut self, keep_days: i64, today: NaiveDate) {
        let before = self.records.len();
        self.records.retain(|record| {
            match NaiveDate::parse_from_str(&record.date, DATE_FORMAT) {
                Ok(date) => (today - date).num_days() <= keep_days,
                Err(_) => false,
            }
        });
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(removed, kept = self.records.len(), keep_days, "pruned notification history");
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// What to do when the persisted history cannot be understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptStateHandling {
    /// Treat an unreadable file as empty and skip invalid records.
    #[default]
    ResetToEmpty,
    /// Surface the problem as `HistoryError::Corrupt`.
    Fail,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("history serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("corrupt history file: {0}")]
    Corrupt(String),
}

#[derive(Serialize)]
struct HistoryFileRef<'a> {
    records: &'a [NotificationRecord],
}

/// Load history with the `ResetToEmpty` policy. Never fails.
pub fn load_history(path: &Path) -> NotificationHistory {
    // ResetToEmpty logs and recovers from every corrupt state itself.
    load_history_with(path, CorruptStateHandling::ResetToEmpty).unwrap_or_default()
}

pub fn load_history_with(
    path: &Path,
    policy: CorruptStateHandling,
) -> Result<NotificationHistory, HistoryError> {
    if !path.exists() {
        debug!(path = %path.display(), "no history file, starting empty");
        return Ok(NotificationHistory::new());
    }

    let corrupt = |reason: String| -> Result<NotificationHistory, HistoryError> {
        match policy {
            CorruptStateHandling::ResetToEmpty => {
                warn!(path = %path.display(), %reason, "history unreadable, starting empty");
                Ok(NotificationHistory::new())
            }
            CorruptStateHandling::Fail => Err(HistoryError::Corrupt(reason)),
        }
    };

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => return corrupt(e.to_string()),
    };

    let data: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => return corrupt(e.to_string()),
    };

    let Some(object) = data.as_object() else {
        return corrupt("top-level value is not an object".to_string());
    };

    let entries = match object.get("records") {
        None => return Ok(NotificationHistory::new()),
        Some(serde_json::Value::Array(entries)) => entries,
        Some(_) => return corrupt("`records` is not an array".to_string()),
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<NotificationRecord>(entry.clone()) {
            Ok(record) => records.push(record),
            Err(e) => match policy {
                CorruptStateHandling::ResetToEmpty => {
                    warn!(index, error = %e, "skipping invalid history record");
                }
                CorruptStateHandling::Fail => {
                    return Err(HistoryError::Corrupt(format!("record {}: {}", index, e)));
                }
            },
        }
    }

    Ok(NotificationHistory::from_records(records))
}

/// Write the history as pretty-printed UTF-8 JSON, replacing the file.
pub fn save_history(history: &NotificationHistory, path: &Path) -> Result<(), HistoryError> {
    let json = serde_json::to_string_pretty(&HistoryFileRef {
        records: history.records(),
    })?;
    fs::write(path, json)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A fixed "today" used across the tests: 2026-01-09.
    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()
    }

    fn days_ago(days: i64) -> NaiveDate {
        fixed_today() - chrono::Duration::days(days)
    }

    fn record(date: &str, location_id: &str, kind: NotificationType) -> NotificationRecord {
        NotificationRecord {
            date: date.to_string(),
            location_id: location_id.to_string(),
            notification_type: kind,
            sent_at: "2026-01-09T07:00:00+09:00".to_string(),
        }
    }

    // --- Dedup check --------------------------------------------------------

    #[test]
    fn test_empty_history_has_no_notifications() {
        let history = NotificationHistory::new();
        assert!(!history.was_notified_today("tokyo_hq", &NotificationType::Rain, fixed_today()));
    }

    #[test]
    fn test_added_record_is_seen_for_same_day_location_and_type() {
        let mut history = NotificationHistory::new();
        history.add_record("tokyo_hq", NotificationType::Rain, fixed_today());

        assert!(history.was_notified_today("tokyo_hq", &NotificationType::Rain, fixed_today()));
        assert!(
            !history.was_notified_today("tokyo_hq", &NotificationType::Weather, fixed_today()),
            "a different type must not be suppressed"
        );
        assert!(
            !history.was_notified_today("osaka_branch", &NotificationType::Rain, fixed_today()),
            "a different location must not be suppressed"
        );
        assert!(
            !history.was_notified_today("tokyo_hq", &NotificationType::Rain, days_ago(1)),
            "a different day must not be suppressed"
        );
    }

    #[test]
    fn test_was_notified_today_is_idempotent() {
        let mut history = NotificationHistory::new();
        history.add_record("tokyo_hq", NotificationType::Weather, fixed_today());
        let first = history.was_notified_today("tokyo_hq", &NotificationType::Weather, fixed_today());
        let second = history.was_notified_today("tokyo_hq", &NotificationType::Weather, fixed_today());
        assert_eq!(first, second);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_add_record_does_not_deduplicate() {
        let mut history = NotificationHistory::new();
        history.add_record("tokyo_hq", NotificationType::Rain, fixed_today());
        history.add_record("tokyo_hq", NotificationType::Rain, fixed_today());
        assert_eq!(history.len(), 2, "the ledger tolerates duplicates");
    }

    #[test]
    fn test_add_record_at_formats_fields() {
        let mut history = NotificationHistory::new();
        let sent_at = Local.with_ymd_and_hms(2026, 1, 9, 7, 30, 0).unwrap();
        history.add_record_at("tokyo_hq", NotificationType::Rain, fixed_today(), sent_at);

        let stored = &history.records()[0];
        assert_eq!(stored.date, "2026-01-09");
        assert_eq!(stored.location_id, "tokyo_hq");
        assert_eq!(stored.notification_type, NotificationType::Rain);
        assert_eq!(stored.sent_at, sent_at.to_rfc3339());
    }

    #[test]
    fn test_record_if_absent_appends_once() {
        let mut history = NotificationHistory::new();
        assert!(history.record_if_absent("tokyo_hq", NotificationType::Rain, fixed_today()));
        assert!(!history.record_if_absent("tokyo_hq", NotificationType::Rain, fixed_today()));
        assert!(history.record_if_absent("tokyo_hq", NotificationType::Weather, fixed_today()));
        assert_eq!(history.len(), 2);
    }

    // --- Retention ----------------------------------------------------------

    #[test]
    fn test_record_exactly_keep_days_old_is_kept() {
        let mut history = NotificationHistory::from_records(vec![record(
            &format_date(days_ago(7)),
            "tokyo_hq",
            NotificationType::Rain,
        )]);
        history.cleanup_old_records_at(7, fixed_today());
        assert_eq!(history.len(), 1, "age == keep_days should be kept (<=, not <)");
    }

    #[test]
    fn test_record_one_day_past_keep_days_is_dropped() {
        let mut history = NotificationHistory::from_records(vec![record(
            &format_date(days_ago(8)),
            "tokyo_hq",
            NotificationType::Rain,
        )]);
        history.cleanup_old_records_at(7, fixed_today());
        assert!(history.is_empty(), "8-day-old record should be dropped with keep_days=7");
    }

    #[test]
    fn test_unparsable_date_is_always_dropped() {
        let mut history = NotificationHistory::from_records(vec![
            record("not-a-date", "tokyo_hq", NotificationType::Rain),
            record("2026/01/09", "tokyo_hq", NotificationType::Rain),
            record("", "tokyo_hq", NotificationType::Rain),
        ]);
        history.cleanup_old_records_at(365, fixed_today());
        assert!(history.is_empty());
    }

    #[test]
    fn test_cleanup_keeps_order_and_future_records() {
        let mut history = NotificationHistory::from_records(vec![
            record("2026-01-10", "a", NotificationType::Rain),
            record("2025-12-01", "b", NotificationType::Rain),
            record("2026-01-09", "c", NotificationType::Weather),
            record("2026-01-05", "d", NotificationType::Rain),
        ]);
        history.cleanup_old_records_at(7, fixed_today());
        let ids: Vec<_> = history.records().iter().map(|r| r.location_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    // --- Persistence --------------------------------------------------------

    #[test]
    fn test_save_then_load_round_trips_records_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");

        let history = NotificationHistory::from_records(vec![
            record("2026-01-08", "tokyo_hq", NotificationType::Rain),
            record("2026-01-09", "osaka_branch", NotificationType::Weather),
            record("2026-01-09", "tokyo_hq", NotificationType::Other("typhoon".to_string())),
        ]);
        save_history(&history, &path).expect("save should succeed");

        let loaded = load_history(&path);
        assert_eq!(loaded, history);
    }

    #[test]
    fn test_saved_file_shape_and_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        let history =
            NotificationHistory::from_records(vec![record("2026-01-09", "東京本社", NotificationType::Rain)]);
        save_history(&history, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("東京本社"), "non-ASCII should be written verbatim");
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["records"][0]["notification_type"], "rain");
        assert_eq!(value["records"][0]["date"], "2026-01-09");
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let history = load_history(&dir.path().join("absent.json"));
        assert!(history.is_empty());
    }

    #[test]
    fn test_malformed_file_resets_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "{ this is not json").unwrap();
        assert!(load_history(&path).is_empty());
    }

    #[test]
    fn test_non_object_file_resets_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_history(&path).is_empty());
    }

    #[test]
    fn test_missing_records_key_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "{}").unwrap();
        assert!(load_history(&path).is_empty());
    }

    #[test]
    fn test_invalid_records_are_skipped_individually() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{"records": [
                {"date": "2026-01-09", "location_id": "tokyo_hq", "notification_type": "rain", "sent_at": "x"},
                {"date": "2026-01-09", "location_id": "tokyo_hq"},
                "garbage",
                {"date": 20260109, "location_id": "a", "notification_type": "rain", "sent_at": "x"},
                {"date": "2026-01-09", "location_id": "osaka_branch", "notification_type": "weather", "sent_at": "y"}
            ]}"#,
        )
        .unwrap();

        let history = load_history(&path);
        let ids: Vec<_> = history.records().iter().map(|r| r.location_id.as_str()).collect();
        assert_eq!(ids, vec!["tokyo_hq", "osaka_branch"]);
    }

    #[test]
    fn test_fail_policy_surfaces_corruption() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();

        let result = load_history_with(&path, CorruptStateHandling::Fail);
        assert!(
            matches!(result, Err(HistoryError::Corrupt(_))),
            "Fail policy should report corruption, got {:?}",
            result
        );
    }

    #[test]
    fn test_fail_policy_rejects_invalid_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"records": [{"date": "2026-01-09"}]}"#).unwrap();

        let result = load_history_with(&path, CorruptStateHandling::Fail);
        assert!(matches!(result, Err(HistoryError::Corrupt(_))));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("no_such_dir").join("history.json");
        let result = save_history(&NotificationHistory::new(), &path);
        assert!(matches!(result, Err(HistoryError::Io(_))));
    }
}
