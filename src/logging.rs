//! Structured logging for the weather alert service
//!
//! Installs a `tracing` subscriber and provides context-rich helpers for
//! per-location failures, classified so that expected feed hiccups stay
//! quiet while configuration problems are loud.

use std::fmt;
use std::io;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::model::{ExtractionError, FetchError};

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Initialize the global subscriber, writing to stderr.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the feed is mid-refresh and will recover on its own
    Expected,
    /// Unexpected failure - indicates a configuration issue or feed format change
    Unexpected,
    /// Unknown - cannot determine if this is transient or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Why a location was skipped for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationFailure {
    Fetch(FetchError),
    Extract(ExtractionError),
}

impl LocationFailure {
    pub fn operation(&self) -> &'static str {
        match self {
            LocationFailure::Fetch(_) => "fetch",
            LocationFailure::Extract(_) => "extract",
        }
    }
}

impl fmt::Display for LocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationFailure::Fetch(e) => fmt::Display::fmt(e, f),
            LocationFailure::Extract(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl From<FetchError> for LocationFailure {
    fn from(e: FetchError) -> Self {
        LocationFailure::Fetch(e)
    }
}

impl From<ExtractionError> for LocationFailure {
    fn from(e: ExtractionError) -> Self {
        LocationFailure::Extract(e)
    }
}

pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        // A 4xx means the prefecture key does not exist on the feed host
        FetchError::Status(code) if (400..500).contains(code) => FailureType::Unexpected,
        FetchError::Status(_) | FetchError::Transport(_) => FailureType::Unknown,
    }
}

pub fn classify_extraction_failure(err: &ExtractionError) -> FailureType {
    match err {
        ExtractionError::AreaNotFound(_) | ExtractionError::MissingPrefectureNode => {
            FailureType::Unexpected
        }
        ExtractionError::MalformedDocument(_) => FailureType::Unknown,
        ExtractionError::MissingInfoNode => FailureType::Expected,
    }
}

pub fn classify_location_failure(failure: &LocationFailure) -> FailureType {
    match failure {
        LocationFailure::Fetch(e) => classify_fetch_failure(e),
        LocationFailure::Extract(e) => classify_extraction_failure(e),
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a skipped location at a level chosen by its classification.
pub fn log_location_failure(location_id: &str, failure: &LocationFailure) {
    let failure_type = classify_location_failure(failure);
    let operation = failure.operation();

    match failure_type {
        FailureType::Expected => debug!(
            location = location_id, operation, failure = %failure_type, error = %failure,
            "location skipped"
        ),
        FailureType::Unexpected => error!(
            location = location_id, operation, failure = %failure_type, error = %failure,
            "location skipped"
        ),
        FailureType::Unknown => warn!(
            location = location_id, operation, failure = %failure_type, error = %failure,
            "location skipped"
        ),
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

pub fn log_run_summary(total_locations: usize, sent: usize, suppressed: usize, skipped: usize) {
    if skipped == 0 {
        info!(total_locations, sent, suppressed, skipped, "run complete");
    } else if skipped == total_locations {
        error!(total_locations, sent, suppressed, skipped, "run complete: every location failed");
    } else {
        warn!(total_locations, sent, suppressed, skipped, "run complete with skipped locations");
    }
}
