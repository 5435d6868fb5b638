//! Location Verification Module
//!
//! Checks every configured location against the live feed to determine
//! which prefecture/area pairs are reachable and returning rainfall data.
//!
//! Use this after editing the location list, before relying on the
//! scheduled notification run.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, LocationConfig};
use crate::ingest::drk7::{FeedSource, parse_forecast};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<LocationVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationVerification {
    pub location_id: String,
    pub name: String,
    pub prefecture_id: String,
    pub area_id: String,
    pub status: VerificationStatus,
    pub document_fetched: bool,
    pub area_found: bool,
    pub rainfall_period_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Single Location
// ============================================================================

pub fn verify_location<F: FeedSource>(feed: &F, location: &LocationConfig) -> LocationVerification {
    let mut result = LocationVerification {
        location_id: location.id.clone(),
        name: location.name.clone(),
        prefecture_id: location.prefecture_id.clone(),
        area_id: location.area_id.clone(),
        status: VerificationStatus::Failed,
        document_fetched: false,
        area_found: false,
        rainfall_period_count: 0,
        error_message: None,
    };

    let document = match feed.fetch(&location.prefecture_id) {
        Ok(document) => document,
        Err(e) => {
            result.error_message = Some(format!("Fetch failed: {}", e));
            return result;
        }
    };
    result.document_fetched = true;

    match parse_forecast(&document, &location.area_id) {
        Ok(forecast) => {
            result.area_found = true;
            result.rainfall_period_count = forecast.rainfall_periods.len();
            result.status = if result.rainfall_period_count > 0 {
                VerificationStatus::Success
            } else {
                VerificationStatus::PartialSuccess
            };
        }
        Err(e) => {
            result.error_message = Some(format!("Extraction failed: {}", e));
        }
    }

    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_verification<F: FeedSource>(config: &AppConfig, feed: &F) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: Local::now().to_rfc3339(),
        results: Vec::new(),
        summary: VerificationSummary {
            total: config.locations.len(),
            ..VerificationSummary::default()
        },
    };

    println!("Verifying forecast locations...");
    for location in &config.locations {
        print!("  {} ({} / {}) ... ", location.id, location.prefecture_id, location.area_id);
        let result = verify_location(feed, location);

        match result.status {
            VerificationStatus::Success => {
                println!("✓ OK ({} rainfall periods)", result.rainfall_period_count);
                report.summary.working += 1;
            }
            VerificationStatus::PartialSuccess => {
                println!("⚠ Area found but no rainfall periods");
                report.summary.working += 1;
            }
            VerificationStatus::Failed => {
                println!("✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"));
                report.summary.failed += 1;
            }
        }

        report.results.push(result);
    }

    report
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "Locations:    {}/{} working  ({} failed)",
        report.summary.working, report.summary.total, report.summary.failed
    );

    let success_rate = if report.summary.total > 0 {
        (report.summary.working as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Overall Success Rate: {:.1}% ({}/{})",
        success_rate, report.summary.working, report.summary.total
    );
    println!("═══════════════════════════════════════════════════════════");
}
