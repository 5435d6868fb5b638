//! Daily weather alerts for a list of locations.
//!
//! Each run fetches the drk7 prefecture forecast feed for every configured
//! location, raises rain and special-weather alerts, and posts them to a
//! Slack webhook at most once per location, alert type, and day.

pub mod alert;
pub mod config;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod notify;
pub mod retry;
pub mod runner;
pub mod verify;
