//! Forecast feed ingestion.
//!
//! - `drk7`: feed URL, blocking fetch with retry, and forecast extraction.
//! - `xml`: the small element tree the extractor walks.

pub mod drk7;
pub mod xml;
