//! Alert evaluation.
//!
//! Both checks are pure and independent; a forecast may raise a rain alert
//! and a weather alert at the same time, and the caller evaluates both.

pub mod conditions;
pub mod rain;

pub use conditions::{ConditionKeywords, check_weather_alert};
pub use rain::check_rain_alert;
