//! Rain probability threshold checking.

use crate::model::{RainAlert, RainfallPeriod, WeatherForecast};

/// Returns a rain alert if any period's probability reaches `threshold`.
///
/// The alert carries only the qualifying periods, in feed order. Returns
/// `None` when no period qualifies, so a threshold above 100 never fires and
/// a threshold of 0 fires for any period with a non-negative probability.
pub fn check_rain_alert(
    forecast: &WeatherForecast,
    threshold: i32,
    location_name: &str,
) -> Option<RainAlert> {
    let alert_periods: Vec<RainfallPeriod> = forecast
        .rainfall_periods
        .iter()
        .filter(|p| p.probability >= threshold)
        .cloned()
        .collect();

    if alert_periods.is_empty() {
        return None;
    }

    Some(RainAlert {
        location_name: location_name.to_string(),
        area: forecast.area.clone(),
        date: forecast.date.clone(),
        alert_periods,
    })
}
