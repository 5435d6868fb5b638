//! Notification delivery.
//!
//! - `format`: Slack message rendering for rain and weather alerts.
//! - `slack`: Slack incoming-webhook delivery with retry.

pub mod format;
pub mod slack;

use crate::model::DeliveryError;

/// Destination for formatted alert messages.
///
/// Implementations own transport, authentication and retries; an error means
/// delivery has been given up on.
pub trait Notifier {
    fn deliver(&self, message: &str) -> Result<(), DeliveryError>;
}
