//! Slack incoming-webhook delivery.
//!
//! Posts `{"text": message}` to the webhook URL. Only HTTP 200 counts as
//! delivered; any other status or a transport failure is retried according
//! to the configured `RetryPolicy`.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::model::DeliveryError;
use crate::notify::Notifier;
use crate::retry::RetryPolicy;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

pub struct SlackWebhook {
    client: reqwest::blocking::Client,
    webhook_url: String,
    retry: RetryPolicy,
}

impl SlackWebhook {
    pub fn new(
        webhook_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            retry,
        })
    }

    fn post_once(&self, message: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { text: message })
            .send()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl Notifier for SlackWebhook {
    fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        self.retry.run("deliver_webhook", |_| self.post_once(message))?;
        debug!(bytes = message.len(), "webhook accepted message");
        Ok(())
    }
}
