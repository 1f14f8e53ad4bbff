use std::time::{SystemTime, UNIX_EPOCH};

use super::NotifyError;
use super::types::{BudgetNotification, SlackMessage, SnsEvent};

#[derive(Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: reqwest::Url,
    environment: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str, environment: impl Into<String>) -> Result<Self, NotifyError> {
        let webhook_url =
            reqwest::Url::parse(webhook_url).map_err(|_| NotifyError::InvalidWebhook)?;

        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            webhook_url,
            environment: environment.into(),
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Posts `message`; returns the webhook's response body.
    pub async fn send(&self, message: &SlackMessage) -> Result<String, NotifyError> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(message)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() != 200 {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Formats the first record of `event` and forwards it.
    pub async fn forward(&self, event: &SnsEvent) -> Result<SlackMessage, NotifyError> {
        let record = event.records.first().ok_or(NotifyError::NoRecords)?;

        let notification: BudgetNotification = serde_json::from_str(&record.sns.message)
            .map_err(|source| NotifyError::InvalidPayload {
                what: "budget notification",
                source,
            })?;

        tracing::info!(budget = %notification.budget_name, "forwarding budget notification");

        let message = SlackMessage::from_notification(&notification, &self.environment, unix_now());
        self.send(&message).await?;
        Ok(message)
    }
}

pub fn parse_event(raw: &str) -> Result<SnsEvent, NotifyError> {
    serde_json::from_str(raw).map_err(|source| NotifyError::InvalidPayload {
        what: "SNS event",
        source,
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("webhook_url", &"[REDACTED]")
            .field("environment", &self.environment)
            .finish()
    }
}
