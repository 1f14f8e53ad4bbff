use thiserror::Error;

/// Errors while forwarding a budget notification.
///
/// SECURITY: Messages must never contain the webhook URL.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SNS event carried no records
    #[error("event contains no SNS records")]
    NoRecords,

    /// SNS event or budget message was not the expected JSON
    #[error("invalid {what}: {source}")]
    InvalidPayload {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid webhook URL")]
    InvalidWebhook,

    /// Network-level error; the URL is stripped before wrapping
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Webhook answered with something other than 200
    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Network(err.without_url())
    }
}
