//! Budget alert forwarding.
//!
//! The module's organization-budgets example routes AWS Budgets alerts
//! through SNS; this turns one SNS delivery into a Slack webhook post.

mod client;
mod error;
mod types;

pub use client::{SlackNotifier, parse_event};
pub use error::NotifyError;
pub use types::{
    AlertLevel, Amount, BudgetNotification, SlackAttachment, SlackField, SlackMessage, SnsEvent,
    SnsMessage, SnsRecord,
};
