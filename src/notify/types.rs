use std::fmt;

use serde::{Deserialize, Serialize};

pub const FOOTER: &str = "AWS Budget Notification";

/// SNS delivery envelope as handed to a subscriber.
#[derive(Debug, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SnsRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
pub struct SnsMessage {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Number-or-string amount; AWS Budgets is not consistent about which.
/// `null` shows up for spend that is not known yet, e.g. no forecast.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Null,
    Number(serde_json::Number),
    Text(String),
}

impl Amount {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Whole-valued floats print without a fractional part (`1000.0` -> `1000`).
fn write_number(f: &mut fmt::Formatter<'_>, n: &serde_json::Number) -> fmt::Result {
    if !n.is_f64() {
        return write!(f, "{n}");
    }
    match n.as_f64() {
        Some(v) if v == 0.0 => f.write_str("0"),
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e21 => write!(f, "{v:.0}"),
        Some(v) => write!(f, "{v}"),
        None => write!(f, "{n}"),
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Number(n) => write_number(f, n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BudgetNotification {
    #[serde(default)]
    pub account: String,
    pub budget_name: String,
    #[serde(default)]
    pub actual_spend: Amount,
    #[serde(default)]
    pub budget_limit: Amount,
    #[serde(default)]
    pub forecasted_spend: Amount,
    #[serde(default)]
    pub threshold: Amount,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Critical,
    Warning,
    Info,
}

impl AlertLevel {
    /// Unparseable thresholds rank as informational.
    pub fn from_threshold(threshold: Option<f64>) -> Self {
        match threshold {
            Some(t) if t >= 90.0 => Self::Critical,
            Some(t) if t >= 80.0 => Self::Warning,
            _ => Self::Info,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Critical => "#ff0000",
            Self::Warning => "#ffa500",
            Self::Info => "#36a64f",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl SlackField {
    fn short(title: &str, value: String) -> Self {
        Self {
            title: title.to_string(),
            value,
            short: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackAttachment {
    pub color: String,
    pub title: String,
    pub fields: Vec<SlackField>,
    pub footer: String,
    pub ts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackMessage {
    pub attachments: Vec<SlackAttachment>,
}

impl SlackMessage {
    pub fn from_notification(notification: &BudgetNotification, environment: &str, ts: u64) -> Self {
        let unit = &notification.unit;
        let level = AlertLevel::from_threshold(notification.threshold.as_f64());

        let fields = vec![
            SlackField::short("Account", notification.account.clone()),
            SlackField::short("Environment", environment.to_string()),
            SlackField::short("Budget Limit", format!("{} {unit}", notification.budget_limit)),
            SlackField::short("Actual Spend", format!("{} {unit}", notification.actual_spend)),
            SlackField::short(
                "Forecasted Spend",
                format!("{} {unit}", notification.forecasted_spend),
            ),
            SlackField::short("Threshold", format!("{}%", notification.threshold)),
        ];

        Self {
            attachments: vec![SlackAttachment {
                color: level.color().to_string(),
                title: format!("AWS Budget Alert: {}", notification.budget_name),
                fields,
                footer: FOOTER.to_string(),
                ts,
            }],
        }
    }
}
