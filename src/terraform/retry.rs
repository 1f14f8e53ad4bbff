use std::time::Duration;

use regex::Regex;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIME_BETWEEN_RETRIES: Duration = Duration::from_secs(5);

const NETWORK_PLUGIN_FAILURE: &str = "Failed to retrieve plugin due to transient network error.";

// (pattern, reason) pairs for tool failures that are safe to retry
const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (".*read: connection reset by peer.*", "Failed to reach helm charts repository."),
    (".*transport is closing.*", "Failed to reach Kubernetes API."),
    (".*unable to verify signature.*", NETWORK_PLUGIN_FAILURE),
    (".*unable to verify checksum.*", NETWORK_PLUGIN_FAILURE),
    (".*no provider exists with the given name.*", NETWORK_PLUGIN_FAILURE),
    (".*registry service is unreachable.*", NETWORK_PLUGIN_FAILURE),
    (".*Error installing provider.*", NETWORK_PLUGIN_FAILURE),
    (".*Failed to query available provider packages.*", NETWORK_PLUGIN_FAILURE),
    (".*timeout while waiting for plugin to start.*", NETWORK_PLUGIN_FAILURE),
    (".*timed out waiting for server handshake.*", NETWORK_PLUGIN_FAILURE),
    ("could not query provider registry for", NETWORK_PLUGIN_FAILURE),
    (".*Client\\.Timeout exceeded while awaiting headers.*", "Transient network error."),
    (".*TLS handshake timeout.*", "Transient network error."),
];

#[derive(Debug, Clone)]
pub struct RetryableError {
    pattern: Regex,
    reason: String,
}

impl RetryableError {
    pub fn new(pattern: &str, reason: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            reason: reason.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl PartialEq for RetryableError {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str() && self.reason == other.reason
    }
}

/// How the CLI provisioner reacts to a failing tool invocation.
///
/// A failure whose combined output matches one of `errors` is retried after
/// `time_between_retries`, at most `max_retries` times. Anything else fails
/// on the first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub time_between_retries: Duration,
    errors: Vec<RetryableError>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, time_between_retries: Duration) -> Self {
        Self {
            max_retries,
            time_between_retries,
            errors: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: RetryableError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn errors(&self) -> &[RetryableError] {
        &self.errors
    }

    /// Reason of the first retryable pattern found in `output`, if any.
    pub fn match_output(&self, output: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.pattern.is_match(output))
            .map(RetryableError::reason)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let errors = DEFAULT_RETRYABLE_ERRORS
            .iter()
            .filter_map(|(pattern, reason)| RetryableError::new(pattern, *reason).ok())
            .collect();

        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            time_between_retries: DEFAULT_TIME_BETWEEN_RETRIES,
            errors,
        }
    }
}
