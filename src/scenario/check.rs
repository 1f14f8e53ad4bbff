use std::fmt;

use super::ScenarioError;

/// A condition on one named output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    NonEmpty { output: String },
    Contains { output: String, needle: String },
}

impl Expectation {
    pub fn non_empty(output: impl Into<String>) -> Self {
        Self::NonEmpty {
            output: output.into(),
        }
    }

    pub fn contains(output: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains {
            output: output.into(),
            needle: needle.into(),
        }
    }

    pub fn output(&self) -> &str {
        match self {
            Self::NonEmpty { output } | Self::Contains { output, .. } => output,
        }
    }

    /// `value` is `None` when the output could not be read at all.
    pub fn evaluate(&self, value: Option<&str>) -> Result<(), ScenarioError> {
        let value = value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ScenarioError::OutputMissing {
                name: self.output().to_string(),
            })?;

        match self {
            Self::NonEmpty { .. } => Ok(()),
            Self::Contains { output, needle } if !value.contains(needle.as_str()) => {
                Err(ScenarioError::Assertion {
                    output: output.clone(),
                    message: format!("\"{value}\" does not contain \"{needle}\""),
                })
            }
            Self::Contains { .. } => Ok(()),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEmpty { output } => write!(f, "{output} is not empty"),
            Self::Contains { output, needle } => write!(f, "{output} contains \"{needle}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_passes() {
        assert!(Expectation::non_empty("budget_id").evaluate(Some("test-basic-monthly")).is_ok());
    }

    #[test]
    fn test_non_empty_rejects_empty_and_absent() {
        let check = Expectation::non_empty("account_id");
        for value in [None, Some("")] {
            match check.evaluate(value) {
                Err(ScenarioError::OutputMissing { name }) => assert_eq!(name, "account_id"),
                other => panic!("expected OutputMissing, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_contains_budgets_arn() {
        let check = Expectation::contains("budget_arn", "budgets");
        assert!(
            check
                .evaluate(Some("arn:aws:budgets::123456789012:budget/test-basic-monthly"))
                .is_ok()
        );
    }

    #[test]
    fn test_contains_failure_message() {
        let check = Expectation::contains("budget_arn", "budgets");
        match check.evaluate(Some("arn:aws:s3:::bucket")) {
            Err(ScenarioError::Assertion { output, message }) => {
                assert_eq!(output, "budget_arn");
                assert!(message.contains("arn:aws:s3:::bucket"));
                assert!(message.contains("\"budgets\""));
            }
            other => panic!("expected Assertion, got {other:?}"),
        }
    }

    #[test]
    fn test_contains_on_missing_output_is_missing() {
        let check = Expectation::contains("budget_arn", "budgets");
        assert!(matches!(
            check.evaluate(None),
            Err(ScenarioError::OutputMissing { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Expectation::non_empty("s3_bucket_id").to_string(), "s3_bucket_id is not empty");
        assert_eq!(
            Expectation::contains("budget_arn", "budgets").to_string(),
            "budget_arn contains \"budgets\""
        );
    }
}
