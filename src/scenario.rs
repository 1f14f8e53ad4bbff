pub mod catalog;
mod check;
mod teardown;

pub use check::Expectation;
pub use teardown::{TeardownGuard, TeardownStatus};

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::terraform::{Options, TerraformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// init + apply, read outputs, check them, destroy.
    Apply,
    Validate,
    FormatCheck,
}

impl ScenarioKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Validate => "validate",
            Self::FormatCheck => "fmt-check",
        }
    }

    pub fn provisions(&self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub kind: ScenarioKind,
    pub options: Options,
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, kind: ScenarioKind, options: Options) -> Self {
        Self {
            name: name.into(),
            kind,
            options,
            expectations: Vec::new(),
        }
    }

    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    /// Output names the expectations read, first occurrence order, no repeats.
    pub fn output_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for expectation in &self.expectations {
            let name = expectation.output();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    InitAndApply,
    ReadOutput(String),
    Check(String),
    Validate,
    FormatCheck,
    Destroy,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitAndApply => f.write_str("init + apply"),
            Self::ReadOutput(name) => write!(f, "output {name}"),
            Self::Check(desc) => write!(f, "check {desc}"),
            Self::Validate => f.write_str("validate"),
            Self::FormatCheck => f.write_str("fmt -check"),
            Self::Destroy => f.write_str("destroy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step: Step,
    pub passed: bool,
    pub duration: Duration,
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Provisioning(#[from] TerraformError),

    #[error("output '{name}' is missing or empty")]
    OutputMissing { name: String },

    #[error("output '{output}': {message}")]
    Assertion { output: String, message: String },

    #[error("scenario panicked: {0}")]
    Panicked(String),

    #[error("teardown failed: {0}")]
    Teardown(#[source] TerraformError),
}

impl ScenarioError {
    /// Missing outputs and failed checks are test failures; everything else
    /// means the scenario could not run to completion.
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::OutputMissing { .. } | Self::Assertion { .. })
    }
}
