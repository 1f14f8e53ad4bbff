use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Terraform(#[from] crate::terraform::TerraformError),

    #[error(transparent)]
    Notify(#[from] crate::notify::NotifyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown scenario: {0} (expected one of: basic, advanced, validation, format)")]
    UnknownScenario(String),

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },
}
