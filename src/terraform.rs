pub mod cli;
pub mod mock;
mod options;
mod outputs;
mod retry;

pub use cli::TerraformCli;
pub use options::{Options, VarValue};
pub use outputs::{OutputSet, materialize, parse_single};
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_TIME_BETWEEN_RETRIES, RetryPolicy, RetryableError};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("failed to run '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed (exit code {}):\n{output}", exit_code_label(.exit_code))]
    Provisioning {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("'{command}' still failing after {attempts} attempts ({reason}):\n{output}")]
    RetriesExhausted {
        command: String,
        attempts: u32,
        reason: String,
        output: String,
    },

    #[error("output '{name}' not found")]
    OutputMissing { name: String },

    #[error("could not parse output '{name}': {message}")]
    OutputParse { name: String, message: String },
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl TerraformError {
    /// Captured tool output, when the tool actually ran.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::Provisioning { output, .. } | Self::RetriesExhausted { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

/// The seam between the scenario runner and the external provisioning tool.
///
/// Every method maps onto one tool subcommand run inside
/// [`Options::terraform_dir`]. Implementations own their retry behavior;
/// callers only see the final result.
#[async_trait]
pub trait Provisioner: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&self, options: &Options) -> Result<String, TerraformError>;

    async fn apply(&self, options: &Options) -> Result<String, TerraformError>;

    async fn output(&self, options: &Options, name: &str) -> Result<String, TerraformError>;

    async fn output_all(&self, options: &Options) -> Result<OutputSet, TerraformError>;

    async fn validate(&self, options: &Options) -> Result<String, TerraformError>;

    async fn fmt_check(&self, options: &Options) -> Result<String, TerraformError>;

    async fn destroy(&self, options: &Options) -> Result<String, TerraformError>;

    async fn init_and_apply(&self, options: &Options) -> Result<String, TerraformError> {
        let mut combined = self.init(options).await?;
        combined.push_str(&self.apply(options).await?);
        Ok(combined)
    }
}
