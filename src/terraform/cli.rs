use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;

use super::outputs::parse_single;
use super::{Options, OutputSet, Provisioner, TerraformError};

/// Raw result of one tool invocation.
#[derive(Debug)]
struct Invocation {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl Invocation {
    fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Environment variable pointing `init` at a shared provider plugin cache.
pub const PLUGIN_CACHE_ENV: &str = "TF_PLUGIN_CACHE_DIR";

/// [`Provisioner`] that shells out to the binary named in
/// [`Options::terraform_binary`].
///
/// The plugin cache is not safe for concurrent installs, so `init` runs one
/// at a time whenever [`PLUGIN_CACHE_ENV`] is set. Clones share the lock.
#[derive(Debug, Clone, Default)]
pub struct TerraformCli {
    init_lock: Arc<Mutex<()>>,
}

impl TerraformCli {
    pub fn new() -> Self {
        Self::default()
    }

    async fn invoke(&self, options: &Options, args: &[String]) -> Result<Invocation, TerraformError> {
        let output = Command::new(&options.terraform_binary)
            .args(args)
            .current_dir(options.dir())
            .envs(&options.env_vars)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TerraformError::Spawn {
                binary: options.terraform_binary.clone(),
                source,
            })?;

        Ok(Invocation {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Runs one subcommand, retrying known transient failures per the
    /// options' retry policy. Returns stdout on success.
    async fn run(&self, options: &Options, args: Vec<String>) -> Result<String, TerraformError> {
        let command = format!("{} {}", options.terraform_binary, args.join(" "));
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            tracing::debug!(command = %command, attempt = attempts, dir = %options.dir().display(), "running");

            let invocation = self.invoke(options, &args).await?;
            if invocation.success {
                return Ok(invocation.stdout);
            }

            let output = invocation.combined();
            let Some(policy) = options.retry.as_ref() else {
                return Err(TerraformError::Provisioning {
                    command,
                    exit_code: invocation.exit_code,
                    output,
                });
            };

            let Some(reason) = policy.match_output(&output) else {
                return Err(TerraformError::Provisioning {
                    command,
                    exit_code: invocation.exit_code,
                    output,
                });
            };

            if attempts > policy.max_retries {
                return Err(TerraformError::RetriesExhausted {
                    command,
                    attempts,
                    reason: reason.to_string(),
                    output,
                });
            }

            tracing::warn!(
                command = %command,
                attempt = attempts,
                reason,
                "retryable error, sleeping {:?}",
                policy.time_between_retries
            );
            tokio::time::sleep(policy.time_between_retries).await;
        }
    }
}

fn is_missing_output(output: &str, name: &str) -> bool {
    output.contains(&format!("Output \"{name}\" not found")) || output.contains("No outputs found")
}

#[async_trait]
impl Provisioner for TerraformCli {
    fn name(&self) -> &str {
        "terraform-cli"
    }

    async fn init(&self, options: &Options) -> Result<String, TerraformError> {
        if !options.env_vars.contains_key(PLUGIN_CACHE_ENV) {
            return self.run(options, options.init_args()).await;
        }
        let _cache = self.init_lock.lock().await;
        self.run(options, options.init_args()).await
    }

    async fn apply(&self, options: &Options) -> Result<String, TerraformError> {
        self.run(options, options.apply_args()).await
    }

    async fn output(&self, options: &Options, name: &str) -> Result<String, TerraformError> {
        match self.run(options, options.output_args(Some(name))).await {
            Ok(stdout) => parse_single(name, &stdout),
            Err(TerraformError::Provisioning { output, .. }) if is_missing_output(&output, name) => {
                Err(TerraformError::OutputMissing {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn output_all(&self, options: &Options) -> Result<OutputSet, TerraformError> {
        let stdout = self.run(options, options.output_args(None)).await?;
        OutputSet::from_json(&stdout)
    }

    async fn validate(&self, options: &Options) -> Result<String, TerraformError> {
        self.run(options, options.validate_args()).await
    }

    async fn fmt_check(&self, options: &Options) -> Result<String, TerraformError> {
        self.run(options, options.fmt_check_args()).await
    }

    async fn destroy(&self, options: &Options) -> Result<String, TerraformError> {
        self.run(options, options.destroy_args()).await
    }
}
