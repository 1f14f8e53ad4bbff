use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::terraform::cli::PLUGIN_CACHE_ENV;
use crate::terraform::{DEFAULT_MAX_RETRIES, DEFAULT_TIME_BETWEEN_RETRIES, Options, RetryPolicy};

pub const DEFAULT_ENVIRONMENT: &str = "test";

/// Settings shared by every scenario of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Root of the Terraform module; examples live under `examples/`.
    pub module_dir: PathBuf,
    pub terraform_binary: String,
    pub environment: String,
    /// `None` disables retrying transient tool errors.
    pub retry: Option<RetryPolicy>,
    pub parallelism: Option<usize>,
    /// Appended to every name prefix so concurrent runs do not collide.
    pub run_id: Option<String>,
    pub plugin_cache_dir: Option<PathBuf>,
    pub no_color: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            module_dir: PathBuf::from("."),
            terraform_binary: "terraform".to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            retry: Some(RetryPolicy::default()),
            parallelism: None,
            run_id: None,
            plugin_cache_dir: None,
            no_color: true,
        }
    }
}

impl RunConfig {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            ..Self::default()
        }
    }

    pub fn retries(mut self, max_retries: u32, time_between_retries: Duration) -> Self {
        let mut policy = RetryPolicy::default();
        policy.max_retries = max_retries;
        policy.time_between_retries = time_between_retries;
        self.retry = Some(policy);
        self
    }

    pub fn without_retries(mut self) -> Self {
        self.retry = None;
        self
    }

    pub fn example_dir(&self, example: &str) -> PathBuf {
        self.module_dir.join("examples").join(example)
    }

    /// `test-<scenario>-` or `test-<scenario>-<run id>-`.
    pub fn name_prefix(&self, scenario: &str) -> String {
        match &self.run_id {
            Some(id) => format!("test-{scenario}-{id}-"),
            None => format!("test-{scenario}-"),
        }
    }

    /// Base tool options for a scenario rooted at `dir`.
    pub fn options_for(&self, dir: impl AsRef<Path>) -> Options {
        let mut options = Options::new(dir.as_ref())
            .binary(self.terraform_binary.clone())
            .no_color(self.no_color)
            .env("TF_IN_AUTOMATION", "1");

        if let Some(cache) = &self.plugin_cache_dir {
            options = options.env(PLUGIN_CACHE_ENV, cache.display().to_string());
        }
        if let Some(policy) = &self.retry {
            options = options.retry_policy(policy.clone());
        }
        options
    }
}

/// Shared provider plugin cache under the user's cache directory.
pub fn default_plugin_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("finops-tftest").join("plugin-cache"))
}

pub fn default_retry_delay_secs() -> u64 {
    DEFAULT_TIME_BETWEEN_RETRIES.as_secs()
}

pub fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
