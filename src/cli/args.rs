use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use finops_tftest::config::{self, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run module scenarios against real infrastructure
    Run(RunArgs),
    /// List the available scenarios
    List,
    /// Forward a budget SNS event to Slack
    Notify(NotifyArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Tree,
    Json,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Scenario to run; repeat for several. Runs all when omitted.
    #[arg(long = "scenario", short = 's')]
    pub scenarios: Vec<String>,

    #[arg(long, env = "FINOPS_MODULE_DIR", default_value = ".")]
    pub module_dir: PathBuf,

    #[arg(long, env = "TERRAFORM_BINARY", default_value = "terraform")]
    pub terraform_binary: String,

    #[arg(long, env = "FINOPS_ENVIRONMENT", default_value = config::DEFAULT_ENVIRONMENT)]
    pub environment: String,

    #[arg(long, default_value_t = config::default_max_retries())]
    pub max_retries: u32,

    #[arg(long, default_value_t = config::default_retry_delay_secs())]
    pub retry_delay_secs: u64,

    /// Fail on the first tool error, even known transient ones
    #[arg(long)]
    pub no_retry: bool,

    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Suffix for resource name prefixes, to keep concurrent runs apart
    #[arg(long, env = "FINOPS_RUN_ID")]
    pub run_id: Option<String>,

    /// Share provider plugins through a cache under the user cache dir
    #[arg(long)]
    pub plugin_cache: bool,

    /// Let the tool print colored output
    #[arg(long)]
    pub color: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,
}

impl RunArgs {
    pub fn to_config(&self) -> RunConfig {
        let base = RunConfig {
            terraform_binary: self.terraform_binary.clone(),
            environment: self.environment.clone(),
            parallelism: self.parallelism,
            run_id: self.run_id.clone(),
            plugin_cache_dir: if self.plugin_cache {
                config::default_plugin_cache_dir()
            } else {
                None
            },
            no_color: !self.color,
            ..RunConfig::new(&self.module_dir)
        };

        if self.no_retry {
            base.without_retries()
        } else {
            base.retries(self.max_retries, Duration::from_secs(self.retry_delay_secs))
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct NotifyArgs {
    /// SNS event JSON file, or '-' for stdin
    #[arg(long, default_value = "-")]
    pub event: String,

    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    #[arg(long, env = "ENVIRONMENT", default_value = "unknown")]
    pub environment: String,
}
