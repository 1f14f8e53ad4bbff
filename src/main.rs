mod cli;

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, NotifyArgs, ReportFormat, RunArgs};
use finops_tftest::notify::{SlackNotifier, parse_event};
use finops_tftest::scenario::catalog;
use finops_tftest::{HarnessError, Runner, TerraformCli, report};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await?,
        Command::List => {
            for name in catalog::SCENARIO_NAMES {
                println!("{name}");
            }
        }
        Command::Notify(args) => notify(args).await?,
    }

    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let config = args.to_config();

    if !config.module_dir.is_dir() {
        return Err(HarnessError::Config(format!(
            "module directory '{}' does not exist",
            config.module_dir.display()
        ))
        .into());
    }
    if let Some(cache) = &config.plugin_cache_dir {
        tokio::fs::create_dir_all(cache)
            .await
            .map_err(HarnessError::Io)?;
        tracing::info!(dir = %cache.display(), "using provider plugin cache");
    }

    let scenarios = catalog::select(&config, &args.scenarios)?;
    tracing::info!(count = scenarios.len(), module = %config.module_dir.display(), "running scenarios");

    let mut runner = Runner::new(Arc::new(TerraformCli::new()));
    if let Some(parallelism) = config.parallelism {
        runner = runner.with_parallelism(parallelism);
    }
    let reports = runner.run_all(scenarios).await;

    match args.format {
        ReportFormat::Table => {
            println!("{}", report::render_table(&reports));
            print!("{}", report::render_failure_details(&reports));
        }
        ReportFormat::Tree => {
            print!("{}", report::render_trees(&reports));
            print!("{}", report::render_failure_details(&reports));
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report::to_json(&reports))?);
        }
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        return Err(HarnessError::ScenariosFailed {
            failed,
            total: reports.len(),
        }
        .into());
    }
    Ok(())
}

async fn notify(args: NotifyArgs) -> Result<()> {
    let webhook_url = args
        .webhook_url
        .ok_or_else(|| eyre!("No webhook URL provided. Set SLACK_WEBHOOK_URL or use --webhook-url flag"))?;

    let raw = if args.event == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(&args.event).await?
    };

    let event = parse_event(&raw).map_err(HarnessError::from)?;
    let notifier = SlackNotifier::new(&webhook_url, args.environment).map_err(HarnessError::from)?;
    let message = notifier.forward(&event).await.map_err(HarnessError::from)?;

    tracing::info!(title = %message.attachments[0].title, "notification sent");
    Ok(())
}
