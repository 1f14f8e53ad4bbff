//! Drives `TerraformCli` against a fake `terraform` shell script.
//!
//! The script logs every invocation and answers like the real tool, so these
//! tests cover argument building, retries, output parsing and teardown
//! without a cloud account.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use finops_tftest::scenario::catalog;
use finops_tftest::terraform::RetryPolicy;
use finops_tftest::terraform::cli::PLUGIN_CACHE_ENV;
use finops_tftest::{
    Options, Provisioner, RunConfig, Runner, ScenarioError, TerraformCli, TerraformError,
};
use serial_test::serial;
use tempfile::TempDir;

const FAKE_TERRAFORM: &str = r#"#!/bin/sh
state="$FAKE_TF_STATE"
echo "$*" >> "$state/calls.log"
case "$1" in
  init)
    n=$(cat "$state/init_count" 2>/dev/null || echo 0)
    n=$((n + 1))
    echo "$n" > "$state/init_count"
    if [ -n "$FAKE_TF_INIT_SLEEP" ]; then
      mkdir "$state/init.running" 2>/dev/null || echo "overlap" >> "$state/overlaps"
      sleep "$FAKE_TF_INIT_SLEEP"
      rmdir "$state/init.running" 2>/dev/null
    fi
    if [ "$n" -le "${FAKE_TF_FLAKY_INITS:-0}" ]; then
      echo "Error installing provider \"aws\": read: connection reset by peer" >&2
      exit 1
    fi
    echo "Terraform has been successfully initialized!"
    ;;
  apply)
    if [ -n "$FAKE_TF_APPLY_ERROR" ]; then
      echo "$FAKE_TF_APPLY_ERROR" >&2
      exit 1
    fi
    echo "Apply complete! Resources: 3 added, 0 changed, 0 destroyed."
    ;;
  output)
    case "$4" in
      budget_id) echo '"test-basic-monthly"' ;;
      budget_arn) echo '"arn:aws:budgets::123456789012:budget/test-basic-monthly"' ;;
      account_id) echo '"123456789012"' ;;
      "") echo '{"budget_id":{"sensitive":false,"type":"string","value":"test-basic-monthly"},"limit":{"sensitive":false,"type":"number","value":1000}}' ;;
      *) printf 'Error: Output "%s" not found\n' "$4" >&2; exit 1 ;;
    esac
    ;;
  validate)
    echo "Success! The configuration is valid."
    ;;
  fmt)
    if [ -f unformatted.tf ]; then
      echo "unformatted.tf"
      exit 3
    fi
    ;;
  destroy)
    echo "Destroy complete! Resources: 3 destroyed."
    ;;
esac
"#;

struct FakeTerraform {
    _dir: TempDir,
    binary: PathBuf,
    state: PathBuf,
    module: PathBuf,
}

impl FakeTerraform {
    fn new() -> Self {
        let dir = TempDir::new().expect("TempDir should create test directory");
        let binary = dir.path().join("terraform");
        fs::write(&binary, FAKE_TERRAFORM).expect("write fake terraform");
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).expect("chmod");

        let state = dir.path().join("state");
        let module = dir.path().join("module");
        fs::create_dir_all(&state).expect("create state dir");
        fs::create_dir_all(module.join("examples").join("basic")).expect("create module dir");

        Self {
            _dir: dir,
            binary,
            state,
            module,
        }
    }

    fn options(&self, dir: &Path) -> Options {
        Options::new(dir)
            .binary(self.binary.display().to_string())
            .env("FAKE_TF_STATE", self.state.display().to_string())
            .no_color(true)
    }

    fn config(&self) -> RunConfig {
        RunConfig {
            terraform_binary: self.binary.display().to_string(),
            ..RunConfig::new(&self.module)
        }
        .retries(3, Duration::ZERO)
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.state.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn overlapping_inits(&self) -> usize {
        fs::read_to_string(self.state.join("overlaps"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    fn count(&self, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(subcommand))
            .count()
    }
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    let mut policy = RetryPolicy::default();
    policy.max_retries = max_retries;
    policy.time_between_retries = Duration::ZERO;
    policy
}

#[tokio::test]
#[serial]
async fn test_init_and_apply_passes_vars() {
    let fake = FakeTerraform::new();
    let options = fake
        .options(&fake.module)
        .var("name_prefix", "test-basic-")
        .var("environment", "test");

    let stdout = TerraformCli::new().init_and_apply(&options).await.unwrap();

    assert!(stdout.contains("successfully initialized"));
    assert!(stdout.contains("Apply complete!"));
    assert_eq!(
        fake.calls(),
        vec![
            "init -upgrade=false -input=false -no-color",
            "apply -input=false -auto-approve -var environment=test -var name_prefix=test-basic- -no-color",
        ]
    );
}

#[tokio::test]
#[serial]
async fn test_output_values_are_unquoted() {
    let fake = FakeTerraform::new();
    let options = fake.options(&fake.module);
    let cli = TerraformCli::new();

    assert_eq!(cli.output(&options, "budget_id").await.unwrap(), "test-basic-monthly");
    assert!(cli.output(&options, "budget_arn").await.unwrap().contains("budgets"));

    let all = cli.output_all(&options).await.unwrap();
    assert_eq!(all.get("budget_id"), Some("test-basic-monthly"));
    assert_eq!(all.get("limit"), Some("1000"));
}

#[tokio::test]
#[serial]
async fn test_unknown_output_is_missing_not_provisioning_error() {
    let fake = FakeTerraform::new();
    let options = fake.options(&fake.module).with_default_retryable_errors();

    let result = TerraformCli::new().output(&options, "production_budget_id").await;

    match result {
        Err(TerraformError::OutputMissing { name }) => assert_eq!(name, "production_budget_id"),
        other => panic!("expected OutputMissing, got {other:?}"),
    }
    assert_eq!(fake.count("output"), 1);
}

#[tokio::test]
#[serial]
async fn test_transient_init_error_is_retried() {
    let fake = FakeTerraform::new();
    let options = fake
        .options(&fake.module)
        .env("FAKE_TF_FLAKY_INITS", "2")
        .retry_policy(fast_retries(3));

    let result = TerraformCli::new().init(&options).await;

    assert!(result.is_ok(), "init should succeed on third attempt: {result:?}");
    assert_eq!(fake.count("init"), 3);
}

#[tokio::test]
#[serial]
async fn test_transient_init_error_escalates_after_retries() {
    let fake = FakeTerraform::new();
    let options = fake
        .options(&fake.module)
        .env("FAKE_TF_FLAKY_INITS", "10")
        .retry_policy(fast_retries(2));

    let result = TerraformCli::new().init(&options).await;

    match result {
        Err(TerraformError::RetriesExhausted {
            attempts, output, ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(output.contains("Error installing provider"));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(fake.count("init"), 3);
}

#[tokio::test]
#[serial]
async fn test_transient_error_not_retried_without_policy() {
    let fake = FakeTerraform::new();
    let options = fake.options(&fake.module).env("FAKE_TF_FLAKY_INITS", "1");

    let result = TerraformCli::new().init(&options).await;

    assert!(matches!(result, Err(TerraformError::Provisioning { .. })));
    assert_eq!(fake.count("init"), 1);
}

#[tokio::test]
#[serial]
async fn test_permanent_apply_error_is_not_retried() {
    let fake = FakeTerraform::new();
    let options = fake
        .options(&fake.module)
        .env("FAKE_TF_APPLY_ERROR", "Error: creating Budget: AccessDeniedException")
        .retry_policy(fast_retries(3));

    let result = TerraformCli::new().apply(&options).await;

    match result {
        Err(TerraformError::Provisioning {
            exit_code, output, ..
        }) => {
            assert_eq!(exit_code, Some(1));
            assert!(output.contains("AccessDeniedException"));
        }
        other => panic!("expected Provisioning, got {other:?}"),
    }
    assert_eq!(fake.count("apply"), 1);
}

fn slow_init_options(fake: &FakeTerraform, dir: &Path) -> Options {
    fake.options(dir).env("FAKE_TF_INIT_SLEEP", "1")
}

#[tokio::test]
#[serial]
async fn test_inits_sharing_plugin_cache_never_overlap() {
    let fake = FakeTerraform::new();
    let advanced = fake.module.join("examples").join("advanced");
    fs::create_dir_all(&advanced).unwrap();
    let cache = fake.state.join("plugin-cache").display().to_string();
    let basic = slow_init_options(&fake, &fake.module.join("examples").join("basic"))
        .env(PLUGIN_CACHE_ENV, cache.clone());
    let advanced = slow_init_options(&fake, &advanced).env(PLUGIN_CACHE_ENV, cache);
    let cli = TerraformCli::new();

    let (first, second) = tokio::join!(cli.init(&basic), cli.init(&advanced));

    assert!(first.is_ok() && second.is_ok());
    assert_eq!(fake.count("init"), 2);
    assert_eq!(fake.overlapping_inits(), 0);
}

#[tokio::test]
#[serial]
async fn test_inits_without_plugin_cache_run_concurrently() {
    let fake = FakeTerraform::new();
    let options = slow_init_options(&fake, &fake.module);
    let cli = TerraformCli::new();

    let (first, second) = tokio::join!(cli.init(&options), cli.init(&options));

    assert!(first.is_ok() && second.is_ok());
    assert_eq!(fake.overlapping_inits(), 1);
}

#[tokio::test]
#[serial]
async fn test_validate_succeeds() {
    let fake = FakeTerraform::new();
    let stdout = TerraformCli::new()
        .validate(&fake.options(&fake.module))
        .await
        .unwrap();
    assert!(stdout.contains("configuration is valid"));
    assert_eq!(fake.calls(), vec!["validate -no-color"]);
}

#[tokio::test]
#[serial]
async fn test_fmt_check_passes_on_canonical_files_and_is_idempotent() {
    let fake = FakeTerraform::new();
    let options = fake.options(&fake.module);
    let cli = TerraformCli::new();

    let first = cli.fmt_check(&options).await;
    let second = cli.fmt_check(&options).await;

    assert!(first.is_ok());
    assert_eq!(first.unwrap(), second.unwrap());
}

#[tokio::test]
#[serial]
async fn test_fmt_check_fails_on_unformatted_file_every_time() {
    let fake = FakeTerraform::new();
    fs::write(fake.module.join("unformatted.tf"), "resource  \"x\" \"y\"{}\n").unwrap();
    let options = fake.options(&fake.module);
    let cli = TerraformCli::new();

    for _ in 0..2 {
        match cli.fmt_check(&options).await {
            Err(TerraformError::Provisioning {
                exit_code, output, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert!(output.contains("unformatted.tf"));
            }
            other => panic!("expected Provisioning, got {other:?}"),
        }
    }
}

#[tokio::test]
#[serial]
async fn test_basic_scenario_end_to_end_destroys_once() {
    let fake = FakeTerraform::new();
    let mut scenario = catalog::basic(&fake.config());
    scenario.options = scenario
        .options
        .env("FAKE_TF_STATE", fake.state.display().to_string());

    let report = Runner::new(Arc::new(TerraformCli::new())).run(scenario).await;

    assert!(report.passed(), "failures: {:?}", report.failures);
    assert_eq!(report.outputs.get("account_id"), Some("123456789012"));
    assert_eq!(fake.count("destroy"), 1);
    let calls = fake.calls();
    assert!(calls.last().unwrap().starts_with("destroy -auto-approve -input=false"));
    assert!(calls.last().unwrap().contains("name_prefix=test-basic-"));
}

#[tokio::test]
#[serial]
async fn test_failed_apply_scenario_still_destroys_once() {
    let fake = FakeTerraform::new();
    let mut scenario = catalog::basic(&fake.config());
    scenario.options = scenario
        .options
        .env("FAKE_TF_STATE", fake.state.display().to_string())
        .env("FAKE_TF_APPLY_ERROR", "Error: creating Budget: AccessDeniedException");

    let report = Runner::new(Arc::new(TerraformCli::new())).run(scenario).await;

    assert!(!report.passed());
    assert!(matches!(
        report.failures[0],
        ScenarioError::Provisioning(TerraformError::Provisioning { .. })
    ));
    assert_eq!(fake.count("output"), 0);
    assert_eq!(fake.count("destroy"), 1);
}

#[tokio::test]
#[serial]
async fn test_advanced_scenario_reports_every_missing_output() {
    let fake = FakeTerraform::new();
    fs::create_dir_all(fake.module.join("examples").join("advanced")).unwrap();
    let mut scenario = catalog::advanced(&fake.config());
    scenario.options = scenario
        .options
        .env("FAKE_TF_STATE", fake.state.display().to_string());

    let report = Runner::new(Arc::new(TerraformCli::new())).run(scenario).await;

    assert_eq!(report.failures.len(), 6);
    assert!(report.failures.iter().all(ScenarioError::is_assertion));
    assert_eq!(fake.count("destroy"), 1);
}
