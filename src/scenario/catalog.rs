//! The FinOps module scenarios.
//!
//! `basic` and `advanced` provision the matching example and check its
//! outputs; `validation` and `format` only inspect the module root.

use super::{Expectation, Scenario, ScenarioKind};
use crate::config::RunConfig;
use crate::error::HarnessError;

pub const BASIC: &str = "basic";
pub const ADVANCED: &str = "advanced";
pub const VALIDATION: &str = "validation";
pub const FORMAT: &str = "format";

pub const SCENARIO_NAMES: &[&str] = &[BASIC, ADVANCED, VALIDATION, FORMAT];

const ADVANCED_OUTPUTS: &[&str] = &[
    "production_budget_id",
    "development_budget_id",
    "budget_action_id",
    "cost_usage_report_id",
    "s3_bucket_id",
    "iam_role_arn",
];

pub fn basic(config: &RunConfig) -> Scenario {
    let options = config
        .options_for(config.example_dir(BASIC))
        .var("name_prefix", config.name_prefix(BASIC))
        .var("environment", config.environment.clone());

    Scenario::new(BASIC, ScenarioKind::Apply, options)
        .expect(Expectation::non_empty("budget_id"))
        .expect(Expectation::non_empty("budget_arn"))
        .expect(Expectation::non_empty("account_id"))
        .expect(Expectation::contains("budget_arn", "budgets"))
}

pub fn advanced(config: &RunConfig) -> Scenario {
    let options = config
        .options_for(config.example_dir(ADVANCED))
        .var("name_prefix", config.name_prefix(ADVANCED))
        .var("environment", config.environment.clone());

    ADVANCED_OUTPUTS.iter().fold(
        Scenario::new(ADVANCED, ScenarioKind::Apply, options),
        |scenario, output| scenario.expect(Expectation::non_empty(*output)),
    )
}

pub fn validation(config: &RunConfig) -> Scenario {
    Scenario::new(
        VALIDATION,
        ScenarioKind::Validate,
        config.options_for(&config.module_dir),
    )
}

pub fn format(config: &RunConfig) -> Scenario {
    Scenario::new(
        FORMAT,
        ScenarioKind::FormatCheck,
        config.options_for(&config.module_dir),
    )
}

pub fn finops_scenarios(config: &RunConfig) -> Vec<Scenario> {
    vec![
        basic(config),
        advanced(config),
        validation(config),
        format(config),
    ]
}

/// Scenarios by name, in the order given; an empty list selects all of them.
pub fn select(config: &RunConfig, names: &[String]) -> Result<Vec<Scenario>, HarnessError> {
    if names.is_empty() {
        return Ok(finops_scenarios(config));
    }

    names
        .iter()
        .map(|name| match name.as_str() {
            BASIC => Ok(basic(config)),
            ADVANCED => Ok(advanced(config)),
            VALIDATION => Ok(validation(config)),
            FORMAT => Ok(format(config)),
            other => Err(HarnessError::UnknownScenario(other.to_string())),
        })
        .collect()
}
