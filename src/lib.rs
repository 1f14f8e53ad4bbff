//! finops-tftest - integration test harness for the AWS FinOps Terraform module
//!
//! Provisions the module's examples through the `terraform` CLI, checks their
//! outputs, and always destroys what it created.

pub mod config;
pub mod notify;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod terraform;

mod error;

pub use config::RunConfig;
pub use error::HarnessError;
pub use runner::{Runner, ScenarioReport};
pub use scenario::{Expectation, Scenario, ScenarioError, ScenarioKind};
pub use terraform::{Options, OutputSet, Provisioner, TerraformCli, TerraformError};
