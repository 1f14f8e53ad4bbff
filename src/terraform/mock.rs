//! In-memory provisioner for exercising the scenario runner.
//!
//! Records every call so tests can assert on ordering and on the
//! exactly-once teardown, without a real tool or cloud account.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Options, OutputSet, Provisioner, TerraformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Apply,
    Output,
    OutputAll,
    Validate,
    FmtCheck,
    Destroy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub operation: Operation,
    pub dir: PathBuf,
    pub output_name: Option<String>,
}

#[derive(Debug, Default)]
struct Behavior {
    outputs: OutputSet,
    failing: HashSet<Operation>,
    panicking: HashSet<Operation>,
    holding: HashMap<Operation, Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct MockProvisioner {
    behavior: Arc<Mutex<Behavior>>,
    calls: Arc<Mutex<Vec<Call>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(self, name: &str, value: &str) -> Self {
        self.lock_behavior().outputs.insert(name, value);
        self
    }

    /// Makes `operation` return a provisioning error.
    pub fn failing(self, operation: Operation) -> Self {
        self.lock_behavior().failing.insert(operation);
        self
    }

    /// Makes `operation` panic, as a misbehaving scenario body would.
    pub fn panicking(self, operation: Operation) -> Self {
        self.lock_behavior().panicking.insert(operation);
        self
    }

    /// Makes `operation` take `duration` before answering, like a slow
    /// apply would.
    pub fn holding(self, operation: Operation, duration: Duration) -> Self {
        self.lock_behavior().holding.insert(operation, duration);
        self
    }

    /// Most held operations that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .expect("MockProvisioner calls mutex poisoned")
            .clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.calls().into_iter().map(|c| c.operation).collect()
    }

    fn lock_behavior(&self) -> std::sync::MutexGuard<'_, Behavior> {
        self.behavior
            .lock()
            .expect("MockProvisioner behavior mutex poisoned")
    }

    fn record(
        &self,
        operation: Operation,
        options: &Options,
        output_name: Option<&str>,
    ) -> Result<(), TerraformError> {
        self.calls
            .lock()
            .expect("MockProvisioner calls mutex poisoned")
            .push(Call {
                operation,
                dir: options.terraform_dir.clone(),
                output_name: output_name.map(str::to_string),
            });

        let (fails, panics) = {
            let behavior = self.lock_behavior();
            (
                behavior.failing.contains(&operation),
                behavior.panicking.contains(&operation),
            )
        };

        if panics {
            panic!(
                "mock {operation:?} panicked in {}",
                options.terraform_dir.display()
            );
        }
        if fails {
            return Err(TerraformError::Provisioning {
                command: format!("mock {operation:?}"),
                exit_code: Some(1),
                output: format!("Error: mock {operation:?} failure"),
            });
        }
        Ok(())
    }

    async fn hold(&self, operation: Operation) {
        let delay = self.lock_behavior().holding.get(&operation).copied();
        let Some(duration) = delay else {
            return;
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(duration).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn init(&self, options: &Options) -> Result<String, TerraformError> {
        self.record(Operation::Init, options, None)?;
        self.hold(Operation::Init).await;
        Ok("Terraform has been successfully initialized!".to_string())
    }

    async fn apply(&self, options: &Options) -> Result<String, TerraformError> {
        self.record(Operation::Apply, options, None)?;
        self.hold(Operation::Apply).await;
        Ok("Apply complete!".to_string())
    }

    async fn output(&self, options: &Options, name: &str) -> Result<String, TerraformError> {
        self.record(Operation::Output, options, Some(name))?;
        self.lock_behavior()
            .outputs
            .get(name)
            .map(str::to_string)
            .ok_or_else(|| TerraformError::OutputMissing {
                name: name.to_string(),
            })
    }

    async fn output_all(&self, options: &Options) -> Result<OutputSet, TerraformError> {
        self.record(Operation::OutputAll, options, None)?;
        Ok(self.lock_behavior().outputs.clone())
    }

    async fn validate(&self, options: &Options) -> Result<String, TerraformError> {
        self.record(Operation::Validate, options, None)?;
        self.hold(Operation::Validate).await;
        Ok("Success! The configuration is valid.".to_string())
    }

    async fn fmt_check(&self, options: &Options) -> Result<String, TerraformError> {
        self.record(Operation::FmtCheck, options, None)?;
        self.hold(Operation::FmtCheck).await;
        Ok(String::new())
    }

    async fn destroy(&self, options: &Options) -> Result<String, TerraformError> {
        self.record(Operation::Destroy, options, None)?;
        self.hold(Operation::Destroy).await;
        Ok("Destroy complete!".to_string())
    }
}
