use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::scenario::{
    Scenario, ScenarioError, ScenarioKind, Step, StepRecord, TeardownGuard, TeardownStatus,
};
use crate::terraform::{OutputSet, Provisioner, TerraformError};

#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub kind: ScenarioKind,
    pub steps: Vec<StepRecord>,
    pub failures: Vec<ScenarioError>,
    pub outputs: OutputSet,
    pub teardown: TeardownStatus,
    pub duration: Duration,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct BodyOutcome {
    steps: Vec<StepRecord>,
    failures: Vec<ScenarioError>,
    outputs: OutputSet,
}

impl BodyOutcome {
    async fn timed<T, F>(&mut self, step: Step, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, TerraformError>>,
    {
        let started = Instant::now();
        let result = fut.await;
        self.steps.push(StepRecord {
            step: step.clone(),
            passed: result.is_ok(),
            duration: started.elapsed(),
        });

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(step = %step, error = %e, "step failed");
                self.failures.push(e.into());
                None
            }
        }
    }
}

/// Executes scenarios against a [`Provisioner`].
///
/// Each scenario body runs in its own task so that a panic inside it is
/// reported as a failure instead of skipping the teardown.
#[derive(Clone)]
pub struct Runner {
    provisioner: Arc<dyn Provisioner>,
    parallelism: Option<usize>,
}

impl Runner {
    pub fn new(provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            provisioner,
            parallelism: None,
        }
    }

    /// Caps how many scenarios run at once. Unbounded by default.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism.max(1));
        self
    }

    pub async fn run(&self, scenario: Scenario) -> ScenarioReport {
        let started = Instant::now();
        tracing::info!(scenario = %scenario.name, kind = %scenario.kind, provisioner = self.provisioner.name(), "starting");

        let guard = scenario
            .kind
            .provisions()
            .then(|| TeardownGuard::arm(&scenario.name, &scenario.options));

        let provisioner = Arc::clone(&self.provisioner);
        let body_scenario = scenario.clone();
        let body =
            tokio::spawn(async move { execute(provisioner.as_ref(), &body_scenario).await });

        let mut outcome = match body.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = panic_message(e);
                tracing::error!(scenario = %scenario.name, %message, "scenario body aborted");
                BodyOutcome {
                    failures: vec![ScenarioError::Panicked(message)],
                    ..BodyOutcome::default()
                }
            }
        };

        let teardown = match guard {
            None => TeardownStatus::NotRequired,
            Some(guard) => {
                let destroy_started = Instant::now();
                let result = guard.release(self.provisioner.as_ref()).await;
                outcome.steps.push(StepRecord {
                    step: Step::Destroy,
                    passed: result.is_ok(),
                    duration: destroy_started.elapsed(),
                });
                match result {
                    Ok(()) => TeardownStatus::Destroyed,
                    Err(e) => {
                        outcome.failures.push(ScenarioError::Teardown(e));
                        TeardownStatus::Failed
                    }
                }
            }
        };

        let report = ScenarioReport {
            name: scenario.name,
            kind: scenario.kind,
            steps: outcome.steps,
            failures: outcome.failures,
            outputs: outcome.outputs,
            teardown,
            duration: started.elapsed(),
        };

        if report.passed() {
            tracing::info!(scenario = %report.name, elapsed = ?report.duration, "passed");
        } else {
            tracing::error!(scenario = %report.name, failures = report.failures.len(), "failed");
        }
        report
    }

    /// Runs all scenarios concurrently; reports come back in input order.
    pub async fn run_all(&self, scenarios: Vec<Scenario>) -> Vec<ScenarioReport> {
        let limit = self
            .parallelism
            .unwrap_or(scenarios.len())
            .clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(limit));
        let identities: Vec<(String, ScenarioKind)> =
            scenarios.iter().map(|s| (s.name.clone(), s.kind)).collect();

        let mut set = JoinSet::new();
        let mut task_slots = HashMap::new();
        for (index, scenario) in scenarios.into_iter().enumerate() {
            let runner = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let handle = set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, runner.run(scenario).await)
            });
            task_slots.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<ScenarioReport>> = identities.iter().map(|_| None).collect();
        let mut lost: HashMap<usize, String> = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(e) => {
                    if let Some(&index) = task_slots.get(&e.id()) {
                        lost.insert(index, panic_message(e));
                    }
                }
            }
        }

        // A runner task only dies if teardown itself panicked; keep the
        // scenario visible as failed.
        slots
            .into_iter()
            .zip(identities)
            .enumerate()
            .map(|(index, (slot, (name, kind)))| {
                slot.unwrap_or_else(|| ScenarioReport {
                    name,
                    kind,
                    steps: Vec::new(),
                    failures: vec![ScenarioError::Panicked(
                        lost.remove(&index).unwrap_or_else(|| "runner task lost".to_string()),
                    )],
                    outputs: OutputSet::default(),
                    teardown: if kind.provisions() {
                        TeardownStatus::Failed
                    } else {
                        TeardownStatus::NotRequired
                    },
                    duration: Duration::ZERO,
                })
            })
            .collect()
    }
}

async fn execute(provisioner: &dyn Provisioner, scenario: &Scenario) -> BodyOutcome {
    let options = &scenario.options;
    let mut outcome = BodyOutcome::default();

    match scenario.kind {
        ScenarioKind::Validate => {
            outcome.timed(Step::Validate, provisioner.validate(options)).await;
        }
        ScenarioKind::FormatCheck => {
            outcome.timed(Step::FormatCheck, provisioner.fmt_check(options)).await;
        }
        ScenarioKind::Apply => {
            if outcome
                .timed(Step::InitAndApply, provisioner.init_and_apply(options))
                .await
                .is_none()
            {
                return outcome;
            }

            let mut unreadable = HashSet::new();
            for name in scenario.output_names() {
                let started = Instant::now();
                let result = provisioner.output(options, name).await;
                outcome.steps.push(StepRecord {
                    step: Step::ReadOutput(name.to_string()),
                    passed: result.is_ok(),
                    duration: started.elapsed(),
                });
                match result {
                    Ok(value) => outcome.outputs.insert(name, value),
                    // reported by the checks on this output
                    Err(TerraformError::OutputMissing { .. }) => {}
                    Err(e) => {
                        tracing::warn!(scenario = %scenario.name, output = name, error = %e, "output read failed");
                        unreadable.insert(name);
                        outcome.failures.push(e.into());
                    }
                }
            }

            for expectation in &scenario.expectations {
                if unreadable.contains(expectation.output()) {
                    continue;
                }
                let result = expectation.evaluate(outcome.outputs.get(expectation.output()));
                outcome.steps.push(StepRecord {
                    step: Step::Check(expectation.to_string()),
                    passed: result.is_ok(),
                    duration: Duration::ZERO,
                });
                if let Err(e) = result {
                    tracing::warn!(scenario = %scenario.name, error = %e, "check failed");
                    outcome.failures.push(e);
                }
            }
        }
    }

    outcome
}

fn panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
