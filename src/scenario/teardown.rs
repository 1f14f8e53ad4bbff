use std::fmt;

use crate::terraform::{Options, Provisioner, TerraformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStatus {
    NotRequired,
    Destroyed,
    Failed,
}

impl fmt::Display for TeardownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotRequired => "-",
            Self::Destroyed => "destroyed",
            Self::Failed => "FAILED",
        })
    }
}

/// Pending destroy for one provisioned scenario.
///
/// Armed before apply runs. [`release`](Self::release) consumes the guard, so
/// destroy can be issued at most once; a guard dropped without being released
/// means the scenario's resources may have leaked and is logged as an error.
#[must_use = "an unreleased teardown guard leaks provisioned resources"]
pub struct TeardownGuard {
    scenario: String,
    options: Option<Options>,
}

impl TeardownGuard {
    pub fn arm(scenario: &str, options: &Options) -> Self {
        tracing::debug!(scenario, dir = %options.dir().display(), "teardown armed");
        Self {
            scenario: scenario.to_string(),
            options: Some(options.clone()),
        }
    }

    pub async fn release(mut self, provisioner: &dyn Provisioner) -> Result<(), TerraformError> {
        let Some(options) = self.options.as_ref() else {
            return Ok(());
        };

        tracing::info!(scenario = %self.scenario, "destroying");
        let result = provisioner.destroy(options).await;
        self.options = None;

        match &result {
            Ok(_) => tracing::info!(scenario = %self.scenario, "destroy complete"),
            Err(e) => tracing::error!(scenario = %self.scenario, error = %e, "destroy failed"),
        }
        result.map(|_| ())
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(options) = &self.options {
            tracing::error!(
                scenario = %self.scenario,
                dir = %options.dir().display(),
                "teardown never ran, resources may have leaked"
            );
        }
    }
}

impl fmt::Debug for TeardownGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownGuard")
            .field("scenario", &self.scenario)
            .field("armed", &self.options.is_some())
            .finish()
    }
}
