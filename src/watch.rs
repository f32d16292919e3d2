// ABOUTME: Follows work the platform does after a release is created.
// ABOUTME: Polls release commands and deployments until they reach a terminal phase.

use crate::api::{ApiError, CommandPhase, RolloutPhase, StatusApi};
use crate::output::Output;
use crate::types::{EvaluationId, ReleaseCommandId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("status request failed")]
    Api(#[from] ApiError),

    #[error("release command failed{}", exit_suffix(.exit_code))]
    CommandFailed { exit_code: Option<i32> },

    #[error("deployment {phase:?}: {description}")]
    DeploymentFailed {
        phase: RolloutPhase,
        description: String,
    },

    #[error("gave up waiting after {0:?}")]
    Timeout(Duration),
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|c| format!(" with exit code {c}"))
        .unwrap_or_default()
}

/// Waits on release commands and deployments.
#[async_trait]
pub trait ReleaseWatcher: Send + Sync {
    /// Block until the release command finishes; error if it did not succeed.
    async fn release_command(&self, id: &ReleaseCommandId) -> Result<(), WatchError>;

    /// Block until the deployment for `evaluation` settles; error unless it succeeded.
    async fn deployment(&self, evaluation: &EvaluationId) -> Result<(), WatchError>;
}

pub struct PollingWatcher {
    api: Arc<dyn StatusApi>,
    poll_interval: Duration,
    wait_timeout: Duration,
    output: Output,
}

impl PollingWatcher {
    pub fn new(api: Arc<dyn StatusApi>, poll_interval: Duration, wait_timeout: Duration) -> Self {
        Self {
            api,
            poll_interval,
            wait_timeout,
            output: Output::default(),
        }
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl ReleaseWatcher for PollingWatcher {
    async fn release_command(&self, id: &ReleaseCommandId) -> Result<(), WatchError> {
        self.output.progress("Running release command");
        let start = tokio::time::Instant::now();

        while start.elapsed() < self.wait_timeout {
            let status = self.api.release_command_status(id).await?;
            tracing::debug!(release_command = %id, phase = ?status.phase, "polled");

            match status.phase {
                CommandPhase::Succeeded => return Ok(()),
                CommandPhase::Failed => {
                    return Err(WatchError::CommandFailed {
                        exit_code: status.exit_code,
                    });
                }
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }

        Err(WatchError::Timeout(self.wait_timeout))
    }

    async fn deployment(&self, evaluation: &EvaluationId) -> Result<(), WatchError> {
        self.output.progress("Monitoring deployment");
        let start = tokio::time::Instant::now();
        let mut last_seen = None;

        while start.elapsed() < self.wait_timeout {
            let status = self.api.deployment_status(evaluation).await?;

            let progress = (status.healthy, status.desired);
            if last_seen != Some(progress) && status.desired > 0 {
                self.output.detail(&format!(
                    "{} of {} instances healthy",
                    status.healthy, status.desired
                ));
                last_seen = Some(progress);
            }

            match status.phase {
                RolloutPhase::Successful => return Ok(()),
                phase if phase.is_terminal() => {
                    return Err(WatchError::DeploymentFailed {
                        phase,
                        description: status.description.unwrap_or_default(),
                    });
                }
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }

        Err(WatchError::Timeout(self.wait_timeout))
    }
}
