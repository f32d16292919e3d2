// ABOUTME: Rollout struct with type-state parameter.
// ABOUTME: Holds everything a deploy run needs; the state says how far it has got.

use super::options::DeployOptions;
use super::state::{ImageBuilt, Planned, Settled, Submitted};
use crate::api::Release;
use crate::config::Config;
use crate::types::{AppName, DeploymentImage};

/// A single deploy run for one app.
///
/// Transitions consume the rollout and return it in the next state, so each
/// stage runs at most once and only after the stages it depends on.
#[derive(Debug)]
pub struct Rollout<S> {
    pub(crate) app: AppName,
    pub(crate) config: Config,
    pub(crate) options: DeployOptions,
    pub(crate) state: S,
}

impl Rollout<Planned> {
    pub fn new(app: AppName, config: Config, options: DeployOptions) -> Self {
        Rollout {
            app,
            config,
            options,
            state: Planned,
        }
    }
}

impl<S> Rollout<S> {
    pub fn app(&self) -> &AppName {
        &self.app
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &DeployOptions {
        &self.options
    }

    /// Move to the next state, keeping the run's inputs.
    pub(crate) fn advance<T>(self, next: impl FnOnce(S) -> T) -> Rollout<T> {
        Rollout {
            app: self.app,
            config: self.config,
            options: self.options,
            state: next(self.state),
        }
    }
}

impl Rollout<ImageBuilt> {
    pub fn image(&self) -> &DeploymentImage {
        &self.state.image
    }

    /// End a build-only run.
    pub fn finish_build(self) -> DeploymentImage {
        self.state.image
    }
}

impl Rollout<Submitted> {
    pub fn image(&self) -> &DeploymentImage {
        &self.state.image
    }

    pub fn release(&self) -> &Release {
        &self.state.release
    }

    pub fn has_release_command(&self) -> bool {
        self.state.release_command.is_some()
    }

    /// End the run without waiting on the platform.
    pub fn detach(self) -> Release {
        self.state.release
    }
}

impl Rollout<Settled> {
    pub fn image(&self) -> &DeploymentImage {
        &self.state.image
    }

    pub fn release(&self) -> &Release {
        &self.state.release
    }

    /// Whether a deployment was monitored before settling.
    pub fn was_watched(&self) -> bool {
        self.state.watched
    }

    pub fn finish(self) -> Release {
        self.state.release
    }
}
