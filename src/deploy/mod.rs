// ABOUTME: Release lifecycle using the type state pattern.
// ABOUTME: Build an image, create a release, wait on its release command, then follow the rollout.

mod error;
mod options;
mod rollout;
mod run;
mod state;
mod strategy;
mod transitions;

pub use error::{DeployError, DeployErrorKind};
pub use options::DeployOptions;
pub use rollout::Rollout;
pub use run::{DeployContext, DeployOutcome, run};
pub use state::{ImageBuilt, Planned, Settled, Submitted};
pub use strategy::DeploymentStrategy;
