// ABOUTME: Rollout state types for the type state pattern.
// ABOUTME: Each state carries what the earlier stages produced, so later stages cannot run early.

use crate::api::{Release, ReleaseCommand};
use crate::types::DeploymentImage;

/// Initial state: app and config resolved, nothing built.
/// Available actions: `build_image()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Planned;

/// Image acquired.
/// Available actions: `submit()`, `finish_build()`
#[derive(Debug, Clone)]
pub struct ImageBuilt {
    pub(crate) image: DeploymentImage,
}

/// Release created on the platform.
/// Available actions: `await_release_command()`, `dispatch()`, `detach()`
#[derive(Debug, Clone)]
pub struct Submitted {
    pub(crate) image: DeploymentImage,
    pub(crate) release: Release,
    pub(crate) release_command: Option<ReleaseCommand>,
}

/// Release reached its steady state (or has nothing to watch).
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Settled {
    pub(crate) image: DeploymentImage,
    pub(crate) release: Release,
    pub(crate) watched: bool,
}
