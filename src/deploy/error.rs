// ABOUTME: Deploy error types with SNAFU pattern.
// ABOUTME: One variant per pipeline stage, each wrapping the collaborator's failure.

use snafu::Snafu;

use crate::api::ApiError;
use crate::build::{BuildError, RemoteBuildError};
use crate::watch::WatchError;

/// Failure of a deploy stage.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeployError {
    #[snafu(display("failed to fetch an image or build from source"))]
    BuildFailed { source: BuildError },

    #[snafu(display("failed to create release"))]
    ReleaseSubmitFailed { source: ApiError },

    #[snafu(display("release command failed - aborting deployment"))]
    ReleaseCommandFailed { source: WatchError },

    #[snafu(display("failed to fetch release after release command"))]
    ReleaseFetchFailed { source: ApiError },

    #[snafu(display("deployment failed"))]
    DeploymentWatchFailed { source: WatchError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Builder lookup, tunnel, sync, or remote script failure.
    RemoteBuild,
    /// Docker resolution or build input failure.
    ImageBuild,
    /// The platform rejected or failed a request.
    Api,
    ReleaseCommand,
    Deployment,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::BuildFailed { source } => match source {
                BuildError::Remote(_) => DeployErrorKind::RemoteBuild,
                _ => DeployErrorKind::ImageBuild,
            },
            DeployError::ReleaseSubmitFailed { .. } | DeployError::ReleaseFetchFailed { .. } => {
                DeployErrorKind::Api
            }
            DeployError::ReleaseCommandFailed { .. } => DeployErrorKind::ReleaseCommand,
            DeployError::DeploymentWatchFailed { .. } => DeployErrorKind::Deployment,
        }
    }

    /// The remote build failure, if the build went through the remote builder.
    pub fn remote_build_error(&self) -> Option<&RemoteBuildError> {
        match self {
            DeployError::BuildFailed {
                source: BuildError::Remote(e),
            } => Some(e),
            _ => None,
        }
    }
}
