// ABOUTME: Platform API: release submission, release lookups, and status polling.
// ABOUTME: Traits describe what the deploy flow needs; ApiClient is the HTTP implementation.

mod client;
mod error;
mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{
    AppConfigResponse, BuilderApp, BuilderMachine, CommandPhase, DeployImageInput,
    DeployImageResponse, DeploymentStatus, Organization, Release, ReleaseCommand,
    ReleaseCommandStatus, RemoteBuilderInfo, RolloutPhase,
};

use crate::types::{AppName, EvaluationId, ReleaseCommandId, ReleaseId};
use async_trait::async_trait;

/// Creating and reading releases.
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    /// Create a release for an image; may also start a release command.
    async fn deploy_image(&self, input: &DeployImageInput) -> Result<DeployImageResponse, ApiError>;

    async fn get_release(&self, app: &AppName, id: &ReleaseId) -> Result<Release, ApiError>;
}

/// Point-in-time status of things that run after a release is created.
#[async_trait]
pub trait StatusApi: Send + Sync {
    async fn release_command_status(
        &self,
        id: &ReleaseCommandId,
    ) -> Result<ReleaseCommandStatus, ApiError>;

    async fn deployment_status(
        &self,
        evaluation: &EvaluationId,
    ) -> Result<DeploymentStatus, ApiError>;
}
