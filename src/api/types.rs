// ABOUTME: Request and response bodies exchanged with the platform API.
// ABOUTME: Releases, release commands, status polls, and remote builder descriptors.

use crate::config::Definition;
use crate::deploy::DeploymentStrategy;
use crate::types::{
    AppName, EvaluationId, ImageTag, MachineId, ReleaseCommandId, ReleaseId,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One deployment attempt of an image against an app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Release {
    pub id: ReleaseId,
    pub version: u64,
    pub evaluation_id: EvaluationId,
    pub deployment_strategy: DeploymentStrategy,
}

/// Command that must succeed before a release becomes visible.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReleaseCommand {
    pub id: ReleaseCommandId,
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployImageInput {
    pub app: AppName,
    pub image: ImageTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<Definition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployImageResponse {
    pub release: Release,
    #[serde(default)]
    pub release_command: Option<ReleaseCommand>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfigResponse {
    pub definition: Definition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl CommandPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandPhase::Succeeded | CommandPhase::Failed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseCommandStatus {
    pub phase: CommandPhase,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutPhase {
    Pending,
    Running,
    Successful,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RolloutPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RolloutPhase::Successful | RolloutPhase::Failed | RolloutPhase::Cancelled
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentStatus {
    pub phase: RolloutPhase,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub desired: u32,
    #[serde(default)]
    pub healthy: u32,
}

/// Machine that performs builds for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuilderMachine {
    pub id: MachineId,
    pub private_ip: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub slug: String,
}

/// The app that owns the builder machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuilderApp {
    pub name: String,
    pub organization: Organization,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteBuilderInfo {
    pub machine: BuilderMachine,
    pub app: BuilderApp,
}
