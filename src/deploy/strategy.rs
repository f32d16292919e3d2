// ABOUTME: Deployment strategy reported by the platform for a release.
// ABOUTME: Decides whether there is a rollout to watch after release creation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How running instances are replaced by a release.
///
/// The platform may grow strategies this client does not know about; those are
/// kept verbatim in `Other` and treated as rollouts that need watching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentStrategy {
    /// Replace everything at once; nothing to monitor.
    Immediate,
    Canary,
    Rolling,
    Bluegreen,
    Other(String),
}

impl DeploymentStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentStrategy::Immediate => "IMMEDIATE",
            DeploymentStrategy::Canary => "CANARY",
            DeploymentStrategy::Rolling => "ROLLING",
            DeploymentStrategy::Bluegreen => "BLUEGREEN",
            DeploymentStrategy::Other(s) => s,
        }
    }

    /// Whether a release with this strategy has a rollout worth watching.
    pub fn has_rollout(&self) -> bool {
        !matches!(self, DeploymentStrategy::Immediate)
    }
}

impl From<String> for DeploymentStrategy {
    fn from(value: String) -> Self {
        let upper = value.trim().to_ascii_uppercase();
        match upper.as_str() {
            "IMMEDIATE" => DeploymentStrategy::Immediate,
            "CANARY" => DeploymentStrategy::Canary,
            "ROLLING" => DeploymentStrategy::Rolling,
            "BLUEGREEN" => DeploymentStrategy::Bluegreen,
            _ => DeploymentStrategy::Other(upper),
        }
    }
}

impl From<&str> for DeploymentStrategy {
    fn from(value: &str) -> Self {
        DeploymentStrategy::from(value.to_string())
    }
}

impl From<DeploymentStrategy> for String {
    fn from(value: DeploymentStrategy) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeploymentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
