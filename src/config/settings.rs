// ABOUTME: Process-level settings read from the environment once at startup.
// ABOUTME: The API token is captured here and threaded explicitly to every consumer.

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.hoist.dev";
pub const DEFAULT_REGISTRY: &str = "registry.hoist.dev";
pub const DEFAULT_GATEWAY_HOST: &str = "gateway.hoist.dev";

const API_TOKEN_VAR: &str = "HOIST_API_TOKEN";

/// Settings that are not part of any one app's config.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_token: SecretString,
    pub api_url: String,
    /// Registry host that deployment tags are qualified with.
    pub registry: String,
    pub gateway_host: String,
    pub gateway_port: u16,
    /// Private key for tunnel and builder SSH; agent and default keys are tried otherwise.
    pub ssh_key: Option<PathBuf>,
    /// known_hosts file checked for the gateway key; `~/.ssh/known_hosts` otherwise.
    pub known_hosts: Option<PathBuf>,
    /// Accept and remember an unknown gateway host key.
    pub trust_new_hosts: bool,
    /// Forces every deployment tag to this reference.
    pub image_ref: Option<String>,
    /// Docker daemon to use when local builds are disabled.
    pub docker_host: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let api_token = var(API_TOKEN_VAR)
            .map(SecretString::from)
            .ok_or_else(|| Error::MissingEnvVar(API_TOKEN_VAR.to_string()))?;

        let gateway_port = match var("HOIST_GATEWAY_PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| Error::InvalidConfig(format!("invalid HOIST_GATEWAY_PORT: {port}")))?,
            None => 22,
        };

        Ok(Self {
            api_token,
            api_url: var("HOIST_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            registry: var("HOIST_REGISTRY").unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
            gateway_host: var("HOIST_GATEWAY_HOST")
                .unwrap_or_else(|| DEFAULT_GATEWAY_HOST.to_string()),
            gateway_port,
            ssh_key: var("HOIST_SSH_KEY").map(PathBuf::from),
            known_hosts: var("HOIST_KNOWN_HOSTS").map(PathBuf::from),
            trust_new_hosts: var("HOIST_TRUST_NEW_HOSTS")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            image_ref: var("HOIST_IMAGE_REF"),
            docker_host: var("HOIST_DOCKER_HOST"),
        })
    }
}

/// Non-empty value of an environment variable.
fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
