// ABOUTME: Application-wide error types for hoist.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::api::ApiError;
use crate::build::ResolveError;
use crate::deploy::DeployError;
use crate::types::AppNameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no app name: pass --app or set `app` in hoist.yml")]
    MissingAppName,

    #[error("invalid app name: {0}")]
    InvalidAppName(#[from] AppNameError),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("'{0}' must be in the format NAME=VALUE")]
    InvalidKeyValue(String),

    #[error("failed fetching existing app config")]
    ConfigFetchFailed(#[source] ApiError),

    #[error("failed to set up the API client")]
    ApiClient(#[source] ApiError),

    #[error("no docker daemon available")]
    Daemon(#[from] ResolveError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
