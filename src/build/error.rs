// ABOUTME: Errors from producing a deployment image.
// ABOUTME: Remote builder failures, docker resolution failures, and option validation.

use crate::api::ApiError;
use crate::probe::{ProbeError, RetryError};
use crate::tunnel::{ProxyError, ShellError, TunnelError};
use crate::types::AppName;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rsync exited with {0}")]
    Exited(ExitStatus),
}

/// Why the forwarded port never became reachable.
#[derive(Debug, Error)]
pub enum NotReadyCause {
    #[error(transparent)]
    Proxy(ProxyError),

    #[error(transparent)]
    Probe(RetryError<ProbeError>),
}

#[derive(Debug, Error)]
pub enum RemoteBuildError {
    #[error("failed to locate the remote builder for {app}")]
    BuilderLookupFailed {
        app: AppName,
        #[source]
        source: ApiError,
    },

    #[error("failed to open a tunnel to organization {organization}")]
    TunnelEstablishFailed {
        organization: String,
        #[source]
        source: TunnelError,
    },

    #[error("rsync proxy failed to connect after {attempts} attempts")]
    TunnelNotReady {
        attempts: u32,
        #[source]
        source: NotReadyCause,
    },

    #[error("source sync failed")]
    SyncFailed(#[source] SyncError),

    #[error("remote build failed")]
    RemoteBuildFailed(#[source] ShellError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no docker daemon available: {0}")]
    NoDaemon(String),

    #[error("docker daemon error")]
    Daemon(#[from] bollard::errors::Error),

    #[error("failed to pull {reference}")]
    Pull {
        reference: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("image {0} not found after build")]
    MissingImage(String),

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Remote(#[from] RemoteBuildError),

    #[error("failed to resolve image")]
    Resolve(#[from] ResolveError),

    #[error("invalid build args: {0}")]
    InvalidBuildArgs(String),

    #[error("invalid dockerfile path {path}")]
    DockerfilePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no image specified")]
    NoImageProduced,
}
