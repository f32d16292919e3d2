// ABOUTME: Source tree synchronization to the remote builder's rsync daemon.
// ABOUTME: Runs rsync against the locally forwarded port with output passed through.

use super::error::SyncError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// What a failed sync does to the rest of the remote build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncFailurePolicy {
    /// Record a warning and build whatever source the builder already has.
    #[default]
    Warn,
    Abort,
}

impl SyncFailurePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            SyncFailurePolicy::Abort
        } else {
            SyncFailurePolicy::Warn
        }
    }
}

/// Copies a working tree to the builder through a local port.
#[async_trait]
pub trait SourceSync: Send + Sync {
    async fn sync(&self, working_dir: &Path, local_port: u16) -> Result<(), SyncError>;
}

#[derive(Debug, Clone)]
pub struct RsyncSync {
    program: PathBuf,
}

impl Default for RsyncSync {
    fn default() -> Self {
        Self {
            program: PathBuf::from("rsync"),
        }
    }
}

impl RsyncSync {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl SourceSync for RsyncSync {
    async fn sync(&self, working_dir: &Path, local_port: u16) -> Result<(), SyncError> {
        let args = rsync_args(working_dir, local_port);
        tracing::debug!(program = %self.program.display(), ?args, "running rsync");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| SyncError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SyncError::Exited(status))
        }
    }
}

/// Arguments for syncing `working_dir` to the rsync daemon behind `localhost:<local_port>`.
///
/// `.dockerignore` entries are excluded when the file exists.
pub fn rsync_args(working_dir: &Path, local_port: u16) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--archive".into(), "--checksum".into(), "--verbose".into()];

    let ignore = working_dir.join(".dockerignore");
    if ignore.is_file() {
        let mut exclude = OsString::from("--exclude-from=");
        exclude.push(&ignore);
        args.push(exclude);
    }

    args.push(working_dir.as_os_str().to_owned());
    args.push(format!("rsync://root@localhost:{local_port}/data").into());
    args
}
