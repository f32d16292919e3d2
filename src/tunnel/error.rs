// ABOUTME: Tunnel-specific error types.
// ABOUTME: Covers gateway connection, authentication, dialing, and remote command failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: no valid credentials")]
    AuthenticationFailed,

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("invalid address {0:?}: expected host:port")]
    InvalidAddress(String),

    #[error("failed to dial {addr} through the tunnel: {reason}")]
    DialFailed { addr: String, reason: String },

    #[error("tunnel session is closed")]
    Closed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TunnelError>;

/// Failure running a command on a machine reached through the tunnel.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("could not reach {address}")]
    Connect {
        address: String,
        #[source]
        source: TunnelError,
    },

    #[error("command execution failed: {0}")]
    Exec(String),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("command exited with status {exit_code}: {stderr}")]
    NonZeroExit { exit_code: u32, stderr: String },
}

/// Failure of the background port-forwarding task.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to listen on 127.0.0.1:{port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("proxy task ended abnormally: {0}")]
    Aborted(String),
}
