// ABOUTME: Runs commands on machines reachable only through the tunnel.
// ABOUTME: Opens an SSH session over a dialed tunnel stream and captures the command's output.

use super::dialer::Dialer;
use super::error::{ShellError, TunnelError};
use super::ssh::{HostKeyPolicy, SshHandler, authenticate, client_config, resolve_auth_method};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;

/// Executes a command on `address` (host in `[ip]` form) using the session's dialer.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    async fn run(
        &self,
        dialer: &dyn Dialer,
        address: &str,
        command: &str,
    ) -> Result<Bytes, ShellError>;
}

/// SSH shell to builder machines inside the organization network.
#[derive(Debug, Clone)]
pub struct SshShell {
    user: String,
    port: u16,
    key_path: Option<PathBuf>,
}

impl Default for SshShell {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: 22,
            key_path: None,
        }
    }
}

impl SshShell {
    pub fn new(key_path: Option<PathBuf>) -> Self {
        Self {
            key_path,
            ..Default::default()
        }
    }

    async fn connect(
        &self,
        dialer: &dyn Dialer,
        address: &str,
    ) -> Result<Handle<SshHandler>, TunnelError> {
        let stream = dialer.dial(&format!("{address}:{}", self.port)).await?;
        let auth_method = resolve_auth_method(self.key_path.as_deref()).await?;
        let handler = SshHandler::new(address, self.port, HostKeyPolicy::Tunneled);

        let mut handle = client::connect_stream(client_config(), stream, handler)
            .await
            .map_err(|e| TunnelError::Connection(format!("{address}: {e}")))?;
        authenticate(&mut handle, &self.user, auth_method).await?;
        Ok(handle)
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn run(
        &self,
        dialer: &dyn Dialer,
        address: &str,
        command: &str,
    ) -> Result<Bytes, ShellError> {
        let handle = self
            .connect(dialer, address)
            .await
            .map_err(|source| ShellError::Connect {
                address: address.to_string(),
                source,
            })?;

        tracing::debug!(%address, "running remote command");
        let result = exec(&handle, command).await;

        if let Err(e) = handle.disconnect(Disconnect::ByApplication, "", "en").await {
            tracing::debug!("remote shell disconnect error: {}", e);
        }

        result
    }
}

async fn exec(handle: &Handle<SshHandler>, command: &str) -> Result<Bytes, ShellError> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| ShellError::Exec(format!("failed to open channel: {}", e)))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| ShellError::Exec(format!("failed to exec command: {}", e)))?;

    let mut stdout = BytesMut::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;
    let mut got_eof = false;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => stdout.extend_from_slice(&data),
            Some(ChannelMsg::ExtendedData { data, ext: 1 }) => stderr.extend_from_slice(&data),
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                exit_code = Some(exit_status);
                if got_eof {
                    break;
                }
            }
            Some(ChannelMsg::Eof) => {
                got_eof = true;
                if exit_code.is_some() {
                    break;
                }
            }
            Some(ChannelMsg::Close) | None => break,
            Some(_) => {}
        }
    }

    match exit_code {
        None => Err(ShellError::ChannelClosed),
        Some(0) => Ok(stdout.freeze()),
        Some(exit_code) => Err(ShellError::NonZeroExit {
            exit_code,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        }),
    }
}
