// ABOUTME: Tunnel sessions carried over SSH to the organization's gateway.
// ABOUTME: Dials private addresses with direct-tcpip channels on a single authenticated connection.

use super::dialer::{BoxedStream, Dialer, TunnelConnector, TunnelSession, split_host_port};
use super::error::{Result, TunnelError};
use super::ssh::{
    HostKeyPolicy, SshHandler, authenticate, client_config, resolve_auth_method,
};
use crate::config::Settings;
use async_trait::async_trait;
use russh::Disconnect;
use russh::client::{self, Handle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Connects to the gateway, authenticating as the organization.
#[derive(Debug, Clone)]
pub struct GatewayConnector {
    host: String,
    port: u16,
    key_path: Option<PathBuf>,
    host_keys: HostKeyPolicy,
}

impl GatewayConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            key_path: None,
            host_keys: HostKeyPolicy::KnownHosts {
                trust_on_first_use: false,
                path: None,
            },
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut connector = Self::new(settings.gateway_host.clone(), settings.gateway_port);
        connector.key_path = settings.ssh_key.clone();
        connector.host_keys = HostKeyPolicy::KnownHosts {
            trust_on_first_use: settings.trust_new_hosts,
            path: settings.known_hosts.clone(),
        };
        connector
    }
}

#[async_trait]
impl TunnelConnector for GatewayConnector {
    async fn connect(&self, organization: &str, cancel: CancellationToken) -> Result<TunnelSession> {
        let auth_method = resolve_auth_method(self.key_path.as_deref()).await?;
        let handler = SshHandler::new(self.host.clone(), self.port, self.host_keys.clone());

        tracing::debug!(gateway = %self.host, port = self.port, %organization, "connecting to gateway");
        let mut handle = client::connect(client_config(), (self.host.as_str(), self.port), handler)
            .await
            .map_err(|e| {
                TunnelError::Connection(format!("{}:{}: {}", self.host, self.port, e))
            })?;

        authenticate(&mut handle, organization, auth_method).await?;

        let handle = Arc::new(handle);
        let closer = Arc::clone(&handle);
        let token = cancel.clone();
        tokio::spawn(async move {
            token.cancelled().await;
            if let Err(e) = closer
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
            {
                tracing::debug!("gateway disconnect error: {}", e);
            }
        });

        let session = GatewaySession {
            organization: organization.to_string(),
            handle,
        };
        Ok(TunnelSession::new(Arc::new(session), cancel))
    }
}

/// Dialer backed by an authenticated gateway connection.
pub struct GatewaySession {
    organization: String,
    handle: Arc<Handle<SshHandler>>,
}

#[async_trait]
impl Dialer for GatewaySession {
    fn organization(&self) -> &str {
        &self.organization
    }

    async fn dial(&self, addr: &str) -> Result<BoxedStream> {
        if self.handle.is_closed() {
            return Err(TunnelError::Closed);
        }

        let (host, port) = split_host_port(addr)?;
        let channel = self
            .handle
            .channel_open_direct_tcpip(host, u32::from(port), "127.0.0.1", 0)
            .await
            .map_err(|e| TunnelError::DialFailed {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(channel.into_stream()))
    }
}
