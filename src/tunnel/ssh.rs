// ABOUTME: Shared russh plumbing: host key verification, credential lookup, and authentication.
// ABOUTME: Used both for the gateway connection and for shells opened inside the tunnel.

use super::error::{Result, TunnelError};
use russh::client::{self, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// How a server's host key is judged.
#[derive(Debug, Clone)]
pub enum HostKeyPolicy {
    /// Check against known_hosts, optionally learning unknown hosts.
    KnownHosts {
        trust_on_first_use: bool,
        path: Option<PathBuf>,
    },
    /// Machines reached through an authenticated gateway have no stable public identity.
    Tunneled,
}

/// russh client handler carrying the host being verified.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl SshHandler {
    pub(crate) fn new(host: impl Into<String>, port: u16, policy: HostKeyPolicy) -> Self {
        Self {
            host: host.into(),
            port,
            policy,
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let (trust_on_first_use, path) = match &self.policy {
            HostKeyPolicy::Tunneled => return Ok(true),
            HostKeyPolicy::KnownHosts {
                trust_on_first_use,
                path,
            } => (*trust_on_first_use, path.as_deref()),
        };

        let check_result = match path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learned = match path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learned {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::warn!("host key for {}:{} has changed", self.host, self.port);
                Ok(false)
            }
            Err(_) => Ok(trust_on_first_use),
        }
    }
}

pub(crate) fn client_config() -> Arc<client::Config> {
    Arc::new(client::Config {
        inactivity_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    })
}

/// Credentials chosen for a connection.
pub(crate) enum AuthMethod {
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// Explicit key first, then the SSH agent, then the usual key files under `~/.ssh`.
pub(crate) async fn resolve_auth_method(key_path: Option<&Path>) -> Result<AuthMethod> {
    if let Some(key_path) = key_path {
        let key = load_secret_key(key_path, None).map_err(|e| TunnelError::KeyLoadFailed {
            path: key_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        return Ok(AuthMethod::KeyFile(Arc::new(key)));
    }

    if let Ok(agent) = AgentClient::connect_env().await {
        return Ok(AuthMethod::Agent(agent));
    }

    let home = std::env::var("HOME").map_err(|_| {
        TunnelError::AgentUnavailable("SSH agent not available and HOME not set".to_string())
    })?;

    for name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
        let candidate = Path::new(&home).join(".ssh").join(name);
        if let Ok(key) = load_secret_key(&candidate, None) {
            return Ok(AuthMethod::KeyFile(Arc::new(key)));
        }
    }

    Err(TunnelError::AgentUnavailable(
        "SSH agent not available and no default keys found".to_string(),
    ))
}

/// Authenticate `user`; fails with `AuthenticationFailed` when no credential is accepted.
pub(crate) async fn authenticate(
    session: &mut Handle<SshHandler>,
    user: &str,
    auth_method: AuthMethod,
) -> Result<()> {
    let accepted = match auth_method {
        AuthMethod::Agent(mut agent) => {
            let keys = agent.request_identities().await.map_err(|e| {
                TunnelError::AgentUnavailable(format!("failed to list agent keys: {}", e))
            })?;

            if keys.is_empty() {
                return Err(TunnelError::AgentUnavailable(
                    "no keys in SSH agent".to_string(),
                ));
            }

            let mut accepted = false;
            for key in &keys {
                match session
                    .authenticate_publickey_with(user, key.clone(), None, &mut agent)
                    .await
                {
                    Ok(result) if result.success() => {
                        accepted = true;
                        break;
                    }
                    _ => continue,
                }
            }
            accepted
        }
        AuthMethod::KeyFile(key) => {
            let hash_alg = session.best_supported_rsa_hash().await?.flatten();
            session
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await?
                .success()
        }
    };

    if accepted {
        Ok(())
    } else {
        Err(TunnelError::AuthenticationFailed)
    }
}
