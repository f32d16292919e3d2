// ABOUTME: Builds an image on the organization's remote builder instead of a docker daemon.
// ABOUTME: Tunnel, forward the rsync port, wait for it, sync the tree, then run the builder's script.

use super::error::{NotReadyCause, RemoteBuildError};
use super::sync::{SourceSync, SyncFailurePolicy};
use crate::api::{ApiError, RemoteBuilderInfo};
use crate::diagnostics::{Diagnostics, Warning};
use crate::output::Output;
use crate::probe::ReadinessProbe;
use crate::tunnel::{
    ProxyBinding, ProxyError, ProxyHandle, ProxyRunner, RSYNC_LOCAL_PORT, RemoteShell, TunnelConnector,
    TunnelSession,
};
use crate::types::{AppName, DeploymentImage, ImageTag, REMOTE_BUILD_SIZE_PLACEHOLDER, TagFactory};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Finds the builder machine that serves an app's organization.
#[async_trait]
pub trait BuilderLocator: Send + Sync {
    async fn remote_builder(&self, app: &AppName) -> Result<RemoteBuilderInfo, ApiError>;
}

/// Produces an image from a working tree without a docker daemon.
#[async_trait]
pub trait RemoteBuild: Send + Sync {
    async fn build(
        &self,
        working_dir: &Path,
        app: &AppName,
        cancel: &CancellationToken,
        diagnostics: &mut Diagnostics,
    ) -> Result<DeploymentImage, RemoteBuildError>;
}

/// Command line run on the builder; the script pushes the image under `tag`.
pub fn build_command(app: &AppName, token: &str, tag: &ImageTag) -> String {
    format!("/data/source/{app}/bin/build.sh {token} {tag}")
}

pub struct RemoteBuilder {
    locator: Arc<dyn BuilderLocator>,
    connector: Arc<dyn TunnelConnector>,
    sync: Arc<dyn SourceSync>,
    shell: Arc<dyn RemoteShell>,
    tags: TagFactory,
    token: SecretString,
    probe: ReadinessProbe,
    sync_policy: SyncFailurePolicy,
    local_port: u16,
    output: Output,
}

impl RemoteBuilder {
    pub fn new(
        locator: Arc<dyn BuilderLocator>,
        connector: Arc<dyn TunnelConnector>,
        sync: Arc<dyn SourceSync>,
        shell: Arc<dyn RemoteShell>,
        tags: TagFactory,
        token: SecretString,
    ) -> Self {
        Self {
            locator,
            connector,
            sync,
            shell,
            tags,
            token,
            probe: ReadinessProbe::default(),
            sync_policy: SyncFailurePolicy::default(),
            local_port: RSYNC_LOCAL_PORT,
            output: Output::default(),
        }
    }

    pub fn probe(mut self, probe: ReadinessProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn sync_policy(mut self, policy: SyncFailurePolicy) -> Self {
        self.sync_policy = policy;
        self
    }

    /// Forward rsync from this local port instead of the default 8873.
    pub fn local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl RemoteBuild for RemoteBuilder {
    async fn build(
        &self,
        working_dir: &Path,
        app: &AppName,
        cancel: &CancellationToken,
        diagnostics: &mut Diagnostics,
    ) -> Result<DeploymentImage, RemoteBuildError> {
        let builder = self.locator.remote_builder(app).await.map_err(|source| {
            RemoteBuildError::BuilderLookupFailed {
                app: app.clone(),
                source,
            }
        })?;
        let organization = builder.app.organization.slug.as_str();
        let builder_ip = builder.machine.private_ip;
        tracing::info!(machine = %builder.machine.id, %builder_ip, %organization, "using remote builder");

        let session = self
            .connector
            .connect(organization, cancel.child_token())
            .await
            .map_err(|source| RemoteBuildError::TunnelEstablishFailed {
                organization: organization.to_string(),
                source,
            })?;

        let mut proxy = ProxyRunner::spawn(
            session.dialer(),
            app,
            ProxyBinding {
                local_port: self.local_port,
                ..ProxyBinding::rsync(builder_ip)
            },
            session.cancel_token().child_token(),
        );

        let probed = if proxy.listening().await {
            self.probe.wait_for(proxy.local_port()).await
        } else {
            Ok(())
        };
        // another process holding the port also answers the readiness dial
        if probed.is_err() || proxy.failure().is_some() {
            let source = match (proxy.stop().await, probed) {
                (Err(proxy_error), _) => NotReadyCause::Proxy(proxy_error),
                (Ok(()), Err(probe_error)) => NotReadyCause::Probe(probe_error),
                (Ok(()), Ok(())) => NotReadyCause::Proxy(ProxyError::Aborted(
                    "proxy stopped before it was ready".to_string(),
                )),
            };
            session.close();
            return Err(RemoteBuildError::TunnelNotReady {
                attempts: self.probe.attempts,
                source,
            });
        }

        self.output.progress(&format!(
            "Proxy connected. Syncing source code to the remote builder {}",
            builder.app.name
        ));

        if let Err(e) = self.sync.sync(working_dir, proxy.local_port()).await {
            let proxy_note = proxy
                .failure()
                .map(|p| format!(" (proxy: {p})"))
                .unwrap_or_default();
            match self.sync_policy {
                SyncFailurePolicy::Abort => {
                    teardown(proxy, session, diagnostics).await;
                    return Err(RemoteBuildError::SyncFailed(e));
                }
                SyncFailurePolicy::Warn => {
                    diagnostics.warn(Warning::sync_failed(format!(
                        "code rsync failed: {e}{proxy_note}"
                    )));
                }
            }
        }

        self.output.progress("Running remote build...");
        let tag = self.tags.tag(app, None);
        let address = format!("[{builder_ip}]");
        let command = build_command(app, self.token.expose_secret(), &tag);
        tracing::debug!(%address, %tag, "starting build script");

        let result = self
            .shell
            .run(session.dialer().as_ref(), &address, &command)
            .await;
        teardown(proxy, session, diagnostics).await;

        let output = result.map_err(RemoteBuildError::RemoteBuildFailed)?;
        self.output.detail(String::from_utf8_lossy(&output).trim_end());

        Ok(DeploymentImage {
            id: tag.to_string(),
            tag,
            size: REMOTE_BUILD_SIZE_PLACEHOLDER,
        })
    }
}

/// Stop forwarding, release the local port, and end the tunnel session.
async fn teardown(proxy: ProxyHandle, session: TunnelSession, diagnostics: &mut Diagnostics) {
    if let Err(e) = proxy.stop().await {
        diagnostics.warn(Warning::proxy_failed(format!("rsync proxy failed: {e}")));
    }
    session.close();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_passes_token_then_tag() {
        let app = AppName::new("web").unwrap();
        let tag = ImageTag::new("registry.hoist.dev/web:deployment-1");
        assert_eq!(
            build_command(&app, "tok", &tag),
            "/data/source/web/bin/build.sh tok registry.hoist.dev/web:deployment-1"
        );
    }
}
