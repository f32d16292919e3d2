// ABOUTME: In-process stand-ins for the platform API, tunnel, rsync, shell, and docker.
// ABOUTME: Each fake records what it was asked to do so tests can assert on it.

use async_trait::async_trait;
use bytes::Bytes;
use hoist::api::{ApiError, RemoteBuilderInfo};
use hoist::build::{
    BuilderLocator, ImageOptions, ImageResolver, RefOptions, RemoteBuild, RemoteBuildError,
    ResolveError, SourceSync, SyncError,
};
use hoist::diagnostics::{Diagnostics, Warning};
use hoist::tunnel::{
    BoxedStream, Dialer, RemoteShell, ShellError, TunnelConnector, TunnelError, TunnelSession,
};
use hoist::types::{AppName, DeploymentImage, ImageTag};
use parking_lot::Mutex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

pub fn app() -> AppName {
    AppName::new("web").unwrap()
}

pub fn builder_info(private_ip: &str) -> RemoteBuilderInfo {
    serde_json::from_value(json!({
        "machine": { "id": "m-123", "private_ip": private_ip },
        "app": { "name": "builder-acme", "organization": { "slug": "acme" } }
    }))
    .unwrap()
}

pub struct FakeLocator {
    info: Option<RemoteBuilderInfo>,
}

impl FakeLocator {
    pub fn returning(info: RemoteBuilderInfo) -> Self {
        Self { info: Some(info) }
    }

    pub fn failing() -> Self {
        Self { info: None }
    }
}

#[async_trait]
impl BuilderLocator for FakeLocator {
    async fn remote_builder(&self, app: &AppName) -> Result<RemoteBuilderInfo, ApiError> {
        self.info.clone().ok_or_else(|| ApiError::Status {
            status: 404,
            message: format!("no builder for {app}"),
        })
    }
}

/// Dialer that sends every connection to one local TCP address.
pub struct LocalDialer {
    organization: String,
    target: Option<String>,
    pub dialed: Mutex<Vec<String>>,
}

impl LocalDialer {
    pub fn to(organization: &str, target: Option<String>) -> Self {
        Self {
            organization: organization.to_string(),
            target,
            dialed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Dialer for LocalDialer {
    fn organization(&self) -> &str {
        &self.organization
    }

    async fn dial(&self, addr: &str) -> Result<BoxedStream, TunnelError> {
        self.dialed.lock().push(addr.to_string());
        match &self.target {
            Some(target) => {
                let stream = TcpStream::connect(target.as_str()).await?;
                Ok(Box::new(stream))
            }
            None => Err(TunnelError::DialFailed {
                addr: addr.to_string(),
                reason: "no route".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeConnector {
    fail: bool,
    pub organizations: Mutex<Vec<String>>,
    pub tokens: Mutex<Vec<CancellationToken>>,
}

impl FakeConnector {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn all_closed(&self) -> bool {
        self.tokens.lock().iter().all(CancellationToken::is_cancelled)
    }
}

#[async_trait]
impl TunnelConnector for FakeConnector {
    async fn connect(
        &self,
        organization: &str,
        cancel: CancellationToken,
    ) -> Result<TunnelSession, TunnelError> {
        self.organizations.lock().push(organization.to_string());
        if self.fail {
            return Err(TunnelError::Connection("gateway refused".to_string()));
        }
        self.tokens.lock().push(cancel.clone());
        let dialer = Arc::new(LocalDialer::to(organization, None));
        Ok(TunnelSession::new(dialer, cancel))
    }
}

#[derive(Default)]
pub struct FakeSync {
    fail: bool,
    pub calls: Mutex<Vec<(PathBuf, u16)>>,
}

impl FakeSync {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl SourceSync for FakeSync {
    async fn sync(&self, working_dir: &Path, local_port: u16) -> Result<(), SyncError> {
        self.calls.lock().push((working_dir.to_path_buf(), local_port));
        if self.fail {
            return Err(SyncError::Spawn {
                program: "rsync".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "rsync not installed"),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeShell {
    exit_code: Option<u32>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeShell {
    pub fn exiting_with(code: u32) -> Self {
        Self {
            exit_code: Some(code),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl RemoteShell for FakeShell {
    async fn run(
        &self,
        _dialer: &dyn Dialer,
        address: &str,
        command: &str,
    ) -> Result<Bytes, ShellError> {
        self.calls
            .lock()
            .push((address.to_string(), command.to_string()));
        match self.exit_code {
            Some(exit_code) => Err(ShellError::NonZeroExit {
                exit_code,
                stderr: "build.sh: nix build failed".to_string(),
            }),
            None => Ok(Bytes::from_static(b"pushed image\n")),
        }
    }
}

/// Remote build that hands back a fixed image, optionally after recording a warning.
#[derive(Default)]
pub struct StubRemoteBuild {
    pub warn: bool,
    pub calls: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl RemoteBuild for StubRemoteBuild {
    async fn build(
        &self,
        working_dir: &Path,
        app: &AppName,
        _cancel: &CancellationToken,
        diagnostics: &mut Diagnostics,
    ) -> Result<DeploymentImage, RemoteBuildError> {
        self.calls.lock().push(working_dir.to_path_buf());
        if self.warn {
            diagnostics.warn(Warning::sync_failed("code rsync failed: exit 23"));
        }
        Ok(image(&format!("registry.hoist.dev/{app}:deployment-1")))
    }
}

/// Resolver that records its inputs and returns a fixed outcome.
#[derive(Default)]
pub struct RecordingResolver {
    pub produce_nothing: bool,
    pub references: Mutex<Vec<RefOptions>>,
    pub builds: Mutex<Vec<ImageOptions>>,
}

#[async_trait]
impl ImageResolver for RecordingResolver {
    async fn resolve_reference(
        &self,
        opts: &RefOptions,
    ) -> Result<Option<DeploymentImage>, ResolveError> {
        self.references.lock().push(opts.clone());
        Ok((!self.produce_nothing).then(|| image(&opts.image_ref)))
    }

    async fn build_image(
        &self,
        opts: &ImageOptions,
    ) -> Result<Option<DeploymentImage>, ResolveError> {
        self.builds.lock().push(opts.clone());
        Ok((!self.produce_nothing).then(|| image(&format!("registry.hoist.dev/{}:built", opts.app))))
    }
}

pub fn image(tag: &str) -> DeploymentImage {
    DeploymentImage {
        tag: ImageTag::new(tag),
        id: format!("sha256:{}", tag.len()),
        size: 42_000_000,
    }
}
