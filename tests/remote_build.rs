// ABOUTME: Integration tests for building on the remote builder through the tunnel.
// ABOUTME: Runs the real proxy and readiness probe against fake API, tunnel, rsync, and shell.

mod support;

use hoist::build::{NotReadyCause, RemoteBuild, RemoteBuildError, RemoteBuilder, SyncFailurePolicy};
use hoist::diagnostics::{Diagnostics, WarningKind};
use hoist::probe::ReadinessProbe;
use hoist::tunnel::ProxyError;
use hoist::types::{REMOTE_BUILD_SIZE_PLACEHOLDER, TagFactory};
use secrecy::SecretString;
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::fakes::{FakeConnector, FakeLocator, FakeShell, FakeSync, app, builder_info};
use tokio_util::sync::CancellationToken;

fn epoch() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(0, 0).unwrap()
}

struct Harness {
    locator: Arc<FakeLocator>,
    connector: Arc<FakeConnector>,
    sync: Arc<FakeSync>,
    shell: Arc<FakeShell>,
}

impl Harness {
    fn new() -> Self {
        Self {
            locator: Arc::new(FakeLocator::returning(builder_info("fdaa:0:1::3"))),
            connector: Arc::new(FakeConnector::default()),
            sync: Arc::new(FakeSync::default()),
            shell: Arc::new(FakeShell::default()),
        }
    }

    fn builder(&self, local_port: u16) -> RemoteBuilder {
        let tags = TagFactory::new("registry.hoist.dev", epoch());
        RemoteBuilder::new(
            self.locator.clone(),
            self.connector.clone(),
            self.sync.clone(),
            self.shell.clone(),
            tags,
            SecretString::from("secret-token"),
        )
        .local_port(local_port)
        .probe(ReadinessProbe {
            attempts: 3,
            interval: Duration::from_millis(20),
            dial_timeout: Duration::from_millis(200),
        })
    }
}

/// Test: A successful remote build runs the builder script with token and tag.
/// Expected: Sync gets the forwarded port, shell targets the bracketed private IP.
#[tokio::test]
async fn remote_build_runs_build_script_on_builder() {
    support::init_tracing();
    let harness = Harness::new();
    let port = support::free_port();
    let mut diag = Diagnostics::default();

    let image = harness
        .builder(port)
        .build(Path::new("/src/web"), &app(), &CancellationToken::new(), &mut diag)
        .await
        .expect("remote build should succeed");

    assert_eq!(image.tag.as_str(), "registry.hoist.dev/web:deployment-0");
    assert_eq!(image.id, image.tag.as_str());
    assert_eq!(image.size, REMOTE_BUILD_SIZE_PLACEHOLDER);
    assert!(!diag.has_warnings());

    assert_eq!(harness.connector.organizations.lock().as_slice(), ["acme"]);
    assert_eq!(
        harness.sync.calls.lock().as_slice(),
        [(Path::new("/src/web").to_path_buf(), port)]
    );

    let calls = harness.shell.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "[fdaa:0:1::3]");
    assert_eq!(
        calls[0].1,
        "/data/source/web/bin/build.sh secret-token registry.hoist.dev/web:deployment-0"
    );
}

/// Test: The tunnel and forwarded port are released once the build returns.
/// Expected: Session token cancelled and the local port can be bound again.
#[tokio::test]
async fn remote_build_releases_port_and_session() {
    let harness = Harness::new();
    let port = support::free_port();

    harness
        .builder(port)
        .build(
            Path::new("."),
            &app(),
            &CancellationToken::new(),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap();

    assert!(harness.connector.all_closed());
    TcpListener::bind(("127.0.0.1", port)).expect("forwarded port should be free again");
}

/// Test: Resources are released on the failure path too.
/// Expected: Build script failure is reported and the port is free.
#[tokio::test]
async fn failed_build_script_still_releases_port() {
    let harness = Harness {
        shell: Arc::new(FakeShell::exiting_with(2)),
        ..Harness::new()
    };
    let port = support::free_port();

    let err = harness
        .builder(port)
        .build(
            Path::new("."),
            &app(),
            &CancellationToken::new(),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteBuildError::RemoteBuildFailed(_)));
    assert!(harness.connector.all_closed());
    TcpListener::bind(("127.0.0.1", port)).expect("forwarded port should be free again");
}

/// Test: With the default policy a failed sync is only a warning.
/// Expected: Build still runs and diagnostics carry a sync warning.
#[tokio::test]
async fn sync_failure_warns_and_continues_by_default() {
    let harness = Harness {
        sync: Arc::new(FakeSync::failing()),
        ..Harness::new()
    };
    let mut diag = Diagnostics::default();

    harness
        .builder(support::free_port())
        .build(Path::new("."), &app(), &CancellationToken::new(), &mut diag)
        .await
        .expect("build should go ahead after a failed sync");

    assert_eq!(harness.shell.call_count(), 1);
    assert!(diag.has(WarningKind::SyncFailed));
    assert!(diag.warnings()[0].message.starts_with("code rsync failed"));
}

/// Test: Strict sync aborts before the build script runs.
/// Expected: SyncFailed error, shell never called.
#[tokio::test]
async fn sync_failure_aborts_under_strict_policy() {
    let harness = Harness {
        sync: Arc::new(FakeSync::failing()),
        ..Harness::new()
    };

    let err = harness
        .builder(support::free_port())
        .sync_policy(SyncFailurePolicy::Abort)
        .build(
            Path::new("."),
            &app(),
            &CancellationToken::new(),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteBuildError::SyncFailed(_)));
    assert_eq!(harness.shell.call_count(), 0);
    assert!(harness.connector.all_closed());
}

/// Test: A port the probe can never reach fails the build before sync.
/// Expected: TunnelNotReady naming the attempt count; nothing synced or run.
#[tokio::test]
async fn unreachable_proxy_is_reported_as_not_ready() {
    let harness = Harness::new();

    // Port 0 makes the proxy listen on an ephemeral port the probe cannot know.
    let err = harness
        .builder(0)
        .build(
            Path::new("."),
            &app(),
            &CancellationToken::new(),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap_err();

    match &err {
        RemoteBuildError::TunnelNotReady { attempts, source } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(source, NotReadyCause::Probe(_)));
        }
        other => panic!("expected TunnelNotReady, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "rsync proxy failed to connect after 3 attempts"
    );
    assert_eq!(harness.sync.call_count(), 0);
    assert_eq!(harness.shell.call_count(), 0);
    assert!(harness.connector.all_closed());
}

/// Test: The forwarded port is already held by another listener.
/// Expected: The readiness dial would succeed against that listener, but the
/// build still fails with the proxy's bind error; nothing synced or run.
#[tokio::test]
async fn occupied_local_port_fails_with_proxy_bind_error() {
    let harness = Harness::new();
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let local_port = occupied.local_addr().unwrap().port();

    let err = harness
        .builder(local_port)
        .build(
            Path::new("."),
            &app(),
            &CancellationToken::new(),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap_err();

    match &err {
        RemoteBuildError::TunnelNotReady { source, .. } => assert!(matches!(
            source,
            NotReadyCause::Proxy(ProxyError::Bind { port, .. }) if *port == local_port
        )),
        other => panic!("expected TunnelNotReady, got {other:?}"),
    }
    assert_eq!(harness.sync.call_count(), 0);
    assert_eq!(harness.shell.call_count(), 0);
    assert!(harness.connector.all_closed());
    drop(occupied);
}

/// Test: Builder lookup failure stops before any tunnel is opened.
#[tokio::test]
async fn builder_lookup_failure_opens_no_tunnel() {
    let harness = Harness {
        locator: Arc::new(FakeLocator::failing()),
        ..Harness::new()
    };

    let err = harness
        .builder(support::free_port())
        .build(
            Path::new("."),
            &app(),
            &CancellationToken::new(),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteBuildError::BuilderLookupFailed { .. }));
    assert!(harness.connector.organizations.lock().is_empty());
}

/// Test: Tunnel failure is reported with the organization.
#[tokio::test]
async fn tunnel_failure_names_the_organization() {
    let harness = Harness {
        connector: Arc::new(FakeConnector::failing()),
        ..Harness::new()
    };

    let err = harness
        .builder(support::free_port())
        .build(
            Path::new("."),
            &app(),
            &CancellationToken::new(),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap_err();

    match err {
        RemoteBuildError::TunnelEstablishFailed { organization, .. } => {
            assert_eq!(organization, "acme")
        }
        other => panic!("expected TunnelEstablishFailed, got {other:?}"),
    }
    assert_eq!(harness.sync.call_count(), 0);
}
