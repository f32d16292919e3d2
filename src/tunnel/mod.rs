// ABOUTME: Organization tunnels: gateway sessions, port forwarding, and remote shells.
// ABOUTME: Everything that reaches the builder's private network goes through a Dialer.

mod dialer;
mod error;
mod gateway;
mod proxy;
mod shell;
mod ssh;

pub use dialer::{
    BoxedStream, Dialer, TunnelConnector, TunnelSession, TunnelStream, join_host_port,
    split_host_port,
};
pub use error::{ProxyError, Result, ShellError, TunnelError};
pub use gateway::{GatewayConnector, GatewaySession};
pub use proxy::{ProxyBinding, ProxyHandle, ProxyRunner, RSYNC_LOCAL_PORT, RSYNC_REMOTE_PORT};
pub use shell::{RemoteShell, SshShell};
pub use ssh::HostKeyPolicy;
