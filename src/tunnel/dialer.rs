// ABOUTME: Organization-scoped tunnel session and the dialer it exposes.
// ABOUTME: A dialer opens byte streams to private addresses reachable only through the tunnel.

use super::error::{Result, TunnelError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

/// A bidirectional byte stream carried by the tunnel.
pub trait TunnelStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> TunnelStream for T {}

pub type BoxedStream = Box<dyn TunnelStream>;

/// Opens connections to `host:port` addresses on the organization's private network.
#[async_trait]
pub trait Dialer: Send + Sync {
    fn organization(&self) -> &str;

    async fn dial(&self, addr: &str) -> Result<BoxedStream>;
}

/// Establishes tunnel sessions for an organization.
#[async_trait]
pub trait TunnelConnector: Send + Sync {
    /// Open a tunnel for `organization`. The session ends when `cancel` fires.
    async fn connect(&self, organization: &str, cancel: CancellationToken) -> Result<TunnelSession>;
}

/// A live tunnel for one organization.
///
/// Closing (or dropping) the session cancels its token, which tells the
/// underlying transport to shut down.
pub struct TunnelSession {
    dialer: Arc<dyn Dialer>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for TunnelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelSession")
            .field("organization", &self.dialer.organization())
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}

impl TunnelSession {
    pub fn new(dialer: Arc<dyn Dialer>, cancel: CancellationToken) -> Self {
        Self { dialer, cancel }
    }

    pub fn dialer(&self) -> Arc<dyn Dialer> {
        Arc::clone(&self.dialer)
    }

    pub fn organization(&self) -> &str {
        self.dialer.organization()
    }

    /// Token that fires when the session ends; child tasks should derive from it.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn close(self) {
        tracing::debug!(organization = %self.organization(), "closing tunnel session");
        self.cancel.cancel();
    }
}

impl Drop for TunnelSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Split `host:port` or `[v6]:port` into its parts.
pub fn split_host_port(addr: &str) -> Result<(&str, u16)> {
    let invalid = || TunnelError::InvalidAddress(addr.to_string());

    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let host = match host.strip_prefix('[') {
        Some(rest) => rest.strip_suffix(']').ok_or_else(invalid)?,
        None if host.contains(':') => return Err(invalid()),
        None => host,
    };

    if host.is_empty() {
        return Err(invalid());
    }

    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((host, port))
}

/// Join a host and port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDialer;

    #[async_trait]
    impl Dialer for NullDialer {
        fn organization(&self) -> &str {
            "acme"
        }

        async fn dial(&self, _addr: &str) -> Result<BoxedStream> {
            Err(TunnelError::Closed)
        }
    }

    #[test]
    fn splits_ipv4_and_hostnames() {
        assert_eq!(split_host_port("10.0.0.3:873").unwrap(), ("10.0.0.3", 873));
        assert_eq!(split_host_port("builder:22").unwrap(), ("builder", 22));
    }

    #[test]
    fn splits_bracketed_ipv6() {
        assert_eq!(split_host_port("[fdaa::3]:22").unwrap(), ("fdaa::3", 22));
    }

    #[test]
    fn rejects_ambiguous_or_malformed_addresses() {
        for addr in ["fdaa::3:22", "no-port", ":22", "[fdaa::3:22", "host:99999"] {
            assert!(
                matches!(split_host_port(addr), Err(TunnelError::InvalidAddress(_))),
                "{addr} should be rejected"
            );
        }
    }

    #[test]
    fn join_brackets_ipv6_only() {
        assert_eq!(join_host_port("fdaa::3", 873), "[fdaa::3]:873");
        assert_eq!(join_host_port("[fdaa::3]", 873), "[fdaa::3]:873");
        assert_eq!(join_host_port("10.0.0.3", 873), "10.0.0.3:873");
    }

    #[test]
    fn dropping_a_session_cancels_its_token() {
        let token = CancellationToken::new();
        let session = TunnelSession::new(Arc::new(NullDialer), token.child_token());
        let observed = session.cancel_token().clone();

        drop(session);

        assert!(observed.is_cancelled());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn close_cancels_the_session_token() {
        let session = TunnelSession::new(Arc::new(NullDialer), CancellationToken::new());
        let observed = session.cancel_token().clone();
        session.close();
        assert!(observed.is_cancelled());
    }
}
