// ABOUTME: Local TCP port forwarding through the tunnel, run as a supervised background task.
// ABOUTME: The handle owns the task so callers can observe failures and release the port.

use super::dialer::{Dialer, join_host_port};
use super::error::{ProxyError, TunnelError};
use crate::types::AppName;
use futures::FutureExt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub const RSYNC_LOCAL_PORT: u16 = 8873;
pub const RSYNC_REMOTE_PORT: u16 = 873;

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Which local port is forwarded to which remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBinding {
    pub local_port: u16,
    pub remote_port: u16,
    pub target_host: String,
}

impl ProxyBinding {
    /// Forward the local rsync port to the rsync daemon on `host`.
    pub fn rsync(host: IpAddr) -> Self {
        Self {
            local_port: RSYNC_LOCAL_PORT,
            remote_port: RSYNC_REMOTE_PORT,
            target_host: host.to_string(),
        }
    }

    pub fn target(&self) -> String {
        join_host_port(&self.target_host, self.remote_port)
    }
}

pub struct ProxyRunner;

impl ProxyRunner {
    /// Start forwarding `127.0.0.1:<local_port>` to the binding's target.
    ///
    /// Binding happens inside the task; await [`ProxyHandle::listening`] to
    /// learn whether it succeeded. A bind failure shows up through
    /// [`ProxyHandle::failure`] or [`ProxyHandle::stop`].
    pub fn spawn(
        dialer: Arc<dyn Dialer>,
        app: &AppName,
        binding: ProxyBinding,
        cancel: CancellationToken,
    ) -> ProxyHandle {
        let span = tracing::debug_span!(
            "proxy",
            app = %app,
            local_port = binding.local_port,
            target = %binding.target()
        );
        let local_port = binding.local_port;
        let (bound_tx, bound_rx) = oneshot::channel();
        let join =
            tokio::spawn(run_proxy(dialer, binding, cancel.clone(), bound_tx).instrument(span));

        ProxyHandle {
            local_port,
            cancel,
            bound: Some(bound_rx),
            task: ProxyTask::Running(join),
        }
    }
}

enum ProxyTask {
    Running(JoinHandle<Result<(), ProxyError>>),
    Finished(Result<(), ProxyError>),
}

/// Owner of a running proxy task. Dropping it cancels the task.
pub struct ProxyHandle {
    local_port: u16,
    cancel: CancellationToken,
    bound: Option<oneshot::Receiver<()>>,
    task: ProxyTask,
}

impl ProxyHandle {
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Wait until the listener is bound, or the task has stopped before binding.
    ///
    /// Returns `false` in the second case; the reason is then available from
    /// [`failure`](Self::failure).
    pub async fn listening(&mut self) -> bool {
        let Some(bound) = self.bound.take() else {
            return !matches!(self.task, ProxyTask::Finished(Err(_)));
        };
        if bound.await.is_err() {
            // sender dropped without a signal: the task is over
            if let ProxyTask::Running(join) = &mut self.task {
                self.task = ProxyTask::Finished(flatten(join.await));
            }
        }
        !matches!(self.task, ProxyTask::Finished(Err(_)))
    }

    /// The task's error, if it has already stopped on its own.
    pub fn failure(&mut self) -> Option<&ProxyError> {
        let finished = match &mut self.task {
            ProxyTask::Running(join) if join.is_finished() => join.now_or_never(),
            _ => None,
        };
        if let Some(result) = finished {
            self.task = ProxyTask::Finished(flatten(result));
        }

        match &self.task {
            ProxyTask::Finished(Err(e)) => Some(e),
            _ => None,
        }
    }

    /// Cancel the task, wait for it to release the port, and return how it ended.
    pub async fn stop(mut self) -> Result<(), ProxyError> {
        self.cancel.cancel();
        let task = std::mem::replace(&mut self.task, ProxyTask::Finished(Ok(())));
        match task {
            ProxyTask::Running(join) => flatten(join.await),
            ProxyTask::Finished(result) => result,
        }
    }
}

impl Drop for ProxyHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn flatten(
    result: Result<Result<(), ProxyError>, tokio::task::JoinError>,
) -> Result<(), ProxyError> {
    result.unwrap_or_else(|e| Err(ProxyError::Aborted(e.to_string())))
}

async fn run_proxy(
    dialer: Arc<dyn Dialer>,
    binding: ProxyBinding,
    cancel: CancellationToken,
    bound: oneshot::Sender<()>,
) -> Result<(), ProxyError> {
    let listener = TcpListener::bind(("127.0.0.1", binding.local_port))
        .await
        .map_err(|source| ProxyError::Bind {
            port: binding.local_port,
            source,
        })?;
    tracing::debug!("proxy listening");
    let _ = bound.send(());

    let target = binding.target();
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("accept error on forwarded port: {}", e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(ACCEPT_BACKOFF) => continue,
                }
            }
        };

        let dialer = Arc::clone(&dialer);
        let target = target.clone();
        let connection_cancel = cancel.child_token();
        tokio::spawn(
            async move {
                tokio::select! {
                    _ = connection_cancel.cancelled() => {}
                    result = forward_connection(stream, dialer.as_ref(), &target) => {
                        if let Err(e) = result {
                            tracing::debug!("forwarded connection error: {}", e);
                        }
                    }
                }
            }
            .in_current_span(),
        );
        tracing::debug!(%peer, "accepted connection");
    }

    tracing::debug!("proxy stopped");
    Ok(())
}

async fn forward_connection(
    mut local: TcpStream,
    dialer: &dyn Dialer,
    target: &str,
) -> Result<(), TunnelError> {
    let mut remote = dialer.dial(target).await?;
    let (sent, received) = tokio::io::copy_bidirectional(&mut local, &mut remote).await?;
    tracing::debug!(sent, received, "connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn rsync_binding_forwards_8873_to_873() {
        let binding = ProxyBinding::rsync("10.0.0.3".parse().unwrap());
        assert_eq!(binding.local_port, 8873);
        assert_eq!(binding.remote_port, 873);
        assert_eq!(binding.target(), "10.0.0.3:873");
    }

    #[test]
    fn ipv6_targets_are_bracketed() {
        let binding = ProxyBinding::rsync(IpAddr::V6(Ipv6Addr::new(0xfdaa, 0, 0, 0, 0, 0, 0, 3)));
        assert_eq!(binding.target(), "[fdaa::3]:873");
    }
}
