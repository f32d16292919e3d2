// ABOUTME: Readiness checks for locally forwarded ports.
// ABOUTME: A single bounded TCP dial plus a generic fixed-interval retry helper.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;

pub const DEFAULT_ATTEMPTS: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("localhost:{port} is not accepting connections")]
    PortUnreachable {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("gave up after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// The error from the final attempt.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { source, .. } => source,
        }
    }
}

/// Check that something accepts TCP connections on `localhost:<port>`.
///
/// The connection is closed immediately; only reachability matters.
pub async fn probe_local_port(port: u16, dial_timeout: Duration) -> Result<(), ProbeError> {
    let connect = TcpStream::connect(("localhost", port));
    match tokio::time::timeout(dial_timeout, connect).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(source)) => Err(ProbeError::PortUnreachable { port, source }),
        Err(_) => Err(ProbeError::PortUnreachable {
            port,
            source: std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no connection within {dial_timeout:?}"),
            ),
        }),
    }
}

/// Invoke `op` up to `attempts` times, sleeping `interval` before each call.
///
/// Returns on the first success. When every attempt fails, the last error is kept.
/// `attempts` of zero is treated as one.
pub async fn retry<T, E, F, Fut>(
    attempts: u32,
    interval: Duration,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        tokio::time::sleep(interval).await;

        match op().await {
            Ok(value) => return Ok(value),
            Err(source) if attempt >= attempts => {
                return Err(RetryError::Exhausted { attempts, source });
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "not ready yet");
                attempt += 1;
            }
        }
    }
}

/// Bounded wait for a forwarded port to start accepting connections.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessProbe {
    pub attempts: u32,
    pub interval: Duration,
    pub dial_timeout: Duration,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }
}

impl ReadinessProbe {
    pub async fn wait_for(&self, port: u16) -> Result<(), RetryError<ProbeError>> {
        let dial_timeout = self.dial_timeout;
        retry(self.attempts, self.interval, || {
            probe_local_port(port, dial_timeout)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::net::TcpListener;

    const FAST: Duration = Duration::from_millis(5);

    async fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn default_readiness_is_ten_one_second_attempts() {
        let readiness = ReadinessProbe::default();
        assert_eq!(readiness.attempts, 10);
        assert_eq!(readiness.interval, Duration::from_secs(1));
        assert_eq!(readiness.dial_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        probe_local_port(port, Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let port = unused_port().await;
        let err = probe_local_port(port, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::PortUnreachable { port: p, .. } if p == port));
    }

    #[tokio::test]
    async fn retry_returns_on_first_success() {
        let calls = AtomicU32::new(0);
        let value = retry(5, FAST, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(std::io::Error::other("not yet"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_keeps_the_last_error() {
        let calls = AtomicU32::new(0);
        let err = retry(4, FAST, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err::<(), _>(std::io::Error::other(format!("failure {n}"))) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let RetryError::Exhausted { attempts, source } = err;
        assert_eq!(attempts, 4);
        assert_eq!(source.to_string(), "failure 4");
    }

    #[tokio::test]
    async fn retry_sleeps_before_the_first_attempt() {
        let started = tokio::time::Instant::now();
        retry(1, Duration::from_millis(50), || async {
            Ok::<_, std::io::Error>(())
        })
        .await
        .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn readiness_probe_gives_up_on_closed_port() {
        let port = unused_port().await;
        let probe = ReadinessProbe {
            attempts: 3,
            interval: FAST,
            dial_timeout: Duration::from_millis(200),
        };
        let err = probe.wait_for(port).await.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
    }
}
