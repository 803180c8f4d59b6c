//! UDP broadcast discovery of a viewer on the local network.
//!
//! One-shot exchange, no prior knowledge of the viewer's address:
//!
//! ```text
//! sender ──"CAMSTREAM_DISCOVER"──► 255.255.255.255:8555
//! viewer ──"CAMSTREAM_SERVER:<tcp_port>"──► sender
//! ```
//!
//! The responder's source address becomes the endpoint IP; the text after
//! the prefix is the TCP port to stream to. Up to three attempts, each
//! waiting 3 s for a reply; best effort by design — the viewer is found on
//! an ad hoc network, not provisioned.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use camstream_core::{DiscoveryConfig, DiscoveryError, Endpoint, DEFAULT_STREAM_PORT};
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Request text broadcast to the discovery port.
pub const DISCOVERY_REQUEST: &str = "CAMSTREAM_DISCOVER";

/// Prefix every acceptable reply must carry.
pub const RESPONSE_PREFIX: &str = "CAMSTREAM_SERVER:";

// ── DiscoveryOutcome ──────────────────────────────────────────────────────────

/// Terminal result of a completed discovery exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// First accepted reply wins; discovery stops immediately.
    Found(Endpoint),
    /// All attempts timed out without an accepted reply.
    NotFound,
}

// ── DiscoveryClient ───────────────────────────────────────────────────────────

/// One-shot broadcast-request / wait-for-reply client.
///
/// At most one exchange per instance is in flight: a concurrent
/// [`discover`](Self::discover) call is rejected with
/// [`DiscoveryError::Busy`], not queued.
pub struct DiscoveryClient {
    config: DiscoveryConfig,
    in_flight: AtomicBool,
}

impl DiscoveryClient {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config, in_flight: AtomicBool::new(false) }
    }

    /// Run the exchange to completion.
    ///
    /// Exactly one of three things comes back: `Ok(Found)`, `Ok(NotFound)`,
    /// or `Err` for socket-level failures (which are not retried).
    /// Malformed replies are ignored for as long as the attempt's timeout
    /// has time left.
    pub async fn discover(&self) -> Result<DiscoveryOutcome, DiscoveryError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Discovery already in flight — call rejected");
            return Err(DiscoveryError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);
        self.run().await
    }

    async fn run(&self) -> Result<DiscoveryOutcome, DiscoveryError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;

        let target = (self.config.broadcast_addr.as_str(), self.config.port);
        let per_attempt = Duration::from_millis(self.config.recv_timeout_ms);
        let mut buf = [0u8; 256];

        for attempt in 1..=self.config.attempts {
            debug!(
                "Discovery attempt {}/{} → {}:{}",
                attempt, self.config.attempts, self.config.broadcast_addr, self.config.port
            );
            socket.send_to(DISCOVERY_REQUEST.as_bytes(), target).await?;

            let deadline = Instant::now() + per_attempt;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
                    Err(_) => break, // attempt timed out, send again
                    Ok(Err(e)) => return Err(e.into()),
                    Ok(Ok((len, src))) => {
                        if let Some(endpoint) = parse_response(&buf[..len], src) {
                            info!("Discovery: viewer found at {}", endpoint);
                            return Ok(DiscoveryOutcome::Found(endpoint));
                        }
                        debug!("Discovery: ignoring unrecognized reply from {}", src);
                    }
                }
            }
        }

        info!("Discovery: no viewer responded after {} attempts", self.config.attempts);
        Ok(DiscoveryOutcome::NotFound)
    }
}

impl Default for DiscoveryClient {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}

/// Clears the in-flight flag even if the exchange is cancelled mid-await.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Accept a reply iff it carries the response prefix. An unparsable port
/// falls back to the default stream port; the source address supplies the IP.
fn parse_response(payload: &[u8], src: SocketAddr) -> Option<Endpoint> {
    let text = std::str::from_utf8(payload).ok()?;
    let rest = text.strip_prefix(RESPONSE_PREFIX)?;
    let port = rest.trim().parse().unwrap_or(DEFAULT_STREAM_PORT);
    Some(Endpoint::new(src.ip().to_string(), port))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    use super::*;

    fn loopback_config(port: u16) -> DiscoveryConfig {
        DiscoveryConfig {
            port,
            broadcast_addr: "127.0.0.1".to_owned(),
            recv_timeout_ms: 200,
            attempts: 3,
        }
    }

    /// Bind a UDP socket standing in for the viewer's discovery responder.
    async fn bind_responder() -> (Arc<UdpSocket>, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind responder");
        let port = socket.local_addr().expect("local addr").port();
        (Arc::new(socket), port)
    }

    #[tokio::test]
    async fn found_on_first_reply() {
        let (responder, port) = bind_responder().await;
        tokio::spawn({
            let responder = Arc::clone(&responder);
            async move {
                let mut buf = [0u8; 256];
                let (len, src) = responder.recv_from(&mut buf).await.expect("request");
                assert_eq!(&buf[..len], DISCOVERY_REQUEST.as_bytes());
                responder.send_to(b"CAMSTREAM_SERVER:9000", src).await.expect("reply");
            }
        });

        let client = DiscoveryClient::new(loopback_config(port));
        let outcome = client.discover().await.expect("no I/O error");
        assert_eq!(outcome, DiscoveryOutcome::Found(Endpoint::new("127.0.0.1", 9000)));
    }

    #[tokio::test]
    async fn exhausts_attempts_then_not_found() {
        let (responder, port) = bind_responder().await;
        let requests = Arc::new(AtomicU32::new(0));
        tokio::spawn({
            let responder = Arc::clone(&responder);
            let requests = Arc::clone(&requests);
            async move {
                let mut buf = [0u8; 256];
                // Count requests, never reply.
                while responder.recv_from(&mut buf).await.is_ok() {
                    requests.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let client = DiscoveryClient::new(loopback_config(port));
        let started = Instant::now();
        let outcome = client.discover().await.expect("no I/O error");

        assert_eq!(outcome, DiscoveryOutcome::NotFound);
        // Each of the 3 attempts waits out its full per-attempt timeout.
        assert!(started.elapsed() >= Duration::from_millis(3 * 200));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn malformed_replies_ignored_within_attempt() {
        let (responder, port) = bind_responder().await;
        tokio::spawn({
            let responder = Arc::clone(&responder);
            async move {
                let mut buf = [0u8; 256];
                let (_, src) = responder.recv_from(&mut buf).await.expect("request");
                responder.send_to(b"NOT_A_CAMSTREAM_REPLY", src).await.expect("reply");
                responder.send_to(b"CAMSTREAM_SERVER:9000", src).await.expect("reply");
            }
        });

        let client = DiscoveryClient::new(loopback_config(port));
        let outcome = client.discover().await.expect("no I/O error");
        assert_eq!(outcome, DiscoveryOutcome::Found(Endpoint::new("127.0.0.1", 9000)));
    }

    #[tokio::test]
    async fn unparsable_port_falls_back_to_default() {
        let (responder, port) = bind_responder().await;
        tokio::spawn({
            let responder = Arc::clone(&responder);
            async move {
                let mut buf = [0u8; 256];
                let (_, src) = responder.recv_from(&mut buf).await.expect("request");
                responder.send_to(b"CAMSTREAM_SERVER:banana", src).await.expect("reply");
            }
        });

        let client = DiscoveryClient::new(loopback_config(port));
        let outcome = client.discover().await.expect("no I/O error");
        assert_eq!(
            outcome,
            DiscoveryOutcome::Found(Endpoint::new("127.0.0.1", DEFAULT_STREAM_PORT))
        );
    }

    #[tokio::test]
    async fn concurrent_discover_is_rejected() {
        let (_responder, port) = bind_responder().await;
        let client = Arc::new(DiscoveryClient::new(loopback_config(port)));

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.discover().await })
        };
        // Let the first exchange get in flight, then collide with it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(client.discover().await, Err(DiscoveryError::Busy)));

        let outcome = first.await.expect("task").expect("no I/O error");
        assert_eq!(outcome, DiscoveryOutcome::NotFound);
    }
}
