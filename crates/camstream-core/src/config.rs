use serde::{Deserialize, Serialize};

// MARK: - TransportConfig

/// Tuning knobs for the frame queue and stream sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum payloads awaiting transmission. When full, the oldest
    /// pending payload is evicted to admit a new one.
    pub queue_capacity: usize,
    /// Delay between a transport failure and the next connect attempt.
    pub reconnect_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 30,
            reconnect_delay_ms: 2_000,
        }
    }
}

// MARK: - DiscoveryConfig

/// Parameters of the broadcast discovery exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// UDP port the viewer's discovery responder listens on.
    pub port: u16,
    /// Address the request is broadcast to. Tests point this at loopback.
    pub broadcast_addr: String,
    /// Per-attempt reply timeout.
    pub recv_timeout_ms: u64,
    /// Number of request/wait rounds before giving up.
    pub attempts: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_DISCOVERY_PORT,
            broadcast_addr: "255.255.255.255".to_owned(),
            recv_timeout_ms: 3_000,
            attempts: 3,
        }
    }
}
