use serde::{Deserialize, Serialize};

// MARK: - Endpoint

/// Destination of the video stream: a viewer's IP address and TCP port.
///
/// Produced by discovery or entered by the operator. Immutable once a
/// stream sender has been started against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// MARK: - TransportStatus

/// Connection-state notification emitted by the stream sender.
///
/// Purely observational: the UI renders these, nothing reacts to them.
/// Delivered over a bounded channel; stale updates may be dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportStatus {
    Connecting { endpoint: Endpoint },
    Connected { endpoint: Endpoint },
    /// Transport failure; the sender keeps retrying until stopped.
    Error { message: String },
    Reconnecting { delay_ms: u64 },
    /// Terminal: the sender loop has exited.
    Disconnected,
}

impl std::fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting { endpoint } => write!(f, "Connecting to {endpoint}…"),
            Self::Connected { endpoint } => write!(f, "Connected to {endpoint}"),
            Self::Error { message } => write!(f, "Stream error: {message}"),
            Self::Reconnecting { delay_ms } => write!(f, "Reconnecting in {delay_ms} ms"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_display_matches_socket_addr() {
        let ep = Endpoint::new("203.0.113.5", 9000);
        assert_eq!(ep.to_string(), "203.0.113.5:9000");
        assert_eq!(ep.socket_addr(), ep.to_string());
    }

    #[test]
    fn status_renders_human_readable() {
        let ep = Endpoint::new("192.168.1.7", 8554);
        assert_eq!(
            TransportStatus::Connected { endpoint: ep }.to_string(),
            "Connected to 192.168.1.7:8554"
        );
        assert_eq!(
            TransportStatus::Reconnecting { delay_ms: 2000 }.to_string(),
            "Reconnecting in 2000 ms"
        );
    }
}
