pub mod config;
pub mod control;
pub mod errors;
pub mod types;

pub use config::{DiscoveryConfig, TransportConfig};
pub use control::{is_control_frame, ControlMessage};
pub use errors::{ControlFrameError, DiscoveryError};
pub use types::*;

/// Default TCP port the viewer listens on for the video stream.
pub const DEFAULT_STREAM_PORT: u16 = 8554;

/// UDP port used for the broadcast discovery exchange.
pub const DEFAULT_DISCOVERY_PORT: u16 = 8555;
