use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("A discovery exchange is already in flight")]
    Busy,

    #[error("Discovery I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrameError {
    #[error("Payload does not start with the control magic")]
    BadMagic,

    #[error("Unknown control message type: 0x{0:02x}")]
    UnknownType(u8),

    #[error("Control frame body too short")]
    Truncated,
}
