//! Control frames — typed, non-video instructions sent on the video stream.
//!
//! Control payloads travel through the same queue and socket as video frames
//! and are told apart on the wire purely by their first four bytes:
//!
//! ```text
//! byte[4]  magic  = "CTRL" (0x43 0x54 0x52 0x4C)
//! byte     type            0x01 = orientation update
//! byte[]   body            type 0x01: u16 angle-degrees, big-endian, 0–359
//! ```
//!
//! A receiver checks every length-framed payload for the magic before handing
//! it to the decoder.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::ControlFrameError;

/// Marker distinguishing control frames from encoded video payloads.
pub const CONTROL_MAGIC: [u8; 4] = *b"CTRL";

/// Control message type tag: display orientation update.
pub const CONTROL_TYPE_ORIENTATION: u8 = 0x01;

// MARK: - ControlMessage

/// A decoded control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Display orientation in degrees, always in `[0, 360)`.
    Orientation { degrees: u16 },
}

impl ControlMessage {
    /// Orientation update, reducing the angle modulo 360.
    pub fn orientation(degrees: u16) -> Self {
        Self::Orientation { degrees: degrees % 360 }
    }

    /// Serialize to the wire layout (magic + type + body).
    pub fn encode(&self) -> Bytes {
        match *self {
            Self::Orientation { degrees } => {
                let mut buf = BytesMut::with_capacity(CONTROL_MAGIC.len() + 3);
                buf.put_slice(&CONTROL_MAGIC);
                buf.put_u8(CONTROL_TYPE_ORIENTATION);
                buf.put_u16(degrees);
                buf.freeze()
            }
        }
    }

    /// Parse a payload known to be a control frame.
    ///
    /// Returns an error for payloads without the magic, unknown type tags,
    /// or truncated bodies. Video payloads fail with
    /// [`ControlFrameError::BadMagic`].
    pub fn decode(payload: &[u8]) -> Result<Self, ControlFrameError> {
        if !is_control_frame(payload) {
            return Err(ControlFrameError::BadMagic);
        }
        let data = &payload[CONTROL_MAGIC.len()..];
        let (&msg_type, body) = data
            .split_first()
            .ok_or(ControlFrameError::Truncated)?;
        match msg_type {
            CONTROL_TYPE_ORIENTATION => {
                if body.len() < 2 {
                    return Err(ControlFrameError::Truncated);
                }
                let degrees = u16::from_be_bytes([body[0], body[1]]);
                Ok(Self::Orientation { degrees })
            }
            other => Err(ControlFrameError::UnknownType(other)),
        }
    }
}

/// Whether a payload starts with the control magic.
pub fn is_control_frame(payload: &[u8]) -> bool {
    payload.len() >= CONTROL_MAGIC.len() && payload[..CONTROL_MAGIC.len()] == CONTROL_MAGIC
}
