//! Length-prefix framing for the TCP stream.
//!
//! Every payload — video or control — is written as a 4-byte big-endian
//! length followed by the payload bytes:
//!
//! ```text
//! repeated {
//!   u32     length   BE  byte length of payload
//!   byte[]  payload      encoded frame, OR control frame ("CTRL"-prefixed)
//! }
//! ```

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single framed payload. Anything larger is treated as a
/// corrupt stream rather than an allocation request.
pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Write one length-prefixed payload and flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_BYTES as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload of {} bytes exceeds frame limit", payload.len()),
        ));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed payload.
///
/// The sender never calls this; it exists for viewers and tests.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds limit"),
        ));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Bytes::from(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn roundtrip(payload: &[u8]) -> Bytes {
        let mut wire = Vec::new();
        write_frame(&mut wire, payload).await.expect("write");
        assert_eq!(wire.len(), 4 + payload.len());
        assert_eq!(&wire[..4], &(payload.len() as u32).to_be_bytes()[..]);

        let mut cursor = io::Cursor::new(wire);
        read_frame(&mut cursor).await.expect("read")
    }

    #[tokio::test]
    async fn roundtrips_empty_payload() {
        assert_eq!(roundtrip(b"").await, Bytes::new());
    }

    #[tokio::test]
    async fn roundtrips_small_payload() {
        assert_eq!(roundtrip(b"CTRL\x01\x00\x5A").await, &b"CTRL\x01\x00\x5A"[..]);
    }

    #[tokio::test]
    async fn roundtrips_megabyte_payload() {
        let payload: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(roundtrip(&payload).await, payload);
    }

    #[tokio::test]
    async fn rejects_oversize_length_prefix() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let mut cursor = io::Cursor::new(wire);

        let err = read_frame(&mut cursor).await.expect_err("must reject");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn rejects_truncated_stream() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&8u32.to_be_bytes());
        wire.extend_from_slice(b"shor"); // 4 of 8 promised bytes
        let mut cursor = io::Cursor::new(wire);

        let err = read_frame(&mut cursor).await.expect_err("must reject");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
