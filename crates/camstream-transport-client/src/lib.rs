//! camstream-transport-client
//!
//! Sender-side transport for CamStream: moves already-encoded video frames
//! from a capture device to a remote viewer over a flaky local network, and
//! finds that viewer by UDP broadcast before streaming starts.
//!
//! # Architecture
//!
//! ```text
//! capture pipeline                         viewer
//! ────────────────────────────             ─────────────────────────
//! VideoTransport
//!   ├─ FrameQueue (drop-oldest, cap 30)
//!   └─ StreamSender ──── TCP:8554 ──────►  length-framed stream
//! DiscoveryClient ────── UDP:8555 ──────►  discovery responder
//! ```
//!
//! Video payloads and control frames (orientation updates, `"CTRL"`-prefixed)
//! share one ordered queue and one socket; the viewer tells them apart by the
//! magic prefix alone.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use camstream_core::{ControlMessage, TransportConfig};
//! use camstream_transport_client::{DiscoveryClient, DiscoveryOutcome, VideoTransport};
//!
//! # tokio_test::block_on(async {
//! let discovery = DiscoveryClient::default();
//! let endpoint = match discovery.discover().await.unwrap() {
//!     DiscoveryOutcome::Found(endpoint) => endpoint,
//!     DiscoveryOutcome::NotFound => panic!("no viewer on this network"),
//! };
//!
//! let mut transport = VideoTransport::new(endpoint, TransportConfig::default());
//! let mut status_rx = transport.take_status().unwrap();
//! transport.start();
//! transport.enqueue_video(Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0x67]));
//! transport.enqueue_control(ControlMessage::orientation(90));
//! // … keep feeding encoded frames, poll status_rx from the UI …
//! transport.stop();
//! # drop(status_rx);
//! # })
//! ```

pub mod discovery;
pub mod frame_queue;
pub mod framing;
pub mod stream_sender;
pub mod transport;

pub use discovery::{DiscoveryClient, DiscoveryOutcome, DISCOVERY_REQUEST, RESPONSE_PREFIX};
pub use frame_queue::{FrameQueue, QueuedPayload};
pub use framing::{read_frame, write_frame, MAX_FRAME_BYTES};
pub use stream_sender::{SenderState, StreamSender};
pub use transport::VideoTransport;
