//! `VideoTransport` — the handle the capture pipeline and the UI hold.
//!
//! Composes a [`FrameQueue`] and a [`StreamSender`] over one status channel.
//! No protocol logic of its own: payloads go in, status notifications come
//! out, start/stop forwards to the sender.

use std::sync::Arc;

use bytes::Bytes;
use camstream_core::{ControlMessage, Endpoint, TransportConfig, TransportStatus};
use tokio::sync::mpsc;

use crate::frame_queue::FrameQueue;
use crate::stream_sender::{SenderState, StreamSender, STATUS_CHANNEL_CAPACITY};

pub struct VideoTransport {
    queue: Arc<FrameQueue>,
    sender: StreamSender,
    status_rx: Option<mpsc::Receiver<TransportStatus>>,
}

impl VideoTransport {
    /// Build the transport for one endpoint. Nothing connects until
    /// [`start`](Self::start).
    pub fn new(endpoint: Endpoint, config: TransportConfig) -> Self {
        let (status_tx, status_rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        let queue = Arc::new(FrameQueue::new(config.queue_capacity));
        let sender = StreamSender::with_queue(endpoint, config, Arc::clone(&queue), status_tx);
        Self { queue, sender, status_rx: Some(status_rx) }
    }

    pub fn start(&self) {
        self.sender.start();
    }

    pub fn stop(&self) {
        self.sender.stop();
    }

    /// Hand an encoded video frame to the queue (non-blocking).
    pub fn enqueue_video(&self, frame: Bytes) {
        self.sender.enqueue_video(frame);
    }

    /// Hand a control message to the queue — same lane, same drop policy.
    pub fn enqueue_control(&self, message: ControlMessage) {
        self.sender.enqueue_control(message);
    }

    /// Take the status receiver. Can only be taken once; the UI polls it
    /// with `try_recv`.
    pub fn take_status(&mut self) -> Option<mpsc::Receiver<TransportStatus>> {
        self.status_rx.take()
    }

    pub fn state(&self) -> SenderState {
        self.sender.state()
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.sender.endpoint()
    }

    /// Payloads currently awaiting transmission.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Payloads displaced by the drop-oldest policy so far.
    pub fn evicted(&self) -> u64 {
        self.queue.evicted()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::time::timeout;

    use super::*;
    use crate::framing;

    #[tokio::test]
    async fn streams_end_to_end_with_status_updates() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let endpoint = Endpoint::new("127.0.0.1", port);

        let mut transport = VideoTransport::new(endpoint.clone(), TransportConfig::default());
        let mut status_rx = transport.take_status().expect("status receiver");
        assert!(transport.take_status().is_none());

        transport.start();
        transport.enqueue_video(Bytes::from_static(b"frame-0"));
        transport.enqueue_control(ControlMessage::orientation(270));

        let (mut conn, _) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("accept in time")
            .expect("accept");
        assert_eq!(framing::read_frame(&mut conn).await.expect("frame"), &b"frame-0"[..]);
        assert_eq!(framing::read_frame(&mut conn).await.expect("frame"), &b"CTRL\x01\x01\x0E"[..]);

        assert_eq!(
            status_rx.recv().await,
            Some(TransportStatus::Connecting { endpoint: endpoint.clone() })
        );
        assert_eq!(
            status_rx.recv().await,
            Some(TransportStatus::Connected { endpoint })
        );

        transport.stop();
        let last = timeout(Duration::from_secs(5), async {
            loop {
                match status_rx.recv().await {
                    Some(TransportStatus::Disconnected) => break true,
                    Some(_) => continue,
                    None => break false,
                }
            }
        })
        .await
        .expect("disconnected in time");
        assert!(last);
        assert_eq!(transport.state(), SenderState::Stopped);
        assert_eq!(transport.pending(), 0);
    }
}
