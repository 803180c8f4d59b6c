//! Self-reconnecting TCP stream sender.
//!
//! Owns one outbound connection at a time against a fixed [`Endpoint`],
//! dequeues payloads from the [`FrameQueue`] and writes them length-framed.
//! Transport failures are never fatal: the loop falls back to a fixed
//! backoff and reconnects until [`stop`](StreamSender::stop) is called.
//!
//! ```text
//! capture pipeline ──enqueue──► FrameQueue ──dequeue──► sender task ──TCP──► viewer
//!                                                          │
//!                                UI ◄──TransportStatus─────┘
//! ```
//!
//! # State machine
//!
//! `Stopped → Starting → Running → Stopping → Stopped`, tracked in one
//! atomic. `start` and `stop` are idempotent and safe from any context;
//! concurrent calls race on compare-exchange, never on a lock.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use camstream_core::{ControlMessage, Endpoint, TransportConfig, TransportStatus};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, trace, warn};

use crate::frame_queue::{FrameQueue, QueuedPayload};
use crate::framing;

/// Capacity of the status channel. Statuses are observational; when the
/// consumer lags, stale updates are dropped rather than blocking the loop.
pub const STATUS_CHANNEL_CAPACITY: usize = 64;

// ── SenderState ───────────────────────────────────────────────────────────────

/// Lifecycle state of a [`StreamSender`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SenderState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl SenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Stopped,
            1 => Self::Starting,
            2 => Self::Running,
            _ => Self::Stopping,
        }
    }
}

// ── StreamSender ──────────────────────────────────────────────────────────────

/// Owns the connect / send / reconnect cycle for one endpoint.
///
/// The socket lives exclusively inside the spawned sender task; producers
/// only ever touch the queue. A sender that has been started and stopped is
/// finished — stream to a new endpoint by constructing a new sender.
pub struct StreamSender {
    endpoint: Endpoint,
    config: TransportConfig,
    queue: Arc<FrameQueue>,
    state: Arc<AtomicU8>,
    stop_notify: Arc<Notify>,
    status_tx: mpsc::Sender<TransportStatus>,
}

impl StreamSender {
    /// Create a sender with its own queue and status channel.
    pub fn new(endpoint: Endpoint, config: TransportConfig) -> (Self, mpsc::Receiver<TransportStatus>) {
        let (status_tx, status_rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        let queue = Arc::new(FrameQueue::new(config.queue_capacity));
        (Self::with_queue(endpoint, config, queue, status_tx), status_rx)
    }

    /// Create a sender over an externally owned queue and status channel.
    pub fn with_queue(
        endpoint: Endpoint,
        config: TransportConfig,
        queue: Arc<FrameQueue>,
        status_tx: mpsc::Sender<TransportStatus>,
    ) -> Self {
        Self {
            endpoint,
            config,
            queue,
            state: Arc::new(AtomicU8::new(SenderState::Stopped as u8)),
            stop_notify: Arc::new(Notify::new()),
            status_tx,
        }
    }

    /// Launch the send loop. Idempotent: a second call while the sender is
    /// starting, running, or stopping is a no-op, as is starting a sender
    /// that has already been stopped.
    pub fn start(&self) {
        if self
            .state
            .compare_exchange(
                SenderState::Stopped as u8,
                SenderState::Starting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!("start() ignored — sender not in Stopped state");
            return;
        }
        if self.queue.is_closed() {
            // Stopped once already; this sender is done.
            self.state.store(SenderState::Stopped as u8, Ordering::SeqCst);
            debug!("start() ignored — sender already shut down");
            return;
        }

        info!("Starting stream sender → {}", self.endpoint);
        tokio::spawn(run_loop(
            self.endpoint.clone(),
            self.config.clone(),
            Arc::clone(&self.queue),
            Arc::clone(&self.state),
            Arc::clone(&self.stop_notify),
            self.status_tx.clone(),
        ));
    }

    /// Signal the loop to exit. Idempotent, safe from any context, and
    /// returns promptly: the queue is shut down (waking a blocked dequeue)
    /// and pending payloads are discarded. Nothing enqueued after this call
    /// is ever transmitted.
    pub fn stop(&self) {
        loop {
            let current = self.state.load(Ordering::SeqCst);
            match SenderState::from_u8(current) {
                SenderState::Stopped | SenderState::Stopping => return,
                SenderState::Starting | SenderState::Running => {
                    if self
                        .state
                        .compare_exchange(
                            current,
                            SenderState::Stopping as u8,
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        )
                        .is_ok()
                    {
                        info!("Stopping stream sender → {}", self.endpoint);
                        self.queue.shutdown();
                        // Stored permit: the loop picks this up at its next
                        // select even if it is not parked right now.
                        self.stop_notify.notify_one();
                        return;
                    }
                    // Raced with the loop or another stop(); re-read.
                }
            }
        }
    }

    /// Queue an encoded video frame. Silently discarded unless the sender
    /// is starting or running.
    pub fn enqueue_video(&self, frame: Bytes) {
        if !self.accepts_payloads() {
            trace!("Video payload discarded — sender not running");
            return;
        }
        self.queue.enqueue(QueuedPayload::Video(frame));
    }

    /// Queue a control message. Same admission rules as video: no priority,
    /// subject to drop-oldest — under sustained overflow a control update
    /// can be displaced before it is sent.
    pub fn enqueue_control(&self, message: ControlMessage) {
        if !self.accepts_payloads() {
            debug!("Control payload discarded — sender not running");
            return;
        }
        self.queue.enqueue(QueuedPayload::Control(message));
    }

    pub fn state(&self) -> SenderState {
        SenderState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn accepts_payloads(&self) -> bool {
        matches!(self.state(), SenderState::Starting | SenderState::Running)
    }
}

// ── Sender task ───────────────────────────────────────────────────────────────

async fn run_loop(
    endpoint: Endpoint,
    config: TransportConfig,
    queue: Arc<FrameQueue>,
    state: Arc<AtomicU8>,
    stop_notify: Arc<Notify>,
    status_tx: mpsc::Sender<TransportStatus>,
) {
    if state
        .compare_exchange(
            SenderState::Starting as u8,
            SenderState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        )
        .is_err()
    {
        // stop() won the race before the first connect attempt.
        finish(&state, &status_tx, &endpoint);
        return;
    }

    let delay = Duration::from_millis(config.reconnect_delay_ms);

    'reconnect: loop {
        if SenderState::from_u8(state.load(Ordering::SeqCst)) != SenderState::Running {
            break;
        }

        debug!("Connecting to {}", endpoint);
        send_status(&status_tx, TransportStatus::Connecting { endpoint: endpoint.clone() });

        let stream = tokio::select! {
            _ = stop_notify.notified() => break 'reconnect,
            connected = TcpStream::connect(endpoint.socket_addr()) => match connected {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Connect to {} failed: {}", endpoint, e);
                    send_status(&status_tx, TransportStatus::Error { message: e.to_string() });
                    if backoff(delay, &stop_notify, &status_tx).await {
                        continue 'reconnect;
                    }
                    break 'reconnect;
                }
            },
        };

        // Latency beats throughput on this link.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }

        info!("Connected to {}", endpoint);
        send_status(&status_tx, TransportStatus::Connected { endpoint: endpoint.clone() });

        match drain_queue(stream, &queue, &stop_notify).await {
            DrainExit::Shutdown => break 'reconnect,
            DrainExit::Io(e) => {
                warn!("Stream to {} failed: {}", endpoint, e);
                send_status(&status_tx, TransportStatus::Error { message: e.to_string() });
                if !backoff(delay, &stop_notify, &status_tx).await {
                    break 'reconnect;
                }
            }
        }
    }

    finish(&state, &status_tx, &endpoint);
}

enum DrainExit {
    /// Queue shut down or stop signalled — clean exit.
    Shutdown,
    /// The socket failed; the payload being written is lost.
    Io(std::io::Error),
}

/// Pump the queue into the socket until either side gives out.
async fn drain_queue(mut stream: TcpStream, queue: &FrameQueue, stop_notify: &Notify) -> DrainExit {
    loop {
        let Some(payload) = queue.dequeue().await else {
            return DrainExit::Shutdown;
        };
        let bytes = payload.into_wire_bytes();
        tokio::select! {
            _ = stop_notify.notified() => return DrainExit::Shutdown,
            written = framing::write_frame(&mut stream, &bytes) => {
                if let Err(e) = written {
                    return DrainExit::Io(e);
                }
            }
        }
    }
}

/// Fixed reconnect delay; returns `false` when stop was requested instead.
async fn backoff(delay: Duration, stop_notify: &Notify, status_tx: &mpsc::Sender<TransportStatus>) -> bool {
    send_status(status_tx, TransportStatus::Reconnecting { delay_ms: delay.as_millis() as u64 });
    tokio::select! {
        _ = stop_notify.notified() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

fn finish(state: &AtomicU8, status_tx: &mpsc::Sender<TransportStatus>, endpoint: &Endpoint) {
    state.store(SenderState::Stopped as u8, Ordering::SeqCst);
    send_status(status_tx, TransportStatus::Disconnected);
    info!("Stream sender stopped → {}", endpoint);
}

fn send_status(status_tx: &mpsc::Sender<TransportStatus>, status: TransportStatus) {
    // Drop-on-full: a slow status consumer must not stall the sender.
    let _ = status_tx.try_send(status);
}
