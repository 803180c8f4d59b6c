//! Bounded, drop-oldest queue between the capture pipeline and the sender loop.
//!
//! `enqueue` is total and never blocks the producer: when the queue is full,
//! the single oldest pending payload is evicted to admit the new one. For a
//! live stream, fresh frames always beat stale ones. Every eviction is
//! counted and logged.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use camstream_core::ControlMessage;
use tokio::sync::Notify;
use tracing::{debug, trace};

// ── QueuedPayload ─────────────────────────────────────────────────────────────

/// One unit of data awaiting transmission.
///
/// Video and control payloads share the queue (and the drop-oldest policy —
/// a control update can be evicted under sustained overflow, just like a
/// frame). On the wire both flatten to a single length-framed byte string.
#[derive(Debug, Clone, PartialEq)]
pub enum QueuedPayload {
    Video(Bytes),
    Control(ControlMessage),
}

impl QueuedPayload {
    /// The bytes that go after the length prefix.
    pub fn into_wire_bytes(self) -> Bytes {
        match self {
            Self::Video(bytes) => bytes,
            Self::Control(msg) => msg.encode(),
        }
    }
}

// ── FrameQueue ────────────────────────────────────────────────────────────────

/// FIFO queue with a fixed capacity and drop-oldest admission.
///
/// One producer side (any context, lock-only), one consumer side (the sender
/// loop, the sole caller of [`dequeue`](Self::dequeue)). `shutdown` clears
/// the queue and wakes a blocked consumer.
pub struct FrameQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
    evicted: AtomicU64,
}

struct Inner {
    items: VecDeque<QueuedPayload>,
    closed: bool,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        Self {
            inner: Mutex::new(Inner { items: VecDeque::with_capacity(capacity), closed: false }),
            notify: Notify::new(),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Admit a payload. Never blocks, never fails.
    ///
    /// On a full queue the oldest entry is displaced; after shutdown the
    /// payload is silently discarded.
    pub fn enqueue(&self, payload: QueuedPayload) {
        {
            let mut inner = self.inner.lock().expect("frame queue poisoned");
            if inner.closed {
                trace!("Enqueue after shutdown — payload discarded");
                return;
            }
            if inner.items.len() == self.capacity {
                inner.items.pop_front();
                let total = self.evicted.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Queue full — evicted oldest payload ({} total)", total);
            }
            inner.items.push_back(payload);
        }
        self.notify.notify_one();
    }

    /// Wait for the next payload in FIFO order.
    ///
    /// Resolves to `None` once the queue has been shut down.
    pub async fn dequeue(&self) -> Option<QueuedPayload> {
        loop {
            // Register interest before checking, so a concurrent enqueue
            // between the check and the await cannot be missed.
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().expect("frame queue poisoned");
                if let Some(item) = inner.items.pop_front() {
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the queue: discard pending payloads, wake a blocked consumer,
    /// and reject everything enqueued afterwards. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock().expect("frame queue poisoned");
            inner.closed = true;
            inner.items.clear();
        }
        // notify_one stores a permit when the consumer is not yet parked,
        // so a shutdown racing the dequeue's registration is never missed.
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("frame queue poisoned").closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("frame queue poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Payloads displaced by the drop-oldest policy since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
