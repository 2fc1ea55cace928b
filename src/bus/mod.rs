//! Message Bus Module
//!
//! Two independent bounded FIFO queues decouple channel adapters from the
//! agent core:
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Channel   │────>│  MessageBus │────>│  AgentLoop  │
//! │  Scheduler  │     │  (inbound)  │     │             │
//! │  Heartbeat  │     └─────────────┘     └─────────────┘
//! └─────────────┘                                │
//!        ▲                                       │ outbound
//!        │            ┌─────────────┐            │
//!        └────────────│  MessageBus │<───────────┘
//!                     │ (outbound)  │
//!                     └─────────────┘
//! ```
//!
//! Inbound publishing awaits free capacity, so a full queue backpressures
//! producers. Outbound publishing never waits: a full queue returns
//! [`PicoError::BusFull`] and the caller drops the message.
//!
//! # Example
//!
//! ```
//! use picobot::bus::{MessageBus, InboundMessage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = MessageBus::new();
//!     let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello");
//!     bus.publish_inbound(msg).await.unwrap();
//!
//!     if let Some(received) = bus.consume_inbound().await {
//!         println!("Received: {}", received.content);
//!     }
//! }
//! ```

pub mod message;

pub use message::{InboundMessage, OutboundMessage};

use crate::error::{PicoError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Default buffer size for message channels
const DEFAULT_BUFFER_SIZE: usize = 100;

/// The central message bus for routing messages between channels and the agent.
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Arc<Mutex<mpsc::Receiver<InboundMessage>>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: Arc<Mutex<mpsc::Receiver<OutboundMessage>>>,
    /// Flips to `true` once on `close()`; shared by every clone.
    closed: Arc<watch::Sender<bool>>,
}

impl MessageBus {
    /// Creates a new `MessageBus` holding up to 100 messages per queue.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Creates a new `MessageBus` with a custom per-queue capacity.
    ///
    /// # Example
    /// ```
    /// use picobot::bus::MessageBus;
    ///
    /// let bus = MessageBus::with_buffer_size(10);
    /// ```
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size.max(1));
        let (closed, _) = watch::channel(false);

        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
            closed: Arc::new(closed),
        }
    }

    /// Publishes an inbound message, waiting for capacity if the queue is full.
    ///
    /// # Errors
    /// Returns `PicoError::BusClosed` once the bus has been closed.
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(PicoError::BusClosed);
        }
        let mut closed = self.closed.subscribe();
        tokio::select! {
            sent = self.inbound_tx.send(msg) => sent.map_err(|_| PicoError::BusClosed),
            _ = closed.wait_for(|c| *c) => Err(PicoError::BusClosed),
        }
    }

    /// Publishes an inbound message without waiting.
    ///
    /// # Errors
    /// - `PicoError::BusFull` if the inbound queue is at capacity
    /// - `PicoError::BusClosed` once the bus has been closed
    pub fn try_publish_inbound(&self, msg: InboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(PicoError::BusClosed);
        }
        self.inbound_tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PicoError::BusFull("inbound".to_string()),
            mpsc::error::TrySendError::Closed(_) => PicoError::BusClosed,
        })
    }

    /// Publishes an outbound message without waiting.
    ///
    /// # Errors
    /// - `PicoError::BusFull` if the outbound queue is at capacity
    /// - `PicoError::BusClosed` once the bus has been closed
    pub fn publish_outbound(&self, msg: OutboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(PicoError::BusClosed);
        }
        self.outbound_tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PicoError::BusFull("outbound".to_string()),
            mpsc::error::TrySendError::Closed(_) => PicoError::BusClosed,
        })
    }

    /// Consumes the next inbound message.
    ///
    /// Returns `None` once the bus is closed and the queue has been drained.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        let mut closed = self.closed.subscribe();
        tokio::select! {
            biased;
            msg = rx.recv() => msg,
            _ = closed.wait_for(|c| *c) => rx.try_recv().ok(),
        }
    }

    /// Consumes the next outbound message.
    ///
    /// Returns `None` once the bus is closed and the queue has been drained.
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        let mut closed = self.closed.subscribe();
        tokio::select! {
            biased;
            msg = rx.recv() => msg,
            _ = closed.wait_for(|c| *c) => rx.try_recv().ok(),
        }
    }

    /// Closes both queues. Pending consumers wake up; later publishes fail
    /// with `BusClosed`. Messages already queued can still be drained.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Returns `true` once `close()` has been called on any clone.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MessageBus {
    /// Clones the message bus, sharing the same underlying queues.
    fn clone(&self) -> Self {
        Self {
            inbound_tx: self.inbound_tx.clone(),
            inbound_rx: Arc::clone(&self.inbound_rx),
            outbound_tx: self.outbound_tx.clone(),
            outbound_rx: Arc::clone(&self.outbound_rx),
            closed: Arc::clone(&self.closed),
        }
    }
}
