//! User-facing notification queue
//!
//! Any thread may push through a [`MessageSender`]; only the main thread owns
//! the [`MessageQueue`] and flushes it to the player. Pushing never blocks:
//! when a bound is configured and the queue is full, the oldest notification
//! is dropped to make room.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub text: String,
}

impl Notification {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

// =============================================================================
// SENDER
// =============================================================================

/// Cloneable handle used by background threads to queue notifications
#[derive(Clone)]
pub struct MessageSender {
    tx: Sender<Notification>,
    // Kept so a full bounded queue can evict its oldest entry
    rx: Receiver<Notification>,
    dropped: Arc<AtomicUsize>,
}

impl MessageSender {
    /// Queue a notification. Never blocks.
    pub fn push(&self, notification: Notification) {
        let mut pending = notification;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    if self.rx.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    pending = back;
                }
                // Receiver gone: nobody will ever flush
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(Notification::info(text));
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.push(Notification::warning(text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(Notification::error(text));
    }
}

// =============================================================================
// QUEUE
// =============================================================================

/// Main-thread side of the notification queue
pub struct MessageQueue {
    sender: MessageSender,
    rx: Receiver<Notification>,
}

impl MessageQueue {
    pub fn unbounded() -> Self {
        let (tx, rx) = unbounded();
        Self::from_channel(tx, rx)
    }

    /// Queue holding at most `capacity` notifications (at least 1)
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self::from_channel(tx, rx)
    }

    /// Bounded when `capacity` is Some, unbounded otherwise
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(cap) => Self::bounded(cap),
            None => Self::unbounded(),
        }
    }

    fn from_channel(tx: Sender<Notification>, rx: Receiver<Notification>) -> Self {
        Self {
            sender: MessageSender {
                tx,
                rx: rx.clone(),
                dropped: Arc::new(AtomicUsize::new(0)),
            },
            rx,
        }
    }

    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Notifications evicted so far because the queue was full
    pub fn dropped(&self) -> usize {
        self.sender.dropped.load(Ordering::Relaxed)
    }

    /// Hand every queued notification, oldest first, to `deliver`.
    ///
    /// Returns how many were delivered.
    pub fn flush<F: FnMut(Notification)>(&self, mut deliver: F) -> usize {
        let mut delivered = 0;
        for notification in self.rx.try_iter() {
            deliver(notification);
            delivered += 1;
        }
        if delivered > 0 {
            debug!(delivered, "[OVERLAY] Flushed notifications");
        }
        let dropped = self.sender.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped, "[OVERLAY] Notifications dropped, queue full");
        }
        delivered
    }
}
