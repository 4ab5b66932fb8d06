//! Per-target inverted call channel. The controlling process keeps requests
//! outstanding ahead of time and the device-class side completes them when
//! the host emits an event.
use std::{
    collections::VecDeque,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::{error::Error, target::Notification};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification request was cancelled")]
    Cancelled,
}

/// Result of delivering a host event to the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// An outstanding request was completed
    Completed,
    /// No request was outstanding, the event replaced the buffered one
    Buffered,
    /// No callback is registered, the event was dropped
    Discarded,
}

/// An outstanding notification request
#[derive(Debug)]
pub struct PendingNotification {
    rx: oneshot::Receiver<Notification>,
}

impl Future for PendingNotification {
    type Output = Result<Notification, NotificationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| NotificationError::Cancelled))
    }
}

/// Queue of outstanding notification requests of a single target
#[derive(Debug, Default)]
pub struct NotificationQueue {
    registered: bool,
    pending: VecDeque<oneshot::Sender<Notification>>,
    buffered: Option<Notification>,
    closed: bool,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a callback is registered
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Mark a callback as registered. Only one registration can be active.
    pub fn register(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::TargetNotPluggedIn);
        }
        if self.registered {
            return Err(Error::CallbackAlreadyRegistered);
        }
        self.registered = true;
        Ok(())
    }

    /// Clear the registration, cancelling all outstanding requests and the
    /// buffered event.
    pub fn unregister(&mut self) -> Result<(), Error> {
        if !self.registered {
            return Err(Error::CallbackNotFound);
        }
        self.registered = false;
        self.buffered = None;
        self.pending.clear();
        Ok(())
    }

    /// Submit a new request. Requests submitted without a registration are
    /// cancelled right away.
    pub fn submit(&mut self) -> PendingNotification {
        let (tx, rx) = oneshot::channel();
        if self.closed || !self.registered {
            return PendingNotification { rx };
        }
        if let Some(notification) = self.buffered.take() {
            let _ = tx.send(notification);
            return PendingNotification { rx };
        }
        self.pending.push_back(tx);
        PendingNotification { rx }
    }

    /// Deliver a host event to the oldest outstanding request
    pub fn deliver(&mut self, notification: Notification) -> DeliveryOutcome {
        if self.closed || !self.registered {
            log::trace!("No callback registered, discarding {notification:?}");
            return DeliveryOutcome::Discarded;
        }
        while let Some(tx) = self.pending.pop_front() {
            if tx.send(notification).is_ok() {
                return DeliveryOutcome::Completed;
            }
        }
        self.buffered = Some(notification);
        DeliveryOutcome::Buffered
    }

    /// Number of outstanding requests
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Cancel every outstanding request and close the channel. Returns the
    /// number of cancelled requests.
    pub fn cancel_all(&mut self) -> usize {
        self.closed = true;
        self.registered = false;
        self.buffered = None;
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}
