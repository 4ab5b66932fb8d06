//! Per-target pairing of inbound transfer requests with report updates.
use std::{
    collections::VecDeque,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::sync::{ReceiveTimeoutError, TimeoutReceiver};

/// Possible outcomes of a transfer request that did not complete with data
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    #[error("target was removed")]
    Cancelled,
    #[error("timed out waiting for transfer to complete")]
    Timeout,
}

/// An inbound interrupt transfer awaiting report data. Resolves with the
/// packet that completed it, or [TransferError::Cancelled] if the target was
/// removed first.
#[derive(Debug)]
pub struct PendingTransferRequest {
    rx: oneshot::Receiver<Vec<u8>>,
}

impl PendingTransferRequest {
    /// Returns the packet if the request has already completed without
    /// waiting.
    pub fn try_complete(&mut self) -> Option<Result<Vec<u8>, TransferError>> {
        match self.rx.try_recv() {
            Ok(packet) => Some(Ok(packet)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(TransferError::Cancelled)),
        }
    }

    /// Wait for the request to complete for at most the given duration
    pub async fn wait_timeout(mut self, duration: Duration) -> Result<Vec<u8>, TransferError> {
        self.rx
            .recv_timeout(duration)
            .await
            .map_err(|e| match e {
                ReceiveTimeoutError::Timeout => TransferError::Timeout,
                ReceiveTimeoutError::Closed => TransferError::Cancelled,
            })
    }
}

impl Future for PendingTransferRequest {
    type Output = Result<Vec<u8>, TransferError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| TransferError::Cancelled))
    }
}

/// FIFO queue of pending transfer requests plus a single-slot cache of the
/// latest undelivered packet.
#[derive(Debug, Default)]
pub struct TransferQueue {
    pending: VecDeque<oneshot::Sender<Vec<u8>>>,
    latest: Option<Vec<u8>>,
    closed: bool,
}

impl TransferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new transfer request. A cached packet completes it right away
    /// and is consumed.
    pub fn enqueue(&mut self) -> PendingTransferRequest {
        let (tx, rx) = oneshot::channel();
        if self.closed {
            // Dropping the sender cancels the request
            return PendingTransferRequest { rx };
        }
        if let Some(packet) = self.latest.take() {
            log::trace!("Completing transfer with cached packet");
            let _ = tx.send(packet);
            return PendingTransferRequest { rx };
        }
        self.pending.push_back(tx);
        PendingTransferRequest { rx }
    }

    /// Complete the oldest live request with the given packet. Returns the
    /// packet back if no live request is waiting.
    pub fn try_complete(&mut self, packet: Vec<u8>) -> Option<Vec<u8>> {
        let mut packet = packet;
        while let Some(tx) = self.pending.pop_front() {
            match tx.send(packet) {
                Ok(_) => return None,
                // The requester went away, try the next one
                Err(returned) => packet = returned,
            }
        }
        Some(packet)
    }

    /// Complete the oldest live request with the given packet, or cache it as
    /// the latest value if nobody is waiting. Returns true if a request was
    /// completed.
    pub fn complete(&mut self, packet: Vec<u8>) -> bool {
        if self.closed {
            return false;
        }
        match self.try_complete(packet) {
            None => true,
            Some(packet) => {
                log::trace!("No transfer pending, caching packet");
                self.latest = Some(packet);
                false
            }
        }
    }

    /// Returns true if at least one live request is waiting
    pub fn has_waiter(&mut self) -> bool {
        while let Some(tx) = self.pending.front() {
            if !tx.is_closed() {
                return true;
            }
            self.pending.pop_front();
        }
        false
    }

    /// Number of queued requests, including ones whose requester went away
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if a packet is cached for the next request
    pub fn has_cached(&self) -> bool {
        self.latest.is_some()
    }

    /// Cancel every queued request and drop the cached packet. The queue
    /// refuses new requests afterwards. Returns the number of cancelled
    /// requests.
    pub fn cancel_all(&mut self) -> usize {
        self.closed = true;
        self.latest = None;
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}
