//! Receive side of a hub subscription.

use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub use tokio::sync::mpsc::error::TryRecvError;

/// Handle identifying a subscription within its hub.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A live (or closed) subscription to a [`Hub`](super::Hub).
///
/// Holds at most one pending signal. Once the subscription's token fires
/// and the hub has torn it down, the pending signal (if any) can still be
/// received, after which every receive reports end-of-stream.
///
/// Also implements [`Stream`], yielding `()` per received signal.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<()>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, rx: mpsc::Receiver<()>) -> Self {
        Self { id, rx }
    }

    /// Get this subscription's id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next signal.
    ///
    /// Returns `None` once the subscription is closed and drained.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Take a pending signal without waiting.
    ///
    /// Returns [`TryRecvError::Empty`] if nothing is pending and
    /// [`TryRecvError::Disconnected`] once closed and drained.
    pub fn try_recv(&mut self) -> Result<(), TryRecvError> {
        self.rx.try_recv()
    }

    /// Check whether a signal is waiting to be received.
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Check whether the hub has closed this subscription.
    ///
    /// A closed subscription may still hold one pending signal.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    /// Convert into a [`ReceiverStream`] for use with stream combinators.
    pub fn into_stream(self) -> ReceiverStream<()> {
        ReceiverStream::new(self.rx)
    }
}

impl Stream for Subscription {
    type Item = ();

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<()>> {
        self.rx.poll_recv(cx)
    }
}
