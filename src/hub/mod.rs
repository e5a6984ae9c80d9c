//! Signal hub with cancellation-scoped subscriptions.
//!
//! Provides:
//! - [`Hub`]: registry of live subscriptions plus non-blocking broadcast
//! - [`Subscription`]: the receive side of a single-slot mailbox
//!
//! Each subscription gets a `tokio::sync::mpsc` channel of capacity 1. The
//! hub keeps the sending half in its registry; the caller keeps the receiving
//! half. A watcher task per subscription waits on the caller's
//! [`CancellationToken`] and is the only code path that removes an entry.
//! Removing the entry drops the last sender, which closes the channel once
//! any pending signal has been drained.

mod subscription;

pub use subscription::{Subscription, SubscriptionId, TryRecvError};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;

type Registry = HashMap<SubscriptionId, mpsc::Sender<()>>;

/// Broadcast hub for payload-free signals.
///
/// Cloning is cheap and every clone shares the same registry. Independent
/// hubs are created with [`Hub::new`].
///
/// Each subscription's watcher keeps the registry alive, so dropping every
/// `Hub` handle does not close live subscriptions; only their tokens do.
#[derive(Clone, Debug, Default)]
pub struct Hub {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Live subscriptions: id -> mailbox sender
    subs: RwLock<Registry>,
    next_id: AtomicU64,
}

impl Inner {
    // The registry is only ever touched by single insert/remove/iterate
    // sections, so a panic elsewhere cannot leave it half-updated.
    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.subs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.subs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a subscription and close its mailbox.
    fn remove(&self, id: SubscriptionId) {
        let removed = {
            let mut subs = self.write();
            subs.remove(&id)
        };

        if removed.is_some() {
            tracing::debug!(subscription_id = %id, "Subscription closed");
            metrics::record_unsubscribe();
        }
    }
}

impl Hub {
    /// Create a new hub with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscription bound to `token`.
    ///
    /// The returned [`Subscription`] can receive signals immediately. When
    /// `token` fires, a background watcher removes the subscription from the
    /// hub and closes it: any pending signal can still be received, after
    /// which [`Subscription::recv`] returns `None`.
    ///
    /// A token that has already fired is accepted; the subscription is
    /// closed shortly after this call returns.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime, since the watcher is a
    /// spawned task.
    pub fn subscribe(&self, token: CancellationToken) -> Subscription {
        let (tx, rx) = mpsc::channel(1);
        let id = SubscriptionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        self.inner.write().insert(id, tx);

        tracing::debug!(subscription_id = %id, "Subscription registered");
        metrics::record_subscribe();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            token.cancelled().await;
            inner.remove(id);
        });

        Subscription::new(id, rx)
    }

    /// Signal every registered subscription.
    ///
    /// Never blocks: a subscriber whose mailbox still holds an unconsumed
    /// signal is skipped, so consecutive broadcasts coalesce into one
    /// pending wake-up. Subscriptions registered or torn down concurrently
    /// may or may not observe this broadcast.
    pub fn broadcast(&self) {
        let mut delivered = 0u64;
        let mut coalesced = 0u64;

        {
            let subs = self.inner.read();
            for tx in subs.values() {
                match tx.try_send(()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(())) => coalesced += 1,
                    // Receiver dropped before its token fired
                    Err(TrySendError::Closed(())) => {}
                }
            }
        }

        tracing::trace!(delivered, coalesced, "Broadcast signal");
        metrics::record_broadcast(delivered, coalesced);
    }

    /// Get the number of registered subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const GRACE: Duration = Duration::from_secs(1);

    #[test]
    fn test_new_hub_is_empty() {
        let hub = Hub::new();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let hub = Hub::new();
        // No subscribers - should not panic
        hub.broadcast();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_registers() {
        let hub = Hub::new();
        let token = CancellationToken::new();

        let _sub = hub.subscribe(token.clone());
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_subscription_ids_are_unique() {
        let hub = Hub::new();
        let token = CancellationToken::new();

        let a = hub.subscribe(token.clone());
        let b = hub.subscribe(token.clone());
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_cancel_removes_and_closes() {
        let hub = Hub::new();
        let token = CancellationToken::new();
        let mut sub = hub.subscribe(token.clone());

        token.cancel();

        let next = timeout(GRACE, sub.recv()).await.expect("close timed out");
        assert_eq!(next, None);
        assert_eq!(hub.subscriber_count(), 0);
        assert!(sub.is_closed());
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        let hub = Hub::new();
        let token = CancellationToken::new();
        token.cancel();

        let mut sub = hub.subscribe(token);

        let next = timeout(GRACE, sub.recv()).await.expect("close timed out");
        assert_eq!(next, None);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_signal_survives_close() {
        let hub = Hub::new();
        let token = CancellationToken::new();
        let mut sub = hub.subscribe(token.clone());

        hub.broadcast();
        token.cancel();

        // Drained, then ended
        assert_eq!(sub.recv().await, Some(()));
        let next = timeout(GRACE, sub.recv()).await.expect("close timed out");
        assert_eq!(next, None);
    }

    #[tokio::test]
    async fn test_broadcast_coalesces() {
        let hub = Hub::new();
        let token = CancellationToken::new();
        let mut sub = hub.subscribe(token.clone());

        for _ in 0..5 {
            hub.broadcast();
        }

        assert_eq!(sub.try_recv(), Ok(()));
        assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_drained_subscriber_sees_every_broadcast() {
        let hub = Hub::new();
        let token = CancellationToken::new();
        let mut sub = hub.subscribe(token.clone());

        for _ in 0..10 {
            hub.broadcast();
            assert_eq!(sub.try_recv(), Ok(()));
        }
        assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_cancel_only_affects_own_subscription() {
        let hub = Hub::new();
        let token_a = CancellationToken::new();
        let token_b = CancellationToken::new();
        let mut a = hub.subscribe(token_a.clone());
        let mut b = hub.subscribe(token_b.clone());

        token_a.cancel();
        let next = timeout(GRACE, a.recv()).await.expect("close timed out");
        assert_eq!(next, None);

        hub.broadcast();
        assert_eq!(b.try_recv(), Ok(()));
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_skipped() {
        let hub = Hub::new();
        let token = CancellationToken::new();

        drop(hub.subscribe(token.clone()));
        let mut kept = hub.subscribe(token.clone());

        // Stays registered until the token fires
        assert_eq!(hub.subscriber_count(), 2);
        hub.broadcast();
        assert_eq!(kept.try_recv(), Ok(()));

        token.cancel();
        let next = timeout(GRACE, kept.recv()).await.expect("close timed out");
        assert_eq!(next, None);
        assert!(
            eventually(|| hub.subscriber_count() == 0).await,
            "dropped subscription should still be cleaned up"
        );
    }

    #[tokio::test]
    async fn test_subscription_outlives_dropped_hub() {
        let token = CancellationToken::new();
        let mut sub = {
            let hub = Hub::new();
            let sub = hub.subscribe(token.clone());
            hub.broadcast();
            sub
        };

        assert_eq!(sub.recv().await, Some(()));

        // Still open: only the token may close it
        let waited = timeout(Duration::from_millis(200), sub.recv()).await;
        assert!(waited.is_err(), "subscription closed with a live token");
        assert!(!sub.is_closed());

        token.cancel();
        let next = timeout(GRACE, sub.recv()).await.expect("close timed out");
        assert_eq!(next, None);
    }

    #[test]
    #[should_panic]
    fn test_subscribe_outside_runtime_panics() {
        let hub = Hub::new();
        let _sub = hub.subscribe(CancellationToken::new());
    }

    #[tokio::test]
    async fn test_clones_share_registry() {
        let hub = Hub::new();
        let other = hub.clone();
        let token = CancellationToken::new();

        let mut sub = other.subscribe(token.clone());
        assert_eq!(hub.subscriber_count(), 1);

        hub.broadcast();
        assert_eq!(sub.try_recv(), Ok(()));
    }

    #[tokio::test]
    async fn test_independent_hubs() {
        let first = Hub::new();
        let second = Hub::new();
        let token = CancellationToken::new();

        let mut a = first.subscribe(token.clone());
        let mut b = second.subscribe(token.clone());

        first.broadcast();
        assert_eq!(a.try_recv(), Ok(()));
        assert_eq!(b.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(second.subscriber_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_subscribe_and_cancel() {
        let hub = Hub::new();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let hub = hub.clone();
                tokio::spawn(async move {
                    let token = CancellationToken::new();
                    let mut sub = hub.subscribe(token.clone());
                    hub.broadcast();
                    token.cancel();
                    while sub.recv().await.is_some() {}
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("subscriber task failed");
        }

        assert_eq!(hub.subscriber_count(), 0);
    }

    /// Poll `condition` until it holds or the grace period expires.
    async fn eventually<F>(mut condition: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let start = std::time::Instant::now();
        while start.elapsed() < GRACE {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}
