//! Test utilities for chanhub integration tests.
//!
//! Provides:
//! - Polling helper for eventually-consistent teardown
//! - Subscription fixtures

#![allow(dead_code)]

use chanhub::{Hub, Subscription};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Grace period for watcher teardown in tests.
pub const GRACE: Duration = Duration::from_secs(2);

/// A subscription together with the token that controls it.
pub struct Subscriber {
    pub token: CancellationToken,
    pub sub: Subscription,
}

impl Subscriber {
    /// Subscribe to `hub` with a fresh token.
    pub fn new(hub: &Hub) -> Self {
        let token = CancellationToken::new();
        let sub = hub.subscribe(token.clone());
        Self { token, sub }
    }
}

/// Subscribe `count` independent subscribers.
pub fn subscribe_many(hub: &Hub, count: usize) -> Vec<Subscriber> {
    (0..count).map(|_| Subscriber::new(hub)).collect()
}

/// Wait for a condition to become true with timeout.
///
/// # Arguments
///
/// * `timeout` - Maximum time to wait
/// * `condition` - Closure that returns true when condition is met
///
/// # Returns
///
/// `true` if condition was met, `false` if timeout expired
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Wait until `sub` reports end-of-stream, discarding any pending signal.
pub async fn wait_closed(sub: &mut Subscription) -> bool {
    tokio::time::timeout(GRACE, async { while sub.recv().await.is_some() {} })
        .await
        .is_ok()
}
