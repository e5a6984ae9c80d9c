//! Chanhub demo: broadcast signals to a set of cancellation-scoped subscribers.
//!
//! # Usage
//!
//! ```bash
//! chanhub --subscribers 5 --interval-ms 200 --broadcasts 20 --consumer-delay-ms 500
//! ```
//!
//! Environment variables can also be used:
//! - `CHANHUB_SUBSCRIBERS`: Number of subscribers
//! - `CHANHUB_INTERVAL_MS`: Milliseconds between broadcasts
//! - `RUST_LOG`: Log filter (defaults to `info,chanhub=debug`)

use anyhow::Context;
use chanhub::config::Config;
use chanhub::observability::metrics::{init_metrics, snapshot};
use chanhub::observability::tracing::init_tracing;
use chanhub::{Hub, Subscription};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let broadcasts = if config.broadcasts == 0 {
        "until Ctrl+C".to_string()
    } else {
        config.broadcasts.to_string()
    };
    eprintln!(
        r#"
  Chanhub v{}

  Configuration:
    Subscribers:  {}
    Interval:     {}ms
    Broadcasts:   {}
    Log Level:    {}

  Press Ctrl+C to shutdown gracefully.
"#,
        version, config.subscribers, config.interval_ms, broadcasts, config.log_level
    );
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if ctrl_c.await.is_err() {
                tracing::warn!("Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        shutdown.cancel();
    });
}

/// Drain signals until the subscription closes. Returns the number received.
async fn consume(index: usize, mut sub: Subscription, delay: Option<Duration>) -> u64 {
    let mut received = 0u64;
    while sub.recv().await.is_some() {
        received += 1;
        tracing::debug!(subscriber = index, subscription_id = %sub.id(), received, "Signal received");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
    received
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();
    config.validate().context("invalid configuration")?;

    // Initialize tracing/logging
    init_tracing(&config.log_level, config.log_json);

    // Initialize metrics (recorded, not exported)
    init_metrics();

    print_banner(&config);

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let hub = Hub::new();
    let tracker = TaskTracker::new();

    let consumers: Vec<JoinHandle<u64>> = (0..config.subscribers)
        .map(|index| {
            let token = shutdown.child_token();
            let sub = hub.subscribe(token.clone());

            if let Some(lifetime) = config.lifetime() {
                let parent = shutdown.clone();
                tracker.spawn(async move {
                    tokio::select! {
                        () = tokio::time::sleep(lifetime) => {
                            tracing::info!(subscriber = index, "Subscription lifetime expired");
                            token.cancel();
                        }
                        () = parent.cancelled() => {}
                    }
                });
            }

            tracker.spawn(consume(index, sub, config.consumer_delay()))
        })
        .collect();
    tracker.close();

    let mut ticker = tokio::time::interval(config.interval());
    let mut sent = 0u64;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                hub.broadcast();
                sent += 1;
                tracing::info!(sent, subscribers = hub.subscriber_count(), "Broadcast");
                if config.broadcasts > 0 && sent >= config.broadcasts {
                    break;
                }
            }
        }
    }

    // Closes every remaining subscription via its child token
    shutdown.cancel();

    for (index, handle) in consumers.into_iter().enumerate() {
        let received = handle.await.context("subscriber task panicked")?;
        tracing::info!(subscriber = index, received, sent, "Subscriber finished");
    }
    tracker.wait().await;

    if let Some(snap) = snapshot() {
        tracing::info!(
            broadcasts = snap.broadcast_total,
            delivered = snap.signals_delivered,
            coalesced = snap.signals_coalesced,
            subscribed = snap.subscribe_total,
            unsubscribed = snap.unsubscribe_total,
            "Metrics summary"
        );
    }

    tracing::info!("Chanhub shutdown complete");
    Ok(())
}
