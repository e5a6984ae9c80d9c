//! Chanhub: a lightweight in-process signal hub.
//!
//! A [`Hub`] lets any number of listeners register interest and be woken
//! whenever a producer signals an event. Signals carry no payload; they only
//! say "something happened, go look".
//!
//! # Architecture
//!
//! - **Cancellation-scoped**: every subscription is bound to a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken) and is torn
//!   down automatically when the token fires
//! - **Non-blocking broadcast**: a slow or dead subscriber can never stall
//!   the broadcaster
//! - **Coalescing**: each subscriber has a single-slot mailbox, so bursts of
//!   signals collapse into one pending wake-up
//! - **Observable**: `tracing` events and OpenTelemetry counters
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration for the demo binary
//! - [`error`]: Error types
//! - [`hub`]: The hub and its subscriptions
//! - [`observability`]: Metrics and tracing setup
//!
//! # Example
//!
//! ```
//! use chanhub::Hub;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hub = Hub::new();
//! let token = CancellationToken::new();
//! let mut sub = hub.subscribe(token.clone());
//!
//! hub.broadcast();
//! assert_eq!(sub.recv().await, Some(()));
//!
//! token.cancel();
//! assert_eq!(sub.recv().await, None);
//! # }
//! ```

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // error::ConfigError is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod config;
pub mod error;
pub mod hub;
pub mod observability;

pub use hub::{Hub, Subscription, SubscriptionId, TryRecvError};
