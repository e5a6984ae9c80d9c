//! Observability infrastructure.
//!
//! Provides:
//! - Structured logging via `tracing`
//! - OpenTelemetry counters for subscribe, teardown, and broadcast activity

pub mod metrics;
pub mod tracing;
