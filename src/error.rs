//! Error types.
//!
//! Hub operations themselves cannot fail; errors only arise when validating
//! configuration for the demo binary.

use thiserror::Error;

/// Invalid demo configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("subscriber count must be at least 1")]
    NoSubscribers,

    #[error("broadcast interval must be greater than zero")]
    ZeroInterval,
}
