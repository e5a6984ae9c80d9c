//! Configuration parsing for the chanhub demo.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::Parser;
use std::time::Duration;

use crate::error::ConfigError;

/// Default log filter: info everywhere, debug for this crate.
pub const DEFAULT_LOG_FILTER: &str = "info,chanhub=debug";

/// Chanhub: broadcast payload-free signals to cancellation-scoped subscribers.
#[derive(Parser, Debug, Clone)]
#[command(name = "chanhub")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Number of subscribers to register
    #[arg(short, long, env = "CHANHUB_SUBSCRIBERS", default_value_t = 3)]
    pub subscribers: usize,

    /// Milliseconds between broadcasts
    #[arg(short, long, env = "CHANHUB_INTERVAL_MS", default_value_t = 500)]
    pub interval_ms: u64,

    /// Number of broadcasts to send before exiting (0 = until Ctrl+C)
    #[arg(short, long, env = "CHANHUB_BROADCASTS", default_value_t = 0)]
    pub broadcasts: u64,

    /// Cancel each subscription after this many milliseconds (0 = never)
    #[arg(long, env = "CHANHUB_LIFETIME_MS", default_value_t = 0)]
    pub lifetime_ms: u64,

    /// Delay after each received signal, to simulate slow consumers
    #[arg(long, env = "CHANHUB_CONSUMER_DELAY_MS", default_value_t = 0)]
    pub consumer_delay_ms: u64,

    /// Log filter directive (e.g. info, debug, info,chanhub=trace)
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "CHANHUB_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check that the configuration describes a runnable demo.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscribers == 0 {
            return Err(ConfigError::NoSubscribers);
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    /// Time between broadcasts.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Subscription lifetime, if bounded.
    pub fn lifetime(&self) -> Option<Duration> {
        (self.lifetime_ms > 0).then(|| Duration::from_millis(self.lifetime_ms))
    }

    /// Per-signal consumer delay, if any.
    pub fn consumer_delay(&self) -> Option<Duration> {
        (self.consumer_delay_ms > 0).then(|| Duration::from_millis(self.consumer_delay_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subscribers: 3,
            interval_ms: 500,
            broadcasts: 0,
            lifetime_ms: 0,
            consumer_delay_ms: 0,
            log_level: DEFAULT_LOG_FILTER.into(),
            log_json: false,
        }
    }
}
