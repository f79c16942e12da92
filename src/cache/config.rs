//! Cache configuration.
//!
//! Controls the list-response cache via the `[cache]` section of `postwell.toml`.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 30;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// List cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a cached list response.
    pub ttl: Duration,
    /// Interval between background purges of expired entries; `None` disables the sweeper.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            ttl: settings.ttl,
            sweep_interval: settings.sweep_interval,
        }
    }
}

impl CacheConfig {
    /// Config with the given TTL and no background sweeper.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sweep_interval: None,
        }
    }
}
