//! Cache configuration.
//!
//! Controls the response cache on the global feed via `piazza.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_ENTRY_LIMIT: usize = 200;
const DEFAULT_TTL_SECONDS: u64 = 20;

/// Response cache configuration from `piazza.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the response cache.
    pub enabled: bool,
    /// Maximum cached responses before LRU eviction.
    pub entry_limit: usize,
    /// Seconds a cached response stays servable.
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            entry_limit: settings.entry_limit,
            ttl_seconds: settings.ttl_seconds,
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.entry_limit, 200);
        assert_eq!(config.ttl_seconds, 20);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            entry_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.entry_limit_non_zero().get(), 1);
    }
}
