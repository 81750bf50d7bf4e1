//! # Engine configuration.
//!
//! Provides [`EngineConfig`] centralized settings for the engine runtime.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created)
//! - `timeout = 0s` → no default timeout

use std::time::Duration;

/// Global configuration for the engine.
///
/// ## Field semantics
/// - `grace`: maximum wait in [`Engine::shutdown`](crate::Engine::shutdown) for bodies to stop
/// - `max_concurrent`: bodies allowed to run at once (`0` = unlimited)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `timeout`: default per-launch timeout (`0s` = none)
/// - `mailbox_capacity`: per-listener delivery queue size (min 1)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum time to wait for operation bodies during shutdown.
    pub grace: Duration,

    /// Maximum number of operation bodies running concurrently.
    ///
    /// Launches beyond the limit stay `Pending` until a permit frees up; they can
    /// be cancelled while waiting and then never run.
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default launch timeout.
    ///
    /// Exceeding it records the launch as failed with `OperationError::Timeout`.
    /// Can be overridden per launch via `LaunchOptions::with_timeout`.
    pub timeout: Duration,

    /// Capacity of each listener's delivery mailbox.
    ///
    /// When full, new deliveries for that listener are dropped.
    pub mailbox_capacity: usize,
}

impl EngineConfig {
    /// Returns the concurrency limit as an `Option` (`None` = unlimited).
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the default launch timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a mailbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn mailbox_capacity_clamped(&self) -> usize {
        self.mailbox_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `grace = 60s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `timeout = 0s` (no timeout)
    /// - `mailbox_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            max_concurrent: 0,
            bus_capacity: 1024,
            timeout: Duration::ZERO,
            mailbox_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_sentinels() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.concurrency_limit(), None);
        assert_eq!(cfg.default_timeout(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
    }

    #[test]
    fn test_clamping_and_limits() {
        let cfg = EngineConfig {
            max_concurrent: 4,
            bus_capacity: 0,
            mailbox_capacity: 0,
            timeout: Duration::from_millis(250),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.concurrency_limit(), Some(4));
        assert_eq!(cfg.default_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.mailbox_capacity_clamped(), 1);
    }
}
