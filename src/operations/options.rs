//! # Per-launch options.
//!
//! [`LaunchOptions`] bundles what a submission may specify besides the operation
//! itself: the deduplication tag, the delivery mode and an optional timeout.
//! The four `run_operation*` helpers on [`Client`](crate::Client) build these
//! for the common cases; [`Client::launch`](crate::Client::launch) takes them directly.

use std::sync::Arc;
use std::time::Duration;

use crate::core::DeliveryMode;

/// Options for one submission.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use opvisor::{DeliveryMode, LaunchOptions};
///
/// let opts = LaunchOptions::new()
///     .with_tag("sync")
///     .broadcast()
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(opts.tag().map(|t| t.as_ref()), Some("sync"));
/// assert_eq!(opts.mode(), DeliveryMode::Broadcast);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    tag: Option<Arc<str>>,
    mode: DeliveryMode,
    timeout: Option<Duration>,
}

impl LaunchOptions {
    /// Untagged, own delivery, engine default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deduplication tag.
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the delivery mode.
    pub fn with_mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `with_mode(DeliveryMode::Broadcast)`.
    pub fn broadcast(self) -> Self {
        self.with_mode(DeliveryMode::Broadcast)
    }

    /// Overrides the engine default timeout for this launch (`Duration::ZERO` = none).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the tag, if any.
    pub fn tag(&self) -> Option<&Arc<str>> {
        self.tag.as_ref()
    }

    /// Returns the delivery mode.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Returns the timeout override, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn into_parts(self) -> (Option<Arc<str>>, DeliveryMode, Option<Duration>) {
        (self.tag, self.mode, self.timeout)
    }
}
