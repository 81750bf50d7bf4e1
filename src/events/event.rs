//! # Runtime events emitted by the engine.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Admission events**: a launch was registered, or joined an existing tagged launch
//! - **Lifecycle events**: execution flow (started, completed, failed, timeout, cancelled)
//! - **Delivery events**: results dropped or discarded, records removed, listeners attached/detached
//! - **Shutdown events**: engine shutdown progress
//!
//! The [`Event`] struct carries additional metadata such as timestamps, launch id,
//! tag, operation name and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use opvisor::{Event, EventKind, LaunchId};
//!
//! let ev = Event::new(EventKind::LaunchFailed)
//!     .with_launch(LaunchId::new(7))
//!     .with_tag("sync")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::LaunchFailed);
//! assert_eq!(ev.launch, Some(LaunchId::new(7)));
//! assert_eq!(ev.tag.as_deref(), Some("sync"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::LaunchId;
use crate::listeners::ListenerId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason ("full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Engine shutdown requested.
    ShutdownRequested,

    /// All operation bodies stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some operation bodies did not stop in time.
    GraceExceeded,

    // === Admission events ===
    /// A new launch record was created (state `Pending`).
    ///
    /// Sets:
    /// - `launch`, `tag` (if any), `operation`, `listener` (submitter)
    LaunchRegistered,

    /// A tagged submission found a live launch and reused its id; nothing new runs.
    ///
    /// Sets:
    /// - `launch`: the existing id
    /// - `tag`, `operation`, `listener` (submitter of the rejected duplicate)
    LaunchJoined,

    // === Lifecycle events ===
    /// The operation body started (state `Running`).
    ///
    /// Sets:
    /// - `launch`, `tag`, `operation`
    LaunchStarted,

    /// The launch completed with a value and was recorded as `Completed`.
    ///
    /// Sets:
    /// - `launch`, `tag`, `operation`
    LaunchCompleted,

    /// The launch was recorded as `Failed`.
    ///
    /// Sets:
    /// - `launch`, `tag`, `operation`
    /// - `reason`: failure message
    LaunchFailed,

    /// The operation body exceeded its timeout (always followed by `LaunchFailed`).
    ///
    /// Sets:
    /// - `launch`, `operation`
    /// - `timeout_ms`: configured timeout (ms)
    TimeoutHit,

    /// A cancellation request was accepted (launch moved to `Cancelled`).
    ///
    /// Sets:
    /// - `launch`, `tag`, `operation`
    CancelRequested,

    /// The executor observed a cancelled launch finishing its body.
    ///
    /// Sets:
    /// - `launch`, `tag`, `operation`
    LaunchCancelled,

    // === Delivery events ===
    /// A natural outcome arrived after cancellation and was thrown away.
    ///
    /// Sets:
    /// - `launch`, `operation`
    /// - `reason`: outcome label
    ResultDiscarded,

    /// A delivery could not reach one recipient (detached, full mailbox, no handler).
    ///
    /// Sets:
    /// - `launch`, `listener`
    /// - `reason`: drop reason
    DeliveryDropped,

    /// A terminal launch record was purged from the registry.
    ///
    /// Sets:
    /// - `launch`, `tag`, `operation`
    LaunchRemoved,

    /// A listener attached to the engine.
    ///
    /// Sets:
    /// - `listener`
    ListenerAttached,

    /// A listener detached from the engine.
    ///
    /// Sets:
    /// - `listener`
    ListenerDetached,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Launch the event refers to.
    pub launch: Option<LaunchId>,
    /// Deduplication tag of the launch, if any.
    pub tag: Option<Arc<str>>,
    /// Operation name.
    pub operation: Option<Arc<str>>,
    /// Listener (submitter or recipient) involved.
    pub listener: Option<ListenerId>,
    /// Human-readable reason (errors, drop details, etc.).
    pub reason: Option<Arc<str>>,
    /// Operation timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            launch: None,
            tag: None,
            operation: None,
            listener: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches a launch id.
    #[inline]
    pub fn with_launch(mut self, id: LaunchId) -> Self {
        self.launch = Some(id);
        self
    }

    /// Attaches a tag.
    #[inline]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the tag from an optional value; `None` clears it.
    #[inline]
    pub fn with_tag_opt(mut self, tag: Option<&Arc<str>>) -> Self {
        self.tag = tag.cloned();
        self
    }

    /// Attaches an operation name.
    #[inline]
    pub fn with_operation(mut self, name: impl Into<Arc<str>>) -> Self {
        self.operation = Some(name.into());
        self
    }

    /// Attaches a listener id.
    #[inline]
    pub fn with_listener(mut self, listener: ListenerId) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// Creates a delivery drop event for one recipient.
    #[inline]
    pub fn delivery_dropped(id: LaunchId, listener: ListenerId, reason: &'static str) -> Self {
        Event::new(EventKind::DeliveryDropped)
            .with_launch(id)
            .with_listener(listener)
            .with_reason(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::LaunchRegistered);
        let b = Event::new(EventKind::LaunchStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_timeout_is_clamped_to_u32() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn test_tag_opt_none_clears() {
        let ev = Event::new(EventKind::LaunchRemoved).with_tag_opt(None);
        assert!(ev.tag.is_none());
    }
}
