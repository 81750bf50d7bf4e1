//! # LogWriter: engine events as `tracing` records.
//!
//! A subscriber that renders every [`Event`] as one `tracing` record under the
//! `opvisor::events` target. Install any `tracing` subscriber to see them.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! DEBUG opvisor::events: registered launch=#1 op="sync" tag=Some("sync")
//! DEBUG opvisor::events: started launch=#1 op="sync"
//!  INFO opvisor::events: cancel-requested launch=#1 tag=Some("sync")
//!  INFO opvisor::events: discarded launch=#1 op="sync" outcome="completed"
//!  WARN opvisor::events: delivery-dropped launch=#2 listener=L3 reason="mailbox_full"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let launch = opt(e.launch);
        let op = e.operation.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ShutdownRequested => {
                tracing::info!(target: "opvisor::events", "shutdown-requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(target: "opvisor::events", "all-stopped-within-grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: "opvisor::events", "grace-exceeded");
            }
            EventKind::LaunchRegistered => {
                tracing::debug!(target: "opvisor::events", "registered launch={launch} op={op:?} tag={:?}", e.tag);
            }
            EventKind::LaunchJoined => {
                tracing::debug!(target: "opvisor::events", "joined launch={launch} op={op:?} tag={:?}", e.tag);
            }
            EventKind::LaunchStarted => {
                tracing::debug!(target: "opvisor::events", "started launch={launch} op={op:?}");
            }
            EventKind::LaunchCompleted => {
                tracing::debug!(target: "opvisor::events", "completed launch={launch} op={op:?}");
            }
            EventKind::LaunchFailed => {
                tracing::info!(target: "opvisor::events", "failed launch={launch} op={op:?} err={reason:?}");
            }
            EventKind::TimeoutHit => {
                tracing::info!(target: "opvisor::events", "timeout launch={launch} op={op:?} timeout_ms={}", opt(e.timeout_ms));
            }
            EventKind::CancelRequested => {
                tracing::info!(target: "opvisor::events", "cancel-requested launch={launch} tag={:?}", e.tag);
            }
            EventKind::LaunchCancelled => {
                tracing::debug!(target: "opvisor::events", "cancelled launch={launch} op={op:?}");
            }
            EventKind::ResultDiscarded => {
                tracing::info!(target: "opvisor::events", "discarded launch={launch} op={op:?} outcome={reason:?}");
            }
            EventKind::DeliveryDropped => {
                tracing::warn!(target: "opvisor::events", "delivery-dropped launch={launch} listener={} reason={reason:?}", opt(e.listener));
            }
            EventKind::LaunchRemoved => {
                tracing::trace!(target: "opvisor::events", "removed launch={launch}");
            }
            EventKind::ListenerAttached => {
                tracing::debug!(target: "opvisor::events", "listener-attached listener={} name={reason:?}", opt(e.listener));
            }
            EventKind::ListenerDetached => {
                tracing::debug!(target: "opvisor::events", "listener-detached listener={}", opt(e.listener));
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "opvisor::events", "subscriber-overflow {reason}");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "opvisor::events", "subscriber-panicked {reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
