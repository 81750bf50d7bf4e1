//! # Delivery router.
//!
//! Fans a finished launch's result out to its recipients, then purges the
//! launch record.
//!
//! ```text
//! LaunchRunner ── mark_terminal Ok ──► route(info, outcome)
//!                                        ├─► own:       deliver(submitter)
//!                                        ├─► broadcast: every other listener (Broadcast mode only)
//!                                        └─► purge(id)  → LaunchRemoved
//! LaunchRunner ── cancelled ─────────► discard(id) ──► purge(id)
//! ```
//!
//! ## Rules
//! - Called at most once per launch, and only for `Completed`/`Failed`.
//! - Recipients are enumerated at delivery time; unreachable ones are skipped
//!   and reported as `DeliveryDropped`.

use std::sync::Arc;

use crate::core::launch::{DeliveryMode, LaunchId};
use crate::core::registry::{LaunchInfo, LaunchRegistry};
use crate::error::OperationError;
use crate::events::{Bus, Event, EventKind};
use crate::listeners::{Delivery, DeliveryChannel, Envelope, ListenerId, ListenerRegistry};

/// Routes results to the own and broadcast channels.
pub struct DeliveryRouter {
    registry: Arc<LaunchRegistry>,
    listeners: Arc<ListenerRegistry>,
    bus: Bus,
}

impl DeliveryRouter {
    /// Creates a router over the given registries.
    pub fn new(registry: Arc<LaunchRegistry>, listeners: Arc<ListenerRegistry>, bus: Bus) -> Self {
        Self {
            registry,
            listeners,
            bus,
        }
    }

    /// Delivers the outcome of a terminal launch and purges its record.
    pub(crate) fn route<T: Send + Sync + 'static>(
        &self,
        info: &LaunchInfo,
        outcome: Result<T, OperationError>,
    ) {
        let delivery = Arc::new(Delivery {
            id: info.id,
            tag: info.tag.clone(),
            operation: Arc::clone(&info.operation),
            outcome,
        });
        let own = Envelope::new(DeliveryChannel::Own, delivery);

        if let Err(reason) = self.listeners.deliver(info.submitter, own.clone()) {
            self.dropped(info.id, info.submitter, reason);
        }

        if info.mode == DeliveryMode::Broadcast {
            let env = own.on(DeliveryChannel::Broadcast);
            for (listener, reason) in self.listeners.broadcast(info.submitter, &env) {
                self.dropped(info.id, listener, reason);
            }
        }

        self.purge(info.id);
    }

    /// Skips delivery for a launch whose result must not be seen, then purges it.
    pub(crate) fn discard(&self, id: LaunchId) {
        self.purge(id);
    }

    fn dropped(&self, id: LaunchId, listener: ListenerId, reason: &'static str) {
        tracing::debug!(launch = %id, listener = %listener, reason, "delivery dropped");
        self.bus
            .publish(Event::delivery_dropped(id, listener, reason));
    }

    fn purge(&self, id: LaunchId) {
        if let Some(info) = self.registry.remove(id) {
            self.bus.publish(
                Event::new(EventKind::LaunchRemoved)
                    .with_launch(id)
                    .with_tag_opt(info.tag.as_ref())
                    .with_operation(info.operation),
            );
        }
    }
}
