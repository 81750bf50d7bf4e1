//! # Cancellation controller.
//!
//! Issues one [`CancellationToken`] per launch (a child of the engine's runtime
//! token) and turns cancellation requests into registry transitions.
//!
//! ```text
//! Engine::cancel_operation(id|tag)
//!   └─► CancellationController::signal(id)
//!         ├─► LaunchRegistry::cancel(id)   Pending|Running → Cancelled (tag freed)
//!         ├─► token.cancel()               body may observe it
//!         └─► publish CancelRequested
//! ```
//!
//! ## Rules
//! - Cancellation is cooperative: the body keeps running until it checks its token.
//! - The registry transition happens before the token fires, so a natural outcome
//!   recorded afterwards always loses (delivery suppressed).
//! - `signal` returns `true` at most once per launch; later calls are no-ops.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::launch::LaunchId;
use crate::core::registry::LaunchRegistry;
use crate::events::{Bus, Event, EventKind};

/// Issues launch tokens and applies cancellation requests.
pub struct CancellationController {
    registry: Arc<LaunchRegistry>,
    runtime_token: CancellationToken,
    bus: Bus,
}

impl CancellationController {
    /// Creates a controller whose tokens are children of `runtime_token`.
    pub fn new(registry: Arc<LaunchRegistry>, runtime_token: CancellationToken, bus: Bus) -> Self {
        Self {
            registry,
            runtime_token,
            bus,
        }
    }

    /// Issues a fresh token for a launch about to be registered.
    pub(crate) fn issue(&self) -> CancellationToken {
        self.runtime_token.child_token()
    }

    /// Token bound to launch `id`, while its record exists.
    pub fn cancellation_token_for(&self, id: LaunchId) -> Option<CancellationToken> {
        self.registry.token(id)
    }

    /// Requests cooperative stop of launch `id`.
    ///
    /// Returns `false` if the launch is unknown or already terminal.
    pub fn signal(&self, id: LaunchId) -> bool {
        let Some((token, info)) = self.registry.cancel(id) else {
            return false;
        };
        token.cancel();

        tracing::debug!(launch = %id, operation = %info.operation, "cancellation requested");
        self.bus.publish(
            Event::new(EventKind::CancelRequested)
                .with_launch(id)
                .with_tag_opt(info.tag.as_ref())
                .with_operation(info.operation),
        );
        true
    }

    /// Signals every live launch. Returns how many were cancelled.
    pub(crate) fn signal_all(&self) -> usize {
        self.registry
            .live()
            .into_iter()
            .filter(|id| self.signal(*id))
            .count()
    }
}
