//! # Executor: runs operation bodies off the caller's thread.
//!
//! [`Executor::submit`] spawns one [`LaunchRunner`] per admitted launch on the
//! engine runtime and tracks it for shutdown.
//!
//! ## Runner flow
//! ```text
//! LaunchRunner::run()
//!   ├─► acquire semaphore (optional, cancellable)        yield point
//!   ├─► token cancelled? ─► discard                       yield point
//!   ├─► mark_running()  (Pending → Running) or discard
//!   ├─► publish LaunchStarted
//!   ├─► execute(): op.run(child) [+ timeout] [+ catch_unwind]
//!   │       ├─ Ok(v)   ─► Outcome::Completed
//!   │       ├─ Err(e)  ─► Outcome::Failed
//!   │       ├─ timeout ─► cancel child, TimeoutHit, Failed(Timeout)
//!   │       └─ panic   ─► Failed(Panicked)
//!   ├─► token cancelled? ─► registry.cancel()
//!   └─► mark_terminal(outcome)
//!           ├─ Ok   ─► LaunchCompleted/LaunchFailed ─► router.route()
//!           └─ Err  ─► ResultDiscarded + LaunchCancelled ─► router.discard()
//! ```
//!
//! ## Rules
//! - The body is never aborted on cancellation; only the timeout drops it.
//! - A cancellation recorded before `mark_terminal` always wins.
//! - Each launch finishes with exactly one of `route` or `discard`.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::launch::{LaunchId, Outcome};
use crate::core::registry::LaunchRegistry;
use crate::core::router::DeliveryRouter;
use crate::error::OperationError;
use crate::events::{Bus, Event, EventKind};
use crate::operations::Operation;

/// Spawns and tracks launch runners.
pub struct Executor {
    runtime: Handle,
    tracker: TaskTracker,
    semaphore: Option<Arc<Semaphore>>,
    default_timeout: Option<Duration>,
    registry: Arc<LaunchRegistry>,
    router: Arc<DeliveryRouter>,
    bus: Bus,
}

impl Executor {
    /// Creates an executor spawning onto `runtime`.
    pub fn new(
        runtime: Handle,
        semaphore: Option<Arc<Semaphore>>,
        default_timeout: Option<Duration>,
        registry: Arc<LaunchRegistry>,
        router: Arc<DeliveryRouter>,
        bus: Bus,
    ) -> Self {
        Self {
            runtime,
            tracker: TaskTracker::new(),
            semaphore,
            default_timeout,
            registry,
            router,
            bus,
        }
    }

    /// Starts the body of an admitted launch. Returns immediately.
    ///
    /// `timeout` overrides the engine default; `Some(Duration::ZERO)` disables it.
    pub(crate) fn submit<O: Operation>(
        &self,
        id: LaunchId,
        op: O,
        token: CancellationToken,
        timeout: Option<Duration>,
    ) {
        let timeout = match timeout {
            Some(d) if d.is_zero() => None,
            Some(d) => Some(d),
            None => self.default_timeout,
        };
        let runner = LaunchRunner {
            id,
            name: Arc::from(op.name()),
            op,
            token,
            timeout,
            semaphore: self.semaphore.clone(),
            registry: Arc::clone(&self.registry),
            router: Arc::clone(&self.router),
            bus: self.bus.clone(),
        };
        self.tracker.spawn_on(runner.run(), &self.runtime);
    }

    /// Number of runners still alive.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every runner spawned so far has exited.
    pub(crate) async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// Drives one launch from `Pending` to its removal.
struct LaunchRunner<O: Operation> {
    id: LaunchId,
    name: Arc<str>,
    op: O,
    token: CancellationToken,
    timeout: Option<Duration>,
    semaphore: Option<Arc<Semaphore>>,
    registry: Arc<LaunchRegistry>,
    router: Arc<DeliveryRouter>,
    bus: Bus,
}

impl<O: Operation> LaunchRunner<O> {
    async fn run(self) {
        let _permit = match &self.semaphore {
            Some(sem) => {
                let permit = sem.clone().acquire_owned();
                tokio::pin!(permit);
                select! {
                    res = &mut permit => match res {
                        Ok(p) => Some(p),
                        Err(_closed) => return self.abandon(),
                    },
                    _ = self.token.cancelled() => return self.abandon(),
                }
            }
            None => None,
        };

        if self.token.is_cancelled() || !self.registry.mark_running(self.id) {
            return self.abandon();
        }
        tracing::debug!(launch = %self.id, operation = %self.name, "launch started");
        self.publish(EventKind::LaunchStarted);

        let result = self.execute().await;
        self.finish(result);
    }

    /// Runs the body once with timeout and panic isolation.
    async fn execute(&self) -> Result<O::Output, OperationError> {
        let child = self.token.child_token();
        let body = std::panic::AssertUnwindSafe(self.op.run(child.clone())).catch_unwind();

        let res = match self.timeout {
            Some(dur) => match time::timeout(dur, body).await {
                Ok(r) => r,
                Err(_elapsed) => {
                    child.cancel();
                    self.bus.publish(
                        Event::new(EventKind::TimeoutHit)
                            .with_launch(self.id)
                            .with_operation(Arc::clone(&self.name))
                            .with_timeout(dur),
                    );
                    Ok(Err(OperationError::Timeout { timeout: dur }))
                }
            },
            None => body.await,
        };

        res.unwrap_or_else(|panic| {
            Err(OperationError::Panicked {
                info: panic_message(panic.as_ref()),
            })
        })
    }

    /// Records the natural outcome and routes it, unless cancellation won.
    fn finish(self, result: Result<O::Output, OperationError>) {
        let outcome = match &result {
            Ok(_) => Outcome::Completed,
            Err(_) => Outcome::Failed,
        };

        // The token also fires through the engine token on shutdown; either way
        // cancellation must win over the natural outcome.
        if self.token.is_cancelled() {
            self.registry.cancel(self.id);
        }

        match self.registry.mark_terminal(self.id, outcome) {
            Ok(info) => {
                match &result {
                    Ok(_) => {
                        tracing::debug!(launch = %self.id, operation = %self.name, "launch completed");
                        self.publish(EventKind::LaunchCompleted);
                    }
                    Err(e) => {
                        tracing::debug!(launch = %self.id, operation = %self.name, error = %e, "launch failed");
                        self.bus.publish(
                            Event::new(EventKind::LaunchFailed)
                                .with_launch(self.id)
                                .with_tag_opt(info.tag.as_ref())
                                .with_operation(Arc::clone(&self.name))
                                .with_reason(e.to_string()),
                        );
                    }
                }
                self.router.route(&info, result);
            }
            Err(state) => {
                let label = match &result {
                    Ok(_) => "completed",
                    Err(e) => e.as_label(),
                };
                tracing::debug!(
                    launch = %self.id,
                    operation = %self.name,
                    state = state.map(|s| s.as_label()).unwrap_or("unknown"),
                    outcome = label,
                    "result discarded after cancellation"
                );
                self.bus.publish(
                    Event::new(EventKind::ResultDiscarded)
                        .with_launch(self.id)
                        .with_operation(Arc::clone(&self.name))
                        .with_reason(label),
                );
                self.publish(EventKind::LaunchCancelled);
                self.router.discard(self.id);
            }
        }
    }

    /// Ends a launch that never started its body.
    fn abandon(&self) {
        self.registry.cancel(self.id);
        tracing::debug!(launch = %self.id, operation = %self.name, "launch cancelled before start");
        self.publish(EventKind::LaunchCancelled);
        self.router.discard(self.id);
    }

    fn publish(&self, kind: EventKind) {
        self.bus.publish(
            Event::new(kind)
                .with_launch(self.id)
                .with_operation(Arc::clone(&self.name)),
        );
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }
}
