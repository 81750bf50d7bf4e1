//! # Engine: the public facade.
//!
//! [`Engine`] composes the launch registry, cancellation controller, executor and
//! delivery router. Submissions go through a [`Client`], which is the submitter
//! identity own-channel results are routed back to.
//!
//! ```text
//! Client::run_operation*(op)
//!   └─► Engine::launch
//!         ├─► LaunchRegistry::register ── Joined(id) ──► return id (nothing runs)
//!         └─► Admitted{id, token} ──► Executor::submit ──► return id
//!
//! Engine::cancel_operation(id|tag)
//!   └─► resolve id ──► CancellationController::signal(id)
//!
//! Engine::is_operation_running(id|tag)
//!   └─► LaunchRegistry lookup (Pending | Running)
//! ```
//!
//! Every facade call is synchronous and returns after one short critical
//! section; operation bodies run on the engine's tokio runtime.
//!
//! ## Example
//! ```rust
//! use opvisor::{Delivery, Engine, EngineConfig, OperationError, OperationFn};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let engine = Engine::new(EngineConfig::default());
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     let tx = std::sync::Mutex::new(Some(tx));
//!
//!     let client = engine.attach("screen");
//!     client.on_result(move |d: &Delivery<u32>| {
//!         if let Some(tx) = tx.lock().unwrap().take() {
//!             let _ = tx.send(d.value().copied());
//!         }
//!     });
//!
//!     let id = client.run_operation_with_tag(
//!         OperationFn::new("answer", |_ctx: CancellationToken| async move {
//!             Ok::<_, OperationError>(42u32)
//!         }),
//!         "answer",
//!     );
//!
//!     assert_eq!(rx.await.unwrap(), Some(42));
//!     assert!(!engine.is_operation_running(id));
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{
    builder::EngineBuilder,
    cancel::CancellationController,
    client::Client,
    config::EngineConfig,
    executor::Executor,
    launch::{LaunchId, LaunchRef, LaunchState},
    registry::{Admission, LaunchInfo, LaunchRegistry, LaunchRequest},
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    listeners::{Handlers, ListenerId, ListenerRegistry},
    operations::{LaunchOptions, Operation},
};

struct Inner {
    cfg: EngineConfig,
    bus: Bus,
    registry: Arc<LaunchRegistry>,
    listeners: Arc<ListenerRegistry>,
    cancel: CancellationController,
    executor: Executor,
    runtime_token: CancellationToken,
    _forwarder: Option<DropGuard>,
}

/// Background operation engine. Cheap to clone; clones share one engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Creates a builder for advanced configuration (subscribers, runtime).
    pub fn builder(cfg: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    /// Creates an engine on the current tokio runtime with no subscribers.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new(cfg: EngineConfig) -> Self {
        Self::builder(cfg).build()
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn from_parts(
        cfg: EngineConfig,
        bus: Bus,
        registry: Arc<LaunchRegistry>,
        listeners: Arc<ListenerRegistry>,
        cancel: CancellationController,
        executor: Executor,
        runtime_token: CancellationToken,
        forwarder: Option<DropGuard>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                bus,
                registry,
                listeners,
                cancel,
                executor,
                runtime_token,
                _forwarder: forwarder,
            }),
        }
    }

    /// Attaches a new listener and returns its client handle.
    ///
    /// The client receives own-channel results of its submissions and
    /// broadcast-channel results of other clients' broadcast launches.
    pub fn attach(&self, name: impl Into<Arc<str>>) -> Client {
        let handlers = Handlers::new();
        let id = self
            .inner
            .listeners
            .attach(name.into(), Arc::clone(&handlers));
        Client::new(self.clone(), id, handlers)
    }

    /// Admits and starts a launch, or returns the live launch holding its tag.
    pub(crate) fn launch<O: Operation>(
        &self,
        submitter: ListenerId,
        op: O,
        opts: LaunchOptions,
    ) -> LaunchId {
        let (tag, mode, timeout) = opts.into_parts();
        let req = LaunchRequest {
            tag,
            operation: Arc::from(op.name()),
            mode,
            submitter,
        };
        let tag = req.tag.clone();
        let operation = Arc::clone(&req.operation);

        match self.inner.registry.register(req, self.inner.cancel.issue()) {
            Admission::Admitted { id, token } => {
                tracing::debug!(launch = %id, operation = %operation, tag = ?tag, "launch registered");
                self.inner.bus.publish(
                    Event::new(EventKind::LaunchRegistered)
                        .with_launch(id)
                        .with_tag_opt(tag.as_ref())
                        .with_operation(operation)
                        .with_listener(submitter),
                );
                self.inner.executor.submit(id, op, token, timeout);
                id
            }
            Admission::Joined(id) => {
                tracing::debug!(launch = %id, operation = %operation, tag = ?tag, "tag already live; joined");
                self.inner.bus.publish(
                    Event::new(EventKind::LaunchJoined)
                        .with_launch(id)
                        .with_tag_opt(tag.as_ref())
                        .with_operation(operation)
                        .with_listener(submitter),
                );
                id
            }
        }
    }

    /// Requests cooperative cancellation of a live launch, by id or by tag.
    ///
    /// Returns `false` if no live launch matches (unknown, or already terminal).
    /// Once this returns `true` the launch never delivers, whether or not its
    /// body observes the token.
    pub fn cancel_operation(&self, launch: impl Into<LaunchRef>) -> bool {
        match self.resolve(launch.into()) {
            Some(id) => self.inner.cancel.signal(id),
            None => false,
        }
    }

    /// `true` iff the launch (by id, or the live launch holding the tag) is
    /// `Pending` or `Running`.
    pub fn is_operation_running(&self, launch: impl Into<LaunchRef>) -> bool {
        match launch.into() {
            LaunchRef::Id(id) => self.launch_state(id).is_some_and(LaunchState::is_live),
            LaunchRef::Tag(tag) => self.inner.registry.lookup_by_tag(&tag).is_some(),
        }
    }

    /// Current state of a launch whose record still exists.
    pub fn launch_state(&self, id: LaunchId) -> Option<LaunchState> {
        self.inner.registry.lookup(id).map(|info| info.state)
    }

    /// Snapshot of a launch record.
    pub fn launch_info(&self, id: LaunchId) -> Option<LaunchInfo> {
        self.inner.registry.lookup(id)
    }

    /// Sorted ids of live launches.
    pub fn live_launches(&self) -> Vec<LaunchId> {
        self.inner.registry.live()
    }

    /// Cancellation token bound to a launch, while its record exists.
    ///
    /// Lets callers tie their own work to a launch's lifetime.
    pub fn cancellation_token(&self, id: LaunchId) -> Option<CancellationToken> {
        self.inner.cancel.cancellation_token_for(id)
    }

    /// `true` when no launch record remains (every result routed or discarded).
    pub fn is_idle(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Number of launch runners still alive, including bodies of cancelled
    /// launches that have not returned yet.
    pub fn in_flight(&self) -> usize {
        self.inner.executor.in_flight()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Subscribes to engine events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.cfg
    }

    /// Cancels every live launch and waits up to `grace` for bodies to exit.
    ///
    /// Deliveries of the cancelled launches are suppressed. Submissions made
    /// after shutdown are registered but cancelled before their body starts.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.inner
            .bus
            .publish(Event::new(EventKind::ShutdownRequested));
        let cancelled = self.inner.cancel.signal_all();
        self.inner.runtime_token.cancel();
        tracing::debug!(cancelled, "engine shutdown requested");

        let grace = self.inner.cfg.grace;
        match time::timeout(grace, self.inner.executor.drain()).await {
            Ok(()) => {
                self.inner.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                self.inner.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.inner.registry.names();
                tracing::warn!(?grace, ?stuck, "shutdown grace exceeded");
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    pub(crate) fn detach(&self, id: ListenerId) -> bool {
        self.inner.listeners.detach(id)
    }

    pub(crate) fn is_attached(&self, id: ListenerId) -> bool {
        self.inner.listeners.contains(id)
    }

    fn resolve(&self, launch: LaunchRef) -> Option<LaunchId> {
        match launch {
            LaunchRef::Id(id) => Some(id),
            LaunchRef::Tag(tag) => self.inner.registry.lookup_by_tag(&tag).map(|info| info.id),
        }
    }
}
