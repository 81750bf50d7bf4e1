use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{
    cancel::CancellationController, config::EngineConfig, engine::Engine, executor::Executor,
    registry::LaunchRegistry, router::DeliveryRouter,
};
use crate::{
    events::Bus,
    listeners::ListenerRegistry,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`Engine`] with optional observers.
pub struct EngineBuilder {
    cfg: EngineConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    runtime: Option<Handle>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            runtime: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive engine events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runs operation bodies and listener workers on `runtime`.
    ///
    /// Defaults to the runtime `build()` is called from.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the engine.
    ///
    /// Wires the components in dependency order: bus → registries → cancellation
    /// controller → router → executor → subscriber forwarding. The forwarder stops
    /// when the last engine handle is dropped.
    ///
    /// # Panics
    /// Panics if no runtime was given and `build()` is called outside a tokio runtime.
    pub fn build(self) -> Engine {
        let runtime = self.runtime.unwrap_or_else(Handle::current);
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();

        let registry = LaunchRegistry::new();
        let listeners = ListenerRegistry::new(
            self.cfg.mailbox_capacity_clamped(),
            runtime.clone(),
            bus.clone(),
        );
        let cancel =
            CancellationController::new(Arc::clone(&registry), runtime_token.clone(), bus.clone());
        let router = Arc::new(DeliveryRouter::new(
            Arc::clone(&registry),
            Arc::clone(&listeners),
            bus.clone(),
        ));
        let semaphore = self
            .cfg
            .concurrency_limit()
            .map(Semaphore::new)
            .map(Arc::new);
        let executor = Executor::new(
            runtime.clone(),
            semaphore,
            self.cfg.default_timeout(),
            Arc::clone(&registry),
            router,
            bus.clone(),
        );

        let forwarder = (!self.subscribers.is_empty()).then(|| {
            let stop = CancellationToken::new();
            let _enter = runtime.enter();
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            runtime.spawn(subs.forward(bus.subscribe(), stop.clone()));
            stop.drop_guard()
        });

        Engine::from_parts(
            self.cfg,
            bus,
            registry,
            listeners,
            cancel,
            executor,
            runtime_token,
            forwarder,
        )
    }
}
