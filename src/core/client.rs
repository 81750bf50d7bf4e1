//! # Client: a submitter attached to the engine.
//!
//! A [`Client`] is both a submission handle and a listener. Results of its own
//! launches arrive on its own channel; results of other clients' broadcast
//! launches arrive on its broadcast channel. Dropping the client detaches it,
//! after which pending deliveries for it are discarded.

use std::fmt;
use std::sync::Arc;

use super::{
    engine::Engine,
    launch::{LaunchId, LaunchRef},
};
use crate::{
    listeners::{Delivery, DeliveryChannel, Handlers, ListenerId},
    operations::{LaunchOptions, Operation},
};

/// Submitter and listener handle returned by [`Engine::attach`].
pub struct Client {
    engine: Engine,
    id: ListenerId,
    handlers: Arc<Handlers>,
}

impl Client {
    pub(super) fn new(engine: Engine, id: ListenerId, handlers: Arc<Handlers>) -> Self {
        Self {
            engine,
            id,
            handlers,
        }
    }

    /// Listener id of this client.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Engine this client is attached to.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// `false` once the client has been detached.
    pub fn is_attached(&self) -> bool {
        self.engine.is_attached(self.id)
    }

    /// Registers the own-channel handler for results of type `T`.
    ///
    /// Replaces any previous handler for `T`. Results of a type with no handler
    /// are dropped for this client.
    pub fn on_result<T, F>(&self, f: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Delivery<T>) + Send + Sync + 'static,
    {
        self.handlers.insert::<T, F>(DeliveryChannel::Own, f);
        self
    }

    /// Registers the broadcast-channel handler for results of type `T`.
    pub fn on_broadcast<T, F>(&self, f: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Delivery<T>) + Send + Sync + 'static,
    {
        self.handlers.insert::<T, F>(DeliveryChannel::Broadcast, f);
        self
    }

    /// Submits `op` with explicit options.
    pub fn launch<O: Operation>(&self, op: O, opts: LaunchOptions) -> LaunchId {
        self.engine.launch(self.id, op, opts)
    }

    /// Runs `op` in the background; the result comes back to this client only.
    pub fn run_operation<O: Operation>(&self, op: O) -> LaunchId {
        self.launch(op, LaunchOptions::new())
    }

    /// Like [`run_operation`](Self::run_operation), but while a launch with `tag`
    /// is live no new one starts and its id is returned instead.
    pub fn run_operation_with_tag<O: Operation>(
        &self,
        op: O,
        tag: impl Into<Arc<str>>,
    ) -> LaunchId {
        self.launch(op, LaunchOptions::new().with_tag(tag))
    }

    /// Runs `op` in the background; the result comes back to this client on its
    /// own channel and to every other attached client on its broadcast channel.
    pub fn run_operation_broadcast<O: Operation>(&self, op: O) -> LaunchId {
        self.launch(op, LaunchOptions::new().broadcast())
    }

    /// Broadcast run deduplicated by `tag`.
    pub fn run_operation_broadcast_with_tag<O: Operation>(
        &self,
        op: O,
        tag: impl Into<Arc<str>>,
    ) -> LaunchId {
        self.launch(op, LaunchOptions::new().with_tag(tag).broadcast())
    }

    /// See [`Engine::cancel_operation`].
    pub fn cancel_operation(&self, launch: impl Into<LaunchRef>) -> bool {
        self.engine.cancel_operation(launch)
    }

    /// See [`Engine::is_operation_running`].
    pub fn is_operation_running(&self, launch: impl Into<LaunchRef>) -> bool {
        self.engine.is_operation_running(launch)
    }

    /// Detaches now. Equivalent to dropping the client.
    pub fn detach(self) {}
}

impl Drop for Client {
    fn drop(&mut self) {
        self.engine.detach(self.id);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("id", &self.id).finish()
    }
}
