//! # Per-listener handler table.
//!
//! Maps `(channel, result type)` to a callback. Registration is generic, so the
//! type match happens at compile time on the listener side; dispatch only
//! compares `TypeId`s and downcasts the shared payload.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::delivery::{Delivery, DeliveryChannel, Envelope};

type ErasedHandler = Arc<dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync>;

/// Result of dispatching one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Handled,
    NoHandler,
    Detached,
}

/// Callbacks registered by one listener.
#[derive(Default)]
pub(crate) struct Handlers {
    table: RwLock<HashMap<(DeliveryChannel, TypeId), ErasedHandler>>,
    detached: AtomicBool,
}

impl Handlers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers (or replaces) the handler for `T` on `channel`.
    pub fn insert<T, F>(&self, channel: DeliveryChannel, f: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Delivery<T>) + Send + Sync + 'static,
    {
        let erased: ErasedHandler = Arc::new(move |payload: &(dyn Any + Send + Sync)| {
            if let Some(delivery) = payload.downcast_ref::<Delivery<T>>() {
                f(delivery);
            }
        });
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((channel, TypeId::of::<T>()), erased);
    }

    /// Invokes the matching handler, outside the table lock.
    pub fn dispatch(&self, env: &Envelope) -> Dispatch {
        if self.is_detached() {
            return Dispatch::Detached;
        }
        let handler = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(env.channel, env.result_type))
            .cloned();
        match handler {
            Some(h) => {
                h(env.payload.as_ref());
                Dispatch::Handled
            }
            None => Dispatch::NoHandler,
        }
    }

    /// Stops dispatch immediately, including envelopes already queued.
    pub fn mark_detached(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LaunchId;
    use std::sync::Mutex;

    fn envelope<T: Send + Sync + 'static>(channel: DeliveryChannel, value: T) -> Envelope {
        Envelope::new(
            channel,
            Arc::new(Delivery {
                id: LaunchId::new(1),
                tag: None,
                operation: Arc::from("op"),
                outcome: Ok(value),
            }),
        )
    }

    #[test]
    fn test_dispatch_matches_type_and_channel() {
        let handlers = Handlers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        handlers.insert(DeliveryChannel::Own, move |d: &Delivery<u32>| {
            sink.lock().unwrap().push(*d.value().unwrap());
        });

        assert_eq!(handlers.dispatch(&envelope(DeliveryChannel::Own, 7u32)), Dispatch::Handled);
        assert_eq!(
            handlers.dispatch(&envelope(DeliveryChannel::Broadcast, 8u32)),
            Dispatch::NoHandler
        );
        assert_eq!(
            handlers.dispatch(&envelope(DeliveryChannel::Own, "text")),
            Dispatch::NoHandler
        );
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_detached_skips_dispatch() {
        let handlers = Handlers::new();
        handlers.insert(DeliveryChannel::Own, |_d: &Delivery<u32>| panic!("must not run"));
        handlers.mark_detached();
        assert_eq!(handlers.dispatch(&envelope(DeliveryChannel::Own, 1u32)), Dispatch::Detached);
    }
}
