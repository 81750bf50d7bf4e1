//! # Listener registry: attached recipients and their mailboxes.
//!
//! Each attached listener owns a bounded mailbox and one worker task that
//! invokes its handlers in FIFO order.
//!
//! ```text
//! DeliveryRouter ──► deliver(submitter, env) ──► [mailbox L1] ─► worker L1 ─► Handlers::dispatch
//!                └─► broadcast(except, env) ──┬► [mailbox L2] ─► worker L2 ─► Handlers::dispatch
//!                                             └► [mailbox LN] ─► worker LN ─► Handlers::dispatch
//! ```
//!
//! ## Rules
//! - Enqueueing uses `try_send` under the registry read lock, so `detach` is
//!   linearized with delivery: after `detach` returns nothing new is enqueued.
//! - `detach` also flags the handler table, so envelopes already queued are
//!   skipped instead of dispatched.
//! - A full or closed mailbox drops the delivery for that recipient only.
//! - Handler panics are caught; the worker keeps serving the mailbox.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::delivery::Envelope;
use super::handlers::{Dispatch, Handlers};
use crate::core::panic_message;
use crate::events::{Bus, Event, EventKind};

/// Identifier of an attached listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Why a delivery did not reach a recipient.
pub(crate) const DROP_DETACHED: &str = "detached";
pub(crate) const DROP_FULL: &str = "mailbox_full";
pub(crate) const DROP_NO_HANDLER: &str = "no_handler";
pub(crate) const DROP_PANICKED: &str = "handler_panicked";

struct Mailbox {
    name: Arc<str>,
    tx: mpsc::Sender<Envelope>,
    handlers: Arc<Handlers>,
}

/// Registry of attached listeners.
pub struct ListenerRegistry {
    next_id: AtomicU64,
    mailboxes: RwLock<HashMap<ListenerId, Mailbox>>,
    capacity: usize,
    runtime: Handle,
    bus: Bus,
}

impl ListenerRegistry {
    /// Creates an empty registry whose mailbox workers run on `runtime`.
    pub fn new(capacity: usize, runtime: Handle, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            mailboxes: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            runtime,
            bus,
        })
    }

    /// Attaches a listener and spawns its mailbox worker.
    pub(crate) fn attach(&self, name: Arc<str>, handlers: Arc<Handlers>) -> ListenerId {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel::<Envelope>(self.capacity);

        self.runtime.spawn(mailbox_worker(
            id,
            Arc::clone(&name),
            rx,
            Arc::clone(&handlers),
            self.bus.clone(),
        ));
        self.write().insert(
            id,
            Mailbox {
                name: Arc::clone(&name),
                tx,
                handlers,
            },
        );

        tracing::debug!(listener = %id, name = %name, "listener attached");
        self.bus
            .publish(Event::new(EventKind::ListenerAttached).with_listener(id).with_reason(name));
        id
    }

    /// Detaches a listener. Returns `false` if it was not attached.
    pub(crate) fn detach(&self, id: ListenerId) -> bool {
        let Some(mailbox) = self.write().remove(&id) else {
            return false;
        };
        mailbox.handlers.mark_detached();

        tracing::debug!(listener = %id, name = %mailbox.name, "listener detached");
        self.bus
            .publish(Event::new(EventKind::ListenerDetached).with_listener(id));
        true
    }

    /// Enqueues `env` for one listener.
    pub(crate) fn deliver(&self, to: ListenerId, env: Envelope) -> Result<(), &'static str> {
        let mailboxes = self.read();
        let Some(mailbox) = mailboxes.get(&to) else {
            return Err(DROP_DETACHED);
        };
        enqueue(mailbox, env)
    }

    /// Enqueues `env` for every attached listener except `except`.
    ///
    /// Returns the recipients the envelope could not reach.
    pub(crate) fn broadcast(
        &self,
        except: ListenerId,
        env: &Envelope,
    ) -> Vec<(ListenerId, &'static str)> {
        let mailboxes = self.read();
        mailboxes
            .iter()
            .filter(|(id, _)| **id != except)
            .filter_map(|(id, mailbox)| enqueue(mailbox, env.clone()).err().map(|r| (*id, r)))
            .collect()
    }

    /// True if the listener is attached.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of attached listeners.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no listener is attached.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ListenerId, Mailbox>> {
        self.mailboxes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ListenerId, Mailbox>> {
        self.mailboxes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn enqueue(mailbox: &Mailbox, env: Envelope) -> Result<(), &'static str> {
    match mailbox.tx.try_send(env) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(_)) => Err(DROP_FULL),
        Err(mpsc::error::TrySendError::Closed(_)) => Err(DROP_DETACHED),
    }
}

/// Serves one mailbox until its sender is dropped.
async fn mailbox_worker(
    id: ListenerId,
    name: Arc<str>,
    mut rx: mpsc::Receiver<Envelope>,
    handlers: Arc<Handlers>,
    bus: Bus,
) {
    while let Some(env) = rx.recv().await {
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handlers.dispatch(&env)));
        let reason = match res {
            Ok(Dispatch::Handled) => continue,
            Ok(Dispatch::Detached) => DROP_DETACHED,
            Ok(Dispatch::NoHandler) => DROP_NO_HANDLER,
            Err(panic) => {
                tracing::warn!(
                    listener = %id,
                    name = %name,
                    launch = %env.launch,
                    info = %panic_message(panic.as_ref()),
                    "listener handler panicked"
                );
                DROP_PANICKED
            }
        };
        tracing::debug!(
            listener = %id,
            launch = %env.launch,
            channel = env.channel.as_label(),
            reason,
            "delivery dropped"
        );
        bus.publish(Event::delivery_dropped(env.launch, id, reason));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::unbounded_channel;

    use super::*;
    use crate::core::LaunchId;
    use crate::listeners::{Delivery, DeliveryChannel};

    fn envelope(channel: DeliveryChannel, id: u64, value: u32) -> Envelope {
        Envelope::new(
            channel,
            Arc::new(Delivery {
                id: LaunchId::new(id),
                tag: None,
                operation: Arc::from("op"),
                outcome: Ok(value),
            }),
        )
    }

    #[tokio::test]
    async fn test_deliver_dispatches_in_order() {
        let reg = ListenerRegistry::new(8, Handle::current(), Bus::new(16));
        let (tx, mut rx) = unbounded_channel();
        let handlers = Handlers::new();
        handlers.insert(DeliveryChannel::Own, move |d: &Delivery<u32>| {
            let _ = tx.send(*d.value().unwrap());
        });
        let id = reg.attach(Arc::from("screen"), handlers);

        reg.deliver(id, envelope(DeliveryChannel::Own, 1, 10)).unwrap();
        reg.deliver(id, envelope(DeliveryChannel::Own, 2, 20)).unwrap();

        assert_eq!(rx.recv().await, Some(10));
        assert_eq!(rx.recv().await, Some(20));
    }

    #[tokio::test]
    async fn test_broadcast_skips_submitter() {
        let reg = ListenerRegistry::new(8, Handle::current(), Bus::new(16));
        let (tx, mut rx) = unbounded_channel();

        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let tx = tx.clone();
            let handlers = Handlers::new();
            handlers.insert(DeliveryChannel::Broadcast, move |_d: &Delivery<u32>| {
                let _ = tx.send(name);
            });
            ids.push(reg.attach(Arc::from(name), handlers));
        }
        drop(tx);

        let env = envelope(DeliveryChannel::Broadcast, 1, 7);
        assert!(reg.broadcast(ids[0], &env).is_empty());

        let mut got = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        got.sort_unstable();
        assert_eq!(got, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_detach_stops_delivery() {
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let reg = ListenerRegistry::new(8, Handle::current(), bus);
        let id = reg.attach(Arc::from("gone"), Handlers::new());
        assert!(reg.contains(id));

        assert!(reg.detach(id));
        assert!(!reg.detach(id));
        assert!(reg.is_empty());
        assert_eq!(
            reg.deliver(id, envelope(DeliveryChannel::Own, 1, 1)),
            Err(DROP_DETACHED)
        );

        let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::ListenerAttached, EventKind::ListenerDetached]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_mailbox_drops() {
        let reg = ListenerRegistry::new(1, Handle::current(), Bus::new(16));
        let id = reg.attach(Arc::from("slow"), Handlers::new());

        // The worker cannot run before this task yields.
        reg.deliver(id, envelope(DeliveryChannel::Own, 1, 1)).unwrap();
        assert_eq!(
            reg.deliver(id, envelope(DeliveryChannel::Own, 2, 2)),
            Err(DROP_FULL)
        );
    }

    #[tokio::test]
    async fn test_missing_handler_reports_drop() {
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let reg = ListenerRegistry::new(8, Handle::current(), bus);
        let id = reg.attach(Arc::from("picky"), Handlers::new());
        reg.deliver(id, envelope(DeliveryChannel::Own, 3, 1)).unwrap();

        let dropped = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let ev = events.recv().await.unwrap();
                if ev.kind == EventKind::DeliveryDropped {
                    return ev;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(dropped.launch, Some(LaunchId::new(3)));
        assert_eq!(dropped.reason.as_deref(), Some(DROP_NO_HANDLER));
    }
}
