//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to subscribers without blocking the
//! publisher. The engine drives it from a forwarder task reading the bus.
//!
//! ## Architecture
//! ```text
//! Bus ──► forward(rx, stop)
//!            │ emit_arc(event)
//!            ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!            │    (bounded)         └──────► panic → SubscriberPanicked
//!            └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - No cross-subscriber ordering; per-subscriber FIFO.
//! - Overflow drops the event for that subscriber only and publishes `SubscriberOverflow`.
//! - `emit_arc()` returns immediately (uses `try_send`).
//! - Bus lag is reported as an overflow for every subscriber.
//!
//! `AssertUnwindSafe` is used around `on_event`; a subscriber that panics while
//! holding a lock may leave its own state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::core::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called within a tokio runtime context.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_message(panic.as_ref());
                        tracing::warn!(subscriber = name, %info, "subscriber panicked");
                        bus_for_worker.publish(Event::subscriber_panicked(name, info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Emits an event to all subscribers (clones the event).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a shared event to all subscribers.
    ///
    /// Overflow events are not re-published when they themselves overflow.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Forwards bus events until `stop` fires, then drains what is already
    /// buffered and shuts the workers down.
    pub async fn forward(self, mut rx: broadcast::Receiver<Event>, stop: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => self.emit_arc(Arc::new(ev)),
                    Err(RecvError::Lagged(skipped)) => self.report_lag(skipped),
                    Err(RecvError::Closed) => break,
                },
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => self.emit_arc(Arc::new(ev)),
                Err(TryRecvError::Lagged(skipped)) => self.report_lag(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        self.shutdown().await;
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops the queues, then awaits every worker.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    fn report_lag(&self, skipped: u64) {
        tracing::warn!(skipped, "subscriber forwarder lagged behind the bus");
        for channel in &self.channels {
            self.bus
                .publish(Event::subscriber_overflow(channel.name, "lagged"));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(
            vec![Arc::new(Recorder {
                seen: Arc::clone(&seen),
            })],
            Bus::new(16),
        );

        set.emit(&Event::new(EventKind::LaunchStarted));
        set.emit(&Event::new(EventKind::LaunchCompleted));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::LaunchStarted, EventKind::LaunchCompleted]
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicker)], bus.clone());

        set.emit(&Event::new(EventKind::LaunchStarted));
        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("panic event in time")
            .expect("bus open");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_forward_drains_buffered_events_on_stop() {
        let bus = Bus::new(16);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(
            vec![Arc::new(Recorder {
                seen: Arc::clone(&seen),
            })],
            bus.clone(),
        );
        let rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ShutdownRequested));
        bus.publish(Event::new(EventKind::AllStoppedWithin));

        let stop = CancellationToken::new();
        stop.cancel();
        set.forward(rx, stop).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::ShutdownRequested, EventKind::AllStoppedWithin]
        );
    }
}
