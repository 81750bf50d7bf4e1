//! Engine events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Engine`, `LaunchRegistry` callers, `CancellationController`,
//!   `LaunchRunner`, `DeliveryRouter`, `ListenerRegistry`, `SubscriberSet` workers.
//! - **Consumers**: the engine's forwarder (fans out to `SubscriberSet`) and any
//!   receiver obtained from [`Engine::events`](crate::Engine::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
