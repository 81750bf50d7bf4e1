//! # Result recipients.
//!
//! Listeners are the boundary between the engine and whatever consumes results.
//! The engine only sees [`ListenerId`]s and mailboxes; the typed handler table
//! lives on the listener side, registered through
//! [`Client::on_result`](crate::Client::on_result) and
//! [`Client::on_broadcast`](crate::Client::on_broadcast).
//!
//! ```text
//!   Client (attach) ──► ListenerRegistry ──► mailbox + worker
//!   Client (drop)   ──► ListenerRegistry::detach (immediate)
//! ```

mod delivery;
mod handlers;
mod registry;

pub use delivery::{Delivery, DeliveryChannel};
pub use registry::ListenerId;

pub(crate) use delivery::Envelope;
pub(crate) use handlers::Handlers;
pub(crate) use registry::ListenerRegistry;
