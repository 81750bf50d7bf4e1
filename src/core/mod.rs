//! Engine core: bookkeeping, execution and delivery.
//!
//! The public API from this module is [`Engine`] (facade), [`Client`]
//! (submitter handle) and the launch vocabulary types.
//!
//! Internal modules:
//! - [`registry`]: launch records by id and live launches by tag;
//! - [`cancel`]: per-launch tokens and cancellation requests;
//! - [`executor`]: runs one launch body with timeout and panic isolation;
//! - [`router`]: own/broadcast fan-out and record purge;
//! - [`engine`], [`client`], [`builder`]: facade and wiring.

mod builder;
mod cancel;
mod client;
mod config;
mod engine;
mod executor;
mod launch;
mod registry;
mod router;

pub use builder::EngineBuilder;
pub use client::Client;
pub use config::EngineConfig;
pub use engine::Engine;
pub use launch::{DeliveryMode, LaunchId, LaunchRef, LaunchState};
pub use registry::LaunchInfo;

pub(crate) use executor::panic_message;
