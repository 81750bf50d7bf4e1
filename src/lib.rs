//! # opvisor
//!
//! **Opvisor** runs background operations on behalf of attached clients and
//! routes each result back to the client that asked for it, or to every
//! attached client.
//!
//! It keeps three promises:
//! - a launch with a tag runs at most once while a launch with that tag is live;
//! - once `cancel_operation` returns `true`, the launch never delivers a result,
//!   even if its body ignores the cancellation token;
//! - `is_operation_running` answers from one registry, in one critical section.
//!
//! ## Architecture
//! ```text
//!   Client A            Client B            Client C
//!   (submitter)         (listener)          (listener)
//!      │ run_operation*      ▲                   ▲
//!      ▼                     │ broadcast         │ broadcast
//! ┌──────────────────────────┴───────────────────┴────────────────┐
//! │  Engine (facade)                                              │
//! │  - LaunchRegistry        (ids, tags, states: one lock)        │
//! │  - CancellationController(tokens, cancel before signal)       │
//! │  - Executor              (runners, semaphore, timeout)        │
//! │  - DeliveryRouter        (own / broadcast fan-out, purge)     │
//! │  - ListenerRegistry      (per-client mailbox + worker)        │
//! └──────┬───────────────────────────────────────────────┬────────┘
//!        ▼                                               ▼
//!   LaunchRunner ──► op.run(token) ──► mark_terminal   Bus (events)
//!                                         │               │
//!                      Ok ──► route ◄─────┤               ▼
//!                      Err ─► discard ◄───┘        SubscriberSet
//!                                                  (per-sub queues)
//! ```
//!
//! ### Launch lifecycle
//! ```text
//! register ─► Pending ─► Running ─┬─► Completed ─► route ─► remove
//!    │           │          │     └─► Failed    ─► route ─► remove
//!    │           └──────────┴──► Cancelled ─► (body ends) ─► discard ─► remove
//!    └─► Joined (tag live: return existing id, nothing runs)
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                         |
//! |-----------------|----------------------------------------------------------|--------------------------------------------|
//! | **Engine**      | Submit, cancel, query and shut down launches.            | [`Engine`], [`EngineBuilder`], [`Client`]  |
//! | **Operations**  | Define work as trait impls or closures.                  | [`Operation`], [`OperationFn`]             |
//! | **Delivery**    | Typed results on own and broadcast channels.             | [`Delivery`], [`DeliveryChannel`]          |
//! | **Errors**      | Typed errors for operations and the runtime.             | [`OperationError`], [`RuntimeError`]       |
//! | **Events**      | Observe the engine through subscribers.                  | [`Subscribe`], [`Event`], [`EventKind`]    |
//! | **Config**      | Centralize engine settings.                              | [`EngineConfig`], [`LaunchOptions`]        |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use opvisor::{Delivery, Engine, EngineConfig, LaunchState, OperationError, OperationFn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Engine::new(EngineConfig::default());
//!     let client = engine.attach("screen");
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!     client.on_result(move |d: &Delivery<String>| {
//!         let _ = tx.send(d.value().cloned());
//!     });
//!
//!     let slow = OperationFn::new("slow", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, OperationError>(String::from("never delivered"))
//!     });
//!     let id = client.run_operation_with_tag(slow, "sync");
//!     assert!(engine.is_operation_running("sync"));
//!
//!     // Cancelled launches never deliver.
//!     assert!(engine.cancel_operation(id));
//!     assert!(!engine.cancel_operation(id));
//!     assert_eq!(engine.launch_state(id), Some(LaunchState::Cancelled));
//!
//!     let fast = OperationFn::new("fast", |_ctx: CancellationToken| async move {
//!         Ok::<_, OperationError>(String::from("done"))
//!     });
//!     client.run_operation_with_tag(fast, "sync");
//!     let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
//!     assert_eq!(got, Some(Some(String::from("done"))));
//!
//!     engine.shutdown().await.unwrap();
//! }
//! ```
mod core;
mod error;
mod events;
mod listeners;
mod operations;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Client, DeliveryMode, Engine, EngineBuilder, EngineConfig, LaunchId, LaunchInfo, LaunchRef,
    LaunchState,
};
pub use error::{OperationError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use listeners::{Delivery, DeliveryChannel, ListenerId};
pub use operations::{LaunchOptions, Operation, OperationFn};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in event logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
