//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for events published on the engine bus.
//!
//! ```text
//! Bus ──► forwarder task ──► SubscriberSet ──┬──► LogWriter (feature "logging")
//!                                            ├──► Metrics
//!                                            └──► Custom ...
//! ```
//!
//! Subscribers are passed to [`EngineBuilder::with_subscribers`](crate::EngineBuilder::with_subscribers).

#[cfg(feature = "logging")]
mod embedded;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
