//! # Typed deliveries.
//!
//! A finished launch produces one [`Delivery<T>`], shared behind an `Arc` by every
//! recipient. On its way through mailboxes it travels type-erased inside an
//! [`Envelope`], tagged with the `TypeId` of `T` so the recipient can pick the
//! handler registered for exactly that result type.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::core::LaunchId;
use crate::error::OperationError;

/// Channel a delivery arrives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryChannel {
    /// The submitter's private channel.
    Own,
    /// Every other attached listener, for broadcast launches.
    Broadcast,
}

impl DeliveryChannel {
    /// Short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            DeliveryChannel::Own => "own",
            DeliveryChannel::Broadcast => "broadcast",
        }
    }
}

/// Result of one launch as seen by a listener.
///
/// Recipients must be prepared for both outcomes: a failed launch is delivered
/// through the same channels as a successful one.
pub struct Delivery<T> {
    /// Launch that produced the result.
    pub id: LaunchId,
    /// Tag the launch was submitted with.
    pub tag: Option<Arc<str>>,
    /// Operation name.
    pub operation: Arc<str>,
    /// Value or failure.
    pub outcome: Result<T, OperationError>,
}

impl<T> Delivery<T> {
    /// The value, if the launch completed.
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The failure, if the launch failed.
    pub fn error(&self) -> Option<&OperationError> {
        self.outcome.as_ref().err()
    }

    /// `true` if the launch completed.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl<T: fmt::Debug> fmt::Debug for Delivery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("operation", &self.operation)
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// Type-erased delivery queued in a listener mailbox.
#[derive(Clone)]
pub(crate) struct Envelope {
    pub channel: DeliveryChannel,
    pub launch: LaunchId,
    pub result_type: TypeId,
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl Envelope {
    /// Wraps a shared delivery for the given channel.
    pub fn new<T: Send + Sync + 'static>(channel: DeliveryChannel, delivery: Arc<Delivery<T>>) -> Self {
        Self {
            channel,
            launch: delivery.id,
            result_type: TypeId::of::<T>(),
            payload: delivery,
        }
    }

    /// Same payload, different channel.
    pub fn on(&self, channel: DeliveryChannel) -> Self {
        Self {
            channel,
            ..self.clone()
        }
    }
}
