//! # Operation abstraction.
//!
//! An [`Operation`] is an opaque unit of work with a statically declared
//! [`Output`](Operation::Output) type. The engine owns it for the duration of one
//! launch and hands the body a [`CancellationToken`] to observe.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::OperationError;

/// # Asynchronous, cancelable unit of work producing a typed result.
///
/// The result type is declared statically so listeners can register handlers
/// for exactly that type (see [`Client::on_result`](crate::Client::on_result)).
///
/// Cancellation is cooperative: implementations should check `ctx` at
/// convenient points and return early (usually `Err(OperationError::Canceled)`).
/// An operation that ignores its token runs to completion, but a cancelled
/// launch never delivers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use opvisor::{Operation, OperationError};
/// use tokio_util::sync::CancellationToken;
///
/// struct CountUsers;
///
/// #[async_trait]
/// impl Operation for CountUsers {
///     type Output = usize;
///
///     fn name(&self) -> &str { "count-users" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<usize, OperationError> {
///         if ctx.is_cancelled() {
///             return Err(OperationError::Canceled);
///         }
///         Ok(42)
///     }
/// }
/// ```
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    /// Value delivered to listeners on success.
    type Output: Send + Sync + 'static;

    /// Returns a human-readable operation name for logs and events.
    ///
    /// The default uses `type_name::<Self>()`; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Executes the body once.
    async fn run(&self, ctx: CancellationToken) -> Result<Self::Output, OperationError>;
}
