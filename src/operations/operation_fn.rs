//! # Function-backed operation (`OperationFn`)
//!
//! [`OperationFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`. The output
//! type is inferred from the future, so no trait impl is needed for one-off work.
//!
//! ## Example
//! ```rust
//! use opvisor::{Operation, OperationError, OperationFn};
//! use tokio_util::sync::CancellationToken;
//!
//! let op = OperationFn::new("fetch-profile", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(OperationError::Canceled);
//!     }
//!     Ok::<_, OperationError>(String::from("alice"))
//! });
//!
//! assert_eq!(op.name(), "fetch-profile");
//! ```

use std::borrow::Cow;
use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::OperationError;
use crate::operations::Operation;

/// Function-backed operation.
#[derive(Debug)]
pub struct OperationFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> OperationFn<F> {
    /// Creates a new function-backed operation.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut, T> Operation for OperationFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<T, OperationError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_output_is_returned() {
        let op = OperationFn::new("double", |_ctx: CancellationToken| async move {
            Ok::<_, OperationError>(21 * 2)
        });
        assert_eq!(op.run(CancellationToken::new()).await, Ok(42));
    }

    #[tokio::test]
    async fn test_closure_sees_token() {
        let op = OperationFn::new("check", |ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                Err(OperationError::Canceled)
            } else {
                Ok(())
            }
        });
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(op.run(token).await, Err(OperationError::Canceled));
    }
}
