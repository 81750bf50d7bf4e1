//! # Launch identity and state.
//!
//! A launch is one submission of an operation. It is identified by a
//! [`LaunchId`], optionally carries a deduplication tag, and walks the state
//! machine below exactly once:
//!
//! ```text
//! Pending ──► Running ──► Completed
//!    │           ├──────► Failed
//!    └───────────┴──────► Cancelled
//! ```

use std::fmt;
use std::sync::Arc;

/// Process-unique identifier of a launch.
///
/// Ids are allocated from 1 upward by the registry and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaunchId(u64);

impl LaunchId {
    /// Wraps a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LaunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    /// Registered, body not started yet.
    Pending,
    /// Body is executing.
    Running,
    /// Body produced a value.
    Completed,
    /// Body failed, panicked or timed out.
    Failed,
    /// Cancellation was accepted before a natural outcome was recorded.
    Cancelled,
}

impl LaunchState {
    /// `true` for `Pending` and `Running`.
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(self, LaunchState::Pending | LaunchState::Running)
    }

    /// `true` for `Completed`, `Failed` and `Cancelled`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_live()
    }

    /// Short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            LaunchState::Pending => "pending",
            LaunchState::Running => "running",
            LaunchState::Completed => "completed",
            LaunchState::Failed => "failed",
            LaunchState::Cancelled => "cancelled",
        }
    }
}

/// Who receives the result of a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Only the submitter, on its own channel.
    #[default]
    Own,
    /// The submitter on its own channel, plus every other attached listener
    /// on the broadcast channel.
    Broadcast,
}

/// Natural outcome reported by the executor when a body finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Body produced a value.
    Completed,
    /// Body produced an error.
    Failed,
}

impl Outcome {
    pub(crate) fn state(self) -> LaunchState {
        match self {
            Outcome::Completed => LaunchState::Completed,
            Outcome::Failed => LaunchState::Failed,
        }
    }
}

/// Reference to a launch either by id or by tag.
///
/// Replaces the id/tag overloads of `cancel_operation` and `is_operation_running`:
/// ```
/// use opvisor::{LaunchId, LaunchRef};
///
/// let by_id: LaunchRef = LaunchId::new(3).into();
/// let by_tag: LaunchRef = "sync".into();
/// assert_eq!(by_id, LaunchRef::Id(LaunchId::new(3)));
/// assert_eq!(by_tag, LaunchRef::Tag("sync".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchRef {
    /// By launch id.
    Id(LaunchId),
    /// By deduplication tag (only live launches are indexed).
    Tag(Arc<str>),
}

impl From<LaunchId> for LaunchRef {
    fn from(id: LaunchId) -> Self {
        LaunchRef::Id(id)
    }
}

impl From<&str> for LaunchRef {
    fn from(tag: &str) -> Self {
        LaunchRef::Tag(tag.into())
    }
}

impl From<String> for LaunchRef {
    fn from(tag: String) -> Self {
        LaunchRef::Tag(tag.into())
    }
}

impl From<Arc<str>> for LaunchRef {
    fn from(tag: Arc<str>) -> Self {
        LaunchRef::Tag(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_and_terminal_partition() {
        let all = [
            LaunchState::Pending,
            LaunchState::Running,
            LaunchState::Completed,
            LaunchState::Failed,
            LaunchState::Cancelled,
        ];
        for s in all {
            assert_ne!(s.is_live(), s.is_terminal(), "{s:?}");
        }
        assert!(LaunchState::Pending.is_live());
        assert!(LaunchState::Running.is_live());
    }

    #[test]
    fn test_outcome_maps_to_terminal_state() {
        assert_eq!(Outcome::Completed.state(), LaunchState::Completed);
        assert_eq!(Outcome::Failed.state(), LaunchState::Failed);
    }

    #[test]
    fn test_launch_id_display() {
        assert_eq!(LaunchId::new(42).to_string(), "#42");
    }
}
