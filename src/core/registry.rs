//! # Launch registry: id and tag bookkeeping.
//!
//! Tracks every launch record by [`LaunchId`] and every *live* launch by tag.
//! Pure in-memory bookkeeping; it spawns nothing and never awaits.
//!
//! ## Architecture
//! ```text
//! Engine::run_*      → register()      → Admitted{id, token} | Joined(id)
//! LaunchRunner       → mark_running()  → Pending → Running
//! LaunchRunner       → mark_terminal() → Running → Completed | Failed   (tag freed)
//! Controller::signal → cancel()        → Pending|Running → Cancelled    (tag freed)
//! DeliveryRouter     → remove()        → terminal record purged
//! ```
//!
//! ## Rules
//! - One mutex guards both maps; every mutation is a single critical section,
//!   so two concurrent `register` calls for one tag see exactly one winner.
//! - `tags` only holds launches in `Pending`/`Running`.
//! - A state is written at most once per transition; terminal states are final.
//! - The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::core::launch::{DeliveryMode, LaunchId, LaunchState, Outcome};
use crate::listeners::ListenerId;

/// What a submitter asks the registry to admit.
#[derive(Debug, Clone)]
pub(crate) struct LaunchRequest {
    pub tag: Option<Arc<str>>,
    pub operation: Arc<str>,
    pub mode: DeliveryMode,
    pub submitter: ListenerId,
}

/// Result of [`LaunchRegistry::register`].
#[derive(Debug)]
pub(crate) enum Admission {
    /// A new record was created; the caller must hand the launch to the executor.
    Admitted {
        id: LaunchId,
        token: CancellationToken,
    },
    /// The tag already maps to a live launch; nothing new may run.
    Joined(LaunchId),
}

impl Admission {
    pub fn id(&self) -> LaunchId {
        match self {
            Admission::Admitted { id, .. } | Admission::Joined(id) => *id,
        }
    }
}

/// Read-only snapshot of a launch record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchInfo {
    /// Launch id.
    pub id: LaunchId,
    /// Deduplication tag, if any.
    pub tag: Option<Arc<str>>,
    /// Operation name.
    pub operation: Arc<str>,
    /// Current state.
    pub state: LaunchState,
    /// Delivery mode.
    pub mode: DeliveryMode,
    /// Listener that submitted the launch.
    pub submitter: ListenerId,
}

struct LaunchRecord {
    info: LaunchInfo,
    token: CancellationToken,
}

#[derive(Default)]
struct Index {
    next_id: u64,
    launches: HashMap<LaunchId, LaunchRecord>,
    tags: HashMap<Arc<str>, LaunchId>,
}

impl Index {
    /// Drops the tag mapping for `id`, if the tag still points at it.
    fn release_tag(&mut self, id: LaunchId, tag: Option<&Arc<str>>) {
        if let Some(tag) = tag
            && self.tags.get(tag) == Some(&id)
        {
            self.tags.remove(tag);
        }
    }
}

/// Registry of launch records, shared by every engine component.
pub struct LaunchRegistry {
    index: Mutex<Index>,
}

impl LaunchRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            index: Mutex::new(Index::default()),
        })
    }

    /// Admits a launch or joins the live launch already holding its tag.
    ///
    /// `token` is stored with the new record; on a dedup hit it is dropped unused.
    pub(crate) fn register(&self, req: LaunchRequest, token: CancellationToken) -> Admission {
        let mut index = self.lock();

        if let Some(tag) = &req.tag
            && let Some(&existing) = index.tags.get(tag)
        {
            return Admission::Joined(existing);
        }

        index.next_id += 1;
        let id = LaunchId::new(index.next_id);

        if let Some(tag) = &req.tag {
            index.tags.insert(Arc::clone(tag), id);
        }
        index.launches.insert(
            id,
            LaunchRecord {
                info: LaunchInfo {
                    id,
                    tag: req.tag,
                    operation: req.operation,
                    state: LaunchState::Pending,
                    mode: req.mode,
                    submitter: req.submitter,
                },
                token: token.clone(),
            },
        );
        Admission::Admitted { id, token }
    }

    /// `Pending → Running`. Returns `false` if the launch is unknown or no longer pending.
    pub(crate) fn mark_running(&self, id: LaunchId) -> bool {
        let mut index = self.lock();
        match index.launches.get_mut(&id) {
            Some(rec) if rec.info.state == LaunchState::Pending => {
                rec.info.state = LaunchState::Running;
                true
            }
            _ => false,
        }
    }

    /// `Running → Completed | Failed`, releasing the tag.
    ///
    /// Returns the updated snapshot, or `Err(state)` with the state that won
    /// (normally `Cancelled`) when the launch is no longer running.
    pub(crate) fn mark_terminal(
        &self,
        id: LaunchId,
        outcome: Outcome,
    ) -> Result<LaunchInfo, Option<LaunchState>> {
        let mut index = self.lock();
        let Some(rec) = index.launches.get_mut(&id) else {
            return Err(None);
        };
        if rec.info.state != LaunchState::Running {
            return Err(Some(rec.info.state));
        }
        rec.info.state = outcome.state();
        let info = rec.info.clone();
        index.release_tag(id, info.tag.as_ref());
        Ok(info)
    }

    /// `Pending | Running → Cancelled`, releasing the tag.
    ///
    /// Returns the launch token (not yet cancelled) and the updated snapshot, or
    /// `None` if the launch is unknown or already terminal.
    pub(crate) fn cancel(&self, id: LaunchId) -> Option<(CancellationToken, LaunchInfo)> {
        let mut index = self.lock();
        let rec = index.launches.get_mut(&id)?;
        if rec.info.state.is_terminal() {
            return None;
        }
        rec.info.state = LaunchState::Cancelled;
        let out = (rec.token.clone(), rec.info.clone());
        index.release_tag(id, out.1.tag.as_ref());
        Some(out)
    }

    /// Purges a terminal record. Live records are left untouched.
    pub(crate) fn remove(&self, id: LaunchId) -> Option<LaunchInfo> {
        let mut index = self.lock();
        match index.launches.get(&id) {
            Some(rec) if rec.info.state.is_terminal() => {
                index.launches.remove(&id).map(|rec| rec.info)
            }
            _ => None,
        }
    }

    /// Snapshot of a launch by id.
    pub fn lookup(&self, id: LaunchId) -> Option<LaunchInfo> {
        self.lock().launches.get(&id).map(|rec| rec.info.clone())
    }

    /// Snapshot of the live launch holding `tag`.
    pub fn lookup_by_tag(&self, tag: &str) -> Option<LaunchInfo> {
        let index = self.lock();
        let id = index.tags.get(tag)?;
        index.launches.get(id).map(|rec| rec.info.clone())
    }

    /// Cancellation token of a launch, if the record exists.
    pub(crate) fn token(&self, id: LaunchId) -> Option<CancellationToken> {
        self.lock().launches.get(&id).map(|rec| rec.token.clone())
    }

    /// Returns sorted ids of live launches.
    pub fn live(&self) -> Vec<LaunchId> {
        let index = self.lock();
        let mut ids: Vec<LaunchId> = index
            .launches
            .values()
            .filter(|rec| rec.info.state.is_live())
            .map(|rec| rec.info.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns sorted operation names of every record still present.
    pub(crate) fn names(&self) -> Vec<String> {
        let index = self.lock();
        let mut names: Vec<String> = index
            .launches
            .values()
            .map(|rec| format!("{}{}", rec.info.operation, rec.info.id))
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of records (live and terminal-but-not-yet-removed).
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().launches.len()
    }

    /// True if no records are present.
    pub fn is_empty(&self) -> bool {
        self.lock().launches.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn request(tag: Option<&str>) -> LaunchRequest {
        LaunchRequest {
            tag: tag.map(Arc::from),
            operation: Arc::from("op"),
            mode: DeliveryMode::Own,
            submitter: ListenerId::new(1),
        }
    }

    fn admit(reg: &LaunchRegistry, tag: Option<&str>) -> Admission {
        reg.register(request(tag), CancellationToken::new())
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let reg = LaunchRegistry::new();
        assert_eq!(admit(&reg, None).id(), LaunchId::new(1));
        assert_eq!(admit(&reg, None).id(), LaunchId::new(2));
        assert_eq!(admit(&reg, Some("a")).id(), LaunchId::new(3));
    }

    #[test]
    fn test_tag_dedup_returns_existing_id() {
        let reg = LaunchRegistry::new();
        let first = admit(&reg, Some("sync"));
        let second = admit(&reg, Some("sync"));
        assert!(matches!(first, Admission::Admitted { .. }));
        assert!(matches!(second, Admission::Joined(id) if id == first.id()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_terminal_releases_tag() {
        let reg = LaunchRegistry::new();
        let id = admit(&reg, Some("sync")).id();
        assert!(reg.mark_running(id));
        let info = reg.mark_terminal(id, Outcome::Completed).expect("running");
        assert_eq!(info.state, LaunchState::Completed);
        assert!(reg.lookup_by_tag("sync").is_none());

        let next = admit(&reg, Some("sync"));
        assert!(matches!(next, Admission::Admitted { .. }));
        assert_ne!(next.id(), id);
    }

    #[test]
    fn test_cancel_wins_over_late_completion() {
        let reg = LaunchRegistry::new();
        let id = admit(&reg, Some("t")).id();
        assert!(reg.mark_running(id));
        let (token, info) = reg.cancel(id).expect("live");
        assert!(!token.is_cancelled());
        assert_eq!(info.state, LaunchState::Cancelled);

        assert_eq!(
            reg.mark_terminal(id, Outcome::Completed),
            Err(Some(LaunchState::Cancelled))
        );
        assert!(reg.cancel(id).is_none());
    }

    #[test]
    fn test_cancel_pending_blocks_running() {
        let reg = LaunchRegistry::new();
        let id = admit(&reg, None).id();
        assert!(reg.cancel(id).is_some());
        assert!(!reg.mark_running(id));
    }

    #[test]
    fn test_remove_only_terminal() {
        let reg = LaunchRegistry::new();
        let id = admit(&reg, None).id();
        assert!(reg.remove(id).is_none());
        reg.cancel(id);
        assert!(reg.remove(id).is_some());
        assert!(reg.lookup(id).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_live_lists_only_pending_and_running() {
        let reg = LaunchRegistry::new();
        let a = admit(&reg, None).id();
        let b = admit(&reg, None).id();
        let c = admit(&reg, None).id();
        reg.mark_running(b);
        reg.cancel(c);
        assert_eq!(reg.live(), vec![a, b]);
    }

    #[test]
    fn test_old_record_does_not_release_new_tag_owner() {
        let reg = LaunchRegistry::new();
        let old = admit(&reg, Some("t")).id();
        reg.mark_running(old);
        reg.cancel(old);
        let new = admit(&reg, Some("t")).id();
        reg.remove(old);
        assert_eq!(reg.lookup_by_tag("t").map(|i| i.id), Some(new));
    }

    #[test]
    fn test_concurrent_register_single_winner() {
        let reg = LaunchRegistry::new();
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match admit(&reg, Some("race")) {
                        Admission::Admitted { id, .. } => (id, true),
                        Admission::Joined(id) => (id, false),
                    }
                })
            })
            .collect();

        let results: Vec<(LaunchId, bool)> =
            handles.into_iter().map(|h| h.join().expect("join")).collect();
        let winners = results.iter().filter(|(_, admitted)| *admitted).count();
        assert_eq!(winners, 1);
        let first = results[0].0;
        assert!(results.iter().all(|(id, _)| *id == first));
        assert_eq!(reg.len(), 1);
    }
}
