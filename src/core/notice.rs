//! Change notification plumbing.
//!
//! [`Dispatcher`] is a small single-event-type broadcaster. Subscribing
//! returns a [`Subscription`] handle that owns the registration: dropping or
//! revoking it unregisters the callback. Each registration carries a liveness
//! flag that is checked right before the callback runs, so a revoked callback
//! is never invoked, even from a dispatch already in progress.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::util::ScenePath;

/// Returned by callbacks to keep or drop their own registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listen {
    Keep,
    Revoke,
}

type Callback<E> = Arc<dyn Fn(&E) -> Listen + Send + Sync>;

struct Entry<E> {
    id: u64,
    live: Arc<AtomicBool>,
    callback: Callback<E>,
}

struct DispatcherInner<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<E>>>,
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64);
}

impl<E: 'static> Unregister for DispatcherInner<E> {
    fn unregister(&self, id: u64) {
        self.entries.lock().retain(|e| e.id != id);
    }
}

/// Broadcasts events of type `E` to registered callbacks.
pub struct Dispatcher<E> {
    inner: Arc<DispatcherInner<E>>,
}

/// Clones share the same registrations.
impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: 'static> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> Dispatcher<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                next_id: AtomicU64::new(1),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a callback. The registration lives as long as the handle.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&E) -> Listen + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let live = Arc::new(AtomicBool::new(true));
        self.inner.entries.lock().push(Entry {
            id,
            live: Arc::clone(&live),
            callback: Arc::new(callback),
        });
        let weak: Weak<DispatcherInner<E>> = Arc::downgrade(&self.inner);
        let owner: Weak<dyn Unregister> = weak;
        Subscription { id, live, owner }
    }

    /// Deliver `event` to every live callback. Returns how many ran.
    ///
    /// The registry lock is not held while callbacks run, so callbacks may
    /// subscribe, revoke, or emit again.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<(Arc<AtomicBool>, Callback<E>)> = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|e| (Arc::clone(&e.live), Arc::clone(&e.callback)))
            .collect();

        let mut invoked = 0;
        for (live, callback) in snapshot {
            if !live.load(Ordering::Acquire) {
                continue;
            }
            invoked += 1;
            if callback(event) == Listen::Revoke {
                live.store(false, Ordering::Release);
            }
        }

        self.inner
            .entries
            .lock()
            .retain(|e| e.live.load(Ordering::Acquire));
        invoked
    }

    /// Number of live registrations.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .entries
            .lock()
            .iter()
            .filter(|e| e.live.load(Ordering::Acquire))
            .count()
    }
}

/// Owned registration handle returned by [`Dispatcher::subscribe`].
pub struct Subscription {
    id: u64,
    live: Arc<AtomicBool>,
    owner: Weak<dyn Unregister>,
}

impl Subscription {
    /// False once revoked, dropped by its dispatcher, or self-revoked.
    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::Acquire) && self.owner.strong_count() > 0
    }

    /// Unregister now. Safe to call more than once.
    pub fn revoke(&mut self) {
        self.live.store(false, Ordering::Release);
        if let Some(owner) = self.owner.upgrade() {
            owner.unregister(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Notice sent by a stage after its content changed.
///
/// `resynced` paths had structural changes (prims created or removed,
/// properties created or removed); `changed_info_only` paths had a value
/// change on an existing property.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectsChanged {
    resynced: Vec<ScenePath>,
    changed_info_only: Vec<ScenePath>,
}

impl ObjectsChanged {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resynced(&mut self, path: ScenePath) {
        if !self.resynced.contains(&path) {
            self.resynced.push(path);
        }
    }

    pub fn add_changed_info(&mut self, path: ScenePath) {
        if !self.changed_info_only.contains(&path) {
            self.changed_info_only.push(path);
        }
    }

    pub fn resynced_paths(&self) -> &[ScenePath] {
        &self.resynced
    }

    pub fn changed_info_only_paths(&self) -> &[ScenePath] {
        &self.changed_info_only
    }

    /// Resynced paths followed by info-only paths.
    pub fn changed_paths(&self) -> impl Iterator<Item = &ScenePath> {
        self.resynced.iter().chain(self.changed_info_only.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.resynced.is_empty() && self.changed_info_only.is_empty()
    }

    /// Fold `other` into this notice. A path resynced in either notice is
    /// reported as resynced only.
    pub fn merge(&mut self, other: ObjectsChanged) {
        for path in other.resynced {
            self.changed_info_only.retain(|p| p != &path);
            self.add_resynced(path);
        }
        for path in other.changed_info_only {
            if !self.resynced.contains(&path) {
                self.add_changed_info(path);
            }
        }
    }
}
