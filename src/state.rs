//! Observable key/value state with change listeners.
//!
//! A [`StateStore`] holds an immutable [`Snapshot`] that is replaced on every
//! [`StateStore::change_state`]. Listeners either receive the whole new
//! snapshot on every change, or watch one key and only hear about it when its
//! value actually changed.
//!
//! Notification walks a copy of the listener list taken when the pass starts,
//! so listeners may subscribe or unsubscribe (themselves or others) while being
//! invoked. Such changes only take effect for the next pass.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use log::trace;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lock a std mutex, recovering the data if another holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identifies a registered listener; unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        ListenerId(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An immutable view of the state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<K: Ord, V> {
    entries: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for Snapshot<K, V> {
    fn default() -> Self {
        Snapshot {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> Snapshot<K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Shallow merge: every key in `partial` overwrites the current value.
    fn merge(&mut self, partial: impl IntoIterator<Item = (K, V)>) {
        self.entries.extend(partial);
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Snapshot<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Snapshot {
            entries: iter.into_iter().collect(),
        }
    }
}

type SnapshotCallback<K, V> = Box<dyn FnMut(&Snapshot<K, V>) + Send>;
type KeyCallback<V> = Box<dyn FnMut(Option<&V>) + Send>;

enum Callback<K: Ord, V> {
    Snapshot(SnapshotCallback<K, V>),
    Key(K, KeyCallback<V>),
}

struct Listener<K: Ord, V> {
    id: ListenerId,
    callback: Mutex<Callback<K, V>>,
}

/// Observable state container.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use smarthome_manager::StateStore;
///
/// let store = StateStore::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// let id = store.watch("power", move |value: Option<&bool>| {
///     sink.lock().unwrap().push(value.copied());
/// });
///
/// store.change_state([("power", true)]);
/// store.change_state([("power", true)]); // unchanged, not reported
/// store.change_state([("power", false)]);
/// store.unsubscribe(&id);
/// store.change_state([("power", true)]);
///
/// assert_eq!(*seen.lock().unwrap(), vec![Some(true), Some(false)]);
/// ```
pub struct StateStore<K: Ord, V> {
    snapshot: Mutex<Arc<Snapshot<K, V>>>,
    listeners: Mutex<Vec<Arc<Listener<K, V>>>>,
}

impl<K: Ord, V> Default for StateStore<K, V> {
    fn default() -> Self {
        StateStore {
            snapshot: Mutex::new(Arc::new(Snapshot::default())),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<K, V> StateStore<K, V>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot<K, V>> {
        Arc::clone(&lock(&self.snapshot))
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Register a listener invoked with the full snapshot after every change.
    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: FnMut(&Snapshot<K, V>) + Send + 'static,
    {
        self.register(Callback::Snapshot(Box::new(callback)))
    }

    /// Register a listener invoked with the new value of `key`, only when it differs.
    pub fn watch<F>(&self, key: K, callback: F) -> ListenerId
    where
        F: FnMut(Option<&V>) + Send + 'static,
    {
        self.register(Callback::Key(key, Box::new(callback)))
    }

    /// Remove a listener. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, id: &ListenerId) {
        lock(&self.listeners).retain(|listener| listener.id != *id);
    }

    /// Merge `partial` into the state and notify listeners.
    pub fn change_state(&self, partial: impl IntoIterator<Item = (K, V)>) {
        let (previous, current) = {
            let mut guard = lock(&self.snapshot);
            let previous = Arc::clone(&guard);
            let mut next = previous.as_ref().clone();
            next.merge(partial);
            *guard = Arc::new(next);
            (previous, Arc::clone(&guard))
        };

        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            // A listener re-entering change_state is not invoked twice for one pass.
            let mut callback = match listener.callback.try_lock() {
                Ok(callback) => callback,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    trace!("skipping re-entrant notification of listener {}", listener.id);
                    continue;
                }
            };
            match &mut *callback {
                Callback::Snapshot(callback) => callback(current.as_ref()),
                Callback::Key(key, callback) => {
                    let value = current.get(key);
                    if value != previous.get(key) {
                        callback(value);
                    }
                }
            }
        }
    }

    fn register(&self, callback: Callback<K, V>) -> ListenerId {
        let id = ListenerId::new();
        lock(&self.listeners).push(Arc::new(Listener {
            id,
            callback: Mutex::new(callback),
        }));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Arc<Mutex<Vec<T>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (Arc::clone(&seen), seen)
    }

    #[test]
    fn test_merge_is_shallow() {
        let store = StateStore::new();
        store.change_state([("a", 1), ("b", 2)]);
        store.change_state([("b", 3)]);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get(&"a"), Some(&1));
        assert_eq!(snapshot.get(&"b"), Some(&3));
    }

    #[test]
    fn test_subscriber_sees_every_change() {
        let store = StateStore::new();
        let (sink, seen) = recorder();
        store.subscribe(move |snapshot: &Snapshot<&str, i32>| {
            sink.lock().unwrap().push(snapshot.len());
        });

        store.change_state([("a", 1)]);
        store.change_state(Vec::new());
        store.change_state([("b", 1)]);

        assert_eq!(*seen.lock().unwrap(), vec![1, 1, 2]);
    }

    #[test]
    fn test_watcher_only_sees_differences() {
        let store = StateStore::new();
        let (sink, seen) = recorder();
        store.watch("a", move |value: Option<&i32>| {
            sink.lock().unwrap().push(value.copied());
        });

        store.change_state([("b", 1)]);
        store.change_state([("a", 1)]);
        store.change_state([("a", 1)]);
        store.change_state([("a", 2)]);

        assert_eq!(*seen.lock().unwrap(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let store: StateStore<&str, i32> = StateStore::new();
        let (sink, seen) = recorder();
        let id = store.subscribe(move |_| sink.lock().unwrap().push(()));
        let other = StateStore::<&str, i32>::new().subscribe(|_| {});

        store.unsubscribe(&id);
        store.unsubscribe(&id);
        store.unsubscribe(&other);
        store.change_state([("a", 1)]);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_listener_ids_are_unique() {
        let store: StateStore<&str, i32> = StateStore::new();
        let ids: HashSet<_> = (0..1000).map(|_| store.subscribe(|_| {})).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let store: Arc<StateStore<&str, i32>> = Arc::new(StateStore::new());
        let (sink, seen) = recorder();
        let slot = Arc::new(Mutex::new(None::<ListenerId>));

        let weak = Arc::downgrade(&store);
        let own_id = Arc::clone(&slot);
        let id = store.subscribe(move |_| {
            sink.lock().unwrap().push(());
            if let (Some(store), Some(id)) = (weak.upgrade(), *own_id.lock().unwrap()) {
                store.unsubscribe(&id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        store.change_state([("a", 1)]);
        store.change_state([("a", 2)]);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_mutation_during_notification_applies_to_next_pass() {
        let store: Arc<StateStore<&str, i32>> = Arc::new(StateStore::new());
        let (sink, seen) = recorder();

        let added = Arc::clone(&sink);
        let weak = Arc::downgrade(&store);
        let mut registered = false;
        store.subscribe(move |_| {
            if registered {
                return;
            }
            registered = true;
            if let Some(store) = weak.upgrade() {
                let added = Arc::clone(&added);
                store.subscribe(move |_| added.lock().unwrap().push("late"));
            }
        });
        let victim_sink = Arc::clone(&sink);
        let victim = store.subscribe(move |_| victim_sink.lock().unwrap().push("victim"));

        let weak = Arc::downgrade(&store);
        store.subscribe(move |_| {
            if let Some(store) = weak.upgrade() {
                store.unsubscribe(&victim);
            }
        });

        // The victim is still in the copy taken for the first pass.
        store.change_state([("a", 1)]);
        assert_eq!(*seen.lock().unwrap(), vec!["victim"]);

        store.change_state([("a", 2)]);
        assert_eq!(*seen.lock().unwrap(), vec!["victim", "late"]);
    }

    #[test]
    fn test_reentrant_change_state() {
        let store: Arc<StateStore<&str, i32>> = Arc::new(StateStore::new());
        let (sink, seen) = recorder();
        let weak = Arc::downgrade(&store);
        store.subscribe(move |snapshot| {
            sink.lock().unwrap().push(snapshot.get(&"a").copied());
            if snapshot.get(&"a") == Some(&1) {
                if let Some(store) = weak.upgrade() {
                    store.change_state([("a", 2)]);
                }
            }
        });

        store.change_state([("a", 1)]);

        assert_eq!(*seen.lock().unwrap(), vec![Some(1)]);
        assert_eq!(store.snapshot().get(&"a"), Some(&2));
    }
}
