//! In-memory entity stores.
//!
//! Each workflow owns one [`EntityStore`] per entity kind (plus a
//! [`SingletonSlot`] for the number game). The stores are the concurrency
//! boundary of the engine: every mutation is a single non-suspending step,
//! and the idempotence of terminal transitions rests on `take` — exactly
//! one caller observes the entity, everyone else sees `None`.

use std::hash::Hash;
use std::sync::Mutex;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

// ============================================================================
// EntityStore
// ============================================================================

/// Process-wide mapping from an opaque id to a live workflow entity.
///
/// Thread-safe via `DashMap`. Closures passed to [`EntityStore::update`]
/// and [`EntityStore::take_if`] run under the shard lock and must not
/// block or suspend.
pub struct EntityStore<K, V> {
    entries: DashMap<K, V>,
}

impl<K, V> EntityStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Inserts `value` only if `key` is vacant. Returns whether the
    /// insert happened; an occupied key is left untouched.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Inserts or replaces unconditionally.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Atomically removes and returns the entity.
    ///
    /// This is the idempotence primitive for terminal transitions: when a
    /// timer fire and a manual command race, only one of them gets
    /// `Some` and performs the side effects.
    pub fn take(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    /// Atomically removes the entity only if `pred` holds for it.
    pub fn take_if(&self, key: &K, pred: impl FnOnce(&V) -> bool) -> Option<V> {
        self.entries.remove_if(key, |_, v| pred(v)).map(|(_, v)| v)
    }

    /// Applies a single mutation under the shard lock, returning the
    /// closure's result, or `None` if the entity is absent.
    pub fn update<T>(&self, key: &K, f: impl FnOnce(&mut V) -> T) -> Option<T> {
        self.entries.get_mut(key).map(|mut entry| f(entry.value_mut()))
    }

    /// Returns a clone of the entity.
    #[must_use]
    pub fn get_cloned(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// A point-in-time clone of all entries.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(K, V)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for EntityStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SingletonSlot
// ============================================================================

/// Outcome of [`SingletonSlot::resolve`].
#[derive(Debug)]
pub enum Resolved<T, R> {
    /// The slot was empty; the closure never ran.
    Idle,
    /// The closure ran and the value stays in the slot.
    Kept(R),
    /// The closure ran and asked to take the value out.
    Taken(T, R),
}

/// A slot for an entity of which at most one may be active process-wide.
///
/// Backed by a `std::sync::Mutex` that is only ever held for the duration
/// of a non-suspending closure — check-and-clear races (winning guess vs.
/// stop command) are decided inside one critical section, and the winner
/// performs its suspending side effects after the slot is already idle.
pub struct SingletonSlot<T> {
    inner: Mutex<Option<T>>,
}

impl<T> SingletonSlot<T> {
    /// Creates an idle slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<T>> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fills the slot if idle. Returns `false` (dropping `value`) when a
    /// value is already active.
    pub fn try_start(&self, value: T) -> bool {
        let mut guard = self.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(value);
        true
    }

    /// Whether a value is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Atomically clears the slot, returning the value if one was active.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Reads the active value through a closure.
    pub fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.lock().as_ref().map(f)
    }

    /// Mutates the active value and, if the closure returns `take =
    /// true`, clears the slot in the same critical section.
    ///
    /// The closure must not block or suspend.
    pub fn resolve<R>(&self, f: impl FnOnce(&mut T) -> (R, bool)) -> Resolved<T, R> {
        let mut guard = self.lock();
        let Some(value) = guard.as_mut() else {
            return Resolved::Idle;
        };
        let (result, take) = f(value);
        if take {
            let value = guard.take().expect("slot checked active above");
            Resolved::Taken(value, result)
        } else {
            Resolved::Kept(result)
        }
    }
}

impl<T> Default for SingletonSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
