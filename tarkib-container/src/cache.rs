//! Singleton cache — materialized values for Singleton-lifetime keys.
//!
//! Each key owns a per-key cell that is installed at the moment of the
//! first cache miss, so concurrent first resolutions of the same key
//! collapse to a single construction: one caller runs the initializer,
//! the others block on the cell and receive the same value. Transient
//! keys never touch this cache.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::Result;
use crate::key::ServiceKey;
use crate::typeinfo::AnyHandle;

/// A materialized singleton.
///
/// Every handle is reference-counted; `owned` marks entries whose release
/// the container is responsible for. An owned entry is dropped by
/// [`SingletonCache::clear`] (or cache teardown) exactly once — if no
/// caller still holds a clone at that point, the value's destructor runs
/// there. Shared entries are simply dropped; the value is released
/// whenever the last reference disappears. A given instance is cached
/// under exactly one of the two modes, never both.
#[derive(Clone)]
pub struct CachedValue {
    handle: AnyHandle,
    owned: bool,
}

impl CachedValue {
    /// A reference-counted entry the container merely shares.
    pub fn shared(handle: AnyHandle) -> Self {
        Self {
            handle,
            owned: false,
        }
    }

    /// An entry whose lifetime the container manages.
    pub fn owned(handle: AnyHandle) -> Self {
        Self {
            handle,
            owned: true,
        }
    }

    /// The erased service handle.
    #[inline]
    pub fn handle(&self) -> &AnyHandle {
        &self.handle
    }

    /// Whether the container is the designated releaser of this value.
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

impl fmt::Debug for CachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedValue")
            .field("owned", &self.owned)
            .finish()
    }
}

type Slot = Arc<OnceCell<CachedValue>>;

/// Concurrent map from [`ServiceKey`] to at most one [`CachedValue`].
///
/// Map shard locks are held only for single map operations, never while
/// an initializer runs, so nested resolution during materialization
/// cannot deadlock on the cache.
pub struct SingletonCache {
    slots: DashMap<ServiceKey, Slot>,
}

impl SingletonCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Inserts (or replaces) a shared entry. Used for values placed
    /// eagerly at registration time.
    pub fn put_shared(&self, key: ServiceKey, handle: AnyHandle) {
        self.put(key, CachedValue::shared(handle));
    }

    /// Inserts (or replaces) an owned entry.
    pub fn put_owned(&self, key: ServiceKey, handle: AnyHandle) {
        self.put(key, CachedValue::owned(handle));
    }

    fn put(&self, key: ServiceKey, value: CachedValue) {
        trace!(key = %key, owned = value.is_owned(), "caching singleton");
        self.slots
            .insert(key, Arc::new(OnceCell::with_value(value)));
    }

    /// Returns the cached value for `key`, if it has been materialized.
    pub fn try_get(&self, key: &ServiceKey) -> Option<CachedValue> {
        self.slots
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    /// Returns the cached value for `key`, materializing it with `init`
    /// on first call.
    ///
    /// The per-key cell is installed before `init` runs, so a concurrent
    /// caller for the same key blocks on the cell instead of starting a
    /// second construction. If `init` fails the cell stays empty and a
    /// later call may retry.
    pub fn get_or_materialize(
        &self,
        key: &ServiceKey,
        init: impl FnOnce() -> Result<CachedValue>,
    ) -> Result<CachedValue> {
        // Clone the slot out so the shard guard is released before the
        // initializer recurses into other resolutions.
        let slot: Slot = self.slots.entry(key.clone()).or_default().clone();
        slot.get_or_try_init(init).map(CachedValue::clone)
    }

    /// Drops every entry. Owned entries are released here — exactly once,
    /// since the entry is removed from the map before any further clear
    /// could see it.
    pub fn clear(&self) {
        for entry in self.slots.iter() {
            if let Some(value) = entry.value().get() {
                if value.is_owned() {
                    debug!(key = %entry.key(), "releasing owned singleton");
                }
            }
        }
        self.slots.clear();
    }

    /// Number of keys with a slot (materialized or in flight).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slots exist.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for SingletonCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SingletonCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonCache")
            .field("slots", &self.len())
            .finish()
    }
}
