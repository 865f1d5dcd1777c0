//! Service registry — stores all registrations.
//!
//! The registry maps [`ServiceKey`] to [`Registration`] descriptors.
//! Registration is fail-fast: a key can be registered at most once, and
//! duplicates are rejected, never replaced.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{AlreadyRegisteredError, ContainerError, Result};
use crate::key::ServiceKey;
use crate::registration::Registration;

/// Concurrent map of service registrations.
///
/// A single lock guards the underlying map, held only for the duration of
/// one map operation — never across a recursive resolve, so nested
/// resolution cannot deadlock on the registry.
pub struct ServiceRegistry {
    entries: RwLock<HashMap<ServiceKey, Registration>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a registration.
    ///
    /// # Errors
    /// Returns [`ContainerError::AlreadyRegistered`] if the key is
    /// already present.
    pub fn add(&self, registration: Registration) -> Result<()> {
        let key = registration.key().clone();
        let mut entries = self.entries.write();

        if entries.contains_key(&key) {
            return Err(ContainerError::AlreadyRegistered(
                AlreadyRegisteredError { key },
            ));
        }

        debug!(
            key = %key,
            lifetime = %registration.lifetime(),
            kind = registration.kind().label(),
            "registered service"
        );
        entries.insert(key, registration);
        Ok(())
    }

    /// Looks up a registration by key, returning a clone of the
    /// descriptor so no lock is held while it is used.
    pub fn try_get(&self, key: &ServiceKey) -> Option<Registration> {
        self.entries.read().get(key).cloned()
    }

    /// Whether the key is registered.
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Removes every registration.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        debug!(count = entries.len(), "clearing registry");
        entries.clear();
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all registered keys (for "did you mean?" suggestions).
    pub fn registered_keys(&self) -> Vec<ServiceKey> {
        self.entries.read().keys().cloned().collect()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
