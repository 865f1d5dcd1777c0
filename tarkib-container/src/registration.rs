//! Service registration descriptors.
//!
//! A [`Registration`] is the immutable record of how to satisfy requests
//! for one [`ServiceKey`]: its [`Lifetime`] plus a [`ServiceKind`] payload.
//! Registrations are created once, never mutated, and removed only by
//! [`clear`](crate::Container::clear).

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::typeinfo::{AnyHandle, TypeClass};

/// Zero-argument user factory producing an erased service handle.
pub type FactoryFn = Arc<dyn Fn() -> AnyHandle + Send + Sync>;

/// How a registration satisfies its key.
#[derive(Clone)]
pub enum ServiceKind {
    /// A pre-built value, placed into the singleton cache at registration
    /// time. `owns_instance` records whether the container took ownership
    /// of the value or merely shares it with the registrant.
    Instance {
        owns_instance: bool,
    },
    /// A user-supplied factory, invoked per the registration's lifetime.
    Factory {
        produce: FactoryFn,
    },
    /// An implementation type to construct via the type catalog's
    /// constructor table, then convert to the requested service type.
    TypeMap {
        impl_id: TypeId,
        impl_name: &'static str,
        service_class: TypeClass,
    },
}

impl ServiceKind {
    /// Short label for logs and Debug output.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Instance { .. } => "instance",
            ServiceKind::Factory { .. } => "factory",
            ServiceKind::TypeMap { .. } => "type-map",
        }
    }
}

impl fmt::Debug for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Instance { owns_instance } => f
                .debug_struct("Instance")
                .field("owns_instance", owns_instance)
                .finish(),
            ServiceKind::Factory { .. } => f.debug_struct("Factory").finish(),
            ServiceKind::TypeMap {
                impl_name,
                service_class,
                ..
            } => f
                .debug_struct("TypeMap")
                .field("impl_name", impl_name)
                .field("service_class", service_class)
                .finish(),
        }
    }
}

/// Immutable descriptor for a single registered service.
#[derive(Clone)]
pub struct Registration {
    key: ServiceKey,
    lifetime: Lifetime,
    kind: ServiceKind,
}

impl Registration {
    /// Descriptor for a pre-built instance. Instances are always
    /// singletons; the value itself lives in the singleton cache.
    pub fn instance(key: ServiceKey, owns_instance: bool) -> Self {
        Self {
            key,
            lifetime: Lifetime::Singleton,
            kind: ServiceKind::Instance { owns_instance },
        }
    }

    /// Descriptor for a factory registration.
    pub fn factory(key: ServiceKey, lifetime: Lifetime, produce: FactoryFn) -> Self {
        Self {
            key,
            lifetime,
            kind: ServiceKind::Factory { produce },
        }
    }

    /// Descriptor mapping a service key to an implementation type.
    pub fn type_map(
        key: ServiceKey,
        lifetime: Lifetime,
        impl_id: TypeId,
        impl_name: &'static str,
        service_class: TypeClass,
    ) -> Self {
        Self {
            key,
            lifetime,
            kind: ServiceKind::TypeMap {
                impl_id,
                impl_name,
                service_class,
            },
        }
    }

    /// The key this registration satisfies.
    #[inline]
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// The registration's lifetime.
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The kind-specific payload.
    #[inline]
    pub fn kind(&self) -> &ServiceKind {
        &self.kind
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("kind", &self.kind)
            .finish()
    }
}
