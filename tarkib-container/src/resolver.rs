//! Resolution engine.
//!
//! A [`Resolution`] is created per top-level resolve call and carries the
//! in-progress key stack down the recursion, so a cyclic dependency graph
//! fails fast with the full chain instead of overflowing the stack.
//!
//! Type-map construction runs in two phases:
//!
//! 1. **Selection** — pure, no side effects: walk the implementation's
//!    declared constructors and keep the eligible one with the most
//!    parameters; fall back to a zero-argument constructor. Nothing is
//!    resolved or constructed here, so losing candidates never produce
//!    throwaway dependents.
//! 2. **Materialization** — for the winner only: resolve each parameter
//!    recursively and invoke the constructor. A failed parameter aborts
//!    the whole attempt; already-resolved parameters are dropped, never
//!    adopted.

use std::any::TypeId;
use std::cell::RefCell;

use tracing::{debug, trace, warn};

use crate::cache::CachedValue;
use crate::container::Container;
use crate::error::{CircularDependencyError, ContainerError, Result};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::registration::{Registration, ServiceKind};
use crate::typeinfo::{
    AnyHandle, ArgSource, Constructor, ParamSpec, TypeClass, TypeDescriptor,
};

/// State for one top-level resolve call.
///
/// Lives on the calling thread only; the container itself stays freely
/// shareable.
pub(crate) struct Resolution<'c> {
    container: &'c Container,
    stack: RefCell<Vec<ServiceKey>>,
}

impl<'c> Resolution<'c> {
    pub(crate) fn new(container: &'c Container) -> Self {
        Self {
            container,
            stack: RefCell::new(Vec::new()),
        }
    }

    /// Resolves a key to an erased handle, recursing through its
    /// dependency graph.
    pub(crate) fn resolve_key(&self, key: &ServiceKey) -> Result<AnyHandle> {
        if self.stack.borrow().contains(key) {
            let mut chain = self.stack.borrow().clone();
            chain.push(key.clone());
            warn!(key = %key, "circular dependency detected");
            return Err(ContainerError::CircularDependency(
                CircularDependencyError { chain },
            ));
        }

        self.stack.borrow_mut().push(key.clone());
        let result = self.resolve_current(key);
        self.stack.borrow_mut().pop();
        result
    }

    /// Resolves the key on top of the stack.
    fn resolve_current(&self, key: &ServiceKey) -> Result<AnyHandle> {
        let Some(registration) = self.container.registry().try_get(key) else {
            return Err(self.container.not_registered(key, self.requester()));
        };

        match registration.lifetime() {
            Lifetime::Singleton => {
                let cached = self.container.cache().get_or_materialize(key, || {
                    self.materialize(key, &registration)
                })?;
                trace!(key = %key, "resolved singleton");
                Ok(cached.handle().clone())
            }
            Lifetime::Transient => {
                let handle = match registration.kind() {
                    // Instances are always singletons; a transient
                    // instance registration means corrupted state.
                    ServiceKind::Instance { .. } => {
                        Err(ContainerError::InstanceMissing { key: key.clone() })
                    }
                    ServiceKind::Factory { produce } => Ok(produce()),
                    ServiceKind::TypeMap {
                        impl_id, impl_name, ..
                    } => self.construct(key, *impl_id, *impl_name),
                }?;
                trace!(key = %key, "resolved transient");
                Ok(handle)
            }
        }
    }

    /// Produces the value to cache for a Singleton-lifetime key.
    fn materialize(
        &self,
        key: &ServiceKey,
        registration: &Registration,
    ) -> Result<CachedValue> {
        match registration.kind() {
            // Instance values are placed into the cache at registration
            // time. Reaching here means the cache lost the value.
            ServiceKind::Instance { .. } => {
                Err(ContainerError::InstanceMissing { key: key.clone() })
            }
            // Factory-produced singletons are cached as shared handles;
            // the factory may retain references of its own.
            ServiceKind::Factory { produce } => {
                Ok(CachedValue::shared(produce()))
            }
            // Container-constructed singletons: class-like services are
            // container-owned, interface-like services are shared.
            ServiceKind::TypeMap {
                impl_id,
                impl_name,
                service_class,
            } => {
                let handle = self.construct(key, *impl_id, *impl_name)?;
                Ok(match service_class {
                    TypeClass::Class => CachedValue::owned(handle),
                    TypeClass::Interface => CachedValue::shared(handle),
                })
            }
        }
    }

    /// Builds an instance of `impl_id` and converts it to the service
    /// type of `key`.
    fn construct(
        &self,
        key: &ServiceKey,
        impl_id: TypeId,
        impl_name: &'static str,
    ) -> Result<AnyHandle> {
        let descriptor = self
            .container
            .catalog()
            .descriptor(impl_id)
            .ok_or(ContainerError::MissingTypeInfo { type_name: impl_name })?;

        let constructor = self.select_constructor(&descriptor)?;
        trace!(
            key = %key,
            implementation = impl_name,
            arity = constructor.arity(),
            "constructing"
        );
        let built = constructor.build(self)?;

        // Self-maps need no conversion.
        if key.type_id() == descriptor.type_id() {
            return Ok(built);
        }

        // The constructed instance must satisfy the requested service
        // type; otherwise it is rejected and dropped right here.
        descriptor.cast_to(key.type_id(), &built).ok_or_else(|| {
            ContainerError::ImplementationMismatch {
                service: key.clone(),
                implementation: impl_name,
            }
        })
    }

    /// Selection phase: pick the eligible constructor with the most
    /// parameters (first declared wins ties), falling back to a
    /// zero-argument constructor.
    fn select_constructor<'a>(
        &self,
        descriptor: &'a TypeDescriptor,
    ) -> Result<&'a Constructor> {
        let mut best: Option<&Constructor> = None;
        for constructor in descriptor.constructors() {
            if constructor.arity() == 0 || !self.eligible(constructor) {
                continue;
            }
            let richer = best.is_none_or(|b| constructor.arity() > b.arity());
            if richer {
                best = Some(constructor);
            }
        }

        if let Some(constructor) = best {
            return Ok(constructor);
        }

        descriptor
            .constructors()
            .iter()
            .find(|c| c.arity() == 0)
            .ok_or(ContainerError::NoUsableConstructor {
                type_name: descriptor.type_name(),
            })
    }

    fn eligible(&self, constructor: &Constructor) -> bool {
        constructor
            .params()
            .iter()
            .all(|param| self.param_eligible(param))
    }

    /// A parameter is satisfiable when its key is registered (interface
    /// or class), or when it is a described class the resolver could
    /// auto-register and construct.
    fn param_eligible(&self, param: &ParamSpec) -> bool {
        self.container.registry().contains(&param.key())
            || self.container.catalog().is_constructible(param.type_id)
    }

    /// The key that requested the one currently being resolved, if any.
    fn requester(&self) -> Option<ServiceKey> {
        let stack = self.stack.borrow();
        stack.len().checked_sub(2).map(|i| stack[i].clone())
    }
}

impl ArgSource for Resolution<'_> {
    fn resolve_arg(&self, spec: &ParamSpec) -> Result<AnyHandle> {
        let key = spec.key();

        // Auto-registration: an unregistered but constructible class
        // parameter becomes a transient self-map on first encounter.
        if !self.container.registry().contains(&key)
            && self.container.catalog().is_constructible(spec.type_id)
        {
            let registration = Registration::type_map(
                key.clone(),
                Lifetime::Transient,
                spec.type_id,
                spec.type_name,
                TypeClass::Class,
            );
            match self.container.registry().add(registration) {
                Ok(()) => {
                    debug!(key = %key, "auto-registered transient self-map")
                }
                // A concurrent resolution won the race; use its entry.
                Err(ContainerError::AlreadyRegistered(_)) => {}
                Err(err) => return Err(err),
            }
        }

        self.resolve_key(&key)
    }
}
