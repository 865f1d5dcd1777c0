//! # The Container — heart of Tarkib
//!
//! The service-resolution container that materializes and manages the
//! lifecycle of your application's services.
//!
//! # Architecture
//! ```text
//! registration calls ──> ServiceRegistry        (descriptors only)
//!                            │
//! resolve::<T>() ──> SingletonCache ──> Resolution engine
//!                                            │
//!                                       TypeCatalog   (constructor table)
//! ```
//!
//! # Examples
//! ```rust
//! use tarkib_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//!
//! struct UserService {
//!     logger: Svc<dyn Logger>,
//! }
//!
//! let container = Container::new();
//! container.declare_interface::<dyn Logger>();
//! container.describe_class(
//!     ClassInfo::<ConsoleLogger>::new()
//!         .constructor(|| ConsoleLogger)
//!         .implements::<dyn Logger>(|l| l),
//! );
//! container.describe_class(
//!     ClassInfo::<UserService>::new()
//!         .constructor(|logger: Svc<dyn Logger>| UserService { logger }),
//! );
//!
//! container
//!     .add_type_map::<dyn Logger, ConsoleLogger>(Lifetime::Singleton)
//!     .expect("register logger");
//! container
//!     .add_type_map::<UserService, UserService>(Lifetime::Transient)
//!     .expect("register service");
//!
//! let service: Svc<UserService> = container.resolve().expect("resolve");
//! service.logger.log("ready");
//! ```

use std::any::{TypeId, type_name};
use std::fmt;

use tracing::{debug, trace};

use crate::cache::SingletonCache;
use crate::error::{ContainerError, NotRegisteredError, Result};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::module::Module;
use crate::registration::{FactoryFn, Registration};
use crate::registry::ServiceRegistry;
use crate::resolver::Resolution;
use crate::typeinfo::{ClassInfo, Svc, TypeCatalog, TypeClass, erase, extract};

use tarkib_support::rendering::suggest_similar;
use std::sync::Arc;

/// Thread-safe service-resolution container.
///
/// The container composes three parts: a [`ServiceRegistry`] of
/// descriptors, a [`SingletonCache`] of materialized values, and a
/// [`TypeCatalog`] describing constructible types. All methods take
/// `&self`; share the container behind an [`Arc`] and pass it explicitly
/// — there is no ambient global container.
///
/// Per key, the life cycle is `Unregistered → Registered →
/// [Materialized] → Unregistered`: registration stores a descriptor
/// only, Singleton keys materialize at most once on first resolve, and
/// [`clear`](Container::clear) returns every key to unregistered.
pub struct Container {
    registry: ServiceRegistry,
    cache: SingletonCache,
    catalog: TypeCatalog,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            registry: ServiceRegistry::new(),
            cache: SingletonCache::new(),
            catalog: TypeCatalog::new(),
        }
    }

    pub(crate) fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub(crate) fn cache(&self) -> &SingletonCache {
        &self.cache
    }

    pub(crate) fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    // ── Type descriptions ──

    /// Stores a class description in the catalog.
    ///
    /// Descriptions are not registrations: they survive
    /// [`clear`](Container::clear) and by themselves make nothing
    /// resolvable.
    pub fn describe_class<T: Send + Sync + 'static>(&self, info: ClassInfo<T>) {
        self.catalog.describe_class(info);
    }

    /// Declares `T` as an interface-like type in the catalog.
    pub fn declare_interface<T: ?Sized + Send + Sync + 'static>(&self) {
        self.catalog.declare_interface::<T>();
    }

    // ── Instance registration ──

    /// Registers a pre-built value as a singleton under the default
    /// binding. The handle is shared: the registrant keeps its own
    /// references and the container never owns the value.
    pub fn add_singleton<T: ?Sized + Send + Sync + 'static>(
        &self,
        instance: Svc<T>,
    ) -> Result<()> {
        self.add_singleton_named("", instance)
    }

    /// Registers a pre-built value as a singleton under `name`.
    pub fn add_singleton_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
        instance: Svc<T>,
    ) -> Result<()> {
        let key = ServiceKey::named::<T>(name);
        self.registry
            .add(Registration::instance(key.clone(), false))?;
        // Instances go into the cache at registration time; resolution
        // only ever reads them back.
        self.cache.put_shared(key, erase(instance));
        Ok(())
    }

    /// Registers a pre-built value as a singleton, transferring
    /// ownership to the container: the value is released on
    /// [`clear`](Container::clear) or container teardown.
    pub fn add_owned_singleton<T: Send + Sync + 'static>(
        &self,
        instance: T,
    ) -> Result<()> {
        self.add_owned_singleton_named("", instance)
    }

    /// Named variant of [`add_owned_singleton`](Container::add_owned_singleton).
    pub fn add_owned_singleton_named<T: Send + Sync + 'static>(
        &self,
        name: &str,
        instance: T,
    ) -> Result<()> {
        let key = ServiceKey::named::<T>(name);
        self.registry
            .add(Registration::instance(key.clone(), true))?;
        self.cache.put_owned(key, erase(Svc::new(instance)));
        Ok(())
    }

    // ── Factory registration ──

    /// Registers a factory under the default binding. Singleton
    /// lifetimes invoke the factory once and cache the result as a
    /// shared handle; transient lifetimes invoke it on every resolve.
    pub fn add_factory<T: ?Sized + Send + Sync + 'static>(
        &self,
        lifetime: Lifetime,
        factory: impl Fn() -> Svc<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.add_factory_named("", lifetime, factory)
    }

    /// Registers a factory under `name`.
    pub fn add_factory_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
        lifetime: Lifetime,
        factory: impl Fn() -> Svc<T> + Send + Sync + 'static,
    ) -> Result<()> {
        let key = ServiceKey::named::<T>(name);
        let produce: FactoryFn = Arc::new(move || erase(factory()));
        self.registry
            .add(Registration::factory(key, lifetime, produce))
    }

    // ── Type-map registration ──

    /// Maps requests for service `S` to constructed instances of
    /// implementation `I`, under the default binding.
    ///
    /// `I` must be described in the catalog (constructors and, when `S`
    /// differs from `I`, an `implements` conversion to `S`) by the time
    /// the first resolve runs.
    pub fn add_type_map<S, I>(&self, lifetime: Lifetime) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        self.add_type_map_named::<S, I>("", lifetime)
    }

    /// Maps requests for service `S` under `name` to implementation `I`.
    pub fn add_type_map_named<S, I>(
        &self,
        name: &str,
        lifetime: Lifetime,
    ) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        let key = ServiceKey::named::<S>(name);
        // Ownership of a cached constructed singleton follows the
        // service's classification: class-like services are
        // container-owned, interface-like are shared. Self-maps are
        // class requests by definition.
        let service_class = if TypeId::of::<S>() == TypeId::of::<I>() {
            TypeClass::Class
        } else {
            self.catalog
                .classify(TypeId::of::<S>())
                .unwrap_or(TypeClass::Interface)
        };
        self.registry.add(Registration::type_map(
            key,
            lifetime,
            TypeId::of::<I>(),
            type_name::<I>(),
            service_class,
        ))
    }

    // ── Modules ──

    /// Applies a module's registrations immediately. The module is not
    /// retained.
    pub fn add_module(&self, module: &dyn Module) -> Result<()> {
        debug!(module = module.name(), "applying module");
        module.register(self)
    }

    /// Applies several modules in order, stopping at the first failure.
    pub fn add_modules(&self, modules: &[&dyn Module]) -> Result<()> {
        for module in modules {
            self.add_module(*module)?;
        }
        Ok(())
    }

    // ── Resolution ──

    /// Resolves the default binding of `T`.
    ///
    /// ```rust,ignore
    /// let db: Svc<Database> = container.resolve()?;
    /// ```
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Svc<T>> {
        self.resolve_named("")
    }

    /// Resolves the binding of `T` under `name` (case-insensitive).
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Svc<T>> {
        let key = ServiceKey::named::<T>(name);
        trace!(key = %key, "resolving");

        let resolution = Resolution::new(self);
        let handle = resolution.resolve_key(&key)?;

        extract::<T>(&handle).ok_or(ContainerError::TypeMismatch { key })
    }

    /// Like [`resolve`](Container::resolve), but collapses every failure
    /// — unregistered key or failed construction alike — to `None`.
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Svc<T>> {
        self.try_resolve_named("")
    }

    /// Named variant of [`try_resolve`](Container::try_resolve).
    pub fn try_resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Option<Svc<T>> {
        self.resolve_named(name).ok()
    }

    /// Whether the default binding of `T` is registered.
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.is_registered_named::<T>("")
    }

    /// Whether the binding of `T` under `name` is registered.
    pub fn is_registered_named<T: ?Sized + 'static>(&self, name: &str) -> bool {
        self.registry.contains(&ServiceKey::named::<T>(name))
    }

    /// Removes every registration and empties the singleton cache,
    /// releasing owned values. Type descriptions are kept, so services
    /// can be re-registered afterwards.
    pub fn clear(&self) {
        debug!("clearing container");
        self.registry.clear();
        self.cache.clear();
    }

    // ── Internal ──

    pub(crate) fn not_registered(
        &self,
        key: &ServiceKey,
        required_by: Option<ServiceKey>,
    ) -> ContainerError {
        ContainerError::NotRegistered(NotRegisteredError {
            requested: key.clone(),
            required_by,
            suggestions: self.find_suggestions(key),
        })
    }

    fn find_suggestions(&self, key: &ServiceKey) -> Vec<ServiceKey> {
        let registered = self.registry.registered_keys();
        let names: Vec<&str> =
            registered.iter().map(|k| k.type_name()).collect();
        let picked = suggest_similar(key.type_name(), &names, 3);
        registered
            .into_iter()
            .filter(|k| {
                *k != *key && picked.iter().any(|name| name == k.type_name())
            })
            .collect()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.registry.len())
            .field("materialized", &self.cache.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::Container;
    pub use crate::error::{ContainerError, Result};
    pub use crate::key::ServiceKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::module::Module;
    pub use crate::typeinfo::{ClassInfo, Svc, TypeCatalog, TypeClass};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Logger: Send + Sync {
        fn log(&self, msg: &str);
    }

    struct ConsoleLogger;
    impl Logger for ConsoleLogger {
        fn log(&self, _msg: &str) {}
    }

    #[test]
    fn resolve_singleton_instance() {
        let container = Container::new();
        container.add_singleton::<i32>(Svc::new(42)).unwrap();

        let a = container.resolve::<i32>().unwrap();
        let b = container.resolve::<i32>().unwrap();
        assert_eq!(*a, 42);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn resolve_interface_instance() {
        let container = Container::new();
        container
            .add_singleton::<dyn Logger>(Arc::new(ConsoleLogger))
            .unwrap();

        let logger = container.resolve::<dyn Logger>().unwrap();
        logger.log("hello");
    }

    #[test]
    fn duplicate_registration_fails() {
        let container = Container::new();
        container.add_singleton::<i32>(Svc::new(1)).unwrap();

        let err = container.add_singleton::<i32>(Svc::new(2)).unwrap_err();
        assert!(matches!(err, ContainerError::AlreadyRegistered(_)));
    }

    #[test]
    fn same_type_under_different_name_succeeds() {
        let container = Container::new();
        container
            .add_singleton_named::<i32>("first", Svc::new(1))
            .unwrap();
        container
            .add_singleton_named::<i32>("second", Svc::new(2))
            .unwrap();

        assert_eq!(*container.resolve_named::<i32>("first").unwrap(), 1);
        assert_eq!(*container.resolve_named::<i32>("second").unwrap(), 2);
    }

    #[test]
    fn names_resolve_case_insensitively() {
        let container = Container::new();
        container
            .add_singleton_named::<i32>("Primary", Svc::new(7))
            .unwrap();

        assert_eq!(*container.resolve_named::<i32>("PRIMARY").unwrap(), 7);
        assert!(container.is_registered_named::<i32>("primary"));
    }

    #[test]
    fn resolve_unregistered_fails() {
        let container = Container::new();

        let err = container.resolve::<i32>().unwrap_err();
        match err {
            ContainerError::NotRegistered(e) => {
                assert!(e.requested.type_name().contains("i32"));
            }
            other => panic!("expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn try_resolve_unregistered_is_none() {
        let container = Container::new();
        assert!(container.try_resolve::<i32>().is_none());
    }

    #[test]
    fn transient_factory_creates_new_each_time() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        container
            .add_factory::<usize>(Lifetime::Transient, {
                let counter = counter.clone();
                move || Svc::new(counter.fetch_add(1, Ordering::SeqCst))
            })
            .unwrap();

        let a = container.resolve::<usize>().unwrap();
        let b = container.resolve::<usize>().unwrap();
        assert_eq!(*a, 0);
        assert_eq!(*b, 1);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn singleton_factory_called_once() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        container
            .add_factory::<i32>(Lifetime::Singleton, {
                let counter = counter.clone();
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Svc::new(42)
                }
            })
            .unwrap();

        let a = container.resolve::<i32>().unwrap();
        let b = container.resolve::<i32>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn type_map_constructs_and_converts() {
        struct Audit {
            logger: Svc<dyn Logger>,
        }

        let container = Container::new();
        container.declare_interface::<dyn Logger>();
        container.describe_class(
            ClassInfo::<ConsoleLogger>::new()
                .constructor(|| ConsoleLogger)
                .implements::<dyn Logger>(|l| l),
        );
        container.describe_class(
            ClassInfo::<Audit>::new()
                .constructor(|logger: Svc<dyn Logger>| Audit { logger }),
        );

        container
            .add_type_map::<dyn Logger, ConsoleLogger>(Lifetime::Singleton)
            .unwrap();
        container
            .add_type_map::<Audit, Audit>(Lifetime::Transient)
            .unwrap();

        let audit = container.resolve::<Audit>().unwrap();
        audit.logger.log("constructed");
    }

    #[test]
    fn richest_constructor_wins() {
        struct Gauge;
        struct Meter;
        struct Dashboard {
            parts: usize,
        }

        let container = Container::new();
        container.describe_class(ClassInfo::<Gauge>::new().constructor(|| Gauge));
        container.describe_class(ClassInfo::<Meter>::new().constructor(|| Meter));
        container.describe_class(
            ClassInfo::<Dashboard>::new()
                .constructor(|| Dashboard { parts: 0 })
                .constructor(|_g: Svc<Gauge>, _m: Svc<Meter>| Dashboard {
                    parts: 2,
                }),
        );
        container
            .add_type_map::<Dashboard, Dashboard>(Lifetime::Transient)
            .unwrap();

        // Both parameters are constructible classes, so the richer
        // constructor is eligible and must win over the parameterless one.
        let dashboard = container.resolve::<Dashboard>().unwrap();
        assert_eq!(dashboard.parts, 2);
    }

    #[test]
    fn falls_back_to_parameterless_constructor() {
        trait Missing: Send + Sync {}

        struct Fallback {
            rich: bool,
        }

        let container = Container::new();
        container.declare_interface::<dyn Missing>();
        container.describe_class(
            ClassInfo::<Fallback>::new()
                .constructor(|| Fallback { rich: false })
                .constructor(|_m: Svc<dyn Missing>| Fallback { rich: true }),
        );
        container
            .add_type_map::<Fallback, Fallback>(Lifetime::Transient)
            .unwrap();

        // `dyn Missing` is neither registered nor constructible, so the
        // one-parameter constructor is ineligible.
        let fallback = container.resolve::<Fallback>().unwrap();
        assert!(!fallback.rich);
    }

    #[test]
    fn auto_registers_constructible_class_parameters() {
        struct Engine;
        struct Car {
            #[allow(dead_code)]
            engine: Svc<Engine>,
        }

        let container = Container::new();
        container.describe_class(ClassInfo::<Engine>::new().constructor(|| Engine));
        container.describe_class(
            ClassInfo::<Car>::new()
                .constructor(|engine: Svc<Engine>| Car { engine }),
        );
        container
            .add_type_map::<Car, Car>(Lifetime::Transient)
            .unwrap();

        assert!(!container.is_registered::<Engine>());
        let a = container.resolve::<Car>().unwrap();
        let b = container.resolve::<Car>().unwrap();

        // The parameter was self-mapped as transient: now registered,
        // and each car got its own engine.
        assert!(container.is_registered::<Engine>());
        assert!(!Arc::ptr_eq(&a.engine, &b.engine));
    }

    #[test]
    fn clear_unregisters_and_releases() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Owned;
        impl Drop for Owned {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let container = Container::new();
        container.add_owned_singleton(Owned).unwrap();
        container.add_singleton::<i32>(Svc::new(1)).unwrap();

        assert!(container.is_registered::<Owned>());
        container.clear();

        assert!(!container.is_registered::<Owned>());
        assert!(!container.is_registered::<i32>());
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);

        // Double clear must not double-release.
        container.clear();
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);

        // Cleared keys can be registered again.
        container.add_singleton::<i32>(Svc::new(2)).unwrap();
        assert_eq!(*container.resolve::<i32>().unwrap(), 2);
    }

    #[test]
    fn constructed_class_singleton_released_on_clear() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Built;
        impl Drop for Built {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let container = Container::new();
        container.describe_class(ClassInfo::<Built>::new().constructor(|| Built));
        container
            .add_type_map::<Built, Built>(Lifetime::Singleton)
            .unwrap();

        {
            let first = container.resolve::<Built>().unwrap();
            let second = container.resolve::<Built>().unwrap();
            assert!(Arc::ptr_eq(&first, &second));
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 0);

        container.clear();
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn circular_type_maps_fail_fast() {
        #[derive(Debug)]
        struct Yin {
            #[allow(dead_code)]
            other: Svc<Yang>,
        }
        #[derive(Debug)]
        struct Yang {
            #[allow(dead_code)]
            other: Svc<Yin>,
        }

        let container = Container::new();
        container.describe_class(
            ClassInfo::<Yin>::new().constructor(|other: Svc<Yang>| Yin { other }),
        );
        container.describe_class(
            ClassInfo::<Yang>::new().constructor(|other: Svc<Yin>| Yang { other }),
        );
        container
            .add_type_map::<Yin, Yin>(Lifetime::Transient)
            .unwrap();
        container
            .add_type_map::<Yang, Yang>(Lifetime::Transient)
            .unwrap();

        let err = container.resolve::<Yin>().unwrap_err();
        match err {
            ContainerError::CircularDependency(e) => {
                assert!(e.chain.len() >= 3);
                let msg = format!("{e}");
                assert!(msg.contains("Yin"));
                assert!(msg.contains("Yang"));
            }
            other => panic!("expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn not_registered_error_suggests_similar() {
        struct UserService;
        #[derive(Debug)]
        struct UserServise; // deliberate near-miss

        let container = Container::new();
        container
            .add_factory::<UserService>(Lifetime::Transient, || {
                Svc::new(UserService)
            })
            .unwrap();

        let err = container.resolve::<UserServise>().unwrap_err();
        match err {
            ContainerError::NotRegistered(e) => {
                assert!(
                    e.suggestions
                        .iter()
                        .any(|k| k.type_name().contains("UserService"))
                );
            }
            other => panic!("expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn debug_display() {
        let container = Container::new();
        container.add_singleton::<i32>(Svc::new(1)).unwrap();
        container
            .add_singleton::<String>(Svc::new(String::from("x")))
            .unwrap();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("2"));
    }
}
