//! Type information catalog — the introspection surface the resolver
//! consumes.
//!
//! Rust has no runtime reflection, so constructor scanning is replaced by
//! a registration-time constructor table: each class-like type is described
//! once with its constructors (plain functions or closures taking [`Svc`]
//! parameters) and the trait objects it can be converted to. The resolver
//! asks the catalog four things and nothing more:
//!
//! - classify a type handle as interface-like or class-like,
//! - enumerate a class's declared constructors and their parameter types,
//! - invoke a chosen constructor with resolved arguments,
//! - convert a built instance to a requested service type.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{ContainerError, Result};
use crate::key::ServiceKey;

/// Reference-counted service pointer. Everything the container hands out
/// is an `Svc<T>`; for trait objects that reads `Svc<dyn MyTrait>`.
pub type Svc<T> = Arc<T>;

/// Type-erased service handle. Always wraps an [`Svc<T>`], never a bare
/// value, so typed extraction is a single downcast.
pub type AnyHandle = Arc<dyn Any + Send + Sync>;

/// Erases a service pointer into an [`AnyHandle`].
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(svc: Svc<T>) -> AnyHandle {
    Arc::new(svc)
}

/// Recovers a typed service pointer from an [`AnyHandle`].
///
/// Returns `None` if the handle wraps a different type.
pub(crate) fn extract<T: ?Sized + Send + Sync + 'static>(
    handle: &AnyHandle,
) -> Option<Svc<T>> {
    handle.downcast_ref::<Svc<T>>().cloned()
}

/// Classification of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// A trait object — resolved through conversions declared by its
    /// implementations, shared by reference counting.
    Interface,
    /// A concrete struct — constructible from its declared constructors;
    /// singleton instances built by the container are container-owned.
    Class,
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeClass::Interface => write!(f, "interface"),
            TypeClass::Class => write!(f, "class"),
        }
    }
}

/// Declared type of a single constructor parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl ParamSpec {
    /// The spec for a parameter of type [`Svc<T>`].
    #[inline]
    pub fn of<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// The default-binding service key this parameter resolves through.
    /// Constructor parameters always use the unnamed binding.
    pub(crate) fn key(&self) -> ServiceKey {
        ServiceKey::from_raw(self.type_id, self.type_name)
    }
}

/// Supplies constructor arguments during materialization. Implemented by
/// the resolver; constructors never see the container directly.
pub trait ArgSource {
    /// Resolves one parameter to a type-erased handle.
    fn resolve_arg(&self, spec: &ParamSpec) -> Result<AnyHandle>;
}

/// A type that can appear as a constructor parameter.
///
/// Implemented for [`Svc<T>`] (including `Svc<dyn Trait>`): the parameter
/// declares its service key and knows how to pull itself out of an
/// [`ArgSource`].
pub trait Dependency: Sized + 'static {
    /// Declared parameter type, used by the selection phase.
    fn spec() -> ParamSpec;

    /// Resolves the parameter value. Only called during materialization.
    fn resolve(source: &dyn ArgSource) -> Result<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Svc<T> {
    fn spec() -> ParamSpec {
        ParamSpec::of::<T>()
    }

    fn resolve(source: &dyn ArgSource) -> Result<Self> {
        let spec = Self::spec();
        let handle = source.resolve_arg(&spec)?;
        extract::<T>(&handle)
            .ok_or(ContainerError::TypeMismatch { key: spec.key() })
    }
}

type BuildFn = Arc<dyn Fn(&dyn ArgSource) -> Result<AnyHandle> + Send + Sync>;

/// One declared constructor: a parameter list plus an erased build closure.
///
/// The parameter list drives the pure selection phase; the build closure
/// runs only for the winning constructor.
#[derive(Clone)]
pub struct Constructor {
    params: Vec<ParamSpec>,
    build: BuildFn,
}

impl Constructor {
    /// Wraps a plain function or closure as a constructor. Any function
    /// of up to 12 [`Svc`] parameters qualifies.
    pub fn of<A, T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: ConstructorFn<A, T>,
    {
        Constructor {
            params: F::params(),
            build: Arc::new(move |source| Ok(erase(Svc::new(f.invoke(source)?)))),
        }
    }

    /// Number of declared parameters.
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Declared parameter types, in order.
    #[inline]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Invokes the constructor, resolving each parameter through `source`.
    pub(crate) fn build(&self, source: &dyn ArgSource) -> Result<AnyHandle> {
        (self.build)(source)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}

/// A function usable as a constructor: each argument is a [`Dependency`]
/// and the return value is the constructed instance.
///
/// # Type parameters
/// * `A` - the parameter types as a tuple.
/// * `T` - the constructed type.
pub trait ConstructorFn<A, T>: Send + Sync + 'static {
    /// Declared parameter specs, in argument order.
    fn params() -> Vec<ParamSpec>;

    /// Resolves each argument from `source`, then calls the function.
    fn invoke(&self, source: &dyn ArgSource) -> Result<T>;
}

macro_rules! impl_constructor_fn {
    () => {
        impl_constructor_fn!(@impl);
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_constructor_fn!(@impl $first $(, $rest)*);
        impl_constructor_fn!($($rest),*);
    };
    (@impl $($param:ident),*) => {
        impl<F, T $(, $param)*> ConstructorFn<($($param,)*), T> for F
        where
            F: Fn($($param),*) -> T + Send + Sync + 'static,
            T: Send + Sync + 'static,
            $($param: Dependency,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$($param::spec()),*]
            }

            #[allow(non_snake_case)]
            fn invoke(&self, source: &dyn ArgSource) -> Result<T> {
                $(let $param = $param::resolve(source)?;)*
                let _ = &source;
                Ok(self($($param),*))
            }
        }
    };
}

impl_constructor_fn!(P0, P1, P2, P3, P4, P5, P6, P7, P8, P9, P10, P11);

type CastFn = Arc<dyn Fn(&AnyHandle) -> Option<AnyHandle> + Send + Sync>;

/// Erased description of one type: its classification, constructors, and
/// the service types its instances can be converted to.
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    type_class: TypeClass,
    constructors: Vec<Constructor>,
    casts: HashMap<TypeId, CastFn>,
}

impl TypeDescriptor {
    /// The described type's handle.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The described type's name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Interface-like or class-like.
    #[inline]
    pub fn type_class(&self) -> TypeClass {
        self.type_class
    }

    /// Declared constructors, in declaration order.
    #[inline]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Whether the resolver can build an instance of this type.
    pub fn is_constructible(&self) -> bool {
        self.type_class == TypeClass::Class && !self.constructors.is_empty()
    }

    /// Converts an instance handle to the `target` service type, if this
    /// type declared that it satisfies it. Covers both trait-object
    /// support and declared base-type assignability.
    pub(crate) fn cast_to(
        &self,
        target: TypeId,
        handle: &AnyHandle,
    ) -> Option<AnyHandle> {
        self.casts.get(&target).and_then(|cast| cast(handle))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("type_class", &self.type_class)
            .field("constructors", &self.constructors.len())
            .field("casts", &self.casts.len())
            .finish()
    }
}

/// Typed builder for a class description.
///
/// # Examples
/// ```
/// use tarkib_container::typeinfo::{ClassInfo, Svc, TypeCatalog};
///
/// trait Greeter: Send + Sync {}
///
/// struct English;
/// impl Greeter for English {}
///
/// struct App {
///     greeter: Svc<dyn Greeter>,
/// }
///
/// let catalog = TypeCatalog::new();
/// catalog.declare_interface::<dyn Greeter>();
/// catalog.describe_class(
///     ClassInfo::<English>::new()
///         .constructor(|| English)
///         .implements::<dyn Greeter>(|e| e),
/// );
/// catalog.describe_class(
///     ClassInfo::<App>::new()
///         .constructor(|greeter: Svc<dyn Greeter>| App { greeter }),
/// );
/// ```
pub struct ClassInfo<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ClassInfo<T> {
    /// Starts describing class `T`.
    pub fn new() -> Self {
        Self {
            descriptor: TypeDescriptor {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                type_class: TypeClass::Class,
                constructors: Vec::new(),
                casts: HashMap::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Declares a constructor. Declaration order breaks arity ties during
    /// selection (first declared wins).
    pub fn constructor<A, F>(mut self, f: F) -> Self
    where
        F: ConstructorFn<A, T>,
    {
        self.descriptor.constructors.push(Constructor::of(f));
        self
    }

    /// Declares that instances of `T` satisfy service type `S`, with the
    /// conversion to apply. For trait objects the conversion is usually
    /// the identity unsizing: `.implements::<dyn Greeter>(|svc| svc)`.
    pub fn implements<S: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: fn(Svc<T>) -> Svc<S>,
    ) -> Self {
        let caster: CastFn = Arc::new(move |handle| {
            extract::<T>(handle).map(|svc| erase(cast(svc)))
        });
        self.descriptor.casts.insert(TypeId::of::<S>(), caster);
        self
    }
}

impl<T: Send + Sync + 'static> Default for ClassInfo<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of type descriptions, shared by every resolution.
///
/// Populated up front (typically right before or alongside service
/// registration) and read concurrently during resolves. Descriptions are
/// not registrations: [`clear`](crate::Container::clear) on the container
/// leaves the catalog intact.
pub struct TypeCatalog {
    types: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl TypeCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Stores a class description, replacing any previous description of
    /// the same type.
    pub fn describe_class<T: Send + Sync + 'static>(&self, info: ClassInfo<T>) {
        let descriptor = info.descriptor;
        debug!(
            type_name = descriptor.type_name,
            constructors = descriptor.constructors.len(),
            "described class"
        );
        self.types
            .write()
            .insert(descriptor.type_id, Arc::new(descriptor));
    }

    /// Declares `T` as interface-like. Interfaces have no constructors;
    /// they are satisfied by class descriptions via
    /// [`ClassInfo::implements`].
    pub fn declare_interface<T: ?Sized + Send + Sync + 'static>(&self) {
        let descriptor = TypeDescriptor {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            type_class: TypeClass::Interface,
            constructors: Vec::new(),
            casts: HashMap::new(),
        };
        debug!(type_name = descriptor.type_name, "declared interface");
        self.types
            .write()
            .insert(descriptor.type_id, Arc::new(descriptor));
    }

    /// Classifies a type handle, if it has been described.
    pub fn classify(&self, type_id: TypeId) -> Option<TypeClass> {
        self.types.read().get(&type_id).map(|d| d.type_class)
    }

    /// Whether the type is a described class with at least one
    /// constructor.
    pub fn is_constructible(&self, type_id: TypeId) -> bool {
        self.types
            .read()
            .get(&type_id)
            .is_some_and(|d| d.is_constructible())
    }

    /// Looks up a description. The returned handle outlives the internal
    /// lock, so callers never hold it across a recursive resolve.
    pub(crate) fn descriptor(&self, type_id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(&type_id).cloned()
    }

    /// Number of described types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Returns true if nothing has been described.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("described", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Speaker: Send + Sync {
        fn say(&self) -> &'static str;
    }

    struct Dog;
    impl Speaker for Dog {
        fn say(&self) -> &'static str {
            "woof"
        }
    }

    struct Kennel {
        dog: Svc<Dog>,
    }

    // ArgSource stub that serves pre-built handles by TypeId.
    struct FixedArgs(HashMap<TypeId, AnyHandle>);

    impl ArgSource for FixedArgs {
        fn resolve_arg(&self, spec: &ParamSpec) -> Result<AnyHandle> {
            self.0.get(&spec.type_id).cloned().ok_or_else(|| {
                ContainerError::TypeMismatch { key: spec.key() }
            })
        }
    }

    #[test]
    fn erase_extract_roundtrip() {
        let svc: Svc<dyn Speaker> = Arc::new(Dog);
        let handle = erase(svc);
        let back = extract::<dyn Speaker>(&handle).unwrap();
        assert_eq!(back.say(), "woof");
    }

    #[test]
    fn extract_wrong_type_is_none() {
        let handle = erase(Svc::new(Dog));
        assert!(extract::<Kennel>(&handle).is_none());
    }

    #[test]
    fn constructor_declares_params_in_order() {
        let ctor = Constructor::of(|dog: Svc<Dog>, _n: Svc<String>| {
            let _ = dog;
            Kennel { dog: Arc::new(Dog) }
        });
        assert_eq!(ctor.arity(), 2);
        assert_eq!(ctor.params()[0].type_id, TypeId::of::<Dog>());
        assert_eq!(ctor.params()[1].type_id, TypeId::of::<String>());
    }

    #[test]
    fn constructor_builds_from_arg_source() {
        let mut args = HashMap::new();
        args.insert(TypeId::of::<Dog>(), erase(Svc::new(Dog)));
        let source = FixedArgs(args);

        let ctor = Constructor::of(|dog: Svc<Dog>| Kennel { dog });
        let handle = ctor.build(&source).unwrap();
        let kennel = extract::<Kennel>(&handle).unwrap();
        assert_eq!(kennel.dog.say(), "woof");
    }

    #[test]
    fn zero_arg_constructor() {
        let ctor = Constructor::of(|| Dog);
        assert_eq!(ctor.arity(), 0);
        let source = FixedArgs(HashMap::new());
        assert!(ctor.build(&source).is_ok());
    }

    #[test]
    fn missing_arg_fails_build() {
        let ctor = Constructor::of(|dog: Svc<Dog>| Kennel { dog });
        let source = FixedArgs(HashMap::new());
        assert!(ctor.build(&source).is_err());
    }

    #[test]
    fn class_description_with_cast() {
        let catalog = TypeCatalog::new();
        catalog.declare_interface::<dyn Speaker>();
        catalog.describe_class(
            ClassInfo::<Dog>::new()
                .constructor(|| Dog)
                .implements::<dyn Speaker>(|d| d),
        );

        assert_eq!(
            catalog.classify(TypeId::of::<dyn Speaker>()),
            Some(TypeClass::Interface)
        );
        assert_eq!(catalog.classify(TypeId::of::<Dog>()), Some(TypeClass::Class));
        assert!(catalog.is_constructible(TypeId::of::<Dog>()));
        assert!(!catalog.is_constructible(TypeId::of::<dyn Speaker>()));

        let desc = catalog.descriptor(TypeId::of::<Dog>()).unwrap();
        let handle = erase(Svc::new(Dog));
        let cast = desc.cast_to(TypeId::of::<dyn Speaker>(), &handle).unwrap();
        let speaker = extract::<dyn Speaker>(&cast).unwrap();
        assert_eq!(speaker.say(), "woof");
    }

    #[test]
    fn cast_to_undeclared_target_is_none() {
        let catalog = TypeCatalog::new();
        catalog.describe_class(ClassInfo::<Dog>::new().constructor(|| Dog));

        let desc = catalog.descriptor(TypeId::of::<Dog>()).unwrap();
        let handle = erase(Svc::new(Dog));
        assert!(desc.cast_to(TypeId::of::<dyn Speaker>(), &handle).is_none());
    }

    #[test]
    fn unknown_type_is_unclassified() {
        let catalog = TypeCatalog::new();
        assert_eq!(catalog.classify(TypeId::of::<Dog>()), None);
        assert!(!catalog.is_constructible(TypeId::of::<Dog>()));
    }
}
