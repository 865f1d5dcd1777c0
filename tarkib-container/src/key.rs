//! Service identification keys.
//!
//! [`ServiceKey`] uniquely identifies a registration within the container.
//! It combines a [`TypeId`] with an optional name for named bindings.
//! Names compare case-insensitively, so `"Primary"` and `"primary"` are
//! the same binding.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Uniquely identifies a service registration in the container.
///
/// Each registration is identified by its Rust type ([`TypeId`]) and an
/// optional name for cases where multiple bindings of the same type
/// are needed. An empty name is the default (unnamed) binding.
///
/// # Examples
/// ```
/// use tarkib_container::key::ServiceKey;
///
/// // Default binding — just a type
/// let key = ServiceKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert_eq!(key.name(), None);
///
/// // Named key — type + case-insensitive name
/// let key = ServiceKey::named::<String>("Primary");
/// assert_eq!(key, ServiceKey::named::<String>("primary"));
/// ```
#[derive(Clone)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
}

impl ServiceKey {
    /// Creates a key for type `T` with the default (unnamed) binding.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: None,
        }
    }

    /// Creates a named key for type `T`.
    ///
    /// An empty `name` produces the default binding, so
    /// `ServiceKey::named::<T>("")` equals `ServiceKey::of::<T>()`.
    ///
    /// # Examples
    /// ```
    /// use tarkib_container::key::ServiceKey;
    ///
    /// let primary = ServiceKey::named::<String>("primary_db");
    /// let replica = ServiceKey::named::<String>("replica_db");
    /// assert_ne!(primary, replica);
    /// ```
    #[inline]
    pub fn named<T: ?Sized + 'static>(name: &str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: if name.is_empty() {
                None
            } else {
                Some(Arc::from(name))
            },
        }
    }

    /// Creates a key from a raw [`TypeId`] and type name, default binding.
    ///
    /// Prefer [`ServiceKey::of`] when possible — this is for type-erased
    /// call sites that only hold a type handle.
    #[inline]
    pub fn from_raw(type_id: TypeId, type_name: &'static str) -> Self {
        Self { type_id, type_name, name: None }
    }

    /// Returns the [`TypeId`] of the service type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the human-readable type name, as shown in error output
    /// and suggestions.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the optional binding name, as originally written.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

// PartialEq: keys are equal when the TypeId matches AND the names match
// ignoring ASCII case.
impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        if self.type_id != other.type_id {
            return false;
        }
        match (&self.name, &other.name) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

impl Eq for ServiceKey {}

// Hash must agree with the case-insensitive Eq: hash lowercased name bytes.
impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        match &self.name {
            None => state.write_u8(0),
            Some(name) => {
                state.write_u8(1);
                for b in name.bytes() {
                    state.write_u8(b.to_ascii_lowercase());
                }
            }
        }
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "ServiceKey({}, name={:?})", self.type_name, name),
            None => write!(f, "ServiceKey({})", self.type_name),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (name={:?})", self.type_name, name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MyStruct;

    #[test]
    fn key_of_type() {
        let key = ServiceKey::of::<MyStruct>();
        assert!(key.type_name().contains("MyStruct"));
        assert_eq!(key.name(), None);
    }

    #[test]
    fn key_equality_same_type() {
        assert_eq!(ServiceKey::of::<String>(), ServiceKey::of::<String>());
    }

    #[test]
    fn key_inequality_different_types() {
        assert_ne!(ServiceKey::of::<String>(), ServiceKey::of::<i32>());
    }

    #[test]
    fn named_keys_different() {
        let k1 = ServiceKey::named::<String>("a");
        let k2 = ServiceKey::named::<String>("b");
        assert_ne!(k1, k2);
    }

    #[test]
    fn named_vs_unnamed_different() {
        assert_ne!(
            ServiceKey::named::<String>("a"),
            ServiceKey::of::<String>()
        );
    }

    #[test]
    fn empty_name_is_default_binding() {
        assert_eq!(ServiceKey::named::<String>(""), ServiceKey::of::<String>());
    }

    #[test]
    fn names_compare_case_insensitively() {
        let upper = ServiceKey::named::<String>("Primary");
        let lower = ServiceKey::named::<String>("primary");
        assert_eq!(upper, lower);

        use std::collections::hash_map::DefaultHasher;
        let mut h1 = DefaultHasher::new();
        let mut h2 = DefaultHasher::new();
        upper.hash(&mut h1);
        lower.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn key_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ServiceKey::of::<String>(), "string");
        map.insert(ServiceKey::named::<String>("DB"), "named");
        assert_eq!(map.get(&ServiceKey::of::<String>()), Some(&"string"));
        assert_eq!(map.get(&ServiceKey::named::<String>("db")), Some(&"named"));
        assert_eq!(map.get(&ServiceKey::of::<bool>()), None);
    }

    #[test]
    fn unsized_type_key() {
        // dyn traits work as keys
        trait MyTrait {}
        let _key = ServiceKey::of::<dyn MyTrait>();
    }
}
