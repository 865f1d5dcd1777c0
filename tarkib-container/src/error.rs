//! Error types for Tarkib container operations.
//!
//! Every failure names the key involved and, where possible, hints at
//! the fix.

use crate::key::ServiceKey;
use std::fmt;

use tarkib_support::rendering::render_chain;

/// Main error type for all Tarkib operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Requested service was never registered.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// Service was already registered under the same key.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// Circular dependency detected during resolve.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// Constructor selection found no constructor whose parameters can
    /// all be satisfied, and no zero-argument fallback exists.
    #[error("no usable constructor for {type_name}\n  Hint: register the missing parameter types, or declare a zero-argument constructor")]
    NoUsableConstructor {
        /// The implementation type that could not be constructed.
        type_name: &'static str,
    },

    /// A constructed implementation does not satisfy the requested
    /// service type.
    #[error("constructed {implementation} does not satisfy requested service {service}\n  Hint: declare the conversion with .implements() on the class description")]
    ImplementationMismatch {
        /// The service key that was requested.
        service: ServiceKey,
        /// The implementation type that was constructed and rejected.
        implementation: &'static str,
    },

    /// A type map points at an implementation the catalog knows nothing
    /// about.
    #[error("no type information for {type_name}\n  Hint: describe the class (and its constructors) in the catalog before mapping it")]
    MissingTypeInfo {
        /// The implementation type missing from the catalog.
        type_name: &'static str,
    },

    /// An instance registration has no cached value. Instances are placed
    /// into the singleton cache at registration time, so this indicates
    /// inconsistent container state.
    #[error("instance registration for {key} has no cached value")]
    InstanceMissing {
        /// The key whose cached instance disappeared.
        key: ServiceKey,
    },

    /// A resolved value could not be converted back to the requested
    /// Rust type.
    #[error("resolved value for {key} is not of the requested Rust type")]
    TypeMismatch {
        /// The key whose value failed the conversion.
        key: ServiceKey,
    },
}

/// Error when a service was not registered.
///
/// Carries the context for a useful message: who asked for the key,
/// and which registered keys look like near-misses.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The service that was requested
    pub requested: ServiceKey,
    /// What required this service (if known)
    pub required_by: Option<ServiceKey>,
    /// Registered keys similar enough to suggest
    pub suggestions: Vec<ServiceKey>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to register {}?",
            self.requested.type_name()
        )
    }
}

/// Error when trying to register a service that already exists.
///
/// Registration is fail-fast: an existing key is never silently replaced.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: ServiceKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already registered: {}", self.key)?;
        write!(
            f,
            "\n  Hint: register under a different name, or clear() the container first"
        )
    }
}

/// Error when a circular dependency is detected.
///
/// Carries the full chain, so the message shows where the cycle closes.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The chain of keys that forms the cycle, ending with the repeated
    /// key: `[A, B, A]`.
    pub chain: Vec<ServiceKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  ")?;

        let names: Vec<&str> =
            self.chain.iter().map(|k| k.type_name()).collect();
        write!(f, "{}", render_chain(&names))?;

        write!(
            f,
            "\n  Hint: Consider a factory registration or restructuring your dependencies"
        )
    }
}

/// Convenient Result type for Tarkib operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_registered_error_display() {
        let err = ContainerError::NotRegistered(NotRegisteredError {
            requested: ServiceKey::of::<String>(),
            required_by: Some(ServiceKey::of::<Vec<u8>>()),
            suggestions: vec![],
        });

        let msg = format!("{err}");
        assert!(msg.contains("not registered"));
        assert!(msg.contains("String"));
        assert!(msg.contains("Required by"));
    }

    #[test]
    fn not_registered_error_lists_suggestions() {
        let err = ContainerError::NotRegistered(NotRegisteredError {
            requested: ServiceKey::of::<String>(),
            required_by: None,
            suggestions: vec![ServiceKey::of::<i32>()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("Did you mean"));
        assert!(msg.contains("i32"));
    }

    #[test]
    fn already_registered_error_display() {
        let err = ContainerError::AlreadyRegistered(AlreadyRegisteredError {
            key: ServiceKey::named::<String>("primary"),
        });

        let msg = format!("{err}");
        assert!(msg.contains("already registered"));
        assert!(msg.contains("primary"));
    }

    #[test]
    fn circular_dependency_error_display() {
        let err = ContainerError::CircularDependency(CircularDependencyError {
            chain: vec![
                ServiceKey::of::<String>(),
                ServiceKey::of::<i32>(),
                ServiceKey::of::<String>(),
            ],
        });

        let msg = format!("{err}");
        assert!(msg.contains("Circular"));
        assert!(msg.contains("→"));
    }

    #[test]
    fn no_usable_constructor_display() {
        struct Widget;
        let err = ContainerError::NoUsableConstructor {
            type_name: std::any::type_name::<Widget>(),
        };

        let msg = format!("{err}");
        assert!(msg.contains("no usable constructor"));
        assert!(msg.contains("Widget"));
    }
}
