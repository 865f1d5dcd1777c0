//! # Tarkib — Service Resolution Container for Rust
//!
//! A runtime IoC container: register services by type (and optional
//! name), map traits to implementations, and let the resolver build the
//! whole object graph through declared constructors.
//!
//! ```
//! use tarkib::prelude::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 0 }
//! }
//!
//! let container = Container::new();
//! container.declare_interface::<dyn Clock>();
//! container.describe_class(
//!     ClassInfo::<FixedClock>::new()
//!         .constructor(|| FixedClock)
//!         .implements::<dyn Clock>(|c| c),
//! );
//! container
//!     .add_type_map::<dyn Clock, FixedClock>(Lifetime::Singleton)
//!     .unwrap();
//!
//! let clock: Svc<dyn Clock> = container.resolve().unwrap();
//! assert_eq!(clock.now(), 0);
//! ```

pub use tarkib_container::*;
pub use tarkib_support as support;
