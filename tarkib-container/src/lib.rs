//! Core container implementation for Tarkib DI.

pub mod cache;
pub mod container;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod module;
pub mod registration;
pub mod registry;
pub(crate) mod resolver;
pub mod typeinfo;

pub use container::prelude;
pub use container::Container;
pub use error::{ContainerError, Result};
pub use key::ServiceKey;
pub use lifetime::Lifetime;
pub use module::Module;
pub use typeinfo::{ClassInfo, Svc, TypeCatalog, TypeClass};
