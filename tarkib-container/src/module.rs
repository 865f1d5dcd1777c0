//! Module trait — a unit of grouped registration logic.
//!
//! Modules group related registrations together, similar to Laravel's
//! ServiceProvider or .NET's `IServiceCollection` extension methods.
//!
//! # Examples
//! ```rust,ignore
//! struct DatabaseModule;
//!
//! impl Module for DatabaseModule {
//!     fn register(&self, container: &Container) -> Result<()> {
//!         container.add_factory::<Database>(Lifetime::Singleton, || {
//!             Arc::new(Database::connect("postgres://localhost"))
//!         })?;
//!         container.add_type_map::<dyn Repository, PostgresRepository>(
//!             Lifetime::Transient,
//!         )
//!     }
//! }
//! ```

use crate::container::Container;
use crate::error::Result;

/// A unit of related service registrations applied to a container.
///
/// A module is stateless from the container's point of view: it is
/// invoked once by [`Container::add_module`] and then discarded — the
/// container keeps no reference to it.
///
/// # Design Philosophy
/// Modules encourage splitting registrations by domain instead of one
/// giant registration block:
///
/// ```rust,ignore
/// container.add_modules(&[&DatabaseModule, &AuthModule, &EmailModule])?;
/// ```
pub trait Module: Send + Sync {
    /// Registers this module's services into the container.
    ///
    /// Called once; a failed registration aborts module application and
    /// is returned to the caller.
    fn register(&self, container: &Container) -> Result<()>;

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
