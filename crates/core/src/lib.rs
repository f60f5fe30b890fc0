//! Core IoC container for the tether framework.
//!
//! Objects are described declaratively (a type descriptor plus literal and
//! reference properties), registered by name, constructed and wired on
//! demand, and destroyed in reverse creation order when the application
//! context closes. Type descriptors resolve through explicit constructor
//! registration rather than reflection.

pub mod config;
pub mod container;
pub mod context;
pub mod errors;
pub mod foundation;

// Re-export key types for convenience
pub use config::{
    DefinitionDocument, DefinitionRecord, DefinitionSource, InMemorySource, JsonDefinitionSource,
    PropertyRecord, YamlDefinitionSource,
};
pub use container::{
    DefinitionRegistry, FactoryPostProcessor, LiteralValue, NamedProperty, ObjectDefinition,
    ObjectFactory, ObjectHandle, ObjectPostProcessor, ObjectReference, PropertyValue,
    ResolvedValue, TypeRegistry,
};
pub use context::{AppContext, AppContextBuilder, ContextRef};
pub use errors::CoreError;
pub use foundation::{
    ContextAware, ContextState, DisposableObject, InitializingObject, ManagedObject,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
