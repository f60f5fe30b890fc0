pub mod definition;
pub mod factory;
pub mod processor;
pub mod registry;
pub mod types;

pub use definition::{
    LiteralValue, NamedProperty, ObjectDefinition, ObjectHandle, ObjectReference, PropertyValue,
    ResolvedValue,
};
pub use factory::ObjectFactory;
pub use processor::{ContextAwareProcessor, FactoryPostProcessor, ObjectPostProcessor};
pub use registry::DefinitionRegistry;
pub use types::{TypeEntry, TypeRegistry};
