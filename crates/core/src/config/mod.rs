pub mod sources;

pub use sources::{
    derived_name, DefinitionDocument, DefinitionRecord, DefinitionSource, InMemorySource,
    JsonDefinitionSource, PropertyRecord, YamlDefinitionSource,
};
