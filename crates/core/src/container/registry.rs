use crate::container::definition::ObjectDefinition;
use crate::errors::CoreError;
use std::collections::HashMap;

/// Registry of object definitions keyed by name.
///
/// Registration order is preserved so that eager instantiation and shutdown
/// are deterministic. The registry has no side effects beyond its in-memory
/// maps and is not responsible for type resolution.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, ObjectDefinition>,
    order: Vec<String>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under a unique name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        definition: ObjectDefinition,
    ) -> Result<(), CoreError> {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            return Err(CoreError::duplicate_definition(name));
        }
        self.order.push(name.clone());
        self.definitions.insert(name, definition);
        Ok(())
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Result<&ObjectDefinition, CoreError> {
        self.definitions
            .get(name)
            .ok_or_else(|| CoreError::no_such_definition(name))
    }

    /// Remove a definition, returning it if present
    pub fn remove(&mut self, name: &str) -> Option<ObjectDefinition> {
        let removed = self.definitions.remove(name);
        if removed.is_some() {
            self.order.retain(|entry| entry != name);
        }
        removed
    }

    /// Replace an existing definition in place, keeping its registration order
    pub fn replace(
        &mut self,
        name: &str,
        definition: ObjectDefinition,
    ) -> Result<(), CoreError> {
        if !self.definitions.contains_key(name) {
            return Err(CoreError::no_such_definition(name));
        }
        self.definitions.insert(name.to_string(), definition);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Definition names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
