use crate::container::definition::{
    LiteralValue, NamedProperty, ObjectDefinition, ObjectReference, PropertyValue,
};
use crate::errors::CoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One property of a definition record: a literal value or a named
/// reference, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<LiteralValue>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// One object-definition record as emitted by a configuration document.
///
/// `id` takes priority over `name`; when both are absent the definition name
/// is derived from the type descriptor (see [`derived_name`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_descriptor: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyRecord>,
}

/// Top-level shape of a definition document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionDocument {
    #[serde(default)]
    pub objects: Vec<DefinitionRecord>,
}

impl DefinitionRecord {
    /// Create an anonymous record; its name will be derived from the type
    pub fn anonymous(type_descriptor: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            type_descriptor: type_descriptor.into(),
            properties: Vec::new(),
        }
    }

    /// Create a record with an explicit id
    pub fn named(id: impl Into<String>, type_descriptor: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
            type_descriptor: type_descriptor.into(),
            properties: Vec::new(),
        }
    }

    /// Append a literal property (builder style)
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        self.properties.push(PropertyRecord {
            name: name.into(),
            value: Some(value.into()),
            reference: None,
        });
        self
    }

    /// Append a reference property (builder style)
    pub fn with_reference(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.properties.push(PropertyRecord {
            name: name.into(),
            value: None,
            reference: Some(target.into()),
        });
        self
    }

    /// Resolve the definition name: id over name, falling back to a name
    /// derived from the type descriptor.
    pub fn effective_name(&self) -> Result<String, CoreError> {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }
        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            return Ok(name.to_string());
        }
        derived_name(&self.type_descriptor)
    }

    /// Validate the record and convert it into a registrable definition
    pub fn into_definition(self) -> Result<(String, ObjectDefinition), CoreError> {
        let name = self.effective_name()?;
        let mut definition = ObjectDefinition::new(self.type_descriptor);

        for property in self.properties {
            if property.name.is_empty() {
                return Err(CoreError::configuration_load(format!(
                    "definition '{}' has a property with an empty name",
                    name
                )));
            }
            let value = match (property.value, property.reference) {
                (Some(_), Some(_)) => {
                    return Err(CoreError::configuration_load(format!(
                        "property '{}' of definition '{}' sets both 'value' and 'ref'",
                        property.name, name
                    )));
                }
                (None, None) => {
                    return Err(CoreError::configuration_load(format!(
                        "property '{}' of definition '{}' sets neither 'value' nor 'ref'",
                        property.name, name
                    )));
                }
                (Some(literal), None) => PropertyValue::Literal(literal),
                (None, Some(target)) => {
                    if target.is_empty() {
                        return Err(CoreError::configuration_load(format!(
                            "property '{}' of definition '{}' has an empty 'ref' target",
                            property.name, name
                        )));
                    }
                    PropertyValue::Reference(ObjectReference::new(target))
                }
            };
            definition.push_property(NamedProperty::new(property.name, value));
        }

        Ok((name, definition))
    }
}

/// Derive a definition name from a type descriptor: the last `.`/`::` path
/// segment with its first letter lowercased (`app.UserService` becomes
/// `userService`).
pub fn derived_name(descriptor: &str) -> Result<String, CoreError> {
    let simple = descriptor
        .rsplit("::")
        .next()
        .and_then(|segment| segment.rsplit('.').next())
        .unwrap_or(descriptor);
    let mut chars = simple.chars();
    match chars.next() {
        Some(first) => Ok(first.to_lowercase().chain(chars).collect()),
        None => Err(CoreError::configuration_load(format!(
            "cannot derive a definition name from type descriptor '{}'",
            descriptor
        ))),
    }
}

/// A configuration collaborator that emits an ordered sequence of
/// definition records.
pub trait DefinitionSource: Send + Sync {
    fn load_definitions(&self) -> Result<Vec<DefinitionRecord>, CoreError>;

    /// Human-readable origin, used in logs
    fn description(&self) -> String {
        "definition source".to_string()
    }
}

/// YAML definition document, held as text
pub struct YamlDefinitionSource {
    text: String,
    origin: Option<PathBuf>,
}

impl YamlDefinitionSource {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            CoreError::configuration_load(format!("cannot read {}: {}", path.display(), err))
        })?;
        Ok(Self {
            text,
            origin: Some(path.to_path_buf()),
        })
    }
}

impl DefinitionSource for YamlDefinitionSource {
    fn load_definitions(&self) -> Result<Vec<DefinitionRecord>, CoreError> {
        let document: DefinitionDocument = serde_yaml::from_str(&self.text).map_err(|err| {
            CoreError::configuration_load(format!(
                "malformed YAML definition document ({}): {}",
                self.description(),
                err
            ))
        })?;
        Ok(document.objects)
    }

    fn description(&self) -> String {
        match &self.origin {
            Some(path) => path.display().to_string(),
            None => "inline YAML document".to_string(),
        }
    }
}

/// JSON definition document, held as text
pub struct JsonDefinitionSource {
    text: String,
    origin: Option<PathBuf>,
}

impl JsonDefinitionSource {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            CoreError::configuration_load(format!("cannot read {}: {}", path.display(), err))
        })?;
        Ok(Self {
            text,
            origin: Some(path.to_path_buf()),
        })
    }
}

impl DefinitionSource for JsonDefinitionSource {
    fn load_definitions(&self) -> Result<Vec<DefinitionRecord>, CoreError> {
        let document: DefinitionDocument = serde_json::from_str(&self.text).map_err(|err| {
            CoreError::configuration_load(format!(
                "malformed JSON definition document ({}): {}",
                self.description(),
                err
            ))
        })?;
        Ok(document.objects)
    }

    fn description(&self) -> String {
        match &self.origin {
            Some(path) => path.display().to_string(),
            None => "inline JSON document".to_string(),
        }
    }
}

/// Programmatically assembled records, mostly useful in tests
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<DefinitionRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<DefinitionRecord>) -> Self {
        Self { records }
    }
}

impl DefinitionSource for InMemorySource {
    fn load_definitions(&self) -> Result<Vec<DefinitionRecord>, CoreError> {
        Ok(self.records.clone())
    }

    fn description(&self) -> String {
        "in-memory records".to_string()
    }
}
