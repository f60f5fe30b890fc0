use crate::errors::CoreError;
use crate::foundation::ManagedObject;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Shared handle to a live, container-managed object.
///
/// Handles to the same singleton compare equal under `Arc::ptr_eq`; that is
/// the container's identity test.
pub type ObjectHandle = Arc<RwLock<dyn ManagedObject>>;

/// Scalar value carried by a configuration document.
///
/// Variant order matters: serde tries untagged variants top to bottom, so
/// `true` must hit `Bool` before anything else and `42` must hit `Int`
/// before `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl LiteralValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Render the literal as a string, whatever its scalar type
    pub fn coerce_string(&self) -> String {
        self.to_string()
    }

    /// Coerce to an integer; string literals are parsed
    pub fn coerce_i64(&self) -> Option<i64> {
        match self {
            LiteralValue::Int(value) => Some(*value),
            LiteralValue::Str(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a float; integers widen, string literals are parsed
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            LiteralValue::Float(value) => Some(*value),
            LiteralValue::Int(value) => Some(*value as f64),
            LiteralValue::Str(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a boolean; string literals are parsed
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Bool(value) => Some(*value),
            LiteralValue::Str(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn type_label(&self) -> &'static str {
        match self {
            LiteralValue::Bool(_) => "bool",
            LiteralValue::Int(_) => "int",
            LiteralValue::Float(_) => "float",
            LiteralValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(value) => write!(f, "{}", value),
            LiteralValue::Int(value) => write!(f, "{}", value),
            LiteralValue::Float(value) => write!(f, "{}", value),
            LiteralValue::Str(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        LiteralValue::Str(value.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(value: String) -> Self {
        LiteralValue::Str(value)
    }
}

impl From<i64> for LiteralValue {
    fn from(value: i64) -> Self {
        LiteralValue::Int(value)
    }
}

impl From<f64> for LiteralValue {
    fn from(value: f64) -> Self {
        LiteralValue::Float(value)
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        LiteralValue::Bool(value)
    }
}

/// Named, lazy link to another managed object.
///
/// Not an owning pointer: the target is resolved to a live handle only at
/// wiring time, which may trigger recursive construction of the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    target: String,
}

impl ObjectReference {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A configured property value: either a literal scalar or a reference to
/// another definition. The enum makes "exactly one of the two" structural.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Literal(LiteralValue),
    Reference(ObjectReference),
}

impl PropertyValue {
    pub fn is_literal(&self) -> bool {
        matches!(self, PropertyValue::Literal(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, PropertyValue::Reference(_))
    }
}

/// One property entry of an object definition
#[derive(Debug, Clone)]
pub struct NamedProperty {
    name: String,
    value: PropertyValue,
}

impl NamedProperty {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

/// Declarative description of one object to build: its type descriptor plus
/// an ordered property list. Owned by the `DefinitionRegistry` after
/// registration and immutable from then on, except for factory
/// post-processor rewrites executed before any instantiation.
#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    type_descriptor: String,
    properties: Vec<NamedProperty>,
}

impl ObjectDefinition {
    pub fn new(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            properties: Vec::new(),
        }
    }

    /// Add a literal property (builder style)
    pub fn with_literal(mut self, name: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        self.properties.push(NamedProperty::new(
            name,
            PropertyValue::Literal(value.into()),
        ));
        self
    }

    /// Add a reference property (builder style)
    pub fn with_reference(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.properties.push(NamedProperty::new(
            name,
            PropertyValue::Reference(ObjectReference::new(target)),
        ));
        self
    }

    pub fn push_property(&mut self, property: NamedProperty) {
        self.properties.push(property);
    }

    pub fn type_descriptor(&self) -> &str {
        &self.type_descriptor
    }

    pub fn properties(&self) -> &[NamedProperty] {
        &self.properties
    }
}

/// Value handed to `ManagedObject::apply_property` after the factory has
/// resolved references into live handles.
#[derive(Debug)]
pub enum ResolvedValue {
    Literal(LiteralValue),
    Object(ObjectHandle),
}

impl ResolvedValue {
    /// Extract a string, coercing any literal
    pub fn string_value(self, property: &str) -> Result<String, CoreError> {
        match self {
            ResolvedValue::Literal(literal) => Ok(literal.coerce_string()),
            ResolvedValue::Object(_) => Err(CoreError::property_binding(
                property,
                "expected a literal value, found an object reference",
            )),
        }
    }

    /// Extract an integer, coercing string literals
    pub fn i64_value(self, property: &str) -> Result<i64, CoreError> {
        match self {
            ResolvedValue::Literal(literal) => literal.coerce_i64().ok_or_else(|| {
                CoreError::property_binding(
                    property,
                    format!("cannot coerce {} literal to int", literal.type_label()),
                )
            }),
            ResolvedValue::Object(_) => Err(CoreError::property_binding(
                property,
                "expected an int literal, found an object reference",
            )),
        }
    }

    /// Extract a float, coercing integer and string literals
    pub fn f64_value(self, property: &str) -> Result<f64, CoreError> {
        match self {
            ResolvedValue::Literal(literal) => literal.coerce_f64().ok_or_else(|| {
                CoreError::property_binding(
                    property,
                    format!("cannot coerce {} literal to float", literal.type_label()),
                )
            }),
            ResolvedValue::Object(_) => Err(CoreError::property_binding(
                property,
                "expected a float literal, found an object reference",
            )),
        }
    }

    /// Extract a boolean, coercing string literals
    pub fn bool_value(self, property: &str) -> Result<bool, CoreError> {
        match self {
            ResolvedValue::Literal(literal) => literal.coerce_bool().ok_or_else(|| {
                CoreError::property_binding(
                    property,
                    format!("cannot coerce {} literal to bool", literal.type_label()),
                )
            }),
            ResolvedValue::Object(_) => Err(CoreError::property_binding(
                property,
                "expected a bool literal, found an object reference",
            )),
        }
    }

    /// Extract a live object handle
    pub fn object_value(self, property: &str) -> Result<ObjectHandle, CoreError> {
        match self {
            ResolvedValue::Object(handle) => Ok(handle),
            ResolvedValue::Literal(literal) => Err(CoreError::property_binding(
                property,
                format!(
                    "expected an object reference, found {} literal",
                    literal.type_label()
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_coercions() {
        assert_eq!(LiteralValue::from("42").coerce_i64(), Some(42));
        assert_eq!(LiteralValue::Int(42).coerce_i64(), Some(42));
        assert_eq!(LiteralValue::Int(2).coerce_f64(), Some(2.0));
        assert_eq!(LiteralValue::from("true").coerce_bool(), Some(true));
        assert_eq!(LiteralValue::Bool(false).coerce_i64(), None);
        assert_eq!(LiteralValue::Int(7).coerce_string(), "7");
    }

    #[test]
    fn test_definition_builder_keeps_property_order() {
        let definition = ObjectDefinition::new("app.UserService")
            .with_literal("value", "hello")
            .with_reference("peer", "other")
            .with_literal("retries", 3i64);

        assert_eq!(definition.type_descriptor(), "app.UserService");
        let names: Vec<&str> = definition.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["value", "peer", "retries"]);
        assert!(definition.properties()[1].value().is_reference());
    }

    #[test]
    fn test_resolved_value_mismatch() {
        let value = ResolvedValue::Literal(LiteralValue::Bool(true));
        let error = value.object_value("peer").unwrap_err();
        assert!(matches!(error, CoreError::PropertyBinding { .. }));
    }

    #[test]
    fn test_untagged_literal_parsing() {
        let values: Vec<LiteralValue> =
            serde_yaml::from_str("[hello, 42, 1.5, true]").expect("yaml literals");
        assert_eq!(
            values,
            vec![
                LiteralValue::Str("hello".to_string()),
                LiteralValue::Int(42),
                LiteralValue::Float(1.5),
                LiteralValue::Bool(true),
            ]
        );
    }
}
