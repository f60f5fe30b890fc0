use thiserror::Error;

/// Core error type for the tether container
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration load error: {message}")]
    ConfigurationLoad { message: String },

    #[error("duplicate definition name '{name}'")]
    DuplicateDefinition { name: String },

    #[error("no definition registered under name '{name}'")]
    NoSuchDefinition { name: String },

    #[error("cannot resolve type descriptor '{descriptor}': {message}")]
    TypeResolution { descriptor: String, message: String },

    #[error("cannot bind property '{property}': {message}")]
    PropertyBinding { property: String, message: String },

    #[error("cyclic reference while constructing '{name}' ({path})")]
    CyclicReference { name: String, path: String },

    #[error("initialization of object '{name}' failed: {message}")]
    Initialization { name: String, message: String },

    #[error("destroy hook of object '{name}' failed: {message}")]
    Destroy { name: String, message: String },

    #[error("object '{name}' is not of the requested type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("context refresh failed: {source}")]
    Refresh { source: Box<CoreError> },

    #[error("invalid context state: {message}")]
    State { message: String },

    #[error("lock error on resource: {resource}")]
    Lock { resource: String },
}

impl CoreError {
    /// Create a new configuration load error
    pub fn configuration_load(message: impl Into<String>) -> Self {
        Self::ConfigurationLoad {
            message: message.into(),
        }
    }

    /// Create a new duplicate-definition error
    pub fn duplicate_definition(name: impl Into<String>) -> Self {
        Self::DuplicateDefinition { name: name.into() }
    }

    /// Create a new missing-definition error
    pub fn no_such_definition(name: impl Into<String>) -> Self {
        Self::NoSuchDefinition { name: name.into() }
    }

    /// Create a new type resolution error
    pub fn type_resolution(descriptor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeResolution {
            descriptor: descriptor.into(),
            message: message.into(),
        }
    }

    /// Create a new property binding error
    pub fn property_binding(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PropertyBinding {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create a new destroy-hook error
    pub fn destroy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Destroy {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a new context state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a new lock error
    pub fn lock(resource: impl Into<String>) -> Self {
        Self::Lock {
            resource: resource.into(),
        }
    }

    /// Wrap an error that aborted a context refresh
    pub fn refresh(source: CoreError) -> Self {
        Self::Refresh {
            source: Box::new(source),
        }
    }

    /// Unwrap refresh wrappers down to the underlying failure
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::Refresh { source } => source.root_cause(),
            other => other,
        }
    }

    /// Check if the error is a configuration load error
    pub fn is_configuration_load(&self) -> bool {
        matches!(self, Self::ConfigurationLoad { .. })
    }

    /// Check if the error is a missing-definition error
    pub fn is_no_such_definition(&self) -> bool {
        matches!(self, Self::NoSuchDefinition { .. })
    }

    /// Check if the error is a cyclic reference error
    pub fn is_cyclic_reference(&self) -> bool {
        matches!(self, Self::CyclicReference { .. })
    }

    /// Check if the error is a context state error
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors() {
        let error = CoreError::no_such_definition("missing");
        assert!(error.is_no_such_definition());
        assert_eq!(
            error.to_string(),
            "no definition registered under name 'missing'"
        );
    }

    #[test]
    fn test_root_cause_unwraps_refresh() {
        let error = CoreError::refresh(CoreError::refresh(CoreError::no_such_definition("b")));
        assert!(error.root_cause().is_no_such_definition());
        assert!(error.to_string().starts_with("context refresh failed"));
    }
}
