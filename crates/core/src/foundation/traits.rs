use crate::container::definition::ResolvedValue;
use crate::context::ContextRef;
use crate::errors::CoreError;
use std::any::Any;
use std::fmt;

/// Core trait for objects constructed and wired by the container.
///
/// A managed object is any plain type registered in the `TypeRegistry`. The
/// container constructs it, then pushes configured property values through
/// `apply_property` in definition order. The `as_*` methods are opt-in
/// capability casts: the default implementations return `None`, and a type
/// overrides the ones it supports.
pub trait ManagedObject: Any + Send + Sync {
    /// Set a named property on this instance.
    ///
    /// The default implementation rejects every property, which is correct
    /// for objects without configurable fields.
    fn apply_property(&mut self, property: &str, _value: ResolvedValue) -> Result<(), CoreError> {
        Err(CoreError::property_binding(
            property,
            format!("{} has no such property", std::any::type_name::<Self>()),
        ))
    }

    /// Get the type name of this object
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Opt in to receiving a back-reference to the owning context
    fn as_context_aware(&mut self) -> Option<&mut dyn ContextAware> {
        None
    }

    /// Opt in to an initialization hook run after property wiring
    fn as_initializing(&mut self) -> Option<&mut dyn InitializingObject> {
        None
    }

    /// Opt in to a destroy hook invoked during context shutdown
    fn as_disposable(&mut self) -> Option<&mut dyn DisposableObject> {
        None
    }
}

/// Capability for objects that want a handle to their owning context.
///
/// The handle is a non-owning (weak) reference: the context outlives the
/// object and is never kept alive by it.
pub trait ContextAware {
    fn attach_context(&mut self, context: ContextRef);
}

/// Capability for objects with initialization logic that must run after all
/// properties are wired.
pub trait InitializingObject {
    fn initialize(&mut self) -> Result<(), CoreError>;
}

/// Capability for objects that need cleanup when the context shuts down.
pub trait DisposableObject {
    fn destroy(&mut self) -> Result<(), CoreError>;
}

impl fmt::Debug for dyn ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedObject")
            .field("type_name", &self.type_name())
            .finish()
    }
}
