use crate::container::definition::ObjectHandle;
use crate::container::registry::DefinitionRegistry;
use crate::container::types::ObjectProcessorCast;
use crate::context::ContextRef;
use crate::errors::CoreError;
use crate::foundation::ManagedObject;

/// Extension hook that can rewrite the definition registry after all
/// definitions are loaded but before any non-processor object is built.
///
/// Implementors are themselves managed objects: the container constructs
/// them through the regular factory path before invoking them.
pub trait FactoryPostProcessor: Send + Sync {
    fn post_process_registry(&self, registry: &mut DefinitionRegistry) -> Result<(), CoreError>;
}

/// Extension hook invoked around every object's initialization, in
/// processor registration order. Both hook points default to no-ops.
pub trait ObjectPostProcessor: Send + Sync {
    fn before_initialization(
        &self,
        _name: &str,
        _object: &mut dyn ManagedObject,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    fn after_initialization(
        &self,
        _name: &str,
        _object: &mut dyn ManagedObject,
    ) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Built-in processor that injects a context back-reference into objects
/// opting in through `as_context_aware`.
///
/// Registered by the application context itself, never from configuration.
/// The injected `ContextRef` is weak: the context is not kept alive by the
/// objects it owns.
pub struct ContextAwareProcessor {
    context: ContextRef,
}

impl ContextAwareProcessor {
    pub fn new(context: ContextRef) -> Self {
        Self { context }
    }
}

impl ObjectPostProcessor for ContextAwareProcessor {
    fn before_initialization(
        &self,
        _name: &str,
        object: &mut dyn ManagedObject,
    ) -> Result<(), CoreError> {
        if let Some(aware) = object.as_context_aware() {
            aware.attach_context(self.context.clone());
        }
        Ok(())
    }
}

/// Adapter that exposes a registry-configured processor object through the
/// factory's hook chain. Delegation read-locks the processor's own handle
/// and downcasts through the caster recorded at type registration.
pub(crate) struct ConfiguredProcessor {
    name: String,
    handle: ObjectHandle,
    cast: ObjectProcessorCast,
}

impl ConfiguredProcessor {
    pub(crate) fn new(name: String, handle: ObjectHandle, cast: ObjectProcessorCast) -> Self {
        Self { name, handle, cast }
    }
}

impl ObjectPostProcessor for ConfiguredProcessor {
    fn before_initialization(
        &self,
        name: &str,
        object: &mut dyn ManagedObject,
    ) -> Result<(), CoreError> {
        let guard = self
            .handle
            .read()
            .map_err(|_| CoreError::lock("object post-processor"))?;
        match (self.cast)(&*guard) {
            Some(processor) => processor.before_initialization(name, object),
            None => Err(CoreError::state(format!(
                "object '{}' is not an object post-processor",
                self.name
            ))),
        }
    }

    fn after_initialization(
        &self,
        name: &str,
        object: &mut dyn ManagedObject,
    ) -> Result<(), CoreError> {
        let guard = self
            .handle
            .read()
            .map_err(|_| CoreError::lock("object post-processor"))?;
        match (self.cast)(&*guard) {
            Some(processor) => processor.after_initialization(name, object),
            None => Err(CoreError::state(format!(
                "object '{}' is not an object post-processor",
                self.name
            ))),
        }
    }
}
