use crate::container::definition::ObjectHandle;
use crate::container::processor::{FactoryPostProcessor, ObjectPostProcessor};
use crate::errors::CoreError;
use crate::foundation::ManagedObject;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Constructor closure producing a freshly built, unwired object
pub type Constructor = Box<dyn Fn() -> ObjectHandle + Send + Sync>;

/// Downcast from a managed object to its factory post-processor facet
pub type FactoryProcessorCast =
    fn(&dyn ManagedObject) -> Option<&dyn FactoryPostProcessor>;

/// Downcast from a managed object to its object post-processor facet
pub type ObjectProcessorCast = fn(&dyn ManagedObject) -> Option<&dyn ObjectPostProcessor>;

/// One registered instantiable type.
///
/// Processor casters are recorded here at registration time; they are how
/// the container performs type-filtered processor discovery without runtime
/// reflection.
pub struct TypeEntry {
    descriptor: String,
    type_id: TypeId,
    type_name: &'static str,
    construct: Constructor,
    factory_processor_cast: Option<FactoryProcessorCast>,
    object_processor_cast: Option<ObjectProcessorCast>,
}

impl TypeEntry {
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Construct a bare, unwired instance
    pub fn construct(&self) -> ObjectHandle {
        (self.construct)()
    }

    pub fn is_factory_processor(&self) -> bool {
        self.factory_processor_cast.is_some()
    }

    pub fn is_object_processor(&self) -> bool {
        self.object_processor_cast.is_some()
    }

    pub(crate) fn factory_processor_cast(&self) -> Option<FactoryProcessorCast> {
        self.factory_processor_cast
    }

    pub(crate) fn object_processor_cast(&self) -> Option<ObjectProcessorCast> {
        self.object_processor_cast
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("descriptor", &self.descriptor)
            .field("type_name", &self.type_name)
            .field("factory_processor", &self.is_factory_processor())
            .field("object_processor", &self.is_object_processor())
            .finish()
    }
}

/// Explicit mapping from type descriptor strings to constructors.
///
/// This replaces reflective class loading: every type a configuration
/// document may name must be registered here up front. Registering the same
/// descriptor again replaces the earlier entry.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: HashMap<String, TypeEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain object type with its `Default` constructor
    pub fn register<T>(&mut self, descriptor: impl Into<String>)
    where
        T: ManagedObject + Default,
    {
        self.register_with(descriptor, T::default);
    }

    /// Register a plain object type with a custom constructor
    pub fn register_with<T, F>(&mut self, descriptor: impl Into<String>, constructor: F)
    where
        T: ManagedObject,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert::<T, F>(descriptor.into(), constructor, None, None);
    }

    /// Register a factory post-processor type.
    ///
    /// The generic bound records the processor caster, making definitions of
    /// this type discoverable before any non-processor object is built.
    pub fn register_factory_processor<T>(&mut self, descriptor: impl Into<String>)
    where
        T: ManagedObject + FactoryPostProcessor + Default,
    {
        self.insert::<T, _>(
            descriptor.into(),
            T::default,
            Some(cast_factory_processor::<T>),
            None,
        );
    }

    /// Register an object post-processor type
    pub fn register_object_processor<T>(&mut self, descriptor: impl Into<String>)
    where
        T: ManagedObject + ObjectPostProcessor + Default,
    {
        self.insert::<T, _>(
            descriptor.into(),
            T::default,
            None,
            Some(cast_object_processor::<T>),
        );
    }

    fn insert<T, F>(
        &mut self,
        descriptor: String,
        constructor: F,
        factory_processor_cast: Option<FactoryProcessorCast>,
        object_processor_cast: Option<ObjectProcessorCast>,
    ) where
        T: ManagedObject,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let entry = TypeEntry {
            descriptor: descriptor.clone(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            construct: Box::new(move || {
                let handle: ObjectHandle = Arc::new(RwLock::new(constructor()));
                handle
            }),
            factory_processor_cast,
            object_processor_cast,
        };
        self.entries.insert(descriptor, entry);
    }

    /// Resolve a descriptor into its type entry
    pub fn resolve(&self, descriptor: &str) -> Result<&TypeEntry, CoreError> {
        self.entries.get(descriptor).ok_or_else(|| {
            CoreError::type_resolution(descriptor, "no constructor registered for this descriptor")
        })
    }

    pub fn contains(&self, descriptor: &str) -> bool {
        self.entries.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cast_factory_processor<T>(object: &dyn ManagedObject) -> Option<&dyn FactoryPostProcessor>
where
    T: ManagedObject + FactoryPostProcessor,
{
    object
        .as_any()
        .downcast_ref::<T>()
        .map(|typed| typed as &dyn FactoryPostProcessor)
}

fn cast_object_processor<T>(object: &dyn ManagedObject) -> Option<&dyn ObjectPostProcessor>
where
    T: ManagedObject + ObjectPostProcessor,
{
    object
        .as_any()
        .downcast_ref::<T>()
        .map(|typed| typed as &dyn ObjectPostProcessor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::registry::DefinitionRegistry;
    use std::any::Any;

    #[derive(Default)]
    struct Plain;

    impl ManagedObject for Plain {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct Rewriter;

    impl ManagedObject for Rewriter {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl FactoryPostProcessor for Rewriter {
        fn post_process_registry(
            &self,
            _registry: &mut DefinitionRegistry,
        ) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_unknown_descriptor_fails() {
        let types = TypeRegistry::new();
        let error = types.resolve("app.Unknown").unwrap_err();
        assert!(matches!(error, CoreError::TypeResolution { .. }));
    }

    #[test]
    fn test_registered_type_constructs() {
        let mut types = TypeRegistry::new();
        types.register::<Plain>("app.Plain");

        let entry = types.resolve("app.Plain").unwrap();
        assert_eq!(entry.type_id(), TypeId::of::<Plain>());
        assert!(!entry.is_factory_processor());

        let handle = entry.construct();
        let guard = handle.read().unwrap();
        assert!(guard.as_any().downcast_ref::<Plain>().is_some());
    }

    #[test]
    fn test_processor_registration_records_cast() {
        let mut types = TypeRegistry::new();
        types.register_factory_processor::<Rewriter>("app.Rewriter");

        let entry = types.resolve("app.Rewriter").unwrap();
        assert!(entry.is_factory_processor());
        assert!(!entry.is_object_processor());

        let handle = entry.construct();
        let guard = handle.read().unwrap();
        let cast = entry.factory_processor_cast().unwrap();
        assert!(cast(&*guard).is_some());
    }
}
