use crate::container::definition::{
    ObjectDefinition, ObjectHandle, PropertyValue, ResolvedValue,
};
use crate::container::processor::{ConfiguredProcessor, ObjectPostProcessor};
use crate::container::registry::DefinitionRegistry;
use crate::container::types::{FactoryProcessorCast, ObjectProcessorCast, TypeRegistry};
use crate::errors::CoreError;
use crate::foundation::ManagedObject;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

/// Creation-ordered pool of fully wired singleton instances
#[derive(Debug, Default)]
struct SingletonPool {
    objects: HashMap<String, ObjectHandle>,
    order: Vec<String>,
}

impl SingletonPool {
    fn get(&self, name: &str) -> Option<ObjectHandle> {
        self.objects.get(name).cloned()
    }

    fn insert(&mut self, name: String, handle: ObjectHandle) {
        if self.objects.insert(name.clone(), handle).is_none() {
            self.order.push(name);
        }
    }

    /// Take every entry out of the pool in creation order, leaving it empty
    fn drain(&mut self) -> Vec<(String, ObjectHandle)> {
        let order = std::mem::take(&mut self.order);
        let mut objects = std::mem::take(&mut self.objects);
        order
            .into_iter()
            .filter_map(|name| objects.remove(&name).map(|handle| (name, handle)))
            .collect()
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}

/// Turns object definitions into fully wired singleton instances.
///
/// Construction is driven by dependency order: resolving a reference
/// property recursively constructs its target first. Every successfully
/// built object passes through the post-processor chain before it is cached;
/// a cached singleton is returned as-is on every later lookup.
pub struct ObjectFactory {
    types: TypeRegistry,
    registry: RwLock<DefinitionRegistry>,
    singletons: RwLock<SingletonPool>,
    processors: RwLock<Vec<Arc<dyn ObjectPostProcessor>>>,
    in_progress: RwLock<Vec<String>>,
}

impl ObjectFactory {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            registry: RwLock::new(DefinitionRegistry::new()),
            singletons: RwLock::new(SingletonPool::default()),
            processors: RwLock::new(Vec::new()),
            in_progress: RwLock::new(Vec::new()),
        }
    }

    /// Register a definition under a unique name
    pub fn register_definition(
        &self,
        name: impl Into<String>,
        definition: ObjectDefinition,
    ) -> Result<(), CoreError> {
        self.registry
            .write()
            .map_err(|_| CoreError::lock("definition_registry"))?
            .register(name, definition)
    }

    pub fn contains_definition(&self, name: &str) -> bool {
        self.registry
            .read()
            .map(|registry| registry.contains(name))
            .unwrap_or(false)
    }

    /// Definition names in registration order
    pub fn definition_names(&self) -> Vec<String> {
        self.registry
            .read()
            .map(|registry| registry.names().to_vec())
            .unwrap_or_default()
    }

    pub fn definition_count(&self) -> usize {
        self.registry
            .read()
            .map(|registry| registry.len())
            .unwrap_or(0)
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.read().map(|pool| pool.len()).unwrap_or(0)
    }

    /// Append a processor to the hook chain. It applies to every object
    /// constructed after this call.
    pub fn add_object_post_processor(
        &self,
        processor: Arc<dyn ObjectPostProcessor>,
    ) -> Result<(), CoreError> {
        self.processors
            .write()
            .map_err(|_| CoreError::lock("post_processor_chain"))?
            .push(processor);
        Ok(())
    }

    pub fn object_post_processor_count(&self) -> usize {
        self.processors.read().map(|chain| chain.len()).unwrap_or(0)
    }

    /// Resolve a singleton by name, constructing and wiring it on first use.
    ///
    /// Re-entrant construction of a name already on the in-progress stack is
    /// a reference cycle and fails fast with `CyclicReference` instead of
    /// recursing without bound.
    pub fn get_object(&self, name: &str) -> Result<ObjectHandle, CoreError> {
        if let Some(existing) = self
            .singletons
            .read()
            .map_err(|_| CoreError::lock("singleton_pool"))?
            .get(name)
        {
            return Ok(existing);
        }

        let definition = self
            .registry
            .read()
            .map_err(|_| CoreError::lock("definition_registry"))?
            .get(name)?
            .clone();

        {
            let mut stack = self
                .in_progress
                .write()
                .map_err(|_| CoreError::lock("construction_stack"))?;
            if stack.iter().any(|entry| entry == name) {
                let mut path = stack.join(" -> ");
                path.push_str(" -> ");
                path.push_str(name);
                return Err(CoreError::CyclicReference {
                    name: name.to_string(),
                    path,
                });
            }
            stack.push(name.to_string());
        }

        let result = self.create_object(name, &definition);
        if let Ok(mut stack) = self.in_progress.write() {
            stack.pop();
        }
        let handle = result?;

        self.singletons
            .write()
            .map_err(|_| CoreError::lock("singleton_pool"))?
            .insert(name.to_string(), handle.clone());
        debug!(object = name, "cached singleton");
        Ok(handle)
    }

    fn create_object(
        &self,
        name: &str,
        definition: &ObjectDefinition,
    ) -> Result<ObjectHandle, CoreError> {
        let entry = self.types.resolve(definition.type_descriptor())?;
        debug!(
            object = name,
            type_descriptor = definition.type_descriptor(),
            "creating object"
        );
        let handle = entry.construct();
        let processors: Vec<Arc<dyn ObjectPostProcessor>> = self
            .processors
            .read()
            .map_err(|_| CoreError::lock("post_processor_chain"))?
            .clone();

        {
            let mut object = handle.write().map_err(|_| CoreError::lock(name))?;

            for property in definition.properties() {
                let resolved = match property.value() {
                    PropertyValue::Reference(reference) => {
                        debug!(
                            object = name,
                            property = property.name(),
                            target = reference.target(),
                            "resolving reference"
                        );
                        ResolvedValue::Object(self.get_object(reference.target())?)
                    }
                    PropertyValue::Literal(literal) => ResolvedValue::Literal(literal.clone()),
                };
                object.apply_property(property.name(), resolved)?;
            }

            for processor in &processors {
                processor.before_initialization(name, &mut *object)?;
            }
            if let Some(init) = object.as_initializing() {
                init.initialize().map_err(|err| CoreError::Initialization {
                    name: name.to_string(),
                    message: err.to_string(),
                })?;
            }
            for processor in &processors {
                processor.after_initialization(name, &mut *object)?;
            }
        }

        Ok(handle)
    }

    /// Resolve every definition whose registered concrete type is `T`.
    ///
    /// Unbuilt matches are constructed eagerly as a side effect, so this is
    /// not a read-only query.
    pub fn objects_of_type<T>(&self) -> Result<Vec<(String, ObjectHandle)>, CoreError>
    where
        T: ManagedObject,
    {
        let wanted = TypeId::of::<T>();
        let names: Vec<String> = {
            let registry = self
                .registry
                .read()
                .map_err(|_| CoreError::lock("definition_registry"))?;
            registry
                .names()
                .iter()
                .filter(|name| {
                    registry
                        .get(name)
                        .ok()
                        .and_then(|definition| {
                            self.types.resolve(definition.type_descriptor()).ok()
                        })
                        .map(|entry| entry.type_id() == wanted)
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        };

        names
            .into_iter()
            .map(|name| self.get_object(&name).map(|handle| (name, handle)))
            .collect()
    }

    /// Borrow the object registered under `name` as a `T`
    pub fn with_object<T, R>(
        &self,
        name: &str,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, CoreError>
    where
        T: ManagedObject,
    {
        let handle = self.get_object(name)?;
        let guard = handle.read().map_err(|_| CoreError::lock(name))?;
        let typed = guard
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| CoreError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })?;
        Ok(f(typed))
    }

    /// Construct every definition registered as a factory post-processor and
    /// let each rewrite the registry. Returns the number invoked.
    pub fn invoke_factory_post_processors(&self) -> Result<usize, CoreError> {
        let candidates: Vec<(String, FactoryProcessorCast)> =
            self.collect_casts(|entry_name, registry| {
                registry
                    .get(entry_name)
                    .ok()
                    .and_then(|definition| self.types.resolve(definition.type_descriptor()).ok())
                    .and_then(|entry| entry.factory_processor_cast())
            })?;

        let mut invoked = 0;
        for (name, cast) in candidates {
            let handle = self.get_object(&name)?;
            let guard = handle
                .read()
                .map_err(|_| CoreError::lock("factory post-processor"))?;
            let processor = cast(&*guard).ok_or_else(|| {
                CoreError::state(format!("object '{}' is not a factory post-processor", name))
            })?;
            let mut registry = self
                .registry
                .write()
                .map_err(|_| CoreError::lock("definition_registry"))?;
            processor.post_process_registry(&mut registry)?;
            invoked += 1;
        }
        Ok(invoked)
    }

    /// Construct every definition registered as an object post-processor and
    /// append it to the hook chain, in registry order. Returns the number
    /// registered.
    pub fn register_object_post_processors(&self) -> Result<usize, CoreError> {
        let candidates: Vec<(String, ObjectProcessorCast)> =
            self.collect_casts(|entry_name, registry| {
                registry
                    .get(entry_name)
                    .ok()
                    .and_then(|definition| self.types.resolve(definition.type_descriptor()).ok())
                    .and_then(|entry| entry.object_processor_cast())
            })?;

        let mut registered = 0;
        for (name, cast) in candidates {
            let handle = self.get_object(&name)?;
            self.add_object_post_processor(Arc::new(ConfiguredProcessor::new(
                name, handle, cast,
            )))?;
            registered += 1;
        }
        Ok(registered)
    }

    fn collect_casts<C>(
        &self,
        select: impl Fn(&str, &DefinitionRegistry) -> Option<C>,
    ) -> Result<Vec<(String, C)>, CoreError> {
        let registry = self
            .registry
            .read()
            .map_err(|_| CoreError::lock("definition_registry"))?;
        Ok(registry
            .names()
            .iter()
            .filter_map(|name| select(name, &registry).map(|cast| (name.clone(), cast)))
            .collect())
    }

    /// Eagerly construct every registered singleton, in registry order.
    /// The first failure aborts.
    pub fn pre_instantiate_singletons(&self) -> Result<(), CoreError> {
        for name in self.definition_names() {
            self.get_object(&name)?;
        }
        Ok(())
    }

    /// Destroy all cached singletons in reverse creation order.
    ///
    /// The pool is drained first, so each destroy hook runs at most once and
    /// a second call is a no-op. Individual hook failures are logged and
    /// contained; one bad object never blocks cleanup of the rest.
    pub fn destroy_singletons(&self) {
        let entries = match self.singletons.write() {
            Ok(mut pool) => pool.drain(),
            Err(_) => {
                error!("singleton pool lock poisoned, skipping destruction");
                return;
            }
        };

        for (name, handle) in entries.iter().rev() {
            match handle.write() {
                Ok(mut object) => {
                    if let Some(disposable) = object.as_disposable() {
                        debug!(object = name.as_str(), "invoking destroy hook");
                        if let Err(err) = disposable.destroy() {
                            error!(object = name.as_str(), error = %err, "destroy hook failed");
                        }
                    }
                }
                Err(_) => {
                    error!(
                        object = name.as_str(),
                        "object lock poisoned, skipping destroy hook"
                    );
                }
            }
        }
    }
}

impl fmt::Debug for ObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFactory")
            .field("types", &self.types.len())
            .field("definitions", &self.definition_count())
            .field("singletons", &self.singleton_count())
            .field("post_processors", &self.object_post_processor_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::definition::LiteralValue;
    use crate::foundation::DisposableObject;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Greeter {
        message: String,
        retries: i64,
    }

    impl ManagedObject for Greeter {
        fn apply_property(
            &mut self,
            property: &str,
            value: ResolvedValue,
        ) -> Result<(), CoreError> {
            match property {
                "message" => {
                    self.message = value.string_value(property)?;
                    Ok(())
                }
                "retries" => {
                    self.retries = value.i64_value(property)?;
                    Ok(())
                }
                other => Err(CoreError::property_binding(other, "unknown property")),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct Holder {
        peer: Option<ObjectHandle>,
    }

    impl ManagedObject for Holder {
        fn apply_property(
            &mut self,
            property: &str,
            value: ResolvedValue,
        ) -> Result<(), CoreError> {
            match property {
                "peer" => {
                    self.peer = Some(value.object_value(property)?);
                    Ok(())
                }
                other => Err(CoreError::property_binding(other, "unknown property")),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn base_types() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.register::<Greeter>("app.Greeter");
        types.register::<Holder>("app.Holder");
        types
    }

    #[test]
    fn test_singleton_cache_returns_identical_handle() {
        let factory = ObjectFactory::new(base_types());
        factory
            .register_definition(
                "greeter",
                ObjectDefinition::new("app.Greeter").with_literal("message", "hello"),
            )
            .unwrap();

        let first = factory.get_object("greeter").unwrap();
        let second = factory.get_object("greeter").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.singleton_count(), 1);
    }

    #[test]
    fn test_reference_wiring_constructs_target_first() {
        let factory = ObjectFactory::new(base_types());
        // the referencing object is registered first; wiring must still
        // fully construct the target before the property is set
        factory
            .register_definition(
                "outer",
                ObjectDefinition::new("app.Holder").with_reference("peer", "inner"),
            )
            .unwrap();
        factory
            .register_definition(
                "inner",
                ObjectDefinition::new("app.Greeter").with_literal("message", "deep"),
            )
            .unwrap();

        let outer = factory.get_object("outer").unwrap();
        let inner = factory.get_object("inner").unwrap();

        let guard = outer.read().unwrap();
        let holder = guard.as_any().downcast_ref::<Holder>().unwrap();
        let peer = holder.peer.as_ref().unwrap();
        assert!(Arc::ptr_eq(peer, &inner));

        let inner_guard = inner.read().unwrap();
        let greeter = inner_guard.as_any().downcast_ref::<Greeter>().unwrap();
        assert_eq!(greeter.message, "deep");
    }

    #[test]
    fn test_missing_definition_fails() {
        let factory = ObjectFactory::new(base_types());
        let error = factory.get_object("missing").unwrap_err();
        assert!(error.is_no_such_definition());
    }

    #[test]
    fn test_unknown_type_descriptor_fails() {
        let factory = ObjectFactory::new(base_types());
        factory
            .register_definition("ghost", ObjectDefinition::new("app.Ghost"))
            .unwrap();
        let error = factory.get_object("ghost").unwrap_err();
        assert!(matches!(error, CoreError::TypeResolution { .. }));
    }

    #[test]
    fn test_unknown_property_fails() {
        let factory = ObjectFactory::new(base_types());
        factory
            .register_definition(
                "greeter",
                ObjectDefinition::new("app.Greeter").with_literal("nope", "x"),
            )
            .unwrap();
        let error = factory.get_object("greeter").unwrap_err();
        assert!(matches!(error, CoreError::PropertyBinding { .. }));
    }

    #[test]
    fn test_literal_coercion_from_string() {
        let factory = ObjectFactory::new(base_types());
        factory
            .register_definition(
                "greeter",
                ObjectDefinition::new("app.Greeter")
                    .with_literal("message", "hi")
                    .with_literal("retries", LiteralValue::Str("5".to_string())),
            )
            .unwrap();

        let retries = factory
            .with_object::<Greeter, _>("greeter", |greeter| greeter.retries)
            .unwrap();
        assert_eq!(retries, 5);
    }

    #[test]
    fn test_cyclic_reference_fails_fast() {
        let factory = ObjectFactory::new(base_types());
        factory
            .register_definition(
                "a",
                ObjectDefinition::new("app.Holder").with_reference("peer", "b"),
            )
            .unwrap();
        factory
            .register_definition(
                "b",
                ObjectDefinition::new("app.Holder").with_reference("peer", "a"),
            )
            .unwrap();

        let error = factory.get_object("a").unwrap_err();
        match error {
            CoreError::CyclicReference { name, path } => {
                assert_eq!(name, "a");
                assert_eq!(path, "a -> b -> a");
            }
            other => panic!("expected cyclic reference error, got {:?}", other),
        }
    }

    #[test]
    fn test_with_object_type_mismatch() {
        let factory = ObjectFactory::new(base_types());
        factory
            .register_definition("greeter", ObjectDefinition::new("app.Greeter"))
            .unwrap();

        let error = factory
            .with_object::<Holder, _>("greeter", |_| ())
            .unwrap_err();
        assert!(matches!(error, CoreError::TypeMismatch { .. }));
    }

    #[test]
    fn test_objects_of_type_constructs_matches() {
        let factory = ObjectFactory::new(base_types());
        factory
            .register_definition("g1", ObjectDefinition::new("app.Greeter"))
            .unwrap();
        factory
            .register_definition("h1", ObjectDefinition::new("app.Holder"))
            .unwrap();
        factory
            .register_definition("g2", ObjectDefinition::new("app.Greeter"))
            .unwrap();

        let greeters = factory.objects_of_type::<Greeter>().unwrap();
        let names: Vec<&str> = greeters.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["g1", "g2"]);
        // the scan constructed the matches but not the holder
        assert_eq!(factory.singleton_count(), 2);
    }

    #[derive(Default)]
    struct Tracked;

    static TRACKED_DESTROYED: AtomicUsize = AtomicUsize::new(0);

    impl ManagedObject for Tracked {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn as_disposable(&mut self) -> Option<&mut dyn DisposableObject> {
            Some(self)
        }
    }

    impl DisposableObject for Tracked {
        fn destroy(&mut self) -> Result<(), CoreError> {
            TRACKED_DESTROYED.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Faulty;

    impl ManagedObject for Faulty {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn as_disposable(&mut self) -> Option<&mut dyn DisposableObject> {
            Some(self)
        }
    }

    impl DisposableObject for Faulty {
        fn destroy(&mut self) -> Result<(), CoreError> {
            Err(CoreError::destroy("faulty", "simulated failure"))
        }
    }

    #[test]
    fn test_destroy_runs_once_and_contains_failures() {
        let mut types = TypeRegistry::new();
        types.register::<Tracked>("app.Tracked");
        types.register::<Faulty>("app.Faulty");

        let factory = ObjectFactory::new(types);
        factory
            .register_definition("tracked", ObjectDefinition::new("app.Tracked"))
            .unwrap();
        factory
            .register_definition("faulty", ObjectDefinition::new("app.Faulty"))
            .unwrap();
        factory.pre_instantiate_singletons().unwrap();

        let before = TRACKED_DESTROYED.load(Ordering::SeqCst);
        factory.destroy_singletons();
        assert_eq!(TRACKED_DESTROYED.load(Ordering::SeqCst), before + 1);
        assert_eq!(factory.singleton_count(), 0);

        // second pass is a no-op: the pool is already drained
        factory.destroy_singletons();
        assert_eq!(TRACKED_DESTROYED.load(Ordering::SeqCst), before + 1);
    }

    struct Recording {
        events: Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    }

    impl ObjectPostProcessor for Recording {
        fn before_initialization(
            &self,
            name: &str,
            _object: &mut dyn ManagedObject,
        ) -> Result<(), CoreError> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:before:{}", self.tag, name));
            Ok(())
        }

        fn after_initialization(
            &self,
            name: &str,
            _object: &mut dyn ManagedObject,
        ) -> Result<(), CoreError> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:after:{}", self.tag, name));
            Ok(())
        }
    }

    #[test]
    fn test_post_processors_run_in_registration_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let factory = ObjectFactory::new(base_types());
        factory
            .add_object_post_processor(Arc::new(Recording {
                events: events.clone(),
                tag: "p1",
            }))
            .unwrap();
        factory
            .add_object_post_processor(Arc::new(Recording {
                events: events.clone(),
                tag: "p2",
            }))
            .unwrap();

        factory
            .register_definition("greeter", ObjectDefinition::new("app.Greeter"))
            .unwrap();
        factory.get_object("greeter").unwrap();

        let recorded = events.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                "p1:before:greeter",
                "p2:before:greeter",
                "p1:after:greeter",
                "p2:after:greeter",
            ]
        );
    }

    #[derive(Default)]
    struct DropDoomed;

    impl ManagedObject for DropDoomed {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl crate::container::processor::FactoryPostProcessor for DropDoomed {
        fn post_process_registry(
            &self,
            registry: &mut DefinitionRegistry,
        ) -> Result<(), CoreError> {
            let _ = registry.remove("doomed");
            Ok(())
        }
    }

    static DOOMED_BUILT: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn test_factory_post_processor_can_remove_definitions() {
        let mut types = base_types();
        types.register_factory_processor::<DropDoomed>("app.DropDoomed");
        types.register_with("app.Counting", || {
            DOOMED_BUILT.fetch_add(1, Ordering::SeqCst);
            Greeter::default()
        });

        let factory = ObjectFactory::new(types);
        factory
            .register_definition("doomed", ObjectDefinition::new("app.Counting"))
            .unwrap();
        factory
            .register_definition("cleanup", ObjectDefinition::new("app.DropDoomed"))
            .unwrap();

        assert_eq!(factory.invoke_factory_post_processors().unwrap(), 1);
        assert!(!factory.contains_definition("doomed"));
        factory.pre_instantiate_singletons().unwrap();
        assert_eq!(DOOMED_BUILT.load(Ordering::SeqCst), 0);
    }
}
