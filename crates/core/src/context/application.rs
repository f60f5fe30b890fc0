use crate::config::DefinitionSource;
use crate::container::definition::ObjectHandle;
use crate::container::factory::ObjectFactory;
use crate::container::processor::{ContextAwareProcessor, FactoryPostProcessor, ObjectPostProcessor};
use crate::container::types::TypeRegistry;
use crate::errors::CoreError;
use crate::foundation::{ContextState, ManagedObject};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State shared between the context, its `ContextRef` handles, and the
/// shutdown hook task. Owned by `AppContext`; everything else holds weak
/// references.
pub(crate) struct ContextShared {
    id: Uuid,
    state: RwLock<ContextState>,
    factory: ObjectFactory,
    refreshed_at: RwLock<Option<DateTime<Utc>>>,
}

impl ContextShared {
    fn state(&self) -> ContextState {
        self.state.read().map(|state| *state).unwrap_or(ContextState::Closed)
    }

    fn set_state(&self, next: ContextState) {
        if let Ok(mut state) = self.state.write() {
            *state = next;
        }
    }

    fn ensure_usable(&self) -> Result<(), CoreError> {
        let state = self.state();
        if state.is_usable() {
            Ok(())
        } else {
            Err(CoreError::state(format!(
                "context is {} and cannot hand out objects",
                state
            )))
        }
    }

    fn ensure_ready(&self) -> Result<(), CoreError> {
        let state = self.state();
        if state == ContextState::Ready {
            Ok(())
        } else {
            Err(CoreError::state(format!(
                "context is {}, expected ready; discard a context whose refresh failed",
                state
            )))
        }
    }

    /// Close path shared by `close()`, `Drop`, and the shutdown hook. Never
    /// panics and never propagates: individual destroy failures are logged
    /// inside the factory.
    fn close(&self) {
        if self.state().is_closed() {
            debug!(context = %self.id, "context already closed");
            return;
        }
        info!(context = %self.id, singletons = self.factory.singleton_count(), "closing application context");
        self.factory.destroy_singletons();
        self.set_state(ContextState::Closed);
    }
}

/// Cloneable, non-owning handle to a running context.
///
/// Handed to `ContextAware` objects during construction; also usable from
/// background tasks. All operations fail with a `State` error once the
/// context is closed or dropped.
#[derive(Clone)]
pub struct ContextRef {
    shared: Weak<ContextShared>,
}

impl ContextRef {
    fn upgrade(&self) -> Result<Arc<ContextShared>, CoreError> {
        self.shared
            .upgrade()
            .ok_or_else(|| CoreError::state("context has been dropped"))
    }

    /// Resolve an object through the owning context.
    ///
    /// Allowed while the context is refreshing so that objects constructed
    /// during refresh can already use their back-reference.
    pub fn get_object(&self, name: &str) -> Result<ObjectHandle, CoreError> {
        let shared = self.upgrade()?;
        shared.ensure_usable()?;
        shared.factory.get_object(name)
    }

    /// Current state of the owning context, `Closed` if it is gone
    pub fn state(&self) -> ContextState {
        self.shared
            .upgrade()
            .map(|shared| shared.state())
            .unwrap_or(ContextState::Closed)
    }

    /// Instance id of the owning context, if it is still alive
    pub fn id(&self) -> Option<Uuid> {
        self.shared.upgrade().map(|shared| shared.id)
    }
}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRef")
            .field("state", &self.state())
            .finish()
    }
}

/// Builder for [`AppContext`]: type registrations plus definition sources
#[derive(Default)]
pub struct AppContextBuilder {
    types: TypeRegistry,
    sources: Vec<Box<dyn DefinitionSource>>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain object type under a descriptor
    pub fn register_type<T>(mut self, descriptor: impl Into<String>) -> Self
    where
        T: ManagedObject + Default,
    {
        self.types.register::<T>(descriptor);
        self
    }

    /// Register a plain object type with a custom constructor
    pub fn register_type_with<T, F>(mut self, descriptor: impl Into<String>, constructor: F) -> Self
    where
        T: ManagedObject,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.types.register_with(descriptor, constructor);
        self
    }

    /// Register a factory post-processor type
    pub fn register_factory_processor_type<T>(mut self, descriptor: impl Into<String>) -> Self
    where
        T: ManagedObject + FactoryPostProcessor + Default,
    {
        self.types.register_factory_processor::<T>(descriptor);
        self
    }

    /// Register an object post-processor type
    pub fn register_object_processor_type<T>(mut self, descriptor: impl Into<String>) -> Self
    where
        T: ManagedObject + ObjectPostProcessor + Default,
    {
        self.types.register_object_processor::<T>(descriptor);
        self
    }

    /// Replace the whole type registry
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Attach a definition source; sources load in attachment order
    pub fn with_source(mut self, source: impl DefinitionSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn build(self) -> AppContext {
        AppContext {
            shared: Arc::new(ContextShared {
                id: Uuid::new_v4(),
                state: RwLock::new(ContextState::Uninitialized),
                factory: ObjectFactory::new(self.types),
                refreshed_at: RwLock::new(None),
            }),
            sources: self.sources,
        }
    }
}

/// The application context: loads definitions, drives the post-processor
/// phases, eagerly instantiates singletons, and destroys them on close.
///
/// Lifecycle: `Uninitialized -> Refreshing -> Ready -> Closed`. A failed
/// refresh leaves the state at `Refreshing` with no rollback of singletons
/// already built; such a context refuses to hand out objects and should be
/// closed and discarded.
pub struct AppContext {
    shared: Arc<ContextShared>,
    sources: Vec<Box<dyn DefinitionSource>>,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> ContextState {
        self.shared.state()
    }

    /// When the last successful refresh completed
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.shared
            .refreshed_at
            .read()
            .map(|at| *at)
            .unwrap_or(None)
    }

    /// Build the object graph:
    /// 1. load definition records from every attached source,
    /// 2. register the built-in context-awareness processor,
    /// 3. run all configured factory post-processors,
    /// 4. register all configured object post-processors,
    /// 5. eagerly instantiate every singleton in registry order.
    ///
    /// Configuration failures surface directly; later phases are wrapped in
    /// `CoreError::Refresh` with the cause attached.
    pub fn refresh(&self) -> Result<(), CoreError> {
        if self.shared.state() != ContextState::Uninitialized {
            return Err(CoreError::state(format!(
                "refresh requires an uninitialized context, found {}",
                self.shared.state()
            )));
        }
        self.shared.set_state(ContextState::Refreshing);
        let started = Instant::now();
        let factory = &self.shared.factory;

        for source in &self.sources {
            let records = source.load_definitions()?;
            debug!(
                source = source.description(),
                records = records.len(),
                "loaded definition records"
            );
            for record in records {
                let (name, definition) = record.into_definition()?;
                factory.register_definition(name, definition)?;
            }
        }

        let aware = ContextAwareProcessor::new(self.context_ref());
        factory
            .add_object_post_processor(Arc::new(aware))
            .map_err(CoreError::refresh)?;

        let factory_processors = factory
            .invoke_factory_post_processors()
            .map_err(CoreError::refresh)?;
        let object_processors = factory
            .register_object_post_processors()
            .map_err(CoreError::refresh)?;
        factory
            .pre_instantiate_singletons()
            .map_err(CoreError::refresh)?;

        if let Ok(mut at) = self.shared.refreshed_at.write() {
            *at = Some(Utc::now());
        }
        self.shared.set_state(ContextState::Ready);
        info!(
            context = %self.shared.id,
            definitions = factory.definition_count(),
            factory_post_processors = factory_processors,
            object_post_processors = object_processors,
            elapsed = ?started.elapsed(),
            "application context refreshed"
        );
        Ok(())
    }

    /// Resolve a singleton by name; requires a successfully refreshed context
    pub fn get_object(&self, name: &str) -> Result<ObjectHandle, CoreError> {
        self.shared.ensure_ready()?;
        self.shared.factory.get_object(name)
    }

    /// Resolve every definition whose registered concrete type is `T`
    pub fn objects_of_type<T>(&self) -> Result<Vec<(String, ObjectHandle)>, CoreError>
    where
        T: ManagedObject,
    {
        self.shared.ensure_ready()?;
        self.shared.factory.objects_of_type::<T>()
    }

    /// Borrow the object registered under `name` as a `T`
    pub fn with_object<T, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Result<R, CoreError>
    where
        T: ManagedObject,
    {
        self.shared.ensure_ready()?;
        self.shared.factory.with_object(name, f)
    }

    /// Definition names in registration order
    pub fn definition_names(&self) -> Vec<String> {
        self.shared.factory.definition_names()
    }

    pub fn contains_definition(&self, name: &str) -> bool {
        self.shared.factory.contains_definition(name)
    }

    /// Create a non-owning handle to this context
    pub fn context_ref(&self) -> ContextRef {
        ContextRef {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Destroy all singletons in reverse creation order and move to
    /// `Closed`. Safe to call any number of times and from exit paths: it
    /// never panics and never returns an error.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Spawn a task that closes the context when the process receives an
    /// interrupt signal. Must be called within a tokio runtime. The task
    /// holds only a weak reference, so a dropped context does not linger.
    pub fn register_shutdown_hook(&self) -> tokio::task::JoinHandle<()> {
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("failed to listen for the interrupt signal, shutdown hook disabled");
                return;
            }
            if let Some(shared) = shared.upgrade() {
                info!(context = %shared.id, "interrupt received, closing context");
                shared.close();
            }
        })
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state())
            .field("factory", &self.shared.factory)
            .finish()
    }
}
