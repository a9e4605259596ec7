//! Injection container
//!
//! Components are process-lifetime singletons. The container is built in
//! two phases: descriptors and factories are collected first, then
//! `resolve` constructs on demand.
//!
//! Every dependency is handed over as an `Injected` handle. When a cycle is
//! detected the component still gets a handle to the instance that is being
//! built; it becomes readable once that construction finishes, so both ends
//! of the cycle end up constructed.
//!
//! Construction of one component is owned by the thread that started it.
//! Another thread resolving the same component waits for it to finish;
//! only re-entry along the owner's own dependency chain is a cycle.

use crate::component::{AsAny, Component};
use crate::descriptor::{ComponentDescriptor, ComponentId};
use crate::inventory::{collect_components, Registration};
use crate::registry::Registry;
use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

/// Constructs a component from its resolved dependencies
pub type Factory = Arc<dyn Fn(Dependencies) -> Arc<dyn Component> + Send + Sync>;

/// Shared handle to a (possibly still constructing) component instance
#[derive(Clone)]
pub struct Injected {
    id: ComponentId,
    cell: Arc<OnceLock<Arc<dyn Component>>>,
}

impl Injected {
    fn pending(id: ComponentId) -> Self {
        Self {
            id,
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Whether construction has finished
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn component(&self) -> Option<Arc<dyn Component>> {
        self.cell.get().cloned()
    }

    /// Typed instance, once constructed
    pub fn get<T: Component>(&self) -> Option<Arc<T>> {
        let component = self.cell.get()?.clone();
        AsAny::into_any(component).downcast::<T>().ok()
    }
}

impl std::fmt::Debug for Injected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injected")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Positional constructor arguments; unresolvable dependencies are `None`
#[derive(Debug, Default)]
pub struct Dependencies {
    args: Vec<Option<Injected>>,
}

impl Dependencies {
    pub fn new(args: Vec<Option<Injected>>) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Injected> {
        self.args.get(index).and_then(Option::as_ref)
    }

    /// Handle for a dependency, readable later even if it is still constructing
    pub fn handle(&self, index: usize) -> Option<Injected> {
        self.get(index).cloned()
    }

    /// Typed instance if the dependency is already constructed
    pub fn instance<T: Component>(&self, index: usize) -> Option<Arc<T>> {
        self.get(index)?.get::<T>()
    }

    pub fn into_vec(self) -> Vec<Option<Injected>> {
        self.args
    }
}

/// First phase: collect descriptors and factories
pub struct ContainerBuilder {
    registry: Arc<Registry>,
    factories: IndexMap<ComponentId, Factory>,
}

impl ContainerBuilder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            factories: IndexMap::new(),
        }
    }

    /// Start from every `#[component]` linked into the binary
    pub fn from_inventory(registry: Arc<Registry>) -> Self {
        collect_components()
            .into_iter()
            .fold(Self::new(registry), |builder, registration| {
                builder.registration(registration)
            })
    }

    /// Record a descriptor together with its factory
    pub fn component<F>(self, descriptor: ComponentDescriptor, factory: F) -> Self
    where
        F: Fn(Dependencies) -> Arc<dyn Component> + Send + Sync + 'static,
    {
        let id = descriptor.identity.clone();
        self.registry.insert(descriptor);
        self.factory(id, factory)
    }

    /// Factory for a component already present in the registry
    pub fn factory<F>(mut self, id: impl Into<ComponentId>, factory: F) -> Self
    where
        F: Fn(Dependencies) -> Arc<dyn Component> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    pub fn registration(self, registration: Registration) -> Self {
        let Registration {
            descriptor,
            factory,
        } = registration;
        self.component(descriptor, factory)
    }

    pub fn build(self) -> Container {
        Container {
            registry: self.registry,
            factories: self.factories,
            state: Mutex::new(ContainerState::default()),
            built: Condvar::new(),
            cycles: Mutex::new(Vec::new()),
        }
    }
}

#[derive(Default)]
struct ContainerState {
    instances: IndexMap<ComponentId, Injected>,
    /// Components under construction and the thread building each
    constructing: IndexMap<ComponentId, ThreadId>,
    /// Component each blocked thread is waiting for
    waiting: HashMap<ThreadId, ComponentId>,
}

impl ContainerState {
    /// Whether `owner` is, directly or through other waiting threads,
    /// blocked on a construction owned by `me`
    fn waits_on(&self, owner: ThreadId, me: ThreadId) -> bool {
        let mut current = owner;
        for _ in 0..=self.waiting.len() {
            if current == me {
                return true;
            }
            let Some(next) = self
                .waiting
                .get(&current)
                .and_then(|id| self.constructing.get(id))
            else {
                return false;
            };
            current = *next;
        }
        false
    }

    /// Construction chain of `me`, outermost first
    fn path(&self, me: ThreadId) -> String {
        self.constructing
            .iter()
            .filter(|(_, owner)| **owner == me)
            .map(|(c, _)| c.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Second phase: singleton construction
pub struct Container {
    registry: Arc<Registry>,
    factories: IndexMap<ComponentId, Factory>,
    state: Mutex<ContainerState>,
    /// Signalled whenever a construction finishes
    built: Condvar,
    cycles: Mutex<Vec<ComponentId>>,
}

impl Container {
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolve a component, constructing it and its dependencies on first use.
    ///
    /// Returns `None` only when nothing can construct `id`.
    pub fn resolve(&self, id: &ComponentId) -> Option<Injected> {
        let Some(factory) = self.factories.get(id).cloned() else {
            // Unregistered dependencies become absent arguments.
            tracing::debug!(component = %id, "No component registered, resolving to absent");
            return None;
        };

        let me = thread::current().id();
        let slot = {
            let mut state = self.state.lock();
            while let Some(existing) = state.instances.get(id).cloned() {
                let Some(owner) = state.constructing.get(id).copied() else {
                    return Some(existing);
                };
                if owner == me || state.waits_on(owner, me) {
                    let path = state.path(me);
                    tracing::warn!(
                        component = %id,
                        path = %path,
                        "Circular dependency injection detected: {}",
                        id
                    );
                    self.cycles.lock().push(id.clone());
                    return Some(existing);
                }

                tracing::trace!(component = %id, "Waiting for construction on another thread");
                state.waiting.insert(me, id.clone());
                self.built.wait(&mut state);
                state.waiting.remove(&me);
            }

            let slot = Injected::pending(id.clone());
            state.instances.insert(id.clone(), slot.clone());
            state.constructing.insert(id.clone(), me);
            slot
        };

        let dependencies = self
            .registry
            .describe(id)
            .map(|descriptor| descriptor.dependencies)
            .unwrap_or_default();
        let args = dependencies.iter().map(|dep| self.resolve(dep)).collect();

        let instance = factory(Dependencies::new(args));
        let _ = slot.cell.set(instance);
        self.state.lock().constructing.shift_remove(id);
        self.built.notify_all();

        tracing::debug!(component = %id, "Component constructed");
        Some(slot)
    }

    /// Resolve every registered component in declaration order
    pub fn resolve_all(&self) -> Vec<Injected> {
        self.registry
            .components()
            .iter()
            .filter_map(|descriptor| self.resolve(&descriptor.identity))
            .collect()
    }

    /// Constructed components with their descriptors, in declaration order
    pub fn instances(&self) -> Vec<(ComponentDescriptor, Arc<dyn Component>)> {
        let state = self.state.lock();
        self.registry
            .components()
            .into_iter()
            .filter_map(|descriptor| {
                let component = state.instances.get(&descriptor.identity)?.component()?;
                Some((descriptor, component))
            })
            .collect()
    }

    pub fn get<T: Component>(&self, id: &ComponentId) -> Option<Arc<T>> {
        self.state.lock().instances.get(id)?.get::<T>()
    }

    /// Components at which a construction cycle was detected
    pub fn cycles(&self) -> Vec<ComponentId> {
        self.cycles.lock().clone()
    }
}
