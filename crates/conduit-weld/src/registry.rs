//! Metadata registry
//!
//! Append-only table of component descriptors. Lists are created on first
//! use and only ever grow; `reset()` exists so tests can start clean.

use crate::descriptor::{
    AccessorDescriptor, CommandDescriptor, ComponentDescriptor, ComponentId, ExposedMethod,
    HookDescriptor, ListenerDescriptor, MenuBinding,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;

/// Member descriptor families stored per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Method,
    Accessor,
    Command,
    MenuItem,
    Hook,
    Listener,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DescriptorKind::Method => "method",
            DescriptorKind::Accessor => "accessor",
            DescriptorKind::Command => "command",
            DescriptorKind::MenuItem => "menu item",
            DescriptorKind::Hook => "hook",
            DescriptorKind::Listener => "listener",
        };
        f.write_str(name)
    }
}

/// A member descriptor that lives in one list of a `ComponentDescriptor`
pub trait Descriptor: Clone + Send + Sync + 'static {
    const KIND: DescriptorKind;

    fn list(component: &ComponentDescriptor) -> &[Self];
    fn list_mut(component: &mut ComponentDescriptor) -> &mut Vec<Self>;
}

impl Descriptor for ExposedMethod {
    const KIND: DescriptorKind = DescriptorKind::Method;

    fn list(component: &ComponentDescriptor) -> &[Self] {
        &component.methods
    }

    fn list_mut(component: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut component.methods
    }
}

impl Descriptor for AccessorDescriptor {
    const KIND: DescriptorKind = DescriptorKind::Accessor;

    fn list(component: &ComponentDescriptor) -> &[Self] {
        &component.accessors
    }

    fn list_mut(component: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut component.accessors
    }
}

impl Descriptor for CommandDescriptor {
    const KIND: DescriptorKind = DescriptorKind::Command;

    fn list(component: &ComponentDescriptor) -> &[Self] {
        &component.commands
    }

    fn list_mut(component: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut component.commands
    }
}

impl Descriptor for MenuBinding {
    const KIND: DescriptorKind = DescriptorKind::MenuItem;

    fn list(component: &ComponentDescriptor) -> &[Self] {
        &component.menu_items
    }

    fn list_mut(component: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut component.menu_items
    }
}

impl Descriptor for HookDescriptor {
    const KIND: DescriptorKind = DescriptorKind::Hook;

    fn list(component: &ComponentDescriptor) -> &[Self] {
        &component.hooks
    }

    fn list_mut(component: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut component.hooks
    }
}

impl Descriptor for ListenerDescriptor {
    const KIND: DescriptorKind = DescriptorKind::Listener;

    fn list(component: &ComponentDescriptor) -> &[Self] {
        &component.listeners
    }

    fn list_mut(component: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut component.listeners
    }
}

/// Registry of component descriptors, in declaration order
#[derive(Debug, Default)]
pub struct Registry {
    components: RwLock<IndexMap<ComponentId, ComponentDescriptor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a descriptor list
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ComponentDescriptor>) -> Self {
        let registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor);
        }
        registry
    }

    /// Record the component-level options: alias and constructor dependencies
    pub fn declare(
        &self,
        component: &ComponentId,
        alias: Option<String>,
        dependencies: Vec<ComponentId>,
    ) {
        let mut components = self.components.write();
        let entry = components
            .entry(component.clone())
            .or_insert_with(|| ComponentDescriptor::new(component.clone()));
        if alias.is_some() {
            entry.alias = alias;
        }
        if !dependencies.is_empty() {
            entry.dependencies = dependencies;
        }
    }

    /// Append a member descriptor to its list under `component`
    pub fn record<D: Descriptor>(&self, component: &ComponentId, descriptor: D) {
        let mut components = self.components.write();
        let entry = components
            .entry(component.clone())
            .or_insert_with(|| ComponentDescriptor::new(component.clone()));
        D::list_mut(entry).push(descriptor);

        tracing::trace!(component = %component, kind = %D::KIND, "Recorded descriptor");
    }

    /// Recorded list of one kind, or empty
    pub fn query<D: Descriptor>(&self, component: &ComponentId) -> Vec<D> {
        self.components
            .read()
            .get(component)
            .map(|entry| D::list(entry).to_vec())
            .unwrap_or_default()
    }

    /// Merge a whole descriptor into the registry
    pub fn insert(&self, descriptor: ComponentDescriptor) {
        let ComponentDescriptor {
            identity,
            alias,
            dependencies,
            methods,
            accessors,
            commands,
            menu_items,
            hooks,
            listeners,
        } = descriptor;

        let mut components = self.components.write();
        let entry = components
            .entry(identity.clone())
            .or_insert_with(|| ComponentDescriptor::new(identity));
        if alias.is_some() {
            entry.alias = alias;
        }
        if !dependencies.is_empty() {
            entry.dependencies = dependencies;
        }
        entry.methods.extend(methods);
        entry.accessors.extend(accessors);
        entry.commands.extend(commands);
        entry.menu_items.extend(menu_items);
        entry.hooks.extend(hooks);
        entry.listeners.extend(listeners);
    }

    pub fn describe(&self, component: &ComponentId) -> Option<ComponentDescriptor> {
        self.components.read().get(component).cloned()
    }

    pub fn contains(&self, component: &ComponentId) -> bool {
        self.components.read().contains_key(component)
    }

    /// Snapshot of every descriptor, in declaration order
    pub fn components(&self) -> Vec<ComponentDescriptor> {
        self.components.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.read().is_empty()
    }

    /// Forget everything. Test isolation only.
    pub fn reset(&self) {
        self.components.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_creates_list_on_first_use() {
        let registry = Registry::new();
        let id = ComponentId::new("Counter");

        assert!(registry.query::<ExposedMethod>(&id).is_empty());

        registry.record(&id, ExposedMethod::new("increment"));
        registry.record(&id, ExposedMethod::new("decrement"));
        registry.record(&id, AccessorDescriptor::new("value"));

        let methods = registry.query::<ExposedMethod>(&id);
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[1].name, "decrement");
        assert_eq!(registry.query::<AccessorDescriptor>(&id).len(), 1);
        assert!(registry.query::<CommandDescriptor>(&id).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_declare_keeps_recorded_members() {
        let registry = Registry::new();
        let id = ComponentId::new("Editor");

        registry.record(&id, ExposedMethod::new("save"));
        registry.declare(&id, Some("editor".into()), vec![ComponentId::new("Store")]);

        let desc = registry.describe(&id).unwrap();
        assert_eq!(desc.alias.as_deref(), Some("editor"));
        assert_eq!(desc.dependencies, vec![ComponentId::new("Store")]);
        assert_eq!(desc.methods.len(), 1);
    }

    #[test]
    fn test_insert_merges_and_preserves_order() {
        let registry = Registry::from_descriptors([
            ComponentDescriptor::new("B"),
            ComponentDescriptor::new("A").expose(ExposedMethod::new("one")),
        ]);
        registry.insert(ComponentDescriptor::new("A").expose(ExposedMethod::new("two")));

        let ids: Vec<_> = registry
            .components()
            .into_iter()
            .map(|c| c.identity.to_string())
            .collect();
        assert_eq!(ids, ["B", "A"]);
        assert_eq!(registry.query::<ExposedMethod>(&ComponentId::new("A")).len(), 2);
    }

    #[test]
    fn test_hooks_and_listeners_are_recorded() {
        let registry = Registry::new();
        let id = ComponentId::new("Notifier");

        registry.record(&id, HookDescriptor::new("greet", "message"));
        registry.insert(
            ComponentDescriptor::new("Notifier")
                .listener(ListenerDescriptor::on_main("refresh", "refresh")),
        );

        assert_eq!(registry.query::<HookDescriptor>(&id)[0].channel, "message");
        assert_eq!(registry.query::<ListenerDescriptor>(&id)[0].name, "refresh");
    }

    #[test]
    fn test_reset() {
        let registry = Registry::new();
        registry.record(&ComponentId::new("X"), MenuBinding::new("quit", ["$quit"]));
        registry.reset();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_parallel_records_are_not_lost() {
        let registry = Arc::new(Registry::new());
        let id = ComponentId::new("Shared");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    registry.record(&id, ExposedMethod::new(format!("m{}", i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.query::<ExposedMethod>(&id).len(), 8);
    }
}
