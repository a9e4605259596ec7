//! Descriptor records for managed components
//!
//! A `ComponentDescriptor` is the one schema shared by the runtime bridge
//! and the declaration generator. Every annotated member ends up as one of
//! the member descriptors below.

use crate::naming::camelcase;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identity of a managed component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Method exposed to the sandboxed process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposedMethod {
    /// Declared method name
    pub name: String,
    /// Whether the method settles asynchronously
    pub is_async: bool,
    /// External rename
    pub alias: Option<String>,
}

impl ExposedMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_async: false,
            alias: None,
        }
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name the sandboxed side calls this method by
    pub fn external_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Property exposed through getter/setter calls
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorDescriptor {
    pub property_key: String,
    pub getter: Option<String>,
    pub setter: Option<String>,
    /// Shared base name for both accessors
    pub alias: Option<String>,
}

impl AccessorDescriptor {
    pub fn new(property_key: impl Into<String>) -> Self {
        Self {
            property_key: property_key.into(),
            getter: None,
            setter: None,
            alias: None,
        }
    }

    pub fn with_getter(mut self, getter: impl Into<String>) -> Self {
        self.getter = Some(getter.into());
        self
    }

    pub fn with_setter(mut self, setter: impl Into<String>) -> Self {
        self.setter = Some(setter.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn base_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.property_key)
    }

    /// `getter` override, else `get` + base name
    pub fn getter_name(&self) -> String {
        self.getter
            .clone()
            .unwrap_or_else(|| camelcase("get", &[self.base_name()]))
    }

    /// `setter` override, else `set` + base name
    pub fn setter_name(&self) -> String {
        self.setter
            .clone()
            .unwrap_or_else(|| camelcase("set", &[self.base_name()]))
    }
}

/// Method bound to one or more key combinations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescriptor {
    pub name: String,
    pub is_async: bool,
    pub combinations: Vec<String>,
}

impl CommandDescriptor {
    pub fn new<I, S>(name: impl Into<String>, combinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            is_async: false,
            combinations: combinations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// How a menu node is matched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MenuSelector {
    /// Bare text, matched against the node label
    Label(String),
    /// `#id`
    Id(String),
    /// `:accelerator`
    Accelerator(String),
    /// `$role`
    Role(String),
}

impl MenuSelector {
    /// Parse selector text, honouring its discriminator prefix
    pub fn parse(text: &str) -> Self {
        if let Some(id) = text.strip_prefix('#') {
            MenuSelector::Id(id.to_string())
        } else if let Some(accelerator) = text.strip_prefix(':') {
            MenuSelector::Accelerator(accelerator.to_string())
        } else if let Some(role) = text.strip_prefix('$') {
            MenuSelector::Role(role.to_string())
        } else {
            MenuSelector::Label(text.to_string())
        }
    }
}

impl fmt::Display for MenuSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuSelector::Label(label) => write!(f, "{}", label),
            MenuSelector::Id(id) => write!(f, "#{}", id),
            MenuSelector::Accelerator(accelerator) => write!(f, ":{}", accelerator),
            MenuSelector::Role(role) => write!(f, "${}", role),
        }
    }
}

impl From<String> for MenuSelector {
    fn from(s: String) -> Self {
        MenuSelector::parse(&s)
    }
}

impl From<MenuSelector> for String {
    fn from(selector: MenuSelector) -> Self {
        selector.to_string()
    }
}

/// Method fired when a matching menu node is activated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuBinding {
    pub name: String,
    pub is_async: bool,
    pub selectors: Vec<MenuSelector>,
}

impl MenuBinding {
    pub fn new<I, S>(name: impl Into<String>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            is_async: false,
            selectors: selectors
                .into_iter()
                .map(|s| MenuSelector::parse(s.as_ref()))
                .collect(),
        }
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// Method whose every result is also pushed to a sandbox channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDescriptor {
    pub name: String,
    pub is_async: bool,
    /// Application channel name, without the renderer prefix
    pub channel: String,
}

impl HookDescriptor {
    pub fn new(name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_async: false,
            channel: channel.into(),
        }
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// Process whose application channel a listener is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListenerSide {
    Main,
    Renderer,
}

/// Method called with the payload of every message on an application channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerDescriptor {
    pub name: String,
    pub is_async: bool,
    pub side: ListenerSide,
    pub channel: String,
}

impl ListenerDescriptor {
    pub fn on_main(name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::new(name, ListenerSide::Main, channel)
    }

    pub fn on_renderer(name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::new(name, ListenerSide::Renderer, channel)
    }

    fn new(name: impl Into<String>, side: ListenerSide, channel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_async: false,
            side,
            channel: channel.into(),
        }
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// Everything recorded about one managed component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub identity: ComponentId,
    /// Override for the name the sandboxed process sees
    pub alias: Option<String>,
    /// Constructor dependencies, in argument order
    pub dependencies: Vec<ComponentId>,
    pub methods: Vec<ExposedMethod>,
    pub accessors: Vec<AccessorDescriptor>,
    pub commands: Vec<CommandDescriptor>,
    pub menu_items: Vec<MenuBinding>,
    #[serde(default)]
    pub hooks: Vec<HookDescriptor>,
    #[serde(default)]
    pub listeners: Vec<ListenerDescriptor>,
}

impl ComponentDescriptor {
    pub fn new(identity: impl Into<ComponentId>) -> Self {
        Self {
            identity: identity.into(),
            alias: None,
            dependencies: Vec::new(),
            methods: Vec::new(),
            accessors: Vec::new(),
            commands: Vec::new(),
            menu_items: Vec::new(),
            hooks: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<ComponentId>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn expose(mut self, method: ExposedMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn accessor(mut self, accessor: AccessorDescriptor) -> Self {
        self.accessors.push(accessor);
        self
    }

    pub fn command(mut self, command: CommandDescriptor) -> Self {
        self.commands.push(command);
        self
    }

    pub fn menu_item(mut self, binding: MenuBinding) -> Self {
        self.menu_items.push(binding);
        self
    }

    pub fn hook(mut self, hook: HookDescriptor) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn listener(mut self, listener: ListenerDescriptor) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Hook attached to method `name`
    pub fn hook_for(&self, name: &str) -> Option<&HookDescriptor> {
        self.hooks.iter().find(|hook| hook.name == name)
    }

    /// Listeners attached to `side`
    pub fn listeners_on(&self, side: ListenerSide) -> impl Iterator<Item = &ListenerDescriptor> {
        self.listeners.iter().filter(move |l| l.side == side)
    }

    /// Alias, or the lower-camel form of the identity
    pub fn external_alias(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => camelcase(self.identity.as_str(), &[]),
        }
    }
}
