//! Privileged side of the bridge: serves component members on their channels

use crate::error::BridgeError;
use crate::transport::{Endpoint, Handler, Link, Side};
use conduit_weld::naming::{
    main_channel, main_serve_channel, menu_channel, renderer_channel, renderer_serve_channel,
};
use conduit_weld::{
    CallMode, Component, ComponentDescriptor, ComponentId, Container, Invocation, ListenerSide,
    MenuSelector, Operation, SurfaceCall, COMPONENTS_CHANNEL,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;

type Descriptors = Arc<RwLock<IndexMap<ComponentId, ComponentDescriptor>>>;
type MenuRoutes = Arc<RwLock<IndexMap<String, Vec<MenuTarget>>>>;

#[derive(Clone)]
struct MenuTarget {
    component: ComponentId,
    member: String,
    instance: Arc<dyn Component>,
    hook: Option<HookForward>,
}

impl MenuTarget {
    fn same(&self, other: &MenuTarget) -> bool {
        self.component == other.component && self.member == other.member
    }
}

/// Pushes the results of a hooked method to its sandbox channel
#[derive(Clone)]
struct HookForward {
    channel: String,
    endpoint: Weak<Endpoint>,
    runtime: Handle,
}

impl HookForward {
    /// Fire and forget; the sandbox may not be listening
    fn push(&self, value: &Value) {
        let Some(endpoint) = self.endpoint.upgrade() else {
            return;
        };
        let channel = self.channel.clone();
        let value = value.clone();
        self.runtime.spawn(async move {
            if let Err(e) = endpoint.request(&channel, vec![value]).await {
                tracing::debug!(channel = %channel, error = %e, "Hook result not delivered");
            }
        });
    }
}

/// The privileged process's half of the bridge
pub struct Bridge {
    endpoint: Arc<Endpoint>,
    components: Descriptors,
    instances: RwLock<IndexMap<ComponentId, Arc<dyn Component>>>,
    menu_routes: MenuRoutes,
    runtime: Handle,
}

impl Bridge {
    /// Start serving `link` on the current Tokio runtime
    pub fn new(link: Link) -> Result<Arc<Self>, BridgeError> {
        let runtime = Handle::try_current()?;
        let endpoint = Endpoint::new(Side::Privileged, link.outbound);
        let bridge = Arc::new(Self {
            endpoint: Arc::clone(&endpoint),
            components: Arc::default(),
            instances: RwLock::new(IndexMap::new()),
            menu_routes: Arc::default(),
            runtime,
        });

        let components = Arc::clone(&bridge.components);
        endpoint.handle(
            COMPONENTS_CHANNEL,
            Handler::blocking(move |_| {
                let descriptors: Vec<ComponentDescriptor> =
                    components.read().values().cloned().collect();
                Ok(serde_json::to_value(descriptors)?)
            }),
        );

        endpoint.spawn(link.inbound)?;
        Ok(bridge)
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// Wire every constructed component of `container`
    pub fn install(&self, container: &Container) -> usize {
        let wired = container
            .instances()
            .into_iter()
            .map(|(descriptor, instance)| self.register_component(&descriptor, instance))
            .sum();
        tracing::info!(handlers = wired, "Bridge installed");
        wired
    }

    fn hook_forward(&self, descriptor: &ComponentDescriptor, member: &str) -> Option<HookForward> {
        descriptor.hook_for(member).map(|hook| HookForward {
            channel: hook.renderer_channel(),
            endpoint: Arc::downgrade(&self.endpoint),
            runtime: self.runtime.clone(),
        })
    }

    /// Register the channel handlers of one component, returning how many
    /// were newly added
    pub fn register_component(
        &self,
        descriptor: &ComponentDescriptor,
        instance: Arc<dyn Component>,
    ) -> usize {
        let mut wired = 0;

        for call in descriptor.routes() {
            let hook = self.hook_forward(descriptor, &call.target);
            let handler = route_handler(&call, Arc::clone(&instance), hook);
            if self.endpoint.handle(call.channel, handler) {
                wired += 1;
            }
        }

        for binding in &descriptor.menu_items {
            for selector in &binding.selectors {
                let target = MenuTarget {
                    component: descriptor.identity.clone(),
                    member: binding.name.clone(),
                    instance: Arc::clone(&instance),
                    hook: self.hook_forward(descriptor, &binding.name),
                };
                if self.bind_menu(selector, target) {
                    wired += 1;
                }
            }
        }

        for listener in descriptor.listeners_on(ListenerSide::Main) {
            let handler = listener_handler(&listener.name, listener.is_async, Arc::clone(&instance));
            if self.endpoint.handle(main_channel(&listener.channel), handler) {
                wired += 1;
            }
        }

        self.components
            .write()
            .entry(descriptor.identity.clone())
            .or_insert_with(|| descriptor.clone());
        self.instances
            .write()
            .entry(descriptor.identity.clone())
            .or_insert(instance);

        tracing::debug!(component = %descriptor.identity, handlers = wired, "Component wired");
        wired
    }

    fn bind_menu(&self, selector: &MenuSelector, target: MenuTarget) -> bool {
        let channel = menu_channel(selector);
        {
            let mut routes = self.menu_routes.write();
            let targets = routes.entry(channel.clone()).or_default();
            if targets.iter().any(|t| t.same(&target)) {
                tracing::info!(
                    channel = %channel,
                    component = %target.component,
                    member = %target.member,
                    "Menu handler already registered, skipping"
                );
                return false;
            }
            targets.push(target);
        }

        if !self.endpoint.has_listener(&channel) {
            let routes = Arc::clone(&self.menu_routes);
            let runtime = self.runtime.clone();
            let selector = selector.clone();
            self.endpoint.handle(
                channel,
                Handler::blocking(move |_| {
                    let fired = dispatch_menu(&routes, &runtime, std::slice::from_ref(&selector));
                    Ok(Value::from(fired))
                }),
            );
        }
        true
    }

    /// Fire every component method bound to any of `selectors`, each
    /// (component, method) pair at most once. Returns how many fired.
    pub fn activate_menu(&self, selectors: &[MenuSelector]) -> usize {
        dispatch_menu(&self.menu_routes, &self.runtime, selectors)
    }

    /// Descriptors of every wired component, in wiring order
    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.components.read().values().cloned().collect()
    }

    /// Call a method of a wired component from the privileged process.
    /// A hooked method pushes its result to the sandbox here too.
    pub async fn call(
        &self,
        component: &ComponentId,
        member: &str,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        let (instance, hook) = {
            let instance = self.instances.read().get(component).cloned();
            let descriptor = self.components.read().get(component).cloned();
            match (instance, descriptor) {
                (Some(instance), Some(descriptor)) => {
                    (instance, self.hook_forward(&descriptor, member))
                }
                _ => return Err(BridgeError::unknown_member(format!("{}.{}", component, member))),
            }
        };

        let value = instance.invoke(member, args).into_future().await?;
        if let Some(hook) = hook {
            hook.push(&value);
        }
        Ok(value)
    }

    /// Serve an application channel for the sandboxed process
    pub fn handle(&self, name: &str, handler: Handler) -> bool {
        self.endpoint.handle(main_channel(name), handler)
    }

    /// Call an application channel served by the sandboxed process
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.endpoint.request(&renderer_channel(name), args).await
    }

    /// Serve a named value the sandboxed process pulls with `Sandbox::receive`
    pub fn serve(&self, name: &str, handler: Handler) -> bool {
        self.endpoint.handle(main_serve_channel(name), handler)
    }

    /// Pull a named value served by the sandboxed process
    pub async fn receive(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.endpoint.request(&renderer_serve_channel(name), args).await
    }
}

fn first(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Null)
}

fn route_handler(
    call: &SurfaceCall,
    instance: Arc<dyn Component>,
    hook: Option<HookForward>,
) -> Handler {
    let target = call.target.clone();
    let operation = call.operation;

    match (operation, call.mode) {
        (Operation::Get, CallMode::Blocking) => {
            Handler::blocking(move |_| Ok(instance.read(&target)?))
        }
        (Operation::Get, CallMode::NonBlocking) => Handler::non_blocking(move |_| {
            futures::future::ready(instance.read(&target).map_err(BridgeError::from))
        }),
        (Operation::Set, CallMode::Blocking) => Handler::blocking(move |args| {
            instance.write(&target, first(args))?;
            Ok(Value::Null)
        }),
        (Operation::Set, CallMode::NonBlocking) => Handler::non_blocking(move |args| {
            let result = instance
                .write(&target, first(args))
                .map(|_| Value::Null)
                .map_err(BridgeError::from);
            futures::future::ready(result)
        }),
        (_, CallMode::Blocking) => {
            let channel = call.channel.clone();
            Handler::blocking(move |args| {
                let args = if operation == Operation::Command { Vec::new() } else { args };
                let value = match Arc::clone(&instance).invoke(&target, args) {
                    Invocation::Ready(result) => result?,
                    Invocation::Pending(_) => return Err(BridgeError::not_blocking(channel.as_str())),
                };
                if let Some(hook) = &hook {
                    hook.push(&value);
                }
                Ok(value)
            })
        }
        (_, CallMode::NonBlocking) => Handler::non_blocking(move |args| {
            let args = if operation == Operation::Command { Vec::new() } else { args };
            let invocation = Arc::clone(&instance).invoke(&target, args);
            let hook = hook.clone();
            async move {
                let value = invocation.into_future().await?;
                if let Some(hook) = &hook {
                    hook.push(&value);
                }
                Ok(value)
            }
        }),
    }
}

/// Handler calling `member` with the payload of every message
pub(crate) fn listener_handler(member: &str, is_async: bool, instance: Arc<dyn Component>) -> Handler {
    let member = member.to_string();
    if is_async {
        Handler::non_blocking(move |args| {
            let invocation = Arc::clone(&instance).invoke(&member, args);
            async move { Ok(invocation.into_future().await?) }
        })
    } else {
        Handler::blocking(move |args| match Arc::clone(&instance).invoke(&member, args) {
            Invocation::Ready(result) => Ok(result?),
            Invocation::Pending(_) => Err(BridgeError::not_blocking(member.as_str())),
        })
    }
}

fn dispatch_menu(routes: &MenuRoutes, runtime: &Handle, selectors: &[MenuSelector]) -> usize {
    let mut fired: Vec<MenuTarget> = Vec::new();
    {
        let routes = routes.read();
        for selector in selectors {
            let Some(targets) = routes.get(&menu_channel(selector)) else {
                continue;
            };
            for target in targets {
                if !fired.iter().any(|f| f.same(target)) {
                    fired.push(target.clone());
                }
            }
        }
    }

    for target in &fired {
        tracing::debug!(component = %target.component, member = %target.member, "Menu activated");
        match Arc::clone(&target.instance).invoke(&target.member, Vec::new()) {
            Invocation::Ready(Ok(value)) => {
                if let Some(hook) = &target.hook {
                    hook.push(&value);
                }
            }
            Invocation::Ready(Err(e)) => {
                tracing::warn!(component = %target.component, error = %e, "Menu handler failed");
            }
            Invocation::Pending(future) => {
                let component = target.component.clone();
                let hook = target.hook.clone();
                runtime.spawn(async move {
                    match future.await {
                        Ok(value) => {
                            if let Some(hook) = &hook {
                                hook.push(&value);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(component = %component, error = %e, "Menu handler failed");
                        }
                    }
                });
            }
        }
    }
    fired.len()
}
