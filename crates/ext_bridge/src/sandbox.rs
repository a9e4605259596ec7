//! Sandboxed side of the bridge: per-component stub tables

use crate::error::BridgeError;
use crate::privileged::listener_handler;
use crate::transport::{Endpoint, Handler, Link, Side};
use conduit_weld::naming::{
    main_channel, main_serve_channel, renderer_channel, renderer_serve_channel,
};
use conduit_weld::{
    CallMode, Component, ComponentDescriptor, ComponentId, HookDescriptor, ListenerSide,
    Operation, COMPONENTS_CHANNEL,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// The sandboxed process's half of the bridge
pub struct Sandbox {
    endpoint: Arc<Endpoint>,
}

impl Sandbox {
    /// Start serving `link` on the current Tokio runtime
    pub fn new(link: Link) -> Result<Arc<Self>, BridgeError> {
        let endpoint = Endpoint::new(Side::Sandboxed, link.outbound);
        endpoint.spawn(link.inbound)?;
        Ok(Arc::new(Self { endpoint }))
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// Fetch the descriptors the privileged process has wired
    pub async fn descriptors(&self) -> Result<Vec<ComponentDescriptor>, BridgeError> {
        let reply = self.endpoint.request(COMPONENTS_CHANNEL, Vec::new()).await?;
        Ok(serde_json::from_value(reply)?)
    }

    /// Build one stub table per component, keyed by its external alias
    pub async fn connect_components(&self) -> Result<IndexMap<String, ComponentApi>, BridgeError> {
        let descriptors = self.descriptors().await?;
        let apis: IndexMap<String, ComponentApi> = descriptors
            .iter()
            .map(|descriptor| {
                let api = ComponentApi::new(descriptor, Arc::clone(&self.endpoint));
                (api.alias.clone(), api)
            })
            .collect();
        tracing::info!(components = apis.len(), "Components connected");
        Ok(apis)
    }

    /// Serve an application channel for the privileged process
    pub fn handle(&self, name: &str, handler: Handler) -> bool {
        self.endpoint.handle(renderer_channel(name), handler)
    }

    /// Call an application channel served by the privileged process
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.endpoint.request(&main_channel(name), args).await
    }

    /// Blocking form of [`Sandbox::invoke`]; not for use inside async tasks
    pub fn invoke_blocking(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.endpoint.request_blocking(&main_channel(name), args)
    }

    /// Serve a named value the privileged process pulls with `Bridge::receive`
    pub fn serve(&self, name: &str, handler: Handler) -> bool {
        self.endpoint.handle(renderer_serve_channel(name), handler)
    }

    /// Pull a named value served by the privileged process. Parks the
    /// calling thread; not for use inside async tasks.
    pub fn receive(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.endpoint.request_blocking(&main_serve_channel(name), args)
    }

    /// Attach the renderer-side listeners of a component living in this
    /// process, returning how many were newly added
    pub fn listen(&self, descriptor: &ComponentDescriptor, instance: Arc<dyn Component>) -> usize {
        let mut wired = 0;
        for listener in descriptor.listeners_on(ListenerSide::Renderer) {
            let handler = listener_handler(&listener.name, listener.is_async, Arc::clone(&instance));
            if self.endpoint.handle(renderer_channel(&listener.channel), handler) {
                wired += 1;
            }
        }
        tracing::debug!(component = %descriptor.identity, listeners = wired, "Listeners attached");
        wired
    }
}

/// One callable member as seen by the sandboxed process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    pub channel: String,
    pub operation: Operation,
    pub mode: CallMode,
}

/// Stub table for one component
#[derive(Debug, Clone)]
pub struct ComponentApi {
    identity: ComponentId,
    alias: String,
    stubs: IndexMap<String, Stub>,
    hooks: Vec<HookDescriptor>,
    endpoint: Arc<Endpoint>,
}

impl ComponentApi {
    pub fn new(descriptor: &ComponentDescriptor, endpoint: Arc<Endpoint>) -> Self {
        let stubs = descriptor
            .surface()
            .into_iter()
            .map(|call| {
                let stub = Stub {
                    channel: call.channel,
                    operation: call.operation,
                    mode: call.mode,
                };
                (call.member, stub)
            })
            .collect();

        Self {
            identity: descriptor.identity.clone(),
            alias: descriptor.external_alias(),
            stubs,
            hooks: descriptor.hooks.clone(),
            endpoint,
        }
    }

    pub fn identity(&self) -> &ComponentId {
        &self.identity
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.stubs.keys().map(String::as_str)
    }

    pub fn stub(&self, member: &str) -> Option<&Stub> {
        self.stubs.get(member)
    }

    /// Methods whose results the privileged process pushes to this side
    pub fn hooks(&self) -> &[HookDescriptor] {
        &self.hooks
    }

    fn lookup(&self, member: &str) -> Result<&Stub, BridgeError> {
        self.stubs
            .get(member)
            .ok_or_else(|| BridgeError::unknown_member(format!("{}.{}", self.alias, member)))
    }

    /// Call a blocking member, parking the thread until it settles
    pub fn call(&self, member: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        let stub = self.lookup(member)?;
        if stub.mode != CallMode::Blocking {
            return Err(BridgeError::not_blocking(format!("{}.{}", self.alias, member)));
        }
        self.endpoint.request_blocking(&stub.channel, args)
    }

    /// Call any member and await its reply
    pub async fn call_async(&self, member: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        let stub = self.lookup(member)?;
        self.endpoint.request(&stub.channel, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privileged::Bridge;
    use crate::transport::link_pair;
    use conduit_weld::{
        AccessorDescriptor, CommandDescriptor, ExposedMethod, Invocation, ListenerDescriptor,
        MemberError,
    };
    use parking_lot::Mutex;
    use serde_json::json;

    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::new("SettingsStore")
            .expose(ExposedMethod::new("save"))
            .expose(ExposedMethod::new("load_all").asynchronous(true).with_alias("loadAll"))
            .accessor(AccessorDescriptor::new("theme").with_getter("currentTheme"))
            .command(CommandDescriptor::new("flush", ["ctrl+s"]))
    }

    #[tokio::test]
    async fn test_stub_table_follows_surface() {
        let (_main, renderer) = link_pair(4);
        let sandbox = Sandbox::new(renderer).unwrap();
        let api = ComponentApi::new(&descriptor(), Arc::clone(sandbox.endpoint()));

        assert_eq!(api.alias(), "settingsStore");
        let members: Vec<&str> = api.members().collect();
        assert_eq!(
            members,
            [
                "save",
                "saveAsync",
                "loadAll",
                "currentTheme",
                "currentThemeAsync",
                "setTheme",
                "setThemeAsync"
            ]
        );
        assert_eq!(api.stub("save").unwrap().mode, CallMode::Blocking);
        assert_eq!(api.stub("saveAsync").unwrap().mode, CallMode::NonBlocking);
        assert!(api.stub("flush").is_none());
    }

    #[tokio::test]
    async fn test_unknown_member_and_blocking_misuse() {
        let (_main, renderer) = link_pair(4);
        let sandbox = Sandbox::new(renderer).unwrap();
        let api = ComponentApi::new(&descriptor(), Arc::clone(sandbox.endpoint()));

        let err = api.call_async("missing", vec![]).await.unwrap_err();
        assert!(matches!(err, BridgeError::UnknownMember { .. }));
        let err = api.call("loadAll", vec![]).unwrap_err();
        assert!(matches!(err, BridgeError::NotBlocking { .. }));
    }

    #[tokio::test]
    async fn test_application_channels_both_directions() {
        let (main, renderer) = link_pair(4);
        let bridge = Bridge::new(main).unwrap();
        let sandbox = Sandbox::new(renderer).unwrap();

        bridge.handle(
            "version",
            Handler::blocking(|_| Ok(json!("1.2.0"))),
        );
        sandbox.handle(
            "title",
            Handler::non_blocking(|args| async move {
                Ok(json!(format!("Editing {}", args[0].as_str().unwrap_or_default())))
            }),
        );

        assert_eq!(sandbox.invoke("version", vec![]).await.unwrap(), json!("1.2.0"));
        assert_eq!(
            bridge.invoke("title", vec![json!("notes.md")]).await.unwrap(),
            json!("Editing notes.md")
        );
        assert!(sandbox.invoke("title", vec![]).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serve_and_receive_both_directions() {
        let (main, renderer) = link_pair(4);
        let bridge = Bridge::new(main).unwrap();
        let sandbox = Sandbox::new(renderer).unwrap();

        bridge.serve("content", Handler::blocking(|args| Ok(json!({ "draft": args }))));
        sandbox.serve(
            "selection",
            Handler::non_blocking(|_| async { Ok(json!("lorem")) }),
        );

        let pulling = Arc::clone(&sandbox);
        let content = tokio::task::spawn_blocking(move || pulling.receive("content", vec![json!(1)]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(content, json!({ "draft": [1] }));
        assert_eq!(bridge.receive("selection", vec![]).await.unwrap(), json!("lorem"));

        // served values are not application channels
        let err = sandbox.invoke("content", vec![]).await.unwrap_err();
        assert!(matches!(err, BridgeError::NoListener { .. }));
        assert!(bridge.invoke("selection", vec![]).await.is_err());
    }

    #[derive(Default)]
    struct Canvas {
        themes: Mutex<Vec<Value>>,
    }

    impl Component for Canvas {
        fn invoke(self: Arc<Self>, member: &str, args: Vec<Value>) -> Invocation {
            match member {
                "redraw" => {
                    self.themes.lock().extend(args);
                    Invocation::ready(Ok(Value::Null))
                }
                other => Invocation::ready(Err(MemberError::unknown_member(other))),
            }
        }
    }

    #[tokio::test]
    async fn test_renderer_listener_receives_payload() {
        let (main, renderer) = link_pair(4);
        let bridge = Bridge::new(main).unwrap();
        let sandbox = Sandbox::new(renderer).unwrap();

        let canvas = Arc::new(Canvas::default());
        let descriptor = ComponentDescriptor::new("Canvas")
            .listener(ListenerDescriptor::on_renderer("redraw", "theme"))
            .listener(ListenerDescriptor::on_main("redraw", "main-only"));
        assert_eq!(sandbox.listen(&descriptor, canvas.clone()), 1);
        assert_eq!(sandbox.listen(&descriptor, canvas.clone()), 0);

        bridge.invoke("theme", vec![json!("dark")]).await.unwrap();
        assert_eq!(*canvas.themes.lock(), vec![json!("dark")]);
    }

    #[tokio::test]
    async fn test_component_api_lists_hooks() {
        let (_main, renderer) = link_pair(4);
        let sandbox = Sandbox::new(renderer).unwrap();
        let descriptor = descriptor().hook(conduit_weld::HookDescriptor::new("save", "saved"));
        let api = ComponentApi::new(&descriptor, Arc::clone(sandbox.endpoint()));

        assert_eq!(api.hooks().len(), 1);
        assert_eq!(api.hooks()[0].renderer_channel(), "$conduit:renderer:saved");
    }
}
