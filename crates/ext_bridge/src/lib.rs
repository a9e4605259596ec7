//! Runtime bridge between the privileged and the sandboxed process
//!
//! The privileged side ([`Bridge`]) owns the component instances built by a
//! `conduit_weld::Container` and serves every exposed method, accessor and
//! command on its channel. The sandboxed side ([`Sandbox`]) fetches the
//! descriptors and builds one [`ComponentApi`] stub table per component.
//!
//! ## Channels
//!
//! | Member | Channel |
//! |--------|---------|
//! | method | `$conduit:component:<Id>:expose:<name>` |
//! | accessor | `$conduit:component:<Id>:getter:<key>` / `setter:<key>` |
//! | command | `$conduit:component:<Id>:command:<name>` |
//! | menu binding | `$conduit:menu:<selector>` |
//! | descriptors | `$conduit:components` |
//! | hook results | `$conduit:renderer:<channel>` |
//! | application channel | `$conduit:main:<name>` / `$conduit:renderer:<name>` |
//! | served value | `$conduit:main:serve:<name>` / `$conduit:renderer:serve:<name>` |
//!
//! Synchronous members are served twice: blocking on the channel above and
//! non-blocking on the same channel suffixed with `:async`. Asynchronous
//! members are only served non-blocking.
//!
//! ## Error Codes (8000-8009)
//!
//! | Code | Error |
//! |------|-------|
//! | 8000 | ChannelSend |
//! | 8001 | ChannelRecv |
//! | 8002 | NoListener |
//! | 8003 | Member |
//! | 8004 | NotBlocking |
//! | 8005 | UnknownMember |
//! | 8006 | InvalidHotkey |
//! | 8007 | Hotkey |
//! | 8008 | Decode |
//! | 8009 | Runtime |

pub mod config;
pub mod error;
pub mod hotkey;
pub mod menu;
pub mod privileged;
pub mod sandbox;
pub mod transport;

pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeErrorCode};
pub use hotkey::{CommandBinding, CommandTrigger, GlobalHotkeyBackend, HotkeyBackend};
pub use menu::{augment_menu, MenuItem};
pub use privileged::Bridge;
pub use sandbox::{ComponentApi, Sandbox, Stub};
pub use transport::{link_pair, Endpoint, Handler, Link, Request, Side};

use std::sync::Arc;

/// Connect a privileged and a sandboxed endpoint in-process, on the
/// current Tokio runtime
pub fn connect(config: &BridgeConfig) -> Result<(Arc<Bridge>, Arc<Sandbox>), BridgeError> {
    let (privileged, sandboxed) = link_pair(config.capacity);
    let bridge = Bridge::new(privileged)?;
    let sandbox = Sandbox::new(sandboxed)?;
    tracing::debug!(capacity = config.capacity, "Bridge connected");
    Ok((bridge, sandbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_weld::{
        ContainerBuilder, Dependencies, Inject, Injected, MenuSelector, Property, Registry,
    };
    use conduit_weld_macro::component;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::{Duration, Instant};

    pub struct AuditLog {
        entries: Mutex<Vec<String>>,
    }

    impl Inject for AuditLog {
        fn inject(_deps: Dependencies) -> Self {
            AuditLog {
                entries: Mutex::new(Vec::new()),
            }
        }
    }

    #[component(alias = "audit")]
    impl AuditLog {
        pub fn record(&self, entry: &str) {
            self.entries.lock().push(entry.to_string());
        }

        #[expose]
        pub fn entries(&self) -> Vec<String> {
            self.entries.lock().clone()
        }
    }

    pub struct Counter {
        value: Property<i64>,
        audit: Option<Injected>,
    }

    impl Inject for Counter {
        fn inject(deps: Dependencies) -> Self {
            Counter {
                value: Property::new(0),
                audit: deps.handle(0),
            }
        }
    }

    #[component(inject(AuditLog), accessor(value))]
    impl Counter {
        fn audit(&self, entry: &str) {
            if let Some(log) = self.audit.as_ref().and_then(|a| a.get::<AuditLog>()) {
                log.record(entry);
            }
        }

        #[expose]
        #[hook("count")]
        pub fn increment(&self) -> i64 {
            self.audit("increment");
            self.value.update(|v| {
                *v += 1;
                *v
            })
        }

        #[expose]
        pub async fn add_later(&self, by: i64) -> i64 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.value.update(|v| {
                *v += by;
                *v
            })
        }

        #[expose]
        pub fn checked_div(&self, by: i64) -> Result<i64, String> {
            if by == 0 {
                return Err("division by zero".to_string());
            }
            Ok(self.value.get() / by)
        }

        #[command("ctrl+r", "ctrl+shift+r")]
        #[menu_item("#reset", "Reset")]
        pub fn reset(&self) {
            self.audit("reset");
            self.value.set(0);
        }
    }

    async fn started() -> (Arc<Bridge>, Arc<Sandbox>, conduit_weld::Container) {
        let registry = Arc::new(Registry::new());
        let container = ContainerBuilder::from_inventory(registry).build();
        container.resolve_all();

        let (bridge, sandbox) = connect(&BridgeConfig::default()).unwrap();
        bridge.install(&container);
        (bridge, sandbox, container)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_counter_over_the_bridge() {
        let (_bridge, sandbox, _container) = started().await;
        let apis = sandbox.connect_components().await.unwrap();

        let counter = apis.get("counter").unwrap().clone();
        assert_eq!(counter.call_async("increment", vec![]).await.unwrap(), json!(1));
        assert_eq!(counter.call_async("incrementAsync", vec![]).await.unwrap(), json!(2));
        assert_eq!(counter.call_async("addLater", vec![json!(5)]).await.unwrap(), json!(7));
        assert!(counter.stub("addLaterAsync").is_none());

        let blocking = counter.clone();
        let value = tokio::task::spawn_blocking(move || blocking.call("getValue", vec![]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, json!(7));

        counter.call_async("setValueAsync", vec![json!(9)]).await.unwrap();
        assert_eq!(counter.call_async("checkedDiv", vec![json!(3)]).await.unwrap(), json!(3));
        let err = counter.call_async("checkedDiv", vec![json!(0)]).await.unwrap_err();
        assert!(err.to_string().contains("division by zero"));

        let audit = apis.get("audit").unwrap();
        assert_eq!(
            audit.call_async("entries", vec![]).await.unwrap(),
            json!(["increment", "increment"])
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_command_and_menu_reach_the_component() {
        let (bridge, sandbox, container) = started().await;
        let counter = container.get::<Counter>(&"Counter".into()).unwrap();

        counter.value.set(4);
        let selectors = [MenuSelector::parse("#reset"), MenuSelector::parse("Reset")];
        assert_eq!(bridge.activate_menu(&selectors), 1);
        assert_eq!(counter.value.get(), 0);

        let trigger = CommandTrigger::from_sandbox(&sandbox, Duration::from_millis(50))
            .await
            .unwrap();
        let ctrl_r = trigger.hotkeys()[0].id();
        let now = Instant::now();
        let fired = trigger.press(ctrl_r, now);
        assert_eq!(fired.len(), 1);
        assert!(trigger.press(trigger.hotkeys()[1].id(), now).is_empty());

        counter.value.set(3);
        sandbox
            .endpoint()
            .request(&fired[0].channel, Vec::new())
            .await
            .unwrap();
        assert_eq!(counter.value.get(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hooked_member_reaches_sandbox_listener() {
        let (_bridge, sandbox, _container) = started().await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        sandbox.handle(
            "count",
            Handler::blocking(move |args| {
                let _ = tx.send(args);
                Ok(serde_json::Value::Null)
            }),
        );

        let apis = sandbox.connect_components().await.unwrap();
        let counter = &apis["counter"];
        assert_eq!(counter.hooks()[0].name, "increment");

        let value = counter.call_async("increment", vec![]).await.unwrap();
        let pushed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pushed, vec![value]);
    }

    #[test]
    fn test_connect_outside_a_runtime_is_an_error() {
        let err = connect(&BridgeConfig::default()).err().unwrap();
        assert_eq!(err.code(), BridgeErrorCode::Runtime as u32);
    }

    #[tokio::test]
    async fn test_second_install_adds_nothing() {
        let (bridge, _sandbox, container) = started().await;
        assert_eq!(bridge.install(&container), 0);
    }
}
