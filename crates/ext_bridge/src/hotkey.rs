//! Global key combinations that trigger component commands

use crate::error::BridgeError;
use crate::sandbox::Sandbox;
use conduit_weld::{ComponentDescriptor, ComponentId};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A command reachable through one key combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBinding {
    pub component: ComponentId,
    pub command: String,
    pub channel: String,
    pub combination: String,
}

/// Something that can grab key combinations system-wide
pub trait HotkeyBackend {
    fn register(&self, hotkey: HotKey) -> Result<(), BridgeError>;
}

/// [`HotkeyBackend`] on top of the OS-level `global-hotkey` manager
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self, BridgeError> {
        let manager = GlobalHotKeyManager::new().map_err(|e| BridgeError::hotkey(e.to_string()))?;
        Ok(Self { manager })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&self, hotkey: HotKey) -> Result<(), BridgeError> {
        self.manager
            .register(hotkey)
            .map_err(|e| BridgeError::hotkey(e.to_string()))
    }
}

/// Maps pressed hotkeys to command channels.
///
/// A command bound to several combinations fires once when they arrive
/// within `window` of each other.
pub struct CommandTrigger {
    window: Duration,
    hotkeys: Vec<HotKey>,
    bindings: HashMap<u32, Vec<Arc<CommandBinding>>>,
    last_fired: Mutex<HashMap<String, Instant>>,
}

impl CommandTrigger {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            hotkeys: Vec::new(),
            bindings: HashMap::new(),
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Bind the commands of every component the privileged process serves
    pub async fn from_sandbox(sandbox: &Sandbox, window: Duration) -> Result<Self, BridgeError> {
        let mut trigger = Self::new(window);
        for descriptor in sandbox.descriptors().await? {
            trigger.bind(&descriptor)?;
        }
        Ok(trigger)
    }

    /// Bind every command of `descriptor`, returning how many combinations were added
    pub fn bind(&mut self, descriptor: &ComponentDescriptor) -> Result<usize, BridgeError> {
        let mut added = 0;
        for command in &descriptor.commands {
            let Some(route) = command.calls(&descriptor.identity).into_iter().next() else {
                continue;
            };
            for combination in &command.combinations {
                let hotkey = HotKey::from_str(combination)
                    .map_err(|e| BridgeError::invalid_hotkey(combination.as_str(), e.to_string()))?;
                let binding = Arc::new(CommandBinding {
                    component: descriptor.identity.clone(),
                    command: command.name.clone(),
                    channel: route.channel.clone(),
                    combination: combination.clone(),
                });

                let slot = self.bindings.entry(hotkey.id()).or_default();
                if slot.iter().any(|b| b.channel == binding.channel) {
                    continue;
                }
                if slot.is_empty() {
                    self.hotkeys.push(hotkey);
                }
                tracing::debug!(
                    component = %binding.component,
                    command = %binding.command,
                    combination = %binding.combination,
                    "Bound command"
                );
                slot.push(binding);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn hotkeys(&self) -> &[HotKey] {
        &self.hotkeys
    }

    pub fn bindings(&self, hotkey_id: u32) -> &[Arc<CommandBinding>] {
        self.bindings.get(&hotkey_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Commands to fire for a press of `hotkey_id` at `at`
    pub fn press(&self, hotkey_id: u32, at: Instant) -> Vec<Arc<CommandBinding>> {
        let mut last_fired = self.last_fired.lock();
        self.bindings(hotkey_id)
            .iter()
            .filter(|binding| {
                let recent = last_fired
                    .get(&binding.channel)
                    .is_some_and(|last| at.saturating_duration_since(*last) < self.window);
                if recent {
                    tracing::trace!(command = %binding.command, "Suppressed repeated trigger");
                    return false;
                }
                last_fired.insert(binding.channel.clone(), at);
                true
            })
            .cloned()
            .collect()
    }

    /// Grab every bound combination through `backend`
    pub fn install<B: HotkeyBackend + ?Sized>(&self, backend: &B) -> Result<(), BridgeError> {
        for hotkey in &self.hotkeys {
            backend.register(*hotkey)?;
        }
        tracing::info!(hotkeys = self.hotkeys.len(), "Hotkeys registered");
        Ok(())
    }
}

/// Send a bound command to the privileged process without waiting for it
pub fn fire(sandbox: &Arc<Sandbox>, binding: &CommandBinding) -> Result<(), BridgeError> {
    let runtime = Handle::try_current()?;
    let sandbox = Arc::clone(sandbox);
    let channel = binding.channel.clone();
    let command = binding.command.clone();
    runtime.spawn(async move {
        if let Err(e) = sandbox.endpoint().request(&channel, Vec::new()).await {
            tracing::warn!(command = %command, error = %e, "Command failed");
        }
    });
    Ok(())
}

/// Poll the global hotkey event queue and fire matching commands until cancelled
pub fn spawn_listener(
    sandbox: Arc<Sandbox>,
    trigger: Arc<CommandTrigger>,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) -> Result<JoinHandle<()>, BridgeError> {
    let runtime = Handle::try_current()?;
    Ok(runtime.spawn(async move {
        let receiver = GlobalHotKeyEvent::receiver();
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::trace!("Hotkey listener cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    while let Ok(event) = receiver.try_recv() {
                        if event.state != HotKeyState::Pressed {
                            continue;
                        }
                        for binding in trigger.press(event.id, Instant::now()) {
                            if let Err(e) = fire(&sandbox, &binding) {
                                tracing::warn!(command = %binding.command, error = %e, "Command not sent");
                            }
                        }
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_weld::CommandDescriptor;
    use std::cell::RefCell;

    fn clipboard() -> ComponentDescriptor {
        ComponentDescriptor::new("Clipboard")
            .command(CommandDescriptor::new("copy", ["ctrl+c", "ctrl+shift+c"]))
            .command(CommandDescriptor::new("paste", ["ctrl+v"]).asynchronous(true))
    }

    fn id(combination: &str) -> u32 {
        HotKey::from_str(combination).unwrap().id()
    }

    #[test]
    fn test_bind_commands() {
        let mut trigger = CommandTrigger::new(Duration::from_millis(50));
        assert_eq!(trigger.bind(&clipboard()).unwrap(), 3);
        assert_eq!(trigger.hotkeys().len(), 3);

        let copy = &trigger.bindings(id("ctrl+shift+c"))[0];
        assert_eq!(copy.command, "copy");
        assert_eq!(copy.channel, "$conduit:component:Clipboard:command:copy");

        let paste = &trigger.bindings(id("ctrl+v"))[0];
        assert_eq!(paste.channel, "$conduit:component:Clipboard:command:paste");

        // binding the same component again adds nothing
        assert_eq!(trigger.bind(&clipboard()).unwrap(), 0);
    }

    #[test]
    fn test_simultaneous_combinations_fire_once() {
        let mut trigger = CommandTrigger::new(Duration::from_millis(50));
        trigger.bind(&clipboard()).unwrap();

        let t0 = Instant::now();
        assert_eq!(trigger.press(id("ctrl+c"), t0).len(), 1);
        assert!(trigger.press(id("ctrl+shift+c"), t0).is_empty());
        assert_eq!(trigger.press(id("ctrl+shift+c"), t0 + Duration::from_millis(200)).len(), 1);
        // other commands are unaffected
        assert_eq!(trigger.press(id("ctrl+v"), t0).len(), 1);
    }

    #[test]
    fn test_invalid_combination() {
        let mut trigger = CommandTrigger::new(Duration::from_millis(50));
        let descriptor =
            ComponentDescriptor::new("Broken").command(CommandDescriptor::new("go", ["ctrl+nope"]));
        let err = trigger.bind(&descriptor).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidHotkey { .. }));
    }

    struct Recording(RefCell<Vec<u32>>);

    impl HotkeyBackend for Recording {
        fn register(&self, hotkey: HotKey) -> Result<(), BridgeError> {
            self.0.borrow_mut().push(hotkey.id());
            Ok(())
        }
    }

    #[test]
    fn test_listener_outside_a_runtime_is_an_error() {
        let (_main, renderer) = crate::transport::link_pair(1);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let sandbox = runtime.block_on(async { Sandbox::new(renderer).unwrap() });

        let trigger = Arc::new(CommandTrigger::new(Duration::from_millis(50)));
        let err = spawn_listener(
            Arc::clone(&sandbox),
            trigger,
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.code(), 8009);

        let binding = CommandBinding {
            component: ComponentId::new("Clipboard"),
            command: "copy".into(),
            channel: "$conduit:component:Clipboard:command:copy".into(),
            combination: "ctrl+c".into(),
        };
        assert!(matches!(fire(&sandbox, &binding), Err(BridgeError::Runtime { .. })));
    }

    #[test]
    fn test_install_registers_each_hotkey() {
        let mut trigger = CommandTrigger::new(Duration::from_millis(50));
        trigger.bind(&clipboard()).unwrap();

        let backend = Recording(RefCell::new(Vec::new()));
        trigger.install(&backend).unwrap();
        assert_eq!(
            backend.0.into_inner(),
            vec![id("ctrl+c"), id("ctrl+shift+c"), id("ctrl+v")]
        );
    }
}
