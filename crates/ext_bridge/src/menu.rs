//! Application menu templates and their augmentation with component handlers

use crate::privileged::Bridge;
use conduit_weld::MenuSelector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type MenuCallback = Arc<dyn Fn(&MenuItem) -> Option<Value> + Send + Sync>;

/// A node of an application menu template
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submenu: Vec<MenuItem>,
    #[serde(skip)]
    pub on_click: Option<MenuCallback>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_accelerator(mut self, accelerator: impl Into<String>) -> Self {
        self.accelerator = Some(accelerator.into());
        self
    }

    pub fn with_submenu(mut self, submenu: Vec<MenuItem>) -> Self {
        self.submenu = submenu;
        self
    }

    pub fn on_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&MenuItem) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_click = Some(Arc::new(f));
        self
    }

    /// Selectors this node answers to: role, accelerator, id, label
    pub fn selectors(&self) -> Vec<MenuSelector> {
        let mut selectors = Vec::new();
        if let Some(role) = &self.role {
            selectors.push(MenuSelector::Role(role.clone()));
        }
        if let Some(accelerator) = &self.accelerator {
            selectors.push(MenuSelector::Accelerator(accelerator.clone()));
        }
        if let Some(id) = &self.id {
            selectors.push(MenuSelector::Id(id.clone()));
        }
        if let Some(label) = &self.label {
            selectors.push(MenuSelector::Label(label.clone()));
        }
        selectors
    }

    /// Activate the node as the menu system would
    pub fn click(&self) -> Option<Value> {
        self.on_click.as_ref().and_then(|f| f(self))
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("role", &self.role)
            .field("accelerator", &self.accelerator)
            .field("submenu", &self.submenu)
            .field("on_click", &self.on_click.is_some())
            .finish()
    }
}

/// Wrap every node's click so it first fires the component methods bound
/// to the node's selectors, then runs the original callback and returns
/// its result. Returns the number of nodes visited.
pub fn augment_menu(bridge: &Arc<Bridge>, items: &mut [MenuItem]) -> usize {
    let mut visited = 0;
    for item in items.iter_mut() {
        let selectors = item.selectors();
        let original = item.on_click.take();
        let target = Arc::clone(bridge);
        item.on_click = Some(Arc::new(move |node: &MenuItem| {
            target.activate_menu(&selectors);
            original.as_ref().and_then(|f| f(node))
        }));
        visited += 1 + augment_menu(bridge, &mut item.submenu);
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::link_pair;
    use conduit_weld::{Component, ComponentDescriptor, Invocation, MemberError, MenuBinding};
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Journal {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Component for Journal {
        fn invoke(self: Arc<Self>, member: &str, _args: Vec<Value>) -> Invocation {
            match member {
                "reload" | "about" => {
                    self.events.lock().push(member.to_string());
                    Invocation::ready(Ok(Value::Null))
                }
                other => Invocation::ready(Err(MemberError::unknown_member(other))),
            }
        }
    }

    fn template(events: Arc<Mutex<Vec<String>>>) -> Vec<MenuItem> {
        vec![MenuItem::new("View").with_submenu(vec![
            MenuItem::new("Reload")
                .with_id("reload")
                .with_role("reload")
                .with_accelerator("CmdOrCtrl+R")
                .on_click(move |_| {
                    events.lock().push("original".to_string());
                    Some(json!("clicked"))
                }),
            MenuItem::new("About"),
        ])]
    }

    #[test]
    fn test_selectors_order() {
        let item = MenuItem::new("Reload")
            .with_id("reload")
            .with_role("reload")
            .with_accelerator("CmdOrCtrl+R");
        let selectors: Vec<String> = item.selectors().iter().map(ToString::to_string).collect();
        assert_eq!(selectors, ["$reload", ":CmdOrCtrl+R", "#reload", "Reload"]);
    }

    #[tokio::test]
    async fn test_augmented_click_fires_bound_methods_then_original() {
        let (main, _renderer) = link_pair(4);
        let bridge = Bridge::new(main).unwrap();

        let journal = Arc::new(Journal::default());
        let events = Arc::clone(&journal.events);
        let descriptor = ComponentDescriptor::new("Journal")
            .menu_item(MenuBinding::new("reload", ["#reload", ":CmdOrCtrl+R", "$reload"]))
            .menu_item(MenuBinding::new("about", ["About"]));
        bridge.register_component(&descriptor, journal);

        let mut menu = template(Arc::clone(&events));
        assert_eq!(augment_menu(&bridge, &mut menu), 3);

        let reload = &menu[0].submenu[0];
        assert_eq!(reload.click(), Some(json!("clicked")));
        assert_eq!(*events.lock(), ["reload", "original"]);

        let about = &menu[0].submenu[1];
        assert_eq!(about.click(), None);
        assert_eq!(*events.lock(), ["reload", "original", "about"]);

        // a node with no bindings and no callback is harmless
        assert_eq!(menu[0].click(), None);
    }

    #[test]
    fn test_template_from_json() {
        let menu: Vec<MenuItem> = serde_json::from_value(json!([
            { "label": "File", "submenu": [{ "label": "Quit", "role": "quit" }] }
        ]))
        .unwrap();
        assert_eq!(menu[0].submenu[0].role.as_deref(), Some("quit"));
        assert!(menu[0].on_click.is_none());
    }
}
