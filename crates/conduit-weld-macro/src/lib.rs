//! Proc macros for conduit-weld
//!
//! Provides the `#[component]` attribute, which turns an inherent impl block
//! into a managed component: it records the descriptor, generates the
//! `Component` dispatch, and registers both in the conduit-weld inventory.
//!
//! # Usage
//!
//! ```text
//! use conduit_weld::{Dependencies, Inject, Property};
//! use conduit_weld_macro::component;
//!
//! pub struct Counter {
//!     value: Property<i64>,
//! }
//!
//! impl Inject for Counter {
//!     fn inject(_deps: Dependencies) -> Self {
//!         Counter { value: Property::new(0) }
//!     }
//! }
//!
//! #[component(accessor(value))]
//! impl Counter {
//!     #[expose]
//!     pub fn increment(&self) -> i64 {
//!         self.value.update(|v| { *v += 1; *v })
//!     }
//!
//!     #[command("ctrl+r")]
//!     #[menu_item("#reset", "Reset")]
//!     pub fn reset(&self) {
//!         self.value.set(0);
//!     }
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod component;

/// Attribute macro declaring a managed component
///
/// # Component options
/// - `name = "Counter"` - identity used in channel names (defaults to the type name)
/// - `alias = "counter"` - name exposed to the sandboxed process
/// - `inject(Logger, Store)` - constructor dependencies, in order
/// - `accessor(field)` - expose a `Property<T>` field; accepts
///   `getter = ".."`, `setter = ".."` and `alias = ".."`
///
/// # Member markers
/// - `#[expose]` / `#[expose(alias = "name")]`
/// - `#[command("ctrl+c", "ctrl+shift+c")]`
/// - `#[menu_item("#id", ":CmdOrCtrl+R", "$role", "Label")]`
/// - `#[hook("channel")]` - results of bridge calls are also pushed to the
///   sandbox on `$conduit:renderer:<channel>`
/// - `#[on_main("channel")]` / `#[on_renderer("channel")]` - called with the
///   payload of every message on that application channel
///
/// Members take `&self` (or `self: Arc<Self>`). Method names are exposed in
/// camelCase. `async fn`s and functions returning a future are asynchronous.
///
/// The type must implement `conduit_weld::Inject`.
#[proc_macro_attribute]
pub fn component(attr: TokenStream, item: TokenStream) -> TokenStream {
    component::component_impl(attr.into(), item.into()).into()
}
