//! Conduit-Weld: shared component metadata for the Conduit bridge
//!
//! Both engines of Conduit consume the records defined here: the runtime
//! bridge (`ext_bridge`) wires them into channels, and the declaration
//! generator (`conduit-etch`) prints the same members as TypeScript.
//!
//! # Architecture
//!
//! - `descriptor`: component, member, hook and listener descriptors
//! - `naming`: channel names and the sync/async member expansion
//! - `registry`: append-only metadata registry keyed by component identity
//! - `component`: the dispatch contract a live component implements
//! - `container`: singleton construction with dependency injection
//! - `inventory`: link-time collection of `#[component]` registrations
//!
//! # Usage
//!
//! ```rust,ignore
//! use conduit_weld::{ContainerBuilder, Registry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! let container = ContainerBuilder::from_inventory(registry.clone()).build();
//! container.resolve_all();
//! ```

pub mod component;
pub mod container;
pub mod descriptor;
pub mod inventory;
pub mod naming;
pub mod registry;

pub use component::{
    decode_arg, encode_return, AsAny, Component, Inject, Invocation, MemberError, Property,
};
pub use container::{Container, ContainerBuilder, Dependencies, Factory, Injected};
pub use descriptor::{
    AccessorDescriptor, CommandDescriptor, ComponentDescriptor, ComponentId, ExposedMethod,
    HookDescriptor, ListenerDescriptor, ListenerSide, MenuBinding, MenuSelector,
};
pub use inventory::{collect_components, Registration, COMPONENTS};
pub use naming::{
    as_async, camelcase, infer_async, to_camel_case, CallMode, Operation, SurfaceCall, COMPONENTS_CHANNEL,
    NAMESPACE,
};
pub use registry::{Descriptor, DescriptorKind, Registry};

// Re-exports for generated code
pub use linkme;
pub use serde_json;
