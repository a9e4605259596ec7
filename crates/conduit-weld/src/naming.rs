//! Channel naming and member expansion
//!
//! Every exposed member expands into a fixed set of `SurfaceCall` rows.
//! The bridge opens one handler per row and the declaration generator
//! prints one signature per row, so the two can only agree.

use crate::descriptor::{
    AccessorDescriptor, CommandDescriptor, ComponentDescriptor, ComponentId, ExposedMethod,
    HookDescriptor, MenuSelector,
};
use serde::{Deserialize, Serialize};

/// Prefix shared by every internal channel
pub const NAMESPACE: &str = "$conduit";

/// Suffix of the non-blocking sibling of a channel
pub const ASYNC_SUFFIX: &str = ":async";

/// Channel serving the descriptor list to the sandboxed process
pub const COMPONENTS_CHANNEL: &str = "$conduit:components";

/// Return type heads that mark a signature as asynchronous
pub const ASYNC_RETURN_HEADS: &[&str] = &["Promise", "PromiseLike", "Future", "BoxFuture"];

/// Lower-case the first character of `head`, upper-case the first
/// character of every `tail` piece, and concatenate.
pub fn camelcase(head: &str, tail: &[&str]) -> String {
    let mut result = String::with_capacity(head.len() + tail.iter().map(|s| s.len()).sum::<usize>());
    let mut chars = head.chars();
    if let Some(first) = chars.next() {
        result.extend(first.to_lowercase());
        result.push_str(chars.as_str());
    }
    for piece in tail {
        let mut chars = piece.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

/// Convert a snake_case Rust name to camelCase
pub fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = !result.is_empty();
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Async inference shared by the macro and the TypeScript parser
pub fn infer_async(async_marker: bool, return_head: Option<&str>) -> bool {
    async_marker || return_head.is_some_and(|head| ASYNC_RETURN_HEADS.contains(&head))
}

pub fn as_async(channel: &str) -> String {
    format!("{}{}", channel, ASYNC_SUFFIX)
}

fn component_channel(component: &ComponentId, kind: &str, name: &str) -> String {
    format!("{}:component:{}:{}:{}", NAMESPACE, component, kind, name)
}

pub fn expose_channel(component: &ComponentId, method: &str) -> String {
    component_channel(component, "expose", method)
}

pub fn getter_channel(component: &ComponentId, property_key: &str) -> String {
    component_channel(component, "getter", property_key)
}

pub fn setter_channel(component: &ComponentId, property_key: &str) -> String {
    component_channel(component, "setter", property_key)
}

pub fn command_channel(component: &ComponentId, method: &str) -> String {
    component_channel(component, "command", method)
}

pub fn menu_channel(selector: &MenuSelector) -> String {
    format!("{}:menu:{}", NAMESPACE, selector)
}

/// Application channel served by the privileged process
pub fn main_channel(name: &str) -> String {
    format!("{}:main:{}", NAMESPACE, name)
}

/// Application channel served by the sandboxed process
pub fn renderer_channel(name: &str) -> String {
    format!("{}:renderer:{}", NAMESPACE, name)
}

/// Value channel the privileged process serves for `receive` calls
pub fn main_serve_channel(name: &str) -> String {
    format!("{}:main:serve:{}", NAMESPACE, name)
}

/// Value channel the sandboxed process serves for `receive` calls
pub fn renderer_serve_channel(name: &str) -> String {
    format!("{}:renderer:serve:{}", NAMESPACE, name)
}

/// Whether the caller waits in place or receives a pending result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallMode {
    Blocking,
    NonBlocking,
}

/// What a surface call does on the component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Call,
    Get,
    Set,
    Command,
}

/// One callable row of a component's exposed surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceCall {
    /// External member name
    pub member: String,
    pub channel: String,
    /// Declared method name or property key on the component
    pub target: String,
    pub operation: Operation,
    pub mode: CallMode,
}

fn paired(
    member: &str,
    channel: String,
    target: &str,
    operation: Operation,
    is_async: bool,
) -> Vec<SurfaceCall> {
    if is_async {
        return vec![SurfaceCall {
            member: member.to_string(),
            channel,
            target: target.to_string(),
            operation,
            mode: CallMode::NonBlocking,
        }];
    }

    vec![
        SurfaceCall {
            member: member.to_string(),
            channel: channel.clone(),
            target: target.to_string(),
            operation,
            mode: CallMode::Blocking,
        },
        SurfaceCall {
            member: format!("{}Async", member),
            channel: as_async(&channel),
            target: target.to_string(),
            operation,
            mode: CallMode::NonBlocking,
        },
    ]
}

impl ExposedMethod {
    /// `name` + `nameAsync` for sync methods, `name` alone for async ones
    pub fn calls(&self, component: &ComponentId) -> Vec<SurfaceCall> {
        paired(
            self.external_name(),
            expose_channel(component, &self.name),
            &self.name,
            Operation::Call,
            self.is_async,
        )
    }
}

impl AccessorDescriptor {
    /// get, getAsync, set, setAsync
    pub fn calls(&self, component: &ComponentId) -> Vec<SurfaceCall> {
        let mut calls = paired(
            &self.getter_name(),
            getter_channel(component, &self.property_key),
            &self.property_key,
            Operation::Get,
            false,
        );
        calls.extend(paired(
            &self.setter_name(),
            setter_channel(component, &self.property_key),
            &self.property_key,
            Operation::Set,
            false,
        ));
        calls
    }
}

impl CommandDescriptor {
    pub fn calls(&self, component: &ComponentId) -> Vec<SurfaceCall> {
        paired(
            &self.name,
            command_channel(component, &self.name),
            &self.name,
            Operation::Command,
            self.is_async,
        )
    }
}

impl HookDescriptor {
    /// Sandbox channel the hooked method's results are pushed to
    pub fn renderer_channel(&self) -> String {
        renderer_channel(&self.channel)
    }
}

impl ComponentDescriptor {
    /// Rows callable from the sandboxed process: methods, then accessors
    pub fn surface(&self) -> Vec<SurfaceCall> {
        let mut calls = Vec::new();
        for method in &self.methods {
            calls.extend(method.calls(&self.identity));
        }
        for accessor in &self.accessors {
            calls.extend(accessor.calls(&self.identity));
        }
        calls
    }

    /// Every row the privileged process serves, commands included
    pub fn routes(&self) -> Vec<SurfaceCall> {
        let mut calls = self.surface();
        for command in &self.commands {
            calls.extend(command.calls(&self.identity));
        }
        calls
    }
}
