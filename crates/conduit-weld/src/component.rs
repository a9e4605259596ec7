//! Runtime contract of a managed component
//!
//! The bridge never introspects a component. It calls `invoke`, `read` and
//! `write` with the member names recorded in the descriptor; the
//! `#[component]` macro generates those match arms.

use crate::container::Dependencies;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// Errors raised while dispatching into a component
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemberError {
    #[error("Unknown member: {member}")]
    UnknownMember { member: String },

    #[error("Unknown property: {property}")]
    UnknownProperty { property: String },

    #[error("Invalid argument {index} for {member}: {message}")]
    InvalidArgument {
        member: String,
        index: usize,
        message: String,
    },

    #[error("{member} failed: {message}")]
    Failed { member: String, message: String },
}

impl MemberError {
    pub fn unknown_member(member: impl Into<String>) -> Self {
        Self::UnknownMember {
            member: member.into(),
        }
    }

    pub fn unknown_property(property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            property: property.into(),
        }
    }

    pub fn invalid_argument(member: impl Into<String>, index: usize, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            member: member.into(),
            index,
            message: message.into(),
        }
    }

    pub fn failed(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            member: member.into(),
            message: message.into(),
        }
    }
}

/// Result of dispatching a member call
pub enum Invocation {
    /// Computed in place
    Ready(Result<Value, MemberError>),
    /// Settles later
    Pending(BoxFuture<'static, Result<Value, MemberError>>),
}

impl Invocation {
    pub fn ready(result: Result<Value, MemberError>) -> Self {
        Invocation::Ready(result)
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, MemberError>> + Send + 'static,
    {
        Invocation::Pending(Box::pin(future))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Invocation::Pending(_))
    }

    pub fn into_future(self) -> BoxFuture<'static, Result<Value, MemberError>> {
        match self {
            Invocation::Ready(result) => Box::pin(futures::future::ready(result)),
            Invocation::Pending(future) => future,
        }
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invocation::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Invocation::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Upcast support for downcasting component handles
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A live managed component
pub trait Component: AsAny {
    /// Call a method, command or menu handler by its declared name
    fn invoke(self: Arc<Self>, member: &str, args: Vec<Value>) -> Invocation;

    /// Read an accessor's property
    fn read(&self, property: &str) -> Result<Value, MemberError> {
        Err(MemberError::unknown_property(property))
    }

    /// Write an accessor's property
    fn write(&self, property: &str, value: Value) -> Result<(), MemberError> {
        let _ = value;
        Err(MemberError::unknown_property(property))
    }
}

/// Constructor used by the container
pub trait Inject: Sized {
    fn inject(dependencies: Dependencies) -> Self;
}

/// Live property cell backing an accessor
#[derive(Debug, Default)]
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }

    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.value.write(), value)
    }

    /// Mutate in place under the write lock
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.value.write())
    }
}

impl<T: Clone> Property<T> {
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: Serialize> Property<T> {
    pub fn to_json(&self, property: &str) -> Result<Value, MemberError> {
        serde_json::to_value(&*self.value.read())
            .map_err(|e| MemberError::failed(property, e.to_string()))
    }
}

impl<T: DeserializeOwned> Property<T> {
    pub fn set_json(&self, property: &str, value: Value) -> Result<(), MemberError> {
        let value: T = serde_json::from_value(value)
            .map_err(|e| MemberError::invalid_argument(property, 0, e.to_string()))?;
        self.set(value);
        Ok(())
    }
}

/// Pull the next positional argument; a missing argument decodes from `null`
pub fn decode_arg<T: DeserializeOwned>(
    args: &mut std::vec::IntoIter<Value>,
    member: &str,
    index: usize,
) -> Result<T, MemberError> {
    let value = args.next().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| MemberError::invalid_argument(member, index, e.to_string()))
}

pub fn encode_return<T: Serialize>(member: &str, value: T) -> Result<Value, MemberError> {
    serde_json::to_value(value).map_err(|e| MemberError::failed(member, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        label: Property<String>,
    }

    impl Component for Echo {
        fn invoke(self: Arc<Self>, member: &str, args: Vec<Value>) -> Invocation {
            match member {
                "echo" => {
                    let mut args = args.into_iter();
                    Invocation::ready(
                        decode_arg::<String>(&mut args, member, 0)
                            .and_then(|s| encode_return(member, s)),
                    )
                }
                "later" => Invocation::pending(async move { Ok(Value::from(self.label.get())) }),
                other => Invocation::ready(Err(MemberError::unknown_member(other))),
            }
        }

        fn read(&self, property: &str) -> Result<Value, MemberError> {
            match property {
                "label" => self.label.to_json(property),
                other => Err(MemberError::unknown_property(other)),
            }
        }
    }

    fn echo() -> Arc<Echo> {
        Arc::new(Echo {
            label: Property::new("hi".to_string()),
        })
    }

    #[test]
    fn test_ready_invocation() {
        let result = echo().invoke("echo", vec![Value::from("ping")]);
        assert!(!result.is_pending());
        match result {
            Invocation::Ready(Ok(v)) => assert_eq!(v, "ping"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_argument_reports_index() {
        match echo().invoke("echo", vec![Value::from(3)]) {
            Invocation::Ready(Err(MemberError::InvalidArgument { index, .. })) => assert_eq!(index, 0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_invocation() {
        let result = echo().invoke("later", vec![]);
        assert!(result.is_pending());
        assert_eq!(result.into_future().await.unwrap(), "hi");
    }

    #[test]
    fn test_default_write_is_unknown_property() {
        let component = echo();
        assert_eq!(component.read("label").unwrap(), "hi");
        assert_eq!(
            component.write("label", Value::Null),
            Err(MemberError::unknown_property("label"))
        );
    }

    #[test]
    fn test_property_json() {
        let prop = Property::new(1_i64);
        prop.set_json("value", Value::from(5)).unwrap();
        assert_eq!(prop.get(), 5);
        assert!(prop.set_json("value", Value::from("x")).is_err());
        assert_eq!(prop.update(|v| {
            *v += 1;
            *v
        }), 6);
    }

    #[test]
    fn test_downcast_through_component() {
        let component: Arc<dyn Component> = echo();
        let any = AsAny::into_any(component);
        assert!(any.downcast::<Echo>().is_ok());
    }
}
