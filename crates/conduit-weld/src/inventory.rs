//! Link-time component inventory
//!
//! `#[component]` expands to an entry in the `COMPONENTS` distributed
//! slice. Collecting the slice is the pure "collect descriptors" phase;
//! nothing is constructed until a container resolves it.

use crate::component::Component;
use crate::container::Dependencies;
use crate::descriptor::ComponentDescriptor;
use std::sync::Arc;

/// Descriptor plus constructor of one annotated component
pub struct Registration {
    pub descriptor: ComponentDescriptor,
    pub factory: fn(Dependencies) -> Arc<dyn Component>,
}

impl Registration {
    pub fn new(
        descriptor: ComponentDescriptor,
        factory: fn(Dependencies) -> Arc<dyn Component>,
    ) -> Self {
        Self {
            descriptor,
            factory,
        }
    }
}

/// Distributed slice for collecting components at link time
#[linkme::distributed_slice]
pub static COMPONENTS: [fn() -> Registration];

/// Collect all registered components from the distributed slice
pub fn collect_components() -> Vec<Registration> {
    COMPONENTS.iter().map(|f| f()).collect()
}

/// Descriptors only, for tools that never construct anything
pub fn collect_descriptors() -> Vec<ComponentDescriptor> {
    COMPONENTS.iter().map(|f| f().descriptor).collect()
}

/// Register a component in the distributed slice. May be used any number
/// of times in one module.
#[macro_export]
macro_rules! register_component {
    ($registration:expr) => {
        const _: () = {
            #[$crate::linkme::distributed_slice($crate::COMPONENTS)]
            #[linkme(crate = $crate::linkme)]
            static CONDUIT_COMPONENT: fn() -> $crate::Registration = || $registration;
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Invocation, MemberError};
    use crate::descriptor::ExposedMethod;
    use serde_json::Value;

    struct Clock;

    impl Component for Clock {
        fn invoke(self: Arc<Self>, member: &str, _args: Vec<Value>) -> Invocation {
            match member {
                "now" => Invocation::ready(Ok(Value::from(42))),
                other => Invocation::ready(Err(MemberError::unknown_member(other))),
            }
        }
    }

    register_component!(Registration::new(
        ComponentDescriptor::new("Clock").expose(ExposedMethod::new("now")),
        |_| Arc::new(Clock),
    ));

    register_component!(Registration::new(
        ComponentDescriptor::new("WallClock").expose(ExposedMethod::new("now")),
        |_| Arc::new(Clock),
    ));

    #[test]
    fn test_registered_component_is_collected() {
        let descriptors = collect_descriptors();
        let clock = descriptors
            .iter()
            .find(|d| d.identity.as_str() == "Clock")
            .expect("Clock registered");
        assert_eq!(clock.methods[0].name, "now");
        assert!(collect_components().len() >= 1);
    }

    #[test]
    fn test_several_registrations_in_one_module() {
        let ids: Vec<String> = collect_descriptors()
            .into_iter()
            .map(|d| d.identity.to_string())
            .collect();
        assert!(ids.iter().any(|id| id == "Clock"));
        assert!(ids.iter().any(|id| id == "WallClock"));
    }
}
