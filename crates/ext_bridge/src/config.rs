use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bridge tuning, usually read from the `[bridge]` table of `conduit.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Queue depth of each direction of the transport
    pub capacity: usize,
    /// Presses of one command closer together than this fire once
    #[serde(with = "millis")]
    pub trigger_window: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            trigger_window: Duration::from_millis(50),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: BridgeConfig = serde_json::from_str(r#"{"capacity": 8}"#).unwrap();
        assert_eq!(config.capacity, 8);
        assert_eq!(config.trigger_window, Duration::from_millis(50));

        let config: BridgeConfig = serde_json::from_str(r#"{"trigger_window": 120}"#).unwrap();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.trigger_window, Duration::from_millis(120));
    }

    #[test]
    fn test_field_names_match_rust_names() {
        let value = serde_json::to_value(BridgeConfig::default()).unwrap();
        assert_eq!(value, serde_json::json!({ "capacity": 64, "trigger_window": 50 }));
    }
}
