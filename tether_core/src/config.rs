// tether_core/src/config.rs

use serde::Deserialize;

use crate::error::{BridgeError, BridgeResult};
use crate::naming::{self, TopicNames};

/// Construction-time options of one entity bridge. Immutable once the bridge
/// is open.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Floor publish rate in Hz.
    pub min_frequency: f64,
    /// Ceiling publish rate in Hz.
    pub max_frequency: f64,
    /// Command staleness window in seconds.
    pub timeout: f64,
}

impl BridgeConfig {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        min_frequency: f64,
        max_frequency: f64,
        timeout: f64,
    ) -> BridgeResult<Self> {
        let config = Self {
            name: name.into(),
            namespace: namespace.into(),
            min_frequency,
            max_frequency,
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every invariant and returns the topics the entity will use.
    pub fn validate(&self) -> BridgeResult<TopicNames> {
        let topics = naming::resolve(&self.name, &self.namespace)?;

        if !(self.min_frequency.is_finite() && self.min_frequency > 0.0) {
            return Err(BridgeError::InvalidConfig(format!(
                "min_frequency must be a positive number of Hz, got {}",
                self.min_frequency
            )));
        }
        if !(self.max_frequency.is_finite() && self.max_frequency > 0.0) {
            return Err(BridgeError::InvalidConfig(format!(
                "max_frequency must be a positive number of Hz, got {}",
                self.max_frequency
            )));
        }
        if self.min_frequency > self.max_frequency {
            return Err(BridgeError::InvalidConfig(format!(
                "min_frequency ({} Hz) exceeds max_frequency ({} Hz)",
                self.min_frequency, self.max_frequency
            )));
        }
        if !(self.timeout.is_finite() && self.timeout > 0.0) {
            return Err(BridgeError::InvalidConfig(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout
            )));
        }
        Ok(topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_config() {
        let config = BridgeConfig::new("box", "env", 1.0, 10.0, 0.5).unwrap();
        assert_eq!(config.validate().unwrap().state, "/env/box/State");
    }

    #[test]
    fn accepts_equal_bounds() {
        assert!(BridgeConfig::new("box", "env", 5.0, 5.0, 0.5).is_ok());
    }

    #[test]
    fn rejects_inverted_or_non_positive_frequencies() {
        for (min, max) in [(10.0, 1.0), (0.0, 1.0), (-1.0, 1.0), (1.0, f64::INFINITY)] {
            let err = BridgeConfig::new("box", "env", min, max, 0.5).unwrap_err();
            assert!(matches!(err, BridgeError::InvalidConfig(_)), "{} {}", min, max);
        }
    }

    #[test]
    fn rejects_non_positive_timeout() {
        for timeout in [0.0, -0.5, f64::NAN] {
            assert!(BridgeConfig::new("box", "env", 1.0, 10.0, timeout).is_err());
        }
    }

    #[test]
    fn rejects_bad_identifiers_before_numbers() {
        let err = BridgeConfig::new("bad name", "env", 10.0, 1.0, 0.5).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidIdentifier { .. }));
    }

    #[test]
    fn deserializes_recognized_options() {
        let config: BridgeConfig = serde_json::from_str(
            r#"{"name":"box","namespace":"env","min_frequency":1.0,"max_frequency":10.0,"timeout":0.5}"#,
        )
        .unwrap();
        assert_eq!(config.max_frequency, 10.0);

        let unknown = serde_json::from_str::<BridgeConfig>(
            r#"{"name":"box","min_frequency":1.0,"max_frequency":10.0,"timeout":0.5,"rate":3}"#,
        );
        assert!(unknown.is_err());
    }
}
