use serde::{Deserialize, Serialize};

/// Proximity window of engine version 1.0.0, in characters.
///
/// A versioned constant: changing it changes obligation output and requires a
/// new engine version.
pub const PROXIMITY_WINDOW_V1: usize = 500;

/// Obligation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum distance between span midpoints for evidence to bind.
    #[serde(default = "default_proximity_window")]
    pub proximity_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proximity_window: PROXIMITY_WINDOW_V1,
        }
    }
}

impl EngineConfig {
    pub fn with_proximity_window(mut self, window: usize) -> Self {
        self.proximity_window = window;
        self
    }
}

fn default_proximity_window() -> usize {
    PROXIMITY_WINDOW_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_versioned_constant() {
        assert_eq!(EngineConfig::default().proximity_window, 500);
    }

    #[test]
    fn missing_window_deserializes_to_default() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
