use serde::{Deserialize, Serialize};

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Interval of the game loop in milliseconds (default: 100).
    pub tick_interval_ms: u64,
    /// Minimum delay between two background saves (default: 5000).
    pub save_debounce_ms: u64,
    /// Age after which an interrupted prestige is no longer completed (default: 30).
    pub transaction_timeout_secs: u64,
    /// Seed for the message trigger RNG; entropy-seeded when absent.
    pub rng_seed: Option<u64>,
    /// Storage key of the game state blob.
    pub state_key: String,
    /// Storage key of the prestige transaction record.
    pub transaction_key: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            save_debounce_ms: 5_000,
            transaction_timeout_secs: 30,
            rng_seed: None,
            state_key: "bureaucracy_game_state".to_string(),
            transaction_key: "prestige_transaction".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: SimConfig = serde_yaml::from_str("tick_interval_ms: 250\nrng_seed: 7\n").unwrap();
        assert_eq!(cfg.tick_interval_ms, 250);
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.save_debounce_ms, 5_000);
        assert_eq!(cfg.state_key, "bureaucracy_game_state");
    }
}
