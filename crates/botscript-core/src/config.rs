//! Run configuration
//!
//! JSON documents with every field optional; missing fields take the
//! defaults below. Unknown fields are rejected so that typos surface.
//!
//! ```json
//! {
//!   "max_ticks": 50,
//!   "agent": { "energy": 200, "wall_after_moves": 3, "costs": { "move": 20 } }
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Upper bound on driver ticks for one run
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Stop at the first tick on which no leaf could be stepped
    #[serde(default = "default_true")]
    pub stop_when_idle: bool,

    #[serde(default)]
    pub agent: AgentConfig,
}

/// Initial state of a [`crate::agent::ScriptedAgent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_energy")]
    pub energy: f64,

    #[serde(default)]
    pub costs: ActionCosts,

    /// Energy gained by picking up and using an item
    #[serde(default = "default_item_energy")]
    pub item_energy: f64,

    #[serde(default)]
    pub wall_ahead: bool,

    #[serde(default)]
    pub at_item: bool,

    #[serde(default)]
    pub can_hit_robot: bool,

    /// A wall appears ahead once this many moves have been made
    #[serde(default)]
    pub wall_after_moves: Option<u64>,
}

/// Energy spent per primitive action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionCosts {
    #[serde(rename = "move", default = "default_move_cost")]
    pub move_cost: f64,

    #[serde(rename = "turn", default = "default_turn_cost")]
    pub turn_cost: f64,

    #[serde(rename = "shoot", default = "default_shoot_cost")]
    pub shoot_cost: f64,

    #[serde(rename = "pickup_and_use", default)]
    pub pickup_and_use_cost: f64,
}

fn default_max_ticks() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_energy() -> f64 {
    1000.0
}

fn default_item_energy() -> f64 {
    100.0
}

fn default_move_cost() -> f64 {
    10.0
}

fn default_turn_cost() -> f64 {
    5.0
}

fn default_shoot_cost() -> f64 {
    50.0
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            stop_when_idle: true,
            agent: AgentConfig::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            energy: default_energy(),
            costs: ActionCosts::default(),
            item_energy: default_item_energy(),
            wall_ahead: false,
            at_item: false,
            can_hit_robot: false,
            wall_after_moves: None,
        }
    }
}

impl Default for ActionCosts {
    fn default() -> Self {
        Self {
            move_cost: default_move_cost(),
            turn_cost: default_turn_cost(),
            shoot_cost: default_shoot_cost(),
            pickup_and_use_cost: 0.0,
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::Io(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let config: RunConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let agent = &self.agent;
        let amounts = [
            ("agent.energy", agent.energy),
            ("agent.item_energy", agent.item_energy),
            ("agent.costs.move", agent.costs.move_cost),
            ("agent.costs.turn", agent.costs.turn_cost),
            ("agent.costs.shoot", agent.costs.shoot_cost),
            ("agent.costs.pickup_and_use", agent.costs.pickup_and_use_cost),
        ];
        for (field, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a non-negative number, got {}",
                    field, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RunConfig::from_json("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.max_ticks, 100);
        assert!(config.stop_when_idle);
        assert_eq!(config.agent.energy, 1000.0);
    }

    #[test]
    fn test_partial_override() {
        let config = RunConfig::from_json(
            r#"{"max_ticks": 5, "agent": {"energy": 20, "costs": {"move": 1}}}"#,
        )
        .unwrap();
        assert_eq!(config.max_ticks, 5);
        assert_eq!(config.agent.energy, 20.0);
        assert_eq!(config.agent.costs.move_cost, 1.0);
        assert_eq!(config.agent.costs.turn_cost, 5.0);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RunConfig::from_json(r#"{"max_tick": 5}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_negative_energy_rejected() {
        let err = RunConfig::from_json(r#"{"agent": {"energy": -1}}"#).unwrap_err();
        assert!(err.to_string().contains("agent.energy"));
    }

    #[test]
    fn test_missing_file() {
        let err = RunConfig::from_file("/nonexistent/botscript.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
