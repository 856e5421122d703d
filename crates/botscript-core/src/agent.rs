//! The agent capability set consumed by programs
//!
//! Programs never inspect the world directly. Commands call the action
//! primitives, conditions call the queries, and nothing else crosses the
//! boundary.

use std::cell::Cell;

use crate::ast::{Action, Rotation};
use crate::config::{ActionCosts, AgentConfig};

/// Primitive actions and queries a program may use
pub trait Agent {
    fn move_forward(&mut self);
    fn turn(&mut self, rotation: Rotation);
    fn shoot(&mut self);
    /// Pick up the item at the current position and use it
    fn pickup_and_use(&mut self);

    fn has_energy_at_least(&self, threshold: f64) -> bool;
    fn is_at_item(&self) -> bool;
    fn can_hit_robot(&self) -> bool;
    /// Whether an obstruction is directly ahead
    fn is_wall_ahead(&self) -> bool;

    /// Current energy for run traces. Not a program query.
    fn energy_level(&self) -> Option<f64> {
        None
    }
}

/// Deterministic in-memory agent driven by an [`AgentConfig`].
///
/// Records every action performed and counts queries, which makes it the
/// stand-in for a real world in tests and in `botscript run`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScriptedAgent {
    energy: f64,
    costs: ActionCosts,
    item_energy: f64,
    wall_ahead: bool,
    at_item: bool,
    can_hit_robot: bool,
    wall_after_moves: Option<u64>,
    moves: u64,
    actions: Vec<Action>,
    #[serde(skip)]
    queries: Cell<u64>,
}

impl ScriptedAgent {
    pub fn new(config: AgentConfig) -> Self {
        ScriptedAgent {
            energy: config.energy,
            costs: config.costs,
            item_energy: config.item_energy,
            wall_ahead: config.wall_ahead,
            at_item: config.at_item,
            can_hit_robot: config.can_hit_robot,
            wall_after_moves: config.wall_after_moves,
            moves: 0,
            actions: Vec::new(),
            queries: Cell::new(0),
        }
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Actions performed so far, oldest first
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of condition queries answered so far
    pub fn query_count(&self) -> u64 {
        self.queries.get()
    }

    pub fn set_energy(&mut self, energy: f64) {
        self.energy = energy.max(0.0);
    }

    pub fn set_wall_ahead(&mut self, wall_ahead: bool) {
        self.wall_ahead = wall_ahead;
    }

    pub fn set_at_item(&mut self, at_item: bool) {
        self.at_item = at_item;
    }

    pub fn set_can_hit_robot(&mut self, can_hit_robot: bool) {
        self.can_hit_robot = can_hit_robot;
    }

    fn spend(&mut self, cost: f64) {
        self.energy = (self.energy - cost).max(0.0);
    }

    fn record(&mut self, action: Action) {
        tracing::trace!(%action, energy = self.energy, "agent acted");
        self.actions.push(action);
    }

    fn query(&self) {
        self.queries.set(self.queries.get() + 1);
    }
}

impl Agent for ScriptedAgent {
    fn move_forward(&mut self) {
        self.spend(self.costs.move_cost);
        self.moves += 1;
        if self.wall_after_moves == Some(self.moves) {
            self.wall_ahead = true;
        }
        self.record(Action::Move);
    }

    fn turn(&mut self, rotation: Rotation) {
        self.spend(self.costs.turn_cost);
        self.record(Action::Turn(rotation));
    }

    fn shoot(&mut self) {
        self.spend(self.costs.shoot_cost);
        self.record(Action::Shoot);
    }

    fn pickup_and_use(&mut self) {
        if self.at_item {
            self.at_item = false;
            self.energy += self.item_energy;
        }
        self.spend(self.costs.pickup_and_use_cost);
        self.record(Action::PickupAndUse);
    }

    fn has_energy_at_least(&self, threshold: f64) -> bool {
        self.query();
        self.energy >= threshold
    }

    fn is_at_item(&self) -> bool {
        self.query();
        self.at_item
    }

    fn can_hit_robot(&self) -> bool {
        self.query();
        self.can_hit_robot
    }

    fn is_wall_ahead(&self) -> bool {
        self.query();
        self.wall_ahead
    }

    fn energy_level(&self) -> Option<f64> {
        Some(self.energy)
    }
}
