//! Conditions — side-effect-free boolean queries against the agent
//!
//! Evaluation is a single non-suspending computation: conditions never span
//! ticks and never touch construction or cursor state.

use std::fmt;

use super::{NodeId, StatementKind, StatementRef};
use crate::agent::Agent;

/// A fully constructed condition node
#[derive(Debug, Clone)]
pub struct Condition {
    id: NodeId,
    /// Smallest id in the subtree
    lowest: NodeId,
    node: ConditionNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    True,
    /// Holds when the agent has at least this much energy
    EnergyAtLeast(f64),
    AtItem,
    CanHitRobot,
    Wall,
    Composed(Composed),
}

/// Boolean connective applied to its operand conditions
#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    op: BoolOp,
    operands: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    /// Holds when none of the operands hold
    Not,
}

impl BoolOp {
    /// Number of operands the connective requires
    pub fn arity(self) -> usize {
        match self {
            BoolOp::And | BoolOp::Or => 2,
            BoolOp::Not => 1,
        }
    }

    pub fn kind(self) -> StatementKind {
        match self {
            BoolOp::And => StatementKind::And,
            BoolOp::Or => StatementKind::Or,
            BoolOp::Not => StatementKind::Not,
        }
    }

    fn fold(self, mut results: impl Iterator<Item = bool>) -> bool {
        match self {
            BoolOp::And => results.all(|r| r),
            BoolOp::Or => results.any(|r| r),
            BoolOp::Not => !results.any(|r| r),
        }
    }
}

impl Composed {
    pub fn new(op: BoolOp, operands: Vec<Condition>) -> Self {
        Composed { op, operands }
    }

    pub fn op(&self) -> BoolOp {
        self.op
    }

    pub fn operands(&self) -> &[Condition] {
        &self.operands
    }
}

impl Condition {
    pub fn new(node: ConditionNode) -> Self {
        Self::with_id(NodeId::fresh(), node)
    }

    pub(crate) fn with_id(id: NodeId, node: ConditionNode) -> Self {
        let lowest = match &node {
            ConditionNode::Composed(composed) => composed
                .operands
                .iter()
                .map(Condition::lowest_id)
                .fold(id, NodeId::min),
            _ => id,
        };
        Condition { id, lowest, node }
    }

    pub fn always() -> Self {
        Self::new(ConditionNode::True)
    }

    pub fn energy_at_least(threshold: f64) -> Self {
        Self::new(ConditionNode::EnergyAtLeast(threshold))
    }

    pub fn at_item() -> Self {
        Self::new(ConditionNode::AtItem)
    }

    pub fn can_hit_robot() -> Self {
        Self::new(ConditionNode::CanHitRobot)
    }

    pub fn wall() -> Self {
        Self::new(ConditionNode::Wall)
    }

    pub fn and(left: Condition, right: Condition) -> Self {
        Self::new(ConditionNode::Composed(Composed::new(
            BoolOp::And,
            vec![left, right],
        )))
    }

    pub fn or(left: Condition, right: Condition) -> Self {
        Self::new(ConditionNode::Composed(Composed::new(
            BoolOp::Or,
            vec![left, right],
        )))
    }

    pub fn not(operand: Condition) -> Self {
        Self::new(ConditionNode::Composed(Composed::new(
            BoolOp::Not,
            vec![operand],
        )))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Smallest id anywhere in the subtree, this node included
    pub fn lowest_id(&self) -> NodeId {
        self.lowest
    }

    pub fn node(&self) -> &ConditionNode {
        &self.node
    }

    pub fn kind(&self) -> StatementKind {
        match &self.node {
            ConditionNode::True => StatementKind::True,
            ConditionNode::EnergyAtLeast(_) => StatementKind::EnergyAtLeast,
            ConditionNode::AtItem => StatementKind::AtItem,
            ConditionNode::CanHitRobot => StatementKind::CanHitRobot,
            ConditionNode::Wall => StatementKind::Wall,
            ConditionNode::Composed(composed) => composed.op.kind(),
        }
    }

    /// Operands of a composed condition, empty for leaves
    pub fn operands(&self) -> &[Condition] {
        match &self.node {
            ConditionNode::Composed(composed) => composed.operands(),
            _ => &[],
        }
    }

    pub fn contains_as_descendant(&self, id: NodeId) -> bool {
        StatementRef::Condition(self).contains_as_descendant(id)
    }

    pub fn evaluate(&self, agent: &dyn Agent) -> bool {
        match &self.node {
            ConditionNode::True => true,
            ConditionNode::EnergyAtLeast(threshold) => agent.has_energy_at_least(*threshold),
            ConditionNode::AtItem => agent.is_at_item(),
            ConditionNode::CanHitRobot => agent.can_hit_robot(),
            ConditionNode::Wall => agent.is_wall_ahead(),
            ConditionNode::Composed(composed) => composed
                .op
                .fold(composed.operands.iter().map(|c| c.evaluate(agent))),
        }
    }
}

/// Operands are unlinked onto a work list, so dropping a deeply nested
/// condition does not recurse once per level.
impl Drop for Condition {
    fn drop(&mut self) {
        let ConditionNode::Composed(composed) = &mut self.node else {
            return;
        };
        let mut pending = std::mem::take(&mut composed.operands);
        while let Some(mut operand) = pending.pop() {
            if let ConditionNode::Composed(composed) = &mut operand.node {
                pending.append(&mut composed.operands);
            }
        }
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.node {
            ConditionNode::EnergyAtLeast(threshold) => {
                write!(f, "({} {})", self.kind(), threshold)
            }
            ConditionNode::Composed(composed) => {
                write!(f, "({}", self.kind())?;
                for operand in &composed.operands {
                    write!(f, " {}", operand)?;
                }
                write!(f, ")")
            }
            _ => write!(f, "({})", self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedAgent;
    use crate::config::AgentConfig;

    fn agent(energy: f64, wall_ahead: bool) -> ScriptedAgent {
        ScriptedAgent::new(AgentConfig {
            energy,
            wall_ahead,
            ..AgentConfig::default()
        })
    }

    #[test]
    fn test_leaf_conditions_query_agent() {
        let agent = agent(500.0, true);
        assert!(Condition::always().evaluate(&agent));
        assert!(Condition::wall().evaluate(&agent));
        assert!(!Condition::at_item().evaluate(&agent));
        assert!(!Condition::can_hit_robot().evaluate(&agent));
        assert!(Condition::energy_at_least(500.0).evaluate(&agent));
        assert!(!Condition::energy_at_least(500.5).evaluate(&agent));
    }

    #[test]
    fn test_composed_conditions() {
        let agent = agent(100.0, false);
        let wall_or_energy = Condition::or(Condition::wall(), Condition::energy_at_least(50.0));
        assert!(wall_or_energy.evaluate(&agent));
        let wall_and_energy = Condition::and(Condition::wall(), Condition::energy_at_least(50.0));
        assert!(!wall_and_energy.evaluate(&agent));
        assert!(Condition::not(Condition::wall()).evaluate(&agent));
        assert!(!Condition::not(Condition::not(Condition::wall())).evaluate(&agent));
    }

    #[test]
    fn test_connective_arity() {
        assert_eq!(BoolOp::And.arity(), 2);
        assert_eq!(BoolOp::Or.arity(), 2);
        assert_eq!(BoolOp::Not.arity(), 1);
    }

    #[test]
    fn test_lowest_id_covers_operands() {
        let inner = Condition::wall();
        let inner_id = inner.id();
        let outer = Condition::not(inner);
        assert!(inner_id < outer.id());
        assert_eq!(outer.lowest_id(), inner_id);
        let leaf = Condition::at_item();
        assert_eq!(leaf.lowest_id(), leaf.id());
    }

    #[test]
    fn test_drop_deeply_nested_condition() {
        let mut condition = Condition::wall();
        for _ in 0..200_000 {
            condition = Condition::not(condition);
        }
        assert_eq!(condition.kind(), StatementKind::Not);
        drop(condition);
    }

    #[test]
    fn test_fold_over_operand_list() {
        let agent = agent(0.0, false);
        let many = Condition::new(ConditionNode::Composed(Composed::new(
            BoolOp::Or,
            vec![Condition::wall(), Condition::at_item(), Condition::always()],
        )));
        assert!(many.evaluate(&agent));
        let none = Condition::new(ConditionNode::Composed(Composed::new(BoolOp::And, vec![])));
        assert!(none.evaluate(&agent));
    }

    #[test]
    fn test_evaluation_does_not_change_agent() {
        let agent = agent(10.0, true);
        let before = agent.actions().to_vec();
        Condition::and(Condition::wall(), Condition::always()).evaluate(&agent);
        assert_eq!(agent.actions(), before.as_slice());
    }

    #[test]
    fn test_display() {
        assert_eq!(Condition::energy_at_least(1000.0).to_string(), "(energy-at-least 1000)");
        assert_eq!(Condition::energy_at_least(2.5).to_string(), "(energy-at-least 2.5)");
        assert_eq!(
            Condition::and(Condition::wall(), Condition::not(Condition::at_item())).to_string(),
            "(and (wall) (not (at-item)))"
        );
        assert_eq!(Condition::can_hit_robot().to_string(), "(can-hit-robot)");
    }
}
