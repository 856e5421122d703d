//! Staged construction of statements
//!
//! A [`StatementBuilder`] is a node under construction. Children and literal
//! values are attached one at a time, each node enforcing its own arity and
//! ordering rules:
//!
//! | node                      | accepts                                        |
//! |---------------------------|------------------------------------------------|
//! | `seq`                     | any number of commands                         |
//! | `if`                      | one condition, then two commands               |
//! | `while`                   | one condition, then one command                |
//! | `and` / `or` / `not`      | exactly 2 / 2 / 1 conditions                   |
//! | `turn`                    | one rotation literal                           |
//! | `energy-at-least`         | one non-negative number literal                |
//! | other leaves              | nothing                                        |
//!
//! Once [`StatementBuilder::is_fully_constructed`] holds, `finish` seals the
//! node into a [`Statement`]. Only sealed statements can be attached, so a
//! partially built value can never end up inside another node.

use std::fmt;

use crate::ast::{
    Action, BoolOp, Command, CommandNode, Composed, Condition, ConditionNode, IfCommand,
    NodeId, Primitive, Rotation, Sequence, Statement, StatementKind, WhileCommand,
};
use crate::error::ConstructionError;

/// Something that can be attached to a node under construction
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    Statement(Statement),
    /// Raw literal text from the source
    Value(String),
}

impl Attachment {
    /// Short description for diagnostics: `(move)` or `value 'x'`
    pub fn describe(&self) -> String {
        match self {
            Attachment::Statement(statement) => format!("({})", statement.kind()),
            Attachment::Value(text) => format!("value '{}'", text),
        }
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<Statement> for Attachment {
    fn from(statement: Statement) -> Self {
        Attachment::Statement(statement)
    }
}

impl From<Command> for Attachment {
    fn from(command: Command) -> Self {
        Attachment::Statement(Statement::Command(command))
    }
}

impl From<Condition> for Attachment {
    fn from(condition: Condition) -> Self {
        Attachment::Statement(Statement::Condition(condition))
    }
}

impl From<&str> for Attachment {
    fn from(text: &str) -> Self {
        Attachment::Value(text.to_string())
    }
}

/// A statement node under construction
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    id: NodeId,
    kind: StatementKind,
    partial: Partial,
}

#[derive(Debug, Clone)]
enum Partial {
    Action(Action),
    Turn(Option<Rotation>),
    Sequence(Vec<Command>),
    If {
        condition: Option<Condition>,
        then_branch: Option<Command>,
        else_branch: Option<Command>,
    },
    While {
        condition: Option<Condition>,
        body: Option<Command>,
    },
    Leaf(ConditionNode),
    EnergyAtLeast(Option<f64>),
    Composed {
        op: BoolOp,
        operands: Vec<Condition>,
    },
}

impl StatementBuilder {
    /// Empty node of the given kind
    pub fn new(kind: StatementKind) -> Self {
        let partial = match kind {
            StatementKind::Move => Partial::Action(Action::Move),
            StatementKind::Shoot => Partial::Action(Action::Shoot),
            StatementKind::PickupAndUse => Partial::Action(Action::PickupAndUse),
            StatementKind::Turn => Partial::Turn(None),
            StatementKind::Sequence => Partial::Sequence(Vec::new()),
            StatementKind::If => Partial::If {
                condition: None,
                then_branch: None,
                else_branch: None,
            },
            StatementKind::While => Partial::While {
                condition: None,
                body: None,
            },
            StatementKind::True => Partial::Leaf(ConditionNode::True),
            StatementKind::AtItem => Partial::Leaf(ConditionNode::AtItem),
            StatementKind::CanHitRobot => Partial::Leaf(ConditionNode::CanHitRobot),
            StatementKind::Wall => Partial::Leaf(ConditionNode::Wall),
            StatementKind::EnergyAtLeast => Partial::EnergyAtLeast(None),
            StatementKind::And => Partial::composed(BoolOp::And),
            StatementKind::Or => Partial::composed(BoolOp::Or),
            StatementKind::Not => Partial::composed(BoolOp::Not),
        };
        StatementBuilder {
            id: NodeId::fresh(),
            kind,
            partial,
        }
    }

    /// Looks the name up in the statement table
    pub fn from_name(name: &str) -> Option<Self> {
        StatementKind::from_name(name).map(Self::new)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Whether `attachment` may be attached next
    pub fn can_attach(&self, attachment: &Attachment) -> bool {
        self.accepts(attachment) && !self.would_cycle(attachment)
    }

    /// Attaches a child statement or literal value.
    ///
    /// Leaves the node untouched when the attachment is rejected.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), ConstructionError> {
        if !self.accepts(&attachment) {
            return Err(ConstructionError::Rejected {
                receiver: self.kind.name(),
                attachment: attachment.describe(),
            });
        }
        if self.would_cycle(&attachment) {
            return Err(ConstructionError::Cycle {
                receiver: self.kind.name(),
            });
        }

        match (&mut self.partial, attachment) {
            (Partial::Turn(slot), Attachment::Value(text)) => *slot = text.parse().ok(),
            (Partial::EnergyAtLeast(slot), Attachment::Value(text)) => {
                *slot = parse_threshold(&text)
            }
            (Partial::Sequence(children), Attachment::Statement(Statement::Command(child))) => {
                children.push(child)
            }
            (
                Partial::If {
                    condition,
                    then_branch,
                    else_branch,
                },
                Attachment::Statement(statement),
            ) => match statement {
                Statement::Condition(c) => *condition = Some(c),
                Statement::Command(c) if then_branch.is_none() => *then_branch = Some(c),
                Statement::Command(c) => *else_branch = Some(c),
            },
            (Partial::While { condition, body }, Attachment::Statement(statement)) => {
                match statement {
                    Statement::Condition(c) => *condition = Some(c),
                    Statement::Command(c) => *body = Some(c),
                }
            }
            (
                Partial::Composed { operands, .. },
                Attachment::Statement(Statement::Condition(operand)),
            ) => operands.push(operand),
            // accepts() admits no other combination
            _ => {}
        }
        Ok(())
    }

    /// True once every required child or literal is present
    pub fn is_fully_constructed(&self) -> bool {
        match &self.partial {
            Partial::Action(_) | Partial::Sequence(_) | Partial::Leaf(_) => true,
            Partial::Turn(rotation) => rotation.is_some(),
            Partial::EnergyAtLeast(threshold) => threshold.is_some(),
            Partial::If {
                condition,
                then_branch,
                else_branch,
            } => condition.is_some() && then_branch.is_some() && else_branch.is_some(),
            Partial::While { condition, body } => condition.is_some() && body.is_some(),
            Partial::Composed { op, operands } => operands.len() == op.arity(),
        }
    }

    /// Reflexive: the node contains itself
    pub fn contains_as_descendant(&self, id: NodeId) -> bool {
        if self.id == id {
            return true;
        }
        match &self.partial {
            Partial::Sequence(children) => children.iter().any(|c| c.contains_as_descendant(id)),
            Partial::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.as_ref().is_some_and(|c| c.contains_as_descendant(id))
                    || then_branch.as_ref().is_some_and(|c| c.contains_as_descendant(id))
                    || else_branch.as_ref().is_some_and(|c| c.contains_as_descendant(id))
            }
            Partial::While { condition, body } => {
                condition.as_ref().is_some_and(|c| c.contains_as_descendant(id))
                    || body.as_ref().is_some_and(|c| c.contains_as_descendant(id))
            }
            Partial::Composed { operands, .. } => {
                operands.iter().any(|c| c.contains_as_descendant(id))
            }
            _ => false,
        }
    }

    /// Renders the node; fails until it is fully constructed
    pub fn to_source_text(&self) -> Result<String, ConstructionError> {
        if !self.is_fully_constructed() {
            return Err(ConstructionError::Unrenderable {
                kind: self.kind.name(),
            });
        }
        Ok(self.clone().finish()?.to_string())
    }

    /// Seals the node. The sealed statement keeps this builder's id.
    pub fn finish(self) -> Result<Statement, ConstructionError> {
        let incomplete = ConstructionError::Incomplete {
            kind: self.kind.name(),
        };
        let id = self.id;
        let command = |node: CommandNode| -> Result<Statement, ConstructionError> {
            Ok(Statement::Command(Command::with_id(id, node)))
        };
        let condition = |node: ConditionNode| -> Result<Statement, ConstructionError> {
            Ok(Statement::Condition(Condition::with_id(id, node)))
        };

        match self.partial {
            Partial::Action(action) => command(CommandNode::Primitive(Primitive::new(action))),
            Partial::Turn(Some(rotation)) => command(CommandNode::Primitive(Primitive::new(
                Action::Turn(rotation),
            ))),
            Partial::Sequence(children) => command(CommandNode::Sequence(Sequence::new(children))),
            Partial::If {
                condition: Some(c),
                then_branch: Some(t),
                else_branch: Some(e),
            } => command(CommandNode::If(IfCommand::new(c, t, e))),
            Partial::While {
                condition: Some(c),
                body: Some(b),
            } => command(CommandNode::While(WhileCommand::new(c, b))),
            Partial::Leaf(node) => condition(node),
            Partial::EnergyAtLeast(Some(threshold)) => {
                condition(ConditionNode::EnergyAtLeast(threshold))
            }
            Partial::Composed { op, operands }
                if operands.len() == op.arity() =>
            {
                condition(ConditionNode::Composed(Composed::new(op, operands)))
            }
            _ => Err(incomplete),
        }
    }

    /// Seals the node, which must be a command
    pub fn finish_command(self) -> Result<Command, ConstructionError> {
        let kind = self.kind;
        self.finish()?
            .into_command()
            .ok_or(ConstructionError::Rejected {
                receiver: "program",
                attachment: format!("({})", kind),
            })
    }

    fn accepts(&self, attachment: &Attachment) -> bool {
        match (&self.partial, attachment) {
            (Partial::Turn(None), Attachment::Value(text)) => text.parse::<Rotation>().is_ok(),
            (Partial::EnergyAtLeast(None), Attachment::Value(text)) => {
                parse_threshold(text).is_some()
            }
            (Partial::Sequence(_), Attachment::Statement(Statement::Command(_))) => true,
            (
                Partial::If {
                    condition,
                    then_branch,
                    else_branch,
                },
                Attachment::Statement(statement),
            ) => match statement {
                Statement::Condition(_) => condition.is_none(),
                Statement::Command(_) => {
                    condition.is_some() && (then_branch.is_none() || else_branch.is_none())
                }
            },
            (Partial::While { condition, body }, Attachment::Statement(statement)) => {
                match statement {
                    Statement::Condition(_) => condition.is_none(),
                    Statement::Command(_) => condition.is_some() && body.is_none(),
                }
            }
            (
                Partial::Composed { op, operands },
                Attachment::Statement(Statement::Condition(_)),
            ) => operands.len() < op.arity(),
            _ => false,
        }
    }

    fn would_cycle(&self, attachment: &Attachment) -> bool {
        match attachment {
            Attachment::Statement(statement) => statement.contains_as_descendant(self.id),
            Attachment::Value(_) => false,
        }
    }
}

impl Partial {
    fn composed(op: BoolOp) -> Self {
        Partial::Composed {
            op,
            operands: Vec::new(),
        }
    }
}

/// Non-negative, finite decimal number
fn parse_threshold(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}
