//! BotScript statement tree
//!
//! A program is a tree of statements. Every statement is either a
//! [`Command`] (performs agent actions and takes part in the tick protocol)
//! or a [`Condition`] (evaluates to a boolean against the agent's state).
//!
//! The types here are the *sealed* form: they are always fully constructed.
//! Partially built nodes live in [`crate::builder::StatementBuilder`] and are
//! converted into these types by `finish()`.
//!
//! Equality is structural: node ids and execution cursors are ignored, so a
//! tree compares equal to its own re-parsed rendering.

pub mod command;
pub mod condition;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use command::*;
pub use condition::*;

// ── Node identity ─────────────────────────────────────────

/// Identity of a statement node, assigned when the node is created.
///
/// Clones share the id of their original, which is what lets
/// `contains_as_descendant` recognise a copy of the receiver being attached
/// to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Never handed out by `fresh`
    pub(crate) const DETACHED: NodeId = NodeId(u64::MAX);

    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// ── Statement kinds ───────────────────────────────────────

/// Every statement variant the language knows, keyed by source name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Move,
    Turn,
    Shoot,
    PickupAndUse,
    Sequence,
    If,
    While,
    True,
    EnergyAtLeast,
    AtItem,
    CanHitRobot,
    Wall,
    And,
    Or,
    Not,
}

const STATEMENT_TABLE: [(&str, StatementKind); 15] = [
    ("move", StatementKind::Move),
    ("turn", StatementKind::Turn),
    ("shoot", StatementKind::Shoot),
    ("pickup-and-use", StatementKind::PickupAndUse),
    ("seq", StatementKind::Sequence),
    ("if", StatementKind::If),
    ("while", StatementKind::While),
    ("true", StatementKind::True),
    ("energy-at-least", StatementKind::EnergyAtLeast),
    ("at-item", StatementKind::AtItem),
    ("can-hit-robot", StatementKind::CanHitRobot),
    ("wall", StatementKind::Wall),
    ("and", StatementKind::And),
    ("or", StatementKind::Or),
    ("not", StatementKind::Not),
];

impl StatementKind {
    /// Case-insensitive exact lookup of a statement name
    pub fn from_name(name: &str) -> Option<Self> {
        STATEMENT_TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|&(_, kind)| kind)
    }

    /// Source name as written after `(`
    pub fn name(self) -> &'static str {
        STATEMENT_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|&(name, _)| name)
            .unwrap_or("?")
    }

    pub fn is_command(self) -> bool {
        matches!(
            self,
            StatementKind::Move
                | StatementKind::Turn
                | StatementKind::Shoot
                | StatementKind::PickupAndUse
                | StatementKind::Sequence
                | StatementKind::If
                | StatementKind::While
        )
    }

    pub fn is_condition(self) -> bool {
        !self.is_command()
    }

    /// All kinds in table order
    pub fn all() -> impl Iterator<Item = StatementKind> {
        STATEMENT_TABLE.iter().map(|&(_, kind)| kind)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Statement ─────────────────────────────────────────────

/// A fully constructed statement of either flavour
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Command(Command),
    Condition(Condition),
}

impl Statement {
    pub fn id(&self) -> NodeId {
        self.as_ref().id()
    }

    pub fn kind(&self) -> StatementKind {
        self.as_ref().kind()
    }

    pub fn as_ref(&self) -> StatementRef<'_> {
        match self {
            Statement::Command(command) => StatementRef::Command(command),
            Statement::Condition(condition) => StatementRef::Condition(condition),
        }
    }

    pub fn into_command(self) -> Option<Command> {
        match self {
            Statement::Command(command) => Some(command),
            Statement::Condition(_) => None,
        }
    }

    pub fn into_condition(self) -> Option<Condition> {
        match self {
            Statement::Condition(condition) => Some(condition),
            Statement::Command(_) => None,
        }
    }

    /// Reflexive: a statement contains itself
    pub fn contains_as_descendant(&self, id: NodeId) -> bool {
        self.as_ref().contains_as_descendant(id)
    }

    pub fn to_source_text(&self) -> String {
        self.to_string()
    }
}

impl From<Command> for Statement {
    fn from(command: Command) -> Self {
        Statement::Command(command)
    }
}

impl From<Condition> for Statement {
    fn from(condition: Condition) -> Self {
        Statement::Condition(condition)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Command(command) => command.fmt(f),
            Statement::Condition(condition) => condition.fmt(f),
        }
    }
}

/// Borrowed view of any node, used for tree walks
#[derive(Debug, Clone, Copy)]
pub enum StatementRef<'a> {
    Command(&'a Command),
    Condition(&'a Condition),
}

impl<'a> StatementRef<'a> {
    pub fn id(self) -> NodeId {
        match self {
            StatementRef::Command(command) => command.id(),
            StatementRef::Condition(condition) => condition.id(),
        }
    }

    pub fn kind(self) -> StatementKind {
        match self {
            StatementRef::Command(command) => command.kind(),
            StatementRef::Condition(condition) => condition.kind(),
        }
    }

    /// Direct children in source order
    pub fn children(self) -> Vec<StatementRef<'a>> {
        match self {
            StatementRef::Command(command) => command.children(),
            StatementRef::Condition(condition) => condition
                .operands()
                .iter()
                .map(StatementRef::Condition)
                .collect(),
        }
    }

    /// Smallest id anywhere in the subtree
    pub fn lowest_id(self) -> NodeId {
        match self {
            StatementRef::Command(command) => command.lowest_id(),
            StatementRef::Condition(condition) => condition.lowest_id(),
        }
    }

    /// Walks the subtree with an explicit stack, so depth is bounded by
    /// memory rather than by the call stack. Subtrees whose lowest id is
    /// above `id` are skipped; a node created before all of its candidate
    /// children, as every parser-built parent is, answers immediately.
    pub fn contains_as_descendant(self, id: NodeId) -> bool {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            if id < node.lowest_id() {
                continue;
            }
            if node.id() == id {
                return true;
            }
            pending.extend(node.children());
        }
        false
    }

    /// Number of nodes in the subtree, including this one
    pub fn size(self) -> usize {
        let mut pending = vec![self];
        let mut count = 0;
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children());
        }
        count
    }
}
