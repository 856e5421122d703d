//! Commands — statements that act on the agent, one tick at a time
//!
//! # Tick protocol
//!
//! An external driver advances a program by calling, once per tick, on the
//! root command:
//!
//! 1. [`Command::can_stay_current`]: whether the previously active leaf can
//!    keep being current (always false for the leaves of this language);
//! 2. [`Command::step`]: choose the active leaf for this tick, returning
//!    whether one was found;
//! 3. [`Command::execute`]: only after a successful `step`; descends to the
//!    active leaf and performs exactly one primitive action.
//!
//! Each composite keeps its own cursor ([`Sequence`] position, [`IfCommand`]
//! branch, [`WhileCommand`] iteration flag) and only `step` moves it, so the
//! position survives between ticks without using the call stack.
//!
//! A leaf's `step` always succeeds. Composites drive their current child
//! through an internal step that tells them when to move past it: a leaf is
//! passed once it has executed, since it cannot stay current, and a composite
//! child is passed when its own `step` reports `false`. A composite reporting
//! `false` is exhausted for the current traversal and has already reset
//! itself, so the next `step` starts it from the top.

use std::fmt;
use std::mem;
use std::str::FromStr;

use super::{Condition, NodeId, StatementKind, StatementRef};
use crate::agent::Agent;
use crate::error::ExecutionError;

// ── Primitive actions ─────────────────────────────────────

/// Direction for the turn primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Clockwise,
    Counterclockwise,
}

impl Rotation {
    pub fn as_str(self) -> &'static str {
        match self {
            Rotation::Clockwise => "clockwise",
            Rotation::Counterclockwise => "counterclockwise",
        }
    }
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let word = s.trim();
        if word.eq_ignore_ascii_case("clockwise") {
            Ok(Rotation::Clockwise)
        } else if word.eq_ignore_ascii_case("counterclockwise") {
            Ok(Rotation::Counterclockwise)
        } else {
            Err(format!("unknown rotation '{}'", word))
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic agent action; a tick performs at most one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move,
    Turn(Rotation),
    Shoot,
    PickupAndUse,
}

impl Action {
    pub fn kind(self) -> StatementKind {
        match self {
            Action::Move => StatementKind::Move,
            Action::Turn(_) => StatementKind::Turn,
            Action::Shoot => StatementKind::Shoot,
            Action::PickupAndUse => StatementKind::PickupAndUse,
        }
    }

    pub fn perform(self, agent: &mut dyn Agent) {
        match self {
            Action::Move => agent.move_forward(),
            Action::Turn(rotation) => agent.turn(rotation),
            Action::Shoot => agent.shoot(),
            Action::PickupAndUse => agent.pickup_and_use(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Turn(rotation) => write!(f, "({} {})", self.kind(), rotation),
            _ => write!(f, "({})", self.kind()),
        }
    }
}

// ── Cursor state machines ─────────────────────────────────

/// Cursor of a leaf command.
///
/// `step` → `Ready` → `execute` → `Done`. A parent releases a `Done` leaf
/// back to `Idle` when it moves past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeafState {
    #[default]
    Idle,
    /// Chosen as this tick's target, not yet executed
    Ready,
    /// Executed in the current traversal
    Done,
}

impl LeafState {
    /// Always succeeds: the leaf becomes the active target
    pub fn step(&mut self) -> bool {
        *self = LeafState::Ready;
        true
    }

    /// Returns whether the action may be performed
    pub fn execute(&mut self) -> bool {
        if *self == LeafState::Ready {
            *self = LeafState::Done;
            true
        } else {
            false
        }
    }

    /// Rewinds an executed leaf to `Idle`, returning whether it had executed
    pub fn release(&mut self) -> bool {
        if *self == LeafState::Done {
            *self = LeafState::Idle;
            true
        } else {
            false
        }
    }
}

/// Position of a sequence: 0 is before the first child, `i` means child
/// `i - 1` is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceCursor(usize);

impl SequenceCursor {
    pub fn position(self) -> usize {
        self.0
    }

    /// Index of the current child, if any
    pub fn current(self) -> Option<usize> {
        self.0.checked_sub(1)
    }

    /// Moves to the next child. Running off the end rewinds to before the
    /// first child and returns `false`.
    pub fn advance(&mut self, len: usize) -> bool {
        if self.0 >= len {
            self.0 = 0;
            false
        } else {
            self.0 += 1;
            true
        }
    }
}

/// Branch currently entered by an `if`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Branch {
    #[default]
    None,
    Then,
    Else,
}

impl Branch {
    pub fn select(condition: bool) -> Self {
        if condition {
            Branch::Then
        } else {
            Branch::Else
        }
    }
}

// ── Command nodes ─────────────────────────────────────────

/// A fully constructed command node
#[derive(Debug, Clone)]
pub struct Command {
    id: NodeId,
    /// Smallest id in the subtree, conditions included
    lowest: NodeId,
    node: CommandNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    Primitive(Primitive),
    Sequence(Sequence),
    If(IfCommand),
    While(WhileCommand),
}

/// Leaf command performing a single action
#[derive(Debug, Clone)]
pub struct Primitive {
    action: Action,
    state: LeafState,
}

#[derive(Debug, Clone)]
pub struct Sequence {
    children: Vec<Command>,
    cursor: SequenceCursor,
}

#[derive(Debug, Clone)]
pub struct IfCommand {
    condition: Condition,
    then_branch: Box<Command>,
    else_branch: Box<Command>,
    branch: Branch,
}

#[derive(Debug, Clone)]
pub struct WhileCommand {
    condition: Condition,
    body: Box<Command>,
    iterating: bool,
}

impl Primitive {
    pub fn new(action: Action) -> Self {
        Primitive {
            action,
            state: LeafState::Idle,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn state(&self) -> LeafState {
        self.state
    }

    fn step(&mut self) -> bool {
        self.state.step()
    }

    fn execute(&mut self, agent: &mut dyn Agent) -> Result<Action, ExecutionError> {
        if !self.state.execute() {
            return Err(ExecutionError::NotStepped {
                action: self.action.kind().name(),
            });
        }
        self.action.perform(agent);
        Ok(self.action)
    }
}

impl Sequence {
    pub fn new(children: Vec<Command>) -> Self {
        Sequence {
            children,
            cursor: SequenceCursor::default(),
        }
    }

    pub fn children(&self) -> &[Command] {
        &self.children
    }

    pub fn cursor(&self) -> SequenceCursor {
        self.cursor
    }

    fn current(&self) -> Option<&Command> {
        self.cursor.current().and_then(|i| self.children.get(i))
    }

    fn current_mut(&mut self) -> Option<&mut Command> {
        self.cursor.current().and_then(|i| self.children.get_mut(i))
    }

    fn can_stay_current(&self, agent: &dyn Agent) -> bool {
        self.current()
            .is_some_and(|child| child.can_stay_current(agent))
    }

    fn step(&mut self, agent: &mut dyn Agent) -> bool {
        loop {
            if let Some(child) = self.current_mut() {
                if child.step_current(agent) {
                    return true;
                }
            }
            if !self.cursor.advance(self.children.len()) {
                return false;
            }
        }
    }

    fn execute(&mut self, agent: &mut dyn Agent) -> Result<Action, ExecutionError> {
        self.current_mut()
            .ok_or(ExecutionError::NoCurrentChild)?
            .execute(agent)
    }

    fn reset(&mut self) {
        self.cursor = SequenceCursor::default();
        self.children.iter_mut().for_each(Command::reset);
    }
}

impl IfCommand {
    pub fn new(condition: Condition, then_branch: Command, else_branch: Command) -> Self {
        IfCommand {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            branch: Branch::None,
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn then_branch(&self) -> &Command {
        &self.then_branch
    }

    pub fn else_branch(&self) -> &Command {
        &self.else_branch
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    fn active(&self) -> Option<&Command> {
        match self.branch {
            Branch::None => None,
            Branch::Then => Some(&self.then_branch),
            Branch::Else => Some(&self.else_branch),
        }
    }

    fn active_mut(&mut self) -> Option<&mut Command> {
        match self.branch {
            Branch::None => None,
            Branch::Then => Some(&mut self.then_branch),
            Branch::Else => Some(&mut self.else_branch),
        }
    }

    fn can_stay_current(&self, agent: &dyn Agent) -> bool {
        self.active()
            .is_some_and(|branch| branch.can_stay_current(agent))
    }

    /// The condition is evaluated once per branch selection, not per tick.
    fn step(&mut self, agent: &mut dyn Agent) -> bool {
        if self.branch == Branch::None {
            self.branch = Branch::select(self.condition.evaluate(agent));
        }
        let stepped = match self.active_mut() {
            Some(branch) => branch.step_current(agent),
            None => false,
        };
        if !stepped {
            self.branch = Branch::None;
        }
        stepped
    }

    fn execute(&mut self, agent: &mut dyn Agent) -> Result<Action, ExecutionError> {
        self.active_mut()
            .ok_or(ExecutionError::NoActiveBranch)?
            .execute(agent)
    }

    fn reset(&mut self) {
        self.branch = Branch::None;
        self.then_branch.reset();
        self.else_branch.reset();
    }
}

impl WhileCommand {
    pub fn new(condition: Condition, body: Command) -> Self {
        WhileCommand {
            condition,
            body: Box::new(body),
            iterating: false,
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn body(&self) -> &Command {
        &self.body
    }

    pub fn is_iterating(&self) -> bool {
        self.iterating
    }

    fn can_stay_current(&self, agent: &dyn Agent) -> bool {
        (self.iterating && self.body.can_stay_current(agent)) || self.condition.evaluate(agent)
    }

    /// The body runs to exhaustion before the condition is checked again.
    fn step(&mut self, agent: &mut dyn Agent) -> bool {
        if self.iterating && self.body.step_current(agent) {
            return true;
        }
        self.iterating = self.condition.evaluate(agent) && self.body.step_current(agent);
        self.iterating
    }

    fn execute(&mut self, agent: &mut dyn Agent) -> Result<Action, ExecutionError> {
        if !self.iterating {
            return Err(ExecutionError::NotIterating);
        }
        self.body.execute(agent)
    }

    fn reset(&mut self) {
        self.iterating = false;
        self.body.reset();
    }
}

impl Command {
    pub fn new(node: CommandNode) -> Self {
        Self::with_id(NodeId::fresh(), node)
    }

    pub(crate) fn with_id(id: NodeId, node: CommandNode) -> Self {
        let lowest = match &node {
            CommandNode::Primitive(_) => id,
            CommandNode::Sequence(sequence) => sequence
                .children
                .iter()
                .map(Command::lowest_id)
                .fold(id, NodeId::min),
            CommandNode::If(if_command) => id
                .min(if_command.condition.lowest_id())
                .min(if_command.then_branch.lowest_id())
                .min(if_command.else_branch.lowest_id()),
            CommandNode::While(while_command) => id
                .min(while_command.condition.lowest_id())
                .min(while_command.body.lowest_id()),
        };
        Command { id, lowest, node }
    }

    /// Empty stand-in left in a box whose command was moved out
    fn detached() -> Self {
        Command {
            id: NodeId::DETACHED,
            lowest: NodeId::DETACHED,
            node: CommandNode::Sequence(Sequence::new(Vec::new())),
        }
    }

    pub fn primitive(action: Action) -> Self {
        Self::new(CommandNode::Primitive(Primitive::new(action)))
    }

    pub fn sequence(children: Vec<Command>) -> Self {
        Self::new(CommandNode::Sequence(Sequence::new(children)))
    }

    pub fn if_else(condition: Condition, then_branch: Command, else_branch: Command) -> Self {
        Self::new(CommandNode::If(IfCommand::new(
            condition,
            then_branch,
            else_branch,
        )))
    }

    pub fn while_loop(condition: Condition, body: Command) -> Self {
        Self::new(CommandNode::While(WhileCommand::new(condition, body)))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Smallest id anywhere in the subtree, this node included
    pub fn lowest_id(&self) -> NodeId {
        self.lowest
    }

    pub fn node(&self) -> &CommandNode {
        &self.node
    }

    pub fn kind(&self) -> StatementKind {
        match &self.node {
            CommandNode::Primitive(primitive) => primitive.action.kind(),
            CommandNode::Sequence(_) => StatementKind::Sequence,
            CommandNode::If(_) => StatementKind::If,
            CommandNode::While(_) => StatementKind::While,
        }
    }

    /// Direct children in source order, conditions included
    pub fn children(&self) -> Vec<StatementRef<'_>> {
        match &self.node {
            CommandNode::Primitive(_) => Vec::new(),
            CommandNode::Sequence(sequence) => sequence
                .children
                .iter()
                .map(StatementRef::Command)
                .collect(),
            CommandNode::If(if_command) => vec![
                StatementRef::Condition(&if_command.condition),
                StatementRef::Command(&if_command.then_branch),
                StatementRef::Command(&if_command.else_branch),
            ],
            CommandNode::While(while_command) => vec![
                StatementRef::Condition(&while_command.condition),
                StatementRef::Command(&while_command.body),
            ],
        }
    }

    pub fn contains_as_descendant(&self, id: NodeId) -> bool {
        StatementRef::Command(self).contains_as_descendant(id)
    }

    pub fn to_source_text(&self) -> String {
        self.to_string()
    }

    // ── Tick protocol ─────────────────────────────────────

    pub fn can_stay_current(&self, agent: &dyn Agent) -> bool {
        match &self.node {
            CommandNode::Primitive(_) => false,
            CommandNode::Sequence(sequence) => sequence.can_stay_current(agent),
            CommandNode::If(if_command) => if_command.can_stay_current(agent),
            CommandNode::While(while_command) => while_command.can_stay_current(agent),
        }
    }

    pub fn step(&mut self, agent: &mut dyn Agent) -> bool {
        match &mut self.node {
            CommandNode::Primitive(primitive) => primitive.step(),
            CommandNode::Sequence(sequence) => sequence.step(agent),
            CommandNode::If(if_command) => if_command.step(agent),
            CommandNode::While(while_command) => while_command.step(agent),
        }
    }

    /// Steps this command as the current child of a composite. `false`
    /// tells the parent to move past it.
    fn step_current(&mut self, agent: &mut dyn Agent) -> bool {
        match &mut self.node {
            CommandNode::Primitive(primitive) => !primitive.state.release() && primitive.step(),
            _ => self.step(agent),
        }
    }

    pub fn execute(&mut self, agent: &mut dyn Agent) -> Result<Action, ExecutionError> {
        match &mut self.node {
            CommandNode::Primitive(primitive) => primitive.execute(agent),
            CommandNode::Sequence(sequence) => sequence.execute(agent),
            CommandNode::If(if_command) => if_command.execute(agent),
            CommandNode::While(while_command) => while_command.execute(agent),
        }
    }

    /// Abandons the current traversal: every cursor in the subtree returns
    /// to its initial state.
    pub fn reset(&mut self) {
        match &mut self.node {
            CommandNode::Primitive(primitive) => primitive.state = LeafState::Idle,
            CommandNode::Sequence(sequence) => sequence.reset(),
            CommandNode::If(if_command) => if_command.reset(),
            CommandNode::While(while_command) => while_command.reset(),
        }
    }
}

// ── Drop ──────────────────────────────────────────────────

/// Children are unlinked onto a work list, so dropping a deeply nested
/// program does not recurse once per level.
impl Drop for Command {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.node.detach_children(&mut pending);
        while let Some(mut command) = pending.pop() {
            command.node.detach_children(&mut pending);
        }
    }
}

impl CommandNode {
    fn detach_children(&mut self, out: &mut Vec<Command>) {
        match self {
            CommandNode::Primitive(_) => {}
            CommandNode::Sequence(sequence) => out.append(&mut sequence.children),
            CommandNode::If(if_command) => {
                out.push(mem::replace(&mut *if_command.then_branch, Command::detached()));
                out.push(mem::replace(&mut *if_command.else_branch, Command::detached()));
            }
            CommandNode::While(while_command) => {
                out.push(mem::replace(&mut *while_command.body, Command::detached()));
            }
        }
    }
}

// ── Structural equality ───────────────────────────────────

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children
    }
}

impl PartialEq for IfCommand {
    fn eq(&self, other: &Self) -> bool {
        self.condition == other.condition
            && self.then_branch == other.then_branch
            && self.else_branch == other.else_branch
    }
}

impl PartialEq for WhileCommand {
    fn eq(&self, other: &Self) -> bool {
        self.condition == other.condition && self.body == other.body
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.node {
            CommandNode::Primitive(primitive) => primitive.action.fmt(f),
            CommandNode::Sequence(sequence) => {
                write!(f, "(seq")?;
                for child in &sequence.children {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
            CommandNode::If(if_command) => write!(
                f,
                "(if {} {} {})",
                if_command.condition, if_command.then_branch, if_command.else_branch
            ),
            CommandNode::While(while_command) => write!(
                f,
                "(while {} {})",
                while_command.condition, while_command.body
            ),
        }
    }
}
