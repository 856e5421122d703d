//! Program verifier — static checks on a parsed program
//!
//! Every parsed program is runnable, so the checks here only warn about
//! constructs that are legal but almost certainly not what the author
//! meant. Diagnostics accumulate instead of stopping at the first one.
//!
//! # Checks
//!
//! 1. **Empty sequence**: a `(seq)` with no children never acts
//! 2. **Stall**: `(while (true) B)` where `B` can never act idles forever
//! 3. **Redundant branch**: an `if` whose branches are structurally identical
//! 4. **Double negation**: `(not (not C))`
//! 5. **Trivial condition**: `(energy-at-least 0)` always holds

use crate::ast::{BoolOp, Command, CommandNode, Condition, ConditionNode, StatementRef};
use crate::error::Error;
use crate::parser::tokenizer::Span;

// ── Verification Result Types ─────────────────────────────

/// Result of program verification, accumulating all diagnostics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VerificationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Result for text that failed to load at all
    pub fn from_error(error: &Error) -> Self {
        let span = match error {
            Error::Parse(parse) => Some(parse.span),
            _ => None,
        };
        let mut result = Self::new();
        result.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            kind: DiagnosticKind::Syntax,
            message: error.to_string(),
            node: None,
            span,
        });
        result
    }

    /// Returns true if no errors were found (warnings are OK)
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns only warning-level diagnostics
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    fn add_warning(&mut self, kind: DiagnosticKind, message: String, node: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            message,
            node: Some(node),
            span: None,
        });
    }
}

/// A single verification diagnostic
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Canonical text of the offending node
    pub node: Option<String>,
    #[serde(skip)]
    pub span: Option<Span>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.node {
            Some(node) => write!(f, "{} [{}] in {}: {}", prefix, self.kind, node, self.message),
            None => write!(f, "{} [{}]: {}", prefix, self.kind, self.message),
        }
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of verification issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Syntax,
    EmptySequence,
    Stall,
    RedundantBranch,
    DoubleNegation,
    TrivialCondition,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticKind::Syntax => write!(f, "syntax"),
            DiagnosticKind::EmptySequence => write!(f, "empty-seq"),
            DiagnosticKind::Stall => write!(f, "stall"),
            DiagnosticKind::RedundantBranch => write!(f, "redundant-branch"),
            DiagnosticKind::DoubleNegation => write!(f, "double-negation"),
            DiagnosticKind::TrivialCondition => write!(f, "trivial-condition"),
        }
    }
}

// ── Public API ────────────────────────────────────────────

/// Verify a parsed program.
///
/// Visits every node once, in source order, and returns all diagnostics.
pub fn verify(root: &Command) -> VerificationResult {
    let mut result = VerificationResult::new();
    let mut pending = vec![StatementRef::Command(root)];
    while let Some(node) = pending.pop() {
        match node {
            StatementRef::Command(command) => check_command(command, &mut result),
            StatementRef::Condition(condition) => check_condition(condition, &mut result),
        }
        let mut children = node.children();
        children.reverse();
        pending.extend(children);
    }
    result
}

/// Whether no traversal of `command` can ever reach a primitive action
pub fn can_never_act(command: &Command) -> bool {
    match command.node() {
        CommandNode::Primitive(_) => false,
        CommandNode::Sequence(sequence) => sequence.children().iter().all(can_never_act),
        CommandNode::If(if_command) => {
            can_never_act(if_command.then_branch()) && can_never_act(if_command.else_branch())
        }
        CommandNode::While(while_command) => can_never_act(while_command.body()),
    }
}

// ── Checks ────────────────────────────────────────────────

fn check_command(command: &Command, result: &mut VerificationResult) {
    match command.node() {
        CommandNode::Sequence(sequence) if sequence.children().is_empty() => {
            result.add_warning(
                DiagnosticKind::EmptySequence,
                "empty sequence never performs an action".into(),
                command.to_source_text(),
            );
        }
        CommandNode::While(while_command)
            if matches!(while_command.condition().node(), ConditionNode::True)
                && can_never_act(while_command.body()) =>
        {
            result.add_warning(
                DiagnosticKind::Stall,
                "loop condition always holds but the body can never act".into(),
                command.to_source_text(),
            );
        }
        CommandNode::If(if_command) if if_command.then_branch() == if_command.else_branch() => {
            result.add_warning(
                DiagnosticKind::RedundantBranch,
                "both branches are identical; the condition has no effect".into(),
                command.to_source_text(),
            );
        }
        _ => {}
    }
}

fn check_condition(condition: &Condition, result: &mut VerificationResult) {
    match condition.node() {
        ConditionNode::Composed(composed) if composed.op() == BoolOp::Not => {
            let doubled = composed.operands().iter().any(|operand| {
                matches!(operand.node(), ConditionNode::Composed(inner) if inner.op() == BoolOp::Not)
            });
            if doubled {
                result.add_warning(
                    DiagnosticKind::DoubleNegation,
                    "negation of a negation".into(),
                    condition.to_string(),
                );
            }
        }
        ConditionNode::EnergyAtLeast(threshold) if *threshold <= 0.0 => {
            result.add_warning(
                DiagnosticKind::TrivialCondition,
                "energy is never negative, so this always holds".into(),
                condition.to_string(),
            );
        }
        _ => {}
    }
}

// ── Tests ─────────────────────────────────────────────────
