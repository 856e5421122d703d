//! Canonical normalizer — converts BotScript text to its canonical form
//!
//! # Pipeline
//!
//! `program text → parse → Command → canonical text → SHA-256`
//!
//! # Guarantees
//!
//! - **Idempotent**: `normalize(normalize(x)) == normalize(x)`
//! - **Deterministic**: same input always produces same output
//! - **Round-trip**: `parse(normalize(x))` is structurally equal to `parse(x)`
//!
//! Case, whitespace and line breaks are not significant, so programs that
//! differ only in layout share one canonical form and one fingerprint.

use sha2::{Digest, Sha256};

use crate::ast::{Command, CommandNode};
use crate::Result;

// ── Public API ─────────────────────────────────────────────

/// Normalize program text to its canonical single-line form
///
/// # Errors
/// Returns `ParseError` for invalid input.
pub fn normalize(text: &str) -> Result<String> {
    let root = crate::parser::parse(text)?;
    Ok(root.to_source_text())
}

/// SHA-256 hex digest of the canonical form of `text`
pub fn fingerprint(text: &str) -> Result<String> {
    let root = crate::parser::parse(text)?;
    Ok(fingerprint_command(&root))
}

/// SHA-256 hex digest of a command's canonical form
pub fn fingerprint_command(command: &Command) -> String {
    let mut hasher = Sha256::new();
    hasher.update(command.to_source_text().as_bytes());
    format!("{:x}", hasher.finalize())
}

// ── Pretty form ───────────────────────────────────────────

/// Multi-line rendering with two-space indentation.
///
/// Conditions stay on the line of the statement that owns them. A composite
/// whose only command child is a leaf stays on one line; any other composite
/// puts each command child on its own line.
pub fn render_pretty(command: &Command) -> String {
    let mut out = String::new();
    write_pretty(&mut out, command, 0);
    out
}

fn write_pretty(out: &mut String, command: &Command, indent: usize) {
    let (head, children): (String, Vec<&Command>) = match command.node() {
        CommandNode::Primitive(_) => {
            out.push_str(&command.to_source_text());
            return;
        }
        CommandNode::Sequence(sequence) => ("(seq".to_string(), sequence.children().iter().collect()),
        CommandNode::If(if_command) => (
            format!("(if {}", if_command.condition()),
            vec![if_command.then_branch(), if_command.else_branch()],
        ),
        CommandNode::While(while_command) => (
            format!("(while {}", while_command.condition()),
            vec![while_command.body()],
        ),
    };

    out.push_str(&head);
    let inline = children.len() <= 1
        && children
            .iter()
            .all(|child| matches!(child.node(), CommandNode::Primitive(_)));
    if inline {
        for child in children {
            out.push(' ');
            out.push_str(&child.to_source_text());
        }
    } else {
        for child in children {
            out.push('\n');
            out.push_str(&" ".repeat(indent + 2));
            write_pretty(out, child, indent + 2);
        }
    }
    out.push(')');
}

// ── Tests ─────────────────────────────────────────────────
