//! BotScript Core - tick-driven program language for game agents
//!
//! Programs are parenthesized statement trees that drive an agent one
//! primitive action per tick. Execution suspends between ticks and resumes
//! where it left off, with every composite keeping its own cursor.
//!
//! # Architecture
//!
//! ```text
//! Program Text → Tokenizer → Parser (explicit stack) → StatementBuilder → Command
//!                                                                            ↓
//!                                        Normalizer → Canonical Form → SHA-256
//!                                        Verifier   → Warnings
//!                                        Program    → can_stay_current / step / execute
//!                                                        ↓
//!                                                     Executor → RunTrace
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: Same program and agent state always produce the same actions
//! - **Bounded**: A tick performs at most one primitive action
//! - **Sealed**: Only fully constructed statements can be attached or executed
//! - **Canonical**: One normalized text per program; `parse(render(p)) == p`
//!
//! # Example
//!
//! ```
//! use botscript_core::{Action, AgentConfig, Program, ScriptedAgent};
//!
//! let mut program: Program = "(seq (move) (turn clockwise))".parse()?;
//! let mut agent = ScriptedAgent::new(AgentConfig::default());
//! assert_eq!(program.tick(&mut agent)?.action, Some(Action::Move));
//! # Ok::<(), botscript_core::Error>(())
//! ```

pub mod agent;
pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod normalizer;
pub mod parser;
pub mod program;
pub mod verifier;

pub use agent::{Agent, ScriptedAgent};
pub use ast::*;
pub use builder::{Attachment, StatementBuilder};
pub use config::{ActionCosts, AgentConfig, RunConfig};
pub use error::{ConstructionError, Error, ExecutionError, ParseError, Result};
pub use executor::{run_program, Executor, RunReport, RunTrace, StopReason, TickRecord};
pub use program::{Program, Tick};
