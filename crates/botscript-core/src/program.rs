//! Program — a sealed root command plus the per-tick driver
//!
//! A tick runs the three protocol phases on the root in order:
//! `can_stay_current`, `step`, and `execute` when a leaf was found.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::trace;

use crate::agent::Agent;
use crate::ast::{Action, Command};
use crate::builder::StatementBuilder;
use crate::{parser, Error, Result};

/// Outcome of one driver tick
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tick {
    /// Zero-based tick number since the program was created or reset
    pub index: u64,
    /// Whether the previously active leaf reported it could stay current
    pub resumed: bool,
    /// The action performed, or `None` when no leaf could be stepped
    pub action: Option<Action>,
}

/// A runnable program
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    root: Command,
    ticks: u64,
}

impl Program {
    pub fn new(root: Command) -> Self {
        Program { root, ticks: 0 }
    }

    /// Parse program text
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text).map(Program::new)
    }

    /// Seal a hand-built root. Fails unless the builder holds a fully
    /// constructed command.
    pub fn from_builder(builder: StatementBuilder) -> Result<Self> {
        Ok(Program::new(builder.finish_command()?))
    }

    /// Read and parse a program file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        Program::parse(&text)
    }

    /// Write the canonical text, newline terminated
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, format!("{}\n", self.root))
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))
    }

    pub fn root(&self) -> &Command {
        &self.root
    }

    pub fn into_root(self) -> Command {
        self.root
    }

    /// Ticks driven so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance the program by one tick, performing at most one action.
    ///
    /// # Errors
    /// Only a protocol fault inside the tree; a parsed program never
    /// produces one.
    pub fn tick(&mut self, agent: &mut dyn Agent) -> Result<Tick> {
        let index = self.ticks;
        self.ticks += 1;

        let resumed = self.root.can_stay_current(agent);
        let action = if self.root.step(agent) {
            Some(self.root.execute(agent)?)
        } else {
            None
        };

        match action {
            Some(action) => trace!(tick = index, resumed, %action, "tick"),
            None => trace!(tick = index, resumed, "tick idle"),
        }
        Ok(Tick {
            index,
            resumed,
            action,
        })
    }

    /// Abandon the current traversal and restart the tick count
    pub fn reset(&mut self) {
        self.root.reset();
        self.ticks = 0;
    }

    pub fn to_source_text(&self) -> String {
        self.root.to_source_text()
    }
}

impl FromStr for Program {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Program::parse(s)
    }
}

impl From<Command> for Program {
    fn from(root: Command) -> Self {
        Program::new(root)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.root.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedAgent;
    use crate::ast::{Rotation, StatementKind};
    use crate::config::AgentConfig;
    use crate::error::ConstructionError;

    fn agent() -> ScriptedAgent {
        ScriptedAgent::new(AgentConfig::default())
    }

    fn actions(program: &mut Program, agent: &mut ScriptedAgent, ticks: usize) -> Vec<Option<Action>> {
        (0..ticks)
            .map(|_| program.tick(agent).unwrap().action)
            .collect()
    }

    // ── Driving ────────────────────────────────────────

    #[test]
    fn test_one_action_per_tick() {
        let mut program: Program = "(seq (move) (turn clockwise) (shoot))".parse().unwrap();
        let mut agent = agent();
        assert_eq!(
            actions(&mut program, &mut agent, 4),
            vec![
                Some(Action::Move),
                Some(Action::Turn(Rotation::Clockwise)),
                Some(Action::Shoot),
                None,
            ]
        );
        assert_eq!(agent.actions().len(), 3);
        assert_eq!(program.ticks(), 4);
    }

    #[test]
    fn test_move_then_turn_then_nothing() {
        let mut program = Program::parse("(seq (move) (turn clockwise))").unwrap();
        let mut agent = agent();
        assert_eq!(
            actions(&mut program, &mut agent, 3),
            vec![Some(Action::Move), Some(Action::Turn(Rotation::Clockwise)), None]
        );
        assert_eq!(
            agent.actions(),
            &[Action::Move, Action::Turn(Rotation::Clockwise)]
        );
    }

    #[test]
    fn test_huge_energy_threshold_never_steps() {
        let mut program = Program::parse("(while (energy-at-least 1e12) (move))").unwrap();
        let mut agent = agent();
        for _ in 0..5 {
            assert_eq!(program.tick(&mut agent).unwrap().action, None);
        }
        assert!(agent.actions().is_empty());
    }

    #[test]
    fn test_program_restarts_after_idle_tick() {
        let mut program = Program::parse("(seq (move) (shoot))").unwrap();
        let mut agent = agent();
        let trace = actions(&mut program, &mut agent, 6);
        assert_eq!(trace[0..3], trace[3..6]);
    }

    #[test]
    fn test_tick_indices_and_resumed_flag() {
        let mut program = Program::parse("(while (true) (move))").unwrap();
        let mut agent = agent();
        let first = program.tick(&mut agent).unwrap();
        let second = program.tick(&mut agent).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        // a while whose condition holds reports it can stay current
        assert!(first.resumed);
        assert_eq!(second.action, Some(Action::Move));
    }

    #[test]
    fn test_leaf_root_is_not_resumed() {
        let mut program = Program::parse("(shoot)").unwrap();
        let mut agent = agent();
        let tick = program.tick(&mut agent).unwrap();
        assert!(!tick.resumed);
        assert_eq!(tick.action, Some(Action::Shoot));
    }

    #[test]
    fn test_leaf_root_acts_on_every_tick() {
        let mut program = Program::parse("(move)").unwrap();
        let mut agent = agent();
        assert_eq!(
            actions(&mut program, &mut agent, 4),
            vec![Some(Action::Move); 4]
        );
    }

    #[test]
    fn test_reset_abandons_traversal() {
        let mut program = Program::parse("(seq (move) (shoot))").unwrap();
        let mut agent = agent();
        program.tick(&mut agent).unwrap();
        program.reset();
        assert_eq!(program.ticks(), 0);
        assert_eq!(program.tick(&mut agent).unwrap().action, Some(Action::Move));
    }

    #[test]
    fn test_world_changes_between_ticks_are_seen() {
        let mut program = Program::parse("(while (not (wall)) (move))").unwrap();
        let mut agent = agent();
        assert_eq!(program.tick(&mut agent).unwrap().action, Some(Action::Move));
        agent.set_wall_ahead(true);
        assert_eq!(program.tick(&mut agent).unwrap().action, None);
    }

    // ── Construction ───────────────────────────────────

    #[test]
    fn test_from_builder() {
        let mut builder = StatementBuilder::new(StatementKind::Turn);
        builder.attach("counterclockwise".into()).unwrap();
        let program = Program::from_builder(builder).unwrap();
        assert_eq!(program.to_string(), "(turn counterclockwise)");
    }

    #[test]
    fn test_from_builder_rejects_incomplete() {
        let builder = StatementBuilder::new(StatementKind::Turn);
        let err = Program::from_builder(builder).unwrap_err();
        assert!(matches!(
            err,
            Error::Construction(ConstructionError::Incomplete { .. })
        ));
    }

    #[test]
    fn test_from_builder_rejects_condition() {
        let builder = StatementBuilder::new(StatementKind::Wall);
        assert!(Program::from_builder(builder).is_err());
    }

    // ── Files ──────────────────────────────────────────

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("botscript-{}.bot", std::process::id()));
        let program = Program::parse("(IF (wall)\n (turn Clockwise) (move))").unwrap();
        program.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "(if (wall) (turn clockwise) (move))\n");
        let loaded = Program::load(&path).unwrap();
        assert_eq!(loaded, program);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Program::load("/nonexistent/program.bot").unwrap_err();
        assert!(matches!(err, Error::Io(ref msg) if msg.contains("/nonexistent/program.bot")));
    }
}
