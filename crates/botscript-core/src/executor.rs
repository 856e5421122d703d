//! Executor — drives a program against an agent and records a run trace
//!
//! The executor owns nothing but the loop: it ticks the program until the
//! configured limit or, when `stop_when_idle` is set, until a tick finds no
//! leaf to step. Every tick is appended to an append-only trace that
//! serializes to JSON.
//!
//! # Determinism
//!
//! No I/O, no randomness, no system time. The same program, configuration
//! and agent state always produce the same trace.

use tracing::info;

use crate::agent::{Agent, ScriptedAgent};
use crate::ast::Action;
use crate::config::RunConfig;
use crate::program::Program;
use crate::Result;

// ── Run trace ─────────────────────────────────────────────

/// One tick of a run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    pub resumed: bool,
    pub action: Option<Action>,
    /// Agent energy once the tick finished, when the agent reports it
    pub energy_after: Option<f64>,
}

/// Append-only record of a run
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct RunTrace {
    pub records: Vec<TickRecord>,
}

impl RunTrace {
    pub fn new() -> Self {
        RunTrace {
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, record: TickRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Actions performed, in order
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.records.iter().filter_map(|record| record.action)
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `max_ticks` ticks were driven
    TickLimit,
    /// A tick found no leaf to step
    Idle,
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    /// Canonical text of the program that ran
    pub program: String,
    pub ticks: u64,
    /// Number of ticks that performed an action
    pub actions: u64,
    pub stop: StopReason,
    pub trace: RunTrace,
}

// ── Executor ──────────────────────────────────────────────

/// Runs a program against an agent under a [`RunConfig`]
pub struct Executor<A: Agent> {
    program: Program,
    agent: A,
    max_ticks: u64,
    stop_when_idle: bool,
    trace: RunTrace,
}

impl<A: Agent> Executor<A> {
    pub fn new(program: Program, agent: A, config: &RunConfig) -> Self {
        Executor {
            program,
            agent,
            max_ticks: config.max_ticks,
            stop_when_idle: config.stop_when_idle,
            trace: RunTrace::new(),
        }
    }

    /// Drive one tick and record it
    pub fn tick(&mut self) -> Result<&TickRecord> {
        let tick = self.program.tick(&mut self.agent)?;
        let index = self.trace.len();
        self.trace.append(TickRecord {
            tick: tick.index,
            resumed: tick.resumed,
            action: tick.action,
            energy_after: self.agent.energy_level(),
        });
        Ok(&self.trace.records[index])
    }

    /// Tick until the limit or, if configured, the first idle tick.
    ///
    /// The trace accumulates across calls; the report's tick and action
    /// counts both cover the whole trace.
    pub fn run(&mut self) -> Result<RunReport> {
        info!(max_ticks = self.max_ticks, "run started");

        let mut stop = StopReason::TickLimit;
        for _ in 0..self.max_ticks {
            let acted = self.tick()?.action.is_some();
            if !acted && self.stop_when_idle {
                stop = StopReason::Idle;
                break;
            }
        }

        let report = RunReport {
            program: self.program.to_source_text(),
            ticks: self.trace.len() as u64,
            actions: self.trace.actions().count() as u64,
            stop,
            trace: self.trace.clone(),
        };
        info!(
            ticks = report.ticks,
            actions = report.actions,
            stop = ?report.stop,
            "run finished"
        );
        Ok(report)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn trace(&self) -> &RunTrace {
        &self.trace
    }

    pub fn into_agent(self) -> A {
        self.agent
    }
}

/// Parse a program and run it against a fresh [`ScriptedAgent`] built from
/// the configuration (convenience function used by the CLI)
///
/// Returns the report together with the agent in its final state.
pub fn run_program(text: &str, config: &RunConfig) -> Result<(RunReport, ScriptedAgent)> {
    let program = Program::parse(text)?;
    let agent = ScriptedAgent::new(config.agent.clone());
    let mut executor = Executor::new(program, agent, config);
    let report = executor.run()?;
    Ok((report, executor.into_agent()))
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Rotation;
    use crate::config::AgentConfig;

    fn config(max_ticks: u64) -> RunConfig {
        RunConfig {
            max_ticks,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_stops_when_idle() {
        let (report, agent) = run_program("(seq (move) (shoot))", &config(10)).unwrap();
        assert_eq!(report.stop, StopReason::Idle);
        assert_eq!(report.ticks, 3);
        assert_eq!(report.actions, 2);
        assert_eq!(agent.actions(), &[Action::Move, Action::Shoot]);
    }

    #[test]
    fn test_tick_limit() {
        let (report, _) = run_program("(while (true) (turn clockwise))", &config(5)).unwrap();
        assert_eq!(report.stop, StopReason::TickLimit);
        assert_eq!(report.ticks, 5);
        assert!(report
            .trace
            .actions()
            .all(|a| a == Action::Turn(Rotation::Clockwise)));
    }

    #[test]
    fn test_keep_running_through_idle_ticks() {
        let config = RunConfig {
            max_ticks: 6,
            stop_when_idle: false,
            ..RunConfig::default()
        };
        let (report, _) = run_program("(seq (move) (shoot))", &config).unwrap();
        assert_eq!(report.stop, StopReason::TickLimit);
        assert_eq!(report.actions, 4);
    }

    #[test]
    fn test_energy_recorded_per_tick() {
        let config = RunConfig {
            agent: AgentConfig {
                energy: 100.0,
                ..AgentConfig::default()
            },
            ..config(10)
        };
        let (report, agent) = run_program("(while (energy-at-least 60) (shoot))", &config).unwrap();
        // 100 -> 50 -> stop, since 50 < 60
        assert_eq!(report.actions, 1);
        assert_eq!(report.trace.records[0].energy_after, Some(50.0));
        assert_eq!(agent.energy(), 50.0);
    }

    #[test]
    fn test_wall_stops_walk() {
        let config = RunConfig {
            agent: AgentConfig {
                wall_after_moves: Some(3),
                ..AgentConfig::default()
            },
            ..config(50)
        };
        let (report, _) = run_program(
            "(while (true) (if (wall) (turn clockwise) (move)))",
            &config,
        )
        .unwrap();
        let first: Vec<Action> = report.trace.actions().take(4).collect();
        assert_eq!(
            first,
            vec![
                Action::Move,
                Action::Move,
                Action::Move,
                Action::Turn(Rotation::Clockwise)
            ]
        );
    }

    #[test]
    fn test_repeated_runs_count_the_whole_trace() {
        let program = Program::parse("(seq (move) (shoot))").unwrap();
        let agent = ScriptedAgent::new(AgentConfig::default());
        let mut executor = Executor::new(program, agent, &config(10));

        let first = executor.run().unwrap();
        assert_eq!((first.ticks, first.actions), (3, 2));
        let second = executor.run().unwrap();
        assert_eq!((second.ticks, second.actions), (6, 4));
        assert_eq!(second.trace.len(), 6);
        assert_eq!(executor.agent().actions().len(), 4);
    }

    #[test]
    fn test_leaf_program_acts_until_tick_limit() {
        let (report, agent) = run_program("(move)", &config(4)).unwrap();
        assert_eq!(report.stop, StopReason::TickLimit);
        assert_eq!(report.actions, 4);
        assert_eq!(agent.actions(), &[Action::Move; 4]);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let (report, _) = run_program("(turn counterclockwise)", &config(3)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stop"], "tick_limit");
        assert_eq!(json["actions"], 3);
        assert_eq!(json["program"], "(turn counterclockwise)");
        assert_eq!(
            json["trace"]["records"][0]["action"]["turn"],
            "counterclockwise"
        );
        let back: RunReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_deterministic_runs() {
        let text = "(while (energy-at-least 20) (seq (move) (if (can-hit-robot) (shoot) (turn clockwise))))";
        let (first, _) = run_program(text, &config(40)).unwrap();
        for _ in 0..10 {
            let (again, _) = run_program(text, &config(40)).unwrap();
            assert_eq!(again, first);
        }
    }
}
