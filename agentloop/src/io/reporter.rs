//! Product output: state transitions, run summary and trajectory table.
//!
//! Diagnostics go through `tracing`; everything the user is meant to read goes
//! through a [`Reporter`] injected into the orchestrator.

use std::cell::RefCell;
use std::io::Write;

use colored::Colorize;
use tracing::warn;

use crate::core::metrics::edit_accuracy;
use crate::core::state::RunState;
use crate::core::types::{NodeKind, RunStop, TrajectoryEntry, clip_chars};

/// Trajectory rows printed after a run.
pub const DEFAULT_TRAJECTORY_ROWS: usize = 15;
const DETAIL_COLUMN_CHARS: usize = 40;

pub trait Reporter {
    /// Called when `node` is about to run against `state`.
    fn state_transition(&self, node: NodeKind, state: &RunState);
    fn summary(&self, state: &RunState, stop: &RunStop);
    fn trajectory(&self, entries: &[TrajectoryEntry]);
}

impl<T: Reporter + ?Sized> Reporter for Box<T> {
    fn state_transition(&self, node: NodeKind, state: &RunState) {
        (**self).state_transition(node, state)
    }

    fn summary(&self, state: &RunState, stop: &RunStop) {
        (**self).summary(state, stop)
    }

    fn trajectory(&self, entries: &[TrajectoryEntry]) {
        (**self).trajectory(entries)
    }
}

/// Summary rows as `(metric, value)` pairs, in display order.
pub fn summary_rows(state: &RunState, stop: &RunStop) -> Vec<(String, String)> {
    let mut rows = vec![
        ("Stop reason".to_string(), stop.describe()),
        ("Edit attempts".to_string(), state.edit_attempts().to_string()),
        ("Edit applied".to_string(), state.edit_applied().to_string()),
    ];
    if let Some(accuracy) = edit_accuracy(state.edit_attempts(), state.edit_applied()) {
        rows.push(("Edit accuracy".to_string(), format!("{accuracy:.0}%")));
    }
    for (stage, ms) in state.latency_breakdown() {
        rows.push((format!("Latency {stage}"), format!("{ms}ms")));
    }
    rows.push(("Loop count".to_string(), state.loop_count().to_string()));
    rows.push((
        "Trajectory steps".to_string(),
        state.trajectory().len().to_string(),
    ));
    rows
}

/// Writes colored tables to a terminal-like writer.
pub struct ConsoleReporter<W> {
    out: RefCell<W>,
    trajectory_rows: usize,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            trajectory_rows: DEFAULT_TRAJECTORY_ROWS,
        }
    }

    pub fn with_trajectory_rows(mut self, rows: usize) -> Self {
        self.trajectory_rows = rows;
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.borrow_mut();
        if let Err(err) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            warn!(err = %err, "failed to write report");
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn state_transition(&self, node: NodeKind, state: &RunState) {
        self.emit(&format!(
            "{} {}  {} {}  {} {}",
            "node:".bold(),
            node.as_str().blue(),
            "phase:".bold(),
            state.phase().as_str(),
            "loop:".bold(),
            state.loop_count()
        ));
    }

    fn summary(&self, state: &RunState, stop: &RunStop) {
        let rows = summary_rows(state, stop);
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut text = format!("\n{}\n", "Run Summary".green().bold());
        for (metric, value) in rows {
            text.push_str(&format!(
                "  {}  {}\n",
                format!("{metric:<width$}").cyan(),
                value.green()
            ));
        }
        self.emit(text.trim_end());
    }

    fn trajectory(&self, entries: &[TrajectoryEntry]) {
        if entries.is_empty() {
            return;
        }
        let start = entries.len().saturating_sub(self.trajectory_rows);
        let mut text = format!("\n{}\n", "Trajectory (last steps)".bold());
        text.push_str(&format!(
            "  {:<8} {:<16} {}\n",
            "Phase".bold(),
            "Action".bold(),
            "Detail".bold()
        ));
        for entry in &entries[start..] {
            text.push_str(&format!(
                "  {} {} {}\n",
                format!("{:<8}", entry.phase.as_str()).cyan(),
                format!("{:<16}", entry.action).green(),
                clip_chars(&entry.detail, DETAIL_COLUMN_CHARS).dimmed()
            ));
        }
        self.emit(text.trim_end());
    }
}
