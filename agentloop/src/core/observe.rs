//! Termination policy: the only place a run can reach `done`.

use crate::core::state::{RunState, StateUpdate};
use crate::core::types::{Phase, TrajectoryEntry};

pub const DEFAULT_MAX_LOOPS: u32 = 10;

/// Observe node: count the loop, then stop on a passing verification or when
/// `max_loops` is reached; otherwise go back to planning.
pub fn observe_node(state: &RunState, max_loops: u32) -> StateUpdate {
    let loop_count = state.loop_count() + 1;
    let passed = state.verification_result().passed;
    let next = if passed || loop_count >= max_loops {
        Phase::Done
    } else {
        Phase::Plan
    };
    StateUpdate {
        loop_count: Some(loop_count),
        ..StateUpdate::with_phase(next).record(TrajectoryEntry::new(
            Phase::Observe,
            "decision",
            format!("passed={passed} loop={loop_count}"),
        ))
    }
}
