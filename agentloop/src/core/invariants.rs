//! Run-level invariants checked after every orchestrated run.

use crate::core::state::RunState;
use crate::core::types::Phase;

/// Check invariants that the merge rules alone cannot guarantee:
/// - `edit_applied <= edit_attempts`
/// - `loop_count <= max_loops`
/// - one Observe trajectory entry per counted loop
/// - trajectory timestamps never go backwards
pub fn validate_run_invariants(state: &RunState, max_loops: u32) -> Vec<String> {
    let mut errors = Vec::new();

    if state.edit_applied() > state.edit_attempts() {
        errors.push(format!(
            "edit_applied {} exceeds edit_attempts {}",
            state.edit_applied(),
            state.edit_attempts()
        ));
    }

    if state.loop_count() > max_loops {
        errors.push(format!(
            "loop_count {} exceeds max_loops {}",
            state.loop_count(),
            max_loops
        ));
    }

    let observed = state
        .trajectory()
        .iter()
        .filter(|entry| entry.phase == Phase::Observe)
        .count();
    if observed != state.loop_count() as usize {
        errors.push(format!(
            "{} observe entries recorded for loop_count {}",
            observed,
            state.loop_count()
        ));
    }

    if !state
        .trajectory()
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    {
        errors.push("trajectory timestamps are not chronological".to_string());
    }

    errors
}
