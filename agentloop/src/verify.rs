//! Verify node: run the fixed verification command in the workspace.

use tracing::{info, instrument};

use crate::core::state::{RunState, SANDBOX_MS, StateUpdate};
use crate::core::types::{Phase, TrajectoryEntry, VerificationResult};
use crate::io::verifier::Verifier;

#[instrument(skip_all, fields(loop_count = state.loop_count()))]
pub fn verify_node<V: Verifier + ?Sized>(state: &RunState, verifier: &V) -> StateUpdate {
    let result = verifier.verify(state.workspace_root());
    info!(passed = result.passed, duration_ms = result.duration_ms, "verification finished");
    StateUpdate {
        verification_result: Some(VerificationResult {
            passed: result.passed,
            output: result.output,
        }),
        ..StateUpdate::with_phase(Phase::Observe)
            .add_latency(SANDBOX_MS, result.duration_ms)
            .record(TrajectoryEntry::new(
                Phase::Verify,
                "run_tests",
                result.passed.to_string(),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sandbox::Sandbox;
    use crate::io::verifier::ShellVerifier;

    fn observing(root: &std::path::Path) -> RunState {
        let mut state = RunState::new("req", root);
        for phase in [Phase::Retrieve, Phase::Plan, Phase::Observe] {
            state.apply(StateUpdate::with_phase(phase)).expect("walk");
        }
        state
    }

    #[test]
    fn records_result_latency_and_trajectory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut state = observing(temp.path());
        let verifier = ShellVerifier::new("echo '1 failed'; exit 1", Sandbox::default());

        state.apply(verify_node(&state, &verifier)).expect("merge");

        assert_eq!(state.phase(), Phase::Observe);
        assert!(!state.verification_result().passed);
        assert_eq!(state.verification_result().output, "1 failed");
        assert!(state.latency_breakdown().contains_key(SANDBOX_MS));
        let last = state.trajectory().last().expect("entry");
        assert_eq!(
            (last.phase, last.action.as_str(), last.detail.as_str()),
            (Phase::Verify, "run_tests", "false")
        );
    }

    #[test]
    fn missing_workspace_is_a_failed_check() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = observing(&temp.path().join("gone"));
        let verifier = ShellVerifier::new("exit 0", Sandbox::default());
        let update = verify_node(&state, &verifier);
        let result = update.verification_result.expect("result");
        assert!(!result.passed);
        assert_eq!(result.output, "cwd does not exist");
    }
}
