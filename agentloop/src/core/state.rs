//! Run state and the explicit merge rules nodes use to change it.
//!
//! Nodes never mutate [`RunState`] directly. Each returns a [`StateUpdate`] and
//! the orchestrator merges it with [`RunState::apply`], one rule per field:
//!
//! | field                 | rule                                   |
//! |-----------------------|----------------------------------------|
//! | `conversation`        | append                                 |
//! | `trajectory`          | append                                 |
//! | `phase`               | replace, only along allowed transitions |
//! | `model_tier`          | replace                                |
//! | `context_snippets`    | replace                                |
//! | `verification_result` | replace                                |
//! | `loop_count`          | replace, must be previous + 1          |
//! | `edit_attempts`       | accumulate                             |
//! | `edit_applied`        | accumulate, never above attempts       |
//! | `latency_breakdown`   | accumulate per stage                   |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{
    Message, ModelTier, Phase, RequestedAction, TrajectoryEntry, VerificationResult,
};

/// Latency key for reasoning-engine calls.
pub const MODEL_MS: &str = "model_ms";
/// Latency key for sandboxed verification commands.
pub const SANDBOX_MS: &str = "sandbox_ms";

/// Rejected merge. Every variant is a bug in a node, not a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("illegal phase transition {from:?} -> {to:?}")]
    IllegalTransition { from: Phase, to: Phase },
    #[error("loop_count must advance by one (current {current}, proposed {proposed})")]
    LoopCountSkew { current: u32, proposed: u32 },
    #[error("edit_applied {applied} would exceed edit_attempts {attempts}")]
    EditCountSkew { attempts: u32, applied: u32 },
}

/// Mutable state of one invocation, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    user_request: String,
    workspace_root: PathBuf,
    conversation: Vec<Message>,
    loop_count: u32,
    model_tier: ModelTier,
    phase: Phase,
    context_snippets: Vec<String>,
    verification_result: VerificationResult,
    trajectory: Vec<TrajectoryEntry>,
    edit_attempts: u32,
    edit_applied: u32,
    latency_breakdown: BTreeMap<String, u64>,
}

impl RunState {
    /// Fresh state: counters zeroed, empty logs, `phase = plan`.
    pub fn new(user_request: impl Into<String>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            user_request: user_request.into(),
            workspace_root: workspace_root.into(),
            conversation: Vec::new(),
            loop_count: 0,
            model_tier: ModelTier::default(),
            phase: Phase::Plan,
            context_snippets: Vec::new(),
            verification_result: VerificationResult::default(),
            trajectory: Vec::new(),
            edit_attempts: 0,
            edit_applied: 0,
            latency_breakdown: BTreeMap::new(),
        }
    }

    pub fn user_request(&self) -> &str {
        &self.user_request
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn model_tier(&self) -> ModelTier {
        self.model_tier
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context_snippets(&self) -> &[String] {
        &self.context_snippets
    }

    pub fn verification_result(&self) -> &VerificationResult {
        &self.verification_result
    }

    pub fn trajectory(&self) -> &[TrajectoryEntry] {
        &self.trajectory
    }

    pub fn edit_attempts(&self) -> u32 {
        self.edit_attempts
    }

    pub fn edit_applied(&self) -> u32 {
        self.edit_applied
    }

    pub fn latency_breakdown(&self) -> &BTreeMap<String, u64> {
        &self.latency_breakdown
    }

    /// Actions carried by the latest message, if it is an assistant message.
    pub fn pending_actions(&self) -> &[RequestedAction] {
        match self.conversation.last() {
            Some(msg) if msg.has_actions() => &msg.actions,
            _ => &[],
        }
    }

    /// Merge `update` into the state.
    ///
    /// All checks run before any field changes, so a rejected update leaves the
    /// state untouched.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), StateError> {
        if let Some(to) = update.phase
            && !self.phase.can_transition_to(to)
        {
            return Err(StateError::IllegalTransition {
                from: self.phase,
                to,
            });
        }
        if let Some(proposed) = update.loop_count
            && proposed != self.loop_count + 1
        {
            return Err(StateError::LoopCountSkew {
                current: self.loop_count,
                proposed,
            });
        }
        let attempts = self.edit_attempts + update.edit_attempts_delta;
        let applied = self.edit_applied + update.edit_applied_delta;
        if applied > attempts {
            return Err(StateError::EditCountSkew { attempts, applied });
        }

        self.conversation.extend(update.messages);
        self.trajectory.extend(update.trajectory);
        if let Some(phase) = update.phase {
            self.phase = phase;
        }
        if let Some(tier) = update.model_tier {
            self.model_tier = tier;
        }
        if let Some(snippets) = update.context_snippets {
            self.context_snippets = snippets;
        }
        if let Some(result) = update.verification_result {
            self.verification_result = result;
        }
        if let Some(count) = update.loop_count {
            self.loop_count = count;
        }
        self.edit_attempts = attempts;
        self.edit_applied = applied;
        for (stage, ms) in update.latency_ms {
            *self.latency_breakdown.entry(stage).or_insert(0) += ms;
        }
        Ok(())
    }
}

/// Changes proposed by one node execution. Empty by default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub trajectory: Vec<TrajectoryEntry>,
    pub phase: Option<Phase>,
    pub model_tier: Option<ModelTier>,
    pub context_snippets: Option<Vec<String>>,
    pub verification_result: Option<VerificationResult>,
    pub loop_count: Option<u32>,
    pub edit_attempts_delta: u32,
    pub edit_applied_delta: u32,
    pub latency_ms: BTreeMap<String, u64>,
}

impl StateUpdate {
    pub fn with_phase(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Self::default()
        }
    }

    pub fn record(mut self, entry: TrajectoryEntry) -> Self {
        self.trajectory.push(entry);
        self
    }

    pub fn add_latency(mut self, stage: &str, ms: u64) -> Self {
        *self.latency_ms.entry(stage.to_string()).or_insert(0) += ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RunState {
        RunState::new("do it", "/tmp/ws")
    }

    #[test]
    fn new_state_starts_in_plan_with_zeroed_counters() {
        let state = state();
        assert_eq!(state.phase(), Phase::Plan);
        assert_eq!(state.loop_count(), 0);
        assert_eq!(state.edit_attempts(), 0);
        assert_eq!(state.edit_applied(), 0);
        assert!(state.trajectory().is_empty());
        assert!(state.latency_breakdown().is_empty());
    }

    #[test]
    fn messages_and_trajectory_append() {
        let mut state = state();
        state
            .apply(StateUpdate {
                messages: vec![Message::user("one")],
                ..StateUpdate::with_phase(Phase::Retrieve)
                    .record(TrajectoryEntry::new(Phase::Plan, "a", ""))
            })
            .expect("apply");
        state
            .apply(StateUpdate {
                messages: vec![Message::assistant("two", Vec::new())],
                ..StateUpdate::with_phase(Phase::Plan)
                    .record(TrajectoryEntry::new(Phase::Plan, "b", ""))
            })
            .expect("apply");

        let texts: Vec<&str> = state.conversation().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        let actions: Vec<&str> = state.trajectory().iter().map(|t| t.action.as_str()).collect();
        assert_eq!(actions, vec!["a", "b"]);
    }

    #[test]
    fn latency_accumulates_per_stage() {
        let mut state = state();
        state
            .apply(StateUpdate::default().add_latency(MODEL_MS, 10))
            .expect("apply");
        state
            .apply(
                StateUpdate::default()
                    .add_latency(MODEL_MS, 5)
                    .add_latency(SANDBOX_MS, 7),
            )
            .expect("apply");
        assert_eq!(state.latency_breakdown()[MODEL_MS], 15);
        assert_eq!(state.latency_breakdown()[SANDBOX_MS], 7);
    }

    #[test]
    fn illegal_transition_leaves_state_untouched() {
        let mut state = state();
        let before = state.clone();
        let err = state
            .apply(StateUpdate {
                messages: vec![Message::user("dropped")],
                ..StateUpdate::with_phase(Phase::Done)
            })
            .expect_err("plan -> done is illegal");
        assert_eq!(
            err,
            StateError::IllegalTransition {
                from: Phase::Plan,
                to: Phase::Done
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn loop_count_must_advance_by_one() {
        let mut state = state();
        let err = state
            .apply(StateUpdate {
                loop_count: Some(2),
                ..StateUpdate::default()
            })
            .expect_err("skip");
        assert!(matches!(err, StateError::LoopCountSkew { .. }));

        state
            .apply(StateUpdate {
                loop_count: Some(1),
                ..StateUpdate::default()
            })
            .expect("advance");
        assert_eq!(state.loop_count(), 1);
    }

    #[test]
    fn applied_never_exceeds_attempts() {
        let mut state = state();
        let err = state
            .apply(StateUpdate {
                edit_applied_delta: 1,
                ..StateUpdate::default()
            })
            .expect_err("applied without attempt");
        assert!(matches!(err, StateError::EditCountSkew { .. }));

        state
            .apply(StateUpdate {
                edit_attempts_delta: 2,
                edit_applied_delta: 1,
                ..StateUpdate::default()
            })
            .expect("apply");
        assert_eq!((state.edit_attempts(), state.edit_applied()), (2, 1));
    }

    #[test]
    fn pending_actions_only_from_latest_assistant_message() {
        let mut state = state();
        let action = RequestedAction {
            id: "c1".to_string(),
            name: "grep".to_string(),
            arguments: serde_json::Map::new(),
        };
        state
            .apply(StateUpdate {
                messages: vec![Message::assistant("", vec![action.clone()])],
                ..StateUpdate::default()
            })
            .expect("apply");
        assert_eq!(state.pending_actions().len(), 1);

        state
            .apply(StateUpdate {
                messages: vec![Message::action_result(&action, "done")],
                ..StateUpdate::default()
            })
            .expect("apply");
        assert!(state.pending_actions().is_empty());
    }
}
