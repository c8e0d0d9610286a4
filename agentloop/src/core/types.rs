//! Shared types for the agent loop.
//!
//! These types define the contracts between the orchestrator, its nodes, and
//! the tool harness. They carry no I/O and serialize deterministically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum characters kept in a trajectory entry's `detail`.
pub const TRAJECTORY_DETAIL_LIMIT: usize = 200;

/// Logical phase of a run. `Done` is the terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Plan,
    Retrieve,
    Act,
    Verify,
    Observe,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::Retrieve => "retrieve",
            Phase::Act => "act",
            Phase::Verify => "verify",
            Phase::Observe => "observe",
            Phase::Done => "done",
        }
    }

    /// Whether a node may move the run from `self` to `next`.
    ///
    /// `Verify` never appears as a stored phase: the verify node runs while the
    /// run is already in `Observe` and re-asserts it.
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Plan, Phase::Retrieve)
                | (Phase::Retrieve, Phase::Plan)
                | (Phase::Plan, Phase::Act)
                | (Phase::Plan, Phase::Observe)
                | (Phase::Act, Phase::Plan)
                | (Phase::Observe, Phase::Observe)
                | (Phase::Observe, Phase::Plan)
                | (Phase::Observe, Phase::Done)
        )
    }
}

/// Reasoning-engine capability class chosen by the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[default]
    Fast,
    High,
}

impl ModelTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::High => "high",
        }
    }
}

/// Graph node identifiers, used for step accounting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Router,
    Retriever,
    Plan,
    Act,
    Verify,
    Observe,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Router => "router",
            NodeKind::Retriever => "retriever",
            NodeKind::Plan => "plan",
            NodeKind::Act => "tools",
            NodeKind::Verify => "verify",
            NodeKind::Observe => "observe",
        }
    }
}

/// A structured request, emitted by the reasoning engine, naming an action and
/// its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestedAction {
    /// Engine-assigned call id; action results echo it back.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    System,
    Assistant,
    ActionResult,
}

/// One conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Actions requested by an assistant message. Empty for every other role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<RequestedAction>,
    /// For action results: the id of the action being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    /// For action results: the name of the action being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
}

impl Message {
    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            actions: Vec::new(),
            action_id: None,
            action_name: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    pub fn assistant(text: impl Into<String>, actions: Vec<RequestedAction>) -> Self {
        Self {
            actions,
            ..Self::plain(Role::Assistant, text)
        }
    }

    pub fn action_result(action: &RequestedAction, text: impl Into<String>) -> Self {
        Self {
            action_id: Some(action.id.clone()),
            action_name: Some(action.name.clone()),
            ..Self::plain(Role::ActionResult, text)
        }
    }

    pub fn has_actions(&self) -> bool {
        self.role == Role::Assistant && !self.actions.is_empty()
    }
}

/// Closed result of executing one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// A mutation was confirmed and written.
    Applied(String),
    /// The agent attempted an edit whose precondition did not hold.
    NotApplied(String),
    /// The user vetoed the change at the confirmation gate.
    Rejected(String),
    /// Bad input or an I/O failure local to the action.
    Error(String),
    /// Output of a non-mutating action (search, read, command).
    Info(String),
}

impl ActionOutcome {
    pub fn detail(&self) -> &str {
        match self {
            ActionOutcome::Applied(d)
            | ActionOutcome::NotApplied(d)
            | ActionOutcome::Rejected(d)
            | ActionOutcome::Error(d)
            | ActionOutcome::Info(d) => d,
        }
    }

    /// `(attempted, applied)` contribution to the edit counters.
    ///
    /// A user veto is not an agent failure and counts as neither.
    pub fn edit_counts(&self) -> (u32, u32) {
        match self {
            ActionOutcome::Applied(_) => (1, 1),
            ActionOutcome::NotApplied(_) | ActionOutcome::Error(_) => (1, 0),
            ActionOutcome::Rejected(_) | ActionOutcome::Info(_) => (0, 0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionOutcome::Applied(_) => "applied",
            ActionOutcome::NotApplied(_) => "attempted",
            ActionOutcome::Rejected(_) => "rejected",
            ActionOutcome::Error(_) => "error",
            ActionOutcome::Info(_) => "ok",
        }
    }

    /// Text fed back to the reasoning engine as the action result.
    pub fn render(&self) -> String {
        match self {
            ActionOutcome::Info(text) => text.clone(),
            other => format!("{}: {}", other.label(), other.detail()),
        }
    }
}

/// Outcome of the last verification command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub output: String,
}

/// One audit-trail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    pub phase: Phase,
    pub action: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl TrajectoryEntry {
    /// Stamp a new entry now, clipping `detail` to [`TRAJECTORY_DETAIL_LIMIT`] chars.
    pub fn new(phase: Phase, action: impl Into<String>, detail: impl AsRef<str>) -> Self {
        Self {
            phase,
            action: action.into(),
            detail: clip_chars(detail.as_ref(), TRAJECTORY_DETAIL_LIMIT),
            timestamp: Utc::now(),
        }
    }
}

/// Why the orchestrator stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RunStop {
    /// Observe saw a passing verification.
    Verified,
    /// Observe hit `max_loops` without a passing verification.
    LoopLimit { max_loops: u32 },
    /// The step budget ran out before Observe could finish the run.
    StepBudgetExhausted { steps: u32, budget: u32 },
}

impl RunStop {
    pub fn describe(&self) -> String {
        match self {
            RunStop::Verified => "verification passed".to_string(),
            RunStop::LoopLimit { max_loops } => {
                format!("loop limit reached ({max_loops}) without passing verification")
            }
            RunStop::StepBudgetExhausted { steps, budget } => {
                format!("step budget exhausted after {steps} of {budget} steps")
            }
        }
    }
}

/// Return at most `limit` chars of `text`.
pub fn clip_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
