//! One-shot model tier selection from the initial request.

use serde::{Deserialize, Serialize};

use crate::core::state::{RunState, StateUpdate};
use crate::core::types::{ModelTier, Phase};

/// Thresholds deciding when a request needs the `high` tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterPolicy {
    /// Case-insensitive token that forces the `high` tier.
    pub complexity_marker: String,
    /// Requests longer than this many chars go to the `high` tier.
    pub length_threshold: usize,
}

impl Default for RouterPolicy {
    fn default() -> Self {
        Self {
            complexity_marker: "complex".to_string(),
            length_threshold: 100,
        }
    }
}

/// Pick a tier from the request text alone.
pub fn route(request: &str, policy: &RouterPolicy) -> ModelTier {
    let request = request.trim();
    let marker = policy.complexity_marker.to_lowercase();
    let marked = !marker.is_empty() && request.to_lowercase().contains(&marker);
    if marked || request.chars().count() > policy.length_threshold {
        ModelTier::High
    } else {
        ModelTier::Fast
    }
}

/// Router node: set the tier and hand over to retrieval.
pub fn route_node(state: &RunState, policy: &RouterPolicy) -> StateUpdate {
    StateUpdate {
        model_tier: Some(route(state.user_request(), policy)),
        ..StateUpdate::with_phase(Phase::Retrieve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_plain_request_is_fast() {
        let policy = RouterPolicy::default();
        assert_eq!(route("rename greet to hello", &policy), ModelTier::Fast);
    }

    #[test]
    fn marker_is_case_insensitive() {
        let policy = RouterPolicy::default();
        assert_eq!(route("A COMPLEX refactor", &policy), ModelTier::High);
    }

    #[test]
    fn length_threshold_is_exclusive() {
        let policy = RouterPolicy::default();
        assert_eq!(route(&"a".repeat(100), &policy), ModelTier::Fast);
        assert_eq!(route(&"a".repeat(101), &policy), ModelTier::High);
    }

    #[test]
    fn route_node_moves_to_retrieve() {
        let state = RunState::new("complex task", "/ws");
        let update = route_node(&state, &RouterPolicy::default());
        assert_eq!(update.phase, Some(Phase::Retrieve));
        assert_eq!(update.model_tier, Some(ModelTier::High));
    }
}
