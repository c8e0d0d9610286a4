//! Reasoning-engine abstraction.
//!
//! The [`ReasoningEngine`] trait decouples the plan node from the model
//! backend. Tests use scripted engines that return queued replies without any
//! network or process I/O.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::types::{Message, ModelTier, RequestedAction};

/// An action the engine may request, described by a JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One engine invocation: the system message first, then the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineRequest {
    pub tier: ModelTier,
    pub messages: Vec<Message>,
    pub actions: Vec<ActionSpec>,
}

/// Engine reply: free text and/or requested actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineReply {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub actions: Vec<RequestedAction>,
}

impl EngineReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn actions(actions: Vec<RequestedAction>) -> Self {
        Self {
            text: String::new(),
            actions,
        }
    }
}

/// Transport failure talking to the engine. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("reasoning engine failed: {message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait ReasoningEngine {
    fn invoke(&self, request: &EngineRequest) -> Result<EngineReply, EngineError>;
}

impl<T: ReasoningEngine + ?Sized> ReasoningEngine for Box<T> {
    fn invoke(&self, request: &EngineRequest) -> Result<EngineReply, EngineError> {
        (**self).invoke(request)
    }
}
