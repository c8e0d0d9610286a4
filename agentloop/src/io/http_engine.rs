//! Engine backed by an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use crate::core::types::{Message, ModelTier, RequestedAction, Role, clip_chars};
use crate::io::config::EngineConfig;
use crate::io::engine::{ActionSpec, EngineError, EngineReply, EngineRequest, ReasoningEngine};

pub struct HttpEngine {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    fast_model: String,
    high_model: String,
}

impl HttpEngine {
    /// Build from config, reading the API key from `api_key_env`.
    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .map_err(|_| anyhow!("environment variable {} is not set", cfg.api_key_env))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            api_key,
            fast_model: cfg.fast_model.clone(),
            high_model: cfg.high_model.clone(),
        })
    }

    fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::High => &self.high_model,
        }
    }
}

impl ReasoningEngine for HttpEngine {
    #[instrument(skip_all, fields(tier = request.tier.as_str(), messages = request.messages.len()))]
    fn invoke(&self, request: &EngineRequest) -> Result<EngineReply, EngineError> {
        let body = build_request_body(self.model(request.tier), request);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|err| EngineError::new(format!("request failed: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| EngineError::new(format!("read response: {err}")))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "engine returned error status");
            return Err(EngineError::new(format!(
                "HTTP {}: {}",
                status.as_u16(),
                clip_chars(&text, 500)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|err| EngineError::new(format!("parse response: {err}")))?;
        let reply = parse_response(parsed);
        debug!(actions = reply.actions.len(), "engine replied");
        Ok(reply)
    }
}

fn build_request_body(model: &str, request: &EngineRequest) -> Value {
    let mut body = json!({
        "model": model,
        "temperature": 0,
        "messages": request.messages.iter().map(message_to_wire).collect::<Vec<_>>(),
    });
    if !request.actions.is_empty() {
        body["tools"] = json!(request.actions.iter().map(action_to_wire).collect::<Vec<_>>());
    }
    body
}

fn message_to_wire(message: &Message) -> Value {
    match message.role {
        Role::System => json!({"role": "system", "content": message.text}),
        Role::User => json!({"role": "user", "content": message.text}),
        Role::Assistant if message.actions.is_empty() => {
            json!({"role": "assistant", "content": message.text})
        }
        Role::Assistant => {
            let calls: Vec<Value> = message
                .actions
                .iter()
                .map(|action| {
                    json!({
                        "id": action.id,
                        "type": "function",
                        "function": {
                            "name": action.name,
                            "arguments": Value::Object(action.arguments.clone()).to_string(),
                        }
                    })
                })
                .collect();
            let content = if message.text.is_empty() {
                Value::Null
            } else {
                json!(message.text)
            };
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        Role::ActionResult => json!({
            "role": "tool",
            "tool_call_id": message.action_id.as_deref().unwrap_or_default(),
            "content": message.text,
        }),
    }
}

fn action_to_wire(action: &ActionSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": action.name,
            "description": action.description,
            "parameters": action.parameters,
        }
    })
}

fn parse_response(response: ChatResponse) -> EngineReply {
    let Some(message) = response.choices.into_iter().next().and_then(|c| c.message) else {
        return EngineReply::default();
    };
    let actions = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = match serde_json::from_str::<Map<String, Value>>(&call.function.arguments)
            {
                Ok(arguments) => arguments,
                Err(err) => {
                    warn!(err = %err, action = %call.function.name, "unparseable action arguments");
                    Map::new()
                }
            };
            RequestedAction {
                id: call.id,
                name: call.function.name,
                arguments,
            }
        })
        .collect();
    EngineReply {
        text: message.content.unwrap_or_default(),
        actions,
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grep_action() -> RequestedAction {
        let mut arguments = Map::new();
        arguments.insert("pattern".to_string(), json!("greet"));
        RequestedAction {
            id: "call_1".to_string(),
            name: "grep".to_string(),
            arguments,
        }
    }

    #[test]
    fn request_body_maps_roles_and_tools() {
        let action = grep_action();
        let request = EngineRequest {
            tier: ModelTier::High,
            messages: vec![
                Message::system("sys"),
                Message::user("do it"),
                Message::assistant("", vec![action.clone()]),
                Message::action_result(&action, "a.py:1: def greet"),
            ],
            actions: vec![ActionSpec {
                name: "grep".to_string(),
                description: "search".to_string(),
                parameters: json!({"type": "object"}),
            }],
        };
        let body = build_request_body("gpt-4o", &request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][2]["content"], Value::Null);
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["name"], "grep");
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["arguments"],
            r#"{"pattern":"greet"}"#
        );
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(body["tools"][0]["type"], "function");
    }

    #[test]
    fn response_tool_calls_become_actions() {
        let raw = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"call_9","type":"function","function":{"name":"read_file","arguments":"{\"file_path\":\"a.py\"}"}}
        ]}}]}"#;
        let reply = parse_response(serde_json::from_str(raw).expect("parse"));
        assert_eq!(reply.text, "");
        assert_eq!(reply.actions.len(), 1);
        assert_eq!(reply.actions[0].id, "call_9");
        assert_eq!(reply.actions[0].arguments["file_path"], "a.py");
    }

    #[test]
    fn response_without_choices_is_empty_reply() {
        let reply = parse_response(serde_json::from_str(r#"{"choices":[]}"#).expect("parse"));
        assert_eq!(reply, EngineReply::default());
    }

    #[test]
    fn missing_api_key_is_reported() {
        let cfg = EngineConfig {
            api_key_env: "AGENTLOOP_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..EngineConfig::default()
        };
        let err = HttpEngine::from_config(&cfg).err().expect("missing key");
        assert!(err.to_string().contains("AGENTLOOP_TEST_KEY_THAT_IS_NOT_SET"));
    }
}
