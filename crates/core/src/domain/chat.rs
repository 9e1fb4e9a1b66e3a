use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::plan::Plan;

/// One prior turn supplied by the caller. Carried through but never consulted by planning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { message: message.into(), user_id: user_id.into(), history: Vec::new() }
    }
}

/// Durable record of one executed tool step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub tool_name: String,
    pub action: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub human_readable: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub plan: Plan,
    #[serde(default)]
    pub mcp_results: Vec<InvocationResult>,
    pub generated_at: DateTime<Utc>,
}

impl ChatResponse {
    pub fn new(message: String, plan: Plan, mcp_results: Vec<InvocationResult>) -> Self {
        Self { message, plan, mcp_results, generated_at: Utc::now() }
    }
}
