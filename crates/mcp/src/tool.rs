use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::client::{McpClient, McpPayload, McpTransportError};

/// Payload key carrying the caller identity on every outbound call.
pub const USER_ID_KEY: &str = "user_id";

/// Caller identity propagated unchanged into every tool call of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolExecutionContext {
    pub user_id: String,
}

impl ToolExecutionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolRequest {
    pub action: String,
    pub parameters: McpPayload,
    pub context: ToolExecutionContext,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolResponse {
    pub payload: McpPayload,
    pub human_readable: String,
}

impl ToolResponse {
    /// Normalizes a raw service response. A missing or mistyped `result`
    /// becomes an empty object and a missing `summary` an empty string.
    pub fn from_raw(mut raw: McpPayload) -> Self {
        let payload = match raw.remove("result") {
            Some(Value::Object(result)) => result,
            _ => Map::new(),
        };
        let human_readable = match raw.remove("summary") {
            Some(Value::String(summary)) => summary,
            _ => String::new(),
        };
        Self { payload, human_readable }
    }
}

/// The enterprise systems the agent knows how to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolFamily {
    Calendar,
    Timesheet,
    Access,
    Travel,
}

impl ToolFamily {
    pub const ALL: [ToolFamily; 4] = [Self::Calendar, Self::Timesheet, Self::Access, Self::Travel];

    /// Name the planner uses to address this family.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Timesheet => "timesheet",
            Self::Access => "access",
            Self::Travel => "travel",
        }
    }

    /// Namespace of the remote service.
    pub fn namespace(&self) -> &'static str {
        self.name()
    }
}

impl fmt::Display for ToolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Adapter binding one tool name and namespace to an `McpClient`.
#[derive(Clone)]
pub struct McpTool {
    name: String,
    namespace: String,
    client: Arc<dyn McpClient>,
}

impl fmt::Debug for McpTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpTool")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl McpTool {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        client: Arc<dyn McpClient>,
    ) -> Self {
        Self { name: name.into(), namespace: namespace.into(), client }
    }

    pub fn for_family(family: ToolFamily, client: Arc<dyn McpClient>) -> Self {
        Self::new(family.name(), family.namespace(), client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn execute(&self, request: &ToolRequest) -> Result<ToolResponse, McpTransportError> {
        let mut payload = request.parameters.clone();
        payload.insert(USER_ID_KEY.to_string(), Value::from(request.context.user_id.as_str()));

        let raw = self.client.invoke(&self.namespace, &request.action, &payload).await?;
        Ok(ToolResponse::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    use super::{McpTool, ToolExecutionContext, ToolFamily, ToolRequest, ToolResponse};
    use crate::client::{McpClient, McpPayload, McpTransportError, SimulatedMcpClient};

    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(String, String, McpPayload)>>,
        response: McpPayload,
    }

    #[async_trait]
    impl McpClient for RecordingClient {
        async fn invoke(
            &self,
            namespace: &str,
            action: &str,
            payload: &McpPayload,
        ) -> Result<McpPayload, McpTransportError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((namespace.to_string(), action.to_string(), payload.clone()));
            }
            Ok(self.response.clone())
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(object) => object,
            _ => Map::new(),
        }
    }

    fn request(parameters: Map<String, Value>, user_id: &str) -> ToolRequest {
        ToolRequest {
            action: "request_access".to_string(),
            parameters,
            context: ToolExecutionContext::new(user_id),
        }
    }

    #[tokio::test]
    async fn execute_injects_user_id_for_empty_parameters() {
        let client = Arc::new(RecordingClient::default());
        let tool = McpTool::for_family(ToolFamily::Access, client.clone());

        tool.execute(&request(Map::new(), "u-empty")).await.expect("call should succeed");

        let calls = client.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "access");
        assert_eq!(calls[0].1, "request_access");
        assert_eq!(calls[0].2, object(json!({"user_id": "u-empty"})));
    }

    #[tokio::test]
    async fn execute_merges_parameters_and_context_identity_wins() {
        let client = Arc::new(RecordingClient::default());
        let tool = McpTool::for_family(ToolFamily::Access, client.clone());

        let parameters = object(json!({"raw_user_input": "VPN please", "user_id": "spoofed"}));
        tool.execute(&request(parameters, "u7")).await.expect("call should succeed");

        let calls = client.calls.lock().expect("calls lock");
        assert_eq!(calls[0].2["raw_user_input"], "VPN please");
        assert_eq!(calls[0].2["user_id"], "u7");
    }

    #[tokio::test]
    async fn execute_defaults_missing_result_and_summary() {
        let client = Arc::new(RecordingClient {
            response: object(json!({"status": "accepted"})),
            ..RecordingClient::default()
        });
        let tool = McpTool::for_family(ToolFamily::Travel, client);

        let response = tool.execute(&request(Map::new(), "u1")).await.expect("call should succeed");

        assert_eq!(response, ToolResponse::default());
    }

    #[test]
    fn from_raw_ignores_mistyped_fields() {
        let response = ToolResponse::from_raw(object(json!({"result": [1, 2], "summary": 42})));
        assert!(response.payload.is_empty());
        assert!(response.human_readable.is_empty());
    }

    #[tokio::test]
    async fn simulated_round_trip_through_adapter() {
        let tool = McpTool::for_family(ToolFamily::Calendar, Arc::new(SimulatedMcpClient));

        let response = tool
            .execute(&ToolRequest {
                action: "book_meeting_room".to_string(),
                parameters: object(json!({"raw_user_input": "Book a room"})),
                context: ToolExecutionContext::new("u1"),
            })
            .await
            .expect("simulated call should succeed");

        assert_eq!(response.payload["namespace"], "calendar");
        assert_eq!(response.payload["payload"]["user_id"], "u1");
        assert!(response.human_readable.contains("calendar.book_meeting_room"));
    }

    #[test]
    fn families_share_name_and_namespace() {
        let names: Vec<&str> = ToolFamily::ALL.iter().map(ToolFamily::name).collect();
        assert_eq!(names, vec!["calendar", "timesheet", "access", "travel"]);
        assert!(ToolFamily::ALL.iter().all(|family| family.name() == family.namespace()));
    }
}
