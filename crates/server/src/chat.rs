use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use smartflow_agent::AgentRuntime;
use smartflow_core::{ApplicationError, ChatRequest, ChatResponse, InterfaceError};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    runtime: AgentRuntime,
}

/// Body returned for every failed chat call. Never carries plan or results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: &'static str,
    pub correlation_id: String,
}

pub fn chat_path(api_prefix: &str) -> String {
    format!("{}/chat", api_prefix.trim_end_matches('/'))
}

pub fn router(api_prefix: &str, runtime: AgentRuntime) -> Router {
    Router::new().route(&chat_path(api_prefix), post(chat)).with_state(ChatState { runtime })
}

pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    let correlation_id = Uuid::new_v4().to_string();

    let Json(request) = payload.map_err(|rejection| {
        warn!(
            event_name = "server.chat.rejected",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "chat request body rejected"
        );
        error_response(
            ApplicationError::InvalidRequest(rejection.body_text())
                .into_interface(correlation_id.as_str()),
        )
    })?;

    info!(
        event_name = "server.chat.received",
        correlation_id = %correlation_id,
        user_id = %request.user_id,
        history_len = request.history.len(),
        "chat request received"
    );

    match state.runtime.handle_with_correlation(&request, &correlation_id).await {
        Ok(response) => Ok(Json(response)),
        Err(error) => {
            warn!(
                event_name = "server.chat.failed",
                correlation_id = %correlation_id,
                user_id = %request.user_id,
                error = %error,
                "chat request failed"
            );
            Err(error_response(ApplicationError::from(error).into_interface(correlation_id)))
        }
    }
}

fn error_response(error: InterfaceError) -> (StatusCode, Json<ErrorBody>) {
    let (status, code) = match &error {
        InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
        }
        InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    let body = ErrorBody {
        error: code,
        message: error.user_message(),
        correlation_id: error.correlation_id().to_string(),
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use smartflow_agent::llm::LocalTemplateGenerator;
    use smartflow_agent::{AgentRuntime, RuleBasedPlanner, ToolRegistry};
    use smartflow_mcp::client::McpPayload;
    use smartflow_mcp::{McpClient, McpTransportError, SimulatedMcpClient};
    use tower::ServiceExt;

    use crate::chat::{chat_path, router};

    struct UnreachableClient;

    #[async_trait]
    impl McpClient for UnreachableClient {
        async fn invoke(
            &self,
            namespace: &str,
            action: &str,
            _payload: &McpPayload,
        ) -> Result<McpPayload, McpTransportError> {
            Err(McpTransportError::Timeout {
                endpoint: format!("http://mcp.test/{namespace}/{action}"),
                timeout_ms: 10_000,
            })
        }
    }

    fn app(client: Arc<dyn McpClient>) -> Router {
        let runtime = AgentRuntime::new(
            Arc::new(RuleBasedPlanner::enterprise_default()),
            Arc::new(LocalTemplateGenerator),
            ToolRegistry::enterprise(client),
        );
        router("/api/v1/agent", runtime)
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/agent/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .expect("request")
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router should respond");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[test]
    fn chat_path_joins_prefix_without_double_slash() {
        assert_eq!(chat_path("/api/v1/agent"), "/api/v1/agent/chat");
        assert_eq!(chat_path("/"), "/chat");
    }

    #[tokio::test]
    async fn chat_returns_plan_results_and_reply() {
        let body = json!({"message": "I need to book a meeting room", "user_id": "u1"});

        let (status, value) =
            send(app(Arc::new(SimulatedMcpClient)), post_json(body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["plan"]["steps"][0]["tool_name"], "calendar");
        assert_eq!(value["plan"]["confidence"], 1.0);
        assert_eq!(value["mcp_results"][0]["payload"]["namespace"], "calendar");
        assert!(value["message"].as_str().is_some_and(|message| !message.is_empty()));
        assert!(value["generated_at"].is_string());
    }

    #[tokio::test]
    async fn tool_failure_returns_service_unavailable_without_partial_results() {
        let body = json!({"message": "book a meeting room", "user_id": "u1"});

        let (status, value) =
            send(app(Arc::new(UnreachableClient)), post_json(body.to_string())).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value["error"], "service_unavailable");
        assert!(value["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(value.get("plan").is_none());
        assert!(value.get("mcp_results").is_none());
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (status, value) = send(app(Arc::new(SimulatedMcpClient)), post_json("{")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "bad_request");
    }

    #[tokio::test]
    async fn missing_user_id_is_a_bad_request() {
        let body = json!({"message": "hello"});

        let (status, _) =
            send(app(Arc::new(SimulatedMcpClient)), post_json(body.to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
