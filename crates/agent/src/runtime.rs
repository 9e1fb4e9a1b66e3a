use std::sync::Arc;
use std::time::Duration;

use smartflow_core::config::{AppConfig, McpTransport};
use smartflow_core::domain::chat::{ChatRequest, ChatResponse, InvocationResult};
use smartflow_core::domain::plan::Plan;
use smartflow_core::errors::ApplicationError;
use smartflow_mcp::{
    HttpMcpClient, McpClient, McpTransportError, SimulatedMcpClient, ToolExecutionContext,
    ToolRequest,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::llm::{build_generator, GenerationContext, GenerationError, LanguageGenerator};
use crate::planner::{Planner, RuleBasedPlanner};
use crate::tools::{Tool, ToolRegistry};

const UNASSIGNED_CORRELATION_ID: &str = "unassigned";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("tool `{tool_name}` failed while running `{action}`: {source}")]
    Tool {
        tool_name: String,
        action: String,
        #[source]
        source: McpTransportError,
    },
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("agent runtime misconfigured: {0}")]
    Configuration(String),
}

impl From<AgentError> for ApplicationError {
    fn from(value: AgentError) -> Self {
        match value {
            AgentError::Tool { .. } => Self::Integration(value.to_string()),
            AgentError::Generation(GenerationError::Configuration(message)) => {
                Self::Configuration(message)
            }
            AgentError::Generation(error) => Self::Generation(error.to_string()),
            AgentError::Configuration(message) => Self::Configuration(message),
        }
    }
}

/// Plan, dispatch, aggregate, generate. Holds only immutable shared state,
/// so one instance serves every concurrent request.
#[derive(Clone)]
pub struct AgentRuntime {
    planner: Arc<dyn Planner>,
    generator: Arc<dyn LanguageGenerator>,
    tools: Arc<ToolRegistry>,
    confidence_threshold: f64,
}

impl AgentRuntime {
    pub fn new(
        planner: Arc<dyn Planner>,
        generator: Arc<dyn LanguageGenerator>,
        tools: ToolRegistry,
    ) -> Self {
        Self { planner, generator, tools: Arc::new(tools), confidence_threshold: 0.0 }
    }

    /// Plans scoring below `threshold` are still executed but logged as low confidence.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn is_low_confidence(&self, plan: &Plan) -> bool {
        plan.confidence < self.confidence_threshold
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn generator_backend(&self) -> &'static str {
        self.generator.backend()
    }

    pub async fn handle(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.handle_with_correlation(request, UNASSIGNED_CORRELATION_ID).await
    }

    pub async fn handle_with_correlation(
        &self,
        request: &ChatRequest,
        correlation_id: &str,
    ) -> Result<ChatResponse, AgentError> {
        let plan = self.planner.plan(&request.message).await;
        info!(
            event_name = "agent.plan.created",
            correlation_id = %correlation_id,
            user_id = %request.user_id,
            step_count = plan.steps.len(),
            confidence = plan.confidence,
            "plan created"
        );
        if self.is_low_confidence(&plan) {
            info!(
                event_name = "agent.plan.low_confidence",
                correlation_id = %correlation_id,
                confidence = plan.confidence,
                threshold = self.confidence_threshold,
                "plan confidence below threshold"
            );
        }

        let context = ToolExecutionContext::new(request.user_id.as_str());
        let mut results = Vec::with_capacity(plan.steps.len());

        for step in &plan.steps {
            let Some(tool) = self.tools.get(&step.tool_name) else {
                debug!(
                    event_name = "agent.tool.skipped",
                    correlation_id = %correlation_id,
                    tool_name = %step.tool_name,
                    action = %step.action,
                    "no adapter registered for planned tool"
                );
                continue;
            };

            let tool_request = ToolRequest {
                action: step.action.clone(),
                parameters: step.parameters.clone(),
                context: context.clone(),
            };
            let response = tool.execute(&tool_request).await.map_err(|source| {
                error!(
                    event_name = "agent.tool.failed",
                    correlation_id = %correlation_id,
                    tool_name = %step.tool_name,
                    action = %step.action,
                    error = %source,
                    "tool invocation failed"
                );
                AgentError::Tool {
                    tool_name: step.tool_name.clone(),
                    action: step.action.clone(),
                    source,
                }
            })?;

            info!(
                event_name = "agent.tool.invoked",
                correlation_id = %correlation_id,
                user_id = %context.user_id,
                tool_name = %step.tool_name,
                action = %step.action,
                "tool invoked"
            );
            results.push(InvocationResult {
                tool_name: step.tool_name.clone(),
                action: step.action.clone(),
                payload: response.payload,
                human_readable: response.human_readable,
            });
        }

        let generation_context = GenerationContext::new(&results, &plan);
        let message = self
            .generator
            .generate_response(&request.message, &generation_context)
            .await
            .map_err(|error| {
                warn!(
                    event_name = "agent.response.failed",
                    correlation_id = %correlation_id,
                    backend = self.generator.backend(),
                    error = %error,
                    "response generation failed"
                );
                AgentError::from(error)
            })?;

        info!(
            event_name = "agent.response.generated",
            correlation_id = %correlation_id,
            backend = self.generator.backend(),
            result_count = results.len(),
            "response generated"
        );
        Ok(ChatResponse::new(message, plan, results))
    }
}

/// Wires the default planner, the configured MCP transport and the
/// configured generator into one runtime.
pub fn build_runtime(config: &AppConfig) -> Result<AgentRuntime, AgentError> {
    let client: Arc<dyn McpClient> = match config.mcp.transport {
        McpTransport::Simulated => Arc::new(SimulatedMcpClient),
        McpTransport::Http => {
            let base_url = config.mcp.base_url.as_deref().ok_or_else(|| {
                AgentError::Configuration("mcp.base_url is required for the http transport".into())
            })?;
            let client =
                HttpMcpClient::new(base_url, Duration::from_secs(config.mcp.timeout_secs))
                    .map_err(|error| AgentError::Configuration(error.to_string()))?;
            Arc::new(client)
        }
    };

    let generator = build_generator(&config.llm)?;
    let runtime = AgentRuntime::new(
        Arc::new(RuleBasedPlanner::enterprise_default()),
        generator,
        ToolRegistry::enterprise(client),
    )
    .with_confidence_threshold(config.planner.confidence_threshold);
    Ok(runtime)
}
