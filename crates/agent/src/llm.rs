use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smartflow_core::config::{LlmConfig, LlmProvider};
use smartflow_core::domain::chat::InvocationResult;
use smartflow_core::domain::plan::Plan;
use thiserror::Error;

/// Inserted in place of the step listing when no tool was executed.
pub const NO_EXTERNAL_SYSTEM_PHRASE: &str = "No external system needed, answering directly.";

pub const RESPONSE_TEMPLATE: &str = "You are SmartFlow, an enterprise workflow assistant. \
Summarize for the employee what the automated actions accomplished, in a concise and friendly \
reply. Only report outcomes confirmed by the tool outputs. If no tool ran, answer from general \
knowledge and say that no enterprise system was contacted.";

const GENERATION_TEMPERATURE: f32 = 0.1;

/// One executed step as the generator sees it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutedStep {
    pub tool_name: String,
    pub action: String,
    pub summary: String,
}

/// Everything a generator may draw on besides the user input. `plan` lists
/// executed steps only; `raw_plan` is what the planner proposed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationContext {
    pub plan: Vec<ExecutedStep>,
    pub raw_plan: Plan,
}

impl GenerationContext {
    pub fn new(results: &[InvocationResult], raw_plan: &Plan) -> Self {
        let plan = results
            .iter()
            .map(|result| ExecutedStep {
                tool_name: result.tool_name.clone(),
                action: result.action.clone(),
                summary: result.human_readable.clone(),
            })
            .collect();
        Self { plan, raw_plan: raw_plan.clone() }
    }

    fn numbered_steps(&self) -> String {
        self.plan
            .iter()
            .enumerate()
            .map(|(index, step)| {
                format!("Step {}: {} -> {}", index + 1, step.tool_name, step.summary)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend is misconfigured: {0}")]
    Configuration(String),
    #[error("{backend} request failed: {message}")]
    Request { backend: &'static str, message: String },
    #[error("{backend} returned status {status}: {body}")]
    Status { backend: &'static str, status: u16, body: String },
    #[error("{backend} returned an unusable response: {message}")]
    InvalidResponse { backend: &'static str, message: String },
}

#[async_trait]
pub trait LanguageGenerator: Send + Sync {
    /// Short identifier used in logs.
    fn backend(&self) -> &'static str;

    async fn generate_response(
        &self,
        user_input: &str,
        context: &GenerationContext,
    ) -> Result<String, GenerationError>;
}

/// Deterministic generator for local development; needs no network.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalTemplateGenerator;

impl LocalTemplateGenerator {
    pub fn render(&self, user_input: &str, context: &GenerationContext) -> String {
        let tool_summaries = context
            .plan
            .iter()
            .map(|step| format!("- {}({}): {}", step.tool_name, step.action, step.summary))
            .collect::<Vec<_>>()
            .join("\n");
        let executed = if tool_summaries.is_empty() {
            NO_EXTERNAL_SYSTEM_PHRASE.to_string()
        } else {
            tool_summaries
        };

        format!(
            "Here is what was done automatically for your request:\n\
             User input: {user_input}\n\
             Execution plan: {executed}\n\
             Let me know if you need anything else."
        )
    }
}

#[async_trait]
impl LanguageGenerator for LocalTemplateGenerator {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn generate_response(
        &self,
        user_input: &str,
        context: &GenerationContext,
    ) -> Result<String, GenerationError> {
        Ok(self.render(user_input, context))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: String,
}

/// Hosted completion backend speaking the OpenAI chat-completions API.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiGenerator {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(GenerationError::Configuration(
                "openai provider selected but no api key is configured".to_string(),
            ));
        }
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait]
impl LanguageGenerator for OpenAiGenerator {
    fn backend(&self) -> &'static str {
        "openai"
    }

    async fn generate_response(
        &self,
        user_input: &str,
        context: &GenerationContext,
    ) -> Result<String, GenerationError> {
        let observed = format!("Observed tool outputs:\n{}", context.numbered_steps());
        let body = OpenAiChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: RESPONSE_TEMPLATE },
                ChatMessage { role: "user", content: user_input },
                ChatMessage { role: "assistant", content: &observed },
            ],
            temperature: GENERATION_TEMPERATURE,
        };

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body);
        let parsed: OpenAiChatResponse = send_json(self.backend(), request).await?;

        parsed.choices.into_iter().next().map(|choice| choice.message.content).ok_or_else(|| {
            GenerationError::InvalidResponse {
                backend: self.backend(),
                message: "response contained no choices".to_string(),
            }
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: MessageContent,
}

/// Self-hosted backend talking to an Ollama server.
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[async_trait]
impl LanguageGenerator for OllamaGenerator {
    fn backend(&self) -> &'static str {
        "ollama"
    }

    async fn generate_response(
        &self,
        user_input: &str,
        context: &GenerationContext,
    ) -> Result<String, GenerationError> {
        let request_text = format!("User request: {user_input}");
        let feedback = format!("Tool feedback:\n{}", context.numbered_steps());
        let body = OllamaChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: RESPONSE_TEMPLATE },
                ChatMessage { role: "user", content: &request_text },
                ChatMessage { role: "assistant", content: &feedback },
            ],
            stream: false,
            options: OllamaOptions { temperature: GENERATION_TEMPERATURE },
        };

        let request = self.client.post(&self.endpoint).json(&body);
        let parsed: OllamaChatResponse = send_json(self.backend(), request).await?;
        Ok(parsed.message.content)
    }
}

/// Selects the generator named by `config.provider`. Misconfiguration is
/// reported here, before any request is served.
pub fn build_generator(config: &LlmConfig) -> Result<Arc<dyn LanguageGenerator>, GenerationError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider {
        LlmProvider::Local => Ok(Arc::new(LocalTemplateGenerator)),
        LlmProvider::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                GenerationError::Configuration(
                    "openai provider selected but no api key is configured".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiGenerator::new(
                config.resolved_base_url(),
                config.resolved_model(),
                api_key,
                timeout,
            )?))
        }
        LlmProvider::Ollama => Ok(Arc::new(OllamaGenerator::new(
            config.resolved_base_url(),
            config.resolved_model(),
            timeout,
        )?)),
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| GenerationError::Configuration(error.to_string()))
}

async fn send_json<T: DeserializeOwned>(
    backend: &'static str,
    request: RequestBuilder,
) -> Result<T, GenerationError> {
    let response = request
        .send()
        .await
        .map_err(|error| GenerationError::Request { backend, message: error.to_string() })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Status { backend, status: status.as_u16(), body });
    }

    response
        .json::<T>()
        .await
        .map_err(|error| GenerationError::InvalidResponse { backend, message: error.to_string() })
}
