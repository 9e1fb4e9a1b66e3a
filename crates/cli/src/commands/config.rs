use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use smartflow_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

const UNSET: &str = "<unset>";

struct Field {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(
        key_path: &'static str,
        value: impl Into<String>,
        env_keys: &'static [&'static str],
    ) -> Self {
        Self { key_path, value: value.into(), env_keys }
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec![
        "effective config (source precedence: override > env > file > default):".to_string()
    ];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    CommandResult::rendered(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| UNSET.to_string());

    vec![
        Field::new("app.name", config.app.name.as_str(), &["SMARTFLOW_APP_NAME"]),
        Field::new("app.api_prefix", config.app.api_prefix.as_str(), &["SMARTFLOW_API_PREFIX"]),
        Field::new("llm.provider", config.llm.provider.as_str(), &["SMARTFLOW_LLM_PROVIDER"]),
        Field::new("llm.model", config.llm.resolved_model(), &["SMARTFLOW_LLM_MODEL"]),
        Field::new(
            "llm.base_url",
            config.llm.resolved_base_url(),
            &["SMARTFLOW_LLM_BASE_URL", "SMARTFLOW_OLLAMA_ENDPOINT"],
        ),
        Field::new("llm.api_key", api_key, &["SMARTFLOW_LLM_API_KEY", "SMARTFLOW_OPENAI_API_KEY"]),
        Field::new(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["SMARTFLOW_LLM_TIMEOUT_SECS"],
        ),
        Field::new("mcp.transport", config.mcp.transport.as_str(), &["SMARTFLOW_MCP_TRANSPORT"]),
        Field::new(
            "mcp.base_url",
            config.mcp.base_url.as_deref().unwrap_or(UNSET),
            &["SMARTFLOW_MCP_BASE_URL"],
        ),
        Field::new(
            "mcp.timeout_secs",
            config.mcp.timeout_secs.to_string(),
            &["SMARTFLOW_MCP_TIMEOUT_SECS"],
        ),
        Field::new(
            "planner.confidence_threshold",
            config.planner.confidence_threshold.to_string(),
            &["SMARTFLOW_PLANNER_CONFIDENCE_THRESHOLD"],
        ),
        Field::new(
            "server.bind_address",
            config.server.bind_address.as_str(),
            &["SMARTFLOW_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port.to_string(), &["SMARTFLOW_SERVER_PORT"]),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["SMARTFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.as_str(),
            &["SMARTFLOW_LOGGING_LEVEL", "SMARTFLOW_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["SMARTFLOW_LOGGING_FORMAT", "SMARTFLOW_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("smartflow.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/smartflow.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the vendor prefix (`sk-`) so operators can tell keys apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn redaction_keeps_only_the_prefix() {
        assert_eq!(redact_token("sk-live-abcdef"), "sk-***");
        assert_eq!(redact_token("opaque"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }

    #[test]
    fn nested_key_paths_resolve_in_toml_documents() {
        let doc: toml::Value = "[mcp]\ntransport = \"http\"\n".parse().expect("valid toml");

        assert!(contains_path(&doc, "mcp.transport"));
        assert!(!contains_path(&doc, "mcp.base_url"));
        assert!(!contains_path(&doc, "llm.provider"));
    }
}
