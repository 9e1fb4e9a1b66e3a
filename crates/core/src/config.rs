use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_LOCAL_MODEL: &str = "local-template";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub app: AppSettings,
    pub llm: LlmConfig,
    pub mcp: McpConfig,
    pub planner: PlannerConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub name: String,
    pub api_prefix: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct McpConfig {
    pub transport: McpTransport,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub confidence_threshold: f64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Local,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpTransport {
    Simulated,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_prefix: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub mcp_transport: Option<McpTransport>,
    pub mcp_base_url: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "C-SmartFlow Agent Gateway".to_string(),
                api_prefix: "/api/v1/agent".to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Local,
                api_key: None,
                base_url: None,
                model: None,
                timeout_secs: 30,
            },
            mcp: McpConfig { transport: McpTransport::Simulated, base_url: None, timeout_secs: 10 },
            planner: PlannerConfig { confidence_threshold: 0.5 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected local|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for McpTransport {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" | "mock" => Ok(Self::Simulated),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::Validation(format!(
                "unsupported mcp transport `{other}` (expected simulated|http)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl McpTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Http => "http",
        }
    }
}

impl LlmConfig {
    /// Model name to request, falling back to the provider's conventional default.
    pub fn resolved_model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) if !model.trim().is_empty() => model.as_str(),
            (_, LlmProvider::Local) => DEFAULT_LOCAL_MODEL,
            (_, LlmProvider::OpenAi) => DEFAULT_OPENAI_MODEL,
            (_, LlmProvider::Ollama) => DEFAULT_OLLAMA_MODEL,
        }
    }

    pub fn resolved_base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(base_url), _) if !base_url.trim().is_empty() => base_url.as_str(),
            (_, LlmProvider::OpenAi) => DEFAULT_OPENAI_BASE_URL,
            (_, LlmProvider::Local | LlmProvider::Ollama) => DEFAULT_OLLAMA_BASE_URL,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("smartflow.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(app) = patch.app {
            if let Some(name) = app.name {
                self.app.name = name;
            }
            if let Some(api_prefix) = app.api_prefix {
                self.app.api_prefix = api_prefix;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = Some(model);
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(mcp) = patch.mcp {
            if let Some(transport) = mcp.transport {
                self.mcp.transport = transport;
            }
            if let Some(base_url) = mcp.base_url {
                self.mcp.base_url = Some(base_url);
            }
            if let Some(timeout_secs) = mcp.timeout_secs {
                self.mcp.timeout_secs = timeout_secs;
            }
        }

        if let Some(planner) = patch.planner {
            if let Some(confidence_threshold) = planner.confidence_threshold {
                self.planner.confidence_threshold = confidence_threshold;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SMARTFLOW_APP_NAME") {
            self.app.name = value;
        }
        if let Some(value) = read_env("SMARTFLOW_API_PREFIX") {
            self.app.api_prefix = value;
        }

        if let Some(value) = read_env("SMARTFLOW_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key =
            read_env("SMARTFLOW_LLM_API_KEY").or_else(|| read_env("SMARTFLOW_OPENAI_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        let base_url =
            read_env("SMARTFLOW_LLM_BASE_URL").or_else(|| read_env("SMARTFLOW_OLLAMA_ENDPOINT"));
        if let Some(value) = base_url {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SMARTFLOW_LLM_MODEL") {
            self.llm.model = Some(value);
        }
        if let Some(value) = read_env("SMARTFLOW_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SMARTFLOW_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SMARTFLOW_MCP_TRANSPORT") {
            self.mcp.transport = value.parse()?;
        }
        if let Some(value) = read_env("SMARTFLOW_MCP_BASE_URL") {
            self.mcp.base_url = Some(value);
        }
        if let Some(value) = read_env("SMARTFLOW_MCP_TIMEOUT_SECS") {
            self.mcp.timeout_secs = parse_u64("SMARTFLOW_MCP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SMARTFLOW_PLANNER_CONFIDENCE_THRESHOLD") {
            self.planner.confidence_threshold =
                parse_f64("SMARTFLOW_PLANNER_CONFIDENCE_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("SMARTFLOW_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SMARTFLOW_SERVER_PORT") {
            self.server.port = parse_u16("SMARTFLOW_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SMARTFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SMARTFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("SMARTFLOW_LOGGING_LEVEL").or_else(|| read_env("SMARTFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SMARTFLOW_LOGGING_FORMAT").or_else(|| read_env("SMARTFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_prefix) = overrides.api_prefix {
            self.app.api_prefix = api_prefix;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = Some(llm_model);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(mcp_transport) = overrides.mcp_transport {
            self.mcp.transport = mcp_transport;
        }
        if let Some(mcp_base_url) = overrides.mcp_base_url {
            self.mcp.base_url = Some(mcp_base_url);
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_app(&self.app)?;
        validate_llm(&self.llm)?;
        validate_mcp(&self.mcp)?;
        validate_planner(&self.planner)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("smartflow.toml"), PathBuf::from("config/smartflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_app(app: &AppSettings) -> Result<(), ConfigError> {
    if app.name.trim().is_empty() {
        return Err(ConfigError::Validation("app.name must not be empty".to_string()));
    }

    let prefix = app.api_prefix.as_str();
    if prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "app.api_prefix must not contain whitespace".to_string(),
        ));
    }
    if !prefix.starts_with('/') || (prefix.len() > 1 && prefix.ends_with('/')) {
        return Err(ConfigError::Validation(
            "app.api_prefix must start with `/` and must not end with `/`".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if let Some(base_url) = &llm.base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if llm.provider == LlmProvider::OpenAi {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for the openai provider (set SMARTFLOW_LLM_API_KEY)"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_mcp(mcp: &McpConfig) -> Result<(), ConfigError> {
    if mcp.timeout_secs == 0 || mcp.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "mcp.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match (&mcp.base_url, mcp.transport) {
        (Some(base_url), _) if !is_http_url(base_url) => Err(ConfigError::Validation(
            "mcp.base_url must start with http:// or https://".to_string(),
        )),
        (None, McpTransport::Http) => Err(ConfigError::Validation(
            "mcp.base_url is required for the http transport".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_planner(planner: &PlannerConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&planner.confidence_threshold) {
        return Err(ConfigError::Validation(
            "planner.confidence_threshold must be in range 0.0..=1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    app: Option<AppPatch>,
    llm: Option<LlmPatch>,
    mcp: Option<McpPatch>,
    planner: Option<PlannerPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AppPatch {
    name: Option<String>,
    api_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct McpPatch {
    transport: Option<McpTransport>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PlannerPatch {
    confidence_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
