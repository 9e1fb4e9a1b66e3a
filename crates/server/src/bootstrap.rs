use smartflow_agent::{build_runtime, AgentError, AgentRuntime};
use smartflow_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub agent_runtime: AgentRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("agent runtime assembly failed: {0}")]
    Agent(#[from] AgentError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

/// Assembles the runtime from an already loaded config. Any misconfigured
/// backend aborts here, before the listener is bound.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        mcp_transport = config.mcp.transport.as_str(),
        "starting application bootstrap"
    );

    let agent_runtime = build_runtime(&config)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        tool_count = agent_runtime.tools().len(),
        generator = agent_runtime.generator_backend(),
        "agent runtime assembled"
    );

    Ok(Application { config, agent_runtime })
}
