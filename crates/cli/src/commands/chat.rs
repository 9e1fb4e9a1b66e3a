use smartflow_agent::{build_runtime, AgentError};
use smartflow_core::config::{AppConfig, LoadOptions};
use smartflow_core::ChatRequest;

use crate::commands::CommandResult;

pub fn run(message: &str, user_id: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let agent = match build_runtime(&config) {
        Ok(agent) => agent,
        Err(error) => {
            return CommandResult::failure("chat", "runtime_assembly", error.to_string(), 3);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let request = ChatRequest::new(message, user_id);
    match runtime.block_on(agent.handle(&request)) {
        Ok(response) => CommandResult::json("chat", &response),
        Err(error @ AgentError::Tool { .. }) => {
            CommandResult::failure("chat", "integration", error.to_string(), 5)
        }
        Err(error) => CommandResult::failure("chat", "generation", error.to_string(), 6),
    }
}
