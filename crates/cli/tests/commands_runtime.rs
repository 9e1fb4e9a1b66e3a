use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use smartflow_cli::commands::{chat, config, plan};

#[test]
fn plan_prints_matched_steps_as_json() {
    let result = plan::run("Please book a meeting room and submit my timesheet");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["confidence"], 1.0);
    assert_eq!(payload["steps"][0]["tool_name"], "calendar");
    assert_eq!(payload["steps"][1]["tool_name"], "timesheet");
    assert_eq!(
        payload["steps"][1]["parameters"]["raw_user_input"],
        "Please book a meeting room and submit my timesheet"
    );
}

#[test]
fn plan_without_match_prints_empty_low_confidence_plan() {
    let result = plan::run("how are you?");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["steps"], serde_json::json!([]));
    assert_eq!(payload["confidence"], 0.3);
}

#[test]
fn chat_runs_pipeline_with_simulated_defaults() {
    with_env(&[], || {
        let result = chat::run("I need to book a meeting room", "u1");
        assert_eq!(result.exit_code, 0, "expected successful chat: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["plan"]["steps"][0]["action"], "book_meeting_room");
        assert_eq!(payload["mcp_results"][0]["payload"]["payload"]["user_id"], "u1");
        assert!(payload["message"].as_str().is_some_and(|message| message.contains("calendar")));
    });
}

#[test]
fn chat_returns_config_failure_for_openai_without_key() {
    with_env(&[("SMARTFLOW_LLM_PROVIDER", "openai")], || {
        let result = chat::run("hello", "u1");
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "chat");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn chat_reports_integration_failure_when_tool_service_is_unreachable() {
    with_env(
        &[
            ("SMARTFLOW_MCP_TRANSPORT", "http"),
            ("SMARTFLOW_MCP_BASE_URL", "http://127.0.0.1:9"),
            ("SMARTFLOW_MCP_TIMEOUT_SECS", "1"),
        ],
        || {
            let result = chat::run("request vpn access", "u1");
            assert_eq!(result.exit_code, 5, "expected integration failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "integration");
            assert!(payload["message"].as_str().is_some_and(|message| message.contains("access")));
        },
    );
}

#[test]
fn chat_without_tool_match_needs_no_tool_service() {
    with_env(
        &[("SMARTFLOW_MCP_TRANSPORT", "http"), ("SMARTFLOW_MCP_BASE_URL", "http://127.0.0.1:9")],
        || {
            let result = chat::run("what is the weather like?", "u1");
            assert_eq!(result.exit_code, 0, "expected success without tool calls");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["mcp_results"], serde_json::json!([]));
        },
    );
}

#[test]
fn config_attributes_env_sources_and_redacts_api_key() {
    with_env(
        &[
            ("SMARTFLOW_LLM_PROVIDER", "openai"),
            ("SMARTFLOW_OPENAI_API_KEY", "sk-very-secret-value"),
            ("SMARTFLOW_SERVER_PORT", "9100"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config output: {}", result.output);

            let output = &result.output;
            assert!(
                output.contains("- llm.provider = openai (source: env (SMARTFLOW_LLM_PROVIDER))")
            );
            assert!(output
                .contains("- llm.api_key = sk-*** (source: env (SMARTFLOW_OPENAI_API_KEY))"));
            assert!(output.contains("- server.port = 9100 (source: env (SMARTFLOW_SERVER_PORT))"));
            assert!(output.contains("- llm.model = gpt-4o-mini (source: default)"));
            assert!(!output.contains("very-secret-value"));
        },
    );
}

#[test]
fn config_returns_failure_for_invalid_env_value() {
    with_env(&[("SMARTFLOW_SERVER_PORT", "not-a-port")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SMARTFLOW_APP_NAME",
        "SMARTFLOW_API_PREFIX",
        "SMARTFLOW_LLM_PROVIDER",
        "SMARTFLOW_LLM_API_KEY",
        "SMARTFLOW_OPENAI_API_KEY",
        "SMARTFLOW_LLM_BASE_URL",
        "SMARTFLOW_OLLAMA_ENDPOINT",
        "SMARTFLOW_LLM_MODEL",
        "SMARTFLOW_LLM_TIMEOUT_SECS",
        "SMARTFLOW_MCP_TRANSPORT",
        "SMARTFLOW_MCP_BASE_URL",
        "SMARTFLOW_MCP_TIMEOUT_SECS",
        "SMARTFLOW_PLANNER_CONFIDENCE_THRESHOLD",
        "SMARTFLOW_SERVER_BIND_ADDRESS",
        "SMARTFLOW_SERVER_PORT",
        "SMARTFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SMARTFLOW_LOGGING_LEVEL",
        "SMARTFLOW_LOGGING_FORMAT",
        "SMARTFLOW_LOG_LEVEL",
        "SMARTFLOW_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
