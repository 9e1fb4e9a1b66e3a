//! Shared domain types, configuration, and error taxonomy for the SmartFlow agent gateway.

pub mod config;
pub mod domain;
pub mod errors;

pub use domain::chat::{ChatMessage, ChatRequest, ChatResponse, InvocationResult};
pub use domain::plan::{Plan, PlanStep, NO_MATCH_CONFIDENCE, RAW_USER_INPUT_KEY};
pub use errors::{ApplicationError, InterfaceError};
