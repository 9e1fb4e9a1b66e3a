//! Agent Runtime - planning, tool dispatch, and response generation
//!
//! This crate is the orchestration core of the SmartFlow gateway. For every
//! incoming chat message it:
//! 1. **Plans** (`planner`) - maps the message to ordered tool steps
//! 2. **Dispatches** (`tools`) - runs each step against its registered adapter
//! 3. **Aggregates** (`runtime`) - records results in plan order
//! 4. **Generates** (`llm`) - turns the execution record into a reply
//!
//! # Key Types
//!
//! - `AgentRuntime` - the orchestrator (see `runtime` module)
//! - `Planner` - swappable planning strategy; `RuleBasedPlanner` today
//! - `LanguageGenerator` - swappable reply backend (local template, OpenAI, Ollama)
//! - `ToolRegistry` - immutable name → adapter map shared across requests
//!
//! # Failure Model
//!
//! Steps naming an unregistered tool are skipped. A failing tool call or
//! generation call aborts the whole request; nothing is retried.

pub mod llm;
pub mod planner;
pub mod runtime;
pub mod tools;

pub use llm::{build_generator, GenerationContext, GenerationError, LanguageGenerator};
pub use planner::{Planner, PlannerRule, RuleBasedPlanner};
pub use runtime::{build_runtime, AgentError, AgentRuntime};
pub use tools::{Tool, ToolRegistry};
