use smartflow_agent::RuleBasedPlanner;

use crate::commands::CommandResult;

/// Plans with the default rule table only; no config and no tool calls.
pub fn run(message: &str) -> CommandResult {
    let plan = RuleBasedPlanner::enterprise_default().plan_message(message);
    CommandResult::json("plan", &plan)
}
