use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the planner forwards the untouched user message to a tool.
pub const RAW_USER_INPUT_KEY: &str = "raw_user_input";

/// Confidence reported when no automation rule matched the message.
pub const NO_MATCH_CONFIDENCE: f64 = 0.3;

/// Confidence reported when at least one step was planned.
pub const MATCHED_CONFIDENCE: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool_name: String,
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub reasoning: String,
}

impl PlanStep {
    pub fn raw_user_input(&self) -> Option<&str> {
        self.parameters.get(RAW_USER_INPUT_KEY).and_then(Value::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    pub confidence: f64,
}

impl Plan {
    /// Builds a plan whose confidence is derived from whether anything matched.
    pub fn from_steps(steps: Vec<PlanStep>) -> Self {
        let confidence = if steps.is_empty() { NO_MATCH_CONFIDENCE } else { MATCHED_CONFIDENCE };
        Self { steps, confidence }
    }

    pub fn empty() -> Self {
        Self::from_steps(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{Plan, PlanStep, MATCHED_CONFIDENCE, NO_MATCH_CONFIDENCE, RAW_USER_INPUT_KEY};

    fn step(tool_name: &str) -> PlanStep {
        let mut parameters = Map::new();
        parameters.insert(RAW_USER_INPUT_KEY.to_string(), Value::from("Book a Room"));
        PlanStep {
            tool_name: tool_name.to_string(),
            action: "book_meeting_room".to_string(),
            parameters,
            reasoning: "needs a room".to_string(),
        }
    }

    #[test]
    fn empty_plan_signals_no_automation() {
        let plan = Plan::empty();
        assert!(plan.is_empty());
        assert_eq!(plan.confidence, NO_MATCH_CONFIDENCE);
    }

    #[test]
    fn non_empty_plan_is_fully_confident() {
        let plan = Plan::from_steps(vec![step("calendar")]);
        assert_eq!(plan.confidence, MATCHED_CONFIDENCE);
        assert_eq!(plan.steps[0].raw_user_input(), Some("Book a Room"));
    }

    #[test]
    fn step_parameters_default_when_missing_on_the_wire() {
        let parsed: PlanStep = serde_json::from_value(json!({
            "tool_name": "travel",
            "action": "request_travel",
            "reasoning": "trip"
        }))
        .expect("step should deserialize without parameters");

        assert!(parsed.parameters.is_empty());
        assert_eq!(parsed.raw_user_input(), None);
    }
}
