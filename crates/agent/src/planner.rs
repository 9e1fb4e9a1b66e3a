use async_trait::async_trait;
use serde_json::{Map, Value};
use smartflow_core::domain::plan::{Plan, PlanStep, RAW_USER_INPUT_KEY};
use smartflow_mcp::ToolFamily;
use tracing::debug;

/// Planning strategy. Implementations must be pure functions of the message
/// and their own immutable configuration; planning never fails.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, message: &str) -> Plan;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannerRule {
    pub keywords: Vec<String>,
    pub tool_name: String,
    pub action: String,
    pub reasoning: String,
}

impl PlannerRule {
    pub fn new(
        keywords: &[&str],
        tool_name: impl Into<String>,
        action: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
            tool_name: tool_name.into(),
            action: action.into(),
            reasoning: reasoning.into(),
        }
    }

    /// `lowered` must already be lower-cased.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
    }

    fn normalized(mut self) -> Self {
        self.keywords = self
            .keywords
            .into_iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        self
    }

    fn step_for(&self, message: &str) -> PlanStep {
        let mut parameters = Map::new();
        parameters.insert(RAW_USER_INPUT_KEY.to_string(), Value::from(message));
        PlanStep {
            tool_name: self.tool_name.clone(),
            action: self.action.clone(),
            parameters,
            reasoning: self.reasoning.clone(),
        }
    }
}

/// Keyword planner: every rule whose keywords appear in the message yields
/// one step, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct RuleBasedPlanner {
    rules: Vec<PlannerRule>,
}

impl RuleBasedPlanner {
    /// Keywords are trimmed and lower-cased here, and blank ones are dropped.
    /// A mixed-case keyword therefore still matches, and an empty keyword
    /// never matches every message.
    pub fn new(rules: Vec<PlannerRule>) -> Self {
        Self { rules: rules.into_iter().map(PlannerRule::normalized).collect() }
    }

    /// Rule table for the calendar, timesheet, access and travel systems.
    pub fn enterprise_default() -> Self {
        Self::new(vec![
            PlannerRule::new(
                &["meeting", "room", "会议", "预订"],
                ToolFamily::Calendar.name(),
                "book_meeting_room",
                "The user wants to book a meeting room, which the calendar system handles.",
            ),
            PlannerRule::new(
                &["timesheet", "工时", "填报"],
                ToolFamily::Timesheet.name(),
                "submit_timesheet",
                "The user needs to submit a timesheet, which the timesheet system handles.",
            ),
            PlannerRule::new(
                &["权限", "access", "vpn"],
                ToolFamily::Access.name(),
                "request_access",
                "The user is requesting access, which the access management system must approve.",
            ),
            PlannerRule::new(
                &["差旅", "travel", "机票", "酒店"],
                ToolFamily::Travel.name(),
                "request_travel",
                "The user is starting a travel approval, which the travel system handles.",
            ),
        ])
    }

    pub fn rules(&self) -> &[PlannerRule] {
        &self.rules
    }

    pub fn plan_message(&self, message: &str) -> Plan {
        let lowered = message.to_lowercase();
        let steps: Vec<PlanStep> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(&lowered))
            .inspect(|rule| {
                debug!(
                    event_name = "agent.plan.rule_matched",
                    tool_name = %rule.tool_name,
                    action = %rule.action,
                    "planner rule matched"
                );
            })
            .map(|rule| rule.step_for(message))
            .collect();

        Plan::from_steps(steps)
    }
}

#[async_trait]
impl Planner for RuleBasedPlanner {
    async fn plan(&self, message: &str) -> Plan {
        self.plan_message(message)
    }
}

#[cfg(test)]
mod tests {
    use smartflow_core::domain::plan::{MATCHED_CONFIDENCE, NO_MATCH_CONFIDENCE};

    use super::{Planner, PlannerRule, RuleBasedPlanner};

    #[test]
    fn unmatched_message_yields_empty_low_confidence_plan() {
        let planner = RuleBasedPlanner::enterprise_default();

        for message in ["What is the weather like?", "", "tell me a joke"] {
            let plan = planner.plan_message(message);
            assert!(plan.steps.is_empty(), "`{message}` should not match any rule");
            assert_eq!(plan.confidence, NO_MATCH_CONFIDENCE);
        }
    }

    #[test]
    fn matched_rule_preserves_original_message_case() {
        let planner = RuleBasedPlanner::enterprise_default();
        let message = "Please Submit my TIMESHEET for Friday";

        let plan = planner.plan_message(message);

        assert_eq!(plan.confidence, MATCHED_CONFIDENCE);
        assert_eq!(plan.steps.len(), 1);
        let step = &plan.steps[0];
        assert_eq!(step.tool_name, "timesheet");
        assert_eq!(step.action, "submit_timesheet");
        assert_eq!(step.reasoning, planner.rules()[1].reasoning);
        assert_eq!(step.raw_user_input(), Some(message));
    }

    #[test]
    fn multiple_matches_follow_rule_declaration_order() {
        let planner = RuleBasedPlanner::enterprise_default();

        let plan = planner.plan_message("Need VPN access before my travel and a meeting room");

        let tools: Vec<&str> = plan.steps.iter().map(|step| step.tool_name.as_str()).collect();
        assert_eq!(tools, vec!["calendar", "access", "travel"]);
    }

    #[test]
    fn one_rule_yields_one_step_even_when_several_keywords_hit() {
        let planner = RuleBasedPlanner::enterprise_default();

        let plan = planner.plan_message("meeting room for the offsite");

        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, "book_meeting_room");
    }

    #[test]
    fn non_ascii_keywords_match() {
        let planner = RuleBasedPlanner::enterprise_default();

        let plan = planner.plan_message("帮我预订明天的会议室");

        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool_name, "calendar");
    }

    #[test]
    fn custom_rules_are_case_insensitive_and_skip_blank_keywords() {
        let planner = RuleBasedPlanner::new(vec![PlannerRule::new(
            &["Payroll", "  "],
            "hr",
            "open_ticket",
            "payroll question",
        )]);

        assert!(planner.plan_message("anything at all").steps.is_empty());
        let plan = planner.plan_message("my PAYROLL is wrong");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool_name, "hr");
    }

    #[tokio::test]
    async fn trait_plan_matches_direct_planning() {
        let planner = RuleBasedPlanner::enterprise_default();
        let message = "book flights for travel to Berlin";

        let via_trait = Planner::plan(&planner, message).await;

        assert_eq!(via_trait, planner.plan_message(message));
    }
}
