use std::sync::Arc;

use serde_json::Value;

use super::types::{Plan, PlanStep};
use crate::error::PlanningError;
use crate::llm::{Provider, ResponseFormat};

/// Turns a goal into a [`Plan`] with one JSON-mode generation call.
pub struct Planner {
    provider: Arc<dyn Provider>,
}

impl Planner {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn system_prompt(capabilities: &str) -> String {
        format!(
            "You are the strategic core of the Context Engine. Analyze the user's high-level GOAL \
             and create a step-by-step EXECUTION PLAN.\n\n\
             AVAILABLE CAPABILITIES\n---\n{capabilities}\n---\nEND CAPABILITIES\n\n{}",
            PlanParser::schema_prompt()
        )
    }

    pub async fn plan(&self, goal: &str, capabilities: &str) -> Result<Plan, PlanningError> {
        tracing::info!(provider = self.provider.name(), "Planner generating execution plan");
        let response = self
            .provider
            .generate(&Self::system_prompt(capabilities), goal, ResponseFormat::Json)
            .await
            .map_err(|e| PlanningError::Generation(format!("{e:#}")))?;

        let plan = PlanParser::parse(&response).inspect_err(|e| {
            tracing::warn!(error = %e, "Planner returned an unusable plan");
        })?;
        tracing::info!(steps = plan.len(), "Planner produced plan");
        Ok(plan)
    }
}

pub struct PlanParser;

impl PlanParser {
    pub fn schema_prompt() -> &'static str {
        concat!(
            "INSTRUCTIONS:\n",
            "1. The output MUST be a single JSON object.\n",
            "2. This JSON object must contain a key named \"plan\".\n",
            "3. The value of the \"plan\" key MUST be a list of objects, where each object represents a step.\n",
            "4. Be strategic. Break down complex goals into distinct steps.\n",
            "5. You MUST use Context Chaining. If a step requires input from a previous step, ",
            "use the format \"$$STEP_N_OUTPUT$$\" as the value.\n\n",
            "EXAMPLE OUTPUT FORMAT:\n",
            "{\n",
            "  \"plan\": [\n",
            "    {\n",
            "      \"step\": 1,\n",
            "      \"agent\": \"AgentName1\",\n",
            "      \"input\": {\"param1\": \"value1\"}\n",
            "    },\n",
            "    {\n",
            "      \"step\": 2,\n",
            "      \"agent\": \"AgentName2\",\n",
            "      \"input\": {\"param2\": \"$$STEP_1_OUTPUT$$\"}\n",
            "    }\n",
            "  ]\n",
            "}\n",
        )
    }

    /// Parse a planner response. Tolerates a code fence or prose around the object.
    pub fn parse(text: &str) -> Result<Plan, PlanningError> {
        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(value) => value,
            Err(direct) => {
                let candidate = Self::extract_json(text)
                    .ok_or_else(|| PlanningError::InvalidJson(direct.to_string()))?;
                serde_json::from_str(candidate)
                    .map_err(|e| PlanningError::InvalidJson(e.to_string()))?
            }
        };

        let Some(Value::Array(raw_steps)) = value.get("plan") else {
            return Err(PlanningError::MissingPlan);
        };

        let steps = raw_steps
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                serde_json::from_value::<PlanStep>(raw.clone())
                    .map_err(|e| PlanningError::InvalidJson(format!("plan entry {}: {e}", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Plan::new(steps)
    }

    pub fn extract_json(text: &str) -> Option<&str> {
        if let Some(start) = text.find("```json") {
            let rest = &text[start + "```json".len()..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate);
                }
            }
        }

        if let Some(start) = text.find("```\n{") {
            let rest = &text[start + "```\n".len()..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate);
                }
            }
        }

        let open = text.find('{')?;
        let close = text.rfind('}')?;
        (close > open).then(|| &text[open..=close])
    }
}
