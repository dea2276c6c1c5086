use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PlanningError, StepStructureError};

// ── Plan ─────────────────────────────────────────────────────────────────────

/// One planned agent invocation, as emitted by the planner.
///
/// Fields are kept as raw JSON so a malformed step survives planning and is
/// rejected by the executor when it is reached. Step numbers may arrive as
/// integers or digit strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

/// A step whose shape has been checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidStep<'a> {
    pub number: u32,
    pub agent: &'a str,
    pub input: &'a Map<String, Value>,
}

impl PlanStep {
    pub fn new(step: u32, agent: &str, input: Value) -> Self {
        Self {
            step: Some(Value::from(step)),
            agent: Some(Value::from(agent)),
            input: Some(input),
        }
    }

    /// The step number, if present, positive and in range.
    pub fn number(&self) -> Option<u32> {
        let number = match self.step.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<u32>().ok(),
            _ => None,
        };
        number.filter(|n| *n > 0)
    }

    /// The agent name, when it is a non-blank string.
    pub fn agent_name(&self) -> Option<&str> {
        self.agent
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// Check the step's shape. `position` is 1-based.
    pub fn validate(&self, position: usize) -> Result<ValidStep<'_>, StepStructureError> {
        let raw = match &self.step {
            None | Some(Value::Null) => {
                return Err(StepStructureError::MissingField {
                    position,
                    field: "step",
                });
            }
            Some(raw) => raw,
        };
        let number = self
            .number()
            .ok_or_else(|| StepStructureError::InvalidStepNumber {
                position,
                value: raw.to_string(),
            })?;

        let agent = match &self.agent {
            None | Some(Value::Null) => None,
            Some(Value::String(_)) => self.agent_name(),
            Some(other) => {
                return Err(StepStructureError::InvalidAgent {
                    position,
                    value: other.to_string(),
                });
            }
        }
        .ok_or(StepStructureError::MissingField {
            position,
            field: "agent",
        })?;

        let input = match &self.input {
            None | Some(Value::Null) => {
                return Err(StepStructureError::MissingField {
                    position,
                    field: "input",
                });
            }
            Some(Value::Object(map)) => map,
            Some(_) => return Err(StepStructureError::InputNotMapping { step: number }),
        };

        Ok(ValidStep {
            number,
            agent,
            input,
        })
    }
}

/// Ordered plan produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Build a plan, rejecting an empty list and duplicate step numbers.
    pub fn new(steps: Vec<PlanStep>) -> Result<Self, PlanningError> {
        if steps.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }
        let mut seen = HashSet::new();
        for number in steps.iter().filter_map(PlanStep::number) {
            if !seen.insert(number) {
                return Err(PlanningError::DuplicateStep(number));
            }
        }
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Highest declared step number; its output is the run's final output.
    pub fn final_step(&self) -> Option<u32> {
        self.steps.iter().filter_map(PlanStep::number).max()
    }
}

// ── Execution state ──────────────────────────────────────────────────────────

/// Run-local map of step outputs, keyed by declared step number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    outputs: BTreeMap<u32, Value>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state key a step's output is stored under.
    pub fn key(step: u32) -> String {
        format!("STEP_{step}_OUTPUT")
    }

    pub fn get(&self, step: u32) -> Option<&Value> {
        self.outputs.get(&step)
    }

    pub fn contains(&self, step: u32) -> bool {
        self.outputs.contains_key(&step)
    }

    pub fn record(&mut self, step: u32, output: Value) {
        self.outputs.insert(step, output);
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Snapshot keyed by `STEP_<N>_OUTPUT`.
    pub fn to_map(&self) -> Map<String, Value> {
        self.outputs
            .iter()
            .map(|(step, value)| (Self::key(*step), value.clone()))
            .collect()
    }
}

impl FromIterator<(u32, Value)> for ExecutionState {
    fn from_iter<I: IntoIterator<Item = (u32, Value)>>(iter: I) -> Self {
        Self {
            outputs: iter.into_iter().collect(),
        }
    }
}
