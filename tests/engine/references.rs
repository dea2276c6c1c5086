use std::sync::{Arc, Mutex};

use serde_json::json;

use super::engine_harness::{EventLog, Recorder, ScriptedProvider, deps_with, empty_index, plan_json};
use context_engine::engine::{AgentRegistry, Engine, TraceStatus};

fn echo_engine(plan: &str) -> Engine {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let registry = AgentRegistry::builder()
        .register(Recorder::new("Echo", &log))
        .build();
    Engine::new(deps_with(registry, ScriptedProvider::new(&[plan]), empty_index()))
}

#[tokio::test]
async fn whole_reference_passes_structured_output() {
    let plan = plan_json(json!([
        {"step": 1, "agent": "Echo", "input": {"seed": "alpha"}},
        {"step": 2, "agent": "Echo", "input": {"prior": "$$STEP_1_OUTPUT$$"}}
    ]));
    let (_, trace) = echo_engine(&plan).run("goal").await;

    assert_eq!(trace.status(), &TraceStatus::Success);
    assert_eq!(
        trace.steps()[1].resolved_input,
        json!({"prior": {"summary": "{\"seed\":\"alpha\"}"}})
    );
}

#[tokio::test]
async fn embedded_reference_is_stringified() {
    let plan = plan_json(json!([
        {"step": 1, "agent": "Echo", "input": {"seed": "alpha"}},
        {"step": 2, "agent": "Echo", "input": {"note": "got: $$STEP_1_OUTPUT$$"}}
    ]));
    let (_, trace) = echo_engine(&plan).run("goal").await;

    assert_eq!(
        trace.steps()[1].resolved_input["note"],
        json!("got: {\"summary\":\"{\\\"seed\\\":\\\"alpha\\\"}\"}")
    );
}

#[tokio::test]
async fn forward_reference_is_a_missing_dependency() {
    let plan = plan_json(json!([
        {"step": 1, "agent": "Echo", "input": {"later": ["$$STEP_2_OUTPUT$$"]}},
        {"step": 2, "agent": "Echo", "input": {}}
    ]));
    let (output, trace) = echo_engine(&plan).run("goal").await;

    assert_eq!(output, None);
    assert!(matches!(
        trace.status(),
        TraceStatus::FailedAtStep { step: 1, reason } if reason.contains("$$STEP_2_OUTPUT$$")
    ));
    assert!(trace.steps().is_empty());
}

#[tokio::test]
async fn literal_inputs_reach_the_agent_unchanged() {
    let input = json!({"text": "no refs here", "n": 3, "nested": {"list": [1, "two"]}});
    let plan = plan_json(json!([{"step": 1, "agent": "Echo", "input": input}]));
    let (_, trace) = echo_engine(&plan).run("goal").await;

    assert_eq!(trace.steps()[0].planned_input, input);
    assert_eq!(trace.steps()[0].resolved_input, input);
}
