use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::engine_harness::{
    EventLog, Recorder, ScriptedProvider, default_deps, deps_with, empty_index, plan_json,
};
use context_engine::engine::{AgentRegistry, Engine, TraceStatus};

fn recorder_registry(log: &EventLog) -> AgentRegistry {
    AgentRegistry::builder()
        .register(Recorder::new("Alpha", log).with_delay(Duration::from_millis(15)))
        .register(Recorder::new("Beta", log).with_delay(Duration::from_millis(5)))
        .build()
}

#[tokio::test]
async fn steps_run_strictly_in_sequence() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let plan = plan_json(json!([
        {"step": 1, "agent": "Alpha", "input": {}},
        {"step": 2, "agent": "Beta", "input": {}},
        {"step": 3, "agent": "Alpha", "input": {}}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str()]);
    let deps = deps_with(recorder_registry(&log), provider, empty_index());

    let (_, trace) = Engine::new(deps).run("goal").await;
    assert_eq!(trace.status(), &TraceStatus::Success);

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start Alpha 1",
            "end Alpha 1",
            "start Beta 2",
            "end Beta 2",
            "start Alpha 3",
            "end Alpha 3",
        ]
    );
}

#[tokio::test]
async fn unknown_agent_fails_fast_without_state_write() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let plan = plan_json(json!([
        {"step": 1, "agent": "Alpha", "input": {}},
        {"step": 2, "agent": "Gamma", "input": {}},
        {"step": 3, "agent": "Beta", "input": {"prev": "$$STEP_1_OUTPUT$$"}}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str()]);
    let deps = deps_with(recorder_registry(&log), provider, empty_index());

    let (output, trace) = Engine::new(deps).run("goal").await;

    assert_eq!(output, None);
    assert!(matches!(
        trace.status(),
        TraceStatus::FailedAtStep { step: 2, reason } if reason.contains("Gamma")
    ));
    assert_eq!(trace.steps().len(), 1);
    assert!(log.lock().unwrap().iter().all(|e| !e.contains("Beta")));
}

#[tokio::test]
async fn invalid_plan_is_a_planning_failure() {
    let provider = ScriptedProvider::new(&["definitely not json"]);
    let (output, trace) = Engine::new(default_deps(provider)).run("goal").await;

    assert_eq!(output, None);
    assert!(matches!(trace.status(), TraceStatus::PlanningFailed { .. }));
    assert!(trace.steps().is_empty());
    assert!(trace.is_finalized());
}

#[tokio::test]
async fn agent_input_errors_name_the_step() {
    let plan = plan_json(json!([
        {"step": 5, "agent": "Librarian", "input": {"wrong_key": "x"}}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str()]);
    let (_, trace) = Engine::new(default_deps(provider)).run("goal").await;

    assert!(matches!(
        trace.status(),
        TraceStatus::FailedAtStep { step: 5, reason } if reason.contains("intent_query")
    ));
}

#[tokio::test]
async fn cancellation_stops_the_running_step() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let registry = AgentRegistry::builder()
        .register(Recorder::new("Alpha", &log))
        .register(Recorder::new("Stuck", &log).stalled())
        .build();
    let plan = plan_json(json!([
        {"step": 1, "agent": "Alpha", "input": {}},
        {"step": 2, "agent": "Stuck", "input": {}}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str()]);
    let engine = Engine::new(deps_with(registry, provider, empty_index()));

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let (output, trace) = engine.run_with_cancel("goal", &token).await;

    assert_eq!(output, None);
    assert!(matches!(
        trace.status(),
        TraceStatus::FailedAtStep { step: 2, reason } if reason.contains("cancelled")
    ));
    assert_eq!(trace.steps().len(), 1);
}

#[tokio::test]
async fn run_timeout_bounds_the_whole_run() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let registry = AgentRegistry::builder()
        .register(Recorder::new("Stuck", &log).stalled())
        .build();
    let plan = plan_json(json!([{"step": 1, "agent": "Stuck", "input": {}}]));
    let provider = ScriptedProvider::new(&[plan.as_str()]);
    let deps = deps_with(registry, provider, empty_index())
        .with_run_timeout(Some(Duration::from_millis(40)));

    let (_, trace) = Engine::new(deps).run("goal").await;
    assert!(matches!(
        trace.status(),
        TraceStatus::FailedAtStep { step: 1, reason } if reason.contains("deadline exceeded")
    ));
}
