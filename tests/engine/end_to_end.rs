use std::sync::Arc;

use serde_json::json;

use super::engine_harness::{ScriptedProvider, WordEmbedding, default_deps, deps_with, plan_json};
use context_engine::engine::{AgentRegistry, Engine, TraceStatus, run_engine};
use context_engine::llm::ResponseFormat;
use context_engine::search::{CorpusDocument, InMemoryIndex};

#[tokio::test]
async fn summarize_then_write() {
    let long_text = "The tide rises twice a day because of the moon. ".repeat(40);
    let plan = plan_json(json!([
        {"step": 1, "agent": "Summarizer", "input": {
            "text_to_summarize": long_text,
            "summary_objective": "explain tides in one line"
        }},
        {"step": 2, "agent": "Writer", "input": {
            "blueprint": "{\"tone\": \"playful\"}",
            "previous_content": "$$STEP_1_OUTPUT$$"
        }}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str(), "Moon pulls water.", "Splashy tide poem."]);
    let deps = default_deps(provider.clone());

    let (output, trace) = run_engine("Explain tides playfully", &deps).await;

    assert_eq!(output, Some(json!({"report": "Splashy tide poem."})));
    assert_eq!(trace.status(), &TraceStatus::Success);
    assert_eq!(trace.final_output(), output.as_ref());
    assert_eq!(trace.plan().map(|p| p.len()), Some(2));

    let steps = trace.steps();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].agent, "Summarizer");
    assert!(steps[0].tokens_saved > 0);
    assert_eq!(steps[1].tokens_saved, 0);
    assert_eq!(
        steps[1].planned_input["previous_content"],
        json!("$$STEP_1_OUTPUT$$")
    );
    assert_eq!(
        steps[1].resolved_input["previous_content"],
        json!({"summary": "Moon pulls water."})
    );

    let prompts = provider.user_prompts();
    assert_eq!(prompts[0], "Explain tides playfully");
    assert!(prompts[2].contains("Moon pulls water."));
    assert_eq!(provider.calls.lock().unwrap()[0].2, ResponseFormat::Json);
}

#[tokio::test]
async fn summary_reaches_writer_as_facts() {
    let plan = plan_json(json!([
        {"step": 1, "agent": "Summarizer", "input": {
            "text_to_summarize": "Long notes on tides. ".repeat(30),
            "summary_objective": "key facts"
        }},
        {"step": 2, "agent": "Writer", "input": {
            "blueprint": "B",
            "facts": "$$STEP_1_OUTPUT$$"
        }}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str(), "Moon pulls water.", "Tide memo."]);
    let deps = default_deps(provider.clone());

    let (output, trace) = run_engine("Write a tide memo", &deps).await;

    assert_eq!(output, Some(json!({"report": "Tide memo."})));
    assert_eq!(trace.status(), &TraceStatus::Success);
    assert_eq!(
        trace.steps()[1].resolved_input,
        json!({"blueprint": "B", "facts": {"summary": "Moon pulls water."}})
    );

    let calls = provider.calls.lock().unwrap();
    assert!(calls[2].0.contains("--- SEMANTIC BLUEPRINT (JSON) ---\nB\n"));
    assert!(calls[2].1.contains("RESEARCH FINDINGS"));
    assert!(calls[2].1.contains("Moon pulls water."));
}

#[tokio::test]
async fn blueprint_and_research_feed_the_writer() {
    let documents = vec![
        CorpusDocument {
            id: "bp-suspense".into(),
            namespace: "ContextLibrary".into(),
            text: "suspenseful narrative blueprint".into(),
            source: None,
            blueprint_json: Some("{\"style\": \"suspense\"}".into()),
        },
        CorpusDocument {
            id: "juno-1".into(),
            namespace: "KnowledgeStore".into(),
            text: "Juno reached Jupiter orbit in July 2016.".into(),
            source: Some("juno_fact_sheet.pdf".into()),
            blueprint_json: None,
        },
        CorpusDocument {
            id: "juno-2".into(),
            namespace: "KnowledgeStore".into(),
            text: "Juno studies Jupiter gravity and magnetic fields.".into(),
            source: Some("mission_overview.pdf".into()),
            blueprint_json: None,
        },
    ];
    let index = InMemoryIndex::from_documents(Arc::new(WordEmbedding), documents)
        .await
        .unwrap();

    let plan = plan_json(json!([
        {"step": 1, "agent": "Librarian", "input": {"intent_query": "suspenseful narrative"}},
        {"step": 2, "agent": "Researcher", "input": {"topic_query": "Juno Jupiter"}},
        {"step": 3, "agent": "Writer", "input": {
            "blueprint": "$$STEP_1_OUTPUT$$",
            "facts": "$$STEP_2_OUTPUT$$"
        }}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str(), "Juno arrived in 2016.", "A tense Juno tale."]);
    let deps = deps_with(
        AgentRegistry::with_default_agents(),
        provider.clone(),
        Arc::new(index),
    );

    let (output, trace) = Engine::new(deps).run("Tell the Juno story with suspense").await;

    assert_eq!(output, Some(json!({"report": "A tense Juno tale."})));
    let research = &trace.steps()[1].output;
    assert_eq!(
        research["sources"],
        json!(["juno_fact_sheet.pdf", "mission_overview.pdf"])
    );

    let calls = provider.calls.lock().unwrap();
    let (writer_system, writer_user, _) = &calls[2];
    assert!(writer_system.contains("{\"style\": \"suspense\"}"));
    assert!(writer_user.contains("**Sources:**"));
}

#[tokio::test]
async fn trace_serializes_for_export() {
    let plan = plan_json(json!([
        {"step": 1, "agent": "Writer", "input": {"blueprint": "b", "facts": "f"}}
    ]));
    let provider = ScriptedProvider::new(&[plan.as_str(), "done"]);
    let (_, trace) = run_engine("goal", &default_deps(provider)).await;

    let value = serde_json::to_value(&trace).unwrap();
    assert_eq!(value["status"], json!({"state": "success"}));
    assert_eq!(value["plan"]["steps"][0]["agent"], json!("Writer"));
    assert_eq!(value["steps"][0]["output"], json!({"report": "done"}));
    assert!(value["duration_ms"].is_u64());
    assert!(value["run_id"].as_str().is_some_and(|id| !id.is_empty()));
}
