use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::engine_harness::{default_deps, plan_json};
use context_engine::engine::{Engine, TraceStatus};
use context_engine::llm::OpenAiProvider;

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5}
    })
}

#[tokio::test]
async fn runs_against_an_openai_compatible_server() {
    let server = MockServer::start().await;
    let plan = plan_json(json!([
        {"step": 1, "agent": "Writer", "input": {"blueprint": "formal", "facts": "Q3 revenue grew 12%."}}
    ]));

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&plan)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("SEMANTIC BLUEPRINT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Revenue rose 12% in Q3.")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url(
        &format!("{}/v1", server.uri()),
        Some("sk-test"),
        "gpt-4o",
        0.1,
    );
    let engine = Engine::new(default_deps(Arc::new(provider)));

    let (output, trace) = engine.run("Write a formal revenue note").await;

    assert_eq!(trace.status(), &TraceStatus::Success);
    assert_eq!(output, Some(json!({"report": "Revenue rose 12% in Q3."})));
}

#[tokio::test]
async fn provider_error_becomes_planning_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key sk-leaked123"))
        .mount(&server)
        .await;

    let provider =
        OpenAiProvider::with_base_url(&server.uri(), Some("sk-bad"), "gpt-4o", 0.1);
    let (output, trace) = Engine::new(default_deps(Arc::new(provider)))
        .run("goal")
        .await;

    assert_eq!(output, None);
    match trace.status() {
        TraceStatus::PlanningFailed { reason } => {
            assert!(reason.contains("401"));
            assert!(!reason.contains("sk-leaked123"));
        }
        other => panic!("unexpected status: {other}"),
    }
}
