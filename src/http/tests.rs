// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use serde_json::Value;
use tower::ServiceExt;

use super::*;
use crate::agent::{ChatMessage, ChatModel, ChatRequest, ModelError, ModelReply, OrchestratorConfig};
use crate::config::FALLBACK_MODEL;
use crate::model::fixtures::small_scene;
use crate::store::MemoryContextCache;

const GRAPH_JSON: &str = r#"{"nodes": [{"id": "a", "label": "Research"}, {"id": "b", "label": "Plan"}], "edges": [{"from": "a", "to": "b"}]}"#;

struct StubModel;

#[async_trait]
impl ChatModel for StubModel {
    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, ModelError> {
        if request.json_mode {
            Ok(ModelReply::text(GRAPH_JSON))
        } else {
            Ok(ModelReply::text("hello from the stub"))
        }
    }
}

/// JSON-mode model that fails for one model id and records `(model, user prompt)` per call.
struct FlakyModel {
    failing: &'static str,
    calls: Mutex<Vec<(String, String)>>,
}

impl FlakyModel {
    fn failing_for(failing: &'static str) -> Self {
        Self { failing, calls: Mutex::new(Vec::new()) }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl ChatModel for FlakyModel {
    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, ModelError> {
        let prompt = request
            .messages
            .iter()
            .find_map(|message| match message {
                ChatMessage::User { content } => Some(content.clone()),
                _ => None,
            })
            .unwrap_or_default();
        self.calls.lock().expect("calls").push((request.model.clone(), prompt));
        if request.model == self.failing {
            return Err(ModelError::Status { status: 502, body: "down".to_owned() });
        }
        Ok(ModelReply::text(GRAPH_JSON))
    }
}

struct StubSearch;

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, SearchError> {
        Ok((0..request.limit)
            .map(|i| SearchResult {
                title: format!("{} #{i}", request.query),
                url: format!("https://example.com/{i}"),
                snippet: String::new(),
            })
            .collect())
    }
}

fn state(has_model_key: bool) -> (AppState, Arc<MemoryContextCache<CanvasDigest>>) {
    let contexts = Arc::new(MemoryContextCache::<CanvasDigest>::new());
    let orchestrator =
        Orchestrator::new(Arc::new(StubModel), Arc::new(StubSearch), OrchestratorConfig::default());
    (AppState::new(orchestrator, contexts.clone(), has_model_key), contexts)
}

fn state_with(model: Arc<dyn ChatModel>, default_model: &str) -> AppState {
    let config = OrchestratorConfig { default_model: default_model.to_owned(), ..OrchestratorConfig::default() };
    let orchestrator = Orchestrator::new(model, Arc::new(StubSearch), config);
    AppState::new(orchestrator, Arc::new(MemoryContextCache::<CanvasDigest>::new()), true)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, String) {
    let response = router(state).oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = tokio::time::timeout(Duration::from_secs(3), to_bytes(response.into_body(), usize::MAX))
        .await
        .expect("timeout collecting body")
        .expect("body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

#[tokio::test]
async fn summary_is_stored_in_the_context_cache() {
    let (state, contexts) = state(true);
    let digest = crate::query::build_digest(&small_scene(), None);
    let (status, body) = send(
        state,
        post_json("/api/canvas/summary", json!({"id": "board", "summary": digest})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"ok": true, "id": "board"}));
    assert_eq!(contexts.get("board"), Some(digest));
}

#[tokio::test]
async fn malformed_summary_is_a_bad_request() {
    let (state, _) = state(true);
    let (status, body) = send(state, post_json("/api/canvas/summary", json!({"id": "x"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json_body(&body);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().is_some_and(|error| !error.is_empty()));
}

#[tokio::test]
async fn digest_route_builds_digests_from_scenes() {
    let (state, _) = state(true);
    let (status, body) =
        send(state, post_json("/api/canvas/digest", json!({"scene": small_scene()}))).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["nodes"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["edges"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn assistant_validates_prompt_and_key() {
    let (state_with_key, _) = state(true);
    let (status, body) = send(state_with_key, post_json("/api/assistant", json!({"prompt": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body), json!({"ok": false, "error": "Missing prompt"}));

    let (state_without_key, _) = state(false);
    let (status, _) = send(state_without_key, post_json("/api/assistant", json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn assistant_runs_to_completion() {
    let (state, _) = state(true);
    let (status, body) = send(state, post_json("/api/assistant", json!({"prompt": "hi"}))).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["ok"], true);
    assert_eq!(body["text"], "hello from the stub");
    assert_eq!(body["fallback"], false);
    assert!(body["mermaid"].is_null());
}

#[tokio::test]
async fn stream_without_prompt_sends_a_single_error() {
    let (state, _) = state(true);
    let request = Request::builder().uri("/api/assistant/stream").body(Body::empty()).expect("request");
    let (status, body) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event: error"));
    assert!(body.contains("Missing prompt"));
    assert!(!body.contains("event: done"));
}

#[tokio::test]
async fn stream_emits_text_then_done() {
    let (state, _) = state(true);
    let request = Request::builder()
        .uri("/api/assistant/stream?prompt=hello&model=not-allowed")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
    let text = body.find("event: text").expect("text event");
    let done = body.find("event: done").expect("done event");
    assert!(text < done);
    assert!(body.contains(crate::config::DEFAULT_MODEL));
}

#[tokio::test]
async fn ai_diagram_returns_graph_mermaid_and_layout() {
    let (state, _) = state(true);
    let (status, body) = send(
        state,
        post_json("/api/ai/diagram", json!({"prompt": "plan a launch", "direction": "LR"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["ok"], true);
    assert!(body["mermaid"].as_str().is_some_and(|mermaid| mermaid.contains("a --> b")));
    assert_eq!(body["graph"]["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["elements"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["fallback"], false);
}

#[tokio::test]
async fn ai_diagram_falls_back_from_a_configured_default() {
    let model = Arc::new(FlakyModel::failing_for("openai/gpt-4o"));
    let state = state_with(model.clone(), "openai/gpt-4o");
    let (status, body) = send(state, post_json("/api/ai/diagram", json!({"prompt": "plan"}))).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["model"], FALLBACK_MODEL);
    assert_eq!(body["fallback"], true);
    let models: Vec<String> = model.calls().into_iter().map(|(model, _)| model).collect();
    assert_eq!(models, vec!["openai/gpt-4o".to_owned(), FALLBACK_MODEL.to_owned()]);
}

#[tokio::test]
async fn research_plan_cites_top_results_and_plans_from_them() {
    let model = Arc::new(FlakyModel::failing_for("none"));
    let state = state_with(model.clone(), FALLBACK_MODEL);
    let (status, body) =
        send(state, post_json("/api/ai/research-plan", json!({"query": "edge caching", "limit": 10}))).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["ok"], true);
    assert_eq!(body["citations"].as_array().map(Vec::len), Some(8));
    assert_eq!(body["citations"][0]["title"], "edge caching #0");
    assert!(body["mermaid"].as_str().is_some_and(|mermaid| mermaid.contains("a --> b")));
    assert_eq!(body["graph"]["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["model"], FALLBACK_MODEL);
    assert_eq!(body["fallback"], false);

    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.starts_with("Research query: edge caching\n\nSources:"));
    assert!(calls[0].1.contains("https://example.com/7"));
    assert!(!calls[0].1.contains("https://example.com/8"));
}

#[tokio::test]
async fn research_plan_falls_back_and_validates_input() {
    let model = Arc::new(FlakyModel::failing_for("openai/gpt-4o"));
    let (status, body) = send(
        state_with(model.clone(), FALLBACK_MODEL),
        post_json("/api/ai/research-plan", json!({"query": "queues", "model": "openai/gpt-4o"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["model"], FALLBACK_MODEL);
    assert_eq!(body["citations"].as_array().map(Vec::len), Some(6));

    let (status, _) = send(state(true).0, post_json("/api/ai/research-plan", json!({"query": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(state(false).0, post_json("/api/ai/research-plan", json!({"query": "queues"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn research_returns_results_and_rejects_empty_queries() {
    let (state, _) = state(true);
    let (status, body) =
        send(state.clone(), post_json("/api/research", json!({"query": "rust", "limit": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["results"].as_array().map(Vec::len), Some(2));

    let (status, _) = send(state, post_json("/api/research", json!({"query": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test]
fn sources_are_appended_to_the_prompt() {
    let sources = vec![SearchResult {
        title: "Guide".to_owned(),
        url: "https://example.com".to_owned(),
        snippet: "how to".to_owned(),
    }];
    assert_eq!(
        prompt_with_sources("plan", &sources),
        "plan\n\nSources:\n- Guide (https://example.com): how to"
    );
    assert_eq!(prompt_with_sources("plan", &[]), "plan");
}
