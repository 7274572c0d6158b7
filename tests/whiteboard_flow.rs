// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use apo::agent::{
    ChatModel, ChatRequest, EventSink, ModelError, ModelReply, Orchestrator, OrchestratorConfig,
    RunRequest, SearchError, SearchProvider, SearchRequest, SearchResult, StreamEvent, ToolCall,
};
use apo::format::mermaid::compile_flowchart;
use apo::layout::{layout_graph, to_scene_elements, Direction, LayoutOptions};
use apo::model::{ElementKind, Graph, GraphSpec, Scene, SceneElement};
use apo::ops::{apply_patch, ElementUpdate, ScenePatch};
use apo::query::{build_digest, search_canvas, DigestScope};

fn research_plan() -> Graph {
    let spec: GraphSpec = serde_json::from_value(json!({
        "nodes": [{"id": "a", "label": "Research"}, {"id": "b", "label": "Plan"}],
        "edges": [{"from": "a", "to": "b"}]
    }))
    .expect("graph spec");
    Graph::try_from(spec).expect("graph")
}

#[test]
fn two_step_plan_lays_out_left_to_right_and_compiles() {
    let graph = research_plan();
    let options = LayoutOptions::default().with_direction(Direction::LeftRight);
    let elements = layout_graph(&graph, &options);

    let nodes: Vec<_> = elements.iter().filter_map(|element| element.node()).collect();
    assert_eq!(nodes.len(), 2);
    assert_eq!((nodes[0].id.as_str(), nodes[0].level), ("a", 0));
    assert_eq!((nodes[1].id.as_str(), nodes[1].level), ("b", 1));
    assert!(nodes[0].x < nodes[1].x);
    assert_eq!(elements.iter().filter(|element| element.arrow().is_some()).count(), 1);
    assert_eq!(layout_graph(&graph, &options), elements);

    assert!(compile_flowchart(&graph).contains("a --> b"));
}

#[test]
fn laid_out_plan_becomes_a_searchable_board() {
    let elements = to_scene_elements(&layout_graph(&research_plan(), &LayoutOptions::default()));
    let outcome = apply_patch(&Scene::default(), &ScenePatch::adding(elements));
    assert!(outcome.rejected.is_empty());

    let digest = build_digest(&outcome.scene, None);
    assert_eq!(digest.scope, DigestScope::All);
    assert_eq!(digest.nodes.len(), 2);
    assert_eq!(digest.edges.len(), 1);

    let hits = search_canvas(&digest, "plan", None).hits;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].node.id, "b");
}

#[test]
fn freehand_only_boards_have_no_nodes() {
    let strokes = (0..500)
        .map(|idx| {
            SceneElement::new(format!("s{idx}"), ElementKind::Freedraw).at(idx as f64, 0.0, 5.0, 5.0)
        })
        .collect();
    let digest = build_digest(&Scene::new(strokes), None);
    assert!(digest.nodes.is_empty());
    assert_eq!(digest.stats.freedraw, 500);
}

#[test]
fn update_after_remove_is_a_no_op() {
    let scene = Scene::new(vec![
        SceneElement::new("r1", ElementKind::Rectangle).at(0.0, 0.0, 10.0, 10.0).with_text("old"),
    ]);
    let removed = apply_patch(&scene, &ScenePatch { remove: vec!["r1".to_owned()], ..ScenePatch::default() });
    let update = ElementUpdate { id: "r1".to_owned(), text: Some("x".to_owned()), ..ElementUpdate::default() };
    let updated = apply_patch(&removed.scene, &ScenePatch { update: vec![update], ..ScenePatch::default() });

    assert!(!updated.scene.contains("r1"));
    assert!(updated.delta.updated.is_empty());
}

/// Model that never stops asking for tools.
#[derive(Default)]
struct RelentlessModel {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for RelentlessModel {
    async fn complete(&self, _request: ChatRequest) -> Result<ModelReply, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ModelReply::tools(vec![ToolCall::new(
            format!("call-{call}"),
            "search_canvas",
            r#"{"query": "anything"}"#,
        )]))
    }
}

struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchResult>, SearchError> {
        Err(SearchError::MissingApiKey)
    }
}

#[tokio::test]
async fn tool_hungry_model_stops_at_the_turn_bound() {
    let model = Arc::new(RelentlessModel::default());
    let orchestrator =
        Orchestrator::new(model.clone(), Arc::new(NoSearch), OrchestratorConfig::default());
    let (sink, mut rx) = EventSink::channel(256);

    let outcome = orchestrator.run(RunRequest::new("keep going"), &sink).await.expect("run");
    drop(sink);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(outcome.exhausted);
    assert_eq!(outcome.turns, 6);
    assert_eq!(model.calls.load(Ordering::SeqCst), 6);
    assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
    assert!(matches!(events.last(), Some(StreamEvent::Done { exhausted: true, .. })));
}
