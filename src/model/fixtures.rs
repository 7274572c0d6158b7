// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::graph::{Graph, GraphEdge, GraphNode};
use super::ids::NodeId;
use super::scene::{ElementKind, Scene, SceneElement};

pub(crate) fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

pub(crate) fn graph(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> Graph {
    Graph::new(
        nodes.iter().map(|(id, label)| GraphNode::new(nid(id), *label)).collect(),
        edges.iter().map(|(from, to)| GraphEdge::new(*from, *to)).collect(),
    )
    .expect("graph")
}

/// `a -> b`, `a -> c`, `b -> d`, `c -> d`.
pub(crate) fn small_dag() -> Graph {
    graph(
        &[("a", "Research"), ("b", "Design"), ("c", "Prototype"), ("d", "Launch")],
        &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
    )
}

pub(crate) fn rect(id: &str, x: f64, y: f64, text: &str) -> SceneElement {
    SceneElement::new(id, ElementKind::Rectangle).at(x, y, 100.0, 50.0).with_text(text)
}

pub(crate) fn arrow(id: &str, from: &str, to: &str) -> SceneElement {
    SceneElement::new(id, ElementKind::Arrow).at(0.0, 0.0, 10.0, 10.0).connecting(from, to)
}

/// Three labelled boxes in a row, two arrows between them, an image and a stroke.
pub(crate) fn small_scene() -> Scene {
    Scene::new(vec![
        rect("r1", 0.0, 0.0, "Ingest"),
        rect("r2", 200.0, 0.0, "Transform"),
        rect("r3", 400.0, 0.0, "Publish"),
        arrow("a12", "r1", "r2"),
        arrow("a23", "r2", "r3"),
        SceneElement::new("img", ElementKind::Image).at(0.0, 200.0, 50.0, 50.0),
        SceneElement::new("ink", ElementKind::Freedraw).at(100.0, 200.0, 20.0, 20.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_dag_is_valid() {
        let graph = small_dag();
        assert_eq!(graph.nodes().len(), 4);
        assert_eq!(graph.resolved_edges().count(), 4);
    }

    #[test]
    fn small_scene_has_expected_elements() {
        let scene = small_scene();
        assert_eq!(scene.elements.len(), 7);
        assert!(scene.contains("a23"));
    }
}
