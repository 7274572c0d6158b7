// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::model::{ElementKind, Rect, Scene, SceneElement};

pub const NODE_TEXT_LIMIT: usize = 200;
pub const EDGE_LABEL_LIMIT: usize = 120;
pub const DEFAULT_MAX_NODES: usize = 300;
pub const DEFAULT_MAX_EDGES: usize = 600;

const HASH_BYTES: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DigestScope {
    Selection,
    Viewport,
    All,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DigestStats {
    /// Elements in the whole scene.
    pub total: usize,
    /// Elements inside the resolved scope.
    pub in_scope: usize,
    pub images: usize,
    pub freedraw: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Rect>,
    /// Nodes and edges left out because of the size caps.
    #[serde(default)]
    pub truncated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DigestNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DigestEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Size-bounded summary of a scene, scoped to what the user is looking at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CanvasDigest {
    pub scope: DigestScope,
    pub stats: DigestStats,
    #[serde(default)]
    pub nodes: Vec<DigestNode>,
    #[serde(default)]
    pub edges: Vec<DigestEdge>,
    #[serde(default)]
    pub hash: String,
    /// Untruncated elements keyed by id, for on-demand lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, SceneElement>>,
}

impl CanvasDigest {
    pub fn node(&self, id: &str) -> Option<&DigestNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&DigestEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn detail(&self, id: &str) -> Option<&SceneElement> {
        self.details.as_ref().and_then(|details| details.get(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigestOptions {
    pub viewport: Option<Rect>,
    pub include_details: bool,
    pub max_nodes: usize,
    pub max_edges: usize,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            viewport: None,
            include_details: false,
            max_nodes: DEFAULT_MAX_NODES,
            max_edges: DEFAULT_MAX_EDGES,
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_owned(),
        None => text.to_owned(),
    }
}

fn resolve_scope<'a>(
    scene: &'a Scene,
    viewport: Option<Rect>,
) -> (DigestScope, Vec<&'a SceneElement>) {
    if !scene.selected_ids.is_empty() {
        let selected: HashSet<&str> = scene.selected_ids.iter().map(String::as_str).collect();
        let elements =
            scene.elements.iter().filter(|element| selected.contains(element.id.as_str())).collect();
        return (DigestScope::Selection, elements);
    }
    if let Some(viewport) = viewport {
        let elements =
            scene.elements.iter().filter(|element| element.bounds().intersects(&viewport)).collect();
        return (DigestScope::Viewport, elements);
    }
    (DigestScope::All, scene.elements.iter().collect())
}

fn content_hash(nodes: &[DigestNode], edges: &[DigestEdge]) -> String {
    let mut canonical = String::new();
    for node in nodes {
        let _ = writeln!(
            canonical,
            "n\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{:.1}\u{1f}{:.1}\u{1f}{:.1}\u{1f}{:.1}",
            node.id, node.kind, node.text, node.x, node.y, node.w, node.h
        );
    }
    for edge in edges {
        let _ = writeln!(
            canonical,
            "e\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            edge.id,
            edge.from,
            edge.to,
            edge.label.as_deref().unwrap_or_default()
        );
    }
    let digest = Sha256::digest(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..HASH_BYTES])
}

/// Builds a digest with default caps and no `details` index.
pub fn build_digest(scene: &Scene, viewport: Option<Rect>) -> CanvasDigest {
    build_digest_with_options(scene, &DigestOptions { viewport, ..DigestOptions::default() })
}

/// Build a size-bounded [`CanvasDigest`] for `scene`.
///
/// Scope resolution: a non-empty selection wins, then the viewport, then the whole scene.
/// Nodes are labelled shapes inside the scope; edges are arrows anywhere in the scene whose
/// both endpoints are included nodes.
pub fn build_digest_with_options(scene: &Scene, options: &DigestOptions) -> CanvasDigest {
    let (scope, in_scope) = resolve_scope(scene, options.viewport);

    let mut stats = DigestStats {
        total: scene.elements.len(),
        in_scope: in_scope.len(),
        ..DigestStats::default()
    };
    let mut nodes = Vec::new();
    let mut node_sources = Vec::new();

    for element in &in_scope {
        let bounds = element.bounds();
        stats.bbox = Some(match stats.bbox {
            Some(bbox) => bbox.union(&bounds),
            None => bounds,
        });

        match element.kind {
            ElementKind::Image => stats.images += 1,
            ElementKind::Freedraw => stats.freedraw += 1,
            _ => {}
        }

        if !element.kind.is_text_bearing() {
            continue;
        }
        let Some(text) = element.label() else {
            continue;
        };
        if nodes.len() == options.max_nodes {
            stats.truncated += 1;
            continue;
        }
        nodes.push(DigestNode {
            id: element.id.clone(),
            kind: element.kind.as_str().to_owned(),
            text: truncate_chars(text, NODE_TEXT_LIMIT),
            x: element.x,
            y: element.y,
            w: element.width,
            h: element.height,
        });
        node_sources.push(*element);
    }

    let included: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    let mut edges = Vec::new();
    let mut edge_sources = Vec::new();
    for element in scene.elements.iter().filter(|element| element.kind == ElementKind::Arrow) {
        let (Some(from), Some(to)) = (element.start_ref.as_deref(), element.end_ref.as_deref()) else {
            continue;
        };
        if !included.contains(from) || !included.contains(to) {
            continue;
        }
        if edges.len() == options.max_edges {
            stats.truncated += 1;
            continue;
        }
        edges.push(DigestEdge {
            id: element.id.clone(),
            from: from.to_owned(),
            to: to.to_owned(),
            label: element.label().map(|label| truncate_chars(label, EDGE_LABEL_LIMIT)),
        });
        edge_sources.push(element);
    }

    let details = options.include_details.then(|| {
        node_sources
            .iter()
            .copied()
            .chain(edge_sources.iter().copied())
            .map(|element| (element.id.clone(), element.clone()))
            .collect()
    });

    let hash = content_hash(&nodes, &edges);
    CanvasDigest { scope, stats, nodes, edges, hash, details }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::model::fixtures::{arrow, rect, small_scene};

    #[test]
    fn whole_scene_digest_lists_labelled_shapes_and_connecting_arrows() {
        let digest = build_digest(&small_scene(), None);

        assert_eq!(digest.scope, DigestScope::All);
        assert_eq!(
            digest.nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>(),
            vec!["r1", "r2", "r3"]
        );
        assert_eq!(digest.edges.len(), 2);
        assert_eq!(digest.stats.total, 7);
        assert_eq!(digest.stats.images, 1);
        assert_eq!(digest.stats.freedraw, 1);
        assert_eq!(digest.stats.bbox, Some(Rect::new(0.0, 0.0, 500.0, 250.0)));
        assert_eq!(digest.hash.len(), 12);
        assert!(digest.details.is_none());
    }

    #[test]
    fn freehand_only_scene_has_no_nodes_but_counts_strokes() {
        let elements = (0..500)
            .map(|idx| {
                SceneElement::new(format!("ink{idx}"), ElementKind::Freedraw)
                    .at(idx as f64, 0.0, 5.0, 5.0)
            })
            .collect();
        let digest = build_digest(&Scene::new(elements), None);
        assert_eq!(digest.nodes.len(), 0);
        assert_eq!(digest.stats.freedraw, 500);
    }

    #[test]
    fn selection_wins_over_viewport() {
        let scene = small_scene().with_selection(["r2", "r3"]);
        let digest = build_digest(&scene, Some(Rect::new(-10.0, -10.0, 50.0, 50.0)));
        assert_eq!(digest.scope, DigestScope::Selection);
        assert_eq!(digest.nodes.len(), 2);
        // a23 lives outside the selection but connects two selected nodes.
        assert_eq!(digest.edges.iter().map(|edge| edge.id.as_str()).collect::<Vec<_>>(), vec!["a23"]);
    }

    #[rstest]
    #[case(Rect::new(-50.0, -50.0, 50.0, 50.0), 0)]
    #[case(Rect::new(-50.0, -50.0, 50.5, 50.5), 1)]
    #[case(Rect::new(150.0, -10.0, 400.0, 20.0), 2)]
    fn viewport_uses_open_interval_intersection(#[case] viewport: Rect, #[case] expected: usize) {
        let digest = build_digest(&small_scene(), Some(viewport));
        assert_eq!(digest.scope, DigestScope::Viewport);
        assert_eq!(digest.nodes.len(), expected);
    }

    #[test]
    fn truncates_long_text_by_chars() {
        let long = "é".repeat(250);
        let mut scene = Scene::new(vec![rect("r1", 0.0, 0.0, &long), rect("r2", 0.0, 100.0, "B")]);
        let mut edge = arrow("e", "r1", "r2");
        edge.text = Some("x".repeat(300));
        scene.elements.push(edge);

        let digest = build_digest(&scene, None);
        assert_eq!(digest.nodes[0].text.chars().count(), NODE_TEXT_LIMIT);
        assert_eq!(digest.edges[0].label.as_deref().map(str::len), Some(EDGE_LABEL_LIMIT));
    }

    #[test]
    fn blank_text_and_dangling_arrows_are_excluded() {
        let scene = Scene::new(vec![
            rect("r1", 0.0, 0.0, "A"),
            rect("blank", 0.0, 100.0, "   "),
            arrow("to-blank", "r1", "blank"),
            arrow("to-ghost", "r1", "ghost"),
        ]);
        let digest = build_digest(&scene, None);
        assert_eq!(digest.nodes.len(), 1);
        assert!(digest.edges.is_empty());
    }

    #[test]
    fn caps_report_truncated_entries() {
        let mut elements: Vec<SceneElement> =
            (0..5).map(|idx| rect(&format!("r{idx}"), 0.0, 0.0, "box")).collect();
        elements.push(arrow("e01", "r0", "r1"));
        elements.push(arrow("e12", "r1", "r2"));
        elements.push(arrow("e34", "r3", "r4"));
        let options = DigestOptions { max_nodes: 3, max_edges: 1, ..DigestOptions::default() };

        let digest = build_digest_with_options(&Scene::new(elements), &options);
        assert_eq!(digest.nodes.len(), 3);
        assert_eq!(digest.edges.len(), 1);
        // Two nodes over the cap, one edge over the cap; e34 points at dropped nodes.
        assert_eq!(digest.stats.truncated, 3);
    }

    #[test]
    fn details_hold_untruncated_elements() {
        let long = "z".repeat(400);
        let scene = Scene::new(vec![rect("r1", 0.0, 0.0, &long)]);
        let options = DigestOptions { include_details: true, ..DigestOptions::default() };
        let digest = build_digest_with_options(&scene, &options);
        assert_eq!(digest.detail("r1").and_then(|e| e.text.as_deref()), Some(long.as_str()));
    }

    #[test]
    fn hash_tracks_included_content_only() {
        let base = build_digest(&small_scene(), None);

        let mut moved_ink = small_scene();
        if let Some(ink) = moved_ink.elements.iter_mut().find(|e| e.id == "ink") {
            ink.x += 500.0;
        }
        assert_eq!(build_digest(&moved_ink, None).hash, base.hash);

        let mut renamed = small_scene();
        renamed.elements[0].text = Some("Extract".to_owned());
        assert_ne!(build_digest(&renamed, None).hash, base.hash);
    }
}
