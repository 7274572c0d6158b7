// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::digest::{CanvasDigest, DigestEdge, DigestNode};
use crate::model::SceneElement;

pub const DEFAULT_SEARCH_LIMIT: usize = 8;
pub const MAX_SEARCH_LIMIT: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchHit {
    #[serde(flatten)]
    pub node: DigestNode,
    /// Character offset of the first match inside `text`.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CanvasSearchResult {
    pub query: String,
    pub hits: Vec<SearchHit>,
    /// Edges touching at least one hit.
    pub edges: Vec<DigestEdge>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CanvasReadResult {
    pub nodes: Vec<DigestNode>,
    pub edges: Vec<DigestEdge>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, SceneElement>,
    /// Requested ids the digest does not know about.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

pub fn clamp_search_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT)
}

fn match_position(haystack: &str, needle_lower: &str) -> Option<usize> {
    let lower = haystack.to_lowercase();
    lower.find(needle_lower).map(|byte| lower[..byte].chars().count())
}

/// Case-insensitive substring search over digest node texts.
///
/// Hits are ranked by how early the match occurs; equal positions keep digest order. An empty
/// query matches nothing.
pub fn search_canvas(digest: &CanvasDigest, query: &str, limit: Option<usize>) -> CanvasSearchResult {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return CanvasSearchResult { query: query.to_owned(), ..CanvasSearchResult::default() };
    }

    let mut ranked: Vec<(usize, &DigestNode)> = digest
        .nodes
        .iter()
        .filter_map(|node| match_position(&node.text, &needle).map(|position| (position, node)))
        .collect();
    ranked.sort_by_key(|(position, _)| *position);
    ranked.truncate(clamp_search_limit(limit));

    let hit_ids: HashSet<&str> = ranked.iter().map(|(_, node)| node.id.as_str()).collect();
    let edges = digest
        .edges
        .iter()
        .filter(|edge| hit_ids.contains(edge.from.as_str()) || hit_ids.contains(edge.to.as_str()))
        .cloned()
        .collect();

    let hits = ranked
        .into_iter()
        .map(|(position, node)| SearchHit { node: node.clone(), position })
        .collect();

    CanvasSearchResult { query: query.to_owned(), hits, edges }
}

/// Looks up nodes and edges by id. Without ids, the whole digest is returned.
pub fn read_canvas(digest: &CanvasDigest, ids: &[String]) -> CanvasReadResult {
    if ids.is_empty() {
        return CanvasReadResult {
            nodes: digest.nodes.clone(),
            edges: digest.edges.clone(),
            ..CanvasReadResult::default()
        };
    }

    let mut result = CanvasReadResult::default();
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let node = digest.node(id);
        let edge = digest.edge(id);
        if let Some(node) = node {
            result.nodes.push(node.clone());
        }
        if let Some(edge) = edge {
            result.edges.push(edge.clone());
        }
        match digest.detail(id) {
            Some(detail) => {
                result.details.insert(id.clone(), detail.clone());
            }
            None if node.is_none() && edge.is_none() => result.missing.push(id.clone()),
            None => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::model::fixtures::{arrow, rect};
    use crate::model::Scene;
    use crate::query::digest::{build_digest, build_digest_with_options, DigestOptions};

    #[fixture]
    fn digest() -> CanvasDigest {
        let scene = Scene::new(vec![
            rect("launch", 0.0, 0.0, "Plan the launch"),
            rect("research", 200.0, 0.0, "Launch research"),
            rect("budget", 400.0, 0.0, "Budget"),
            rect("review", 600.0, 0.0, "Review launch plan"),
            arrow("e1", "research", "launch"),
            arrow("e2", "budget", "review"),
        ]);
        build_digest_with_options(&scene, &DigestOptions { include_details: true, ..DigestOptions::default() })
    }

    #[rstest]
    fn ranks_by_earliest_match_then_digest_order(digest: CanvasDigest) {
        let result = search_canvas(&digest, "LAUNCH", None);
        let ids = result.hits.iter().map(|hit| hit.node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["research", "review", "launch"]);
        assert_eq!(result.hits[0].position, 0);
        assert_eq!(result.hits[2].position, 9);
    }

    #[rstest]
    fn includes_edges_adjacent_to_hits(digest: CanvasDigest) {
        let result = search_canvas(&digest, "budget", None);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.edges.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["e2"]);
    }

    #[rstest]
    #[case("", 0)]
    #[case("   ", 0)]
    #[case("nothing here", 0)]
    fn empty_or_unmatched_queries_return_no_hits(
        digest: CanvasDigest,
        #[case] query: &str,
        #[case] expected: usize,
    ) {
        let result = search_canvas(&digest, query, None);
        assert_eq!(result.hits.len(), expected);
        assert!(result.edges.is_empty());
    }

    #[rstest]
    #[case(None, 8)]
    #[case(Some(0), 1)]
    #[case(Some(3), 3)]
    #[case(Some(500), 25)]
    fn limit_is_clamped(#[case] limit: Option<usize>, #[case] expected: usize) {
        assert_eq!(clamp_search_limit(limit), expected);
    }

    #[test]
    fn top_k_applies_after_ranking() {
        let scene = Scene::new(
            (0..40).map(|idx| rect(&format!("n{idx}"), 0.0, 0.0, &format!("item {idx}"))).collect(),
        );
        let result = search_canvas(&build_digest(&scene, None), "item", Some(100));
        assert_eq!(result.hits.len(), MAX_SEARCH_LIMIT);
        assert_eq!(result.hits[0].node.id, "n0");
    }

    #[rstest]
    fn read_returns_nodes_edges_details_and_missing(digest: CanvasDigest) {
        let ids = vec!["budget".to_owned(), "e1".to_owned(), "ghost".to_owned(), "budget".to_owned()];
        let result = read_canvas(&digest, &ids);
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.edges.len(), 1);
        assert!(result.details.contains_key("budget"));
        assert!(result.details.contains_key("e1"));
        assert_eq!(result.missing, vec!["ghost".to_owned()]);
    }

    #[rstest]
    fn read_without_ids_returns_whole_digest(digest: CanvasDigest) {
        let result = read_canvas(&digest, &[]);
        assert_eq!(result.nodes.len(), 4);
        assert_eq!(result.edges.len(), 2);
        assert!(result.details.is_empty());
    }
}
