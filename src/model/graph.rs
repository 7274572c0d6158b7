// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashMap, HashSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ids::NodeId;
use super::lenient::{null_default, number_or_default, or_default};

/// Wire shape of a plan graph, as produced by the model or sent by a client.
///
/// This is the unvalidated form; convert with [`Graph::try_from`] before handing it to the
/// layout engine or the Mermaid compiler.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct GraphSpec {
    /// Ordered list of nodes. Must not be empty and ids must be unique.
    #[serde(default, deserialize_with = "null_default")]
    pub nodes: Vec<GraphNodeSpec>,
    /// Directed edges between node ids. Edges naming unknown ids are ignored.
    #[serde(default, deserialize_with = "or_default")]
    pub edges: Vec<GraphEdgeSpec>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct GraphNodeSpec {
    /// Unique, non-empty node id.
    #[serde(default)]
    pub id: String,
    /// Human readable label.
    #[serde(default, deserialize_with = "or_default")]
    pub label: String,
    /// Optional phase name used to group nodes into clusters.
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(default, deserialize_with = "number_or_default", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "number_or_default", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct GraphEdgeSpec {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Box,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    id: NodeId,
    label: String,
    phase: Option<String>,
    kind: NodeKind,
    width: Option<f64>,
    height: Option<f64>,
}

impl GraphNode {
    pub fn new(id: NodeId, label: impl Into<String>) -> Self {
        Self { id, label: label.into(), phase: None, kind: NodeKind::Box, width: None, height: None }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_size(mut self, width: Option<f64>, height: Option<f64>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn width(&self) -> Option<f64> {
        self.width
    }

    pub fn height(&self) -> Option<f64> {
        self.height
    }
}

/// A directed edge. Endpoints are raw strings because they may be dangling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    from: String,
    to: String,
    label: Option<String>,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn from_id(&self) -> &str {
        &self.from
    }

    pub fn to_id(&self) -> &str {
        &self.to
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Validated, immutable plan graph shared by the layout engine and the Mermaid compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index: HashMap<NodeId, usize>,
}

impl Graph {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Result<Self, InvalidGraphError> {
        if nodes.is_empty() {
            return Err(InvalidGraphError::NoNodes);
        }

        let mut index = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), idx).is_some() {
                return Err(InvalidGraphError::DuplicateNodeId { id: node.id.to_string() });
            }
        }

        Ok(Self { nodes, edges, index })
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Edges whose endpoints both name known nodes, in input order.
    pub fn resolved_edges(&self) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.edges.iter().filter(|edge| self.contains(&edge.from) && self.contains(&edge.to))
    }

    /// Distinct phase names in order of first appearance.
    pub fn phases(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .filter_map(GraphNode::phase)
            .filter(|phase| seen.insert(*phase))
            .collect()
    }

    pub fn to_spec(&self) -> GraphSpec {
        GraphSpec::from(self)
    }
}

impl TryFrom<GraphSpec> for Graph {
    type Error = InvalidGraphError;

    fn try_from(spec: GraphSpec) -> Result<Self, Self::Error> {
        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (position, node) in spec.nodes.into_iter().enumerate() {
            let id = NodeId::new(node.id).map_err(|_| InvalidGraphError::EmptyNodeId { position })?;
            let phase = node.phase.filter(|phase| !phase.trim().is_empty());
            nodes.push(GraphNode {
                id,
                label: node.label,
                phase,
                kind: node.kind.unwrap_or_default(),
                width: node.width,
                height: node.height,
            });
        }

        let edges = spec
            .edges
            .into_iter()
            .map(|edge| GraphEdge { from: edge.from, to: edge.to, label: edge.label })
            .collect();

        Graph::new(nodes, edges)
    }
}

impl From<&Graph> for GraphSpec {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph
                .nodes
                .iter()
                .map(|node| GraphNodeSpec {
                    id: node.id.to_string(),
                    label: node.label.clone(),
                    phase: node.phase.clone(),
                    kind: (node.kind != NodeKind::Box).then_some(node.kind),
                    width: node.width,
                    height: node.height,
                })
                .collect(),
            edges: graph
                .edges
                .iter()
                .map(|edge| GraphEdgeSpec {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    label: edge.label.clone(),
                })
                .collect(),
        }
    }
}

impl Serialize for Graph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_spec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Graph {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = GraphSpec::deserialize(deserializer)?;
        Graph::try_from(spec).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidGraphError {
    NoNodes,
    EmptyNodeId { position: usize },
    DuplicateNodeId { id: String },
}

impl fmt::Display for InvalidGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNodes => f.write_str("graph must contain at least one node"),
            Self::EmptyNodeId { position } => {
                write!(f, "node at position {position} has an empty id")
            }
            Self::DuplicateNodeId { id } => write!(f, "duplicate node id '{id}'"),
        }
    }
}

impl std::error::Error for InvalidGraphError {}
