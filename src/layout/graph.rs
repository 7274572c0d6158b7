// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{ElementKind, Graph, NodeKind, SceneElement};

pub const DEFAULT_GAP_X: f64 = 260.0;
pub const DEFAULT_GAP_Y: f64 = 130.0;
pub const DEFAULT_MAX_PER_ROW: usize = 4;

const MIN_BOX_WIDTH: f64 = 160.0;
const MAX_BOX_WIDTH: f64 = 320.0;
const BOX_HEIGHT: f64 = 70.0;
const EXPLICIT_DEFAULT_WIDTH: f64 = 200.0;
const WRAPPED_ROW_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Direction {
    /// Levels flow top to bottom.
    #[default]
    #[serde(rename = "TB", alias = "TD")]
    TopBottom,
    /// Levels flow left to right.
    #[serde(rename = "LR")]
    LeftRight,
}

impl Direction {
    pub fn as_mermaid(&self) -> &'static str {
        match self {
            Self::TopBottom => "TB",
            Self::LeftRight => "LR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub direction: Direction,
    /// Horizontal spacing between columns (between levels for `LR`).
    pub gap_x: f64,
    /// Vertical spacing between levels (between columns for `LR`).
    pub gap_y: f64,
    /// Maximum number of nodes placed side by side within one level.
    pub max_per_row: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            gap_x: DEFAULT_GAP_X,
            gap_y: DEFAULT_GAP_Y,
            max_per_row: DEFAULT_MAX_PER_ROW,
        }
    }
}

impl LayoutOptions {
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionedArrow {
    pub from_id: String,
    pub to_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub x: f64,
    pub y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PositionedElement {
    Box(PositionedNode),
    Text(PositionedNode),
    Arrow(PositionedArrow),
}

impl PositionedElement {
    pub fn node(&self) -> Option<&PositionedNode> {
        match self {
            Self::Box(node) | Self::Text(node) => Some(node),
            Self::Arrow(_) => None,
        }
    }

    pub fn arrow(&self) -> Option<&PositionedArrow> {
        match self {
            Self::Arrow(arrow) => Some(arrow),
            Self::Box(_) | Self::Text(_) => None,
        }
    }
}

/// Estimated box size for a label, unless the caller supplied one.
pub fn estimate_size(label: &str, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
    if width.is_some() || height.is_some() {
        return (width.unwrap_or(EXPLICIT_DEFAULT_WIDTH), height.unwrap_or(BOX_HEIGHT));
    }
    let len = label.chars().count() as f64;
    let units = (len / 1.8).ceil().min(20.0);
    ((16.0 * units).clamp(MIN_BOX_WIDTH, MAX_BOX_WIDTH), BOX_HEIGHT)
}

struct Degrees {
    incoming: Vec<usize>,
    outgoing: Vec<usize>,
    adjacency: Vec<SmallVec<[usize; 4]>>,
}

fn degrees(graph: &Graph) -> Degrees {
    let n = graph.nodes().len();
    let mut degrees = Degrees {
        incoming: vec![0; n],
        outgoing: vec![0; n],
        adjacency: vec![SmallVec::new(); n],
    };

    for edge in graph.edges() {
        let (Some(from), Some(to)) = (graph.node_index(edge.from_id()), graph.node_index(edge.to_id()))
        else {
            continue;
        };
        degrees.adjacency[from].push(to);
        degrees.outgoing[from] += 1;
        degrees.incoming[to] += 1;
    }

    degrees
}

/// Source with the widest fan-out; the first node when every node has a predecessor.
fn select_root(degrees: &Degrees) -> usize {
    let mut best: Option<usize> = None;
    for idx in (0..degrees.incoming.len()).filter(|&idx| degrees.incoming[idx] == 0) {
        match best {
            Some(current) if degrees.outgoing[idx] <= degrees.outgoing[current] => {}
            _ => best = Some(idx),
        }
    }
    best.unwrap_or(0)
}

fn assign_levels(degrees: &Degrees, root: usize) -> Vec<usize> {
    let n = degrees.adjacency.len();
    let mut level: Vec<Option<usize>> = vec![None; n];
    let mut queue = VecDeque::new();

    level[root] = Some(0);
    queue.push_back(root);
    while let Some(current) = queue.pop_front() {
        let next_level = level[current].unwrap_or(0) + 1;
        for &next in &degrees.adjacency[current] {
            if level[next].is_none() {
                level[next] = Some(next_level);
                queue.push_back(next);
            }
        }
    }

    let overflow = level.iter().flatten().copied().max().unwrap_or(0) + 1;
    level.into_iter().map(|level| level.unwrap_or(overflow)).collect()
}

/// Lays out `graph` as positioned boxes (one per node) plus arrows for resolvable edges.
///
/// The result only depends on the graph and the options: the same input always yields the
/// same element list in the same order.
pub fn layout_graph(graph: &Graph, options: &LayoutOptions) -> Vec<PositionedElement> {
    let degrees = degrees(graph);
    let root = select_root(&degrees);
    let levels = assign_levels(&degrees, root);

    let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &level) in levels.iter().enumerate() {
        buckets.entry(level).or_default().push(idx);
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by_key(|&idx| Reverse(degrees.outgoing[idx]));
    }

    let max_per_row = options.max_per_row.max(1);
    let mut elements = Vec::with_capacity(graph.nodes().len() + graph.edges().len());
    let mut anchors: Vec<Option<(f64, f64, f64, f64)>> = vec![None; graph.nodes().len()];

    for (&level, bucket) in &buckets {
        let count = bucket.len();
        let cols = max_per_row.min(((count as f64).sqrt().ceil() as usize).max(1));
        let per_row = count.div_ceil(count.div_ceil(cols)).clamp(1, max_per_row);
        let lane_gap = match options.direction {
            Direction::TopBottom => options.gap_x,
            Direction::LeftRight => options.gap_y,
        };
        let base = -((per_row - 1) as f64) * lane_gap / 2.0;

        for (position, &idx) in bucket.iter().enumerate() {
            let row = (position / per_row) as f64;
            let col = (position % per_row) as f64;
            let (x, y) = match options.direction {
                Direction::TopBottom => (
                    base + col * options.gap_x,
                    level as f64 * options.gap_y + row * options.gap_y * WRAPPED_ROW_FACTOR,
                ),
                Direction::LeftRight => (
                    level as f64 * options.gap_x + row * options.gap_x * WRAPPED_ROW_FACTOR,
                    base + col * options.gap_y,
                ),
            };

            let node = &graph.nodes()[idx];
            let (width, height) = estimate_size(node.label(), node.width(), node.height());
            anchors[idx] = Some((x, y, width, height));

            let positioned = PositionedNode {
                id: node.id().to_string(),
                x,
                y,
                width,
                height,
                label: node.label().to_owned(),
                level,
            };
            elements.push(match node.kind() {
                NodeKind::Box => PositionedElement::Box(positioned),
                NodeKind::Text => PositionedElement::Text(positioned),
            });
        }
    }

    for edge in graph.edges() {
        let from = graph.node_index(edge.from_id()).and_then(|idx| anchors[idx]);
        let to = graph.node_index(edge.to_id()).and_then(|idx| anchors[idx]);
        let (Some((fx, fy, fw, fh)), Some((tx, ty, tw, th))) = (from, to) else {
            continue;
        };
        elements.push(PositionedElement::Arrow(PositionedArrow {
            from_id: edge.from_id().to_owned(),
            to_id: edge.to_id().to_owned(),
            label: edge.label().map(str::to_owned),
            x: fx + fw / 2.0,
            y: fy + fh / 2.0,
            end_x: tx + tw / 2.0,
            end_y: ty + th / 2.0,
        }));
    }

    elements
}

/// Converts layout output into scene elements that a canvas can insert as-is.
pub fn to_scene_elements(elements: &[PositionedElement]) -> Vec<SceneElement> {
    let mut arrow_idx = 0usize;
    elements
        .iter()
        .map(|element| match element {
            PositionedElement::Box(node) => SceneElement::new(&node.id, ElementKind::Rectangle)
                .at(node.x, node.y, node.width, node.height)
                .with_text(&node.label),
            PositionedElement::Text(node) => SceneElement::new(&node.id, ElementKind::Text)
                .at(node.x, node.y, node.width, node.height)
                .with_text(&node.label),
            PositionedElement::Arrow(arrow) => {
                let id = format!("{}->{}#{arrow_idx}", arrow.from_id, arrow.to_id);
                arrow_idx += 1;
                let mut element = SceneElement::new(id, ElementKind::Arrow)
                    .at(arrow.x, arrow.y, arrow.end_x - arrow.x, arrow.end_y - arrow.y)
                    .connecting(&arrow.from_id, &arrow.to_id);
                element.text = arrow.label.clone();
                element
            }
        })
        .collect()
}
