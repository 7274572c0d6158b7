// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::time::Duration;

use criterion::Criterion;

use apo::model::{ElementKind, Graph, GraphEdge, GraphNode, NodeId, Scene, SceneElement};
use apo::ops::{Connection, ElementUpdate, ScenePatch};

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Small => 20,
            Self::Medium => 200,
            Self::Large => 2000,
        }
    }
}

pub const CASES: [Case; 3] = [Case::Small, Case::Medium, Case::Large];

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<usize>().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<u64>().ok()).unwrap_or(default)
}

pub fn criterion() -> Criterion {
    let sample_size = env_usize("BENCH_SAMPLE_SIZE", 60).clamp(10, 200);
    let warmup_secs = env_u64("BENCH_WARMUP_SECS", 3).clamp(1, 60);
    let measurement_secs = env_u64("BENCH_MEASUREMENT_SECS", 5).clamp(1, 120);

    Criterion::default()
        .sample_size(sample_size)
        .warm_up_time(Duration::from_secs(warmup_secs))
        .measurement_time(Duration::from_secs(measurement_secs))
}

fn node_id(idx: usize) -> String {
    format!("n{idx:05}")
}

/// Layered plan graph: every node links to the next one and to the node `FAN` steps ahead.
pub fn plan_graph(case: Case) -> Graph {
    const FAN: usize = 7;
    let count = case.size();
    let nodes = (0..count)
        .map(|idx| {
            let id = NodeId::new(node_id(idx)).expect("node id");
            let node = GraphNode::new(id, format!("Step {idx} of the rollout plan"));
            if idx % 3 == 0 {
                node.with_phase(format!("Phase {}", idx / 50))
            } else {
                node
            }
        })
        .collect();

    let mut edges = Vec::with_capacity(count * 2);
    for idx in 0..count {
        if idx + 1 < count {
            edges.push(GraphEdge::new(node_id(idx), node_id(idx + 1)));
        }
        if idx + FAN < count {
            edges.push(GraphEdge::new(node_id(idx), node_id(idx + FAN)).with_label("unblocks"));
        }
    }
    Graph::new(nodes, edges).expect("plan graph")
}

fn element_id(idx: usize) -> String {
    format!("el{idx:05}")
}

/// Grid of labelled boxes with arrows between neighbours, plus occasional strokes.
pub fn board(case: Case) -> Scene {
    const COLUMNS: usize = 20;
    let count = case.size();
    let mut elements = Vec::with_capacity(count * 2 + count / 10);
    for idx in 0..count {
        let x = (idx % COLUMNS) as f64 * 180.0;
        let y = (idx / COLUMNS) as f64 * 120.0;
        let kind = if idx % 5 == 0 { ElementKind::Diamond } else { ElementKind::Rectangle };
        elements.push(
            SceneElement::new(element_id(idx), kind)
                .at(x, y, 140.0, 70.0)
                .with_text(format!("Service {idx}: handles queue {}", idx % 13)),
        );
        if idx > 0 {
            elements.push(
                SceneElement::new(format!("ar{idx:05}"), ElementKind::Arrow)
                    .at(x - 40.0, y + 35.0, 40.0, 0.0)
                    .connecting(element_id(idx - 1), element_id(idx)),
            );
        }
        if idx % 10 == 0 {
            elements.push(
                SceneElement::new(format!("fd{idx:05}"), ElementKind::Freedraw)
                    .at(x, y + 80.0, 30.0, 10.0),
            );
        }
    }
    Scene::new(elements)
}

/// Patch touching every stage: connects, updates, removes and adds.
pub fn patch_for(case: Case) -> ScenePatch {
    let count = case.size();
    let step = (count / 10).max(1);
    let connect = (0..count)
        .step_by(step)
        .map(|idx| Connection { from: element_id(idx), to: element_id((idx + 3) % count), label: None })
        .collect();
    let update = (1..count)
        .step_by(step)
        .map(|idx| ElementUpdate {
            id: element_id(idx),
            text: Some("renamed".to_owned()),
            ..ElementUpdate::default()
        })
        .collect();
    let remove = (0..count).step_by(step).map(|idx| format!("fd{idx:05}")).collect();
    let added = (0..step).map(|idx| {
        SceneElement::new(format!("new{idx:05}"), ElementKind::Rectangle)
            .at(0.0, -200.0, 100.0, 50.0)
            .with_text("added")
    });
    ScenePatch { connect, update, remove, ..ScenePatch::adding(added) }
}
