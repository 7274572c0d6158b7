// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::ident::IdentAllocator;

use crate::layout::Direction;
use crate::model::{Graph, GraphNode};

fn escape_node_label(label: &str) -> String {
    label.replace('"', "'").replace(['\n', '\r'], " ")
}

fn escape_edge_label(label: &str) -> String {
    escape_node_label(label).replace('|', "/")
}

fn push_node(out: &mut String, indent: &str, ident: &str, node: &GraphNode) {
    let _ = writeln!(out, "{indent}{ident}[\"{}\"]", escape_node_label(node.label()));
}

/// Compiles `graph` into a left-to-right Mermaid flowchart.
pub fn compile_flowchart(graph: &Graph) -> String {
    compile_flowchart_with_direction(graph, Direction::LeftRight)
}

/// Compile a plan graph to Mermaid `flowchart` text.
///
/// Output is deterministic:
/// - Nodes without a phase come first, in input order.
/// - Each phase becomes one `subgraph` block, ordered by first appearance.
/// - Edges follow in input order; edges naming unknown nodes are skipped, matching the layout.
pub fn compile_flowchart_with_direction(graph: &Graph, direction: Direction) -> String {
    let mut idents = IdentAllocator::default();
    let node_idents: HashMap<&str, String> = graph
        .nodes()
        .iter()
        .map(|node| (node.id().as_str(), idents.allocate(node.id().as_str())))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "flowchart {}", direction.as_mermaid());

    for node in graph.nodes().iter().filter(|node| node.phase().is_none()) {
        push_node(&mut out, "  ", &node_idents[node.id().as_str()], node);
    }

    for phase in graph.phases() {
        let block = idents.allocate(phase);
        let _ = writeln!(out, "  subgraph {block}[\"{}\"]", escape_node_label(phase));
        for node in graph.nodes().iter().filter(|node| node.phase() == Some(phase)) {
            push_node(&mut out, "    ", &node_idents[node.id().as_str()], node);
        }
        out.push_str("  end\n");
    }

    for edge in graph.resolved_edges() {
        let from = &node_idents[edge.from_id()];
        let to = &node_idents[edge.to_id()];
        match edge.label().filter(|label| !label.trim().is_empty()) {
            Some(label) => {
                let _ = writeln!(out, "  {from} -->|{}| {to}", escape_edge_label(label));
            }
            None => {
                let _ = writeln!(out, "  {from} --> {to}");
            }
        }
    }

    out
}
