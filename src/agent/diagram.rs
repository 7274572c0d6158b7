// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::Serialize;
use tracing::warn;

use super::chat::{ChatMessage, ChatModel, ChatRequest};
use super::tools::ToolError;
use crate::config::FALLBACK_MODEL;
use crate::format::mermaid::compile_flowchart_with_direction;
use crate::layout::{layout_graph, Direction, LayoutOptions, PositionedElement};
use crate::model::{Graph, GraphSpec};

pub const GRAPH_SYSTEM_PROMPT: &str = "Return ONLY valid JSON for a DAG with fields {nodes,edges}. \
Each node is {id, label, phase?}; each edge is {from, to, label?}. Use short unique ids and group \
related steps with the same phase.";

/// Compiled diagram: Mermaid text, the graph it came from, and its positioned layout.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DiagramArtifact {
    pub mermaid: String,
    pub graph: GraphSpec,
    pub elements: Vec<PositionedElement>,
}

/// Runs layout and compilation over one graph so both artifacts agree.
///
/// Without an explicit direction both flow left-right.
pub fn render_diagram(graph: &Graph, direction: Option<Direction>) -> DiagramArtifact {
    let direction = direction.unwrap_or(Direction::LeftRight);
    let layout_options = LayoutOptions::default().with_direction(direction);
    DiagramArtifact {
        mermaid: compile_flowchart_with_direction(graph, direction),
        graph: graph.to_spec(),
        elements: layout_graph(graph, &layout_options),
    }
}

/// The outermost `{...}` span; models like to wrap JSON in prose or code fences.
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

pub fn parse_graph_reply(text: &str) -> Result<Graph, ToolError> {
    let span = json_object_span(text)
        .ok_or_else(|| ToolError::MalformedGraph { message: "no JSON object in reply".to_owned() })?;
    let spec: GraphSpec = serde_json::from_str(span)
        .map_err(|err| ToolError::MalformedGraph { message: err.to_string() })?;
    Ok(Graph::try_from(spec)?)
}

/// Asks the model for a plan graph in JSON mode.
pub async fn generate_graph(
    model: &dyn ChatModel,
    model_id: &str,
    prompt: &str,
) -> Result<Graph, ToolError> {
    let request = ChatRequest::new(
        model_id,
        vec![ChatMessage::system(GRAPH_SYSTEM_PROMPT), ChatMessage::user(prompt)],
    )
    .json();
    let reply = model.complete(request).await?;
    parse_graph_reply(reply.content.as_deref().unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedGraph {
    pub graph: Graph,
    /// Model that produced `graph`.
    pub model: String,
    pub fallback: bool,
}

/// [`generate_graph`] with one retry against [`FALLBACK_MODEL`] when `model_id` fails.
pub async fn generate_graph_with_fallback(
    model: &dyn ChatModel,
    model_id: &str,
    prompt: &str,
) -> Result<GeneratedGraph, ToolError> {
    match generate_graph(model, model_id, prompt).await {
        Ok(graph) => Ok(GeneratedGraph { graph, model: model_id.to_owned(), fallback: false }),
        Err(err) if model_id != FALLBACK_MODEL => {
            warn!(model = model_id, fallback = FALLBACK_MODEL, error = %err, "graph generation failed, retrying with fallback model");
            let graph = generate_graph(model, FALLBACK_MODEL, prompt).await?;
            Ok(GeneratedGraph { graph, model: FALLBACK_MODEL.to_owned(), fallback: true })
        }
        Err(err) => Err(err),
    }
}
