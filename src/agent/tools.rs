// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The fixed tool registry offered to the model, and defensive argument parsing.

use std::fmt;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::chat::{ModelError, ToolSpec};
use super::firecrawl::SearchError;
use crate::layout::Direction;
use crate::model::lenient::{number_or_default, or_default};
use crate::model::{GraphSpec, InvalidGraphError};
use crate::ops::ScenePatch;

pub const WEB_SEARCH: &str = "web_search";
pub const WRITE_DIAGRAM: &str = "write_diagram";
pub const DRAW_CANVAS: &str = "draw_canvas";
pub const READ_CANVAS: &str = "read_canvas";
pub const SEARCH_CANVAS: &str = "search_canvas";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WebSearchArgs {
    /// What to search for.
    #[serde(deserialize_with = "or_default")]
    pub query: String,
    /// Number of results, 1 to 10 (default 6).
    #[serde(deserialize_with = "number_or_default", skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Time filter (default `w`, the past week).
    #[serde(deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub tbs: Option<String>,
    /// Result groups to query (default `["web", "news"]`).
    #[serde(deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WriteDiagramArgs {
    /// What the diagram should show. Used when no graph is given.
    #[serde(deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Complete plan graph to render.
    #[serde(alias = "dag", deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphSpec>,
    #[serde(deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DrawCanvasArgs {
    /// Plan graph to lay out and add to the canvas.
    #[serde(alias = "dag", deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphSpec>,
    #[serde(deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Direct edits: add, update, remove and connect elements.
    #[serde(flatten)]
    pub patch: ScenePatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReadCanvasArgs {
    /// Element ids to read. Empty reads the whole digest.
    #[serde(deserialize_with = "or_default")]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SearchCanvasArgs {
    /// Case-insensitive text to look for.
    #[serde(deserialize_with = "or_default")]
    pub query: String,
    /// Maximum hits, 1 to 25 (default 8).
    #[serde(deserialize_with = "number_or_default", skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// A tool call resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    WebSearch(WebSearchArgs),
    WriteDiagram(WriteDiagramArgs),
    DrawCanvas(DrawCanvasArgs),
    ReadCanvas(ReadCanvasArgs),
    SearchCanvas(SearchCanvasArgs),
    Unknown { name: String },
}

/// Raw argument text as an object. Anything unparsable or non-object becomes `{}`.
///
/// Individual fields degrade on their own through the `lenient` deserializers; the whole object
/// only falls back to defaults when a field has no lenient form (draw_canvas patch lists).
fn arguments_object(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}

fn typed_or_default<T: DeserializeOwned + Default>(value: Value) -> T {
    serde_json::from_value(value).unwrap_or_default()
}

impl ToolInvocation {
    /// Never fails: malformed arguments degrade to defaults, unknown names to `Unknown`.
    pub fn parse(name: &str, raw_arguments: &str) -> Self {
        let args = arguments_object(raw_arguments);
        match name {
            WEB_SEARCH => Self::WebSearch(typed_or_default(args)),
            WRITE_DIAGRAM => Self::WriteDiagram(typed_or_default(args)),
            DRAW_CANVAS => Self::DrawCanvas(typed_or_default(args)),
            READ_CANVAS => Self::ReadCanvas(typed_or_default(args)),
            SEARCH_CANVAS => Self::SearchCanvas(typed_or_default(args)),
            other => Self::Unknown { name: other.to_owned() },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::WebSearch(_) => WEB_SEARCH,
            Self::WriteDiagram(_) => WRITE_DIAGRAM,
            Self::DrawCanvas(_) => DRAW_CANVAS,
            Self::ReadCanvas(_) => READ_CANVAS,
            Self::SearchCanvas(_) => SEARCH_CANVAS,
            Self::Unknown { name } => name,
        }
    }
}

fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({"type": "object"}))
}

/// Tool descriptions in the order they are offered to the model.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: WEB_SEARCH.to_owned(),
            description: "Search the web and news for fresh information.".to_owned(),
            parameters: schema_of::<WebSearchArgs>(),
        },
        ToolSpec {
            name: WRITE_DIAGRAM.to_owned(),
            description: "Create or replace the Mermaid flowchart from a prompt or a plan graph."
                .to_owned(),
            parameters: schema_of::<WriteDiagramArgs>(),
        },
        ToolSpec {
            name: DRAW_CANVAS.to_owned(),
            description: "Edit the whiteboard: lay out a plan graph or add, update, remove and connect elements."
                .to_owned(),
            parameters: schema_of::<DrawCanvasArgs>(),
        },
        ToolSpec {
            name: READ_CANVAS.to_owned(),
            description: "Read canvas elements by id, including their full text.".to_owned(),
            parameters: schema_of::<ReadCanvasArgs>(),
        },
        ToolSpec {
            name: SEARCH_CANVAS.to_owned(),
            description: "Find canvas elements whose text contains a query.".to_owned(),
            parameters: schema_of::<SearchCanvasArgs>(),
        },
    ]
}

/// Failure of one tool call. Fed back to the model as `{"error": ...}`.
#[derive(Debug)]
pub enum ToolError {
    Search(SearchError),
    Model(ModelError),
    InvalidGraph(InvalidGraphError),
    MalformedGraph { message: String },
    MissingArgument { name: &'static str },
    EmptyPatch,
    NoCanvasContext,
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(err) => write!(f, "{err}"),
            Self::Model(err) => write!(f, "{err}"),
            Self::InvalidGraph(err) => write!(f, "invalid graph: {err}"),
            Self::MalformedGraph { message } => write!(f, "model returned a malformed graph: {message}"),
            Self::MissingArgument { name } => write!(f, "missing argument '{name}'"),
            Self::EmptyPatch => f.write_str("nothing to draw: the patch is empty"),
            Self::NoCanvasContext => f.write_str("no canvas context is attached to this request"),
        }
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Search(err) => Some(err),
            Self::Model(err) => Some(err),
            Self::InvalidGraph(err) => Some(err),
            Self::MalformedGraph { .. } | Self::MissingArgument { .. }
            | Self::EmptyPatch
            | Self::NoCanvasContext => None,
        }
    }
}

impl From<SearchError> for ToolError {
    fn from(err: SearchError) -> Self {
        Self::Search(err)
    }
}

impl From<ModelError> for ToolError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

impl From<InvalidGraphError> for ToolError {
    fn from(err: InvalidGraphError) -> Self {
        Self::InvalidGraph(err)
    }
}

impl ToolError {
    pub fn to_result(&self) -> Value {
        json!({"error": self.to_string()})
    }
}
