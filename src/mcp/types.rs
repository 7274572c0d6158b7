// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::layout::{Direction, LayoutOptions, PositionedElement};
use crate::model::{GraphSpec, Rect, Scene, SceneElement};
use crate::ops::{Delta, RejectedElement, ScenePatch};
use crate::query::CanvasDigest;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GraphLayoutParams {
    pub graph: GraphSpec,
    #[serde(default)]
    pub options: Option<LayoutOptions>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GraphLayoutResponse {
    pub elements: Vec<PositionedElement>,
    /// The same layout as canvas elements, ready to add to a scene.
    pub scene_elements: Vec<SceneElement>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GraphMermaidParams {
    pub graph: GraphSpec,
    #[serde(default)]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GraphMermaidResponse {
    pub mermaid: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CanvasDigestParams {
    pub scene: Scene,
    #[serde(default)]
    pub viewport: Option<Rect>,
    #[serde(default)]
    pub details: bool,
    /// Also store the digest in the context cache under this id (`""` generates one).
    #[serde(default)]
    pub context_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CanvasDigestResponse {
    pub digest: CanvasDigest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CanvasApplyPatchParams {
    pub scene: Scene,
    pub patch: ScenePatch,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CanvasApplyPatchResponse {
    pub scene: Scene,
    pub delta: Delta,
    pub rejected: Vec<RejectedElement>,
    pub skipped_connects: usize,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CanvasSearchParams {
    pub context_id: String,
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CanvasReadParams {
    pub context_id: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ContextPutParams {
    #[serde(default)]
    pub id: Option<String>,
    pub digest: CanvasDigest,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ContextPutResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ContextGetParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ContextGetResponse {
    pub id: String,
    pub digest: CanvasDigest,
}
