// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};
use tracing::debug;

use crate::format::mermaid::compile_flowchart_with_direction;
use crate::layout::{layout_graph, to_scene_elements, Direction};
use crate::model::{Graph, GraphSpec};
use crate::ops::apply_patch;
use crate::query::{
    build_digest_with_options, read_canvas, search_canvas, CanvasDigest, CanvasReadResult,
    CanvasSearchResult, DigestOptions,
};
use crate::store::{new_context_id, ContextCache, MemoryContextCache, DEFAULT_CONTEXT_TTL};

use super::types::*;

/// Stateless canvas and graph tools plus the shared context cache.
#[derive(Clone)]
pub struct ApoMcp {
    contexts: Arc<dyn ContextCache<CanvasDigest>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ApoMcp {
    pub fn new() -> Self {
        Self::with_context_cache(Arc::new(MemoryContextCache::<CanvasDigest>::new()))
    }

    /// Shares `contexts` with other surfaces (the HTTP routes store digests there too).
    pub fn with_context_cache(contexts: Arc<dyn ContextCache<CanvasDigest>>) -> Self {
        Self { contexts, tool_router: Self::tool_router() }
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    fn cached_digest(&self, context_id: &str) -> Result<CanvasDigest, ErrorData> {
        self.contexts.get(context_id).ok_or_else(|| {
            ErrorData::resource_not_found(
                "unknown or expired context_id",
                Some(serde_json::json!({ "context_id": context_id })),
            )
        })
    }

    /// Lay out a plan graph into positioned boxes and arrows.
    #[tool(name = "graph.layout")]
    async fn graph_layout(
        &self,
        params: Parameters<GraphLayoutParams>,
    ) -> Result<Json<GraphLayoutResponse>, ErrorData> {
        let GraphLayoutParams { graph, options } = params.0;
        let graph = parse_graph(graph)?;
        let elements = layout_graph(&graph, &options.unwrap_or_default());
        let scene_elements = to_scene_elements(&elements);
        Ok(Json(GraphLayoutResponse { elements, scene_elements }))
    }

    /// Compile a plan graph to Mermaid flowchart text (default direction `LR`).
    #[tool(name = "graph.mermaid")]
    async fn graph_mermaid(
        &self,
        params: Parameters<GraphMermaidParams>,
    ) -> Result<Json<GraphMermaidResponse>, ErrorData> {
        let GraphMermaidParams { graph, direction } = params.0;
        let graph = parse_graph(graph)?;
        let mermaid =
            compile_flowchart_with_direction(&graph, direction.unwrap_or(Direction::LeftRight));
        Ok(Json(GraphMermaidResponse { mermaid }))
    }

    /// Summarize a raw scene into a bounded digest; optionally store it for later lookups.
    #[tool(name = "canvas.digest")]
    async fn canvas_digest(
        &self,
        params: Parameters<CanvasDigestParams>,
    ) -> Result<Json<CanvasDigestResponse>, ErrorData> {
        let CanvasDigestParams { scene, viewport, details, context_id } = params.0;
        let options = DigestOptions { viewport, include_details: details, ..DigestOptions::default() };
        let digest = build_digest_with_options(&scene, &options);

        let context_id = context_id.map(|id| {
            let id = if id.trim().is_empty() { new_context_id() } else { id };
            self.contexts.put(id.clone(), digest.clone(), DEFAULT_CONTEXT_TTL);
            id
        });
        Ok(Json(CanvasDigestResponse { digest, context_id }))
    }

    /// Apply a visual patch (connect, update, remove, add) to a scene snapshot.
    #[tool(name = "canvas.apply_patch")]
    async fn canvas_apply_patch(
        &self,
        params: Parameters<CanvasApplyPatchParams>,
    ) -> Result<Json<CanvasApplyPatchResponse>, ErrorData> {
        let CanvasApplyPatchParams { scene, patch } = params.0;
        let outcome = apply_patch(&scene, &patch);
        debug!(
            added = outcome.delta.added.len(),
            removed = outcome.delta.removed.len(),
            updated = outcome.delta.updated.len(),
            rejected = outcome.rejected.len(),
            "canvas.apply_patch"
        );
        Ok(Json(CanvasApplyPatchResponse {
            scene: outcome.scene,
            delta: outcome.delta,
            rejected: outcome.rejected,
            skipped_connects: outcome.skipped_connects,
        }))
    }

    /// Case-insensitive text search over a stored digest.
    #[tool(name = "canvas.search")]
    async fn canvas_search(
        &self,
        params: Parameters<CanvasSearchParams>,
    ) -> Result<Json<CanvasSearchResult>, ErrorData> {
        let CanvasSearchParams { context_id, query, limit } = params.0;
        let digest = self.cached_digest(&context_id)?;
        Ok(Json(search_canvas(&digest, &query, limit)))
    }

    /// Read nodes and edges of a stored digest by id; no ids reads everything.
    #[tool(name = "canvas.read")]
    async fn canvas_read(
        &self,
        params: Parameters<CanvasReadParams>,
    ) -> Result<Json<CanvasReadResult>, ErrorData> {
        let CanvasReadParams { context_id, ids } = params.0;
        let digest = self.cached_digest(&context_id)?;
        Ok(Json(read_canvas(&digest, &ids)))
    }

    #[tool(name = "context.put")]
    async fn context_put(
        &self,
        params: Parameters<ContextPutParams>,
    ) -> Result<Json<ContextPutResponse>, ErrorData> {
        let ContextPutParams { id, digest } = params.0;
        let id = id.filter(|id| !id.trim().is_empty()).unwrap_or_else(new_context_id);
        self.contexts.put(id.clone(), digest, DEFAULT_CONTEXT_TTL);
        Ok(Json(ContextPutResponse { id }))
    }

    #[tool(name = "context.get")]
    async fn context_get(
        &self,
        params: Parameters<ContextGetParams>,
    ) -> Result<Json<ContextGetResponse>, ErrorData> {
        let id = params.0.id;
        let digest = self.cached_digest(&id)?;
        Ok(Json(ContextGetResponse { id, digest }))
    }
}

impl Default for ApoMcp {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_graph(spec: GraphSpec) -> Result<Graph, ErrorData> {
    Graph::try_from(spec)
        .map_err(|err| ErrorData::invalid_params(format!("invalid graph: {err}"), None))
}

#[tool_handler]
impl ServerHandler for ApoMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Apo whiteboard tools (tools: graph.layout, graph.mermaid, canvas.digest, canvas.apply_patch, canvas.search, canvas.read, context.put, context.get)"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
