// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface: JSON routes, the SSE assistant stream, and `/mcp`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::agent::{
    generate_graph_with_fallback, render_diagram, Attachment, EventSink, GeneratedGraph,
    Orchestrator, RunError, RunRequest, SearchError, SearchProvider, SearchRequest, SearchResult,
    StreamEvent,
};
use crate::layout::{Direction, PositionedElement};
use crate::mcp::ApoMcp;
use crate::model::{GraphSpec, Rect, Scene};
use crate::ops::ScenePatch;
use crate::query::{build_digest_with_options, CanvasDigest, DigestOptions};
use crate::store::{new_context_id, ContextCache, DEFAULT_CONTEXT_TTL};

const EVENT_BUFFER: usize = 64;
/// Search results kept as citations for a research plan.
const MAX_CITATIONS: usize = 8;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Orchestrator,
    contexts: Arc<dyn ContextCache<CanvasDigest>>,
    has_model_key: bool,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        contexts: Arc<dyn ContextCache<CanvasDigest>>,
        has_model_key: bool,
    ) -> Self {
        Self { orchestrator, contexts, has_model_key }
    }

    fn run_request(
        &self,
        prompt: String,
        model: Option<String>,
        ctx: Option<&str>,
        attachments: Vec<Attachment>,
    ) -> RunRequest {
        let canvas = ctx.filter(|id| !id.is_empty()).and_then(|id| {
            let digest = self.contexts.get(id);
            if digest.is_none() {
                debug!(ctx = id, "canvas context missing or expired");
            }
            digest
        });
        RunRequest { prompt, model, canvas, attachments }
    }

    fn require_model_key(&self) -> Result<(), ApiError> {
        if self.has_model_key {
            Ok(())
        } else {
            Err(ApiError::unavailable("OpenRouter/OpenAI API key not set"))
        }
    }
}

/// JSON error body `{ok: false, error}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self { status: StatusCode::SERVICE_UNAVAILABLE, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"ok": false, "error": self.message}))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::MissingApiKey => Self::unavailable(err.to_string()),
            SearchError::EmptyQuery => Self::bad_request(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Builds the application router, `/mcp` included.
pub fn router(state: AppState) -> Router {
    let mcp = ApoMcp::with_context_cache(state.contexts.clone());
    let config = StreamableHttpServerConfig { stateful_mode: true, ..StreamableHttpServerConfig::default() };
    let session_manager = Arc::new(LocalSessionManager::default());
    let mcp_service = StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, config);

    Router::new()
        .route("/api/canvas/summary", post(canvas_summary))
        .route("/api/canvas/digest", post(canvas_digest))
        .route("/api/assistant/stream", get(assistant_stream))
        .route("/api/assistant", post(assistant))
        .route("/api/ai/diagram", post(ai_diagram))
        .route("/api/research", post(research))
        .route("/api/ai/research-plan", post(research_plan))
        .nest_service("/mcp", mcp_service)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    #[serde(default)]
    id: Option<String>,
    summary: CanvasDigest,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    ok: bool,
    id: String,
}

async fn canvas_summary(
    State(state): State<AppState>,
    body: Result<Json<SummaryBody>, JsonRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Json(body) = body?;
    let id = non_empty(body.id).unwrap_or_else(new_context_id);
    info!(ctx = %id, nodes = body.summary.nodes.len(), "canvas summary stored");
    state.contexts.put(id.clone(), body.summary, DEFAULT_CONTEXT_TTL);
    Ok(Json(SummaryResponse { ok: true, id }))
}

#[derive(Debug, Deserialize)]
struct DigestBody {
    scene: Scene,
    #[serde(default)]
    viewport: Option<Rect>,
    #[serde(default)]
    details: bool,
}

async fn canvas_digest(
    body: Result<Json<DigestBody>, JsonRejection>,
) -> Result<Json<CanvasDigest>, ApiError> {
    let Json(body) = body?;
    let options =
        DigestOptions { viewport: body.viewport, include_details: body.details, ..DigestOptions::default() };
    let digest = build_digest_with_options(&body.scene, &options);
    debug!(total = digest.stats.total, in_scope = digest.stats.in_scope, "canvas digest built");
    Ok(Json(digest))
}

#[derive(Debug, Default, Deserialize)]
struct StreamQuery {
    prompt: Option<String>,
    model: Option<String>,
    ctx: Option<String>,
}

fn sse_event(event: &StreamEvent) -> Event {
    Event::default().event(event.name()).data(event.payload().to_string())
}

async fn assistant_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (sink, rx) = EventSink::channel(EVENT_BUFFER);
    match non_empty(query.prompt) {
        None => {
            // The receiver is still held below, so this cannot fail.
            let _ = sink.send(StreamEvent::error("request", "Missing prompt")).await;
        }
        Some(prompt) => {
            info!(model = ?query.model, ctx = ?query.ctx, "assistant stream opened");
            let request = state.run_request(prompt, query.model, query.ctx.as_deref(), Vec::new());
            let orchestrator = state.orchestrator.clone();
            tokio::spawn(async move {
                match orchestrator.run(request, &sink).await {
                    Ok(_) => {}
                    Err(RunError::Transport(_)) => debug!("assistant stream closed by client"),
                    Err(RunError::Model(err)) => debug!(error = %err, "assistant stream ended with error"),
                }
            });
        }
    }

    let stream = ReceiverStream::new(rx).map(|event| Ok(sse_event(&event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct AssistantBody {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    ctx: Option<String>,
    #[serde(default)]
    files: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct AssistantResponse {
    ok: bool,
    text: String,
    mermaid: Option<String>,
    graph: Option<GraphSpec>,
    patches: Vec<ScenePatch>,
    model: String,
    fallback: bool,
    exhausted: bool,
}

async fn assistant(
    State(state): State<AppState>,
    body: Result<Json<AssistantBody>, JsonRejection>,
) -> Result<Json<AssistantResponse>, ApiError> {
    let Json(body) = body?;
    let prompt = non_empty(body.prompt).ok_or_else(|| ApiError::bad_request("Missing prompt"))?;
    state.require_model_key()?;

    let request = state.run_request(prompt, body.model, body.ctx.as_deref(), body.files);
    let outcome = state
        .orchestrator
        .run(request, &EventSink::detached())
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;

    let (mermaid, graph) = match outcome.diagram {
        Some(diagram) => (Some(diagram.mermaid), Some(diagram.graph)),
        None => (None, None),
    };
    Ok(Json(AssistantResponse {
        ok: true,
        text: outcome.text,
        mermaid,
        graph,
        patches: outcome.patches,
        model: outcome.model,
        fallback: outcome.fallback,
        exhausted: outcome.exhausted,
    }))
}

#[derive(Debug, Deserialize)]
struct DiagramBody {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    sources: Vec<SearchResult>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    direction: Option<Direction>,
}

#[derive(Debug, Serialize)]
struct DiagramResponse {
    ok: bool,
    graph: GraphSpec,
    mermaid: String,
    elements: Vec<PositionedElement>,
    model: String,
    fallback: bool,
}

fn prompt_with_sources(prompt: &str, sources: &[SearchResult]) -> String {
    if sources.is_empty() {
        return prompt.to_owned();
    }
    let mut out = format!("{prompt}\n\nSources:");
    for source in sources {
        out.push_str(&format!("\n- {} ({}): {}", source.title, source.url, source.snippet));
    }
    out
}

async fn ai_diagram(
    State(state): State<AppState>,
    body: Result<Json<DiagramBody>, JsonRejection>,
) -> Result<Json<DiagramResponse>, ApiError> {
    let Json(body) = body?;
    let prompt = non_empty(body.prompt).ok_or_else(|| ApiError::bad_request("Missing prompt"))?;
    state.require_model_key()?;

    let orchestrator = &state.orchestrator;
    let model = orchestrator.resolve_model(body.model.as_deref());
    let prompt = prompt_with_sources(&prompt, &body.sources);
    let GeneratedGraph { graph, model, fallback } =
        generate_graph_with_fallback(orchestrator.chat_model(), &model, &prompt)
            .await
            .map_err(|err| ApiError::internal(err.to_string()))?;

    let artifact = render_diagram(&graph, body.direction);
    info!(model = %model, fallback, nodes = artifact.graph.nodes.len(), "diagram generated");
    Ok(Json(DiagramResponse {
        ok: true,
        graph: artifact.graph,
        mermaid: artifact.mermaid,
        elements: artifact.elements,
        model,
        fallback,
    }))
}

#[derive(Debug, Deserialize)]
struct ResearchBody {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    tbs: Option<String>,
    #[serde(default)]
    sources: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ResearchResponse {
    ok: bool,
    results: Vec<SearchResult>,
}

async fn research(
    State(state): State<AppState>,
    body: Result<Json<ResearchBody>, JsonRejection>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let Json(body) = body?;
    if body.query.trim().is_empty() {
        return Err(ApiError::bad_request("Missing query"));
    }
    let request = SearchRequest::new(body.query, body.limit, body.tbs, body.sources);
    let results = state.orchestrator.search_provider().search(&request).await?;
    info!(query = %request.query, results = results.len(), "research finished");
    Ok(Json(ResearchResponse { ok: true, results }))
}

#[derive(Debug, Deserialize)]
struct ResearchPlanBody {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    tbs: Option<String>,
    #[serde(default)]
    sources: Option<Vec<String>>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    direction: Option<Direction>,
}

#[derive(Debug, Serialize)]
struct ResearchPlanResponse {
    ok: bool,
    graph: GraphSpec,
    mermaid: String,
    elements: Vec<PositionedElement>,
    citations: Vec<SearchResult>,
    model: String,
    fallback: bool,
}

async fn research_plan(
    State(state): State<AppState>,
    body: Result<Json<ResearchPlanBody>, JsonRejection>,
) -> Result<Json<ResearchPlanResponse>, ApiError> {
    let Json(body) = body?;
    if body.query.trim().is_empty() {
        return Err(ApiError::bad_request("Missing query"));
    }
    state.require_model_key()?;

    let orchestrator = &state.orchestrator;
    let request = SearchRequest::new(body.query, body.limit, body.tbs, body.sources);
    let mut citations = orchestrator.search_provider().search(&request).await?;
    citations.truncate(MAX_CITATIONS);

    let model = orchestrator.resolve_model(body.model.as_deref());
    let prompt = prompt_with_sources(&format!("Research query: {}", request.query), &citations);
    let GeneratedGraph { graph, model, fallback } =
        generate_graph_with_fallback(orchestrator.chat_model(), &model, &prompt)
            .await
            .map_err(|err| ApiError::internal(err.to_string()))?;

    let artifact = render_diagram(&graph, body.direction);
    info!(query = %request.query, citations = citations.len(), model = %model, fallback, "research plan generated");
    Ok(Json(ResearchPlanResponse {
        ok: true,
        graph: artifact.graph,
        mermaid: artifact.mermaid,
        elements: artifact.elements,
        citations,
        model,
        fallback,
    }))
}

#[cfg(test)]
mod tests;
