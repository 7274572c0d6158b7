// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::chat::{ChatMessage, ChatModel, ChatRequest, ModelError, Usage};
use super::diagram::{generate_graph, render_diagram, DiagramArtifact};
use super::events::{EventSink, StreamEvent, TransportClosed};
use super::firecrawl::{SearchProvider, SearchRequest};
use super::tools::{
    tool_specs, DrawCanvasArgs, ReadCanvasArgs, SearchCanvasArgs, ToolError, ToolInvocation,
    WebSearchArgs, WriteDiagramArgs,
};
use crate::config::{sanitize_model, DEFAULT_MODEL, FALLBACK_MODEL};
use crate::layout::{layout_graph, to_scene_elements, LayoutOptions};
use crate::model::{Graph, Scene};
use crate::ops::{apply_patch, ScenePatch};
use crate::query::{read_canvas, search_canvas, CanvasDigest};

pub const SYSTEM_PERSONA: &str = "You are Apo, a system design engineer working on a shared \
whiteboard. Help the user design clear architectures and project plans. Decide which tools to \
use: web_search only when fresh information is needed; write_diagram whenever a plan, process \
or architecture is implied; read_canvas and search_canvas to look at what is already on the \
board; draw_canvas to place or edit elements on it. Finish with a short answer in plain text.";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_turns: usize,
    pub default_model: String,
    /// Final text is streamed in chunks of this many characters.
    pub chunk_chars: usize,
    pub chunk_delay: Duration,
    pub max_attachments: usize,
    pub max_attachment_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: 6,
            default_model: DEFAULT_MODEL.to_owned(),
            chunk_chars: 60,
            chunk_delay: Duration::ZERO,
            max_attachments: 5,
            max_attachment_chars: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunRequest {
    pub prompt: String,
    /// Requested model id; ids outside the allow-list fall back to the default model.
    pub model: Option<String>,
    pub canvas: Option<CanvasDigest>,
    pub attachments: Vec<Attachment>,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RunOutcome {
    pub text: String,
    pub diagram: Option<DiagramArtifact>,
    pub patches: Vec<ScenePatch>,
    pub model: String,
    pub fallback: bool,
    pub turns: usize,
    /// The turn bound was hit before the model produced a final answer.
    pub exhausted: bool,
    pub usage: Usage,
}

#[derive(Debug)]
pub enum RunError {
    Model(ModelError),
    Transport(TransportClosed),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(err) => write!(f, "{err}"),
            Self::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(err) => Some(err),
            Self::Transport(err) => Some(err),
        }
    }
}

impl From<ModelError> for RunError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

impl From<TransportClosed> for RunError {
    fn from(err: TransportClosed) -> Self {
        Self::Transport(err)
    }
}

/// Splits `text` into chunks of at most `size` characters.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            chunks.push(&text[start..idx]);
            start = idx;
        }
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Bounded model/tool loop.
///
/// Every run is a sequential state machine: call the model, execute the requested tools one by
/// one, feed their results back, repeat. A run ends with a final answer, with the turn bound, or
/// with an error; the event sink sees exactly one terminal event unless its receiver is gone.
#[derive(Clone)]
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    search: Arc<dyn SearchProvider>,
    config: OrchestratorConfig,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator").field("config", &self.config).finish_non_exhaustive()
    }
}

struct RunContext<'a> {
    request: &'a RunRequest,
    model: &'a str,
    sink: &'a EventSink,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn SearchProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self { model, search, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn chat_model(&self) -> &dyn ChatModel {
        self.model.as_ref()
    }

    pub fn search_provider(&self) -> &dyn SearchProvider {
        self.search.as_ref()
    }

    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        sanitize_model(requested, &self.config.default_model)
    }

    /// Runs one request to completion, streaming events into `sink`.
    pub async fn run(&self, request: RunRequest, sink: &EventSink) -> Result<RunOutcome, RunError> {
        let started = Instant::now();
        let model = self.resolve_model(request.model.as_deref());
        info!(model = %model, prompt_len = request.prompt.len(), attachments = request.attachments.len(), "run started");

        let result = match self.run_with_model(&request, &model, sink).await {
            Err(RunError::Model(err)) if model != FALLBACK_MODEL => {
                warn!(model = %model, fallback = FALLBACK_MODEL, error = %err, "model failed, retrying with fallback model");
                let notice = format!("{model} failed ({err}); retrying with {FALLBACK_MODEL}");
                sink.send(StreamEvent::log(notice)).await?;
                self.run_with_model(&request, FALLBACK_MODEL, sink)
                    .await
                    .map(|outcome| RunOutcome { fallback: true, ..outcome })
            }
            other => other,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(RunError::Model(err)) => {
                warn!(error = %err, elapsed_ms = started.elapsed().as_millis() as u64, "run failed");
                // Best effort: the receiver may already be gone.
                let _ = sink.send(StreamEvent::error("model", err.to_string())).await;
                return Err(RunError::Model(err));
            }
            Err(RunError::Transport(closed)) => {
                debug!("event receiver disconnected, run stopped");
                return Err(RunError::Transport(closed));
            }
        };

        for chunk in chunk_text(&outcome.text, self.config.chunk_chars) {
            sink.send(StreamEvent::Text { chunk: chunk.to_owned() }).await?;
            if !self.config.chunk_delay.is_zero() {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
        }

        let ms = started.elapsed().as_millis() as u64;
        info!(model = %outcome.model, turns = outcome.turns, exhausted = outcome.exhausted, fallback = outcome.fallback, elapsed_ms = ms, "run finished");
        sink.send(StreamEvent::Done {
            ok: true,
            ms,
            model: outcome.model.clone(),
            fallback: outcome.fallback,
            exhausted: outcome.exhausted,
        })
        .await?;
        Ok(outcome)
    }

    fn seed_messages(&self, request: &RunRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PERSONA)];
        if let Some(canvas) = &request.canvas {
            let mut compact = canvas.clone();
            compact.details = None;
            let context = serde_json::to_string(&compact).unwrap_or_default();
            messages.push(ChatMessage::system(format!(
                "Current whiteboard digest (JSON). Use read_canvas for full element text.\n{context}"
            )));
        }

        let mut prompt = request.prompt.clone();
        for attachment in request.attachments.iter().take(self.config.max_attachments) {
            prompt.push_str("\n\nAttachment: ");
            prompt.push_str(&attachment.name);
            prompt.push_str("\n\n");
            prompt.push_str(truncate_chars(&attachment.text, self.config.max_attachment_chars));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }

    async fn run_with_model(
        &self,
        request: &RunRequest,
        model: &str,
        sink: &EventSink,
    ) -> Result<RunOutcome, RunError> {
        let ctx = RunContext { request, model, sink };
        let tools = tool_specs();
        let mut messages = self.seed_messages(request);
        let mut outcome = RunOutcome { model: model.to_owned(), ..RunOutcome::default() };

        for turn in 1..=self.config.max_turns {
            sink.send(StreamEvent::log(format!("LLM turn {turn}"))).await?;
            let call_started = Instant::now();
            let reply = self
                .model
                .complete(ChatRequest::new(model, messages.clone()).with_tools(tools.clone()))
                .await?;
            outcome.turns = turn;

            let elapsed_ms = call_started.elapsed().as_millis() as u64;
            if let Some(usage) = reply.usage {
                info!(turn, model, prompt_tokens = usage.prompt_tokens, completion_tokens = usage.completion_tokens, total_tokens = usage.total_tokens, elapsed_ms, "model turn");
                outcome.usage.prompt_tokens += usage.prompt_tokens;
                outcome.usage.completion_tokens += usage.completion_tokens;
                outcome.usage.total_tokens += usage.total_tokens;
                sink.send(StreamEvent::Usage {
                    turn,
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                })
                .await?;
            } else {
                info!(turn, model, elapsed_ms, "model turn");
            }

            if reply.tool_calls.is_empty() {
                outcome.text = reply.content.unwrap_or_default();
                return Ok(outcome);
            }

            messages.push(ChatMessage::Assistant {
                content: reply.content.unwrap_or_default(),
                tool_calls: reply.tool_calls.clone(),
            });
            for call in &reply.tool_calls {
                let invocation = ToolInvocation::parse(&call.name, &call.arguments);
                info!(turn, tool = %call.name, "tool call");
                sink.send(StreamEvent::Log {
                    message: format!("tool:{}", call.name),
                    args: serde_json::from_str::<Value>(&call.arguments).ok(),
                })
                .await?;
                let result = self.execute(invocation, &ctx, &mut outcome).await?;
                messages.push(ChatMessage::tool_result(&call.id, &result));
            }
        }

        warn!(model, max_turns = self.config.max_turns, "turn bound reached without a final answer");
        outcome.exhausted = true;
        outcome.text = String::new();
        Ok(outcome)
    }

    /// Executes one tool. Tool failures become `{"error": ...}` results; only a closed event
    /// channel aborts the run.
    async fn execute(
        &self,
        invocation: ToolInvocation,
        ctx: &RunContext<'_>,
        outcome: &mut RunOutcome,
    ) -> Result<Value, TransportClosed> {
        let name = invocation.name().to_owned();
        let result = match invocation {
            ToolInvocation::WebSearch(args) => self.web_search(args, ctx).await,
            ToolInvocation::WriteDiagram(args) => self.write_diagram(args, ctx, outcome).await,
            ToolInvocation::DrawCanvas(args) => self.draw_canvas(args, ctx, outcome).await,
            ToolInvocation::ReadCanvas(args) => read_canvas_tool(args, ctx.request),
            ToolInvocation::SearchCanvas(args) => search_canvas_tool(args, ctx.request),
            ToolInvocation::Unknown { name } => {
                warn!(tool = %name, "unknown tool requested");
                return Ok(Value::Null);
            }
        };

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(tool = %name, error = %err, "tool failed");
                ctx.sink
                    .send(StreamEvent::Log {
                        message: format!("{name} error"),
                        args: Some(err.to_result()),
                    })
                    .await?;
                Ok(err.to_result())
            }
            Err(closed) => Err(closed),
        }
    }

    async fn web_search(
        &self,
        args: WebSearchArgs,
        ctx: &RunContext<'_>,
    ) -> Result<Result<Value, ToolError>, TransportClosed> {
        if args.query.trim().is_empty() {
            return Ok(Err(ToolError::MissingArgument { name: "query" }));
        }
        let request = SearchRequest::new(args.query, args.limit, args.tbs, args.sources);
        let results = match self.search.search(&request).await {
            Ok(results) => results,
            Err(err) => return Ok(Err(err.into())),
        };
        ctx.sink.send(StreamEvent::log(format!("web_search results: {}", results.len()))).await?;
        Ok(Ok(json!({"query": request.query, "results": results})))
    }

    async fn write_diagram(
        &self,
        args: WriteDiagramArgs,
        ctx: &RunContext<'_>,
        outcome: &mut RunOutcome,
    ) -> Result<Result<Value, ToolError>, TransportClosed> {
        let graph = match args.graph {
            Some(spec) => Graph::try_from(spec).map_err(ToolError::from),
            None => {
                let prompt = args
                    .prompt
                    .filter(|prompt| !prompt.trim().is_empty())
                    .unwrap_or_else(|| ctx.request.prompt.clone());
                generate_graph(self.model.as_ref(), ctx.model, &prompt).await
            }
        };
        let graph = match graph {
            Ok(graph) => graph,
            Err(err) => return Ok(Err(err)),
        };

        let artifact = render_diagram(&graph, args.direction);
        ctx.sink
            .send(StreamEvent::Mermaid { code: artifact.mermaid.clone(), graph: artifact.graph.clone() })
            .await?;
        let result = json!({"mermaid": artifact.mermaid, "graph": artifact.graph});
        outcome.diagram = Some(artifact);
        Ok(Ok(result))
    }

    async fn draw_canvas(
        &self,
        args: DrawCanvasArgs,
        ctx: &RunContext<'_>,
        outcome: &mut RunOutcome,
    ) -> Result<Result<Value, ToolError>, TransportClosed> {
        let mut patch = args.patch;
        if let Some(spec) = args.graph {
            let graph = match Graph::try_from(spec) {
                Ok(graph) => graph,
                Err(err) => return Ok(Err(err.into())),
            };
            let options = LayoutOptions::default().with_direction(args.direction.unwrap_or_default());
            patch.add.extend(ScenePatch::adding(to_scene_elements(&layout_graph(&graph, &options))).add);
        }

        // Malformed additions are dropped here so the client only receives usable elements.
        let probe = apply_patch(&Scene::default(), &ScenePatch { add: patch.add.clone(), ..ScenePatch::default() });
        let rejected_indices: Vec<usize> = probe.rejected.iter().map(|rejected| rejected.index).collect();
        patch.add = patch
            .add
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !rejected_indices.contains(index))
            .map(|(_, raw)| raw)
            .collect();

        if patch.is_empty() {
            return Ok(Err(ToolError::EmptyPatch));
        }

        let summary = json!({
            "ok": true,
            "added": patch.add.len(),
            "updated": patch.update.len(),
            "removed": patch.remove.len(),
            "connected": patch.connect.len(),
            "rejected": probe.rejected,
        });
        ctx.sink.send(StreamEvent::ExcalidrawPatch { patch: patch.clone() }).await?;
        outcome.patches.push(patch);
        Ok(Ok(summary))
    }
}

fn canvas(request: &RunRequest) -> Result<&CanvasDigest, ToolError> {
    request.canvas.as_ref().ok_or(ToolError::NoCanvasContext)
}

fn read_canvas_tool(
    args: ReadCanvasArgs,
    request: &RunRequest,
) -> Result<Result<Value, ToolError>, TransportClosed> {
    Ok(canvas(request).map(|digest| {
        serde_json::to_value(read_canvas(digest, &args.ids)).unwrap_or(Value::Null)
    }))
}

fn search_canvas_tool(
    args: SearchCanvasArgs,
    request: &RunRequest,
) -> Result<Result<Value, ToolError>, TransportClosed> {
    Ok(canvas(request).map(|digest| {
        serde_json::to_value(search_canvas(digest, &args.query, args.limit)).unwrap_or(Value::Null)
    }))
}
