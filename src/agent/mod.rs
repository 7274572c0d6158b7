// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The assistant: model and search adapters, the tool registry, and the bounded run loop.

pub mod chat;
pub mod diagram;
pub mod events;
pub mod firecrawl;
pub mod openai;
pub mod orchestrator;
pub mod tools;

pub use chat::{ChatMessage, ChatModel, ChatRequest, ModelError, ModelReply, ToolCall, ToolSpec, Usage};
pub use diagram::{
    generate_graph, generate_graph_with_fallback, parse_graph_reply, render_diagram, DiagramArtifact,
    GeneratedGraph,
};
pub use events::{EventSink, StreamEvent, TransportClosed};
pub use firecrawl::{FirecrawlSearch, SearchError, SearchProvider, SearchRequest, SearchResult};
pub use openai::OpenAiCompatibleModel;
pub use orchestrator::{
    Attachment, Orchestrator, OrchestratorConfig, RunError, RunOutcome, RunRequest, SYSTEM_PERSONA,
};
pub use tools::{tool_specs, ToolError, ToolInvocation};
