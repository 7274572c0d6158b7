// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::model::GraphSpec;
use crate::ops::ScenePatch;

/// Typed event emitted by a run. Serializes to its payload only; the kind travels separately
/// (as the SSE event name).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Log {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        args: Option<Value>,
    },
    Text {
        chunk: String,
    },
    Mermaid {
        code: String,
        graph: GraphSpec,
    },
    ExcalidrawPatch {
        patch: ScenePatch,
    },
    Usage {
        turn: usize,
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
    },
    Error {
        scope: String,
        message: String,
    },
    Done {
        ok: bool,
        ms: u64,
        model: String,
        fallback: bool,
        exhausted: bool,
    },
}

impl StreamEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log { message: message.into(), args: None }
    }

    pub fn error(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error { scope: scope.into(), message: message.into() }
    }

    /// Wire name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::Text { .. } => "text",
            Self::Mermaid { .. } => "mermaid",
            Self::ExcalidrawPatch { .. } => "excalidraw_patch",
            Self::Usage { .. } => "usage",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done { .. })
    }

    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The receiving side of a run's event channel is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportClosed;

impl fmt::Display for TransportClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("event receiver disconnected")
    }
}

impl std::error::Error for TransportClosed {}

/// Sending half of a run's ordered event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<StreamEvent>>,
}

impl EventSink {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink without a receiver that accepts and drops every event.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub async fn send(&self, event: StreamEvent) -> Result<(), TransportClosed> {
        match &self.tx {
            Some(tx) => tx.send(event).await.map_err(|_| TransportClosed),
            None => Ok(()),
        }
    }
}
