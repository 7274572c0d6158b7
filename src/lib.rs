// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Apo: a tool-calling whiteboard assistant.
//!
//! Plan graphs are laid out for the canvas and compiled to Mermaid; canvas scenes are condensed
//! into bounded digests and edited through patches; a bounded model/tool loop ties them
//! together and streams typed events to HTTP, SSE and MCP clients.

pub mod agent;
pub mod config;
pub mod format;
pub mod http;
pub mod layout;
pub mod mcp;
pub mod model;
pub mod ops;
pub mod query;
pub mod store;
