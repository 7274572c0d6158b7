// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! Exposes graph layout and compilation, canvas digests and patches, and the context cache as
//! MCP tools, over stdio or streamable HTTP.

mod server;
mod types;

pub use server::ApoMcp;
