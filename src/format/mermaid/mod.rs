// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mermaid flowchart compilation.

pub mod flowchart;
mod ident;

pub use flowchart::{compile_flowchart, compile_flowchart_with_direction};
pub use ident::MermaidIdentError;
