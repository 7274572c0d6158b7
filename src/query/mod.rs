// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over canvas scenes.
//!
//! The digest is the bounded view of a scene that the assistant sees; search and read are pure
//! lookups on top of it.

pub mod digest;
pub mod search;

pub use digest::{
    build_digest, build_digest_with_options, CanvasDigest, DigestEdge, DigestNode, DigestOptions,
    DigestScope, DigestStats,
};
pub use search::{
    clamp_search_limit, read_canvas, search_canvas, CanvasReadResult, CanvasSearchResult,
    SearchHit,
};
