// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Ephemeral storage.
//!
//! The only state shared between runs is the context cache: uploaded canvas digests keyed by an
//! opaque id, expiring after a few minutes.

pub mod context_cache;

pub use context_cache::{
    new_context_id, Clock, ContextCache, ManualClock, MemoryContextCache, SystemClock,
    DEFAULT_CONTEXT_TTL,
};
