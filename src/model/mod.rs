// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A [`Graph`] is the plan structure the model produces; a [`Scene`] is a read-only snapshot of
//! the canvas the user is looking at.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod graph;
pub mod ids;
pub mod lenient;
pub mod scene;

pub use graph::{
    Graph, GraphEdge, GraphEdgeSpec, GraphNode, GraphNodeSpec, GraphSpec, InvalidGraphError,
    NodeKind,
};
pub use ids::{Id, IdError, NodeId};
pub use scene::{ElementKind, Rect, Scene, SceneElement, SceneElementError};
