// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Layout algorithms for plan graphs.
//!
//! Converts a [`crate::model::Graph`] into positioned boxes and arrows: levels come from a BFS
//! over the graph, wide levels wrap into rows, and the result is fully deterministic.

pub mod graph;

pub use graph::{
    estimate_size, layout_graph, to_scene_elements, Direction, LayoutOptions, PositionedArrow,
    PositionedElement, PositionedNode,
};
