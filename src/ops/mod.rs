// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Patch operations for canvas scenes.
//!
//! A patch is applied to a snapshot and produces a new scene plus a minimal delta; the input
//! scene is never touched. Stages run in a fixed order: connect, update, remove, add.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ElementKind, Scene, SceneElement, SceneElementError};

/// Visual patch as emitted by the assistant or sent by a client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScenePatch {
    /// Raw elements to append. Each one is validated on its own.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<ElementUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connect: Vec<Connection>,
}

impl ScenePatch {
    /// Patch that appends already-typed elements.
    pub fn adding(elements: impl IntoIterator<Item = SceneElement>) -> Self {
        Self {
            add: elements.into_iter().filter_map(|element| serde_json::to_value(element).ok()).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty() && self.connect.is_empty()
    }
}

/// Field merge for one existing element. Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ElementUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Minimal delta describing which element ids changed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Delta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
}

#[derive(Debug, Default)]
struct DeltaBuilder {
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    updated: BTreeSet<String>,
}

impl DeltaBuilder {
    fn record_added(&mut self, id: &str) {
        self.removed.remove(id);
        self.updated.remove(id);
        self.added.insert(id.to_owned());
    }

    fn record_removed(&mut self, id: &str) {
        // Connect runs first, so an arrow can be created and removed by the same patch.
        if self.added.remove(id) {
            self.updated.remove(id);
            return;
        }
        self.updated.remove(id);
        self.removed.insert(id.to_owned());
    }

    fn record_updated(&mut self, id: &str) {
        if self.added.contains(id) || self.removed.contains(id) {
            return;
        }
        self.updated.insert(id.to_owned());
    }

    fn finish(self) -> Delta {
        Delta {
            added: self.added.into_iter().collect(),
            removed: self.removed.into_iter().collect(),
            updated: self.updated.into_iter().collect(),
        }
    }
}

/// An `add` entry that was not appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RejectedElement {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    pub scene: Scene,
    pub delta: Delta,
    pub rejected: Vec<RejectedElement>,
    /// Connections naming an element that does not exist.
    pub skipped_connects: usize,
}

#[derive(Debug)]
pub enum AddElementError {
    Malformed(serde_json::Error),
    Invalid(SceneElementError),
    DuplicateId { id: String },
}

impl fmt::Display for AddElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed element: {err}"),
            Self::Invalid(err) => write!(f, "invalid element: {err}"),
            Self::DuplicateId { id } => write!(f, "element id '{id}' already exists"),
        }
    }
}

impl std::error::Error for AddElementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::DuplicateId { .. } => None,
        }
    }
}

pub fn apply_patch(scene: &Scene, patch: &ScenePatch) -> PatchOutcome {
    let mut elements = scene.elements.clone();
    let mut selected_ids = scene.selected_ids.clone();
    let mut delta = DeltaBuilder::default();

    let skipped_connects = apply_connects(&mut elements, &patch.connect, &mut delta);
    apply_updates(&mut elements, &patch.update, &mut delta);
    apply_removes(&mut elements, &mut selected_ids, &patch.remove, &mut delta);
    let rejected = apply_adds(&mut elements, &patch.add, &mut delta);

    PatchOutcome {
        scene: Scene { elements, selected_ids },
        delta: delta.finish(),
        rejected,
        skipped_connects,
    }
}

// Stage implementations for `apply_patch`.
include!("ops_impl.rs");
