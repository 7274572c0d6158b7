// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Element type as reported by the rendering surface.
///
/// Unknown types are kept as [`ElementKind::Other`] so a round trip through the patch merger
/// never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Rectangle,
    Diamond,
    Ellipse,
    Text,
    Arrow,
    Line,
    Image,
    Freedraw,
    Other(String),
}

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Diamond => "diamond",
            Self::Ellipse => "ellipse",
            Self::Text => "text",
            Self::Arrow => "arrow",
            Self::Line => "line",
            Self::Image => "image",
            Self::Freedraw => "freedraw",
            Self::Other(other) => other,
        }
    }

    /// Shapes that can carry a label and therefore show up as digest nodes.
    pub fn is_text_bearing(&self) -> bool {
        matches!(self, Self::Rectangle | Self::Diamond | Self::Ellipse | Self::Text)
    }
}

impl From<String> for ElementKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "rectangle" | "box" | "rect" => Self::Rectangle,
            "diamond" => Self::Diamond,
            "ellipse" => Self::Ellipse,
            "text" => Self::Text,
            "arrow" => Self::Arrow,
            "line" => Self::Line,
            "image" => Self::Image,
            "freedraw" => Self::Freedraw,
            _ => Self::Other(value),
        }
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of a visual scene.
///
/// Attributes this crate does not interpret (stroke colors, seeds, versions, ...) are carried
/// in `extra` and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneElement {
    pub id: String,
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ref: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SceneElement {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            text: None,
            start_ref: None,
            end_ref: None,
            extra: Map::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn connecting(mut self, start_ref: impl Into<String>, end_ref: impl Into<String>) -> Self {
        self.start_ref = Some(start_ref.into());
        self.end_ref = Some(end_ref.into());
        self
    }

    /// Non-empty (after trimming) text, if any.
    pub fn label(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.trim().is_empty())
    }

    /// Axis-aligned bounds; arrows and lines may have negative extents.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height).normalized()
    }

    pub fn validate(&self) -> Result<(), SceneElementError> {
        if self.id.trim().is_empty() {
            return Err(SceneElementError::EmptyId);
        }
        for (field, value) in
            [("x", self.x), ("y", self.y), ("width", self.width), ("height", self.height)]
        {
            if !value.is_finite() {
                return Err(SceneElementError::NonFiniteGeometry { field });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneElementError {
    EmptyId,
    NonFiniteGeometry { field: &'static str },
}

impl fmt::Display for SceneElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => f.write_str("element id must not be empty"),
            Self::NonFiniteGeometry { field } => write!(f, "element {field} must be finite"),
        }
    }
}

impl std::error::Error for SceneElementError {}

/// Read-only snapshot of the canvas: ordered elements plus the current selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub elements: Vec<SceneElement>,
    #[serde(default)]
    pub selected_ids: Vec<String>,
}

impl Scene {
    pub fn new(elements: Vec<SceneElement>) -> Self {
        Self { elements, selected_ids: Vec::new() }
    }

    pub fn with_selection<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn element(&self, id: &str) -> Option<&SceneElement> {
        self.elements.iter().find(|element| element.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.element(id).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 { (self.x + self.width, -self.width) } else { (self.x, self.width) };
        let (y, height) =
            if self.height < 0.0 { (self.y + self.height, -self.height) } else { (self.y, self.height) };
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Open-interval overlap test: rectangles that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let a = self.normalized();
        let b = other.normalized();
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Rect::new(x, y, a.right().max(b.right()) - x, a.bottom().max(b.bottom()) - y)
    }

    pub fn center(&self) -> (f64, f64) {
        let r = self.normalized();
        (r.x + r.width / 2.0, r.y + r.height / 2.0)
    }
}
