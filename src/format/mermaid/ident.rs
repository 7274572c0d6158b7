// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MermaidIdentError {
    Empty,
    Reserved,
    InvalidChar { ch: char },
}

impl fmt::Display for MermaidIdentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("must not be empty"),
            Self::Reserved => f.write_str("is a reserved Mermaid keyword"),
            Self::InvalidChar { ch } => write!(f, "contains invalid character: '{ch}'"),
        }
    }
}

// `end` closes a subgraph no matter where it appears; the others confuse the statement parser.
const RESERVED: &[&str] = &["end", "subgraph", "graph", "flowchart", "style", "class", "click"];

pub(super) fn validate_mermaid_ident(ident: &str) -> Result<(), MermaidIdentError> {
    if ident.is_empty() {
        return Err(MermaidIdentError::Empty);
    }
    if let Some(ch) = ident.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(MermaidIdentError::InvalidChar { ch });
    }
    if RESERVED.iter().any(|word| word.eq_ignore_ascii_case(ident)) {
        return Err(MermaidIdentError::Reserved);
    }
    Ok(())
}

/// Maps arbitrary text onto `[A-Za-z0-9_]+`.
fn sanitize_mermaid_ident(raw: &str) -> String {
    let mut out: String = raw
        .trim()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    if out.chars().all(|ch| ch == '_') {
        out = "n".to_owned();
    }
    if validate_mermaid_ident(&out) == Err(MermaidIdentError::Reserved) {
        out.push('_');
    }
    out
}

/// Hands out unique Mermaid identifiers for one compiled document.
#[derive(Debug, Default)]
pub(super) struct IdentAllocator {
    used: HashSet<String>,
}

impl IdentAllocator {
    pub(super) fn allocate(&mut self, raw: &str) -> String {
        let base = if validate_mermaid_ident(raw).is_ok() {
            raw.to_owned()
        } else {
            sanitize_mermaid_ident(raw)
        };

        if self.used.insert(base.clone()) {
            return base;
        }
        let mut suffix = 2usize;
        loop {
            let candidate = format!("{base}_{suffix}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_reports_first_invalid_char() {
        assert_eq!(validate_mermaid_ident(""), Err(MermaidIdentError::Empty));
        assert_eq!(
            validate_mermaid_ident("a-b c"),
            Err(MermaidIdentError::InvalidChar { ch: '-' })
        );
        assert_eq!(validate_mermaid_ident("End"), Err(MermaidIdentError::Reserved));
        assert_eq!(validate_mermaid_ident("step_1"), Ok(()));
    }

    #[test]
    fn allocator_keeps_valid_idents_and_sanitizes_the_rest() {
        let mut idents = IdentAllocator::default();
        assert_eq!(idents.allocate("plan"), "plan");
        assert_eq!(idents.allocate("Phase 1: Research"), "Phase_1__Research");
        assert_eq!(idents.allocate("end"), "end_");
        assert_eq!(idents.allocate("!!!"), "n");
    }

    #[test]
    fn allocator_disambiguates_collisions() {
        let mut idents = IdentAllocator::default();
        assert_eq!(idents.allocate("a b"), "a_b");
        assert_eq!(idents.allocate("a-b"), "a_b_2");
        assert_eq!(idents.allocate("a_b"), "a_b_3");
    }
}
