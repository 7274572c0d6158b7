// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

fn element_center(elements: &[SceneElement], id: &str) -> Option<(f64, f64)> {
    elements.iter().find(|element| element.id == id).map(|element| element.bounds().center())
}

fn connection_id(existing: &HashSet<String>, from: &str, to: &str) -> String {
    let mut k = 0usize;
    loop {
        let candidate = format!("conn:{from}->{to}:{k}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        k += 1;
    }
}

fn apply_connects(
    elements: &mut Vec<SceneElement>,
    connects: &[Connection],
    delta: &mut DeltaBuilder,
) -> usize {
    let mut ids: HashSet<String> = elements.iter().map(|element| element.id.clone()).collect();
    let mut skipped = 0usize;

    for connection in connects {
        let (Some(start), Some(end)) =
            (element_center(elements, &connection.from), element_center(elements, &connection.to))
        else {
            skipped += 1;
            continue;
        };

        let id = connection_id(&ids, &connection.from, &connection.to);
        let mut arrow = SceneElement::new(id.clone(), ElementKind::Arrow)
            .at(start.0, start.1, end.0 - start.0, end.1 - start.1)
            .connecting(&connection.from, &connection.to);
        arrow.text = connection.label.clone().filter(|label| !label.trim().is_empty());

        delta.record_added(&id);
        ids.insert(id);
        elements.push(arrow);
    }

    skipped
}

fn apply_updates(elements: &mut [SceneElement], updates: &[ElementUpdate], delta: &mut DeltaBuilder) {
    for update in updates {
        let Some(element) = elements.iter_mut().find(|element| element.id == update.id) else {
            continue;
        };

        if let Some(text) = &update.text {
            element.text = Some(text.clone());
        }
        if let Some(x) = update.x.filter(|value| value.is_finite()) {
            element.x = x;
        }
        if let Some(y) = update.y.filter(|value| value.is_finite()) {
            element.y = y;
        }
        if let Some(w) = update.w.filter(|value| value.is_finite()) {
            element.width = w;
        }
        if let Some(h) = update.h.filter(|value| value.is_finite()) {
            element.height = h;
        }
        delta.record_updated(&update.id);
    }
}

fn apply_removes(
    elements: &mut Vec<SceneElement>,
    selected_ids: &mut Vec<String>,
    removes: &[String],
    delta: &mut DeltaBuilder,
) {
    if removes.is_empty() {
        return;
    }
    let doomed: HashSet<&str> = removes.iter().map(String::as_str).collect();

    elements.retain(|element| {
        if doomed.contains(element.id.as_str()) {
            delta.record_removed(&element.id);
            false
        } else {
            true
        }
    });
    selected_ids.retain(|id| !doomed.contains(id.as_str()));
}

fn parse_added_element(raw: &Value, existing: &HashSet<String>) -> Result<SceneElement, AddElementError> {
    let element: SceneElement =
        serde_json::from_value(raw.clone()).map_err(AddElementError::Malformed)?;
    element.validate().map_err(AddElementError::Invalid)?;
    if existing.contains(&element.id) {
        return Err(AddElementError::DuplicateId { id: element.id });
    }
    Ok(element)
}

fn apply_adds(
    elements: &mut Vec<SceneElement>,
    adds: &[Value],
    delta: &mut DeltaBuilder,
) -> Vec<RejectedElement> {
    let mut ids: HashSet<String> = elements.iter().map(|element| element.id.clone()).collect();
    let mut rejected = Vec::new();

    for (index, raw) in adds.iter().enumerate() {
        match parse_added_element(raw, &ids) {
            Ok(element) => {
                delta.record_added(&element.id);
                ids.insert(element.id.clone());
                elements.push(element);
            }
            Err(err) => rejected.push(RejectedElement { index, reason: err.to_string() }),
        }
    }

    rejected
}
