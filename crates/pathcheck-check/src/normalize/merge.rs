//! Merging a node into a same-kind survivor.

use pathcheck_core::{CoreError, Model, NodeId, Value};

/// Folds `loser` into `survivor` and removes `loser`.
///
/// Multi-valued properties are unioned. Single-valued ones are copied only
/// when the survivor has no value. Every reference to `loser` is rewritten
/// to `survivor`. Returns the number of rewritten reference properties.
pub fn merge_into(model: &mut dyn Model, survivor: NodeId, loser: NodeId) -> Result<usize, CoreError> {
    let redirect = |value: &Value| match value {
        Value::Ref(id) if *id == loser => Value::Ref(survivor),
        other => other.clone(),
    };

    for property in model.property_names(loser) {
        let Some(slot) = model.get(loser, &property).cloned() else {
            continue;
        };
        let values: Vec<Value> = slot
            .values()
            .iter()
            .map(redirect)
            .filter(|v| v.as_node().map_or(true, |id| model.contains(id)))
            .collect();
        if slot.is_multi() {
            for value in values {
                model.add(survivor, &property, value)?;
            }
        } else if model.get(survivor, &property).map_or(true, |s| s.is_empty()) {
            if let Some(value) = values.into_iter().find(|v| !v.is_blank()) {
                model.set(survivor, &property, Some(value))?;
            }
        }
    }

    let mut rewritten = 0;
    for node in model.node_ids() {
        if node == loser {
            continue;
        }
        for property in model.reference_properties(node) {
            let Some(slot) = model.get(node, &property) else {
                continue;
            };
            if !slot.contains(&Value::Ref(loser)) {
                continue;
            }
            let multi = slot.is_multi();
            model.remove(node, &property, &Value::Ref(loser))?;
            if multi {
                model.add(node, &property, Value::Ref(survivor))?;
            } else {
                model.set(node, &property, Some(Value::Ref(survivor)))?;
            }
            rewritten += 1;
        }
    }

    model.remove_node(loser)?;
    Ok(rewritten)
}
