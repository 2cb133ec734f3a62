//! Copying property values from parents down to reachable children.

use serde::{Deserialize, Serialize};

use pathcheck_core::traverse::{reachable, reference_graph};
use pathcheck_core::{CoreError, Model, NodeId, Value};

/// One property to propagate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inference {
    pub property: String,
    /// Reference properties not followed when looking for children.
    #[serde(default)]
    pub skip: Vec<String>,
}

/// Copies `property` from every node that has it to every node reachable
/// from it that declares it. Multi-valued children get missing values
/// added; single-valued children are set only when empty. Only values
/// present before the pass are propagated.
///
/// Returns the number of values added.
pub fn infer_from_parents(model: &mut dyn Model, inference: &Inference) -> Result<usize, CoreError> {
    let graph = reference_graph(model, |p| inference.skip.iter().any(|s| s == p));
    let property = inference.property.as_str();

    let parents: Vec<(NodeId, Vec<Value>)> = model
        .node_ids()
        .into_iter()
        .filter_map(|node| {
            let slot = model.get(node, property)?;
            (!slot.is_empty()).then(|| (node, slot.values().to_vec()))
        })
        .collect();

    let mut added = 0;
    for (parent, values) in parents {
        for child in reachable(&graph, parent) {
            let Some(def) = model
                .kind(child)
                .and_then(|k| model.schema().kind(k))
                .and_then(|k| k.property(property))
                .cloned()
            else {
                continue;
            };
            let fitting: Vec<Value> = values
                .iter()
                .filter(|v| v.range() == def.range)
                .filter(|v| v.as_node().map_or(true, |id| model.contains(id)))
                .cloned()
                .collect();
            if def.multi {
                for value in fitting {
                    if model.add(child, property, value)? {
                        added += 1;
                    }
                }
            } else if model.get(child, property).map_or(true, |s| s.is_empty()) {
                if let Some(value) = fitting.into_iter().next() {
                    model.set(child, property, Some(value))?;
                    added += 1;
                }
            }
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use pathcheck_core::{KindDef, MemoryModel, Range, Schema};

    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .with_kind(
                KindDef::new("Pathway")
                    .multi("dataSource", Range::Text)
                    .multi("component", Range::Reference),
            )
            .with_kind(
                KindDef::new("Step")
                    .multi("dataSource", Range::Text)
                    .single("organism", Range::Text)
                    .multi("component", Range::Reference)
                    .multi("nextStep", Range::Reference),
            )
    }

    #[test]
    fn propagates_through_cycles() {
        let mut model = MemoryModel::new(schema());
        let pw = model.add_node("Pathway", "pw").unwrap();
        let a = model.add_node("Step", "a").unwrap();
        let b = model.add_node("Step", "b").unwrap();
        model.add(pw, "dataSource", "reactome".into()).unwrap();
        model.add(pw, "component", Value::Ref(a)).unwrap();
        model.add(a, "component", Value::Ref(b)).unwrap();
        model.add(b, "component", Value::Ref(a)).unwrap();
        model.add(b, "dataSource", "kegg".into()).unwrap();

        let inference = Inference {
            property: "dataSource".to_string(),
            skip: vec!["nextStep".to_string()],
        };
        let added = infer_from_parents(&mut model, &inference).unwrap();
        assert_eq!(model.texts(a, "dataSource"), vec!["reactome", "kegg"]);
        assert_eq!(model.texts(b, "dataSource"), vec!["kegg", "reactome"]);
        assert_eq!(added, 3);
        assert_eq!(infer_from_parents(&mut model, &inference).unwrap(), 0);
    }

    #[test]
    fn skips_excluded_properties_and_keeps_single_values() {
        let mut model = MemoryModel::new(schema());
        let a = model.add_node("Step", "a").unwrap();
        let b = model.add_node("Step", "b").unwrap();
        let c = model.add_node("Step", "c").unwrap();
        model.set(a, "organism", Some("human".into())).unwrap();
        model.add(a, "nextStep", Value::Ref(b)).unwrap();
        model.add(a, "component", Value::Ref(c)).unwrap();
        model.set(c, "organism", Some("mouse".into())).unwrap();

        let inference = Inference {
            property: "organism".to_string(),
            skip: vec!["nextStep".to_string()],
        };
        assert_eq!(infer_from_parents(&mut model, &inference).unwrap(), 0);
        assert!(model.get(b, "organism").is_none());
        assert_eq!(model.text(c, "organism"), Some("mouse"));
    }
}
