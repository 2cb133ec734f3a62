//! Filling in missing display names.

use serde::{Deserialize, Serialize};

use pathcheck_core::{CoreError, Model, NodeId, Value};

fn default_display() -> String {
    "displayName".to_string()
}

fn default_standard() -> String {
    "standardName".to_string()
}

fn default_names() -> String {
    "name".to_string()
}

/// Which properties hold names, and which reported problem the fix resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayNameFix {
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_standard")]
    pub standard: String,
    #[serde(default = "default_names")]
    pub names: String,
    /// Reference property whose target's display name is copied when the
    /// node itself has no name to offer, e.g. an entity's reference.
    #[serde(default)]
    pub inherit_from: Option<String>,
    /// Rule and code marked fixed on every node that got a name.
    pub rule: String,
    pub code: String,
}

/// Sets the display name of every node that declares one but has none:
/// the standard name if present, otherwise the shortest other name. Nodes
/// still unnamed then take the display name of the node they reference
/// through `inherit_from`, if that one has one.
/// Returns the nodes changed with the name they got.
pub fn fix_display_names(
    model: &mut dyn Model,
    fix: &DisplayNameFix,
) -> Result<Vec<(NodeId, String)>, CoreError> {
    let mut fixed = Vec::new();
    for node in model.node_ids() {
        if !needs_name(model, node, fix) {
            continue;
        }
        if let Some(name) = pick_name(model, node, fix) {
            set_display(model, node, fix, &name)?;
            fixed.push((node, name));
        }
    }

    let Some(inherit_from) = &fix.inherit_from else {
        return Ok(fixed);
    };
    for node in model.node_ids() {
        if !needs_name(model, node, fix) {
            continue;
        }
        let inherited = model
            .refs(node, inherit_from)
            .into_iter()
            .filter_map(|target| model.text(target, &fix.display))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .min()
            .map(str::to_string);
        if let Some(name) = inherited {
            set_display(model, node, fix, &name)?;
            fixed.push((node, name));
        }
    }
    Ok(fixed)
}

/// The node's kind declares a display name and it is empty.
fn needs_name(model: &dyn Model, node: NodeId, fix: &DisplayNameFix) -> bool {
    let declared = model
        .kind(node)
        .and_then(|k| model.schema().kind(k))
        .is_some_and(|k| k.property(&fix.display).is_some());
    declared && !model.get(node, &fix.display).is_some_and(|s| !s.is_empty())
}

fn set_display(
    model: &mut dyn Model,
    node: NodeId,
    fix: &DisplayNameFix,
    name: &str,
) -> Result<(), CoreError> {
    let multi = model
        .kind(node)
        .and_then(|k| model.schema().kind(k))
        .and_then(|k| k.property(&fix.display))
        .is_some_and(|def| def.multi);
    if multi {
        model.add(node, &fix.display, Value::Text(name.to_string()))?;
    } else {
        model.set(node, &fix.display, Some(Value::Text(name.to_string())))?;
    }
    Ok(())
}

fn pick_name(model: &dyn Model, node: NodeId, fix: &DisplayNameFix) -> Option<String> {
    if let Some(standard) = model
        .text(node, &fix.standard)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(standard.to_string());
    }
    model
        .texts(node, &fix.names)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use pathcheck_core::{KindDef, MemoryModel, Range, Schema};

    use super::*;

    fn fix() -> DisplayNameFix {
        serde_json::from_str(r#"{"rule": "displayNameRule", "code": "no-display-name"}"#).unwrap()
    }

    fn model() -> MemoryModel {
        MemoryModel::new(
            Schema::new()
                .with_kind(
                    KindDef::new("Protein")
                        .single("displayName", Range::Text)
                        .single("standardName", Range::Text)
                        .multi("name", Range::Text),
                )
                .with_kind(
                    KindDef::new("Complex")
                        .single("displayName", Range::Text)
                        .multi("name", Range::Text)
                        .single("entityReference", Range::Reference),
                )
                .with_kind(KindDef::new("Note").multi("name", Range::Text)),
        )
    }

    #[test]
    fn prefers_standard_name() {
        let mut model = model();
        let p = model.add_node("Protein", "p").unwrap();
        model.set(p, "standardName", Some("Insulin".into())).unwrap();
        model.add(p, "name", "INS".into()).unwrap();
        let fixed = fix_display_names(&mut model, &fix()).unwrap();
        assert_eq!(fixed, vec![(p, "Insulin".to_string())]);
        assert_eq!(model.text(p, "displayName"), Some("Insulin"));
    }

    #[test]
    fn falls_back_to_shortest_name() {
        let mut model = model();
        let p = model.add_node("Protein", "p").unwrap();
        model.add(p, "name", "insulin precursor".into()).unwrap();
        model.add(p, "name", "INS".into()).unwrap();
        model.add(p, "name", "IN1".into()).unwrap();
        fix_display_names(&mut model, &fix()).unwrap();
        assert_eq!(model.text(p, "displayName"), Some("IN1"));
    }

    #[test]
    fn leaves_named_and_undeclared_nodes_alone() {
        let mut model = model();
        let p = model.add_node("Protein", "p").unwrap();
        model.set(p, "displayName", Some("kept".into())).unwrap();
        model.add(p, "name", "x".into()).unwrap();
        let n = model.add_node("Note", "n").unwrap();
        model.add(n, "name", "y".into()).unwrap();
        let empty = model.add_node("Protein", "e").unwrap();

        assert!(fix_display_names(&mut model, &fix()).unwrap().is_empty());
        assert_eq!(model.text(p, "displayName"), Some("kept"));
        assert!(model.get(empty, "displayName").is_none());
    }

    #[test]
    fn inherits_fixed_name_through_reference() {
        let mut model = model();
        let reference = model.add_node("Protein", "ref").unwrap();
        model.add(reference, "name", "INS".into()).unwrap();
        let entity = model.add_node("Complex", "entity").unwrap();
        model.set(entity, "entityReference", Some(Value::Ref(reference))).unwrap();
        let named = model.add_node("Complex", "named").unwrap();
        model.add(named, "name", "own".into()).unwrap();
        model.set(named, "entityReference", Some(Value::Ref(reference))).unwrap();

        let without = fix_display_names(&mut model.clone(), &fix()).unwrap();
        assert_eq!(without.len(), 2);

        let inherit = DisplayNameFix {
            inherit_from: Some("entityReference".to_string()),
            ..fix()
        };
        let fixed = fix_display_names(&mut model, &inherit).unwrap();
        assert_eq!(
            fixed,
            vec![
                (reference, "INS".to_string()),
                (named, "own".to_string()),
                (entity, "INS".to_string()),
            ]
        );
        assert_eq!(model.text(entity, "displayName"), Some("INS"));
    }
}
