//! Object references and how they are turned into report identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use pathcheck_core::{Model, ModelId, NodeId};

/// Something a problem can be reported against, or a session attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectRef {
    /// A whole model.
    Model { model: ModelId },
    /// A node inside a model.
    Node { model: ModelId, node: NodeId },
    /// Anything outside a model (an input file, a URL).
    External { name: String },
}

impl ObjectRef {
    pub fn model(model: ModelId) -> Self {
        ObjectRef::Model { model }
    }

    pub fn node(model: ModelId, node: NodeId) -> Self {
        ObjectRef::Node { model, node }
    }

    pub fn external(name: impl Into<String>) -> Self {
        ObjectRef::External { name: name.into() }
    }

    /// The model this object lives in, if any.
    pub fn model_id(&self) -> Option<ModelId> {
        match self {
            ObjectRef::Model { model } | ObjectRef::Node { model, .. } => Some(*model),
            ObjectRef::External { .. } => None,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Model { model } => write!(f, "{model}"),
            ObjectRef::Node { model, node } => write!(f, "{model}#{}", node.0),
            ObjectRef::External { name } => f.write_str(name),
        }
    }
}

/// Produces the id string recorded in problem cases.
///
/// Must be stable for the lifetime of a session.
pub trait Identifier: Send + Sync {
    fn identify(&self, model: Option<&dyn Model>, object: &ObjectRef) -> String;
}

/// Identifies nodes by their URI, everything else by its display form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriIdentifier;

impl Identifier for UriIdentifier {
    fn identify(&self, model: Option<&dyn Model>, object: &ObjectRef) -> String {
        if let (ObjectRef::Node { model: owner, node }, Some(model)) = (object, model) {
            if model.id() == *owner {
                if let Some(uri) = model.uri(*node) {
                    return uri.to_string();
                }
            }
        }
        object.to_string()
    }
}

#[cfg(test)]
mod tests {
    use pathcheck_core::{KindDef, MemoryModel, Schema};

    use super::*;

    #[test]
    fn nodes_identified_by_uri() {
        let mut model = MemoryModel::new(Schema::new().with_kind(KindDef::new("Protein")));
        let p = model.add_node("Protein", "http://example.org/p1").unwrap();
        let object = ObjectRef::node(model.id(), p);
        assert_eq!(
            UriIdentifier.identify(Some(&model), &object),
            "http://example.org/p1"
        );
    }

    #[test]
    fn falls_back_to_display_form() {
        let model = ModelId::new();
        let object = ObjectRef::node(model, NodeId(4));
        assert_eq!(
            UriIdentifier.identify(None, &object),
            format!("{model}#4")
        );
        assert_eq!(
            UriIdentifier.identify(None, &ObjectRef::external("input.owl")),
            "input.owl"
        );
    }
}
