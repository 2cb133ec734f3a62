//! The [`Model`] trait: the property-access contract every graph backend
//! implements.
//!
//! Checking and normalization code is written only against this trait, so
//! a concrete domain (its kinds and properties) plugs in by implementing
//! it, with no reflection and no knowledge of concrete node types.
//!
//! Reference properties may form cycles. Traversals must track visited
//! nodes (see [`crate::traverse`]).

use crate::error::CoreError;
use crate::id::{ModelId, NodeId};
use crate::key::CanonicalKey;
use crate::schema::Schema;
use crate::value::{Slot, Value};

/// Property-level access to a graph of nodes.
pub trait Model: Send + Sync {
    // -------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------

    /// Identity of this model instance.
    fn id(&self) -> ModelId;

    /// The schema every mutation is checked against.
    fn schema(&self) -> &Schema;

    /// All nodes currently present, in a stable order.
    fn node_ids(&self) -> Vec<NodeId>;

    fn contains(&self, node: NodeId) -> bool;

    fn kind(&self, node: NodeId) -> Option<&str>;

    /// Display identity of the node. Stable for the node's lifetime.
    fn uri(&self, node: NodeId) -> Option<&str>;

    /// Names of the properties that currently hold at least one value.
    fn property_names(&self, node: NodeId) -> Vec<String>;

    /// The slot of a property; `None` when the node or the value is absent.
    fn get(&self, node: NodeId, property: &str) -> Option<&Slot>;

    fn canonical_key(&self, node: NodeId) -> Option<&CanonicalKey>;

    /// The node that currently owns `key`, if any.
    fn find_by_key(&self, key: &CanonicalKey) -> Option<NodeId>;

    // -------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------

    /// Sets (or clears, with `None`) a single-valued property.
    fn set(&mut self, node: NodeId, property: &str, value: Option<Value>) -> Result<(), CoreError>;

    /// Adds a value to a multi-valued property. Returns `false` when the
    /// value was already present.
    fn add(&mut self, node: NodeId, property: &str, value: Value) -> Result<bool, CoreError>;

    /// Removes a value from a property. Returns `false` when it was absent.
    fn remove(&mut self, node: NodeId, property: &str, value: &Value) -> Result<bool, CoreError>;

    /// Replaces every value of a property, dropping duplicates.
    fn replace_values(
        &mut self,
        node: NodeId,
        property: &str,
        values: Vec<Value>,
    ) -> Result<(), CoreError>;

    /// Removes a node and its canonical key.
    ///
    /// References held by other nodes are left alone; callers that remove
    /// nodes are responsible for repairing them afterwards.
    fn remove_node(&mut self, node: NodeId) -> Result<(), CoreError>;

    /// Assigns a canonical key, failing with [`CoreError::KeyOwned`] if a
    /// different node holds it.
    fn set_canonical_key(&mut self, node: NodeId, key: CanonicalKey) -> Result<(), CoreError>;

    // -------------------------------------------------------------------
    // Provided helpers
    // -------------------------------------------------------------------

    fn node_count(&self) -> usize {
        self.node_ids().len()
    }

    /// First text value of a property.
    fn text(&self, node: NodeId, property: &str) -> Option<&str> {
        self.get(node, property)?.first()?.as_text()
    }

    /// All text values of a property.
    fn texts(&self, node: NodeId, property: &str) -> Vec<&str> {
        self.get(node, property)
            .map(|slot| slot.texts().collect())
            .unwrap_or_default()
    }

    /// All references held by a property.
    fn refs(&self, node: NodeId, property: &str) -> Vec<NodeId> {
        self.get(node, property)
            .map(|slot| slot.refs().collect())
            .unwrap_or_default()
    }

    fn nodes_of_kind(&self, kind: &str) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|&id| self.kind(id) == Some(kind))
            .collect()
    }

    /// Properties of `node` whose schema range is a reference.
    fn reference_properties(&self, node: NodeId) -> Vec<String> {
        let Some(kind) = self.kind(node).and_then(|k| self.schema().kind(k)) else {
            return Vec::new();
        };
        kind.properties()
            .filter(|p| p.range.is_reference())
            .map(|p| p.name.clone())
            .collect()
    }
}
