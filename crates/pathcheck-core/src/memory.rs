//! In-memory implementation of [`Model`].
//!
//! [`MemoryModel`] is the backend for tests and for callers that build a
//! graph directly. Nodes are kept in an `IndexMap` so enumeration order is
//! insertion order, which keeps checking and normalization output
//! reproducible.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::{ModelId, NodeId};
use crate::key::CanonicalKey;
use crate::model::Model;
use crate::schema::{PropertyDef, Schema};
use crate::value::{Slot, Value};

/// One stored node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub kind: String,
    pub uri: String,
    key: Option<CanonicalKey>,
    properties: IndexMap<String, Slot>,
}

/// A model held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryModel {
    id: ModelId,
    schema: Schema,
    nodes: IndexMap<NodeId, NodeRecord>,
    /// URI -> node lookup
    uris: HashMap<String, NodeId>,
    /// Canonical key -> owning node
    keys: HashMap<CanonicalKey, NodeId>,
    next_id: u32,
}

impl MemoryModel {
    pub fn new(schema: Schema) -> Self {
        MemoryModel {
            id: ModelId::new(),
            schema,
            nodes: IndexMap::new(),
            uris: HashMap::new(),
            keys: HashMap::new(),
            next_id: 0,
        }
    }

    /// Adds an empty node of a declared kind.
    pub fn add_node(&mut self, kind: &str, uri: &str) -> Result<NodeId, CoreError> {
        self.schema.require_kind(kind)?;
        if self.uris.contains_key(uri) {
            return Err(CoreError::DuplicateUri {
                uri: uri.to_string(),
            });
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeRecord {
                kind: kind.to_string(),
                uri: uri.to_string(),
                key: None,
                properties: IndexMap::new(),
            },
        );
        self.uris.insert(uri.to_string(), id);
        Ok(id)
    }

    pub fn node_by_uri(&self, uri: &str) -> Option<NodeId> {
        self.uris.get(uri).copied()
    }

    pub fn record(&self, node: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&node)
    }

    /// Resolves the declaration of `property` for `node` and checks that
    /// `value` (if any) fits it.
    fn checked_def(
        &self,
        node: NodeId,
        property: &str,
        value: Option<&Value>,
    ) -> Result<PropertyDef, CoreError> {
        let record = self
            .nodes
            .get(&node)
            .ok_or(CoreError::NodeNotFound { id: node })?;
        let def = self.schema.require_property(&record.kind, property)?;
        if let Some(value) = value {
            if value.range() != def.range {
                return Err(CoreError::RangeMismatch {
                    kind: record.kind.clone(),
                    property: property.to_string(),
                    expected: def.range,
                    actual: value.range(),
                });
            }
            if let Value::Ref(target) = value {
                if !self.nodes.contains_key(target) {
                    return Err(CoreError::NodeNotFound { id: *target });
                }
            }
        }
        Ok(def.clone())
    }

    fn cardinality(&self, node: NodeId, def: &PropertyDef) -> CoreError {
        CoreError::Cardinality {
            kind: self.kind(node).unwrap_or_default().to_string(),
            property: def.name.clone(),
            declared: if def.multi {
                "multi-valued"
            } else {
                "single-valued"
            },
        }
    }

    fn record_mut(&mut self, node: NodeId) -> Result<&mut NodeRecord, CoreError> {
        self.nodes
            .get_mut(&node)
            .ok_or(CoreError::NodeNotFound { id: node })
    }
}

impl Model for MemoryModel {
    fn id(&self) -> ModelId {
        self.id
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn kind(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|r| r.kind.as_str())
    }

    fn uri(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|r| r.uri.as_str())
    }

    fn property_names(&self, node: NodeId) -> Vec<String> {
        self.nodes
            .get(&node)
            .map(|r| {
                r.properties
                    .iter()
                    .filter(|(_, slot)| slot.len() > 0)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get(&self, node: NodeId, property: &str) -> Option<&Slot> {
        self.nodes.get(&node)?.properties.get(property)
    }

    fn canonical_key(&self, node: NodeId) -> Option<&CanonicalKey> {
        self.nodes.get(&node)?.key.as_ref()
    }

    fn find_by_key(&self, key: &CanonicalKey) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    fn set(&mut self, node: NodeId, property: &str, value: Option<Value>) -> Result<(), CoreError> {
        let def = self.checked_def(node, property, value.as_ref())?;
        if def.multi {
            return Err(self.cardinality(node, &def));
        }
        let record = self.record_mut(node)?;
        match value {
            Some(value) => {
                record
                    .properties
                    .entry(property.to_string())
                    .or_insert_with(|| Slot::new(false))
                    .insert(value);
            }
            None => {
                record.properties.shift_remove(property);
            }
        }
        Ok(())
    }

    fn add(&mut self, node: NodeId, property: &str, value: Value) -> Result<bool, CoreError> {
        let def = self.checked_def(node, property, Some(&value))?;
        if !def.multi {
            return Err(self.cardinality(node, &def));
        }
        let record = self.record_mut(node)?;
        Ok(record
            .properties
            .entry(property.to_string())
            .or_insert_with(|| Slot::new(true))
            .insert(value))
    }

    fn remove(&mut self, node: NodeId, property: &str, value: &Value) -> Result<bool, CoreError> {
        self.checked_def(node, property, None)?;
        let record = self.record_mut(node)?;
        let Some(slot) = record.properties.get_mut(property) else {
            return Ok(false);
        };
        let removed = slot.remove(value);
        if slot.len() == 0 {
            record.properties.shift_remove(property);
        }
        Ok(removed)
    }

    fn replace_values(
        &mut self,
        node: NodeId,
        property: &str,
        values: Vec<Value>,
    ) -> Result<(), CoreError> {
        let def = self.checked_def(node, property, None)?;
        for value in &values {
            self.checked_def(node, property, Some(value))?;
        }
        if !def.multi && values.len() > 1 {
            return Err(self.cardinality(node, &def));
        }
        let record = self.record_mut(node)?;
        if values.is_empty() {
            record.properties.shift_remove(property);
        } else {
            record
                .properties
                .entry(property.to_string())
                .or_insert_with(|| Slot::new(def.multi))
                .replace(values);
        }
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), CoreError> {
        let record = self
            .nodes
            .shift_remove(&node)
            .ok_or(CoreError::NodeNotFound { id: node })?;
        self.uris.remove(&record.uri);
        if let Some(key) = record.key {
            self.keys.remove(&key);
        }
        Ok(())
    }

    fn set_canonical_key(&mut self, node: NodeId, key: CanonicalKey) -> Result<(), CoreError> {
        if let Some(&owner) = self.keys.get(&key) {
            if owner != node {
                return Err(CoreError::KeyOwned { key, owner });
            }
            return Ok(());
        }
        let record = self.record_mut(node)?;
        let previous = record.key.replace(key.clone());
        if let Some(previous) = previous {
            self.keys.remove(&previous);
        }
        self.keys.insert(key, node);
        Ok(())
    }
}
