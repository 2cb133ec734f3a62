//! Stable ID newtypes for models and their nodes.
//!
//! [`NodeId`] is only meaningful inside the model that allocated it; pair it
//! with a [`ModelId`] whenever an identity has to cross model boundaries.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable node identifier, allocated by a model and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Model identity (UUID v4 newtype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelId(pub Uuid);

impl ModelId {
    /// Allocates a fresh random model id.
    pub fn new() -> Self {
        ModelId(Uuid::new_v4())
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(format!("{}", NodeId(7)), "7");
    }

    #[test]
    fn node_ids_order_by_value() {
        let mut ids = vec![NodeId(3), NodeId(1), NodeId(2)];
        ids.sort();
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn model_ids_are_unique() {
        assert_ne!(ModelId::new(), ModelId::new());
    }

    #[test]
    fn serde_roundtrip() {
        let node = NodeId(42);
        let json = serde_json::to_string(&node).unwrap();
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);

        let model = ModelId::new();
        let json = serde_json::to_string(&model).unwrap();
        let back: ModelId = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
