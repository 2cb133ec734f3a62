//! Dangling-reference repair.

use serde::{Deserialize, Serialize};

use pathcheck_core::traverse::dangling_references;
use pathcheck_core::{CoreError, Model, NodeId, Value};

/// A reference that pointed at a node no longer in the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingRef {
    pub holder: NodeId,
    pub property: String,
    pub target: NodeId,
}

/// Drops every reference whose target is missing.
pub fn repair_dangling(model: &mut dyn Model) -> Result<Vec<DanglingRef>, CoreError> {
    let dangling = dangling_references(model);
    let mut repaired = Vec::with_capacity(dangling.len());
    for (holder, property, target) in dangling {
        model.remove(holder, &property, &Value::Ref(target))?;
        repaired.push(DanglingRef {
            holder,
            property,
            target,
        });
    }
    Ok(repaired)
}
