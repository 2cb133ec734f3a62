//! Core error types for pathcheck-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! every way a model mutation can violate the schema or the model's
//! identity bookkeeping.

use thiserror::Error;

use crate::id::NodeId;
use crate::key::CanonicalKey;
use crate::schema::Range;

/// Core errors produced by the pathcheck-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The kind is not declared in the schema.
    #[error("unknown kind: '{kind}'")]
    UnknownKind { kind: String },

    /// The property is not declared for the kind.
    #[error("unknown property: '{kind}.{property}'")]
    UnknownProperty { kind: String, property: String },

    /// A value does not fit the property's declared range.
    #[error("range mismatch: '{kind}.{property}' expects {expected}, got {actual}")]
    RangeMismatch {
        kind: String,
        property: String,
        expected: Range,
        actual: Range,
    },

    /// A single-valued operation was used on a multi-valued property or
    /// the other way around.
    #[error("cardinality mismatch: '{kind}.{property}' is {declared}")]
    Cardinality {
        kind: String,
        property: String,
        declared: &'static str,
    },

    /// A node id was not found in the model.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// Another node already uses this URI.
    #[error("duplicate uri: '{uri}'")]
    DuplicateUri { uri: String },

    /// Another node already owns this canonical key.
    #[error("canonical key {key} already owned by NodeId({owner})", owner = owner.0)]
    KeyOwned { key: CanonicalKey, owner: NodeId },
}
