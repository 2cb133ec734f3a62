//! Configuration and startup errors for pathcheck-check.
//!
//! Only misconfiguration surfaces as `Err`: problems found in the data are
//! recorded in a [`crate::session::Session`], and a panicking rule becomes an
//! `internal-rule-error` problem instead of an error here.

use pathcheck_core::CoreError;

/// Errors produced while configuring or driving a check.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// A rule requires a kind the schema does not declare.
    #[error("rule '{rule}' requires unknown kind '{kind}'")]
    UnknownKind {
        /// Name of the rule being registered.
        rule: String,
        /// The undeclared kind.
        kind: String,
    },

    /// A rule requires a property the kind does not declare.
    #[error("rule '{rule}' requires unknown property '{kind}.{property}'")]
    UnknownProperty {
        /// Name of the rule being registered.
        rule: String,
        kind: String,
        property: String,
    },

    /// Two rules registered under the same name.
    #[error("rule '{name}' is already registered")]
    DuplicateRule { name: String },

    /// A settings value could not be parsed or is out of range.
    #[error("invalid setting {name}: {reason}")]
    InvalidSettings { name: String, reason: String },

    /// A worker task could not be joined or the pool was closed.
    #[error("worker pool failure: {reason}")]
    WorkerPool { reason: String },

    /// The model is still shared with running tasks.
    #[error("model is still shared and cannot be mutated")]
    ModelShared,

    #[error(transparent)]
    Core(#[from] CoreError),
}
