//! Rule dispatch, problem aggregation and identity normalization over
//! [`pathcheck_core::Model`] graphs.

pub mod cluster;
pub mod dispatch;
pub mod error;
pub mod identify;
pub mod normalize;
pub mod policy;
pub mod problem;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod session;
pub mod settings;
pub mod synonyms;

pub use cluster::{cluster_by, merge_overlapping};
pub use dispatch::{exclusive, Dispatcher, ValidationSummary, INTERNAL_RULE_ERROR};
pub use error::CheckError;
pub use identify::{Identifier, ObjectRef, UriIdentifier};
pub use normalize::{NodeState, NormalizationReport, Normalizer, NormalizerConfig};
pub use policy::{ProfilePolicy, SeverityPolicy};
pub use problem::{Category, Problem, ProblemCase, ProblemKey, Severity, UnknownSeverity};
pub use registry::SessionRegistry;
pub use rule::{Arg, Requirement, Rule, RuleContext, Target};
pub use session::{CaseFilter, Session, SessionId, SessionSummary};
pub use settings::Settings;
pub use synonyms::SynonymTable;
