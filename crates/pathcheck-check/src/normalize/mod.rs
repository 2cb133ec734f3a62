//! Identity normalization.
//!
//! The [`Normalizer`] gives nodes canonical keys, merges same-kind nodes
//! that share a key, and repairs references left dangling by the merges.
//! Strategies run in configured order; within a strategy nodes are visited
//! in model order, so the first node to claim a key owns it.
//!
//! Per-node states: `Unexamined -> Keyed -> Merged | Resolved`, or
//! `Conflicted` when the key is owned by a node of another kind.
//!
//! Running `normalize` twice leaves the model as the first run did.

pub mod display_name;
pub mod infer;
pub mod key;
pub mod merge;
pub mod repair;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pathcheck_core::{CanonicalKey, Model, NodeId, Schema};

use crate::error::CheckError;
use crate::problem::Severity;
use crate::session::Session;
use crate::synonyms::SynonymTable;

pub use display_name::{fix_display_names, DisplayNameFix};
pub use infer::{infer_from_parents, Inference};
pub use key::derive_key;
pub use merge::merge_into;
pub use repair::{repair_dangling, DanglingRef};

/// Rule name normalizer problems are reported under.
pub const NORMALIZER: &str = "normalizer";
pub const CANNOT_NORMALIZE: &str = "cannot-normalize";
pub const MERGE_CONFLICT: &str = "merge-conflict";
pub const DANGLING_REFERENCE: &str = "dangling-reference";

/// Where a strategy reads a node's identifier from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KeySource {
    /// Namespace, id and optional version properties on the node itself.
    Direct {
        namespace: String,
        id: String,
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        suffixes: Vec<KeySuffix>,
    },
    /// The best of the nodes referenced through `property`.
    ViaReferences {
        property: String,
        target_kinds: Vec<String>,
        namespace: String,
        id: String,
        #[serde(default)]
        version: Option<String>,
        /// Namespaces tried first, in order.
        #[serde(default)]
        preferred: Vec<String>,
        /// When non-empty, only referenced nodes in these namespaces count.
        #[serde(default)]
        only: Vec<String>,
        /// Text property on the node itself, used when no referenced node
        /// yields an identifier. The key namespace is then [`TERM_NAMESPACE`].
        #[serde(default)]
        fallback: Option<String>,
        #[serde(default)]
        suffixes: Vec<KeySuffix>,
    },
}

/// Namespace of keys built from a [`KeySource::ViaReferences`] fallback.
pub const TERM_NAMESPACE: &str = "term";

/// Extra key part read through a reference of the keyed node, appended to
/// the local id as `_value`.
///
/// Takes the smallest text value of `property` among the referenced nodes.
/// With `join_all`, every value is taken instead, sorted, lower-cased and
/// joined with `_`. Contributes nothing when no value is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySuffix {
    pub reference: String,
    pub property: String,
    #[serde(default)]
    pub join_all: bool,
}

/// One normalization phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub kinds: Vec<String>,
    /// Key family; keys of different families never collide.
    pub family: String,
    pub key: KeySource,
}

/// A `(rule, code)` pair marked fixed by a normalizer task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixRef {
    pub rule: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub display_name: Option<DisplayNameFix>,
    #[serde(default)]
    pub inferences: Vec<Inference>,
    /// Marked fixed on both nodes of every merge.
    #[serde(default)]
    pub merge_fixes: Vec<FixRef>,
}

impl NormalizerConfig {
    pub fn from_json(text: &str) -> Result<Self, CheckError> {
        serde_json::from_str(text).map_err(|e| CheckError::InvalidSettings {
            name: "normalizer".to_string(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Unexamined,
    Keyed,
    /// Folded into another node and removed.
    Merged,
    /// Owns its key.
    Resolved,
    /// Its key is owned by a node of another kind.
    Conflicted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub key: CanonicalKey,
    pub survivor: NodeId,
    pub loser: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub key: CanonicalKey,
    pub owner: NodeId,
    pub node: NodeId,
}

/// What one [`Normalizer::normalize`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub states: BTreeMap<NodeId, NodeState>,
    pub merges: Vec<MergeRecord>,
    /// Nodes that took a new key.
    pub renames: Vec<(NodeId, CanonicalKey)>,
    pub conflicts: Vec<Conflict>,
    pub repaired: Vec<DanglingRef>,
    pub inferred: usize,
    pub fixed_names: Vec<NodeId>,
}

impl NormalizationReport {
    /// True when the run changed nothing in the model.
    pub fn is_noop(&self) -> bool {
        self.merges.is_empty()
            && self.renames.is_empty()
            && self.repaired.is_empty()
            && self.inferred == 0
            && self.fixed_names.is_empty()
    }
}

pub struct Normalizer {
    config: NormalizerConfig,
    synonyms: Arc<SynonymTable>,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig, synonyms: Arc<SynonymTable>) -> Self {
        Normalizer { config, synonyms }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Checks that every kind and property the configuration names exists.
    pub fn check_schema(&self, schema: &Schema) -> Result<(), CheckError> {
        for strategy in &self.config.strategies {
            let mut properties: Vec<&str> = Vec::new();
            let suffixes = match &strategy.key {
                KeySource::Direct {
                    namespace,
                    id,
                    version,
                    suffixes,
                } => {
                    properties.extend([namespace.as_str(), id.as_str()]);
                    properties.extend(version.as_deref());
                    suffixes
                }
                KeySource::ViaReferences {
                    property,
                    target_kinds,
                    namespace,
                    id,
                    version,
                    fallback,
                    suffixes,
                    ..
                } => {
                    properties.push(property);
                    properties.extend(fallback.as_deref());
                    for target in target_kinds {
                        require(schema, &strategy.name, target, namespace)?;
                        require(schema, &strategy.name, target, id)?;
                        if let Some(version) = version {
                            require(schema, &strategy.name, target, version)?;
                        }
                    }
                    suffixes
                }
            };
            properties.extend(suffixes.iter().map(|s| s.reference.as_str()));
            for kind in &strategy.kinds {
                for property in &properties {
                    require(schema, &strategy.name, kind, property)?;
                }
            }
        }
        Ok(())
    }

    /// Normalizes `model` in place, recording problems into `session` when
    /// one is given.
    pub fn normalize(
        &self,
        session: Option<&Session>,
        model: &mut dyn Model,
    ) -> Result<NormalizationReport, CheckError> {
        let mut report = NormalizationReport::default();
        for node in model.node_ids() {
            report.states.insert(node, NodeState::Unexamined);
        }

        for strategy in &self.config.strategies {
            self.run_strategy(strategy, session, model, &mut report)?;
        }

        if let Some(fix) = &self.config.display_name {
            for (node, name) in fix_display_names(model, fix)? {
                tracing::debug!("display name of {} set to '{}'", uri(model, node), name);
                if let Some(session) = session {
                    let id = uri(model, node);
                    session.mark_fixed(&id, &fix.rule, &fix.code, Some(&format!("display name set to '{name}'")));
                }
                report.fixed_names.push(node);
            }
        }

        for inference in &self.config.inferences {
            let added = infer_from_parents(model, inference)?;
            tracing::debug!("inferred {} values of {}", added, inference.property);
            report.inferred += added;
        }

        report.repaired = repair_dangling(model)?;
        for dangling in &report.repaired {
            let holder = uri(model, dangling.holder);
            tracing::info!(
                "removed dangling {} reference from {} to node {}",
                dangling.property,
                holder,
                dangling.target.0
            );
            if let Some(session) = session {
                session.report(
                    NORMALIZER,
                    Severity::Warning,
                    &holder,
                    DANGLING_REFERENCE,
                    true,
                    &format!("removed {} reference to missing node {}", dangling.property, dangling.target.0),
                );
            }
        }

        Ok(report)
    }

    fn run_strategy(
        &self,
        strategy: &Strategy,
        session: Option<&Session>,
        model: &mut dyn Model,
        report: &mut NormalizationReport,
    ) -> Result<(), CheckError> {
        let nodes: Vec<NodeId> = model
            .node_ids()
            .into_iter()
            .filter(|&n| model.kind(n).is_some_and(|k| strategy.kinds.iter().any(|s| s == k)))
            .collect();
        tracing::info!("normalizing {} ({} nodes)", strategy.name, nodes.len());

        for node in nodes {
            if !model.contains(node) {
                continue;
            }
            let Some(key) = derive_key(model, strategy, &self.synonyms, node) else {
                let id = uri(model, node);
                tracing::warn!("{}: no identifier for {}", strategy.name, id);
                if let Some(session) = session {
                    session.report(
                        NORMALIZER,
                        Severity::Warning,
                        &id,
                        CANNOT_NORMALIZE,
                        false,
                        &format!("{}: no identifying properties", strategy.name),
                    );
                }
                continue;
            };
            report.states.insert(node, NodeState::Keyed);

            if model.canonical_key(node) == Some(&key) {
                report.states.insert(node, NodeState::Resolved);
                continue;
            }

            match model.find_by_key(&key) {
                Some(owner) if owner != node => {
                    if model.kind(owner) == model.kind(node) {
                        self.merge(session, model, report, key, owner, node)?;
                    } else {
                        conflict(session, model, report, key, owner, node);
                    }
                }
                _ => {
                    tracing::debug!("{} keyed {}", uri(model, node), key);
                    model.set_canonical_key(node, key.clone())?;
                    report.states.insert(node, NodeState::Resolved);
                    report.renames.push((node, key));
                }
            }
        }
        Ok(())
    }

    fn merge(
        &self,
        session: Option<&Session>,
        model: &mut dyn Model,
        report: &mut NormalizationReport,
        key: CanonicalKey,
        survivor: NodeId,
        loser: NodeId,
    ) -> Result<(), CheckError> {
        let survivor_id = uri(model, survivor);
        let loser_id = uri(model, loser);
        let rewritten = merge_into(model, survivor, loser)?;
        tracing::debug!(
            "merged {} into {} as {} ({} references rewritten)",
            loser_id,
            survivor_id,
            key,
            rewritten
        );
        if let Some(session) = session {
            for fix in &self.config.merge_fixes {
                let message = format!("merged {loser_id} into {survivor_id}");
                session.mark_fixed(&survivor_id, &fix.rule, &fix.code, Some(&message));
                session.mark_fixed(&loser_id, &fix.rule, &fix.code, Some(&message));
            }
        }
        report.states.insert(loser, NodeState::Merged);
        report.merges.push(MergeRecord {
            key,
            survivor,
            loser,
        });
        Ok(())
    }
}

fn conflict(
    session: Option<&Session>,
    model: &dyn Model,
    report: &mut NormalizationReport,
    key: CanonicalKey,
    owner: NodeId,
    node: NodeId,
) {
    let owner_id = uri(model, owner);
    let node_id = uri(model, node);
    let message = format!(
        "{} ({}) and {} ({}) share key {}",
        node_id,
        model.kind(node).unwrap_or_default(),
        owner_id,
        model.kind(owner).unwrap_or_default(),
        key
    );
    tracing::warn!("merge conflict: {}", message);
    if let Some(session) = session {
        session.report(NORMALIZER, Severity::Error, &node_id, MERGE_CONFLICT, false, &message);
    }
    report.states.insert(node, NodeState::Conflicted);
    report.conflicts.push(Conflict { key, owner, node });
}

fn uri(model: &dyn Model, node: NodeId) -> String {
    model
        .uri(node)
        .map(str::to_string)
        .unwrap_or_else(|| format!("node {}", node.0))
}

fn require(schema: &Schema, strategy: &str, kind: &str, property: &str) -> Result<(), CheckError> {
    schema
        .require_property(kind, property)
        .map(|_| ())
        .map_err(|e| match e {
            pathcheck_core::CoreError::UnknownKind { kind } => CheckError::UnknownKind {
                rule: strategy.to_string(),
                kind,
            },
            pathcheck_core::CoreError::UnknownProperty { kind, property } => {
                CheckError::UnknownProperty {
                    rule: strategy.to_string(),
                    kind,
                    property,
                }
            }
            other => CheckError::Core(other),
        })
}

#[cfg(test)]
mod tests {
    use pathcheck_core::{KindDef, MemoryModel, Range, Value};

    use super::*;
    use crate::settings::Settings;

    fn schema() -> Schema {
        Schema::new()
            .with_kind(
                KindDef::new("UnificationRef")
                    .single("db", Range::Text)
                    .single("id", Range::Text),
            )
            .with_kind(
                KindDef::new("Protein")
                    .single("displayName", Range::Text)
                    .multi("xref", Range::Reference),
            )
    }

    fn config() -> NormalizerConfig {
        NormalizerConfig::from_json(
            r#"{
                "strategies": [{
                    "name": "xrefs",
                    "kinds": ["UnificationRef"],
                    "family": "xref",
                    "key": {"source": "direct", "namespace": "db", "id": "id"}
                }],
                "merge_fixes": [{"rule": "duplicateXrefRule", "code": "duplicate-xref"}]
            }"#,
        )
        .unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(
            config(),
            Arc::new(SynonymTable::new(vec![vec!["uniprot", "uniprotkb"]], vec!["uniprot"])),
        )
    }

    #[test]
    fn config_checked_against_schema() {
        assert!(normalizer().check_schema(&schema()).is_ok());
        let other = Schema::new().with_kind(KindDef::new("UnificationRef").single("db", Range::Text));
        assert!(matches!(
            normalizer().check_schema(&other),
            Err(CheckError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn missing_identifier_reported_and_left_unexamined() {
        let mut model = MemoryModel::new(schema());
        let x = model.add_node("UnificationRef", "x").unwrap();
        model.set(x, "db", Some("uniprot".into())).unwrap();
        let session = Session::new(Settings::default());

        let report = normalizer().normalize(Some(&session), &mut model).unwrap();
        assert_eq!(report.states[&x], NodeState::Unexamined);
        let problem = session.find_problem(CANNOT_NORMALIZE, Severity::Warning).unwrap();
        assert_eq!(problem.total_cases(), 1);
    }

    #[test]
    fn merge_marks_configured_fixes() {
        let mut model = MemoryModel::new(schema());
        let a = model.add_node("UnificationRef", "a").unwrap();
        let b = model.add_node("UnificationRef", "b").unwrap();
        for (x, db) in [(a, "uniprot"), (b, "UniProtKB")] {
            model.set(x, "db", Some(db.into())).unwrap();
            model.set(x, "id", Some("P1".into())).unwrap();
        }
        let p = model.add_node("Protein", "p").unwrap();
        model.add(p, "xref", Value::Ref(b)).unwrap();

        let session = Session::new(Settings::default());
        session.report("duplicateXrefRule", Severity::Error, "b", "duplicate-xref", false, "dup");

        let report = normalizer().normalize(Some(&session), &mut model).unwrap();
        assert_eq!(report.merges.len(), 1);
        assert_eq!(report.states[&b], NodeState::Merged);
        assert_eq!(report.states[&a], NodeState::Resolved);
        assert_eq!(model.refs(p, "xref"), vec![a]);
        assert_eq!(session.not_fixed_errors(), 0);
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut model = MemoryModel::new(schema());
        let a = model.add_node("UnificationRef", "a").unwrap();
        model.set(a, "db", Some("uniprot".into())).unwrap();
        model.set(a, "id", Some("P1".into())).unwrap();

        let first = normalizer().normalize(None, &mut model).unwrap();
        assert_eq!(first.renames.len(), 1);
        let second = normalizer().normalize(None, &mut model).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.states[&a], NodeState::Resolved);
    }
}
