//! Canonical key derivation.

use pathcheck_core::{CanonicalKey, Model, NodeId};

use super::{KeySource, KeySuffix, Strategy, TERM_NAMESPACE};
use crate::synonyms::SynonymTable;

/// Derives the key `strategy` assigns to `node`, or `None` when the node has
/// no usable identifying properties.
pub fn derive_key(
    model: &dyn Model,
    strategy: &Strategy,
    synonyms: &SynonymTable,
    node: NodeId,
) -> Option<CanonicalKey> {
    let (namespace, local, suffixes) = match &strategy.key {
        KeySource::Direct {
            namespace,
            id,
            version,
            suffixes,
        } => {
            let (ns, local) = identifier(model, node, namespace, id, version.as_deref(), synonyms)?;
            (ns, local, suffixes)
        }
        KeySource::ViaReferences {
            property,
            target_kinds,
            namespace,
            id,
            version,
            preferred,
            only,
            fallback,
            suffixes,
        } => {
            let only: Vec<String> = only.iter().map(|n| synonyms.canonical(n)).collect();
            let mut candidates: Vec<(String, String)> = model
                .refs(node, property)
                .into_iter()
                .filter(|&target| {
                    model
                        .kind(target)
                        .is_some_and(|k| target_kinds.iter().any(|t| t == k))
                })
                .filter_map(|target| {
                    let found =
                        identifier(model, target, namespace, id, version.as_deref(), synonyms);
                    if found.is_none() {
                        tracing::warn!(
                            "skipping {} of {}: no {} or {}",
                            model.uri(target).unwrap_or_default(),
                            model.uri(node).unwrap_or_default(),
                            namespace,
                            id
                        );
                    }
                    found
                })
                .filter(|(ns, _)| only.is_empty() || only.contains(ns))
                .collect();

            let preferred: Vec<String> = preferred.iter().map(|p| synonyms.canonical(p)).collect();
            let rank = |ns: &str| {
                preferred
                    .iter()
                    .position(|p| p == ns)
                    .unwrap_or(preferred.len())
            };
            candidates.sort_by(|a, b| {
                rank(&a.0)
                    .cmp(&rank(&b.0))
                    .then_with(|| format!("{}{}", a.0, a.1).cmp(&format!("{}{}", b.0, b.1)))
            });
            match candidates.into_iter().next() {
                Some((ns, local)) => (ns, local, suffixes),
                None => {
                    let term = smallest(model.texts(node, fallback.as_deref()?))?;
                    (TERM_NAMESPACE.to_string(), term.to_string(), suffixes)
                }
            }
        }
    };

    let mut local = local;
    for suffix in suffixes {
        if let Some(part) = suffix_part(model, node, suffix) {
            local.push('_');
            local.push_str(&part);
        }
    }
    Some(CanonicalKey::new(&strategy.family, namespace, local))
}

fn smallest<'a>(values: Vec<&'a str>) -> Option<&'a str> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .min()
}

fn suffix_part(model: &dyn Model, node: NodeId, suffix: &KeySuffix) -> Option<String> {
    let values: Vec<&str> = model
        .refs(node, &suffix.reference)
        .into_iter()
        .filter(|&target| model.contains(target))
        .flat_map(|target| model.texts(target, &suffix.property))
        .collect();
    if suffix.join_all {
        let mut terms: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();
        terms.sort();
        terms.dedup();
        (!terms.is_empty()).then(|| terms.join("_"))
    } else {
        smallest(values).map(str::to_string)
    }
}

/// `(primary namespace, local id)` read from a node's own properties.
///
/// The local part is the id, suffixed with `_version` when a version is
/// present.
fn identifier(
    model: &dyn Model,
    node: NodeId,
    namespace: &str,
    id: &str,
    version: Option<&str>,
    synonyms: &SynonymTable,
) -> Option<(String, String)> {
    let ns = model.text(node, namespace).map(str::trim).filter(|s| !s.is_empty())?;
    let local = model.text(node, id).map(str::trim).filter(|s| !s.is_empty())?;
    let version = version
        .and_then(|v| model.text(node, v))
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let local = match version {
        Some(v) => format!("{local}_{v}"),
        None => local.to_string(),
    };
    Some((synonyms.canonical(ns), local))
}
