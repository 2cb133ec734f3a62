//! Namespace synonym table.
//!
//! Maps every known spelling of a namespace (database name) to one primary
//! name. Names are compared trimmed and lower-cased.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::cluster::merge_overlapping;
use crate::error::CheckError;

/// Synonym groups as loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymConfig {
    /// Each group lists its preferred name first.
    #[serde(default)]
    pub groups: Vec<Vec<String>>,
    /// Officially recognised names. Empty means every name is official.
    #[serde(default)]
    pub official: Vec<String>,
}

/// Trims and lower-cases a name.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    /// name -> primary name
    primary: HashMap<String, String>,
    /// primary name -> all names of the group
    groups: BTreeMap<String, BTreeSet<String>>,
    official: BTreeSet<String>,
}

impl SynonymTable {
    pub fn new<G, S>(groups: G, official: impl IntoIterator<Item = S>) -> Self
    where
        G: IntoIterator,
        G::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups: Vec<Vec<String>> = groups
            .into_iter()
            .map(|g| {
                g.into_iter()
                    .map(|name| normalize_name(name.as_ref()))
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|g| !g.is_empty())
            .collect();
        let official: BTreeSet<String> = official
            .into_iter()
            .map(|name| normalize_name(name.as_ref()))
            .collect();
        let preferred: BTreeSet<&String> = groups.iter().filter_map(|g| g.first()).collect();

        let mut table = SynonymTable {
            official: official.clone(),
            ..SynonymTable::default()
        };
        for merged in merge_overlapping(groups.iter().map(|g| g.iter().cloned())) {
            let candidates: Vec<&String> = merged.iter().filter(|n| preferred.contains(n)).collect();
            let primary = candidates
                .iter()
                .find(|n| official.contains(n.as_str()))
                .or_else(|| candidates.first())
                .map(|n| n.to_string())
                .or_else(|| merged.iter().next().cloned());
            let Some(primary) = primary else {
                continue;
            };
            for name in &merged {
                table.primary.insert(name.clone(), primary.clone());
            }
            table.groups.insert(primary, merged);
        }
        table
    }

    pub fn from_config(config: &SynonymConfig) -> Self {
        Self::new(&config.groups, &config.official)
    }

    pub fn from_json(text: &str) -> Result<Self, CheckError> {
        let config: SynonymConfig =
            serde_json::from_str(text).map_err(|e| CheckError::InvalidSettings {
                name: "synonyms".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_config(&config))
    }

    /// Primary name of a known name.
    pub fn primary(&self, name: &str) -> Option<&str> {
        self.primary.get(&normalize_name(name)).map(String::as_str)
    }

    /// Primary name if known, otherwise the normalized name itself.
    pub fn canonical(&self, name: &str) -> String {
        self.primary(name)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_name(name))
    }

    /// Every name in the group of `name`, sorted. Empty for unknown names.
    pub fn synonyms(&self, name: &str) -> Vec<&str> {
        self.primary(name)
            .and_then(|p| self.groups.get(p))
            .map(|g| g.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn are_synonyms(&self, a: &str, b: &str) -> bool {
        normalize_name(a) == normalize_name(b)
            || matches!((self.primary(a), self.primary(b)), (Some(x), Some(y)) if x == y)
    }

    /// True when an official list exists and `name` is not on it.
    pub fn is_unofficial(&self, name: &str) -> bool {
        !self.official.is_empty() && !self.official.contains(&normalize_name(name))
    }
}
