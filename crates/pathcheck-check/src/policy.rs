//! Severity policy: which rules run, how loudly, and what codes mean.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CheckError;
use crate::problem::{Category, Severity};

/// Message used for codes with no catalog entry.
pub const NO_DESCRIPTION: &str = "No description.";

/// Maps rule names (under an optional profile) to severities.
pub trait SeverityPolicy: Send + Sync {
    /// The severity a rule reports with under `profile`. `Ignore` disables
    /// the rule.
    fn effective_severity(&self, rule: &str, profile: Option<&str>) -> Severity;

    /// Human-readable description of a rule.
    fn describe(&self, rule: &str) -> Option<String>;

    /// Category of a problem code.
    fn category(&self, _code: &str) -> Category {
        Category::Information
    }

    /// Default message of a problem code.
    fn code_message(&self, _code: &str) -> String {
        NO_DESCRIPTION.to_string()
    }
}

/// Table-driven policy with per-profile overrides.
///
/// Lookup order for a rule: the profile's override, then the default
/// table, then `fallback`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePolicy {
    #[serde(default)]
    pub defaults: BTreeMap<String, Severity>,
    /// profile name -> rule -> severity
    #[serde(default)]
    pub profiles: BTreeMap<String, BTreeMap<String, Severity>>,
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
    /// Keyed by lower-case code.
    #[serde(default)]
    pub categories: BTreeMap<String, Category>,
    /// Keyed by lower-case code.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
    #[serde(default)]
    pub fallback: Severity,
}

impl ProfilePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, CheckError> {
        serde_json::from_str(text).map_err(|e| CheckError::InvalidSettings {
            name: "policy".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn with_default(mut self, rule: &str, severity: Severity) -> Self {
        self.defaults.insert(rule.to_string(), severity);
        self
    }

    pub fn with_override(mut self, profile: &str, rule: &str, severity: Severity) -> Self {
        self.profiles
            .entry(profile.to_string())
            .or_default()
            .insert(rule.to_string(), severity);
        self
    }

    pub fn with_description(mut self, rule: &str, description: &str) -> Self {
        self.descriptions
            .insert(rule.to_string(), description.to_string());
        self
    }

    pub fn with_code(mut self, code: &str, category: Category, message: &str) -> Self {
        let code = code.trim().to_lowercase();
        self.categories.insert(code.clone(), category);
        self.messages.insert(code, message.to_string());
        self
    }
}

impl SeverityPolicy for ProfilePolicy {
    fn effective_severity(&self, rule: &str, profile: Option<&str>) -> Severity {
        profile
            .and_then(|p| self.profiles.get(p))
            .and_then(|overrides| overrides.get(rule))
            .or_else(|| self.defaults.get(rule))
            .copied()
            .unwrap_or(self.fallback)
    }

    fn describe(&self, rule: &str) -> Option<String> {
        self.descriptions.get(rule).cloned()
    }

    fn category(&self, code: &str) -> Category {
        self.categories
            .get(&code.trim().to_lowercase())
            .copied()
            .unwrap_or_default()
    }

    fn code_message(&self, code: &str) -> String {
        self.messages
            .get(&code.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_overrides_default() {
        let policy = ProfilePolicy::new()
            .with_default("displayNameRule", Severity::Warning)
            .with_override("strict", "displayNameRule", Severity::Error)
            .with_override("lenient", "displayNameRule", Severity::Ignore);

        assert_eq!(policy.effective_severity("displayNameRule", None), Severity::Warning);
        assert_eq!(
            policy.effective_severity("displayNameRule", Some("strict")),
            Severity::Error
        );
        assert_eq!(
            policy.effective_severity("displayNameRule", Some("lenient")),
            Severity::Ignore
        );
        assert_eq!(
            policy.effective_severity("displayNameRule", Some("unknown")),
            Severity::Warning
        );
    }

    #[test]
    fn unknown_rule_uses_fallback() {
        let policy = ProfilePolicy::new();
        assert_eq!(policy.effective_severity("anyRule", None), Severity::Error);
        assert_eq!(policy.describe("anyRule"), None);
    }

    #[test]
    fn code_catalog_is_case_insensitive() {
        let policy = ProfilePolicy::new().with_code(
            "Illegal-Term",
            Category::Specification,
            "term is not in the vocabulary",
        );
        assert_eq!(policy.category("ILLEGAL-TERM"), Category::Specification);
        assert_eq!(policy.code_message("illegal-term"), "term is not in the vocabulary");
        assert_eq!(policy.category("other"), Category::Information);
        assert_eq!(policy.code_message("other"), NO_DESCRIPTION);
    }

    #[test]
    fn loads_from_json() {
        let policy = ProfilePolicy::from_json(
            r#"{
                "defaults": {"cvRule": "error"},
                "profiles": {"notstrict": {"cvRule": "warning"}},
                "categories": {"illegal-term": "specification"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            policy.effective_severity("cvRule", Some("notstrict")),
            Severity::Warning
        );
        assert_eq!(policy.category("illegal-term"), Category::Specification);
        assert!(ProfilePolicy::from_json("{not json").is_err());
    }
}
