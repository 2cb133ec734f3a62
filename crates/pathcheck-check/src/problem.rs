//! Problems and problem cases.
//!
//! A [`Problem`] is one kind of issue, identified by `(code, severity)`. Each
//! occurrence against one object by one rule is a [`ProblemCase`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How serious a problem is. Ordered `Ignore < Warning < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rule disabled; never recorded.
    Ignore,
    Warning,
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Ignore => "ignore",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// A severity name that is not `ignore`, `warning` or `error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity '{value}'")]
pub struct UnknownSeverity {
    pub value: String,
}

impl std::str::FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Severity::Ignore),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(UnknownSeverity {
                value: other.to_string(),
            }),
        }
    }
}

/// Broad classification of a problem code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Syntax,
    Specification,
    Recommendation,
    #[default]
    Information,
}

/// Identity of a problem inside a session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProblemKey {
    /// Always lower case.
    pub code: String,
    pub severity: Severity,
}

impl ProblemKey {
    pub fn new(code: &str, severity: Severity) -> Self {
        ProblemKey {
            code: code.trim().to_lowercase(),
            severity,
        }
    }
}

/// Identity of a case inside a problem: `(reported_by, object)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaseKey {
    pub reported_by: String,
    pub object: String,
}

/// One occurrence of a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemCase {
    /// Name of the rule (or engine component) that reported it.
    pub reported_by: String,
    /// Identifier of the offending object.
    pub object: String,
    pub message: String,
    pub fixed: bool,
}

impl ProblemCase {
    pub fn key(&self) -> CaseKey {
        CaseKey {
            reported_by: self.reported_by.clone(),
            object: self.object.clone(),
        }
    }
}

/// A deduplicated issue kind with its cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub code: String,
    pub severity: Severity,
    pub category: Category,
    /// Default message for the code.
    pub message: String,
    #[serde(with = "case_list")]
    cases: BTreeMap<CaseKey, ProblemCase>,
}

impl Problem {
    pub fn new(key: &ProblemKey, category: Category, message: impl Into<String>) -> Self {
        Problem {
            code: key.code.clone(),
            severity: key.severity,
            category,
            message: message.into(),
            cases: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> ProblemKey {
        ProblemKey {
            code: self.code.clone(),
            severity: self.severity,
        }
    }

    /// Adds or updates the case for `(reported_by, object)`.
    ///
    /// The fixed flag always takes the new value. The message is replaced
    /// only when the case re-occurs unfixed with a non-blank message.
    /// Returns the change in the number of not-fixed cases (-1, 0 or 1).
    pub fn record(&mut self, reported_by: &str, object: &str, message: &str, fixed: bool) -> i64 {
        let key = CaseKey {
            reported_by: reported_by.to_string(),
            object: object.to_string(),
        };
        match self.cases.get_mut(&key) {
            Some(case) => {
                let delta = match (case.fixed, fixed) {
                    (false, true) => -1,
                    (true, false) => 1,
                    _ => 0,
                };
                case.fixed = fixed;
                if !fixed && !message.trim().is_empty() {
                    case.message = message.to_string();
                }
                delta
            }
            None => {
                self.cases.insert(
                    key,
                    ProblemCase {
                        reported_by: reported_by.to_string(),
                        object: object.to_string(),
                        message: message.to_string(),
                        fixed,
                    },
                );
                if fixed {
                    0
                } else {
                    1
                }
            }
        }
    }

    /// Marks an existing case fixed. Returns the not-fixed delta, or `None`
    /// when there is no such case.
    pub fn mark_fixed(&mut self, reported_by: &str, object: &str, message: Option<&str>) -> Option<i64> {
        let key = CaseKey {
            reported_by: reported_by.to_string(),
            object: object.to_string(),
        };
        let case = self.cases.get_mut(&key)?;
        let delta = if case.fixed { 0 } else { -1 };
        case.fixed = true;
        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            case.message = message.to_string();
        }
        Some(delta)
    }

    pub fn case(&self, reported_by: &str, object: &str) -> Option<&ProblemCase> {
        self.cases.get(&CaseKey {
            reported_by: reported_by.to_string(),
            object: object.to_string(),
        })
    }

    /// Cases ordered by `(reported_by, object)`.
    pub fn cases(&self) -> impl Iterator<Item = &ProblemCase> {
        self.cases.values()
    }

    pub fn total_cases(&self) -> usize {
        self.cases.len()
    }

    pub fn not_fixed_cases(&self) -> usize {
        self.cases.values().filter(|c| !c.fixed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Serializes the case map as a plain list.
mod case_list {
    use super::*;

    pub fn serialize<S: Serializer>(
        cases: &BTreeMap<CaseKey, ProblemCase>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(cases.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<CaseKey, ProblemCase>, D::Error> {
        let list = Vec::<ProblemCase>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|case| (case.key(), case)).collect())
    }
}
