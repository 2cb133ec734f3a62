//! Validation sessions.
//!
//! A [`Session`] owns the live problem set of one validation run. It is the
//! only object mutated concurrently during dispatch: the problem map is a
//! `DashMap`, and the not-fixed error count is an atomic updated while the
//! problem's entry lock is held, so the cutoff check never reads a torn
//! state.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pathcheck_core::Model;

use crate::identify::{Identifier, ObjectRef, UriIdentifier};
use crate::policy::{ProfilePolicy, SeverityPolicy};
use crate::problem::{Category, Problem, ProblemKey, Severity};
use crate::settings::Settings;

/// Unique session identifier (UUID v4 newtype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filter for [`Session::count_cases`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub object: Option<String>,
    pub rule: Option<String>,
    pub code: Option<String>,
    pub category: Option<Category>,
    pub ignore_warnings: bool,
    pub ignore_fixed: bool,
}

impl CaseFilter {
    pub fn object(mut self, object: &str) -> Self {
        self.object = Some(object.to_string());
        self
    }

    pub fn rule(mut self, rule: &str) -> Self {
        self.rule = Some(rule.to_string());
        self
    }

    pub fn code(mut self, code: &str) -> Self {
        self.code = Some(code.trim().to_lowercase());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn errors_only(mut self) -> Self {
        self.ignore_warnings = true;
        self
    }

    pub fn not_fixed(mut self) -> Self {
        self.ignore_fixed = true;
        self
    }
}

/// Aggregate counters over a session's problems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Number of distinct `(code, severity)` problems.
    pub problem_types: usize,
    pub total_cases: usize,
    /// Problems with at least one case not fixed.
    pub not_fixed_problems: usize,
    pub not_fixed_cases: usize,
    pub not_fixed_errors: usize,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "different types of problem: {} ({} not fixed); cases: {} ({} not fixed, {} not fixed errors)",
            self.problem_types,
            self.not_fixed_problems,
            self.total_cases,
            self.not_fixed_cases,
            self.not_fixed_errors
        )
    }
}

/// Settings plus live problem state of one validation run.
pub struct Session {
    id: SessionId,
    settings: Settings,
    policy: Arc<dyn SeverityPolicy>,
    identifier: Arc<dyn Identifier>,
    problems: DashMap<ProblemKey, Problem>,
    not_fixed_errors: AtomicUsize,
    attachments: DashSet<ObjectRef>,
    comments: DashSet<String>,
}

impl Session {
    /// A session with the default [`ProfilePolicy`].
    ///
    /// Registry reports take their severity from the session's policy, so a
    /// session used next to a [`Dispatcher`](crate::dispatch::Dispatcher)
    /// should share its policy: see `Dispatcher::new_session`.
    pub fn new(settings: Settings) -> Self {
        Session {
            id: SessionId(Uuid::new_v4()),
            settings,
            policy: Arc::new(ProfilePolicy::default()),
            identifier: Arc::new(UriIdentifier),
            problems: DashMap::new(),
            not_fixed_errors: AtomicUsize::new(0),
            attachments: DashSet::new(),
            comments: DashSet::new(),
        }
    }

    /// Uses `policy` for problem categories, default messages and the
    /// severity of registry-routed reports.
    pub fn with_policy(mut self, policy: Arc<dyn SeverityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_identifier(mut self, identifier: Arc<dyn Identifier>) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn description(&self) -> &str {
        &self.settings.description
    }

    pub fn policy(&self) -> &dyn SeverityPolicy {
        self.policy.as_ref()
    }

    // -------------------------------------------------------------------
    // Attachments
    // -------------------------------------------------------------------

    pub fn attach(&self, object: ObjectRef) -> bool {
        self.attachments.insert(object)
    }

    pub fn detach(&self, object: &ObjectRef) -> bool {
        self.attachments.remove(object).is_some()
    }

    /// True if `object` is attached, or lives in an attached model.
    pub fn is_attached(&self, object: &ObjectRef) -> bool {
        if self.attachments.contains(object) {
            return true;
        }
        match object {
            ObjectRef::Node { model, .. } => self.attachments.contains(&ObjectRef::model(*model)),
            _ => false,
        }
    }

    pub fn attachments(&self) -> Vec<ObjectRef> {
        self.attachments.iter().map(|o| o.key().clone()).collect()
    }

    // -------------------------------------------------------------------
    // Reporting
    // -------------------------------------------------------------------

    pub fn identify(&self, model: Option<&dyn Model>, object: &ObjectRef) -> String {
        self.identifier.identify(model, object)
    }

    /// Records one problem case.
    ///
    /// Dropped when `severity` is `Ignore` or below the session threshold.
    /// Returns whether the case was recorded.
    pub fn report(
        &self,
        rule: &str,
        severity: Severity,
        object: &str,
        code: &str,
        fixed: bool,
        message: &str,
    ) -> bool {
        if severity == Severity::Ignore || severity < self.settings.threshold {
            tracing::debug!(
                "dropped {} report '{}' from {} on {} (threshold {})",
                severity,
                code,
                rule,
                object,
                self.settings.threshold
            );
            return false;
        }

        let key = ProblemKey::new(code, severity);
        let mut entry = self.problems.entry(key.clone()).or_insert_with(|| {
            Problem::new(
                &key,
                self.policy.category(&key.code),
                self.policy.code_message(&key.code),
            )
        });
        let delta = entry.record(rule, object, message, fixed);
        if severity == Severity::Error {
            self.apply_error_delta(delta);
        }
        true
    }

    /// Marks an existing case fixed, looking under the warning problem first
    /// and then the error problem. Returns `false` when no case exists.
    pub fn mark_fixed(&self, object: &str, rule: &str, code: &str, message: Option<&str>) -> bool {
        for severity in [Severity::Warning, Severity::Error] {
            let key = ProblemKey::new(code, severity);
            let Some(mut problem) = self.problems.get_mut(&key) else {
                continue;
            };
            if let Some(delta) = problem.mark_fixed(rule, object, message) {
                if severity == Severity::Error {
                    self.apply_error_delta(delta);
                }
                return true;
            }
        }
        false
    }

    fn apply_error_delta(&self, delta: i64) {
        match delta {
            1 => {
                self.not_fixed_errors.fetch_add(1, Ordering::SeqCst);
            }
            -1 => {
                self.not_fixed_errors.fetch_sub(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    pub fn not_fixed_errors(&self) -> usize {
        self.not_fixed_errors.load(Ordering::SeqCst)
    }

    /// True once the max-errors cutoff is reached. Always false when the
    /// cutoff is 0.
    pub fn error_limit_reached(&self) -> bool {
        self.settings.max_errors > 0 && self.not_fixed_errors() >= self.settings.max_errors
    }

    /// Snapshot of all problems, ordered by `(code, severity)`.
    pub fn problems(&self) -> Vec<Problem> {
        let mut problems: Vec<Problem> = self.problems.iter().map(|e| e.value().clone()).collect();
        problems.sort_by_key(|p| p.key());
        problems
    }

    pub fn find_problem(&self, code: &str, severity: Severity) -> Option<Problem> {
        self.problems
            .get(&ProblemKey::new(code, severity))
            .map(|e| e.value().clone())
    }

    /// Counts cases matching `filter`.
    pub fn count_cases(&self, filter: &CaseFilter) -> usize {
        let code = filter.code.as_deref().map(|c| c.trim().to_lowercase());
        self.problems
            .iter()
            .filter(|e| !(filter.ignore_warnings && e.severity == Severity::Warning))
            .filter(|e| code.as_deref().map_or(true, |c| e.code == c))
            .filter(|e| filter.category.map_or(true, |c| e.category == c))
            .map(|e| {
                e.cases()
                    .filter(|case| !(filter.ignore_fixed && case.fixed))
                    .filter(|case| filter.rule.as_deref().map_or(true, |r| case.reported_by == r))
                    .filter(|case| filter.object.as_deref().map_or(true, |o| case.object == o))
                    .count()
            })
            .sum()
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary::default();
        for entry in self.problems.iter() {
            summary.problem_types += 1;
            summary.total_cases += entry.total_cases();
            let not_fixed = entry.not_fixed_cases();
            summary.not_fixed_cases += not_fixed;
            if not_fixed > 0 {
                summary.not_fixed_problems += 1;
            }
            if entry.severity == Severity::Error {
                summary.not_fixed_errors += not_fixed;
            }
        }
        summary
    }

    // -------------------------------------------------------------------
    // Comments
    // -------------------------------------------------------------------

    pub fn add_comment(&self, comment: impl Into<String>) {
        self.comments.insert(comment.into());
    }

    /// Comments in lexical order.
    pub fn comments(&self) -> Vec<String> {
        let mut comments: Vec<String> = self.comments.iter().map(|c| c.key().clone()).collect();
        comments.sort();
        comments
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("problems", &self.problems.len())
            .field("not_fixed_errors", &self.not_fixed_errors())
            .finish()
    }
}
