//! Rule registration and concurrent dispatch.
//!
//! A [`Dispatcher`] is built per caller: register rules, then await
//! [`Dispatcher::validate`] with a session and a shared model. Dispatch
//! runs in two phases:
//!
//! 1. **Node phase**: one blocking task per node, gated by a semaphore of
//!    `workers` permits. A node's applicable rules run sequentially in
//!    registration order inside its task.
//! 2. **Graph phase**: after every node task has joined, each rule that
//!    checks the whole graph runs in its own task.
//!
//! Once the session's max-errors cutoff is reached no new invocation
//! starts; in-flight ones finish. A panic inside a rule is caught at the
//! invocation boundary and recorded as an `internal-rule-error` problem.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use pathcheck_core::{Model, NodeId, Schema};

use crate::error::CheckError;
use crate::identify::ObjectRef;
use crate::policy::SeverityPolicy;
use crate::problem::Severity;
use crate::rule::{Rule, RuleContext, Target};
use crate::session::Session;
use crate::settings::Settings;

/// Code recorded when a rule panics.
pub const INTERNAL_RULE_ERROR: &str = "internal-rule-error";

/// Outcome of one [`Dispatcher::validate`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub problem_types: usize,
    pub total_cases: usize,
    pub not_fixed_problems: usize,
    pub not_fixed_cases: usize,
    pub not_fixed_errors: usize,
    /// The max-errors cutoff prevented some invocations.
    pub stopped_early: bool,
    /// Rule invocations that ran `check`.
    pub invocations: usize,
    /// Invocations that panicked.
    pub panics: usize,
}

#[derive(Default)]
struct RunStats {
    invocations: AtomicUsize,
    panics: AtomicUsize,
}

type ActiveRules = Arc<Vec<(Arc<dyn Rule>, Severity)>>;

/// Registered rules plus the policy that decides how they report.
pub struct Dispatcher {
    policy: Arc<dyn SeverityPolicy>,
    schema: Schema,
    rules: Vec<Arc<dyn Rule>>,
    workers: Option<usize>,
}

impl Dispatcher {
    pub fn new(policy: Arc<dyn SeverityPolicy>, schema: &Schema) -> Self {
        Dispatcher {
            policy,
            schema: schema.clone(),
            rules: Vec::new(),
            workers: None,
        }
    }

    /// A session sharing this dispatcher's policy, so severities routed
    /// through a [`SessionRegistry`](crate::registry::SessionRegistry) match
    /// the ones rules report with.
    pub fn new_session(&self, settings: Settings) -> Session {
        Session::new(settings).with_policy(self.policy.clone())
    }

    /// Overrides the session's worker count.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Registers a rule after checking its requirements against the schema.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), CheckError> {
        let name = rule.name().to_string();
        if self.rules.iter().any(|r| r.name() == name) {
            return Err(CheckError::DuplicateRule { name });
        }
        for requirement in rule.requirements() {
            let Some(kind) = self.schema.kind(&requirement.kind) else {
                return Err(CheckError::UnknownKind {
                    rule: name,
                    kind: requirement.kind,
                });
            };
            if let Some(property) = requirement.property {
                if kind.property(&property).is_none() {
                    return Err(CheckError::UnknownProperty {
                        rule: name,
                        kind: requirement.kind,
                        property,
                    });
                }
            }
        }
        tracing::debug!("registered rule {}", name);
        self.rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter()
    }

    /// Rules that are not `Ignore` under `profile`, with their severity.
    fn active_rules(&self, profile: Option<&str>) -> Vec<(Arc<dyn Rule>, Severity)> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let severity = self.policy.effective_severity(rule.name(), profile);
                if severity == Severity::Ignore {
                    tracing::debug!("rule {} ignored under profile {:?}", rule.name(), profile);
                    None
                } else {
                    Some((rule.clone(), severity))
                }
            })
            .collect()
    }

    /// Checks `model` with every active rule, recording into `session`.
    pub async fn validate<M: Model + 'static>(
        &self,
        session: &Arc<Session>,
        model: &Arc<M>,
    ) -> Result<ValidationSummary, CheckError> {
        let stats = Arc::new(RunStats::default());

        if session.error_limit_reached() {
            tracing::info!(
                "session {} already at {} not-fixed errors; nothing to do",
                session.id(),
                session.not_fixed_errors()
            );
            return Ok(summarize(session, &stats, true));
        }

        let active: ActiveRules = Arc::new(self.active_rules(session.settings().profile.as_deref()));
        let workers = self.workers.unwrap_or(session.settings().workers).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut stopped = false;

        // Node phase
        let nodes = model.node_ids();
        tracing::debug!(
            "node phase: {} nodes, {} active rules, {} workers",
            nodes.len(),
            active.len(),
            workers
        );
        let mut tasks = JoinSet::new();
        for node in nodes {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| CheckError::WorkerPool {
                    reason: e.to_string(),
                })?;
            if session.error_limit_reached() {
                stopped = true;
                break;
            }
            let session = session.clone();
            let model = model.clone();
            let active = active.clone();
            let stats = stats.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                check_node(&session, model.as_ref(), &active, node, &stats);
            });
            reap_finished(&mut tasks)?;
        }
        join_all(&mut tasks).await?;

        // Graph phase
        if !stopped && !session.error_limit_reached() {
            tracing::debug!("graph phase");
            for (rule, severity) in active.iter() {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| CheckError::WorkerPool {
                        reason: e.to_string(),
                    })?;
                if session.error_limit_reached() {
                    stopped = true;
                    break;
                }
                let session = session.clone();
                let model = model.clone();
                let rule = rule.clone();
                let severity = *severity;
                let stats = stats.clone();
                tasks.spawn_blocking(move || {
                    let _permit = permit;
                    invoke(&session, model.as_ref(), rule.as_ref(), severity, Target::Graph, &stats);
                });
            }
            join_all(&mut tasks).await?;
        }

        stopped |= session.error_limit_reached();
        if stopped {
            tracing::info!(
                "session {} stopped at {} not-fixed errors (limit {})",
                session.id(),
                session.not_fixed_errors(),
                session.settings().max_errors
            );
        }

        record_kind_counts(session, model.as_ref());
        Ok(summarize(session, &stats, stopped))
    }
}

/// Runs every active rule on one node, in registration order.
fn check_node(
    session: &Session,
    model: &dyn Model,
    active: &[(Arc<dyn Rule>, Severity)],
    node: NodeId,
    stats: &RunStats,
) {
    for (rule, severity) in active {
        if session.error_limit_reached() {
            return;
        }
        invoke(session, model, rule.as_ref(), *severity, Target::Node(node), stats);
    }
}

/// One rule invocation, isolated from panics.
fn invoke(
    session: &Session,
    model: &dyn Model,
    rule: &dyn Rule,
    severity: Severity,
    target: Target,
    stats: &RunStats,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if !rule.can_check(model, target) {
            return false;
        }
        tracing::trace!("{} on {}", rule.name(), target);
        let ctx = RuleContext::new(session, model, rule.name(), severity);
        rule.check(&ctx, target);
        true
    }));

    match outcome {
        Ok(false) => {}
        Ok(true) => {
            stats.invocations.fetch_add(1, Ordering::Relaxed);
        }
        Err(payload) => {
            stats.invocations.fetch_add(1, Ordering::Relaxed);
            stats.panics.fetch_add(1, Ordering::Relaxed);
            let object = match target {
                Target::Node(node) => ObjectRef::node(model.id(), node),
                Target::Graph => ObjectRef::model(model.id()),
            };
            let object = session.identify(Some(model), &object);
            let reason = panic_message(payload.as_ref());
            tracing::error!("rule {} panicked on {}: {}", rule.name(), object, reason);
            session.report(
                rule.name(),
                Severity::Error,
                &object,
                INTERNAL_RULE_ERROR,
                false,
                &format!("rule {} failed on {}: {}", rule.name(), object, reason),
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) -> Result<(), CheckError> {
    while let Some(res) = tasks.try_join_next() {
        res.map_err(|e| CheckError::WorkerPool {
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

async fn join_all(tasks: &mut JoinSet<()>) -> Result<(), CheckError> {
    while let Some(res) = tasks.join_next().await {
        res.map_err(|e| CheckError::WorkerPool {
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn record_kind_counts(session: &Session, model: &dyn Model) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let ids = model.node_ids();
    for &node in &ids {
        if let Some(kind) = model.kind(node) {
            *counts.entry(kind).or_default() += 1;
        }
    }
    for (kind, count) in counts {
        session.add_comment(format!("{kind}: {count} nodes"));
    }
    session.add_comment(format!("model {}: {} nodes checked", model.id(), ids.len()));
}

fn summarize(session: &Session, stats: &RunStats, stopped_early: bool) -> ValidationSummary {
    let summary = session.summary();
    ValidationSummary {
        problem_types: summary.problem_types,
        total_cases: summary.total_cases,
        not_fixed_problems: summary.not_fixed_problems,
        not_fixed_cases: summary.not_fixed_cases,
        not_fixed_errors: summary.not_fixed_errors,
        stopped_early,
        invocations: stats.invocations.load(Ordering::Relaxed),
        panics: stats.panics.load(Ordering::Relaxed),
    }
}

/// Exclusive access to a model after validation, for normalization.
///
/// Fails with [`CheckError::ModelShared`] while any other handle exists.
pub fn exclusive<M>(model: &mut Arc<M>) -> Result<&mut M, CheckError> {
    Arc::get_mut(model).ok_or(CheckError::ModelShared)
}
