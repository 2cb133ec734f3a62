//! The rule contract and the context rules report through.

use std::fmt;

use pathcheck_core::{Model, NodeId};

use crate::identify::ObjectRef;
use crate::problem::Severity;
use crate::session::Session;

/// What a rule invocation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A single node, checked during the node phase.
    Node(NodeId),
    /// The whole model, checked during the graph phase.
    Graph,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(id) => write!(f, "node {}", id.0),
            Target::Graph => f.write_str("graph"),
        }
    }
}

/// A kind (and optionally one of its properties) a rule reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub kind: String,
    pub property: Option<String>,
}

impl Requirement {
    pub fn kind(kind: &str) -> Self {
        Requirement {
            kind: kind.to_string(),
            property: None,
        }
    }

    pub fn property(kind: &str, property: &str) -> Self {
        Requirement {
            kind: kind.to_string(),
            property: Some(property.to_string()),
        }
    }
}

/// A pluggable check.
///
/// Rules never return errors: everything they find goes through
/// [`RuleContext::report`]. A panic inside `check` is caught by the
/// dispatcher and recorded as an `internal-rule-error` problem.
pub trait Rule: Send + Sync {
    /// Unique name; also the key for severity lookup.
    fn name(&self) -> &str;

    fn can_check(&self, model: &dyn Model, target: Target) -> bool;

    fn check(&self, ctx: &RuleContext<'_>, target: Target);

    /// Kinds and properties this rule reads. Checked against the schema
    /// at registration.
    fn requirements(&self) -> Vec<Requirement> {
        Vec::new()
    }
}

/// One argument of a report message.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Text(String),
    Object(ObjectRef),
    Objects(Vec<ObjectRef>),
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl From<ObjectRef> for Arg {
    fn from(o: ObjectRef) -> Self {
        Arg::Object(o)
    }
}

/// Everything a rule invocation may touch.
pub struct RuleContext<'a> {
    session: &'a Session,
    model: &'a dyn Model,
    rule: &'a str,
    severity: Severity,
}

impl<'a> RuleContext<'a> {
    pub fn new(session: &'a Session, model: &'a dyn Model, rule: &'a str, severity: Severity) -> Self {
        RuleContext {
            session,
            model,
            rule,
            severity,
        }
    }

    pub fn model(&self) -> &'a dyn Model {
        self.model
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    pub fn rule_name(&self) -> &'a str {
        self.rule
    }

    /// The rule's effective severity for this session.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn node_ref(&self, node: NodeId) -> ObjectRef {
        ObjectRef::node(self.model.id(), node)
    }

    /// Reports a problem about `object`.
    ///
    /// `fixed` only sticks when the session has auto-fix enabled. Not-fixed
    /// errors are dropped once the session's max-errors cutoff is reached.
    pub fn report(&self, object: &ObjectRef, code: &str, fixed: bool, args: &[Arg]) -> bool {
        let fixed = fixed && self.session.settings().fix;
        if self.severity == Severity::Error && !fixed && self.session.error_limit_reached() {
            tracing::trace!("{}: '{}' dropped, error limit reached", self.rule, code);
            return false;
        }
        let id = self.session.identify(Some(self.model), object);
        let message = self.format_args(args);
        self.session.report(self.rule, self.severity, &id, code, fixed, &message)
    }

    pub fn report_node(&self, node: NodeId, code: &str, fixed: bool, args: &[Arg]) -> bool {
        self.report(&self.node_ref(node), code, fixed, args)
    }

    /// Joins arguments with `"; "`, resolving objects to their ids. Braces
    /// become parentheses.
    pub fn format_args(&self, args: &[Arg]) -> String {
        let parts: Vec<String> = args
            .iter()
            .map(|arg| match arg {
                Arg::Text(s) => s.clone(),
                Arg::Object(o) => self.session.identify(Some(self.model), o),
                Arg::Objects(objects) => objects
                    .iter()
                    .map(|o| self.session.identify(Some(self.model), o))
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .collect();
        parts.join("; ").replace('{', "(").replace('}', ")")
    }
}
