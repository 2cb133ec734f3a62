//! Controlled-vocabulary term checks.
//!
//! [`CvTermRule`] checks the text values of one property on one kind
//! against the terms a [`TermSource`] allows. Comparison is
//! case-insensitive.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use pathcheck_core::Model;

use crate::rule::{Arg, Requirement, Rule, RuleContext, Target};

/// Code reported for a value outside the vocabulary.
pub const ILLEGAL_TERM: &str = "illegal-term";

/// Where valid vocabulary terms come from (an ontology, a fixed list).
pub trait TermSource: Send + Sync {
    /// Terms valid for `kind.property`.
    fn valid_terms(&self, kind: &str, property: &str) -> Vec<String>;
}

/// A fixed term list, valid for any kind and property.
#[derive(Debug, Clone, Default)]
pub struct StaticTerms(pub BTreeSet<String>);

impl StaticTerms {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticTerms(terms.into_iter().map(Into::into).collect())
    }
}

impl TermSource for StaticTerms {
    fn valid_terms(&self, _kind: &str, _property: &str) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

pub struct CvTermRule {
    name: String,
    kind: String,
    property: String,
    source: Arc<dyn TermSource>,
    /// Lower-cased valid terms, fetched on first use.
    terms: OnceLock<BTreeSet<String>>,
}

impl CvTermRule {
    pub fn new(name: &str, kind: &str, property: &str, source: Arc<dyn TermSource>) -> Self {
        CvTermRule {
            name: name.to_string(),
            kind: kind.to_string(),
            property: property.to_string(),
            source,
            terms: OnceLock::new(),
        }
    }

    fn terms(&self) -> &BTreeSet<String> {
        self.terms.get_or_init(|| {
            self.source
                .valid_terms(&self.kind, &self.property)
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect()
        })
    }
}

impl Rule for CvTermRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_check(&self, model: &dyn Model, target: Target) -> bool {
        match target {
            Target::Node(node) => model.kind(node) == Some(self.kind.as_str()),
            Target::Graph => false,
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, target: Target) {
        let Target::Node(node) = target else {
            return;
        };
        let terms = self.terms();
        for term in ctx.model().texts(node, &self.property) {
            if !terms.contains(&term.trim().to_lowercase()) {
                ctx.report_node(
                    node,
                    ILLEGAL_TERM,
                    false,
                    &[
                        Arg::Text(format!("'{}' is not a valid {}", term, self.property)),
                        Arg::Text(format!("allowed: {}", self.allowed())),
                    ],
                );
            }
        }
    }

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::property(&self.kind, &self.property)]
    }
}

impl CvTermRule {
    fn allowed(&self) -> String {
        self.terms().iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use pathcheck_core::{KindDef, MemoryModel, Range, Schema};

    use super::*;
    use crate::problem::Severity;
    use crate::session::Session;
    use crate::settings::Settings;

    fn model(term: &str) -> (MemoryModel, pathcheck_core::NodeId) {
        let schema = Schema::new()
            .with_kind(KindDef::new("CellularLocation").multi("term", Range::Text));
        let mut model = MemoryModel::new(schema);
        let node = model.add_node("CellularLocation", "urn:loc").unwrap();
        model.add(node, "term", term.into()).unwrap();
        (model, node)
    }

    fn rule() -> CvTermRule {
        CvTermRule::new(
            "cellularLocationCvRule",
            "CellularLocation",
            "term",
            Arc::new(StaticTerms::new(["cytoplasm", "nucleus"])),
        )
    }

    #[test]
    fn accepts_term_case_insensitively() {
        let (model, node) = model("Cytoplasm");
        let session = Session::new(Settings::default());
        let rule = rule();
        assert!(rule.can_check(&model, Target::Node(node)));
        rule.check(
            &RuleContext::new(&session, &model, rule.name(), Severity::Error),
            Target::Node(node),
        );
        assert!(session.problems().is_empty());
    }

    #[test]
    fn reports_unknown_term() {
        let (model, node) = model("Mitochondrion");
        let session = Session::new(Settings::default());
        let rule = rule();
        rule.check(
            &RuleContext::new(&session, &model, rule.name(), Severity::Error),
            Target::Node(node),
        );
        let problem = session.find_problem(ILLEGAL_TERM, Severity::Error).unwrap();
        assert_eq!(problem.total_cases(), 1);
        let case = problem.case("cellularLocationCvRule", "urn:loc").unwrap();
        assert!(case.message.contains("Mitochondrion"));
    }

    #[test]
    fn only_checks_its_kind() {
        let (model, _) = model("x");
        let rule = CvTermRule::new("r", "Other", "term", Arc::new(StaticTerms::default()));
        assert!(!rule.can_check(&model, Target::Node(pathcheck_core::NodeId(0))));
        assert!(!rule.can_check(&model, Target::Graph));
    }
}
