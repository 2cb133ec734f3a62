//! Shared fixtures: a small pathway-style schema and a few test rules.

#![allow(dead_code)]

use std::sync::Arc;

use pathcheck_check::rule::{Rule, RuleContext, Target};
use pathcheck_check::{NormalizerConfig, SynonymTable};
use pathcheck_core::{KindDef, MemoryModel, Model, NodeId, Range, Schema, Value};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn schema() -> Schema {
    Schema::new()
        .with_kind(
            KindDef::new("UnificationRef")
                .single("db", Range::Text)
                .single("id", Range::Text)
                .single("idVersion", Range::Text)
                .multi("comment", Range::Text),
        )
        .with_kind(
            KindDef::new("ProteinRef")
                .single("displayName", Range::Text)
                .single("standardName", Range::Text)
                .multi("name", Range::Text)
                .single("organism", Range::Text)
                .multi("xref", Range::Reference),
        )
        .with_kind(
            KindDef::new("Protein")
                .single("displayName", Range::Text)
                .single("entityReference", Range::Reference)
                .multi("xref", Range::Reference)
                .multi("dataSource", Range::Text),
        )
        .with_kind(
            KindDef::new("CellularLocation")
                .multi("term", Range::Text)
                .multi("xref", Range::Reference),
        )
        .with_kind(
            KindDef::new("InteractionVocabulary")
                .multi("term", Range::Text)
                .multi("xref", Range::Reference),
        )
        .with_kind(KindDef::new("TissueVocabulary").multi("term", Range::Text))
        .with_kind(
            KindDef::new("BioSource")
                .single("tissue", Range::Reference)
                .single("cellType", Range::Reference)
                .multi("xref", Range::Reference),
        )
        .with_kind(
            KindDef::new("Pathway")
                .multi("component", Range::Reference)
                .multi("nextStep", Range::Reference)
                .multi("dataSource", Range::Text),
        )
}

pub fn synonyms() -> Arc<SynonymTable> {
    Arc::new(SynonymTable::new(
        vec![
            vec!["uniprot", "uniprotkb", "uniprot knowledgebase"],
            vec!["uniprotkb", "swissprot"],
            vec!["go", "gene ontology"],
        ],
        vec!["uniprot", "go"],
    ))
}

pub fn normalizer_config() -> NormalizerConfig {
    NormalizerConfig::from_json(
        r#"{
            "strategies": [
                {
                    "name": "unification xrefs",
                    "kinds": ["UnificationRef"],
                    "family": "xref",
                    "key": {"source": "direct", "namespace": "db", "id": "id", "version": "idVersion"}
                },
                {
                    "name": "controlled vocabularies",
                    "kinds": ["CellularLocation", "InteractionVocabulary"],
                    "family": "vocabulary",
                    "key": {
                        "source": "via_references",
                        "property": "xref",
                        "target_kinds": ["UnificationRef"],
                        "namespace": "db",
                        "id": "id",
                        "fallback": "term"
                    }
                },
                {
                    "name": "biosources",
                    "kinds": ["BioSource"],
                    "family": "biosource",
                    "key": {
                        "source": "via_references",
                        "property": "xref",
                        "target_kinds": ["UnificationRef"],
                        "namespace": "db",
                        "id": "id",
                        "only": ["taxonomy"],
                        "suffixes": [
                            {"reference": "tissue", "property": "term"},
                            {"reference": "cellType", "property": "term"}
                        ]
                    }
                },
                {
                    "name": "entity references",
                    "kinds": ["ProteinRef"],
                    "family": "entity-reference",
                    "key": {
                        "source": "via_references",
                        "property": "xref",
                        "target_kinds": ["UnificationRef"],
                        "namespace": "db",
                        "id": "id",
                        "preferred": ["uniprot", "entrez gene"]
                    }
                }
            ],
            "display_name": {
                "rule": "displayNameRule",
                "code": "no-display-name",
                "inherit_from": "entityReference"
            },
            "inferences": [{"property": "dataSource", "skip": ["nextStep"]}],
            "merge_fixes": [{"rule": "duplicateIdRule", "code": "duplicate-id"}]
        }"#,
    )
    .unwrap()
}

pub fn xref(model: &mut MemoryModel, uri: &str, db: &str, id: &str) -> NodeId {
    let x = model.add_node("UnificationRef", uri).unwrap();
    model.set(x, "db", Some(db.into())).unwrap();
    model.set(x, "id", Some(id.into())).unwrap();
    x
}

pub fn protein_with_xref(model: &mut MemoryModel, uri: &str, xref: NodeId) -> NodeId {
    let p = model.add_node("Protein", uri).unwrap();
    model.add(p, "xref", Value::Ref(xref)).unwrap();
    p
}

/// Reports one error on every node of any kind.
pub struct ErrorOnEveryNode(pub &'static str);

impl Rule for ErrorOnEveryNode {
    fn name(&self) -> &str {
        self.0
    }

    fn can_check(&self, _model: &dyn Model, target: Target) -> bool {
        matches!(target, Target::Node(_))
    }

    fn check(&self, ctx: &RuleContext<'_>, target: Target) {
        if let Target::Node(node) = target {
            ctx.report_node(node, "always", false, &["flagged".into()]);
        }
    }
}

/// Reports a warning on every node of one kind.
pub struct WarnOnKind(pub &'static str, pub &'static str);

impl Rule for WarnOnKind {
    fn name(&self) -> &str {
        self.0
    }

    fn can_check(&self, model: &dyn Model, target: Target) -> bool {
        match target {
            Target::Node(node) => model.kind(node) == Some(self.1),
            Target::Graph => false,
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, target: Target) {
        if let Target::Node(node) = target {
            ctx.report_node(node, "kind-warning", false, &[self.1.into()]);
        }
    }
}

/// Panics on the node whose URI is "boom", reports nothing elsewhere.
pub struct PanicsOnBoom;

impl Rule for PanicsOnBoom {
    fn name(&self) -> &str {
        "panicsOnBoom"
    }

    fn can_check(&self, _model: &dyn Model, target: Target) -> bool {
        matches!(target, Target::Node(_))
    }

    fn check(&self, ctx: &RuleContext<'_>, target: Target) {
        if let Target::Node(node) = target {
            if ctx.model().uri(node) == Some("boom") {
                panic!("cannot handle boom");
            }
        }
    }
}

/// Reports the node count once per model, against the external name
/// "model" so runs over different model instances compare equal.
pub struct CountsNodes;

impl Rule for CountsNodes {
    fn name(&self) -> &str {
        "countsNodes"
    }

    fn can_check(&self, _model: &dyn Model, target: Target) -> bool {
        target == Target::Graph
    }

    fn check(&self, ctx: &RuleContext<'_>, _target: Target) {
        let model = ctx.model();
        ctx.report(
            &pathcheck_check::ObjectRef::external("model"),
            "node-count",
            false,
            &[format!("{} nodes", model.node_count()).into()],
        );
    }
}

/// Reports one error per node from a single graph-phase invocation.
pub struct GraphErrorPerNode;

impl Rule for GraphErrorPerNode {
    fn name(&self) -> &str {
        "graphErrorPerNode"
    }

    fn can_check(&self, _model: &dyn Model, target: Target) -> bool {
        target == Target::Graph
    }

    fn check(&self, ctx: &RuleContext<'_>, _target: Target) {
        for node in ctx.model().node_ids() {
            ctx.report_node(node, "bad", false, &["flagged from graph".into()]);
        }
    }
}
