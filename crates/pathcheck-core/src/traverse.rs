//! Reference-graph traversal.
//!
//! Models are cyclic in general (a pathway step may point at its own
//! successor chain), so anything that walks references goes through the
//! petgraph view built here instead of recursing on the model.

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;

use crate::id::NodeId;
use crate::model::Model;

/// Builds a directed graph of `node -> referenced node` edges.
///
/// Properties for which `skip` returns true contribute no edges. References
/// to nodes that are no longer present are left out.
pub fn reference_graph(model: &dyn Model, skip: impl Fn(&str) -> bool) -> DiGraphMap<NodeId, ()> {
    let mut graph = DiGraphMap::new();
    for node in model.node_ids() {
        graph.add_node(node);
        for property in model.reference_properties(node) {
            if skip(&property) {
                continue;
            }
            for target in model.refs(node, &property) {
                if model.contains(target) {
                    graph.add_edge(node, target, ());
                }
            }
        }
    }
    graph
}

/// Nodes reachable from `start`, excluding `start` itself, in DFS order.
pub fn reachable(graph: &DiGraphMap<NodeId, ()>, start: NodeId) -> Vec<NodeId> {
    if !graph.contains_node(start) {
        return Vec::new();
    }
    let mut dfs = Dfs::new(graph, start);
    let mut out = Vec::new();
    while let Some(node) = dfs.next(graph) {
        if node != start {
            out.push(node);
        }
    }
    out
}

/// Every `(holder, property, missing target)` reference whose target is
/// not in the model.
pub fn dangling_references(model: &dyn Model) -> Vec<(NodeId, String, NodeId)> {
    let mut out = Vec::new();
    for node in model.node_ids() {
        for property in model.reference_properties(node) {
            for target in model.refs(node, &property) {
                if !model.contains(target) {
                    out.push((node, property.clone(), target));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;
    use crate::schema::{KindDef, Range, Schema};
    use crate::value::Value;

    fn schema() -> Schema {
        Schema::new().with_kind(
            KindDef::new("Step")
                .multi("nextStep", Range::Reference)
                .multi("component", Range::Reference),
        )
    }

    #[test]
    fn reachability_terminates_on_cycles() {
        let mut model = MemoryModel::new(schema());
        let a = model.add_node("Step", "a").unwrap();
        let b = model.add_node("Step", "b").unwrap();
        let c = model.add_node("Step", "c").unwrap();
        model.add(a, "component", Value::Ref(b)).unwrap();
        model.add(b, "component", Value::Ref(c)).unwrap();
        model.add(c, "component", Value::Ref(a)).unwrap();

        let graph = reference_graph(&model, |_| false);
        let mut seen = reachable(&graph, a);
        seen.sort();
        assert_eq!(seen, vec![b, c]);
    }

    #[test]
    fn skipped_properties_add_no_edges() {
        let mut model = MemoryModel::new(schema());
        let a = model.add_node("Step", "a").unwrap();
        let b = model.add_node("Step", "b").unwrap();
        model.add(a, "nextStep", Value::Ref(b)).unwrap();

        let graph = reference_graph(&model, |p| p == "nextStep");
        assert!(reachable(&graph, a).is_empty());
    }

    #[test]
    fn finds_dangling_references() {
        let mut model = MemoryModel::new(schema());
        let a = model.add_node("Step", "a").unwrap();
        let b = model.add_node("Step", "b").unwrap();
        model.add(a, "component", Value::Ref(b)).unwrap();
        assert!(dangling_references(&model).is_empty());

        model.remove_node(b).unwrap();
        assert_eq!(
            dangling_references(&model),
            vec![(a, "component".to_string(), b)]
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;
        use proptest::prelude::prop;

        proptest! {
            #[test]
            fn reachable_matches_edges_after_removal(
                edges in prop::collection::vec((0u32..8, 0u32..8), 0..24),
                removed in prop::collection::btree_set(0u32..8, 0..4),
            ) {
                let mut model = MemoryModel::new(schema());
                let ids: Vec<NodeId> = (0..8)
                    .map(|i| model.add_node("Step", &format!("n{i}")).unwrap())
                    .collect();
                for (from, to) in &edges {
                    model
                        .add(ids[*from as usize], "component", Value::Ref(ids[*to as usize]))
                        .unwrap();
                }
                for r in &removed {
                    model.remove_node(ids[*r as usize]).unwrap();
                }

                let expected_dangling = edges
                    .iter()
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .filter(|(f, t)| !removed.contains(f) && removed.contains(t))
                    .count();
                prop_assert_eq!(dangling_references(&model).len(), expected_dangling);

                let graph = reference_graph(&model, |_| false);
                for &id in &ids {
                    for node in reachable(&graph, id) {
                        prop_assert!(model.contains(node));
                        prop_assert_ne!(node, id);
                    }
                }
            }
        }
    }
}
