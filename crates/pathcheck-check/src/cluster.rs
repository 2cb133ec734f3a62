//! Grouping by match predicate and merging of overlapping groups.
//!
//! Both functions compute a partition through petgraph's union-find, so the
//! result depends only on the set of inputs, not on their order.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::unionfind::UnionFind;

/// Groups `items` so that any two items connected by a chain of matches
/// end up in the same group.
///
/// `matches` should be symmetric. Groups are returned sorted.
pub fn cluster_by<T, F>(items: &[T], matches: F) -> Vec<BTreeSet<T>>
where
    T: Ord + Clone,
    F: Fn(&T, &T) -> bool,
{
    let distinct: Vec<T> = items.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let mut sets = UnionFind::<usize>::new(distinct.len());
    for i in 0..distinct.len() {
        for j in (i + 1)..distinct.len() {
            if matches(&distinct[i], &distinct[j]) {
                sets.union(i, j);
            }
        }
    }
    collect_partition(distinct, &mut sets)
}

/// Merges groups that share at least one element into disjoint sets.
///
/// The union of the output equals the union of the input. Empty groups
/// are dropped.
pub fn merge_overlapping<T, G, I>(groups: G) -> Vec<BTreeSet<T>>
where
    T: Ord + Clone,
    G: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
    let groups: Vec<Vec<T>> = groups.into_iter().map(|g| g.into_iter().collect()).collect();
    let index: BTreeMap<T, usize> = groups
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(i, item)| (item, i))
        .collect();

    let mut sets = UnionFind::<usize>::new(index.len());
    for group in &groups {
        let mut members = group.iter().filter_map(|item| index.get(item).copied());
        if let Some(first) = members.next() {
            for other in members {
                sets.union(first, other);
            }
        }
    }
    collect_partition(index.into_keys().collect(), &mut sets)
}

/// `items[i]` belongs to the set whose representative is `find(i)`.
fn collect_partition<T: Ord>(items: Vec<T>, sets: &mut UnionFind<usize>) -> Vec<BTreeSet<T>> {
    let mut by_root: BTreeMap<usize, BTreeSet<T>> = BTreeMap::new();
    for (i, item) in items.into_iter().enumerate() {
        by_root.entry(sets.find_mut(i)).or_default().insert(item);
    }
    let mut out: Vec<BTreeSet<T>> = by_root.into_values().collect();
    out.sort();
    out
}
