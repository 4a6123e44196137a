//! Predicate search and ordering helpers.

use std::collections::{HashMap, HashSet};

use shade_ir::{Graph, NodeHandle};

/// Sub-expressions of `root` matching `predicate`, in topological order.
pub fn find_if<P>(g: &Graph, root: NodeHandle, mut predicate: P) -> Vec<NodeHandle>
where
    P: FnMut(&Graph, NodeHandle) -> bool,
{
    g.sorted_sub_expressions(root)
        .into_iter()
        .filter(|&h| predicate(g, h))
        .collect()
}

/// The first sub-expression of `root`, in topological order, matching
/// `predicate`.
pub fn locate<P>(g: &Graph, root: NodeHandle, mut predicate: P) -> Option<NodeHandle>
where
    P: FnMut(&Graph, NodeHandle) -> bool,
{
    g.sorted_sub_expressions(root)
        .into_iter()
        .find(|&h| predicate(g, h))
}

/// How many edges reach each sub-expression of `root` from within the
/// sub-graph. The root itself counts zero.
pub fn use_counts(g: &Graph, root: NodeHandle) -> HashMap<NodeHandle, usize> {
    let order = g.sorted_sub_expressions(root);
    let mut counts: HashMap<NodeHandle, usize> = order.iter().map(|&h| (h, 0)).collect();
    for &h in &order {
        for &p in g.parents(h) {
            *counts.entry(p).or_default() += 1;
        }
    }
    counts
}

/// Whether every node in `order` appears after all of its parents, and
/// each node appears once.
pub fn is_topologically_sorted(g: &Graph, order: &[NodeHandle]) -> bool {
    let mut seen = HashSet::new();
    for &h in order {
        if !g.parents(h).iter().all(|p| seen.contains(p)) {
            return false;
        }
        if !seen.insert(h) {
            return false;
        }
    }
    true
}
