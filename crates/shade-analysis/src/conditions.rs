//! Conditional-execution propagation.
//!
//! A node runs unconditionally if some path from the root reaches it
//! through unconditional edges only. The branches of a selection are the
//! only conditional edges; its condition always runs.

use std::collections::HashSet;

use shade_ir::{Graph, NodeHandle};

/// Which sub-expressions of a root are guaranteed to execute.
#[derive(Clone, Debug, Default)]
pub struct ExecutionConditions {
    unconditional: HashSet<NodeHandle>,
    conditional: Vec<NodeHandle>,
}

impl ExecutionConditions {
    /// Propagates from `root` over the sub-graph in reverse topological
    /// order, so every consumer of a node is settled before the node.
    pub fn propagate(g: &Graph, root: NodeHandle) -> Self {
        let order = g.sorted_sub_expressions(root);
        let mut unconditional = HashSet::from([root]);
        for &h in order.iter().rev() {
            if !unconditional.contains(&h) {
                continue;
            }
            let kind = g.kind(h);
            for (i, &p) in g.parents(h).iter().enumerate() {
                if kind.parent_is_unconditional(i) {
                    unconditional.insert(p);
                }
            }
        }
        let conditional: Vec<_> = order
            .into_iter()
            .filter(|h| !unconditional.contains(h))
            .collect();
        log::debug!(
            "conditions: {} unconditional, {} conditional",
            unconditional.len(),
            conditional.len()
        );
        Self {
            unconditional,
            conditional,
        }
    }

    pub fn is_unconditional(&self, h: NodeHandle) -> bool {
        self.unconditional.contains(&h)
    }

    /// Nodes that only run on some branch, in topological order.
    pub fn conditional(&self) -> &[NodeHandle] {
        &self.conditional
    }
}
