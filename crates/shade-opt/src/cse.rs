//! Common subexpression elimination pass.
//!
//! Keys each node by kind, type and (already deduplicated) parents, and
//! rewires consumers of a duplicate to the first occurrence. Parameters
//! are never merged: each carries its own host binding.

use std::collections::HashMap;

use shade_ir::{Graph, NodeHandle, NodeKind, Result, Type};

use crate::Pass;

#[derive(Debug)]
pub struct CommonSubexprElimination;

#[derive(Hash, PartialEq, Eq)]
struct Key {
    kind: String,
    ty: Type,
    parents: Vec<NodeHandle>,
}

impl Pass for CommonSubexprElimination {
    fn name(&self) -> &str {
        "cse"
    }

    fn run(&self, g: &mut Graph, root: NodeHandle) -> Result<NodeHandle> {
        let mut canonical: HashMap<Key, NodeHandle> = HashMap::new();
        let mut remap: HashMap<NodeHandle, NodeHandle> = HashMap::new();
        let mut merged = 0usize;
        for h in g.sorted_sub_expressions(root) {
            if matches!(g.kind(h), NodeKind::Parameter { .. }) {
                continue;
            }
            let parents: Vec<NodeHandle> = g
                .parents(h)
                .iter()
                .map(|p| remap.get(p).copied().unwrap_or(*p))
                .collect();
            let key = Key {
                kind: format!("{:?}", g.kind(h)),
                ty: g.ty(h).clone(),
                parents,
            };
            if let Some(&first) = canonical.get(&key) {
                remap.insert(h, first);
                merged += 1;
                continue;
            }
            let this = if key.parents.as_slice() != g.parents(h) {
                let rebuilt = g.rebuild(h, key.parents.clone())?;
                remap.insert(h, rebuilt);
                rebuilt
            } else {
                h
            };
            canonical.insert(key, this);
        }
        if merged > 0 {
            log::debug!("cse: merged {merged} duplicate(s)");
        }
        Ok(remap.get(&root).copied().unwrap_or(root))
    }
}
