//! Predicate-driven graph substitution.

use std::collections::HashMap;

use shade_ir::{Graph, NodeHandle, Result};

/// Replaces every sub-expression of `root` matching `predicate` by
/// `replacement(node)` and returns the new root.
///
/// One pass over the topological order. A matching node is replaced as a
/// whole, from the original node. A non-matching node with a replaced
/// parent is rebuilt over the substituted parents, keeping its kind and
/// type. Untouched nodes keep their identity, so if nothing matches the
/// original root comes back.
///
/// Type preservation is the caller's responsibility.
pub fn replace_if<P, R>(
    g: &mut Graph,
    root: NodeHandle,
    mut predicate: P,
    mut replacement: R,
) -> Result<NodeHandle>
where
    P: FnMut(&Graph, NodeHandle) -> bool,
    R: FnMut(&mut Graph, NodeHandle) -> Result<NodeHandle>,
{
    let mut substituted: HashMap<NodeHandle, NodeHandle> = HashMap::new();
    let (mut replaced, mut rebuilt) = (0usize, 0usize);
    for h in g.sorted_sub_expressions(root) {
        if predicate(g, h) {
            let r = replacement(g, h)?;
            if r != h {
                substituted.insert(h, r);
                replaced += 1;
            }
            continue;
        }
        let parents = g.parents(h);
        if !parents.iter().any(|p| substituted.contains_key(p)) {
            continue;
        }
        let parents = parents
            .iter()
            .map(|p| substituted.get(p).copied().unwrap_or(*p))
            .collect();
        let r = g.rebuild(h, parents)?;
        substituted.insert(h, r);
        rebuilt += 1;
    }
    if replaced > 0 {
        log::debug!("replace_if: {replaced} replaced, {rebuilt} rebuilt");
    }
    Ok(substituted.get(&root).copied().unwrap_or(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::builtins::{add, mul, sin};
    use shade_core::{evaluate, make, ops};
    use shade_ir::{NodeKind, Type, Value};

    #[test]
    fn nothing_matched_returns_root_by_identity() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let root = add(&mut g, t, 1.0).unwrap();
        let before = g.len();
        let out = replace_if(&mut g, root, |_, _| false, |_, h| Ok(h)).unwrap();
        assert_eq!(out, root);
        assert_eq!(g.len(), before);
    }

    #[test]
    fn replaced_parents_rebuild_consumers() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let s = sin(&mut g, t).unwrap();
        let other = mul(&mut g, t, 3.0).unwrap();
        let root = add(&mut g, s, other).unwrap();

        let out = replace_if(
            &mut g,
            root,
            |g, h| matches!(g.kind(h), NodeKind::Parameter { .. }),
            |g, _| make(g, 2.0),
        )
        .unwrap();
        assert_ne!(out, root);
        assert!(matches!(g.kind(out), NodeKind::Call(f) if f.name == "add"));
        assert_eq!(g.ty(out), &Type::FLOAT);
        let expected = 2.0f32.sin() + 6.0;
        assert_eq!(evaluate(&g, out).unwrap(), Value::Float(expected));
        // the original is untouched
        assert_eq!(g.parents(root), &[s, other]);
    }

    #[test]
    fn untouched_branches_keep_identity() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let u = ops::parameter(&mut g, "u", Type::FLOAT).unwrap();
        let left = sin(&mut g, t).unwrap();
        let right = mul(&mut g, u, u).unwrap();
        let root = add(&mut g, left, right).unwrap();
        let out = replace_if(
            &mut g,
            root,
            |g, h| matches!(g.kind(h), NodeKind::Parameter { name } if name == "t"),
            |g, _| make(g, 0.0),
        )
        .unwrap();
        assert_eq!(g.parents(out)[1], right);
        assert_ne!(g.parents(out)[0], left);
    }

    #[test]
    fn replacing_the_root() {
        let mut g = Graph::new();
        let root = add(&mut g, 1.0, 2.0).unwrap();
        let out = replace_if(&mut g, root, |_, h| h == root, |g, _| make(g, 3.0)).unwrap();
        assert!(matches!(g.kind(out), NodeKind::Constant(Value::Float(v)) if *v == 3.0));
    }
}
