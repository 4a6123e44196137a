//! Constant folding pass.
//!
//! Replaces every maximal constant sub-expression of scalar, vector or
//! matrix type by a literal. Sub-expressions whose host value is undefined
//! (integer division by zero, out-of-range indices) or non-finite are left
//! for the device.

use std::collections::{HashMap, HashSet};

use shade_core::{constant, constant_value, is_constant};
use shade_ir::{Graph, NodeHandle, Result, Value};

use crate::Pass;
use crate::rewrite::replace_if;

#[derive(Debug)]
pub struct ConstantFolding;

impl Pass for ConstantFolding {
    fn name(&self) -> &str {
        "constant-folding"
    }

    fn run(&self, g: &mut Graph, root: NodeHandle) -> Result<NodeHandle> {
        let mut foldable: HashMap<NodeHandle, Value> = HashMap::new();
        let order = g.sorted_sub_expressions(root);
        for &h in &order {
            if g.kind(h).is_leaf() || !g.ty(h).is_numeric_shape() || !is_constant(g, h)? {
                continue;
            }
            match constant_value(g, h) {
                Ok(v) if v.is_finite() => {
                    foldable.insert(h, v);
                }
                Ok(_) => log::debug!("constant-folding: keeping non-finite {}", g[h].tag()),
                Err(e) => log::debug!("constant-folding: keeping {}: {e}", g[h].tag()),
            }
        }
        if foldable.is_empty() {
            return Ok(root);
        }

        // Only fold nodes some non-folded consumer (or the caller) sees.
        let mut maximal: HashSet<NodeHandle> = HashSet::new();
        if foldable.contains_key(&root) {
            maximal.insert(root);
        }
        for &h in &order {
            if foldable.contains_key(&h) {
                continue;
            }
            maximal.extend(
                g.parents(h)
                    .iter()
                    .filter(|p| foldable.contains_key(p)),
            );
        }
        log::debug!("constant-folding: {} literal(s)", maximal.len());

        replace_if(
            g,
            root,
            |_, h| maximal.contains(&h),
            |g, h| match foldable.remove(&h) {
                Some(v) => constant(g, v),
                None => Ok(h),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::builtins::{add, div, mul, sin, sqrt};
    use shade_core::{evaluate, ops};
    use shade_ir::{NodeKind, ShadeError, Type};

    #[test]
    fn folds_literal_graph_to_one_constant() {
        let mut g = Graph::new();
        let a = add(&mut g, 2, 3).unwrap();
        let root = mul(&mut g, a, 4).unwrap();
        let out = ConstantFolding.run(&mut g, root).unwrap();
        assert!(matches!(g.kind(out), NodeKind::Constant(Value::Int(20))));
    }

    #[test]
    fn folds_constant_operands_of_dynamic_nodes() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let s = sin(&mut g, 0.5).unwrap();
        let k = mul(&mut g, s, 2.0).unwrap();
        let root = add(&mut g, t, k).unwrap();
        let out = ConstantFolding.run(&mut g, root).unwrap();
        assert_ne!(out, root);
        let folded = g.parents(out)[1];
        assert!(matches!(g.kind(folded), NodeKind::Constant(_)));
        assert_eq!(g.parents(out)[0], t);
        // one new literal: the intermediate sin() was not folded separately
        assert_eq!(g.len(), 8);

        g.set_parameter(t, Value::Float(1.0)).unwrap();
        assert_eq!(
            evaluate(&g, out).unwrap(),
            Value::Float(1.0 + 0.5f32.sin() * 2.0)
        );
    }

    #[test]
    fn already_folded_is_a_fixed_point() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let root = add(&mut g, t, 1.0).unwrap();
        assert_eq!(ConstantFolding.run(&mut g, root).unwrap(), root);
    }

    #[test]
    fn undefined_values_stay_symbolic() {
        let mut g = Graph::new();
        let q = div(&mut g, 1, 0).unwrap();
        assert!(matches!(
            evaluate(&g, q),
            Err(ShadeError::InvalidExpression(_))
        ));
        assert_eq!(ConstantFolding.run(&mut g, q).unwrap(), q);

        let nan = sqrt(&mut g, -1.0).unwrap();
        assert_eq!(ConstantFolding.run(&mut g, nan).unwrap(), nan);
    }

    #[test]
    fn composites_are_not_literalized() {
        let mut g = Graph::new();
        let a = shade_core::make(&mut g, vec![1.0, 2.0]).unwrap();
        assert_eq!(ConstantFolding.run(&mut g, a).unwrap(), a);
    }
}
