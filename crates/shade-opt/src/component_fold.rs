//! Per-component folding pass.
//!
//! A vector-valued call that is not constant as a whole may still have
//! constant components, e.g. `vec3(t, 1.0, 2.0) + vec3(1.0)`. Such calls
//! are split into a constructor over their components, with the constant
//! components as literals, leaving only the dynamic lanes to the device.

use shade_core::{
    HostValue, constant, constant_value, element, element_is_constant, is_constant, ops,
};
use shade_ir::{ElementRule, Graph, NodeHandle, NodeKind, Result, ScalarKind};

use crate::Pass;
use crate::rewrite::replace_if;

#[derive(Debug)]
pub struct ComponentFolding;

fn splittable(g: &mut Graph, h: NodeHandle) -> Result<bool> {
    let per_lane = match g.kind(h) {
        NodeKind::Call(f) => {
            !f.device_only
                && matches!(
                    f.element,
                    ElementRule::Broadcast { .. } | ElementRule::Product
                )
        }
        _ => false,
    };
    if !per_lane || !g.ty(h).is_vec() || is_constant(g, h)? {
        return Ok(false);
    }
    for i in 0..g.ty(h).component_count() {
        if element_is_constant(g, h, i)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn split(g: &mut Graph, h: NodeHandle) -> Result<NodeHandle> {
    let mut lanes: Vec<HostValue> = Vec::new();
    for i in 0..g.ty(h).component_count() {
        let e = element(g, h, i)?;
        let lane = match constant_value(g, e) {
            Ok(v) if v.is_finite() => constant(g, v)?,
            _ => e,
        };
        lanes.push(lane.into());
    }
    match g.ty(h).scalar_kind() {
        Some(ScalarKind::Sint) => ops::ivec(g, lanes),
        Some(ScalarKind::Bool) => ops::bvec(g, lanes),
        _ => ops::vec(g, lanes),
    }
}

impl Pass for ComponentFolding {
    fn name(&self) -> &str {
        "component-folding"
    }

    fn run(&self, g: &mut Graph, root: NodeHandle) -> Result<NodeHandle> {
        let mut targets = Vec::new();
        for h in g.sorted_sub_expressions(root) {
            if splittable(g, h)? {
                targets.push(h);
            }
        }
        if targets.is_empty() {
            return Ok(root);
        }
        log::debug!("component-folding: splitting {} call(s)", targets.len());
        replace_if(g, root, |_, h| targets.contains(&h), split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::builtins::{add, mul};
    use shade_core::{evaluate, make};
    use shade_ir::{Type, Value};

    #[test]
    fn constant_lanes_become_literals() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let v = ops::vec(&mut g, vec![t.into(), 1.0.into(), 2.0.into()]).unwrap();
        let one = make(&mut g, Value::Vec(vec![1.0, 1.0, 1.0])).unwrap();
        let root = add(&mut g, v, one).unwrap();

        let out = ComponentFolding.run(&mut g, root).unwrap();
        assert!(matches!(g.kind(out), NodeKind::Construct));
        let lanes = g.parents(out).to_vec();
        assert!(matches!(g.kind(lanes[0]), NodeKind::Call(_)));
        assert!(matches!(g.kind(lanes[1]), NodeKind::Constant(Value::Float(v)) if *v == 2.0));
        assert!(matches!(g.kind(lanes[2]), NodeKind::Constant(Value::Float(v)) if *v == 3.0));

        g.set_parameter(t, Value::Float(5.0)).unwrap();
        assert_eq!(evaluate(&g, out).unwrap(), evaluate(&g, root).unwrap());
    }

    #[test]
    fn fully_dynamic_calls_are_kept() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::VEC2).unwrap();
        let root = mul(&mut g, t, 2.0).unwrap();
        assert_eq!(ComponentFolding.run(&mut g, root).unwrap(), root);
    }
}
