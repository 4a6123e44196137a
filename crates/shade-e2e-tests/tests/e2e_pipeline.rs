//! Rewriting, optimization passes, lifting and analysis working together.

mod common;

use shade_analysis::{ExecutionConditions, Resources, find_if, locate};
use shade_backend_core::{EvalBackend, ShaderStage};
use shade_backend_glsl::GlslBackend;
use shade_core::builtins::{add, cos, dot, gt, mul, normalize, sin};
use shade_core::{HostValue, evaluate, is_constant, lift, make, ops};
use shade_ir::{AttributeBuffer, Graph, NodeHandle, NodeKind, Result, Texture, Type, Value};
use shade_opt::{OptLevel, PassManager, replace_if};

fn is_call(g: &Graph, h: NodeHandle, name: &str) -> bool {
    matches!(g.kind(h), NodeKind::Call(f) if f.name == name)
}

#[test]
fn rewriting_sin_to_cos_changes_only_the_path_to_root() {
    let mut g = Graph::new();
    let t = ops::uniform(&mut g, "t", Value::Float(0.0)).unwrap();
    let s = sin(&mut g, t).unwrap();
    let side = mul(&mut g, t, 2.0).unwrap();
    let root = add(&mut g, s, side).unwrap();

    let out = replace_if(
        &mut g,
        root,
        |g, h| is_call(g, h, "sin"),
        |g, h| {
            let x = g.parents(h)[0];
            cos(g, x)
        },
    )
    .unwrap();

    assert_ne!(out, root);
    assert_eq!(evaluate(&g, root).unwrap(), Value::Float(0.0));
    assert_eq!(evaluate(&g, out).unwrap(), Value::Float(1.0));
    let order = g.sorted_sub_expressions(out);
    assert!(order.contains(&side));
    assert!(order.contains(&t));
    assert!(!order.contains(&s));
}

#[test]
fn optimization_levels_agree_on_host_values() {
    let build = |g: &mut Graph| -> Result<NodeHandle> {
        let t = ops::uniform(g, "t", Value::Float(0.75))?;
        let k = mul(g, 2.0, 4.0)?;
        let v = ops::vec(g, vec![t.into(), k.into(), 1.0.into()])?;
        let n = normalize(g, v)?;
        let again = normalize(g, v)?;
        dot(g, n, again)
    };
    let mut results = Vec::new();
    for level in [OptLevel::O0, OptLevel::O1, OptLevel::O2] {
        let mut g = Graph::new();
        let root = build(&mut g).unwrap();
        let root = PassManager::for_level(level).run(&mut g, root).unwrap();
        results.push(evaluate(&g, root).unwrap());
    }
    for r in &results {
        common::assert_close(r, &[1.0]);
    }
}

#[test]
fn o1_leaves_no_foldable_calls() {
    let mut g = Graph::new();
    let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
    let k = sin(&mut g, 0.25).unwrap();
    let k = mul(&mut g, k, k).unwrap();
    let root = add(&mut g, t, k).unwrap();
    let root = PassManager::for_level(OptLevel::O1).run(&mut g, root).unwrap();
    let calls = find_if(&g, root, |g, h| matches!(g.kind(h), NodeKind::Call(_)));
    assert_eq!(calls, vec![root]);
    let folded = locate(&g, root, |g, h| matches!(g.kind(h), NodeKind::Constant(_)));
    assert!(folded.is_some());
}

#[test]
fn lifted_functions_build_and_specialize() {
    let shade = |g: &mut Graph, args: &[NodeHandle]| -> Result<HostValue> {
        let lit = gt(g, args[0], 0.5)?;
        Ok(ops::select(g, lit, args[1], 0.0)?.into())
    };
    let mut f = lift(shade);

    let mut g = Graph::new();
    let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
    let root = f.call(&mut g, vec![t.into(), 0.25.into()]).unwrap();
    let out = common::compile(&mut g, root, &GlslBackend, 1, ShaderStage::Fragment);
    assert!(common::text(&out).contains("vec4(vec3(((t > 0.5) ? 0.25 : 0.0)), 1.0)"));

    assert_eq!(
        f.evaluate(&[Value::Float(1.0), Value::Float(3.0)]).unwrap(),
        Value::Float(3.0)
    );
    assert_eq!(
        f.evaluate(&[Value::Float(0.0), Value::Float(3.0)]).unwrap(),
        Value::Float(0.0)
    );
    assert_eq!(f.instance_count(), 1);
}

#[test]
fn resources_and_conditions_of_a_scene() {
    let mut g = Graph::new();
    let normal = make(
        &mut g,
        AttributeBuffer {
            name: "normal".into(),
            ty: Type::VEC3,
        },
    )
    .unwrap();
    let light = ops::parameter(&mut g, "light", Type::VEC3).unwrap();
    let shadow = make(
        &mut g,
        Texture {
            name: "shadow".into(),
            width: 1024,
            height: 1024,
        },
    )
    .unwrap();
    let lambert = dot(&mut g, normal, light).unwrap();
    let lit = gt(&mut g, lambert, 0.0).unwrap();
    let uv = make(&mut g, Value::Vec(vec![0.5, 0.5])).unwrap();
    let depth = shade_core::builtins::texture2d(&mut g, shadow, uv).unwrap();
    let depth = ops::swizzle(&mut g, depth, "r").unwrap();
    let root = ops::select(&mut g, lit, depth, lambert).unwrap();

    let resources = Resources::collect(&g, root);
    assert_eq!(resources.attribute_buffers.len(), 1);
    assert_eq!(resources.uniforms, vec![light]);
    assert_eq!(resources.textures[0].name, "shadow");
    assert!(!is_constant(&mut g, root).unwrap());

    let conditions = ExecutionConditions::propagate(&g, root);
    assert!(conditions.is_unconditional(lambert));
    assert!(conditions.is_unconditional(normal));
    assert!(!conditions.is_unconditional(depth));
    assert!(!conditions.is_unconditional(shadow));
}

#[test]
fn eval_backend_reports_host_values() {
    let mut g = Graph::new();
    let t = ops::uniform(&mut g, "t", Value::Float(1.5)).unwrap();
    let root = add(&mut g, t, 2.0).unwrap();
    let out = common::compile(&mut g, root, &EvalBackend, 1, ShaderStage::Fragment);
    assert_eq!(common::text(&out), "3.5\n");
    assert_eq!(out.diagnostics.len(), 1);
}
