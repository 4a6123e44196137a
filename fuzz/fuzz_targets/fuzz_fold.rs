#![no_main]

use libfuzzer_sys::fuzz_target;
use shade_backend_core::ShaderStage;
use shade_backend_glsl::{GlslOptions, compile_program};
use shade_core::builtins::{add, clamp, mul, sin, sub};
use shade_core::{evaluate, ops};
use shade_ir::{Graph, NodeHandle, Value};
use shade_opt::{OptLevel, PassManager};

/// Builds a float expression over one bound uniform from a byte program.
fn build(g: &mut Graph, data: &[u8]) -> Option<NodeHandle> {
    let t = ops::uniform(g, "t", Value::Float(0.5)).ok()?;
    let mut stack = vec![t];
    for chunk in data.chunks(2) {
        let (op, arg) = (chunk[0] % 6, f64::from(*chunk.get(1).unwrap_or(&1)) / 16.0);
        let top = *stack.last()?;
        let next = match op {
            0 => add(g, top, arg),
            1 => mul(g, top, arg),
            2 => sub(g, arg, top),
            3 => sin(g, top),
            4 => clamp(g, top, -1.0, 1.0),
            _ => match stack.len() {
                1 => add(g, top, top),
                n => add(g, top, stack[n - 2]),
            },
        };
        stack.push(next.ok()?);
    }
    stack.last().copied()
}

fuzz_target!(|data: &[u8]| {
    let mut g = Graph::new();
    let Some(root) = build(&mut g, data) else {
        return;
    };
    let Ok(before) = evaluate(&g, root) else {
        return;
    };
    for level in [OptLevel::O1, OptLevel::O2] {
        let optimized = PassManager::for_level(level)
            .run(&mut g, root)
            .expect("optimization failed");
        let after = evaluate(&g, optimized).expect("optimized graph failed to evaluate");
        if let (Some(a), Some(b)) = (before.as_f32(), after.as_f32()) {
            assert!(a == b || (a.is_nan() && b.is_nan()) || (a - b).abs() <= 1e-4 * a.abs().max(1.0));
        }
        compile_program(&mut g, optimized, &GlslOptions::default(), ShaderStage::Fragment)
            .expect("GLSL emission failed");
    }
});
