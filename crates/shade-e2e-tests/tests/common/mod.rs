use shade_backend_core::{Backend, BackendOptions, BackendOutput, ShaderStage};
use shade_ir::{Graph, NodeHandle, Value};
use shade_opt::{OptLevel, PassManager};

/// Optimize at the given level and compile with the backend.
#[allow(dead_code)]
pub fn compile(
    g: &mut Graph,
    root: NodeHandle,
    backend: &dyn Backend,
    opt_level: u8,
    stage: ShaderStage,
) -> BackendOutput {
    let level = match opt_level {
        0 => OptLevel::O0,
        2 => OptLevel::O2,
        _ => OptLevel::O1,
    };
    let root = PassManager::for_level(level)
        .run(g, root)
        .expect("optimization failed");
    backend
        .compile(
            g,
            root,
            &BackendOptions {
                opt_level: level,
                stage,
            },
        )
        .expect("backend compilation failed")
}

/// Text of the single file a backend produced.
#[allow(dead_code)]
pub fn text(output: &BackendOutput) -> &str {
    assert_eq!(output.files.len(), 1, "expected exactly one output file");
    &output.files[0].content
}

/// Component-wise float comparison with a small tolerance.
#[allow(dead_code)]
pub fn assert_close(actual: &Value, expected: &[f32]) {
    let scalars = actual.scalars();
    assert_eq!(scalars.len(), expected.len(), "{actual} vs {expected:?}");
    for (a, e) in scalars.iter().zip(expected) {
        let a = a.as_f32().expect("float component");
        assert!((a - e).abs() < 1e-5, "{actual} vs {expected:?}");
    }
}
