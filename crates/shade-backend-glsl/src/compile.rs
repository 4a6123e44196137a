//! Per-node compile step: declarations, temporaries and statements.

use shade_backend_core::{BackendError, ShaderStage};
use shade_core::{constant_value, is_constant};
use shade_ir::{Graph, NodeHandle, NodeKind, Type, Value};

use crate::context::CompilationContext;
use crate::expr::{glsl_expression, literal};

const DERIVATIVES: [&str; 3] = ["dFdx", "dFdy", "fwidth"];

/// Compiles one node into `ctx`.
///
/// Must be called for every sub-expression in topological order before
/// [`glsl_expression`] is asked for the root: inputs get declared here,
/// constants get folded, and arrays, flagged swizzles and shared calls
/// are materialized into temporaries.
pub fn compile_node(
    g: &mut Graph,
    ctx: &mut CompilationContext,
    h: NodeHandle,
) -> Result<(), BackendError> {
    let ty = g.try_node(h)?.ty().clone();
    let kind = g.kind(h).clone();
    ctx.declare_type(&ty);

    match &kind {
        NodeKind::Parameter { name } => {
            ctx.declare_global(name, &ty, format!("uniform {};", ty.declare(name)))?;
            return Ok(());
        }
        NodeKind::Attribute(buffer) => {
            if ctx.stage() != ShaderStage::Vertex {
                return Err(BackendError::Unsupported(format!(
                    "attribute buffer '{}' outside a vertex shader",
                    buffer.name
                )));
            }
            let line = format!("attribute {};", ty.declare(&buffer.name));
            ctx.declare_global(&buffer.name, &ty, line)?;
            return Ok(());
        }
        NodeKind::Sampler(texture) => {
            let line = format!("uniform sampler2D {};", texture.name);
            ctx.declare_global(&texture.name, &ty, line)?;
            return Ok(());
        }
        NodeKind::FragCoord if ctx.stage() != ShaderStage::Fragment => {
            return Err(BackendError::Unsupported(
                "gl_FragCoord outside a fragment shader".into(),
            ));
        }
        NodeKind::Call(f) if DERIVATIVES.contains(&f.name) => {
            if ctx.stage() != ShaderStage::Fragment {
                return Err(BackendError::Unsupported(format!(
                    "{} outside a fragment shader",
                    f.name
                )));
            }
            ctx.require_extension("GL_OES_standard_derivatives");
        }
        _ => {}
    }

    if ctx.options().fold_constants && !kind.is_leaf() && ty.is_numeric_shape() {
        if is_constant(g, h)? {
            match constant_value(g, h) {
                Ok(v) if v.is_finite() => {
                    ctx.bind(h, literal(&v)?);
                    return Ok(());
                }
                Ok(_) => log::debug!("glsl: not folding non-finite {}", g[h].tag()),
                Err(e) => log::debug!("glsl: not folding {}: {e}", g[h].tag()),
            }
        }
    }

    match &kind {
        NodeKind::Array => {
            let items = g
                .parents(h)
                .iter()
                .map(|&p| glsl_expression(g, ctx, p))
                .collect::<Result<Vec<_>, _>>()?;
            materialize_array(ctx, h, &ty, items);
        }
        NodeKind::Constant(Value::Array(values)) => {
            let items = values.iter().map(literal).collect::<Result<Vec<_>, _>>()?;
            materialize_array(ctx, h, &ty, items);
        }
        NodeKind::Discard => {
            if ctx.stage() != ShaderStage::Fragment {
                return Err(BackendError::Unsupported(
                    "discard outside a fragment shader".into(),
                ));
            }
            if !ctx.is_unconditional(h) {
                return Err(BackendError::Unsupported(
                    "discard inside a conditional branch".into(),
                ));
            }
            let cond = glsl_expression(g, ctx, g.parents(h)[1])?;
            ctx.emit(format!("if ({cond}) discard;"));
        }
        NodeKind::Swizzle {
            materialize: true, ..
        } => materialize(g, ctx, h, &ty)?,
        NodeKind::Index if ctx.options().materialize_dynamic_indices => {
            let ix = g.parents(h)[1];
            if !is_constant(g, ix)? {
                materialize(g, ctx, h, &ty)?;
            }
        }
        NodeKind::Call(_) | NodeKind::Select
            if ctx.uses(h) > 1 && ctx.is_unconditional(h) && ty.is_numeric_shape() =>
        {
            materialize(g, ctx, h, &ty)?;
        }
        _ => {}
    }
    Ok(())
}

/// Emits `T name = <expression of h>;` and binds `h` to `name`.
fn materialize(
    g: &Graph,
    ctx: &mut CompilationContext,
    h: NodeHandle,
    ty: &Type,
) -> Result<(), BackendError> {
    let expr = glsl_expression(g, ctx, h)?;
    let name = ctx.fresh_name();
    log::debug!("glsl: materializing {} as {name}", g[h].tag());
    ctx.emit(format!("{} = {expr};", ty.declare(&name)));
    ctx.bind(h, name);
    Ok(())
}

fn materialize_array(ctx: &mut CompilationContext, h: NodeHandle, ty: &Type, items: Vec<String>) {
    let name = ctx.fresh_name();
    ctx.emit(format!("{};", ty.declare(&name)));
    for (k, item) in items.iter().enumerate() {
        ctx.emit(format!("{name}[{k}] = {item};"));
    }
    ctx.bind(h, name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GlslOptions;
    use shade_core::builtins::{add, dfdx, mul, sin};
    use shade_core::{make, ops};
    use shade_ir::AttributeBuffer;

    fn compile_all(
        g: &mut Graph,
        root: NodeHandle,
        options: GlslOptions,
        stage: ShaderStage,
    ) -> Result<CompilationContext, BackendError> {
        let mut ctx = CompilationContext::new(g, root, options, stage);
        for h in g.sorted_sub_expressions(root) {
            compile_node(g, &mut ctx, h)?;
        }
        Ok(ctx)
    }

    #[test]
    fn folds_constant_sub_expressions() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let k = mul(&mut g, 2.0, 3.0).unwrap();
        let root = add(&mut g, t, k).unwrap();
        let ctx = compile_all(&mut g, root, GlslOptions::default(), ShaderStage::Fragment).unwrap();
        assert_eq!(glsl_expression(&g, &ctx, root).unwrap(), "(t + 6.0)");

        let raw = GlslOptions {
            fold_constants: false,
            ..GlslOptions::default()
        };
        let ctx = compile_all(&mut g, root, raw, ShaderStage::Fragment).unwrap();
        assert_eq!(glsl_expression(&g, &ctx, root).unwrap(), "(t + (2.0 * 3.0))");
    }

    #[test]
    fn shared_calls_become_temporaries() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let s = sin(&mut g, t).unwrap();
        let root = mul(&mut g, s, s).unwrap();
        let ctx = compile_all(&mut g, root, GlslOptions::default(), ShaderStage::Fragment).unwrap();
        assert_eq!(ctx.statements(), ["float tmp0 = sin(t);"]);
        assert_eq!(glsl_expression(&g, &ctx, root).unwrap(), "(tmp0 * tmp0)");
    }

    #[test]
    fn conditional_shared_calls_stay_inline() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let s = sin(&mut g, t).unwrap();
        let sq = mul(&mut g, s, s).unwrap();
        let c = shade_core::builtins::gt(&mut g, t, 0.0).unwrap();
        let root = ops::select(&mut g, c, sq, 0.0).unwrap();
        let ctx = compile_all(&mut g, root, GlslOptions::default(), ShaderStage::Fragment).unwrap();
        assert!(ctx.statements().is_empty());
        assert_eq!(
            glsl_expression(&g, &ctx, root).unwrap(),
            "((t > 0.0) ? (sin(t) * sin(t)) : 0.0)"
        );
    }

    #[test]
    fn arrays_are_filled_element_by_element() {
        let mut g = Graph::new();
        let table = make(&mut g, vec![0.25, 0.5, 1.0]).unwrap();
        let i = ops::parameter(&mut g, "i", Type::INT).unwrap();
        let root = ops::at(&mut g, table, i).unwrap();
        let ctx = compile_all(&mut g, root, GlslOptions::default(), ShaderStage::Fragment).unwrap();
        assert_eq!(
            ctx.statements(),
            [
                "float tmp0[3];",
                "tmp0[0] = 0.25;",
                "tmp0[1] = 0.5;",
                "tmp0[2] = 1.0;"
            ]
        );
        assert_eq!(glsl_expression(&g, &ctx, root).unwrap(), "tmp0[i]");
    }

    #[test]
    fn dynamic_indices_can_be_materialized() {
        let mut g = Graph::new();
        let c = ops::frag_coord(&mut g).unwrap();
        let i = ops::parameter(&mut g, "i", Type::INT).unwrap();
        let root = ops::at(&mut g, c, i).unwrap();
        let options = GlslOptions {
            materialize_dynamic_indices: true,
            ..GlslOptions::default()
        };
        let ctx = compile_all(&mut g, root, options, ShaderStage::Fragment).unwrap();
        assert_eq!(ctx.statements(), ["float tmp0 = gl_FragCoord[i];"]);
    }

    #[test]
    fn discard_statements() {
        let mut g = Graph::new();
        let c = ops::frag_coord(&mut g).unwrap();
        let x = ops::swizzle(&mut g, c, "x").unwrap();
        let cond = shade_core::builtins::lt(&mut g, x, 10.0).unwrap();
        let root = ops::discard_if(&mut g, c, cond).unwrap();
        let ctx = compile_all(&mut g, root, GlslOptions::default(), ShaderStage::Fragment).unwrap();
        assert_eq!(ctx.statements(), ["if ((gl_FragCoord.x < 10.0)) discard;"]);
        assert_eq!(glsl_expression(&g, &ctx, root).unwrap(), "gl_FragCoord");

        let t = ops::parameter(&mut g, "t", Type::BOOL).unwrap();
        let guarded = ops::select(&mut g, t, root, c).unwrap();
        assert!(matches!(
            compile_all(&mut g, guarded, GlslOptions::default(), ShaderStage::Fragment),
            Err(BackendError::Unsupported(_))
        ));
    }

    #[test]
    fn stage_restrictions() {
        let mut g = Graph::new();
        let pos = ops::attribute(
            &mut g,
            AttributeBuffer {
                name: "position".into(),
                ty: Type::VEC4,
            },
        )
        .unwrap();
        assert!(matches!(
            compile_all(&mut g, pos, GlslOptions::default(), ShaderStage::Fragment),
            Err(BackendError::Unsupported(_))
        ));
        assert!(compile_all(&mut g, pos, GlslOptions::default(), ShaderStage::Vertex).is_ok());

        let c = ops::frag_coord(&mut g).unwrap();
        let d = dfdx(&mut g, c).unwrap();
        assert!(matches!(
            compile_all(&mut g, d, GlslOptions::default(), ShaderStage::Vertex),
            Err(BackendError::Unsupported(_))
        ));
        let ctx = compile_all(&mut g, d, GlslOptions::default(), ShaderStage::Fragment).unwrap();
        assert!(ctx.finish("").contains("GL_OES_standard_derivatives"));
    }
}
