//! Inline GLSL text for expression nodes.

use shade_backend_core::BackendError;
use shade_ir::{GlslForm, Graph, NodeHandle, NodeKind, ScalarKind, Type, Value};

use crate::context::CompilationContext;

/// GLSL spelling of a host value.
///
/// Arrays have no literal syntax in GLSL ES 1.0; they are materialized
/// element by element instead.
pub fn literal(value: &Value) -> Result<String, BackendError> {
    match value {
        Value::Array(_) => Err(BackendError::Unsupported(
            "array literals in expression position".into(),
        )),
        Value::Struct(fields) => {
            let args = fields
                .values()
                .map(literal)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("{}({})", value.ty().glsl_name(), args.join(", ")))
        }
        _ => Ok(value.to_string()),
    }
}

/// `(op operand)`, separating operators that would otherwise fuse into
/// `--` or `!!`.
fn prefix(op: &str, operand: &str) -> String {
    let fuses = operand.starts_with('-') || operand.starts_with(op);
    if fuses {
        format!("({op} {operand})")
    } else {
        format!("({op}{operand})")
    }
}

/// Inline GLSL text for `h`.
///
/// Every result is a primary expression (identifier, literal, call or
/// parenthesized), so it can be used as an operand without further
/// parenthesization. Nodes bound in `ctx` render as their bound text.
pub fn glsl_expression(
    g: &Graph,
    ctx: &CompilationContext,
    h: NodeHandle,
) -> Result<String, BackendError> {
    if let Some(text) = ctx.bound(h) {
        return Ok(text.to_string());
    }
    let node = g.try_node(h)?;
    let parents = node.parents();
    let args = || {
        parents
            .iter()
            .map(|&p| glsl_expression(g, ctx, p))
            .collect::<Result<Vec<_>, _>>()
    };
    let text = match node.kind() {
        NodeKind::Constant(v) => literal(v)?,
        NodeKind::Parameter { name } => name.clone(),
        NodeKind::Attribute(buffer) => buffer.name.clone(),
        NodeKind::Sampler(texture) => texture.name.clone(),
        NodeKind::FragCoord => "gl_FragCoord".into(),
        NodeKind::Construct | NodeKind::Struct { .. } => {
            format!("{}({})", node.ty().glsl_name(), args()?.join(", "))
        }
        NodeKind::Array => {
            return Err(BackendError::Other(format!(
                "array node {h} used before it was compiled"
            )));
        }
        NodeKind::Swizzle { pattern, .. } => {
            format!("{}.{pattern}", glsl_expression(g, ctx, parents[0])?)
        }
        NodeKind::Index => {
            let base = glsl_expression(g, ctx, parents[0])?;
            format!("{base}[{}]", index_expression(g, ctx, parents[1])?)
        }
        NodeKind::Field { name, .. } => {
            format!("{}.{name}", glsl_expression(g, ctx, parents[0])?)
        }
        NodeKind::Call(f) => {
            let args = args()?;
            match (f.glsl, args.as_slice()) {
                (GlslForm::Infix(op), [a, b]) => format!("({a} {op} {b})"),
                (GlslForm::Prefix(op), [a]) => prefix(op, a),
                (GlslForm::Call(name), _) => format!("{name}({})", args.join(", ")),
                _ => {
                    return Err(BackendError::Other(format!(
                        "{} cannot be rendered with {} operand(s)",
                        f.name,
                        args.len()
                    )));
                }
            }
        }
        NodeKind::Cast(target) => {
            let operand = glsl_expression(g, ctx, parents[0])?;
            // float -> int rounds toward negative infinity, as on the host
            if *target == ScalarKind::Sint && g.ty(parents[0]).is_floating() {
                format!("int(floor({operand}))")
            } else {
                format!("{}({operand})", Type::Scalar(*target).glsl_name())
            }
        }
        NodeKind::Select => {
            let [c, a, b] = args()?.try_into().map_err(|_| {
                BackendError::Other(format!("select node {h} without three operands"))
            })?;
            format!("({c} ? {a} : {b})")
        }
        // the discard statement itself is emitted by the compile step
        NodeKind::Discard => glsl_expression(g, ctx, parents[0])?,
    };
    Ok(text)
}

/// Index operands are `int` in GLSL; float indices are floored.
fn index_expression(
    g: &Graph,
    ctx: &CompilationContext,
    ix: NodeHandle,
) -> Result<String, BackendError> {
    if ctx.bound(ix).is_none() {
        if let NodeKind::Constant(v) = g.kind(ix) {
            if let Some(i) = v.as_index() {
                return Ok(i.to_string());
            }
        }
    }
    let text = glsl_expression(g, ctx, ix)?;
    if g.ty(ix).is_floating() {
        Ok(format!("int(floor({text}))"))
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GlslOptions;
    use shade_backend_core::ShaderStage;
    use shade_core::builtins::{add, dot, mul, neg, not, texture2d};
    use shade_core::{HostValue, make, ops};
    use shade_ir::Texture;

    fn render(g: &Graph, h: NodeHandle) -> String {
        let ctx = CompilationContext::new(g, h, GlslOptions::default(), ShaderStage::Fragment);
        glsl_expression(g, &ctx, h).unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(literal(&Value::Float(2.0)).unwrap(), "2.0");
        assert_eq!(literal(&Value::Int(-1)).unwrap(), "-1");
        assert_eq!(
            literal(&Value::Vec(vec![0.5, 1.0])).unwrap(),
            "vec2(0.5, 1.0)"
        );
        assert!(literal(&Value::Array(vec![Value::Int(1)])).is_err());
    }

    #[test]
    fn struct_literals_follow_canonical_order() {
        let mut g = Graph::new();
        let s = make(&mut g, HostValue::record([("b", 2.0), ("a", 1.0)])).unwrap();
        let ty = g.ty(s).clone();
        assert_eq!(render(&g, s), format!("{}(1.0, 2.0)", ty.glsl_name()));
    }

    #[test]
    fn operators_are_parenthesized() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let a = add(&mut g, t, 1.0).unwrap();
        let m = mul(&mut g, a, 2.0).unwrap();
        assert_eq!(render(&g, m), "((t + 1.0) * 2.0)");
        let n = neg(&mut g, m).unwrap();
        assert_eq!(render(&g, n), "(-((t + 1.0) * 2.0))");
        let k = neg(&mut g, -1.5).unwrap();
        assert_eq!(render(&g, k), "(- -1.5)");
        let nn = neg(&mut g, n).unwrap();
        assert_eq!(render(&g, nn), "(-(-((t + 1.0) * 2.0)))");
        let b = not(&mut g, true).unwrap();
        assert_eq!(render(&g, b), "(!true)");
    }

    #[test]
    fn calls_swizzles_and_indices() {
        let mut g = Graph::new();
        let c = ops::frag_coord(&mut g).unwrap();
        let xy = ops::swizzle(&mut g, c, "xy").unwrap();
        let d = dot(&mut g, xy, xy).unwrap();
        assert_eq!(render(&g, d), "dot(gl_FragCoord.xy, gl_FragCoord.xy)");

        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let i = ops::at(&mut g, c, t).unwrap();
        assert_eq!(render(&g, i), "gl_FragCoord[int(floor(t))]");
        let j = ops::at(&mut g, c, 2.7).unwrap();
        assert_eq!(render(&g, j), "gl_FragCoord[2]");

        let tex = ops::sampler2d(
            &mut g,
            Texture {
                name: "image".into(),
                width: 2,
                height: 2,
            },
        )
        .unwrap();
        let texel = texture2d(&mut g, tex, xy).unwrap();
        assert_eq!(render(&g, texel), "texture2D(image, gl_FragCoord.xy)");
    }

    #[test]
    fn casts_and_selection() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let i = ops::as_int(&mut g, t).unwrap();
        assert_eq!(render(&g, i), "int(floor(t))");
        let f = ops::as_float(&mut g, i).unwrap();
        assert_eq!(render(&g, f), "float(int(floor(t)))");
        let c = shade_core::builtins::gt(&mut g, t, 0.0).unwrap();
        let s = ops::select(&mut g, c, t, 0.0).unwrap();
        assert_eq!(render(&g, s), "((t > 0.0) ? t : 0.0)");
    }

    #[test]
    fn constructors() {
        let mut g = Graph::new();
        let t = ops::parameter(&mut g, "t", Type::FLOAT).unwrap();
        let v = ops::vec(&mut g, vec![t.into(), 0.0.into(), 1.0.into()]).unwrap();
        assert_eq!(render(&g, v), "vec3(t, 0.0, 1.0)");
    }
}
