//! Constructors, accessors and the non-builtin node kinds.

use shade_ir::{
    AttributeBuffer, Graph, NodeHandle, NodeKind, Result, ScalarKind, ShadeError, Texture, Type,
    Value, VectorSize,
};

use crate::element;
use crate::make::{HostValue, make, make_all};

fn build_vector(g: &mut Graph, kind: ScalarKind, args: Vec<HostValue>) -> Result<NodeHandle> {
    let context = match kind {
        ScalarKind::Float => "vec",
        ScalarKind::Sint => "ivec",
        ScalarKind::Bool => "bvec",
    };
    let parents = make_all(g, args)?;
    let types: Vec<Type> = parents.iter().map(|&p| g.ty(p).clone()).collect();
    let mut len = 0;
    for ty in &types {
        if ty.scalar_kind() != Some(kind) || ty.is_mat() {
            return Err(ShadeError::type_mismatch(
                context,
                format!("{} scalars or vectors", Type::Scalar(kind)),
                &types,
            ));
        }
        len += ty.flat_len().unwrap_or(0);
    }
    let Some(size) = VectorSize::from_len(len) else {
        return Err(ShadeError::InvalidExpression(format!(
            "{context} needs 2 to 4 components, got {len}"
        )));
    };
    g.append(NodeKind::Construct, Type::vector(size, kind), parents)
}

/// `vecN(...)`: concatenates float scalars and vectors.
pub fn vec(g: &mut Graph, args: Vec<HostValue>) -> Result<NodeHandle> {
    build_vector(g, ScalarKind::Float, args)
}

/// `ivecN(...)`: concatenates int scalars and vectors.
pub fn ivec(g: &mut Graph, args: Vec<HostValue>) -> Result<NodeHandle> {
    build_vector(g, ScalarKind::Sint, args)
}

/// `bvecN(...)`: concatenates bool scalars and vectors.
pub fn bvec(g: &mut Graph, args: Vec<HostValue>) -> Result<NodeHandle> {
    build_vector(g, ScalarKind::Bool, args)
}

/// `matN(...)`: column-major concatenation of float scalars and vectors.
pub fn mat(g: &mut Graph, args: Vec<HostValue>) -> Result<NodeHandle> {
    let parents = make_all(g, args)?;
    let types: Vec<Type> = parents.iter().map(|&p| g.ty(p).clone()).collect();
    let mut len = 0;
    for ty in &types {
        if ty.scalar_kind() != Some(ScalarKind::Float) {
            return Err(ShadeError::type_mismatch("mat", "floats or vectors", &types));
        }
        len += ty.flat_len().unwrap_or(0);
    }
    let size = match len {
        4 => VectorSize::Bi,
        9 => VectorSize::Tri,
        16 => VectorSize::Quad,
        _ => {
            return Err(ShadeError::InvalidExpression(format!(
                "mat needs 4, 9 or 16 components, got {len}"
            )));
        }
    };
    g.append(NodeKind::Construct, Type::Matrix { size }, parents)
}

/// An array of same-typed elements.
pub fn array(g: &mut Graph, elements: Vec<NodeHandle>) -> Result<NodeHandle> {
    let Some(&first) = elements.first() else {
        return Err(ShadeError::InvalidExpression(
            "arrays need at least one element".into(),
        ));
    };
    let base = g.ty(first).clone();
    let types: Vec<Type> = elements.iter().map(|&e| g.ty(e).clone()).collect();
    if base.is_array() || base == Type::Sampler2D || types.iter().any(|t| *t != base) {
        return Err(ShadeError::type_mismatch("array", "elements of one type", &types));
    }
    g.append(NodeKind::Array, Type::array(base, elements.len() as u32), elements)
}

/// A struct value; fields are stored in canonical (name) order.
pub fn structure(g: &mut Graph, fields: Vec<(String, HostValue)>) -> Result<NodeHandle> {
    let mut built = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        built.push((name, make(g, value)?));
    }
    let ty = Type::structure(built.iter().map(|(n, h)| (n.clone(), g.ty(*h).clone())))?;
    built.sort_by(|a, b| a.0.cmp(&b.0));
    let (names, parents): (Vec<String>, Vec<NodeHandle>) = built.into_iter().unzip();
    g.append(NodeKind::Struct { fields: names }, ty, parents)
}

fn swizzle_index(letter: char) -> Option<(usize, u32)> {
    const GROUPS: [&str; 3] = ["rgba", "xyzw", "stpq"];
    GROUPS
        .iter()
        .enumerate()
        .find_map(|(group, letters)| letters.find(letter).map(|i| (group, i as u32)))
}

/// Selects components of a vector by letters from one of `rgba`, `xyzw`
/// or `stpq`.
pub fn swizzle(g: &mut Graph, value: impl Into<HostValue>, pattern: &str) -> Result<NodeHandle> {
    let parent = make(g, value)?;
    let ty = g.ty(parent).clone();
    let pattern = pattern.to_lowercase();
    let invalid = || ShadeError::InvalidSwizzle {
        pattern: pattern.clone(),
        ty: ty.to_string(),
    };
    let (Some(width), Some(kind)) = (ty.vec_dimension(), ty.scalar_kind()) else {
        return Err(invalid());
    };
    if !(1..=4).contains(&pattern.len()) {
        return Err(invalid());
    }
    let mut group = None;
    let mut indices = Vec::with_capacity(pattern.len());
    for letter in pattern.chars() {
        let (g_ix, i) = swizzle_index(letter).ok_or_else(invalid)?;
        if *group.get_or_insert(g_ix) != g_ix || i as usize >= width {
            return Err(invalid());
        }
        indices.push(i);
    }
    let result = match VectorSize::from_len(indices.len()) {
        Some(size) => Type::vector(size, kind),
        None => Type::Scalar(kind),
    };
    // A swizzle of a dynamically indexed value has no compile-time offset.
    let materialize = if matches!(g.kind(parent), NodeKind::Index) {
        let index = g.parents(parent)[1];
        !element::is_constant(g, index)?
    } else {
        false
    };
    g.append(
        NodeKind::Swizzle {
            pattern,
            indices,
            materialize,
        },
        result,
        vec![parent],
    )
}

/// `value[index]` on a vector, matrix or array; `index` is `int` or `float`.
pub fn at(
    g: &mut Graph,
    value: impl Into<HostValue>,
    index: impl Into<HostValue>,
) -> Result<NodeHandle> {
    let base = make(g, value)?;
    let index = make(g, index)?;
    let (base_ty, index_ty) = (g.ty(base).clone(), g.ty(index).clone());
    if !index_ty.is_integral() && !index_ty.is_floating() {
        return Err(ShadeError::type_mismatch(
            "at",
            "an int or float index",
            &[&base_ty, &index_ty],
        ));
    }
    let Some(result) = base_ty.array_base() else {
        return Err(ShadeError::type_mismatch(
            "at",
            "a vector, matrix or array",
            &[&base_ty, &index_ty],
        ));
    };
    g.append(NodeKind::Index, result, vec![base, index])
}

/// Struct field access; projects straight through struct constructors.
pub fn field(g: &mut Graph, value: impl Into<HostValue>, name: &str) -> Result<NodeHandle> {
    let parent = make(g, value)?;
    let ty = g.ty(parent).clone();
    if !ty.is_struct() {
        return Err(ShadeError::type_mismatch("field", "a struct", &[ty]));
    }
    let Some(index) = ty.field_index(name) else {
        return Err(ShadeError::FieldNotFound {
            field: name.to_string(),
            ty: ty.to_string(),
        });
    };
    if let NodeKind::Struct { .. } = g.kind(parent) {
        return Ok(g.parents(parent)[index]);
    }
    let field_ty = ty.members()[index].ty.clone();
    g.append(
        NodeKind::Field {
            name: name.to_string(),
            index: index as u32,
        },
        field_ty,
        vec![parent],
    )
}

fn cast(g: &mut Graph, value: HostValue, target: ScalarKind) -> Result<NodeHandle> {
    let h = make(g, value)?;
    let ty = g.ty(h).clone();
    if ty == Type::Scalar(target) {
        return Ok(h);
    }
    if !ty.is_pod() {
        return Err(ShadeError::type_mismatch(
            format!("cast to {target}"),
            "a scalar",
            &[ty],
        ));
    }
    g.append(NodeKind::Cast(target), Type::Scalar(target), vec![h])
}

pub fn as_int(g: &mut Graph, value: impl Into<HostValue>) -> Result<NodeHandle> {
    cast(g, value.into(), ScalarKind::Sint)
}

pub fn as_float(g: &mut Graph, value: impl Into<HostValue>) -> Result<NodeHandle> {
    cast(g, value.into(), ScalarKind::Float)
}

pub fn as_bool(g: &mut Graph, value: impl Into<HostValue>) -> Result<NodeHandle> {
    cast(g, value.into(), ScalarKind::Bool)
}

/// `cond ? if_true : if_false`. Only the condition is always evaluated.
pub fn select(
    g: &mut Graph,
    cond: impl Into<HostValue>,
    if_true: impl Into<HostValue>,
    if_false: impl Into<HostValue>,
) -> Result<NodeHandle> {
    let cond = make(g, cond)?;
    let a = make(g, if_true)?;
    let b = make(g, if_false)?;
    let types = [g.ty(cond).clone(), g.ty(a).clone(), g.ty(b).clone()];
    if types[0] != Type::BOOL || types[1] != types[2] {
        return Err(ShadeError::type_mismatch(
            "select",
            "a bool condition and branches of one type",
            &types,
        ));
    }
    let ty = types[1].clone();
    g.append(NodeKind::Select, ty, vec![cond, a, b])
}

/// Passes `value` through, discarding the fragment when `cond` holds.
pub fn discard_if(
    g: &mut Graph,
    value: impl Into<HostValue>,
    cond: impl Into<HostValue>,
) -> Result<NodeHandle> {
    let value = make(g, value)?;
    let cond = make(g, cond)?;
    let (ty, cond_ty) = (g.ty(value).clone(), g.ty(cond).clone());
    if cond_ty != Type::BOOL {
        return Err(ShadeError::type_mismatch(
            "discard_if",
            "a bool condition",
            &[ty, cond_ty],
        ));
    }
    g.append(NodeKind::Discard, ty, vec![value, cond])
}

/// An unbound uniform of a numeric type.
pub fn parameter(g: &mut Graph, name: &str, ty: Type) -> Result<NodeHandle> {
    if !ty.is_numeric_shape() {
        return Err(ShadeError::type_mismatch(
            format!("parameter {name}"),
            "a scalar, vector or matrix type",
            &[ty],
        ));
    }
    g.append(
        NodeKind::Parameter {
            name: name.to_string(),
        },
        ty,
        vec![],
    )
}

/// A uniform bound to `value`.
pub fn uniform(g: &mut Graph, name: &str, value: Value) -> Result<NodeHandle> {
    value.check_shape()?;
    let h = parameter(g, name, value.ty())?;
    g.set_parameter(h, value)?;
    Ok(h)
}

pub fn attribute(g: &mut Graph, buffer: AttributeBuffer) -> Result<NodeHandle> {
    if !buffer.ty.is_pod() && !buffer.ty.is_vec() {
        return Err(ShadeError::type_mismatch(
            format!("attribute {}", buffer.name),
            "a scalar or vector item type",
            &[&buffer.ty],
        ));
    }
    let ty = buffer.ty.clone();
    g.append(NodeKind::Attribute(buffer), ty, vec![])
}

pub fn sampler2d(g: &mut Graph, texture: Texture) -> Result<NodeHandle> {
    g.append(NodeKind::Sampler(texture), Type::Sampler2D, vec![])
}

/// The window-space fragment coordinate, `gl_FragCoord`.
pub fn frag_coord(g: &mut Graph) -> Result<NodeHandle> {
    g.append(NodeKind::FragCoord, Type::VEC4, vec![])
}

fn limit(g: &mut Graph, ty: &Type, value: Option<Value>, what: &str) -> Result<NodeHandle> {
    let value = value.ok_or_else(|| {
        ShadeError::type_mismatch(what, "a numeric scalar, vector or matrix type", &[ty])
    })?;
    crate::make::constant(g, value)
}

/// The zero constant of a numeric type.
pub fn zero(g: &mut Graph, ty: &Type) -> Result<NodeHandle> {
    limit(g, ty, ty.zero(), "zero")
}

/// The largest finite value of `ty` that every GLSL ES target represents.
pub fn infinity(g: &mut Graph, ty: &Type) -> Result<NodeHandle> {
    limit(g, ty, ty.infinity(), "infinity")
}

/// Negation of [`infinity`].
pub fn minus_infinity(g: &mut Graph, ty: &Type) -> Result<NodeHandle> {
    limit(g, ty, ty.minus_infinity(), "minus_infinity")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_constructors_concatenate() {
        let mut g = Graph::new();
        let xy = vec(&mut g, vec![1.0.into(), 2.0.into()]).unwrap();
        let v = vec(&mut g, vec![xy.into(), 3.0.into(), 4.0.into()]).unwrap();
        assert_eq!(g.ty(v), &Type::VEC4);
        let iv = ivec(&mut g, vec![1.into(), 2.into(), 3.into()]).unwrap();
        assert_eq!(g.ty(iv), &Type::IVEC3);
        assert!(matches!(
            vec(&mut g, vec![1.0.into()]),
            Err(ShadeError::InvalidExpression(_))
        ));
        assert!(matches!(
            vec(&mut g, vec![1.0.into(), 1.into()]),
            Err(ShadeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn matrix_constructor_sizes() {
        let mut g = Graph::new();
        let cols: Vec<HostValue> = (0..3)
            .map(|_| Value::Vec(vec![0.0, 1.0, 0.0]).into())
            .collect();
        let m = mat(&mut g, cols).unwrap();
        assert_eq!(g.ty(m), &Type::MAT3);
        let scalars: Vec<HostValue> = (0..4).map(|i| (i as f32).into()).collect();
        let id = mat(&mut g, scalars).unwrap();
        assert_eq!(g.ty(id), &Type::MAT2);
    }

    #[test]
    fn swizzle_patterns() {
        let mut g = Graph::new();
        let v = make(&mut g, Value::Vec(vec![1.0, 2.0, 3.0])).unwrap();
        let s = swizzle(&mut g, v, "ZyX").unwrap();
        assert_eq!(g.ty(s), &Type::VEC3);
        let NodeKind::Swizzle { pattern, indices, materialize } = g.kind(s) else {
            panic!("expected a swizzle");
        };
        assert_eq!(pattern, "zyx");
        assert_eq!(indices, &[2, 1, 0]);
        assert!(!materialize);
        let id = swizzle(&mut g, v, "r").unwrap();
        assert_eq!(g.ty(id), &Type::FLOAT);
        let id = swizzle(&mut g, v, "stst").unwrap();
        assert_eq!(g.ty(id), &Type::VEC4);

        for bad in ["", "xyzwx", "w", "xg", "q", "k"] {
            assert!(
                matches!(swizzle(&mut g, v, bad), Err(ShadeError::InvalidSwizzle { .. })),
                "pattern {bad:?} accepted"
            );
        }
        let scalar = make(&mut g, 1.0).unwrap();
        assert!(swizzle(&mut g, scalar, "x").is_err());
    }

    #[test]
    fn swizzle_of_dynamic_index_materializes() {
        let mut g = Graph::new();
        let table = make(
            &mut g,
            vec![Value::Vec(vec![1.0, 0.0]), Value::Vec(vec![0.0, 1.0])],
        )
        .unwrap();
        let ix = parameter(&mut g, "ix", Type::INT).unwrap();
        let row = at(&mut g, table, ix).unwrap();
        let s = swizzle(&mut g, row, "yx").unwrap();
        assert!(matches!(g.kind(s), NodeKind::Swizzle { materialize: true, .. }));

        let fixed = at(&mut g, table, 1).unwrap();
        let s = swizzle(&mut g, fixed, "yx").unwrap();
        assert!(matches!(g.kind(s), NodeKind::Swizzle { materialize: false, .. }));
    }

    #[test]
    fn at_checks_types() {
        let mut g = Graph::new();
        let v = make(&mut g, Value::Vec(vec![1.0, 2.0])).unwrap();
        let id = at(&mut g, v, 0).unwrap();
        assert_eq!(g.ty(id), &Type::FLOAT);
        let id = at(&mut g, v, 1.0).unwrap();
        assert_eq!(g.ty(id), &Type::FLOAT);
        assert!(matches!(at(&mut g, v, true), Err(ShadeError::TypeMismatch { .. })));
        let s = make(&mut g, 2.0).unwrap();
        assert!(matches!(at(&mut g, s, 0), Err(ShadeError::TypeMismatch { .. })));
        let m = make(&mut g, Value::identity(VectorSize::Tri)).unwrap();
        let id = at(&mut g, m, 2).unwrap();
        assert_eq!(g.ty(id), &Type::VEC3);
    }

    #[test]
    fn field_projects_through_constructors() {
        let mut g = Graph::new();
        let one = make(&mut g, 1.0).unwrap();
        let fields = vec![("b".into(), 2.0.into()), ("a".into(), one.into())];
        let s = structure(&mut g, fields).unwrap();
        assert_eq!(field(&mut g, s, "a").unwrap(), one);
        assert!(matches!(
            field(&mut g, s, "c"),
            Err(ShadeError::FieldNotFound { .. })
        ));
        assert!(matches!(
            field(&mut g, one, "a"),
            Err(ShadeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn casts() {
        let mut g = Graph::new();
        let f = make(&mut g, 2.5).unwrap();
        assert_eq!(as_float(&mut g, f).unwrap(), f);
        let i = as_int(&mut g, f).unwrap();
        assert_eq!(g.ty(i), &Type::INT);
        let id = as_bool(&mut g, i).unwrap();
        assert_eq!(g.ty(id), &Type::BOOL);
        let v = make(&mut g, Value::Vec(vec![1.0, 2.0])).unwrap();
        assert!(as_int(&mut g, v).is_err());
    }

    #[test]
    fn select_and_discard_types() {
        let mut g = Graph::new();
        let s = select(&mut g, true, 1.0, 2.0).unwrap();
        assert_eq!(g.ty(s), &Type::FLOAT);
        assert!(select(&mut g, 1.0, 1.0, 2.0).is_err());
        assert!(select(&mut g, true, 1.0, 2).is_err());
        let d = discard_if(&mut g, Value::Vec(vec![1.0, 0.0, 0.0, 1.0]), false).unwrap();
        assert_eq!(g.ty(d), &Type::VEC4);
    }

    #[test]
    fn uniforms_are_bound() {
        let mut g = Graph::new();
        let u = uniform(&mut g, "scale", Value::Float(2.0)).unwrap();
        assert_eq!(g.parameter_value(u), Some(&Value::Float(2.0)));
        assert!(parameter(&mut g, "s", Type::Sampler2D).is_err());
    }

    #[test]
    fn malformed_uniform_values_are_rejected() {
        let mut g = Graph::new();
        assert!(uniform(&mut g, "v", Value::Vec(vec![1.0; 5])).is_err());
        let m = Value::Mat {
            size: shade_ir::VectorSize::Tri,
            data: vec![1.0; 4],
        };
        assert!(uniform(&mut g, "m", m).is_err());
        assert!(g.is_empty());

        let p = parameter(&mut g, "p", Type::VEC2).unwrap();
        assert!(g.set_parameter(p, Value::Vec(vec![1.0])).is_err());
    }

    #[test]
    fn type_limits() {
        let mut g = Graph::new();
        let z = zero(&mut g, &Type::VEC2).unwrap();
        assert!(matches!(g.kind(z), NodeKind::Constant(Value::Vec(v)) if v == &[0.0, 0.0]));
        let hi = infinity(&mut g, &Type::INT).unwrap();
        assert!(matches!(g.kind(hi), NodeKind::Constant(Value::Int(65535))));
        let lo = minus_infinity(&mut g, &Type::FLOAT).unwrap();
        assert!(matches!(g.kind(lo), NodeKind::Constant(Value::Float(v)) if *v == -1e18));
        assert!(matches!(
            zero(&mut g, &Type::BOOL),
            Err(ShadeError::TypeMismatch { .. })
        ));
    }
}
