//! Builtin function catalog and registry.
//!
//! Every operator and GLSL builtin is described by a [`BuiltinFunction`]
//! and dispatched through the same overload resolver. The default registry
//! is built once and shared; free functions at the bottom of this module
//! call into it.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use shade_ir::{
    BuiltinFunction, ElementRule, GlslForm, Graph, NodeHandle, NodeKind, Result, ShadeError,
    Signature, Type, Value,
};

use crate::make::{HostValue, constant, make_all};
use crate::resolve::resolve;

/// Name-indexed collection of builtin functions.
#[derive(Debug, Default)]
pub struct BuiltinRegistry {
    functions: HashMap<&'static str, Arc<BuiltinFunction>>,
}

impl BuiltinRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the full builtin catalog.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        for f in catalog() {
            reg.register(f);
        }
        reg
    }

    /// Adds `f`, replacing any builtin of the same name.
    pub fn register(&mut self, f: BuiltinFunction) {
        self.functions.insert(f.name, Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<BuiltinFunction>> {
        self.functions.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Normalizes `args`, resolves the overload and appends the call.
    pub fn call(&self, g: &mut Graph, name: &str, args: Vec<HostValue>) -> Result<NodeHandle> {
        let f = self
            .get(name)
            .ok_or_else(|| ShadeError::InvalidExpression(format!("unknown builtin '{name}'")))?
            .clone();
        let literals: Vec<Option<i32>> = args
            .iter()
            .map(|a| match a {
                HostValue::Int(i) => Some(*i),
                _ => None,
            })
            .collect();
        let mut parents = make_all(g, args)?;
        if literals.iter().any(Option::is_some) {
            promote_int_literals(g, &f, &mut parents, &literals)?;
        }
        call_function(g, &f, parents)
    }
}

/// Integer literals stand in for floats when no signature takes them as
/// ints, so `clamp(x, 0, 10)` resolves like `clamp(x, 0.0, 10.0)`.
fn promote_int_literals(
    g: &mut Graph,
    f: &BuiltinFunction,
    parents: &mut [NodeHandle],
    literals: &[Option<i32>],
) -> Result<()> {
    let types: Vec<Type> = parents.iter().map(|&p| g.ty(p).clone()).collect();
    if resolve(&f.signatures, &types).is_ok() {
        return Ok(());
    }
    let promoted: Vec<Type> = types
        .iter()
        .zip(literals)
        .map(|(t, l)| if l.is_some() { Type::FLOAT } else { t.clone() })
        .collect();
    if resolve(&f.signatures, &promoted).is_err() {
        return Ok(());
    }
    log::debug!("{}: promoting integer literals to float", f.name);
    for (p, l) in parents.iter_mut().zip(literals) {
        if let Some(i) = l {
            *p = constant(g, Value::Float(*i as f32))?;
        }
    }
    Ok(())
}

/// Resolves `f` against the types of `parents` and appends the call node.
pub fn call_function(
    g: &mut Graph,
    f: &Arc<BuiltinFunction>,
    parents: Vec<NodeHandle>,
) -> Result<NodeHandle> {
    let types: Vec<Type> = parents.iter().map(|&p| g.ty(p).clone()).collect();
    let result = resolve(&f.signatures, &types)
        .map_err(|e| e.on(f.name))?
        .clone();
    g.append(NodeKind::Call(Arc::clone(f)), result, parents)
}

static REGISTRY: LazyLock<BuiltinRegistry> = LazyLock::new(BuiltinRegistry::with_builtins);

/// The shared registry holding the full catalog.
pub fn registry() -> &'static BuiltinRegistry {
    &REGISTRY
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

const GEN_TYPES: [Type; 4] = [Type::FLOAT, Type::VEC2, Type::VEC3, Type::VEC4];
const VECS: [Type; 3] = [Type::VEC2, Type::VEC3, Type::VEC4];
const IVECS: [Type; 3] = [Type::IVEC2, Type::IVEC3, Type::IVEC4];
const BVECS: [Type; 3] = [Type::BVEC2, Type::BVEC3, Type::BVEC4];
const MATS: [Type; 3] = [Type::MAT2, Type::MAT3, Type::MAT4];

/// `genType f(genType, ...)` with `arity` parameters.
fn same_type(arity: usize) -> Vec<Signature> {
    GEN_TYPES
        .iter()
        .map(|t| Signature::new(vec![t.clone(); arity], t.clone()))
        .collect()
}

/// `float f(genType, ...)` with `arity` parameters.
fn to_float(arity: usize) -> Vec<Signature> {
    GEN_TYPES
        .iter()
        .map(|t| Signature::new(vec![t.clone(); arity], Type::FLOAT))
        .collect()
}

fn arithmetic(products: bool) -> Vec<Signature> {
    let mut sigs = vec![
        Signature::new([Type::FLOAT, Type::FLOAT], Type::FLOAT),
        Signature::new([Type::INT, Type::INT], Type::INT),
    ];
    for (v, iv) in VECS.iter().zip(&IVECS) {
        sigs.push(Signature::new([v.clone(), v.clone()], v.clone()));
        sigs.push(Signature::new([v.clone(), Type::FLOAT], v.clone()));
        sigs.push(Signature::new([Type::FLOAT, v.clone()], v.clone()));
        sigs.push(Signature::new([iv.clone(), iv.clone()], iv.clone()));
        sigs.push(Signature::new([iv.clone(), Type::INT], iv.clone()));
        sigs.push(Signature::new([Type::INT, iv.clone()], iv.clone()));
    }
    for (m, v) in MATS.iter().zip(&VECS) {
        sigs.push(Signature::new([m.clone(), m.clone()], m.clone()));
        sigs.push(Signature::new([m.clone(), Type::FLOAT], m.clone()));
        sigs.push(Signature::new([Type::FLOAT, m.clone()], m.clone()));
        if products {
            sigs.push(Signature::new([m.clone(), v.clone()], v.clone()));
            sigs.push(Signature::new([v.clone(), m.clone()], v.clone()));
        }
    }
    sigs
}

/// `min`, `max`, `mod`: same-type pairs plus vector-by-float.
fn min_max() -> Vec<Signature> {
    let mut sigs = same_type(2);
    sigs.extend(VECS.iter().map(|v| Signature::new([v.clone(), Type::FLOAT], v.clone())));
    sigs
}

fn vector_compare(include_bool: bool) -> Vec<Signature> {
    let mut sigs = Vec::new();
    for ((v, iv), bv) in VECS.iter().zip(&IVECS).zip(&BVECS) {
        sigs.push(Signature::new([v.clone(), v.clone()], bv.clone()));
        sigs.push(Signature::new([iv.clone(), iv.clone()], bv.clone()));
        if include_bool {
            sigs.push(Signature::new([bv.clone(), bv.clone()], bv.clone()));
        }
    }
    sigs
}

fn scalar_compare() -> Vec<Signature> {
    vec![
        Signature::new([Type::FLOAT, Type::FLOAT], Type::BOOL),
        Signature::new([Type::INT, Type::INT], Type::BOOL),
    ]
}

fn equality() -> Vec<Signature> {
    let mut sigs = vec![
        Signature::new([Type::FLOAT, Type::FLOAT], Type::BOOL),
        Signature::new([Type::INT, Type::INT], Type::BOOL),
        Signature::new([Type::BOOL, Type::BOOL], Type::BOOL),
    ];
    for t in VECS.iter().chain(&IVECS).chain(&BVECS).chain(&MATS) {
        sigs.push(Signature::new([t.clone(), t.clone()], Type::BOOL));
    }
    sigs
}

// ---------------------------------------------------------------------------
// Evaluators
// ---------------------------------------------------------------------------

fn bad_operands(args: &[Value]) -> ShadeError {
    let types: Vec<Type> = args.iter().map(Value::ty).collect();
    ShadeError::type_mismatch("host evaluation", "operands of the resolved signature", &types)
}

/// Applies `f` to matching scalar components, broadcasting scalar operands.
fn componentwise(
    args: &[Value],
    ty: &Type,
    f: impl Fn(&[Value]) -> Result<Value>,
) -> Result<Value> {
    let n = ty.flat_len().ok_or_else(|| bad_operands(args))?;
    let flats: Vec<Vec<Value>> = args.iter().map(Value::scalars).collect();
    let mut out = Vec::with_capacity(n);
    for k in 0..n {
        let row = flats
            .iter()
            .map(|s| match s.as_slice() {
                [one] => Some(one.clone()),
                many => many.get(k).cloned(),
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| bad_operands(args))?;
        out.push(f(&row)?);
    }
    Value::from_scalars(ty, out)
}

fn unary(args: &[Value], ty: &Type, f: fn(f32) -> f32) -> Result<Value> {
    componentwise(args, ty, |s| match s {
        [Value::Float(x)] => Ok(Value::Float(f(*x))),
        _ => Err(bad_operands(s)),
    })
}

fn binary(args: &[Value], ty: &Type, f: fn(f32, f32) -> f32) -> Result<Value> {
    componentwise(args, ty, |s| match s {
        [Value::Float(x), Value::Float(y)] => Ok(Value::Float(f(*x, *y))),
        _ => Err(bad_operands(s)),
    })
}

fn ternary(args: &[Value], ty: &Type, f: fn(f32, f32, f32) -> f32) -> Result<Value> {
    componentwise(args, ty, |s| match s {
        [Value::Float(x), Value::Float(y), Value::Float(z)] => Ok(Value::Float(f(*x, *y, *z))),
        _ => Err(bad_operands(s)),
    })
}

/// Float and int arithmetic; `fi` returns `None` on an undefined result.
fn arith(
    args: &[Value],
    ty: &Type,
    ff: fn(f32, f32) -> f32,
    fi: fn(i32, i32) -> Option<i32>,
) -> Result<Value> {
    componentwise(args, ty, |s| match s {
        [Value::Float(x), Value::Float(y)] => Ok(Value::Float(ff(*x, *y))),
        [Value::Int(x), Value::Int(y)] => fi(*x, *y).map(Value::Int).ok_or_else(|| {
            ShadeError::InvalidExpression(format!("undefined integer operation on {x} and {y}"))
        }),
        _ => Err(bad_operands(s)),
    })
}

fn compare(
    args: &[Value],
    ty: &Type,
    ff: fn(&f32, &f32) -> bool,
    fi: fn(&i32, &i32) -> bool,
) -> Result<Value> {
    componentwise(args, ty, |s| match s {
        [Value::Float(x), Value::Float(y)] => Ok(Value::Bool(ff(x, y))),
        [Value::Int(x), Value::Int(y)] => Ok(Value::Bool(fi(x, y))),
        _ => Err(bad_operands(s)),
    })
}

fn logic(args: &[Value], ty: &Type, f: fn(bool, bool) -> bool) -> Result<Value> {
    componentwise(args, ty, |s| match s {
        [Value::Bool(x), Value::Bool(y)] => Ok(Value::Bool(f(*x, *y))),
        _ => Err(bad_operands(s)),
    })
}

fn floats(v: &Value) -> Result<Vec<f32>> {
    v.scalars()
        .iter()
        .map(|s| s.as_f32().ok_or_else(|| bad_operands(std::slice::from_ref(v))))
        .collect()
}

fn from_floats(ty: &Type, data: Vec<f32>) -> Result<Value> {
    Value::from_scalars(ty, data.into_iter().map(Value::Float).collect())
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn length_of(args: &[Value], _: &Type) -> Result<Value> {
    let v = floats(&args[0])?;
    Ok(Value::Float(dot_product(&v, &v).sqrt()))
}

fn distance_of(args: &[Value], _: &Type) -> Result<Value> {
    let (a, b) = (floats(&args[0])?, floats(&args[1])?);
    let d: Vec<f32> = a.iter().zip(&b).map(|(x, y)| x - y).collect();
    Ok(Value::Float(dot_product(&d, &d).sqrt()))
}

fn dot_of(args: &[Value], _: &Type) -> Result<Value> {
    Ok(Value::Float(dot_product(&floats(&args[0])?, &floats(&args[1])?)))
}

fn cross_of(args: &[Value], ty: &Type) -> Result<Value> {
    let (a, b) = (floats(&args[0])?, floats(&args[1])?);
    let [a0, a1, a2] = a[..] else {
        return Err(bad_operands(args));
    };
    let [b0, b1, b2] = b[..] else {
        return Err(bad_operands(args));
    };
    from_floats(ty, vec![a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0])
}

fn normalize_of(args: &[Value], ty: &Type) -> Result<Value> {
    let v = floats(&args[0])?;
    let len = dot_product(&v, &v).sqrt();
    from_floats(ty, v.iter().map(|x| x / len).collect())
}

fn faceforward_of(args: &[Value], ty: &Type) -> Result<Value> {
    let (n, i, nref) = (floats(&args[0])?, floats(&args[1])?, floats(&args[2])?);
    let sign = if dot_product(&nref, &i) < 0.0 { 1.0 } else { -1.0 };
    from_floats(ty, n.iter().map(|x| sign * x).collect())
}

fn reflect_of(args: &[Value], ty: &Type) -> Result<Value> {
    let (i, n) = (floats(&args[0])?, floats(&args[1])?);
    let d = dot_product(&n, &i);
    from_floats(ty, i.iter().zip(&n).map(|(x, y)| x - 2.0 * d * y).collect())
}

fn refract_of(args: &[Value], ty: &Type) -> Result<Value> {
    let (i, n) = (floats(&args[0])?, floats(&args[1])?);
    let eta = args[2].as_f32().ok_or_else(|| bad_operands(args))?;
    let d = dot_product(&n, &i);
    let k = 1.0 - eta * eta * (1.0 - d * d);
    if k < 0.0 {
        return from_floats(ty, vec![0.0; i.len()]);
    }
    let s = eta * d + k.sqrt();
    from_floats(ty, i.iter().zip(&n).map(|(x, y)| eta * x - s * y).collect())
}

/// Linear-algebra product for matrix operands, component-wise otherwise.
fn mul_of(args: &[Value], ty: &Type) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Mat { size, data: a }, Value::Mat { data: b, .. }) => {
            let n = size.len();
            let data = (0..n * n)
                .map(|k| {
                    let (col, row) = (k / n, k % n);
                    (0..n).map(|j| a[j * n + row] * b[col * n + j]).sum::<f32>()
                })
                .collect();
            Ok(Value::Mat { size: *size, data })
        }
        (Value::Mat { size, data: m }, Value::Vec(v)) => {
            let n = size.len();
            let out = (0..n)
                .map(|row| (0..n).map(|j| m[j * n + row] * v[j]).sum::<f32>())
                .collect();
            Ok(Value::Vec(out))
        }
        (Value::Vec(v), Value::Mat { size, data: m }) => {
            let n = size.len();
            let out = (0..n).map(|col| dot_product(v, &m[col * n..(col + 1) * n])).collect();
            Ok(Value::Vec(out))
        }
        _ => arith(args, ty, |x, y| x * y, |x, y| Some(x.wrapping_mul(y))),
    }
}

fn neg_of(args: &[Value], ty: &Type) -> Result<Value> {
    componentwise(args, ty, |s| match s {
        [Value::Float(x)] => Ok(Value::Float(-x)),
        [Value::Int(x)] => Ok(Value::Int(x.wrapping_neg())),
        _ => Err(bad_operands(s)),
    })
}

fn reduce_bools(args: &[Value], all: bool) -> Result<Value> {
    let Value::BVec(v) = &args[0] else {
        return Err(bad_operands(args));
    };
    Ok(Value::Bool(if all {
        v.iter().all(|b| *b)
    } else {
        v.iter().any(|b| *b)
    }))
}

fn sign_of(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn smoothstep_of(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn device_only(_: &[Value], _: &Type) -> Result<Value> {
    Err(ShadeError::UnsupportedOperation(
        "device-only builtins cannot be evaluated on the host".into(),
    ))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

const BROADCAST: ElementRule = ElementRule::Broadcast { via: None };

fn builtin(
    name: &'static str,
    glsl: GlslForm,
    signatures: Vec<Signature>,
    evaluator: shade_ir::Evaluator,
    element: ElementRule,
) -> BuiltinFunction {
    BuiltinFunction {
        name,
        glsl,
        signatures,
        evaluator,
        element,
        device_only: false,
    }
}

fn glsl_call(
    name: &'static str,
    signatures: Vec<Signature>,
    evaluator: shade_ir::Evaluator,
    element: ElementRule,
) -> BuiltinFunction {
    builtin(name, GlslForm::Call(name), signatures, evaluator, element)
}

/// The full builtin catalog.
pub fn catalog() -> Vec<BuiltinFunction> {
    use ElementRule::*;
    use GlslForm::{Infix, Prefix};

    let mut fns = vec![
        // operators
        builtin(
            "add",
            Infix("+"),
            arithmetic(false),
            |a, t| arith(a, t, |x, y| x + y, |x, y| Some(x.wrapping_add(y))),
            BROADCAST,
        ),
        builtin(
            "sub",
            Infix("-"),
            arithmetic(false),
            |a, t| arith(a, t, |x, y| x - y, |x, y| Some(x.wrapping_sub(y))),
            BROADCAST,
        ),
        builtin("mul", Infix("*"), arithmetic(true), mul_of, Product),
        builtin(
            "div",
            Infix("/"),
            arithmetic(false),
            |a, t| arith(a, t, |x, y| x / y, i32::checked_div),
            BROADCAST,
        ),
        builtin(
            "neg",
            Prefix("-"),
            [Type::FLOAT, Type::INT]
                .into_iter()
                .chain(VECS)
                .chain(IVECS)
                .chain(MATS)
                .map(|t| Signature::new([t.clone()], t))
                .collect(),
            neg_of,
            BROADCAST,
        ),
        builtin(
            "lt",
            Infix("<"),
            scalar_compare(),
            |a, t| compare(a, t, |x, y| x < y, |x, y| x < y),
            Whole,
        ),
        builtin(
            "le",
            Infix("<="),
            scalar_compare(),
            |a, t| compare(a, t, |x, y| x <= y, |x, y| x <= y),
            Whole,
        ),
        builtin(
            "gt",
            Infix(">"),
            scalar_compare(),
            |a, t| compare(a, t, |x, y| x > y, |x, y| x > y),
            Whole,
        ),
        builtin(
            "ge",
            Infix(">="),
            scalar_compare(),
            |a, t| compare(a, t, |x, y| x >= y, |x, y| x >= y),
            Whole,
        ),
        builtin(
            "eq",
            Infix("=="),
            equality(),
            |a, _| Ok(Value::Bool(a[0] == a[1])),
            Whole,
        ),
        builtin(
            "ne",
            Infix("!="),
            equality(),
            |a, _| Ok(Value::Bool(a[0] != a[1])),
            Whole,
        ),
        builtin(
            "and",
            Infix("&&"),
            vec![Signature::new([Type::BOOL, Type::BOOL], Type::BOOL)],
            |a, t| logic(a, t, |x, y| x && y),
            Whole,
        ),
        builtin(
            "or",
            Infix("||"),
            vec![Signature::new([Type::BOOL, Type::BOOL], Type::BOOL)],
            |a, t| logic(a, t, |x, y| x || y),
            Whole,
        ),
        builtin(
            "xor",
            Infix("^^"),
            vec![Signature::new([Type::BOOL, Type::BOOL], Type::BOOL)],
            |a, t| logic(a, t, |x, y| x != y),
            Whole,
        ),
        builtin(
            "not",
            Prefix("!"),
            vec![Signature::new([Type::BOOL], Type::BOOL)],
            |a, _| match a {
                [Value::Bool(b)] => Ok(Value::Bool(!b)),
                _ => Err(bad_operands(a)),
            },
            Whole,
        ),
        // angle and trigonometry
        glsl_call("radians", same_type(1), |a, t| unary(a, t, f32::to_radians), BROADCAST),
        glsl_call("degrees", same_type(1), |a, t| unary(a, t, f32::to_degrees), BROADCAST),
        glsl_call("sin", same_type(1), |a, t| unary(a, t, f32::sin), BROADCAST),
        glsl_call("cos", same_type(1), |a, t| unary(a, t, f32::cos), BROADCAST),
        glsl_call("tan", same_type(1), |a, t| unary(a, t, f32::tan), BROADCAST),
        glsl_call("asin", same_type(1), |a, t| unary(a, t, f32::asin), BROADCAST),
        glsl_call("acos", same_type(1), |a, t| unary(a, t, f32::acos), BROADCAST),
        glsl_call(
            "atan",
            same_type(1).into_iter().chain(same_type(2)).collect(),
            |a, t| match a.len() {
                1 => unary(a, t, f32::atan),
                _ => binary(a, t, f32::atan2),
            },
            BROADCAST,
        ),
        // exponentials
        glsl_call("pow", same_type(2), |a, t| binary(a, t, f32::powf), BROADCAST),
        glsl_call("exp", same_type(1), |a, t| unary(a, t, f32::exp), BROADCAST),
        glsl_call("log", same_type(1), |a, t| unary(a, t, f32::ln), BROADCAST),
        glsl_call("exp2", same_type(1), |a, t| unary(a, t, f32::exp2), BROADCAST),
        glsl_call("log2", same_type(1), |a, t| unary(a, t, f32::log2), BROADCAST),
        glsl_call("sqrt", same_type(1), |a, t| unary(a, t, f32::sqrt), BROADCAST),
        glsl_call(
            "inversesqrt",
            same_type(1),
            |a, t| unary(a, t, |x| 1.0 / x.sqrt()),
            BROADCAST,
        ),
        // common
        glsl_call("abs", same_type(1), |a, t| unary(a, t, f32::abs), BROADCAST),
        glsl_call("sign", same_type(1), |a, t| unary(a, t, sign_of), BROADCAST),
        glsl_call("floor", same_type(1), |a, t| unary(a, t, f32::floor), BROADCAST),
        glsl_call("ceil", same_type(1), |a, t| unary(a, t, f32::ceil), BROADCAST),
        glsl_call("fract", same_type(1), |a, t| unary(a, t, |x| x - x.floor()), BROADCAST),
        glsl_call(
            "mod",
            min_max(),
            |a, t| binary(a, t, |x, y| x - y * (x / y).floor()),
            BROADCAST,
        ),
        glsl_call("min", min_max(), |a, t| binary(a, t, f32::min), BROADCAST),
        glsl_call("max", min_max(), |a, t| binary(a, t, f32::max), BROADCAST),
        glsl_call(
            "clamp",
            same_type(3)
                .into_iter()
                .chain(VECS.iter().map(|v| {
                    Signature::new([v.clone(), Type::FLOAT, Type::FLOAT], v.clone())
                }))
                .collect(),
            |a, t| ternary(a, t, |x, lo, hi| x.max(lo).min(hi)),
            BROADCAST,
        ),
        glsl_call(
            "mix",
            same_type(3)
                .into_iter()
                .chain(VECS.iter().map(|v| {
                    Signature::new([v.clone(), v.clone(), Type::FLOAT], v.clone())
                }))
                .collect(),
            |a, t| ternary(a, t, |x, y, w| x * (1.0 - w) + y * w),
            BROADCAST,
        ),
        glsl_call(
            "step",
            same_type(2)
                .into_iter()
                .chain(VECS.iter().map(|v| Signature::new([Type::FLOAT, v.clone()], v.clone())))
                .collect(),
            |a, t| binary(a, t, |edge, x| if x < edge { 0.0 } else { 1.0 }),
            BROADCAST,
        ),
        glsl_call(
            "smoothstep",
            same_type(3)
                .into_iter()
                .chain(VECS.iter().map(|v| {
                    Signature::new([Type::FLOAT, Type::FLOAT, v.clone()], v.clone())
                }))
                .collect(),
            |a, t| ternary(a, t, smoothstep_of),
            BROADCAST,
        ),
        // geometry
        glsl_call("length", to_float(1), length_of, Whole),
        glsl_call("distance", to_float(2), distance_of, Whole),
        glsl_call("dot", to_float(2), dot_of, Whole),
        glsl_call(
            "cross",
            vec![Signature::new([Type::VEC3, Type::VEC3], Type::VEC3)],
            cross_of,
            Cross,
        ),
        glsl_call("normalize", same_type(1), normalize_of, Normalize),
        glsl_call("faceforward", same_type(3), faceforward_of, FaceForward),
        glsl_call("reflect", same_type(2), reflect_of, Reflect),
        glsl_call(
            "refract",
            GEN_TYPES
                .iter()
                .map(|t| Signature::new([t.clone(), t.clone(), Type::FLOAT], t.clone()))
                .collect(),
            refract_of,
            Refract,
        ),
        // vector relations
        glsl_call(
            "lessThan",
            vector_compare(false),
            |a, t| compare(a, t, |x, y| x < y, |x, y| x < y),
            Broadcast { via: Some("lt") },
        ),
        glsl_call(
            "lessThanEqual",
            vector_compare(false),
            |a, t| compare(a, t, |x, y| x <= y, |x, y| x <= y),
            Broadcast { via: Some("le") },
        ),
        glsl_call(
            "greaterThan",
            vector_compare(false),
            |a, t| compare(a, t, |x, y| x > y, |x, y| x > y),
            Broadcast { via: Some("gt") },
        ),
        glsl_call(
            "greaterThanEqual",
            vector_compare(false),
            |a, t| compare(a, t, |x, y| x >= y, |x, y| x >= y),
            Broadcast { via: Some("ge") },
        ),
        glsl_call(
            "equal",
            vector_compare(true),
            |a, t| componentwise(a, t, |s| Ok(Value::Bool(s[0] == s[1]))),
            Broadcast { via: Some("eq") },
        ),
        glsl_call(
            "notEqual",
            vector_compare(true),
            |a, t| componentwise(a, t, |s| Ok(Value::Bool(s[0] != s[1]))),
            Broadcast { via: Some("ne") },
        ),
        glsl_call(
            "all",
            BVECS.iter().map(|b| Signature::new([b.clone()], Type::BOOL)).collect(),
            |a, _| reduce_bools(a, true),
            Whole,
        ),
        glsl_call(
            "any",
            BVECS.iter().map(|b| Signature::new([b.clone()], Type::BOOL)).collect(),
            |a, _| reduce_bools(a, false),
            Whole,
        ),
        glsl_call(
            "matrixCompMult",
            MATS.iter()
                .map(|m| Signature::new([m.clone(), m.clone()], m.clone()))
                .collect(),
            |a, t| binary(a, t, |x, y| x * y),
            Broadcast { via: Some("mul") },
        ),
    ];

    // device-only
    fns.push(BuiltinFunction {
        device_only: true,
        ..glsl_call(
            "texture2D",
            vec![Signature::new([Type::Sampler2D, Type::VEC2], Type::VEC4)],
            device_only,
            Whole,
        )
    });
    for name in ["dFdx", "dFdy", "fwidth"] {
        fns.push(BuiltinFunction {
            device_only: true,
            ..glsl_call(name, same_type(1), device_only, Whole)
        });
    }
    fns
}

// ---------------------------------------------------------------------------
// Convenience constructors over the shared registry
// ---------------------------------------------------------------------------

macro_rules! builtin_wrappers {
    ($($(#[$meta:meta])* $fn_name:ident => $name:literal ($($arg:ident),*);)*) => {
        $(
            $(#[$meta])*
            pub fn $fn_name(g: &mut Graph, $($arg: impl Into<HostValue>),*) -> Result<NodeHandle> {
                registry().call(g, $name, vec![$($arg.into()),*])
            }
        )*
    };
}

builtin_wrappers! {
    add => "add" (a, b);
    sub => "sub" (a, b);
    /// Product; matrix operands multiply as linear maps.
    mul => "mul" (a, b);
    div => "div" (a, b);
    neg => "neg" (a);
    lt => "lt" (a, b);
    le => "le" (a, b);
    gt => "gt" (a, b);
    ge => "ge" (a, b);
    eq => "eq" (a, b);
    ne => "ne" (a, b);
    and => "and" (a, b);
    or => "or" (a, b);
    xor => "xor" (a, b);
    not => "not" (a);
    radians => "radians" (x);
    degrees => "degrees" (x);
    sin => "sin" (x);
    cos => "cos" (x);
    tan => "tan" (x);
    asin => "asin" (x);
    acos => "acos" (x);
    atan => "atan" (x);
    /// Two-argument arc tangent, `atan(y, x)` in GLSL.
    atan2 => "atan" (y, x);
    pow => "pow" (x, y);
    exp => "exp" (x);
    log => "log" (x);
    exp2 => "exp2" (x);
    log2 => "log2" (x);
    sqrt => "sqrt" (x);
    inversesqrt => "inversesqrt" (x);
    abs => "abs" (x);
    sign => "sign" (x);
    floor => "floor" (x);
    ceil => "ceil" (x);
    fract => "fract" (x);
    r#mod => "mod" (x, y);
    min => "min" (x, y);
    max => "max" (x, y);
    clamp => "clamp" (x, lo, hi);
    mix => "mix" (x, y, a);
    step => "step" (edge, x);
    smoothstep => "smoothstep" (edge0, edge1, x);
    length => "length" (x);
    distance => "distance" (a, b);
    dot => "dot" (a, b);
    cross => "cross" (a, b);
    normalize => "normalize" (x);
    faceforward => "faceforward" (n, i, nref);
    reflect => "reflect" (i, n);
    refract => "refract" (i, n, eta);
    texture2d => "texture2D" (sampler, uv);
    dfdx => "dFdx" (x);
    dfdy => "dFdy" (x);
    fwidth => "fwidth" (x);
    less_than => "lessThan" (a, b);
    less_than_equal => "lessThanEqual" (a, b);
    greater_than => "greaterThan" (a, b);
    greater_than_equal => "greaterThanEqual" (a, b);
    equal => "equal" (a, b);
    not_equal => "notEqual" (a, b);
    all => "all" (v);
    any => "any" (v);
    matrix_comp_mult => "matrixCompMult" (a, b);
}
