//! Host evaluation of expression graphs.

use std::collections::{BTreeMap, HashMap};

use shade_ir::{Graph, NodeHandle, NodeKind, Result, ScalarKind, ShadeError, Type, Value};

/// Values computed during one top-level evaluation, keyed by node.
pub type EvalCache = HashMap<NodeHandle, Value>;

/// Computes the value of `root` on the host.
///
/// Shared sub-expressions are computed once per call. Only the taken
/// branch of a selection is evaluated.
pub fn evaluate(g: &Graph, root: NodeHandle) -> Result<Value> {
    evaluate_with(g, root, &mut EvalCache::new())
}

/// Like [`evaluate`], reusing a caller-owned cache.
pub fn evaluate_with(g: &Graph, h: NodeHandle, cache: &mut EvalCache) -> Result<Value> {
    if let Some(v) = cache.get(&h) {
        return Ok(v.clone());
    }
    let value = evaluate_node(g, h, cache)?;
    cache.insert(h, value.clone());
    Ok(value)
}

fn evaluate_node(g: &Graph, h: NodeHandle, cache: &mut EvalCache) -> Result<Value> {
    let node = g.try_node(h)?;
    let parents = node.parents();
    let arg = |i: usize, cache: &mut EvalCache| evaluate_with(g, parents[i], cache);
    match node.kind() {
        NodeKind::Constant(v) => Ok(v.clone()),
        NodeKind::Parameter { name } => g
            .parameter_value(h)
            .cloned()
            .ok_or_else(|| ShadeError::UnboundParameter(name.clone())),
        NodeKind::Attribute(_) | NodeKind::Sampler(_) | NodeKind::FragCoord => Err(
            ShadeError::UnsupportedOperation(format!("evaluate unsupported on {}", node.tag())),
        ),
        NodeKind::Construct => {
            let mut scalars = Vec::new();
            for i in 0..parents.len() {
                scalars.extend(arg(i, cache)?.scalars());
            }
            Value::from_scalars(node.ty(), scalars)
        }
        NodeKind::Array => (0..parents.len())
            .map(|i| arg(i, cache))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        NodeKind::Struct { fields } => {
            let mut out = BTreeMap::new();
            for (i, name) in fields.iter().enumerate() {
                out.insert(name.clone(), arg(i, cache)?);
            }
            Ok(Value::Struct(out))
        }
        NodeKind::Swizzle { indices, .. } => {
            let v = arg(0, cache)?;
            let picked = indices
                .iter()
                .map(|&i| component(&v, i as i64))
                .collect::<Result<Vec<_>>>()?;
            match picked.as_slice() {
                [one] => Ok(one.clone()),
                _ => Value::from_scalars(node.ty(), picked),
            }
        }
        NodeKind::Index => {
            let base = arg(0, cache)?;
            let ix = arg(1, cache)?;
            let ix = ix.as_index().ok_or_else(|| {
                ShadeError::type_mismatch("at", "an int or float index", &[ix.ty()])
            })?;
            component(&base, ix)
        }
        NodeKind::Field { index, .. } => component(&arg(0, cache)?, i64::from(*index)),
        NodeKind::Call(f) => {
            if f.device_only {
                return Err(ShadeError::UnsupportedOperation(format!(
                    "evaluate unsupported on {} expressions",
                    f.name
                )));
            }
            let args = (0..parents.len())
                .map(|i| arg(i, cache))
                .collect::<Result<Vec<_>>>()?;
            (f.evaluator)(&args, node.ty())
        }
        NodeKind::Cast(target) => cast(&arg(0, cache)?, *target),
        NodeKind::Select => {
            let cond = arg(0, cache)?;
            match cond {
                Value::Bool(true) => arg(1, cache),
                Value::Bool(false) => arg(2, cache),
                other => Err(ShadeError::type_mismatch("select", "bool", &[other.ty()])),
            }
        }
        // On the host a discard is a pass-through; only the device can drop
        // fragments.
        NodeKind::Discard => arg(0, cache),
    }
}

fn component(v: &Value, i: i64) -> Result<Value> {
    usize::try_from(i)
        .ok()
        .and_then(|i| v.component(i))
        .ok_or_else(|| ShadeError::ElementOutOfRange {
            index: i.max(0) as usize,
            ty: v.ty().to_string(),
        })
}

fn cast(v: &Value, target: ScalarKind) -> Result<Value> {
    let out = match (v, target) {
        (Value::Float(x), ScalarKind::Sint) => Value::Int(x.floor() as i32),
        (Value::Float(x), ScalarKind::Bool) => Value::Bool(*x != 0.0),
        (Value::Int(x), ScalarKind::Float) => Value::Float(*x as f32),
        (Value::Int(x), ScalarKind::Bool) => Value::Bool(*x != 0),
        (Value::Bool(b), ScalarKind::Float) => Value::Float(if *b { 1.0 } else { 0.0 }),
        (Value::Bool(b), ScalarKind::Sint) => Value::Int(i32::from(*b)),
        (v, kind) if v.ty() == Type::Scalar(kind) => v.clone(),
        (v, kind) => {
            return Err(ShadeError::type_mismatch(
                format!("cast to {kind}"),
                "a scalar",
                &[v.ty()],
            ));
        }
    };
    Ok(out)
}
