//! Constancy and per-component projection.
//!
//! `element(h, i)` rewrites component `i` of `h` in terms of the components
//! of its operands, so folding can work below whole-value granularity.
//! Nodes that cannot be decomposed fall back to an index expression into
//! themselves. Results are memoized in the node caches.

use std::sync::Arc;

use shade_ir::{
    BuiltinFunction, ElementRule, Graph, NodeHandle, NodeKind, Result, ShadeError, Type, Value,
};

use crate::builtins::{self, call_function, registry};
use crate::eval::evaluate;
use crate::make::constant;
use crate::ops;

fn out_of_range(g: &Graph, h: NodeHandle, index: usize) -> ShadeError {
    ShadeError::ElementOutOfRange {
        index,
        ty: g.ty(h).to_string(),
    }
}

/// Component `i` of `h`: vector entry, matrix column, array item or struct
/// field. A scalar is its own only component.
pub fn element(g: &mut Graph, h: NodeHandle, i: usize) -> Result<NodeHandle> {
    let ty = g.try_node(h)?.ty().clone();
    if i >= ty.component_count() {
        return Err(out_of_range(g, h, i));
    }
    if ty.is_pod() {
        return Ok(h);
    }
    if let Some(&e) = g[h].cache().elements.get(&(i as u32)) {
        return Ok(e);
    }
    let e = project(g, h, &ty, i)?;
    Ok(*g.cache_mut(h).elements.entry(i as u32).or_insert(e))
}

fn project(g: &mut Graph, h: NodeHandle, ty: &Type, i: usize) -> Result<NodeHandle> {
    let kind = g.kind(h).clone();
    let parents = g.parents(h).to_vec();
    match kind {
        NodeKind::Constant(v) => {
            let c = v.component(i).ok_or_else(|| out_of_range(g, h, i))?;
            constant(g, c)
        }
        NodeKind::Construct => construct_element(g, &parents, ty, i),
        NodeKind::Array | NodeKind::Struct { .. } => Ok(parents[i]),
        NodeKind::Swizzle { indices, .. } => element(g, parents[0], indices[i] as usize),
        NodeKind::Select => {
            let a = element(g, parents[1], i)?;
            let b = element(g, parents[2], i)?;
            ops::select(g, parents[0], a, b)
        }
        NodeKind::Index => index_element(g, h, &parents, i),
        NodeKind::Call(f) => call_element(g, h, &f, &parents, i),
        NodeKind::Parameter { .. }
        | NodeKind::Attribute(_)
        | NodeKind::Sampler(_)
        | NodeKind::FragCoord
        | NodeKind::Field { .. }
        | NodeKind::Cast(_)
        | NodeKind::Discard => at_const(g, h, i),
    }
}

/// `h[i]` (or the `i`-th field of a struct) as an explicit accessor node.
fn at_const(g: &mut Graph, h: NodeHandle, i: usize) -> Result<NodeHandle> {
    let ty = g.ty(h).clone();
    if let Some(member) = ty.members().get(i) {
        let (name, field_ty) = (member.name.clone(), member.ty.clone());
        return g.append(
            NodeKind::Field {
                name,
                index: i as u32,
            },
            field_ty,
            vec![h],
        );
    }
    let result = ty.array_base().ok_or_else(|| out_of_range(g, h, i))?;
    let ix = constant(g, Value::Int(i as i32))?;
    g.append(NodeKind::Index, result, vec![h, ix])
}

/// Scalar at flat position `k` of a constructor's concatenated operands.
fn scalar_at(g: &mut Graph, parents: &[NodeHandle], k: usize) -> Result<NodeHandle> {
    let mut offset = 0;
    for &p in parents {
        let ty = g.ty(p).clone();
        let len = ty.flat_len().unwrap_or(1);
        if k < offset + len {
            let local = k - offset;
            return match ty {
                Type::Matrix { size } => {
                    let column = element(g, p, local / size.len())?;
                    element(g, column, local % size.len())
                }
                _ => element(g, p, local),
            };
        }
        offset += len;
    }
    Err(ShadeError::ElementOutOfRange {
        index: k,
        ty: "constructor operands".into(),
    })
}

fn construct_element(
    g: &mut Graph,
    parents: &[NodeHandle],
    ty: &Type,
    i: usize,
) -> Result<NodeHandle> {
    let Type::Matrix { size } = ty else {
        return scalar_at(g, parents, i);
    };
    // Column i spans flat positions [i*n, (i+1)*n). Reuse an operand that
    // supplies exactly that column.
    let n = size.len();
    let column_ty = Type::vector(*size, shade_ir::ScalarKind::Float);
    let mut offset = 0;
    for &p in parents {
        if offset == i * n && *g.ty(p) == column_ty {
            return Ok(p);
        }
        offset += g.ty(p).flat_len().unwrap_or(1);
    }
    let scalars = (i * n..(i + 1) * n)
        .map(|k| scalar_at(g, parents, k).map(Into::into))
        .collect::<Result<Vec<_>>>()?;
    ops::vec(g, scalars)
}

fn index_element(
    g: &mut Graph,
    h: NodeHandle,
    parents: &[NodeHandle],
    i: usize,
) -> Result<NodeHandle> {
    let (base, ix) = (parents[0], parents[1]);
    if !is_constant(g, ix)? {
        // element(array(a_1..a_n).at(ix), i) == array(element(a_1, i)..element(a_n, i)).at(ix)
        let Type::Array { size, .. } = g.ty(base).clone() else {
            return at_const(g, h, i);
        };
        let mut projected = Vec::with_capacity(size as usize);
        for k in 0..size as usize {
            let item = element(g, base, k)?;
            projected.push(element(g, item, i)?);
        }
        let table = ops::array(g, projected)?;
        return ops::at(g, table, ix);
    }
    let index = constant_index(g, base, ix)?;
    let x = element(g, base, index)?;
    // Opaque bases project to an index expression, which may be `h` itself.
    if x == h {
        at_const(g, h, i)
    } else {
        element(g, x, i)
    }
}

fn constant_index(g: &mut Graph, base: NodeHandle, ix: NodeHandle) -> Result<usize> {
    let value = constant_value(g, ix)?;
    value
        .as_index()
        .and_then(|i| usize::try_from(i).ok())
        .filter(|&i| i < g.ty(base).component_count())
        .ok_or_else(|| ShadeError::ElementOutOfRange {
            index: value.as_index().unwrap_or(0).max(0) as usize,
            ty: g.ty(base).to_string(),
        })
}

fn call_element(
    g: &mut Graph,
    h: NodeHandle,
    f: &Arc<BuiltinFunction>,
    parents: &[NodeHandle],
    i: usize,
) -> Result<NodeHandle> {
    match f.element {
        ElementRule::Whole => at_const(g, h, i),
        ElementRule::Broadcast { via } => {
            let target = match via {
                Some(name) => registry().get(name).cloned().ok_or_else(|| {
                    ShadeError::InvalidExpression(format!("unknown builtin '{name}'"))
                })?,
                None => Arc::clone(f),
            };
            broadcast(g, &target, parents, i)
        }
        ElementRule::Product => {
            let (a, b) = (parents[0], parents[1]);
            let (ta, tb) = (g.ty(a).clone(), g.ty(b).clone());
            match (ta.is_mat(), tb.is_mat()) {
                // column i of A*B is A * (column i of B)
                (true, true) => {
                    let column = element(g, b, i)?;
                    builtins::mul(g, a, column)
                }
                (true, false) if tb.is_vec() => {
                    let row = (0..ta.component_count())
                        .map(|k| {
                            let column = element(g, a, k)?;
                            element(g, column, i).map(Into::into)
                        })
                        .collect::<Result<Vec<_>>>()?;
                    let row = ops::vec(g, row)?;
                    builtins::dot(g, row, b)
                }
                (false, true) if ta.is_vec() => {
                    let column = element(g, b, i)?;
                    builtins::dot(g, a, column)
                }
                _ => broadcast(g, f, parents, i),
            }
        }
        ElementRule::Cross => {
            let (a, b) = (parents[0], parents[1]);
            let (j, k) = match i {
                0 => (1, 2),
                1 => (2, 0),
                _ => (0, 1),
            };
            let (aj, bk) = (element(g, a, j)?, element(g, b, k)?);
            let (ak, bj) = (element(g, a, k)?, element(g, b, j)?);
            let lhs = builtins::mul(g, aj, bk)?;
            let rhs = builtins::mul(g, ak, bj)?;
            builtins::sub(g, lhs, rhs)
        }
        ElementRule::Normalize => {
            let v = parents[0];
            let len = builtins::length(g, v)?;
            let unit = builtins::div(g, v, len)?;
            element(g, unit, i)
        }
        ElementRule::FaceForward => {
            let (n, incident, nref) = (parents[0], parents[1], parents[2]);
            let d = builtins::dot(g, nref, incident)?;
            let facing = builtins::lt(g, d, 0.0)?;
            let flipped = builtins::neg(g, n)?;
            let chosen = ops::select(g, facing, n, flipped)?;
            element(g, chosen, i)
        }
        ElementRule::Reflect => {
            let (incident, n) = (parents[0], parents[1]);
            let d = builtins::dot(g, n, incident)?;
            let twice = builtins::mul(g, 2.0, d)?;
            let offset = builtins::mul(g, twice, n)?;
            let reflected = builtins::sub(g, incident, offset)?;
            element(g, reflected, i)
        }
        ElementRule::Refract => {
            let (incident, n, eta) = (parents[0], parents[1], parents[2]);
            let d = builtins::dot(g, n, incident)?;
            let d2 = builtins::mul(g, d, d)?;
            let sin2 = builtins::sub(g, 1.0, d2)?;
            let eta2 = builtins::mul(g, eta, eta)?;
            let scaled = builtins::mul(g, eta2, sin2)?;
            let k = builtins::sub(g, 1.0, scaled)?;
            let along = builtins::mul(g, eta, incident)?;
            let eta_d = builtins::mul(g, eta, d)?;
            let root = builtins::sqrt(g, k)?;
            let s = builtins::add(g, eta_d, root)?;
            let normal_part = builtins::mul(g, s, n)?;
            let refraction = builtins::sub(g, along, normal_part)?;
            let zero_value = g
                .ty(incident)
                .zero()
                .ok_or_else(|| out_of_range(g, incident, i))?;
            let zero = constant(g, zero_value)?;
            let total = builtins::lt(g, k, 0.0)?;
            let chosen = ops::select(g, total, zero, refraction)?;
            element(g, chosen, i)
        }
    }
}

/// Applies `f` to component `i` of every vector or matrix operand,
/// passing scalar operands through unchanged.
fn broadcast(
    g: &mut Graph,
    f: &Arc<BuiltinFunction>,
    parents: &[NodeHandle],
    i: usize,
) -> Result<NodeHandle> {
    let mut args = Vec::with_capacity(parents.len());
    for &p in parents {
        let ty = g.ty(p);
        if ty.is_vec() || ty.is_mat() {
            args.push(element(g, p, i)?);
        } else {
            args.push(p);
        }
    }
    call_function(g, f, args)
}

/// Whether `h` can be computed on the host.
pub fn is_constant(g: &mut Graph, h: NodeHandle) -> Result<bool> {
    if let Some(c) = g.try_node(h)?.cache().is_constant {
        return Ok(c);
    }
    let kind = g.kind(h).clone();
    let parents = g.parents(h).to_vec();
    let c = match kind {
        NodeKind::Constant(_) => true,
        NodeKind::Parameter { .. }
        | NodeKind::Attribute(_)
        | NodeKind::Sampler(_)
        | NodeKind::FragCoord
        | NodeKind::Discard => false,
        NodeKind::Call(f) if f.device_only => false,
        NodeKind::Call(_)
        | NodeKind::Construct
        | NodeKind::Array
        | NodeKind::Struct { .. }
        | NodeKind::Field { .. }
        | NodeKind::Cast(_)
        | NodeKind::Select => all_constant(g, &parents)?,
        NodeKind::Swizzle { indices, .. } => {
            let parent = parents[0];
            if is_constant(g, parent)? {
                true
            } else {
                let mut all = true;
                for idx in indices {
                    let e = element(g, parent, idx as usize)?;
                    if !is_constant(g, e)? {
                        all = false;
                        break;
                    }
                }
                all
            }
        }
        NodeKind::Index => index_is_constant(g, h, parents[0], parents[1])?,
    };
    Ok(*g.cache_mut(h).is_constant.get_or_insert(c))
}

fn all_constant(g: &mut Graph, parents: &[NodeHandle]) -> Result<bool> {
    for &p in parents {
        if !is_constant(g, p)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn index_is_constant(
    g: &mut Graph,
    h: NodeHandle,
    base: NodeHandle,
    ix: NodeHandle,
) -> Result<bool> {
    if !is_constant(g, ix)? {
        return Ok(false);
    }
    let Ok(index) = constant_index(g, base, ix) else {
        return Ok(false);
    };
    let x = element(g, base, index)?;
    if x == h {
        is_constant(g, base)
    } else {
        is_constant(g, x)
    }
}

/// Whether component `i` of `h` is known on the host.
///
/// For an index with a non-constant index operand, this asks whether the
/// `i`-th component of every candidate the index may select is constant:
/// a table of constants looked up dynamically has constant components
/// even though the lookup itself is not constant.
pub fn element_is_constant(g: &mut Graph, h: NodeHandle, i: usize) -> Result<bool> {
    let ty = g.try_node(h)?.ty().clone();
    if i >= ty.component_count() {
        return Err(out_of_range(g, h, i));
    }
    if let Some(&c) = g[h].cache().element_is_constant.get(&(i as u32)) {
        return Ok(c);
    }
    let c = match dynamic_index(g, h)? {
        Some(base) => table_is_constant(g, base, i)?,
        None => {
            let e = element(g, h, i)?;
            is_constant(g, e)?
        }
    };
    Ok(*g.cache_mut(h).element_is_constant.entry(i as u32).or_insert(c))
}

/// The base of `h` if `h` is an index with a non-constant index operand.
fn dynamic_index(g: &mut Graph, h: NodeHandle) -> Result<Option<NodeHandle>> {
    if !matches!(g.kind(h), NodeKind::Index) {
        return Ok(None);
    }
    let (base, ix) = (g.parents(h)[0], g.parents(h)[1]);
    Ok((!is_constant(g, ix)?).then_some(base))
}

fn table_is_constant(g: &mut Graph, base: NodeHandle, i: usize) -> Result<bool> {
    let Type::Array { size, .. } = g.ty(base).clone() else {
        return is_constant(g, base);
    };
    for k in 0..size as usize {
        let item = element(g, base, k)?;
        let ty = g.ty(item).clone();
        let known = if ty.is_pod() {
            is_constant(g, item)?
        } else {
            element_is_constant(g, item, i)?
        };
        if !known {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The host value of `h`; fails with [`ShadeError::NonConstantAccess`] if
/// `h` is not constant.
pub fn constant_value(g: &mut Graph, h: NodeHandle) -> Result<Value> {
    if !is_constant(g, h)? {
        return Err(ShadeError::NonConstantAccess(g[h].tag()));
    }
    if let Some(v) = &g[h].cache().constant_value {
        return Ok(v.clone());
    }
    let v = evaluate(g, h)?;
    Ok(g.cache_mut(h).constant_value.get_or_insert(v).clone())
}

/// The host value of component `i` of `h`.
///
/// A dynamically indexed table has no single value for its components,
/// even when [`element_is_constant`] holds, and fails with
/// [`ShadeError::NonConstantAccess`].
pub fn element_constant_value(g: &mut Graph, h: NodeHandle, i: usize) -> Result<Value> {
    if dynamic_index(g, h)?.is_some() {
        return Err(ShadeError::NonConstantAccess(format!(
            "component {i} of dynamically indexed {}",
            g[h].tag()
        )));
    }
    let e = element(g, h, i)?;
    constant_value(g, e)
}
