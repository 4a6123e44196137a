//! Lifting host callables into node-producing functions.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use shade_ir::{Graph, NodeHandle, Result, Type, Value};

use crate::eval::evaluate;
use crate::make::{HostValue, make, make_all};
use crate::ops;

/// One specialization: `f` applied to placeholder parameters.
#[derive(Debug)]
struct Instance {
    graph: Graph,
    params: Vec<NodeHandle>,
    root: NodeHandle,
}

/// A host callable usable as an expression builder.
///
/// [`call`](Self::call) normalizes the arguments with [`make`], applies the
/// callable and normalizes what it returns. [`evaluate`](Self::evaluate)
/// builds the expression once per distinct tuple of argument types over
/// placeholder parameters, then only rebinds and re-evaluates.
pub struct Lifted<F> {
    f: F,
    instances: HashMap<Vec<Type>, Instance>,
}

/// Wraps `f` as a [`Lifted`] expression builder.
pub fn lift<F>(f: F) -> Lifted<F>
where
    F: Fn(&mut Graph, &[NodeHandle]) -> Result<HostValue>,
{
    Lifted {
        f,
        instances: HashMap::new(),
    }
}

impl<F> Lifted<F>
where
    F: Fn(&mut Graph, &[NodeHandle]) -> Result<HostValue>,
{
    /// Applies the callable to `args` inside `g`.
    pub fn call(&self, g: &mut Graph, args: Vec<HostValue>) -> Result<NodeHandle> {
        let args = make_all(g, args)?;
        let out = (self.f)(g, &args)?;
        make(g, out)
    }

    /// Evaluates the callable on host values through the cached
    /// specialization for their types.
    pub fn evaluate(&mut self, args: &[Value]) -> Result<Value> {
        let key: Vec<Type> = args.iter().map(Value::ty).collect();
        let instance = match self.instances.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                log::debug!("lift: specializing for ({})", describe(e.key()));
                let instance = instantiate(&self.f, e.key())?;
                e.insert(instance)
            }
        };
        for (&p, v) in instance.params.iter().zip(args) {
            instance.graph.set_parameter(p, v.clone())?;
        }
        evaluate(&instance.graph, instance.root)
    }

    /// Number of cached specializations.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

fn instantiate<F>(f: &F, types: &[Type]) -> Result<Instance>
where
    F: Fn(&mut Graph, &[NodeHandle]) -> Result<HostValue>,
{
    let mut graph = Graph::new();
    let params = types
        .iter()
        .enumerate()
        .map(|(i, ty)| ops::parameter(&mut graph, &format!("arg{i}"), ty.clone()))
        .collect::<Result<Vec<_>>>()?;
    let out = f(&mut graph, &params)?;
    let root = make(&mut graph, out)?;
    Ok(Instance {
        graph,
        params,
        root,
    })
}

fn describe(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
