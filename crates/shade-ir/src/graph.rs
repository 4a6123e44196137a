//! The expression graph: an append-only arena of nodes.
//!
//! Every parent handle must already be in the arena when a node is
//! appended, so parents always precede their children and the graph is
//! acyclic by construction. Nodes are never removed; a graph is dropped
//! as a whole.

use std::collections::{HashMap, HashSet};

use crate::arena::{Arena, Handle};
use crate::error::ShadeError;
use crate::node::{Node, NodeCache, NodeKind};
use crate::types::Type;
use crate::value::Value;

/// An expression DAG plus the host values bound to its parameters.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Arena<Node>,
    bindings: HashMap<Handle<Node>, Value>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a node after validating its structure.
    ///
    /// Fails with [`ShadeError::BadHandle`] if a parent handle is out of
    /// range and with [`ShadeError::MalformedNode`] if the parent count does
    /// not fit the kind. Types are not checked here. Handles carry no graph
    /// identity, so an in-range handle taken from another graph is accepted.
    pub fn append(
        &mut self,
        kind: NodeKind,
        ty: Type,
        parents: Vec<Handle<Node>>,
    ) -> Result<Handle<Node>, ShadeError> {
        for &p in &parents {
            if !self.nodes.contains(p) {
                return Err(ShadeError::BadHandle {
                    index: p.index(),
                    size: self.nodes.len(),
                });
            }
        }
        if let Err(expected) = kind.check_arity(parents.len()) {
            return Err(ShadeError::MalformedNode {
                kind: kind.tag(),
                expected,
                found: parents.len(),
            });
        }
        Ok(self.nodes.append(Node::new(kind, ty, parents)))
    }

    /// Appends a copy of `h` with the same kind and type over new parents.
    pub fn rebuild(
        &mut self,
        h: Handle<Node>,
        parents: Vec<Handle<Node>>,
    ) -> Result<Handle<Node>, ShadeError> {
        let node = self.try_node(h)?;
        let (kind, ty) = (node.kind().clone(), node.ty().clone());
        self.append(kind, ty, parents)
    }

    pub fn try_node(&self, h: Handle<Node>) -> Result<&Node, ShadeError> {
        self.nodes.try_get(h).ok_or(ShadeError::BadHandle {
            index: h.index(),
            size: self.nodes.len(),
        })
    }

    pub fn contains(&self, h: Handle<Node>) -> bool {
        self.nodes.contains(h)
    }

    /// Type of node `h`.
    pub fn ty(&self, h: Handle<Node>) -> &Type {
        self.nodes[h].ty()
    }

    pub fn kind(&self, h: Handle<Node>) -> &NodeKind {
        self.nodes[h].kind()
    }

    pub fn parents(&self, h: Handle<Node>) -> &[Handle<Node>] {
        self.nodes[h].parents()
    }

    /// Mutable access to the derived-property cache of `h`.
    pub fn cache_mut(&mut self, h: Handle<Node>) -> &mut NodeCache {
        &mut self.nodes[h].cache
    }

    /// Iterates over all nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<Node>, &Node)> {
        self.nodes.iter()
    }

    /// Binds a host value to a parameter node.
    pub fn set_parameter(&mut self, h: Handle<Node>, value: Value) -> Result<(), ShadeError> {
        let node = self.try_node(h)?;
        let NodeKind::Parameter { name } = node.kind() else {
            return Err(ShadeError::InvalidExpression(format!(
                "{} is not a parameter",
                node.tag()
            )));
        };
        value.check_shape()?;
        if value.ty() != *node.ty() {
            return Err(ShadeError::type_mismatch(
                format!("parameter {name}"),
                node.ty().to_string(),
                &[value.ty()],
            ));
        }
        self.bindings.insert(h, value);
        Ok(())
    }

    /// The value bound to parameter `h`, if any.
    pub fn parameter_value(&self, h: Handle<Node>) -> Option<&Value> {
        self.bindings.get(&h)
    }

    /// All sub-expressions of `root`, parents before children.
    ///
    /// Depth-first with an identity-keyed visited set, so shared nodes
    /// appear once. The order is recomputed on every call.
    pub fn sorted_sub_expressions(&self, root: Handle<Node>) -> Vec<Handle<Node>> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        // (node, next parent to visit)
        let mut stack: Vec<(Handle<Node>, usize)> = vec![(root, 0)];
        visited.insert(root);
        while let Some((h, next)) = stack.pop() {
            let parents = self.parents(h);
            if let Some(&p) = parents.get(next) {
                stack.push((h, next + 1));
                if visited.insert(p) {
                    stack.push((p, 0));
                }
            } else {
                order.push(h);
            }
        }
        order
    }
}

impl std::ops::Index<Handle<Node>> for Graph {
    type Output = Node;

    fn index(&self, h: Handle<Node>) -> &Node {
        &self.nodes[h]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(g: &mut Graph, v: f32) -> Handle<Node> {
        g.append(NodeKind::Constant(Value::Float(v)), Type::FLOAT, vec![])
            .unwrap()
    }

    #[test]
    fn append_rejects_unknown_parent() {
        let mut g = Graph::new();
        let a = constant(&mut g, 1.0);
        let mut other = Graph::new();
        constant(&mut other, 1.0);
        let far = constant(&mut other, 2.0);
        let err = g
            .append(NodeKind::Construct, Type::VEC2, vec![a, far])
            .unwrap_err();
        assert_eq!(err, ShadeError::BadHandle { index: 1, size: 1 });
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn append_checks_range_only() {
        let mut g = Graph::new();
        constant(&mut g, 1.0);
        let mut other = Graph::new();
        let foreign = constant(&mut other, 2.0);
        let h = g.append(NodeKind::Construct, Type::VEC2, vec![foreign, foreign]).unwrap();
        assert_eq!(g.parents(h), &[foreign, foreign]);
    }

    #[test]
    fn append_rejects_wrong_parent_count() {
        let mut g = Graph::new();
        let a = constant(&mut g, 1.0);
        let err = g.append(NodeKind::Index, Type::FLOAT, vec![a]).unwrap_err();
        assert!(matches!(err, ShadeError::MalformedNode { found: 1, .. }));
    }

    #[test]
    fn sorted_sub_expressions_diamond() {
        // a -> b, a -> c, (b, c) -> d
        let mut g = Graph::new();
        let a = constant(&mut g, 1.0);
        let b = g.append(NodeKind::Construct, Type::VEC2, vec![a, a]).unwrap();
        let c = g.append(NodeKind::Construct, Type::VEC2, vec![a, a]).unwrap();
        let d = g
            .append(NodeKind::Construct, Type::VEC4, vec![b, c])
            .unwrap();
        let order = g.sorted_sub_expressions(d);
        assert_eq!(order, vec![a, b, c, d]);
    }

    #[test]
    fn sorted_sub_expressions_respects_parent_order() {
        let mut g = Graph::new();
        let a = constant(&mut g, 1.0);
        let b = constant(&mut g, 2.0);
        let v = g.append(NodeKind::Construct, Type::VEC2, vec![b, a]).unwrap();
        assert_eq!(g.sorted_sub_expressions(v), vec![b, a, v]);
        // unreachable nodes are not listed
        assert_eq!(g.sorted_sub_expressions(a), vec![a]);
    }

    #[test]
    fn parameters_are_type_checked() {
        let mut g = Graph::new();
        let p = g
            .append(
                NodeKind::Parameter { name: "u".into() },
                Type::FLOAT,
                vec![],
            )
            .unwrap();
        assert!(g.parameter_value(p).is_none());
        assert!(g.set_parameter(p, Value::Int(1)).is_err());
        g.set_parameter(p, Value::Float(0.5)).unwrap();
        assert_eq!(g.parameter_value(p), Some(&Value::Float(0.5)));

        let c = constant(&mut g, 1.0);
        assert!(matches!(
            g.set_parameter(c, Value::Float(1.0)),
            Err(ShadeError::InvalidExpression(_))
        ));
    }

    #[test]
    fn rebuild_keeps_kind_and_type() {
        let mut g = Graph::new();
        let a = constant(&mut g, 1.0);
        let b = constant(&mut g, 2.0);
        let v = g.append(NodeKind::Construct, Type::VEC2, vec![a, a]).unwrap();
        let w = g.rebuild(v, vec![b, b]).unwrap();
        assert_ne!(v, w);
        assert_eq!(g.ty(w), &Type::VEC2);
        assert!(matches!(g.kind(w), NodeKind::Construct));
        assert_eq!(g.parents(w), &[b, b]);
    }
}
