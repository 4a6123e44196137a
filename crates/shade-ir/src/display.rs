//! Display implementations and diagnostic dumps.

use std::collections::HashSet;
use std::fmt;

use crate::arena::Handle;
use crate::graph::Graph;
use crate::node::{Node, NodeKind};
use crate::types::ScalarKind;
use crate::value::Value;

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Sint => write!(f, "int"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// Formats a float so it always reads back as a GLSL float literal.
pub fn format_float(v: f32) -> String {
    // Debug always keeps a decimal point or exponent ("1.0", "1e18").
    format!("{v:?}")
}

fn join<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
    items.iter().map(f).collect::<Vec<_>>().join(", ")
}

/// Renders values in GLSL constructor syntax.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::BVec(v) => write!(f, "{}({})", self.ty(), join(v, |b| b.to_string())),
            Self::IVec(v) => write!(f, "{}({})", self.ty(), join(v, |i| i.to_string())),
            Self::Vec(v) | Self::Mat { data: v, .. } => {
                write!(f, "{}({})", self.ty(), join(v, |x| format_float(*x)))
            }
            Self::Array(items) => write!(f, "{}({})", self.ty(), join(items, |i| i.to_string())),
            Self::Struct(fields) => {
                let body: Vec<String> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", body.join(", "))
            }
        }
    }
}

fn header(h: Handle<Node>, node: &Node) -> String {
    match node.kind() {
        NodeKind::Constant(v) => format!("[{}:{h}] {} = {v}", node.tag(), node.ty()),
        _ => format!("[{}:{h}] {}", node.tag(), node.ty()),
    }
}

/// Indented tree dump of the sub-graph rooted at `root`.
///
/// A node already printed is referenced as `{{id}}` instead of being
/// expanded again.
pub fn debug_print(g: &Graph, root: Handle<Node>) -> String {
    fn walk(
        g: &Graph,
        h: Handle<Node>,
        indent: usize,
        seen: &mut HashSet<Handle<Node>>,
        out: &mut Vec<String>,
    ) {
        let pad = " ".repeat(indent);
        let node = &g[h];
        seen.insert(h);
        if node.parents().is_empty() {
            out.push(format!("{pad}{} ()", header(h, node)));
            return;
        }
        out.push(format!("{pad}{} (", header(h, node)));
        for &p in node.parents() {
            if seen.contains(&p) {
                out.push(format!("{pad}  {{{{{p}}}}}"));
            } else {
                walk(g, p, indent + 2, seen, out);
            }
        }
        out.push(format!("{pad})"));
    }

    let mut out = Vec::new();
    walk(g, root, 0, &mut HashSet::new(), &mut out);
    out.join("\n")
}

/// Structural JSON dump of the sub-graph rooted at `root`.
///
/// Shared nodes are spelled out once; later occurrences are `{"ref": id}`.
pub fn to_json(g: &Graph, root: Handle<Node>) -> serde_json::Value {
    fn walk(g: &Graph, h: Handle<Node>, seen: &mut HashSet<Handle<Node>>) -> serde_json::Value {
        if !seen.insert(h) {
            return serde_json::json!({ "ref": h.index() });
        }
        let node = &g[h];
        let parents: Vec<serde_json::Value> =
            node.parents().iter().map(|&p| walk(g, p, seen)).collect();
        let mut obj = serde_json::json!({
            "id": h.index(),
            "kind": node.tag(),
            "type": node.ty().to_string(),
            "parents": parents,
        });
        let extra = match node.kind() {
            NodeKind::Constant(v) => serde_json::to_value(v).ok(),
            NodeKind::Attribute(buffer) => serde_json::to_value(buffer).ok(),
            NodeKind::Sampler(texture) => serde_json::to_value(texture).ok(),
            NodeKind::Struct { fields } => serde_json::to_value(fields).ok(),
            NodeKind::Swizzle { indices, .. } => serde_json::to_value(indices).ok(),
            _ => None,
        };
        if let (Some(extra), Some(map)) = (extra, obj.as_object_mut()) {
            map.insert("value".into(), extra);
        }
        obj
    }

    walk(g, root, &mut HashSet::new())
}
