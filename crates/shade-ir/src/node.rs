//! Expression nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::arena::Handle;
use crate::builtin::BuiltinFunction;
use crate::types::{ScalarKind, Type};
use crate::value::Value;

/// A per-vertex input stream bound by the rendering layer.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize)]
pub struct AttributeBuffer {
    /// Shader-side identifier.
    pub name: String,
    /// Type of one vertex's item.
    pub ty: Type,
}

/// A 2D texture bound by the rendering layer.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize)]
pub struct Texture {
    /// Shader-side identifier.
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// The operation a node performs.
///
/// The set of kinds is closed; behavior per kind lives in the modules that
/// match on it (evaluation, element projection, code generation).
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A literal value.
    Constant(Value),
    /// A uniform whose host value is bound on the graph.
    Parameter { name: String },
    /// An attribute-buffer input.
    Attribute(AttributeBuffer),
    /// A texture sampler input.
    Sampler(Texture),
    /// `gl_FragCoord`.
    FragCoord,
    /// A vector or matrix constructor over scalar/vector components.
    Construct,
    /// An array of same-typed elements.
    Array,
    /// A struct constructor; `fields[i]` names `parents[i]`.
    Struct { fields: Vec<String> },
    /// Component selection. `pattern` is lowercase; `indices` are resolved.
    Swizzle {
        pattern: String,
        indices: Vec<u32>,
        /// Emit into a temporary instead of inlining.
        materialize: bool,
    },
    /// `parents[0][parents[1]]`.
    Index,
    /// Struct field access on a non-constructor struct value.
    Field { name: String, index: u32 },
    /// A builtin call.
    Call(Arc<BuiltinFunction>),
    /// A scalar conversion.
    Cast(ScalarKind),
    /// `parents[0] ? parents[1] : parents[2]`.
    Select,
    /// `parents[0]`, discarding the fragment when `parents[1]` holds.
    Discard,
}

impl NodeKind {
    /// The operation tag used by diagnostics.
    pub fn tag(&self) -> String {
        match self {
            Self::Constant(_) => "constant".into(),
            Self::Parameter { name } => format!("parameter{{{name}}}"),
            Self::Attribute(buffer) => format!("attribute_buffer{{{}}}", buffer.name),
            Self::Sampler(texture) => format!("texture{{{}}}", texture.name),
            Self::FragCoord => "fragCoord".into(),
            Self::Construct => "construct".into(),
            Self::Array => "array".into(),
            Self::Struct { .. } => "struct".into(),
            Self::Swizzle { pattern, .. } => format!("swizzle{{{pattern}}}"),
            Self::Index => "index".into(),
            Self::Field { name, .. } => format!("field{{{name}}}"),
            Self::Call(f) => format!("builtin_function{{{}}}", f.name),
            Self::Cast(kind) => {
                let target = match kind {
                    ScalarKind::Bool => "bool",
                    ScalarKind::Sint => "int",
                    ScalarKind::Float => "float",
                };
                format!("cast{{{target}}}")
            }
            Self::Select => "select".into(),
            Self::Discard => "discard_if".into(),
        }
    }

    /// `true` for kinds without parents.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Constant(_)
                | Self::Parameter { .. }
                | Self::Attribute(_)
                | Self::Sampler(_)
                | Self::FragCoord
        )
    }

    /// Inputs whose values only exist on the device.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Attribute(_) | Self::Sampler(_) | Self::FragCoord)
    }

    /// Checks the parent count, returning a description of what was
    /// expected on failure.
    pub fn check_arity(&self, found: usize) -> Result<(), String> {
        let ok = match self {
            _ if self.is_leaf() => found == 0,
            Self::Construct | Self::Array => found >= 1,
            Self::Struct { fields } => found == fields.len(),
            Self::Swizzle { .. } | Self::Field { .. } | Self::Cast(_) => found == 1,
            Self::Index | Self::Discard => found == 2,
            Self::Select => found == 3,
            Self::Call(f) => f.arities().contains(&found),
            _ => true,
        };
        if ok {
            return Ok(());
        }
        Err(match self {
            _ if self.is_leaf() => "0".into(),
            Self::Construct | Self::Array => "at least 1".into(),
            Self::Struct { fields } => fields.len().to_string(),
            Self::Index | Self::Discard => "2".into(),
            Self::Select => "3".into(),
            Self::Call(f) => f
                .arities()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
            _ => "1".into(),
        })
    }

    /// Whether reaching this node guarantees operand `i` is evaluated.
    ///
    /// Only the branches of a selection are conditional.
    pub fn parent_is_unconditional(&self, i: usize) -> bool {
        !matches!(self, Self::Select) || i == 0
    }
}

/// Memoized derived properties of a node.
///
/// Each slot is filled at most once; the graph hands out mutable access
/// only through `&mut Graph`.
#[derive(Clone, Debug, Default)]
pub struct NodeCache {
    pub is_constant: Option<bool>,
    pub constant_value: Option<Value>,
    pub elements: BTreeMap<u32, Handle<Node>>,
    pub element_is_constant: BTreeMap<u32, bool>,
}

/// A typed vertex of the expression DAG.
#[derive(Clone, Debug)]
pub struct Node {
    ty: Type,
    parents: Vec<Handle<Node>>,
    kind: NodeKind,
    pub(crate) cache: NodeCache,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, ty: Type, parents: Vec<Handle<Node>>) -> Self {
        Self {
            ty,
            parents,
            kind,
            cache: NodeCache::default(),
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Operands, in order.
    pub fn parents(&self) -> &[Handle<Node>] {
        &self.parents
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn cache(&self) -> &NodeCache {
        &self.cache
    }

    pub fn tag(&self) -> String {
        self.kind.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags() {
        assert_eq!(NodeKind::Constant(Value::Float(1.0)).tag(), "constant");
        assert_eq!(
            NodeKind::Swizzle {
                pattern: "xyz".into(),
                indices: vec![0, 1, 2],
                materialize: false
            }
            .tag(),
            "swizzle{xyz}"
        );
        assert_eq!(NodeKind::Cast(ScalarKind::Sint).tag(), "cast{int}");
        assert_eq!(
            NodeKind::Parameter { name: "u".into() }.tag(),
            "parameter{u}"
        );
    }

    #[test]
    fn arity_checks() {
        assert!(NodeKind::Index.check_arity(2).is_ok());
        assert_eq!(NodeKind::Index.check_arity(1), Err("2".to_string()));
        assert_eq!(NodeKind::FragCoord.check_arity(1), Err("0".to_string()));
        assert!(NodeKind::Construct.check_arity(4).is_ok());
        assert_eq!(
            NodeKind::Array.check_arity(0),
            Err("at least 1".to_string())
        );
        let fields = vec!["a".to_string(), "b".to_string()];
        assert!(NodeKind::Struct { fields }.check_arity(2).is_ok());
    }

    #[test]
    fn selection_branches_are_conditional() {
        assert!(NodeKind::Select.parent_is_unconditional(0));
        assert!(!NodeKind::Select.parent_is_unconditional(1));
        assert!(!NodeKind::Select.parent_is_unconditional(2));
        assert!(NodeKind::Discard.parent_is_unconditional(1));
        assert!(NodeKind::Index.parent_is_unconditional(1));
    }
}
