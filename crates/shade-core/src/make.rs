//! Normalization of host values into expression nodes.

use shade_ir::{AttributeBuffer, Graph, NodeHandle, NodeKind, Result, ShadeError, Texture, Value};

use crate::ops;

/// Anything a host program can hand to the expression builders.
#[derive(Clone, Debug)]
pub enum HostValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    /// Text never denotes an expression; kept so callers get a typed error.
    Text(String),
    Seq(Vec<HostValue>),
    /// A typed composite literal (vector, matrix, ...).
    Value(Value),
    /// An existing node, passed through unchanged.
    Node(NodeHandle),
    Buffer(AttributeBuffer),
    Texture(Texture),
    /// Keyed fields; order does not matter.
    Record(Vec<(String, HostValue)>),
}

impl HostValue {
    /// Builds a record from `(name, value)` pairs.
    pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<HostValue>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for HostValue {
            fn from(v: $ty) -> Self {
                Self::$variant(v.into())
            }
        })*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    f32 => Float,
    f64 => Float,
    &str => Text,
    String => Text,
    Value => Value,
    NodeHandle => Node,
    AttributeBuffer => Buffer,
    Texture => Texture,
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(v: Vec<T>) -> Self {
        Self::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HostValue>, const N: usize> From<[T; N]> for HostValue {
    fn from(v: [T; N]) -> Self {
        Self::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl From<&NodeHandle> for HostValue {
    fn from(h: &NodeHandle) -> Self {
        Self::Node(*h)
    }
}

/// Appends a constant leaf, rejecting non-finite floats.
pub fn constant(g: &mut Graph, value: Value) -> Result<NodeHandle> {
    value.check_shape()?;
    if !value.is_finite() {
        return Err(ShadeError::InvalidExpression(format!(
            "non-finite constant {value:?}"
        )));
    }
    let ty = value.ty();
    g.append(NodeKind::Constant(value), ty, vec![])
}

/// Turns a host value into a node of `g`.
///
/// Scalars and typed composites become constants, sequences become arrays,
/// records become structs and resource handles become opaque inputs.
pub fn make(g: &mut Graph, value: impl Into<HostValue>) -> Result<NodeHandle> {
    match value.into() {
        HostValue::Node(h) => {
            g.try_node(h)?;
            Ok(h)
        }
        HostValue::Bool(b) => constant(g, Value::Bool(b)),
        HostValue::Int(i) => constant(g, Value::Int(i)),
        HostValue::Float(f) => {
            let narrowed = f as f32;
            if !narrowed.is_finite() {
                return Err(ShadeError::InvalidExpression(format!(
                    "{f} is not a finite float"
                )));
            }
            constant(g, Value::Float(narrowed))
        }
        HostValue::Text(text) => Err(ShadeError::InvalidExpression(format!(
            "text \"{text}\" is not an expression"
        ))),
        HostValue::Value(v) => constant(g, v),
        HostValue::Seq(items) => {
            if items.is_empty() {
                return Err(ShadeError::InvalidExpression(
                    "empty sequences have no element type".into(),
                ));
            }
            let elements = items
                .into_iter()
                .map(|item| make(g, item))
                .collect::<Result<Vec<_>>>()?;
            ops::array(g, elements)
        }
        HostValue::Buffer(buffer) => ops::attribute(g, buffer),
        HostValue::Texture(texture) => ops::sampler2d(g, texture),
        HostValue::Record(fields) => ops::structure(g, fields),
    }
}

/// Normalizes every argument in order.
pub fn make_all(g: &mut Graph, values: Vec<HostValue>) -> Result<Vec<NodeHandle>> {
    values.into_iter().map(|v| make(g, v)).collect()
}
