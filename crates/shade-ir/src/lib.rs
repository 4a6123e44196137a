//! Shade expression graph representation.
//!
//! An arena-based DAG of typed expression nodes, the type system and
//! concrete values they range over, and the builtin function descriptors
//! shared by the evaluator and code generators.

pub mod arena;
mod builtin;
mod display;
mod error;
pub mod graph;
mod node;
mod types;
mod value;

pub use arena::{Arena, Handle};
pub use builtin::{BuiltinFunction, ElementRule, Evaluator, GlslForm, Signature};
pub use display::{debug_print, format_float, to_json};
pub use error::ShadeError;
pub use graph::Graph;
pub use node::{AttributeBuffer, Node, NodeCache, NodeKind, Texture};
pub use types::{ScalarKind, StructMember, Type, VectorSize};
pub use value::Value;

/// Handle to a node of a [`Graph`].
pub type NodeHandle = Handle<Node>;

/// Result alias used throughout the Shade crates.
pub type Result<T, E = ShadeError> = std::result::Result<T, E>;
