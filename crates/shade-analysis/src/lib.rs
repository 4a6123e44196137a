//! Analyses over Shade expression graphs.
//!
//! Everything here walks [`Graph::sorted_sub_expressions`](shade_ir::Graph::sorted_sub_expressions)
//! from a root: searching, resource enumeration, use counts and
//! conditional-execution propagation.

pub mod conditions;
pub mod resources;
pub mod search;

pub use conditions::ExecutionConditions;
pub use resources::{Resources, attribute_buffers, textures, uniforms};
pub use search::{find_if, is_topologically_sorted, locate, use_counts};
