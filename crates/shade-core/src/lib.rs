//! Building and evaluating Shade expressions.
//!
//! [`make`] normalizes host values into nodes, [`ops`] and [`builtins`]
//! construct typed expressions through overload resolution, [`eval`]
//! computes values on the host and [`element`] answers constancy queries
//! at whole-value and per-component granularity.

pub mod builtins;
pub mod element;
pub mod eval;
pub mod lift;
pub mod make;
pub mod ops;
pub mod resolve;

pub use builtins::{BuiltinRegistry, call_function, catalog, registry};
pub use element::{
    constant_value, element, element_constant_value, element_is_constant, is_constant,
};
pub use eval::{EvalCache, evaluate, evaluate_with};
pub use lift::{Lifted, lift};
pub use make::{HostValue, constant, make, make_all};
pub use resolve::{ResolveError, resolve};
