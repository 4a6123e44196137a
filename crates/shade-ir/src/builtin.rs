//! Builtin function descriptors.

use std::fmt;

use crate::error::ShadeError;
use crate::types::Type;
use crate::value::Value;

/// Host implementation of a builtin: argument values and the resolved
/// result type in, result value out.
pub type Evaluator = fn(&[Value], &Type) -> Result<Value, ShadeError>;

/// One candidate overload: parameter types and the result type.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub result: Type,
}

impl Signature {
    pub fn new(params: impl Into<Vec<Type>>, result: Type) -> Self {
        Self {
            params: params.into(),
            result,
        }
    }

    /// `true` if every argument type equals the parameter type.
    pub fn accepts(&self, args: &[Type]) -> bool {
        self.params.len() == args.len() && self.params.iter().zip(args).all(|(p, a)| p == a)
    }
}

/// How a call renders in GLSL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlslForm {
    /// `name(a, b, ...)`.
    Call(&'static str),
    /// `(a op b)`.
    Infix(&'static str),
    /// `(op a)`.
    Prefix(&'static str),
}

/// How component `i` of a call is expressed in terms of its operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementRule {
    /// No decomposition; component `i` is an index into the call result.
    Whole,
    /// Component-wise: apply the function (or the named scalar function)
    /// to component `i` of every vector operand, passing scalars through.
    Broadcast { via: Option<&'static str> },
    /// Linear-algebra product; component-wise unless a matrix is involved.
    Product,
    Cross,
    Normalize,
    FaceForward,
    Reflect,
    Refract,
}

/// A builtin operation: overloads, evaluator, projection rule and GLSL form.
pub struct BuiltinFunction {
    pub name: &'static str,
    pub glsl: GlslForm,
    pub signatures: Vec<Signature>,
    pub evaluator: Evaluator,
    pub element: ElementRule,
    /// Device-only builtins (texture sampling, derivatives) are never
    /// constant and cannot be evaluated on the host.
    pub device_only: bool,
}

impl BuiltinFunction {
    /// Every arity accepted by at least one signature, in declaration order.
    pub fn arities(&self) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for sig in &self.signatures {
            if !out.contains(&sig.params.len()) {
                out.push(sig.params.len());
            }
        }
        out
    }
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFunction({})", self.name)
    }
}
