//! Error types for the Shade expression graph.

/// Errors raised while constructing, folding or evaluating expressions.
///
/// Every error is fatal to the call that raised it; construction either
/// appends a complete node or leaves the graph untouched.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ShadeError {
    /// A builtin was called with the wrong number of arguments.
    #[error("type error on {function}: expected {expected} arguments, got {found} instead")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    /// No candidate accepts the given argument types.
    #[error("type error on {context}: expected {expected}, got ({})", .found.join(", "))]
    TypeMismatch {
        context: String,
        expected: String,
        found: Vec<String>,
    },

    /// A host value that cannot be lifted into an expression.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// Struct field access by an undeclared name.
    #[error("field '{field}' not found in {ty}")]
    FieldNotFound { field: String, ty: String },

    /// A constant value was requested from a non-constant expression.
    #[error("constant value requested from non-constant expression {0}")]
    NonConstantAccess(String),

    /// Host evaluation of a node that only has meaning on the device.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A parent handle does not name a node already in the graph.
    #[error("handle index {index} out of bounds (graph size: {size})")]
    BadHandle { index: usize, size: usize },

    /// The parent list does not fit the node kind.
    #[error("malformed {kind} node: expected {expected} parents, got {found}")]
    MalformedNode {
        kind: String,
        expected: String,
        found: usize,
    },

    /// A component index past the end of a composite.
    #[error("element {index} out of range for {ty}")]
    ElementOutOfRange { index: usize, ty: String },

    /// A swizzle pattern that does not name components of the vector.
    #[error("invalid swizzle pattern '{pattern}' for {ty}")]
    InvalidSwizzle { pattern: String, ty: String },

    /// A parameter was evaluated before a host value was bound to it.
    #[error("parameter '{0}' has no bound value")]
    UnboundParameter(String),
}

impl ShadeError {
    /// Shorthand for a [`ShadeError::TypeMismatch`] over displayable types.
    pub fn type_mismatch<T: std::fmt::Display>(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: &[T],
    ) -> Self {
        Self::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found: found.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_lists_every_type() {
        let err = ShadeError::type_mismatch("add", "a matching signature", &["float", "vec2"]);
        assert_eq!(
            err.to_string(),
            "type error on add: expected a matching signature, got (float, vec2)"
        );
    }

    #[test]
    fn arity_message() {
        let err = ShadeError::Arity {
            function: "clamp".into(),
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "type error on clamp: expected 3 arguments, got 2 instead"
        );
    }
}
