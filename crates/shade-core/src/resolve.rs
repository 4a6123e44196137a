//! Overload resolution.
//!
//! Candidates are scanned in declaration order and the first whose
//! parameter types all equal the argument types wins. There is no
//! coercion: an `int` never matches a `float` parameter.

use shade_ir::{ShadeError, Signature, Type};

/// Resolver failures, before they are attributed to a function.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("expected {expected} arguments, got {found} instead")]
    Arity { expected: usize, found: usize },
    #[error("could not find appropriate type match for ({})", .found.join(", "))]
    NoMatch { found: Vec<String> },
}

impl ResolveError {
    /// Attributes the failure to `function`.
    pub fn on(self, function: &str) -> ShadeError {
        match self {
            Self::Arity { expected, found } => ShadeError::Arity {
                function: function.to_string(),
                expected,
                found,
            },
            Self::NoMatch { found } => ShadeError::TypeMismatch {
                context: function.to_string(),
                expected: "a matching signature".into(),
                found,
            },
        }
    }
}

/// Picks the result type of the first signature matching `args`.
pub fn resolve<'a>(signatures: &'a [Signature], args: &[Type]) -> Result<&'a Type, ResolveError> {
    if !signatures.iter().any(|s| s.params.len() == args.len()) {
        let expected = signatures.first().map_or(0, |s| s.params.len());
        return Err(ResolveError::Arity {
            expected,
            found: args.len(),
        });
    }
    signatures
        .iter()
        .find(|s| s.accepts(args))
        .map(|s| &s.result)
        .ok_or_else(|| ResolveError::NoMatch {
            found: args.iter().map(ToString::to_string).collect(),
        })
}
