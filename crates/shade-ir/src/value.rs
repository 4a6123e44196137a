//! Concrete host-side values produced by evaluation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ShadeError;
use crate::types::{ScalarKind, StructMember, Type, VectorSize};

/// A concrete value computed on the host.
///
/// Matrices are stored column-major. Struct fields are keyed by name, and
/// since the map iterates in name order, the `i`-th entry lines up with the
/// `i`-th member of the struct type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    BVec(Vec<bool>),
    IVec(Vec<i32>),
    Vec(Vec<f32>),
    Mat { size: VectorSize, data: Vec<f32> },
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// The type this value inhabits.
    pub fn ty(&self) -> Type {
        let vector = |len: usize, kind| match VectorSize::from_len(len) {
            Some(size) => Type::vector(size, kind),
            None => Type::Scalar(kind),
        };
        match self {
            Self::Bool(_) => Type::BOOL,
            Self::Int(_) => Type::INT,
            Self::Float(_) => Type::FLOAT,
            Self::BVec(v) => vector(v.len(), ScalarKind::Bool),
            Self::IVec(v) => vector(v.len(), ScalarKind::Sint),
            Self::Vec(v) => vector(v.len(), ScalarKind::Float),
            Self::Mat { size, .. } => Type::Matrix { size: *size },
            Self::Array(items) => {
                let base = items.first().map_or(Type::FLOAT, Value::ty);
                Type::array(base, items.len() as u32)
            }
            Self::Struct(fields) => Type::Struct {
                members: fields
                    .iter()
                    .map(|(name, v)| StructMember {
                        name: name.clone(),
                        ty: v.ty(),
                    })
                    .collect(),
            },
        }
    }

    /// Checks that the value spells a well-formed type: vectors of 2 to 4
    /// components, square matrix data, non-empty arrays of one non-array
    /// type, and non-empty structs.
    pub fn check_shape(&self) -> Result<(), ShadeError> {
        let malformed = |what: String| Err(ShadeError::InvalidExpression(what));
        match self {
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => Ok(()),
            Self::BVec(v) if VectorSize::from_len(v.len()).is_none() => {
                malformed(format!("bvec with {} components", v.len()))
            }
            Self::IVec(v) if VectorSize::from_len(v.len()).is_none() => {
                malformed(format!("ivec with {} components", v.len()))
            }
            Self::Vec(v) if VectorSize::from_len(v.len()).is_none() => {
                malformed(format!("vec with {} components", v.len()))
            }
            Self::BVec(_) | Self::IVec(_) | Self::Vec(_) => Ok(()),
            Self::Mat { size, data } => {
                let n = size.len();
                if data.len() == n * n {
                    Ok(())
                } else {
                    malformed(format!("mat{n} with {} entries", data.len()))
                }
            }
            Self::Array(items) => {
                let Some(first) = items.first() else {
                    return malformed("empty array".into());
                };
                for item in items {
                    item.check_shape()?;
                }
                let base = first.ty();
                if base.is_array() {
                    return malformed("array of arrays".into());
                }
                if let Some(odd) = items.iter().find(|item| item.ty() != base) {
                    return malformed(format!("array of {base} holding a {}", odd.ty()));
                }
                Ok(())
            }
            Self::Struct(fields) => {
                if fields.is_empty() {
                    return malformed("struct without fields".into());
                }
                fields.values().try_for_each(Value::check_shape)
            }
        }
    }

    /// Builds a value of `ty` from its flattened scalar components.
    pub fn from_scalars(ty: &Type, scalars: Vec<Value>) -> Result<Self, ShadeError> {
        let expected = ty.flat_len().ok_or_else(|| {
            ShadeError::InvalidExpression(format!("{ty} cannot be built from scalars"))
        })?;
        if scalars.len() != expected {
            return Err(ShadeError::InvalidExpression(format!(
                "{ty} needs {expected} components, got {}",
                scalars.len()
            )));
        }
        let mismatch =
            || ShadeError::type_mismatch(format!("{ty} constructor"), ty.to_string(), &[ty]);
        match ty {
            Type::Scalar(_) => scalars.into_iter().next().ok_or_else(mismatch),
            Type::Vector {
                kind: ScalarKind::Float,
                ..
            }
            | Type::Matrix { .. } => {
                let data = scalars
                    .iter()
                    .map(|s| s.as_f32().ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match ty {
                    Type::Matrix { size } => Self::Mat { size: *size, data },
                    _ => Self::Vec(data),
                })
            }
            Type::Vector {
                kind: ScalarKind::Sint,
                ..
            } => scalars
                .iter()
                .map(|s| s.as_i32().ok_or_else(mismatch))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::IVec),
            Type::Vector {
                kind: ScalarKind::Bool,
                ..
            } => scalars
                .iter()
                .map(|s| s.as_bool().ok_or_else(mismatch))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::BVec),
            _ => Err(mismatch()),
        }
    }

    /// Flattens scalars, vectors and matrices into their scalar components.
    pub fn scalars(&self) -> Vec<Value> {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => vec![self.clone()],
            Self::BVec(v) => v.iter().copied().map(Self::Bool).collect(),
            Self::IVec(v) => v.iter().copied().map(Self::Int).collect(),
            Self::Vec(v) | Self::Mat { data: v, .. } => {
                v.iter().copied().map(Self::Float).collect()
            }
            Self::Array(items) => items.iter().flat_map(Value::scalars).collect(),
            Self::Struct(fields) => fields.values().flat_map(Value::scalars).collect(),
        }
    }

    /// Component `i` as seen by `element(i)`: vector entries, matrix
    /// columns, array items, or struct fields in name order.
    pub fn component(&self, i: usize) -> Option<Value> {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => (i == 0).then(|| self.clone()),
            Self::BVec(v) => v.get(i).copied().map(Self::Bool),
            Self::IVec(v) => v.get(i).copied().map(Self::Int),
            Self::Vec(v) => v.get(i).copied().map(Self::Float),
            Self::Mat { size, data } => {
                let n = size.len();
                let column = data.get(i * n..(i + 1) * n)?;
                (i < n).then(|| Self::Vec(column.to_vec()))
            }
            Self::Array(items) => items.get(i).cloned(),
            Self::Struct(fields) => fields.values().nth(i).cloned(),
        }
    }

    /// Number of components addressable with [`Value::component`].
    pub fn component_count(&self) -> usize {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => 1,
            Self::BVec(v) => v.len(),
            Self::IVec(v) => v.len(),
            Self::Vec(v) => v.len(),
            Self::Mat { size, .. } => size.len(),
            Self::Array(items) => items.len(),
            Self::Struct(fields) => fields.len(),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Reads a scalar as an index: ints directly, floats floored.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Float(v) if v.is_finite() => Some(v.floor() as i64),
            _ => None,
        }
    }

    /// `true` if every float component is finite.
    pub fn is_finite(&self) -> bool {
        self.scalars()
            .iter()
            .all(|s| s.as_f32().is_none_or(f32::is_finite))
    }

    /// The identity matrix of the given size.
    pub fn identity(size: VectorSize) -> Self {
        let n = size.len();
        let data = (0..n * n)
            .map(|k| if k / n == k % n { 1.0 } else { 0.0 })
            .collect();
        Self::Mat { size, data }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
