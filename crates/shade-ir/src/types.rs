//! Type system for Shade expressions.

use serde::Serialize;

use crate::error::ShadeError;

/// The kind of a scalar type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// Signed integer.
    Sint,
    /// Floating point.
    Float,
}

/// Number of components in a vector, or columns of a square matrix.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub enum VectorSize {
    /// 2 components.
    Bi = 2,
    /// 3 components.
    Tri = 3,
    /// 4 components.
    Quad = 4,
}

impl VectorSize {
    /// Returns the size for a component count in `2..=4`.
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            2 => Some(Self::Bi),
            3 => Some(Self::Tri),
            4 => Some(Self::Quad),
            _ => None,
        }
    }

    /// Number of components.
    pub fn len(self) -> usize {
        self as usize
    }
}

/// A member of a struct type.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
}

/// A Shade type descriptor.
///
/// Equality is nominal and non-coercing: `float` and `int` never match,
/// and two struct types are equal only if their sorted members are.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize)]
pub enum Type {
    /// A single scalar value.
    Scalar(ScalarKind),
    /// A vector of scalars.
    Vector { size: VectorSize, kind: ScalarKind },
    /// A square matrix of float column vectors.
    Matrix { size: VectorSize },
    /// A 2D texture sampler.
    Sampler2D,
    /// A fixed-size array.
    Array { base: Box<Type>, size: u32 },
    /// A struct whose members are kept sorted by name.
    Struct { members: Vec<StructMember> },
}

impl Type {
    pub const FLOAT: Self = Self::Scalar(ScalarKind::Float);
    pub const INT: Self = Self::Scalar(ScalarKind::Sint);
    pub const BOOL: Self = Self::Scalar(ScalarKind::Bool);
    pub const VEC2: Self = Self::vector(VectorSize::Bi, ScalarKind::Float);
    pub const VEC3: Self = Self::vector(VectorSize::Tri, ScalarKind::Float);
    pub const VEC4: Self = Self::vector(VectorSize::Quad, ScalarKind::Float);
    pub const IVEC2: Self = Self::vector(VectorSize::Bi, ScalarKind::Sint);
    pub const IVEC3: Self = Self::vector(VectorSize::Tri, ScalarKind::Sint);
    pub const IVEC4: Self = Self::vector(VectorSize::Quad, ScalarKind::Sint);
    pub const BVEC2: Self = Self::vector(VectorSize::Bi, ScalarKind::Bool);
    pub const BVEC3: Self = Self::vector(VectorSize::Tri, ScalarKind::Bool);
    pub const BVEC4: Self = Self::vector(VectorSize::Quad, ScalarKind::Bool);
    pub const MAT2: Self = Self::Matrix {
        size: VectorSize::Bi,
    };
    pub const MAT3: Self = Self::Matrix {
        size: VectorSize::Tri,
    };
    pub const MAT4: Self = Self::Matrix {
        size: VectorSize::Quad,
    };

    /// Builds a vector type.
    pub const fn vector(size: VectorSize, kind: ScalarKind) -> Self {
        Self::Vector { size, kind }
    }

    /// Builds a fixed-size array type.
    pub fn array(base: Type, size: u32) -> Self {
        Self::Array {
            base: Box::new(base),
            size,
        }
    }

    /// Builds a struct type, canonicalizing the member order.
    ///
    /// Members are sorted by name so that two structs declared with the
    /// same fields in different orders are the same type and lay their
    /// fields out at the same positions.
    pub fn structure(
        members: impl IntoIterator<Item = (String, Type)>,
    ) -> Result<Self, ShadeError> {
        let mut members: Vec<StructMember> = members
            .into_iter()
            .map(|(name, ty)| StructMember { name, ty })
            .collect();
        if members.is_empty() {
            return Err(ShadeError::InvalidExpression(
                "struct types need at least one field".into(),
            ));
        }
        members.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(dup) = members.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(ShadeError::InvalidExpression(format!(
                "duplicate struct field '{}'",
                dup[0].name
            )));
        }
        Ok(Self::Struct { members })
    }

    /// `true` for plain scalars.
    pub fn is_pod(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    pub fn is_vec(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }

    pub fn is_mat(&self) -> bool {
        matches!(self, Self::Matrix { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    /// `true` for scalars, vectors and matrices: the types a literal can spell.
    pub fn is_numeric_shape(&self) -> bool {
        matches!(
            self,
            Self::Scalar(_) | Self::Vector { .. } | Self::Matrix { .. }
        )
    }

    /// `true` for the scalar `int` type.
    pub fn is_integral(&self) -> bool {
        *self == Self::INT
    }

    /// `true` for the scalar `float` type.
    pub fn is_floating(&self) -> bool {
        *self == Self::FLOAT
    }

    /// Scalar kind of a scalar, vector or matrix type.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) | Self::Vector { kind, .. } => Some(*kind),
            Self::Matrix { .. } => Some(ScalarKind::Float),
            _ => None,
        }
    }

    /// Vector width, or `None` for non-vectors.
    pub fn vec_dimension(&self) -> Option<usize> {
        match self {
            Self::Vector { size, .. } => Some(size.len()),
            _ => None,
        }
    }

    /// Number of directly addressable components.
    ///
    /// Scalars count as a single component; samplers have none.
    pub fn component_count(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vector { size, .. } | Self::Matrix { size } => size.len(),
            Self::Array { size, .. } => *size as usize,
            Self::Struct { members } => members.len(),
            Self::Sampler2D => 0,
        }
    }

    /// Number of scalars this value flattens to in a constructor call.
    pub fn flat_len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => Some(1),
            Self::Vector { size, .. } => Some(size.len()),
            Self::Matrix { size } => Some(size.len() * size.len()),
            _ => None,
        }
    }

    /// Type of component `i`, as projected by `element(i)`.
    pub fn element_type(&self, i: usize) -> Option<Type> {
        if i >= self.component_count() {
            return None;
        }
        match self {
            Self::Scalar(_) => Some(self.clone()),
            Self::Vector { kind, .. } => Some(Self::Scalar(*kind)),
            Self::Matrix { size } => Some(Self::vector(*size, ScalarKind::Float)),
            Self::Array { base, .. } => Some((**base).clone()),
            Self::Struct { members } => Some(members[i].ty.clone()),
            Self::Sampler2D => None,
        }
    }

    /// Result type of indexing with `at`: the vector component, matrix
    /// column or array element type.
    pub fn array_base(&self) -> Option<Type> {
        match self {
            Self::Vector { .. } | Self::Matrix { .. } | Self::Array { .. } => {
                self.element_type(0)
            }
            _ => None,
        }
    }

    /// Struct members, or an empty slice for non-struct types.
    pub fn members(&self) -> &[StructMember] {
        match self {
            Self::Struct { members } => members,
            _ => &[],
        }
    }

    /// Canonical position of a struct field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.members().iter().position(|m| m.name == name)
    }

    /// GLSL spelling of the type.
    ///
    /// Arrays spell their base type; use [`Type::declare`] for the
    /// bracketed size.
    pub fn glsl_name(&self) -> String {
        match self {
            Self::Scalar(ScalarKind::Float) => "float".into(),
            Self::Scalar(ScalarKind::Sint) => "int".into(),
            Self::Scalar(ScalarKind::Bool) => "bool".into(),
            Self::Vector { size, kind } => {
                let prefix = match kind {
                    ScalarKind::Float => "",
                    ScalarKind::Sint => "i",
                    ScalarKind::Bool => "b",
                };
                format!("{prefix}vec{}", size.len())
            }
            Self::Matrix { size } => format!("mat{}", size.len()),
            Self::Sampler2D => "sampler2D".into(),
            Self::Array { base, .. } => base.glsl_name(),
            Self::Struct { .. } => self.mangled_name(),
        }
    }

    /// A GLSL declaration of a variable of this type.
    pub fn declare(&self, name: &str) -> String {
        match self {
            Self::Array { size, .. } => format!("{} {name}[{size}]", self.glsl_name()),
            _ => format!("{} {name}", self.glsl_name()),
        }
    }

    /// Deterministic identifier used for struct type names in GLSL.
    fn mangled_name(&self) -> String {
        match self {
            Self::Array { base, size } => format!("{}x{size}", base.mangled_name()),
            Self::Struct { members } => {
                let parts: Vec<String> = members
                    .iter()
                    .map(|m| format!("{}_{}", m.name, m.ty.mangled_name()))
                    .collect();
                format!("S_{}_E", parts.join("_"))
            }
            _ => self.glsl_name(),
        }
    }

    /// GLSL struct declaration for struct types.
    pub fn struct_declaration(&self) -> Option<String> {
        let Self::Struct { members } = self else {
            return None;
        };
        let mut out = format!("struct {} {{\n", self.glsl_name());
        for m in members {
            out.push_str(&format!("    {};\n", m.ty.declare(&m.name)));
        }
        out.push_str("};\n");
        Some(out)
    }

    // GLSL ES highp limits: ints are only guaranteed to 2^16, floats to ~1e18.
    const INT_INFINITY: i32 = 65535;
    const FLOAT_INFINITY: f32 = 1e18;

    /// The largest representable magnitude for numeric types.
    pub fn infinity(&self) -> Option<crate::Value> {
        self.splat_value(Self::INT_INFINITY, Self::FLOAT_INFINITY)
    }

    /// The negated [`Type::infinity`].
    pub fn minus_infinity(&self) -> Option<crate::Value> {
        self.splat_value(-Self::INT_INFINITY, -Self::FLOAT_INFINITY)
    }

    /// The zero value of numeric types.
    pub fn zero(&self) -> Option<crate::Value> {
        self.splat_value(0, 0.0)
    }

    fn splat_value(&self, int: i32, float: f32) -> Option<crate::Value> {
        use crate::Value;
        match self {
            Self::Scalar(ScalarKind::Sint) => Some(Value::Int(int)),
            Self::Scalar(ScalarKind::Float) => Some(Value::Float(float)),
            Self::Vector {
                size,
                kind: ScalarKind::Sint,
            } => Some(Value::IVec(vec![int; size.len()])),
            Self::Vector {
                size,
                kind: ScalarKind::Float,
            } => Some(Value::Vec(vec![float; size.len()])),
            Self::Matrix { size } => Some(Value::Mat {
                size: *size,
                data: vec![float; size.len() * size.len()],
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Array { base, size } => write!(f, "{base}[{size}]"),
            Self::Struct { members } => {
                let fields: Vec<String> = members
                    .iter()
                    .map(|m| format!("{}:{}", m.name, m.ty))
                    .collect();
                write!(f, "struct{{{}}}", fields.join(","))
            }
            _ => f.write_str(&self.glsl_name()),
        }
    }
}
