//! Value types carried by sockets and the conversion rules between them.
//!
//! Types are plain values compared structurally. Scalar, vector and matrix types hold no heap
//! data, so building one is as cheap as looking it up.

use crate::error::{Error, Result};

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Scalar base of a [Type].
pub enum ScalarBase {
    #[allow(missing_docs)]
    Bool,
    #[allow(missing_docs)]
    Int,
    #[allow(missing_docs)]
    Uint,
    #[allow(missing_docs)]
    Float,
    #[allow(missing_docs)]
    Double,
}

impl ScalarBase {
    /// Every scalar base.
    pub const ALL: [ScalarBase; 5] = [
        ScalarBase::Float,
        ScalarBase::Double,
        ScalarBase::Int,
        ScalarBase::Uint,
        ScalarBase::Bool,
    ];

    /// Scalar bases arithmetic is defined on.
    pub const NUMERIC: [ScalarBase; 4] = [
        ScalarBase::Float,
        ScalarBase::Double,
        ScalarBase::Int,
        ScalarBase::Uint,
    ];

    // Position in the `int -> uint -> float -> double` promotion chain.
    fn rank(self) -> Option<u8> {
        match self {
            ScalarBase::Bool => None,
            ScalarBase::Int => Some(0),
            ScalarBase::Uint => Some(1),
            ScalarBase::Float => Some(2),
            ScalarBase::Double => Some(3),
        }
    }

    /// Check whether a value of this base promotes to `to` without an explicit cast.
    pub fn can_implicitly_convert(self, to: ScalarBase) -> bool {
        match (self.rank(), to.rank()) {
            (Some(from), Some(to)) => from <= to,
            (None, None) => true,
            _ => false,
        }
    }

    /// Shading-language keyword for the scalar type.
    pub fn glsl_name(self) -> &'static str {
        match self {
            ScalarBase::Bool => "bool",
            ScalarBase::Int => "int",
            ScalarBase::Uint => "uint",
            ScalarBase::Float => "float",
            ScalarBase::Double => "double",
        }
    }

    fn vector_prefix(self) -> &'static str {
        match self {
            ScalarBase::Bool => "b",
            ScalarBase::Int => "i",
            ScalarBase::Uint => "u",
            ScalarBase::Float => "",
            ScalarBase::Double => "d",
        }
    }

    /// Zero literal of the base.
    pub fn default_literal(self) -> &'static str {
        match self {
            ScalarBase::Bool => "false",
            ScalarBase::Int => "0",
            ScalarBase::Uint => "0u",
            ScalarBase::Float => "0.0",
            ScalarBase::Double => "0.0lf",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", try_from = "RawType")]
/// Type of a value flowing through a socket.
pub enum Type {
    /// Single value.
    Scalar {
        #[allow(missing_docs)]
        base: ScalarBase,
    },
    /// Vector of 2 to 4 components.
    Vector {
        #[allow(missing_docs)]
        base: ScalarBase,
        #[allow(missing_docs)]
        size: u8,
    },
    /// Matrix of 2 to 4 rows and columns, `float` or `double` based.
    Matrix {
        #[allow(missing_docs)]
        base: ScalarBase,
        #[allow(missing_docs)]
        rows: u8,
        #[allow(missing_docs)]
        cols: u8,
    },
    /// Any one of the alternatives. Built through [Type::variant], which keeps the list flat and
    /// free of duplicates.
    Variant {
        #[allow(missing_docs)]
        alternatives: Vec<Type>,
    },
    /// Opaque 2D texture sampler.
    Sampler2D,
    /// Unresolved or broken socket.
    Error,
}

// Unchecked shape of a serialized [Type].
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum RawType {
    Scalar { base: ScalarBase },
    Vector { base: ScalarBase, size: u8 },
    Matrix { base: ScalarBase, rows: u8, cols: u8 },
    Variant { alternatives: Vec<Type> },
    Sampler2D,
    Error,
}

impl TryFrom<RawType> for Type {
    type Error = String;

    fn try_from(raw: RawType) -> Result<Self, String> {
        let dimension = |value: u8| {
            if (2..=4).contains(&value) {
                Ok(value)
            } else {
                Err(format!("dimension {value} is outside of 2..=4"))
            }
        };

        Ok(match raw {
            RawType::Scalar { base } => Type::scalar(base),
            RawType::Vector { base, size } => Type::vector(base, dimension(size)?),
            RawType::Matrix { base, rows, cols } => {
                if !matches!(base, ScalarBase::Float | ScalarBase::Double) {
                    return Err(format!("matrices cannot hold `{}`", base.glsl_name()));
                }
                Type::matrix(base, dimension(rows)?, dimension(cols)?)
            }
            RawType::Variant { alternatives } => Type::variant(alternatives),
            RawType::Sampler2D => Type::Sampler2D,
            RawType::Error => Type::Error,
        })
    }
}

impl Type {
    /// `float`
    pub const FLOAT: Type = Type::scalar(ScalarBase::Float);
    /// `bool`
    pub const BOOL: Type = Type::scalar(ScalarBase::Bool);
    /// `vec2`
    pub const VEC2: Type = Type::vector(ScalarBase::Float, 2);
    /// `vec3`
    pub const VEC3: Type = Type::vector(ScalarBase::Float, 3);
    /// `vec4`
    pub const VEC4: Type = Type::vector(ScalarBase::Float, 4);

    /// Scalar type of the given base.
    pub const fn scalar(base: ScalarBase) -> Self {
        Type::Scalar { base }
    }

    /// Vector type; `size` must be within `2..=4`.
    pub const fn vector(base: ScalarBase, size: u8) -> Self {
        Type::Vector { base, size }
    }

    /// Matrix type; `rows` and `cols` must be within `2..=4`.
    pub const fn matrix(base: ScalarBase, rows: u8, cols: u8) -> Self {
        Type::Matrix { base, rows, cols }
    }

    /// Scalar when `size` is 1, vector otherwise.
    pub fn shaped(base: ScalarBase, size: u8) -> Self {
        if size == 1 {
            Type::scalar(base)
        } else {
            Type::vector(base, size)
        }
    }

    /// Build a variant, flattening nested variants and dropping duplicates. A single remaining
    /// alternative is returned as is.
    pub fn variant<I: IntoIterator<Item = Type>>(alternatives: I) -> Self {
        let mut flat: Vec<Type> = Vec::new();

        for alternative in alternatives {
            let nested = match alternative {
                Type::Variant { alternatives } => alternatives,
                other => vec![other],
            };

            for ty in nested {
                if !flat.contains(&ty) {
                    flat.push(ty);
                }
            }
        }

        match flat.len() {
            0 => Type::Error,
            1 => flat.remove(0),
            _ => Type::Variant { alternatives: flat },
        }
    }

    /// Variant of every numeric scalar and vector type.
    pub fn any_numeric() -> Self {
        Type::variant(
            ScalarBase::NUMERIC
                .into_iter()
                .flat_map(|base| (1..=4).map(move |size| Type::shaped(base, size))),
        )
    }

    /// Variant of every scalar and vector type, `bool` included.
    pub fn any_scalar_or_vector() -> Self {
        Type::variant(
            ScalarBase::ALL
                .into_iter()
                .flat_map(|base| (1..=4).map(move |size| Type::shaped(base, size))),
        )
    }

    /// Scalar base of a scalar, vector or matrix.
    pub fn base(&self) -> Option<ScalarBase> {
        match self {
            Type::Scalar { base } | Type::Vector { base, .. } | Type::Matrix { base, .. } => {
                Some(*base)
            }
            _ => None,
        }
    }

    /// Component count of a scalar (1) or vector.
    pub fn size(&self) -> Option<u8> {
        match self {
            Type::Scalar { .. } => Some(1),
            Type::Vector { size, .. } => Some(*size),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar { .. })
    }

    #[allow(missing_docs)]
    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector { .. })
    }

    /// Alternatives of a variant, or the type itself.
    pub fn alternatives(&self) -> &[Type] {
        match self {
            Type::Variant { alternatives } => alternatives,
            other => std::slice::from_ref(other),
        }
    }

    /// First alternative of a variant, or the type itself.
    pub fn first_alternative(&self) -> &Type {
        self.alternatives().first().unwrap_or(self)
    }

    /// Scalar type of the components of a vector or matrix.
    pub fn component_type(&self) -> Result<Type> {
        match self {
            Type::Scalar { .. } => Ok(self.clone()),
            Type::Vector { base, .. } | Type::Matrix { base, .. } => Ok(Type::scalar(*base)),
            other => Err(Error::UnsupportedConversion(format!(
                "`{other}` has no component type"
            ))),
        }
    }

    /// Check whether a `self` value can feed a `to` socket with implicit promotion.
    pub fn can_implicitly_convert(&self, to: &Type) -> bool {
        if self == to {
            return true;
        }

        match (self, to) {
            (Type::Variant { alternatives }, _) => alternatives
                .iter()
                .all(|alternative| alternative.can_implicitly_convert(to)),
            (_, Type::Variant { alternatives }) => alternatives
                .iter()
                .any(|alternative| self.can_implicitly_convert(alternative)),
            (Type::Scalar { base: from }, Type::Scalar { base: to }) => {
                from.can_implicitly_convert(*to)
            }
            (
                Type::Vector { base: from, size: from_size },
                Type::Vector { base: to, size: to_size },
            ) => from_size == to_size && from.can_implicitly_convert(*to),
            (
                Type::Matrix { base: from, rows: from_rows, cols: from_cols },
                Type::Matrix { base: to, rows: to_rows, cols: to_cols },
            ) => from_rows == to_rows && from_cols == to_cols && from.can_implicitly_convert(*to),
            _ => false,
        }
    }

    /// Check whether a `self` value can feed a `to` socket without any conversion.
    pub fn can_strictly_convert(&self, to: &Type) -> bool {
        if self == to {
            return true;
        }

        match to {
            Type::Variant { alternatives } => alternatives
                .iter()
                .any(|alternative| self.can_strictly_convert(alternative)),
            _ => false,
        }
    }

    /// Source expression of the zero value of the type.
    pub fn default_expression(&self) -> Result<String> {
        match self {
            Type::Scalar { base } => Ok(base.default_literal().to_owned()),
            Type::Vector { base, size } => Ok(format!(
                "{self}({})",
                vec![base.default_literal(); *size as usize].join(", ")
            )),
            Type::Matrix { base, rows, cols } => Ok(format!(
                "{self}({})",
                vec![base.default_literal(); *rows as usize * *cols as usize].join(", ")
            )),
            Type::Variant { alternatives } => alternatives
                .first()
                .ok_or_else(|| Error::UnsupportedConversion("empty variant".to_owned()))?
                .default_expression(),
            Type::Sampler2D | Type::Error => Err(Error::UnsupportedConversion(format!(
                "`{self}` has no default value"
            ))),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar { base } => f.write_str(base.glsl_name()),
            Type::Vector { base, size } => write!(f, "{}vec{size}", base.vector_prefix()),
            Type::Matrix { base, rows, cols } => {
                let prefix = if *base == ScalarBase::Double { "d" } else { "" };

                // Columns come first in matCxR.
                if rows == cols {
                    write!(f, "{prefix}mat{cols}")
                } else {
                    write!(f, "{prefix}mat{cols}x{rows}")
                }
            }
            Type::Variant { alternatives } => f.write_str(
                &alternatives
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" | "),
            ),
            Type::Sampler2D => f.write_str("sampler2D"),
            Type::Error => f.write_str("<error>"),
        }
    }
}

impl FromStr for Type {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unrecognized = || format!("Unrecognized type `{s}`.");

        if s == "sampler2D" {
            return Ok(Type::Sampler2D);
        }

        if let Some(base) = ScalarBase::ALL.into_iter().find(|base| base.glsl_name() == s) {
            return Ok(Type::scalar(base));
        }

        let dimension = |digit: &str| match digit.parse::<u8>() {
            Ok(size @ 2..=4) => Ok(size),
            _ => Err(unrecognized()),
        };

        for base in ScalarBase::ALL {
            if let Some(size) = s
                .strip_prefix(base.vector_prefix())
                .and_then(|rest| rest.strip_prefix("vec"))
            {
                return Ok(Type::vector(base, dimension(size)?));
            }
        }

        for base in [ScalarBase::Float, ScalarBase::Double] {
            let prefix = if base == ScalarBase::Double { "dmat" } else { "mat" };

            if let Some(dimensions) = s.strip_prefix(prefix) {
                return Ok(match dimensions.split_once('x') {
                    Some((cols, rows)) => Type::matrix(base, dimension(rows)?, dimension(cols)?),
                    None => {
                        let size = dimension(dimensions)?;
                        Type::matrix(base, size, size)
                    }
                });
            }
        }

        Err(unrecognized())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    fn constructible() -> Vec<Type> {
        let mut types = vec![Type::Sampler2D, Type::Error];
        for base in ScalarBase::ALL {
            types.push(Type::scalar(base));
            for size in 2..=4 {
                types.push(Type::vector(base, size));
            }
        }
        for base in [ScalarBase::Float, ScalarBase::Double] {
            for rows in 2..=4 {
                for cols in 2..=4 {
                    types.push(Type::matrix(base, rows, cols));
                }
            }
        }
        types.push(Type::variant([Type::FLOAT, Type::VEC3]));
        types
    }

    #[test]
    fn strict_conversion_is_reflexive() {
        for ty in constructible() {
            assert!(ty.can_strictly_convert(&ty), "{ty} should convert to itself");
        }
    }

    #[test]
    fn implicit_conversion_follows_promotion_order() {
        let int = Type::scalar(ScalarBase::Int);
        let uint = Type::scalar(ScalarBase::Uint);
        let double = Type::scalar(ScalarBase::Double);

        assert!(int.can_implicitly_convert(&Type::FLOAT));
        assert!(!Type::FLOAT.can_implicitly_convert(&int));
        assert!(int.can_implicitly_convert(&uint));
        assert!(uint.can_implicitly_convert(&double));
        assert!(!Type::BOOL.can_implicitly_convert(&Type::FLOAT));
        assert!(!int.can_implicitly_convert(&Type::BOOL));
        assert!(Type::BOOL.can_implicitly_convert(&Type::BOOL));
    }

    #[test]
    fn vectors_convert_at_equal_size_only() {
        let ivec3 = Type::vector(ScalarBase::Int, 3);

        assert!(ivec3.can_implicitly_convert(&Type::VEC3));
        assert!(!ivec3.can_implicitly_convert(&Type::VEC4));
        assert!(!Type::FLOAT.can_implicitly_convert(&Type::VEC3));
        assert!(!ivec3.can_strictly_convert(&Type::VEC3));
    }

    #[test]
    fn strict_conversion_into_variant() {
        let int = Type::scalar(ScalarBase::Int);
        let variant = Type::variant([int.clone(), Type::FLOAT]);

        assert!(Type::FLOAT.can_strictly_convert(&variant));
        assert!(int.can_strictly_convert(&variant));
        assert!(!Type::VEC2.can_strictly_convert(&variant));
        assert!(variant.can_strictly_convert(&variant.clone()));
        assert!(!variant.can_strictly_convert(&Type::FLOAT));
    }

    #[test]
    fn variants_are_flat_and_deduplicated() {
        let nested = Type::variant([
            Type::FLOAT,
            Type::variant([Type::VEC2, Type::FLOAT]),
            Type::VEC2,
        ]);

        assert_eq!(
            nested,
            Type::Variant {
                alternatives: vec![Type::FLOAT, Type::VEC2]
            }
        );
        assert_eq!(Type::variant([Type::FLOAT, Type::FLOAT]), Type::FLOAT);
    }

    #[test]
    fn component_type() {
        assert_eq!(Type::VEC3.component_type(), Ok(Type::FLOAT));
        assert_eq!(
            Type::matrix(ScalarBase::Double, 3, 3).component_type(),
            Ok(Type::scalar(ScalarBase::Double))
        );
        assert!(Type::variant([Type::FLOAT, Type::VEC2])
            .component_type()
            .is_err());
    }

    #[test]
    fn default_expressions() {
        assert_eq!(Type::FLOAT.default_expression().unwrap(), "0.0");
        assert_eq!(
            Type::scalar(ScalarBase::Uint).default_expression().unwrap(),
            "0u"
        );
        assert_eq!(Type::BOOL.default_expression().unwrap(), "false");
        assert_eq!(
            Type::vector(ScalarBase::Int, 2).default_expression().unwrap(),
            "ivec2(0, 0)"
        );
        assert_eq!(
            Type::matrix(ScalarBase::Float, 2, 2)
                .default_expression()
                .unwrap(),
            "mat2(0.0, 0.0, 0.0, 0.0)"
        );
        assert_eq!(
            Type::variant([Type::VEC3, Type::FLOAT])
                .default_expression()
                .unwrap(),
            "vec3(0.0, 0.0, 0.0)"
        );
        assert!(Type::Sampler2D.default_expression().is_err());
    }

    #[test]
    fn deserialization_checks_shapes() {
        let parse = |json: &str| serde_json::from_str::<Type>(json);

        assert_eq!(
            parse(r#"{"kind":"vector","base":"int","size":3}"#).unwrap(),
            Type::vector(ScalarBase::Int, 3)
        );
        assert!(parse(r#"{"kind":"vector","base":"float","size":9}"#).is_err());
        assert!(parse(r#"{"kind":"vector","base":"float","size":1}"#).is_err());
        assert!(parse(r#"{"kind":"matrix","base":"float","rows":16,"cols":16}"#).is_err());
        assert!(parse(r#"{"kind":"matrix","base":"int","rows":2,"cols":2}"#).is_err());
        assert_eq!(parse(r#"{"kind":"sampler2D"}"#).unwrap(), Type::Sampler2D);

        let nested = r#"{"kind":"variant","alternatives":[
            {"kind":"scalar","base":"float"},
            {"kind":"variant","alternatives":[
                {"kind":"vector","base":"float","size":2},
                {"kind":"scalar","base":"float"}
            ]}
        ]}"#;
        assert_eq!(
            parse(nested).unwrap(),
            Type::variant([Type::FLOAT, Type::VEC2])
        );
        assert!(parse(
            r#"{"kind":"variant","alternatives":[{"kind":"vector","base":"bool","size":5}]}"#
        )
        .is_err());

        for ty in constructible() {
            assert_eq!(parse(&serde_json::to_string(&ty).unwrap()).unwrap(), ty);
        }
    }

    #[test]
    fn large_matrices_have_a_default() {
        let default = Type::matrix(ScalarBase::Float, 16, 16)
            .default_expression()
            .unwrap();
        assert_eq!(default.matches("0.0").count(), 256);
    }

    #[test]
    fn names_round_trip() {
        for ty in constructible()
            .into_iter()
            .filter(|ty| !matches!(ty, Type::Variant { .. } | Type::Error))
        {
            assert_eq!(ty.to_string().parse::<Type>(), Ok(ty.clone()));
        }

        assert_eq!(Type::matrix(ScalarBase::Float, 3, 2).to_string(), "mat2x3");
        assert!("vec5".parse::<Type>().is_err());
        assert!("color".parse::<Type>().is_err());
    }
}
