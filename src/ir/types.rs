//! Field types, modifiers and the validating constructors behind them.
//!
//! Every payload here is checked on construction: a `MaxLength` is never
//! zero, a `DecimalSpec` always has `1 <= precision <= 38` and
//! `scale <= precision`, and `EnumValues` is never empty and never repeats a
//! member. Deserialization goes through the same checks.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use smol_str::SmolStr;
use thiserror::Error;

use super::expr::Literal;
use crate::base::LineCol;
use crate::hir::codes;

/// Largest decimal precision accepted.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// A shape error found while building a typed record.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unknown type '{0}'")]
    UnknownType(SmolStr),
    #[error("type '{name}' expects {expected}, found {found} argument(s)")]
    TypeArity {
        name: SmolStr,
        expected: &'static str,
        found: usize,
    },
    #[error("str length must be a positive integer, found {0}")]
    InvalidLength(i64),
    #[error("decimal precision must be between 1 and 38, found {0}")]
    InvalidPrecision(i64),
    #[error("decimal scale must be between 0 and the precision {precision}, found {scale}")]
    InvalidScale { precision: i64, scale: i64 },
    #[error("enum must declare at least one value")]
    EmptyEnum,
    #[error("duplicate enum value '{0}'")]
    DuplicateEnumValue(SmolStr),
    #[error("unknown field modifier '{0}'")]
    UnknownModifier(SmolStr),
    #[error("duplicate modifier '{0}'")]
    DuplicateModifier(FieldModifier),
    #[error("'required' and 'optional' are mutually exclusive")]
    RequiredAndOptional,
    #[error("a 'pk' field cannot be 'optional'")]
    OptionalPrimaryKey,
    #[error("'{modifier}' is only allowed on datetime fields, found {ty}")]
    AutoTimestamp { modifier: FieldModifier, ty: String },
    #[error("default {value} is not a valid {ty} value")]
    InvalidDefault { value: String, ty: String },
    #[error("default string is longer than the maximum length {max}")]
    DefaultTooLong { max: u32 },
    #[error("default '{value}' is not one of the enum values")]
    UnknownEnumDefault { value: String },
    #[error("'{0}' is not a valid UUID")]
    InvalidUuid(String),
    #[error("ref fields cannot have a default value")]
    RefDefault,
    #[error("duplicate field '{0}'")]
    DuplicateField(SmolStr),
    #[error("constraint refers to undeclared field '{0}'")]
    UnknownConstraintField(SmolStr),
    #[error("key refers to undeclared field '{0}'")]
    UnknownKeyField(SmolStr),
    #[error("unknown surface mode '{0}'")]
    UnknownSurfaceMode(SmolStr),
    #[error("unknown display mode '{0}'")]
    UnknownDisplayMode(SmolStr),
    #[error("region limit must be positive, found {0}")]
    InvalidLimit(i64),
    #[error("duplicate region '{0}'")]
    DuplicateRegion(SmolStr),
    #[error("duplicate aggregate '{0}'")]
    DuplicateAggregate(SmolStr),
    #[error("unknown step kind '{0}'")]
    UnknownStepKind(SmolStr),
    #[error("duplicate step '{0}'")]
    DuplicateStep(SmolStr),
    #[error("unknown service property '{0}'")]
    UnknownServiceProperty(SmolStr),
    #[error("unknown foreign model constraint '{0}'")]
    UnknownForeignConstraint(SmolStr),
    #[error("duplicate meta key '{0}'")]
    DuplicateMetaKey(SmolStr),
}

impl BuildError {
    /// Diagnostic code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::DuplicateField(_)
            | BuildError::DuplicateRegion(_)
            | BuildError::DuplicateAggregate(_)
            | BuildError::DuplicateStep(_)
            | BuildError::DuplicateMetaKey(_)
            | BuildError::DuplicateEnumValue(_) => codes::DUPLICATE_DEFINITION,
            BuildError::UnknownConstraintField(_) | BuildError::UnknownKeyField(_) => {
                codes::INVALID_CONSTRAINT
            }
            BuildError::UnknownSurfaceMode(_)
            | BuildError::UnknownDisplayMode(_)
            | BuildError::InvalidLimit(_)
            | BuildError::UnknownStepKind(_)
            | BuildError::UnknownServiceProperty(_)
            | BuildError::UnknownForeignConstraint(_) => codes::INVALID_VALUE,
            _ => codes::TYPE_MISMATCH,
        }
    }
}

// ============================================================================
// TYPE PAYLOADS
// ============================================================================

/// Maximum length of a `str(N)` field. Never zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(transparent))]
pub struct MaxLength(NonZeroU32);

impl MaxLength {
    pub fn new(n: i64) -> Result<Self, BuildError> {
        u32::try_from(n)
            .ok()
            .and_then(NonZeroU32::new)
            .map(MaxLength)
            .ok_or(BuildError::InvalidLength(n))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Precision and scale of a `decimal(P,S)` field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(try_from = "RawDecimal", into = "RawDecimal"))]
pub struct DecimalSpec {
    precision: u8,
    scale: u8,
}

impl DecimalSpec {
    pub fn new(precision: i64, scale: i64) -> Result<Self, BuildError> {
        if !(1..=i64::from(MAX_DECIMAL_PRECISION)).contains(&precision) {
            return Err(BuildError::InvalidPrecision(precision));
        }
        if !(0..=precision).contains(&scale) {
            return Err(BuildError::InvalidScale { precision, scale });
        }
        Ok(Self {
            precision: precision as u8,
            scale: scale as u8,
        })
    }

    pub fn precision(self) -> u8 {
        self.precision
    }

    pub fn scale(self) -> u8 {
        self.scale
    }
}

#[cfg(feature = "interchange")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawDecimal {
    precision: i64,
    scale: i64,
}

#[cfg(feature = "interchange")]
impl TryFrom<RawDecimal> for DecimalSpec {
    type Error = BuildError;

    fn try_from(raw: RawDecimal) -> Result<Self, Self::Error> {
        DecimalSpec::new(raw.precision, raw.scale)
    }
}

#[cfg(feature = "interchange")]
impl From<DecimalSpec> for RawDecimal {
    fn from(spec: DecimalSpec) -> Self {
        RawDecimal {
            precision: spec.precision.into(),
            scale: spec.scale.into(),
        }
    }
}

/// Members of an `enum[...]` field: non-empty and distinct.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "interchange",
    serde(try_from = "Vec<SmolStr>", into = "Vec<SmolStr>")
)]
pub struct EnumValues(Vec<SmolStr>);

impl EnumValues {
    pub fn new(values: Vec<SmolStr>) -> Result<Self, BuildError> {
        if values.is_empty() {
            return Err(BuildError::EmptyEnum);
        }
        for (i, value) in values.iter().enumerate() {
            if values[..i].contains(value) {
                return Err(BuildError::DuplicateEnumValue(value.clone()));
            }
        }
        Ok(Self(values))
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<SmolStr>> for EnumValues {
    type Error = BuildError;

    fn try_from(values: Vec<SmolStr>) -> Result<Self, Self::Error> {
        EnumValues::new(values)
    }
}

impl From<EnumValues> for Vec<SmolStr> {
    fn from(values: EnumValues) -> Self {
        values.0
    }
}

// ============================================================================
// FIELD TYPE
// ============================================================================

/// The type of an entity field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case", tag = "kind"))]
pub enum FieldType {
    Str { max_length: MaxLength },
    Text,
    Int,
    Decimal { spec: DecimalSpec },
    Bool,
    Date,
    Datetime,
    Uuid,
    Email,
    Enum { values: EnumValues },
    /// Reference to an entity by name; resolved by the linker.
    Ref { target: SmolStr },
}

impl FieldType {
    /// Build a named type from its source spelling and integer arguments.
    pub fn from_parts(name: &str, args: &[i64]) -> Result<Self, BuildError> {
        let arity = |expected: &'static str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(BuildError::TypeArity {
                    name: name.into(),
                    expected,
                    found: args.len(),
                })
            }
        };

        let ty = match name {
            "str" => {
                arity("one length argument", args.len() == 1)?;
                FieldType::Str {
                    max_length: MaxLength::new(args[0])?,
                }
            }
            "decimal" => {
                arity("precision and scale", args.len() == 2)?;
                FieldType::Decimal {
                    spec: DecimalSpec::new(args[0], args[1])?,
                }
            }
            "text" | "int" | "bool" | "date" | "datetime" | "uuid" | "email" => {
                arity("no arguments", args.is_empty())?;
                match name {
                    "text" => FieldType::Text,
                    "int" => FieldType::Int,
                    "bool" => FieldType::Bool,
                    "date" => FieldType::Date,
                    "datetime" => FieldType::Datetime,
                    "uuid" => FieldType::Uuid,
                    _ => FieldType::Email,
                }
            }
            _ => return Err(BuildError::UnknownType(name.into())),
        };
        Ok(ty)
    }

    pub fn enumeration(values: Vec<SmolStr>) -> Result<Self, BuildError> {
        Ok(FieldType::Enum {
            values: EnumValues::new(values)?,
        })
    }

    /// Name of the referenced entity, for `ref` fields.
    pub fn ref_target(&self) -> Option<&str> {
        match self {
            FieldType::Ref { target } => Some(target),
            _ => None,
        }
    }

    fn check_default(&self, value: &Literal) -> Result<(), BuildError> {
        let mismatch = || BuildError::InvalidDefault {
            value: value.to_string(),
            ty: self.to_string(),
        };

        match (self, value) {
            (FieldType::Str { max_length }, Literal::Str(s)) => {
                if s.chars().count() > max_length.get() as usize {
                    return Err(BuildError::DefaultTooLong {
                        max: max_length.get(),
                    });
                }
                Ok(())
            }
            (FieldType::Text | FieldType::Email, Literal::Str(_)) => Ok(()),
            (FieldType::Int, Literal::Int(_)) => Ok(()),
            (FieldType::Decimal { .. }, Literal::Int(_) | Literal::Decimal(_)) => Ok(()),
            (FieldType::Bool, Literal::Bool(_)) => Ok(()),
            (FieldType::Date | FieldType::Datetime, Literal::Str(_)) => Ok(()),
            (FieldType::Date | FieldType::Datetime, Literal::Ident(word))
                if word == "now" || word == "today" =>
            {
                Ok(())
            }
            (FieldType::Uuid, Literal::Str(s)) => uuid::Uuid::parse_str(s)
                .map(|_| ())
                .map_err(|_| BuildError::InvalidUuid(s.clone())),
            (FieldType::Enum { values }, Literal::Ident(v)) => {
                if values.contains(v) {
                    Ok(())
                } else {
                    Err(BuildError::UnknownEnumDefault {
                        value: v.to_string(),
                    })
                }
            }
            (FieldType::Enum { values }, Literal::Str(v)) => {
                if values.contains(v) {
                    Ok(())
                } else {
                    Err(BuildError::UnknownEnumDefault { value: v.clone() })
                }
            }
            (FieldType::Ref { .. }, _) => Err(BuildError::RefDefault),
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Str { max_length } => write!(f, "str({})", max_length.get()),
            FieldType::Text => f.write_str("text"),
            FieldType::Int => f.write_str("int"),
            FieldType::Decimal { spec } => write!(f, "decimal({},{})", spec.precision, spec.scale),
            FieldType::Bool => f.write_str("bool"),
            FieldType::Date => f.write_str("date"),
            FieldType::Datetime => f.write_str("datetime"),
            FieldType::Uuid => f.write_str("uuid"),
            FieldType::Email => f.write_str("email"),
            FieldType::Enum { values } => {
                f.write_str("enum[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    f.write_str(v)?;
                }
                f.write_str("]")
            }
            FieldType::Ref { target } => write!(f, "ref {target}"),
        }
    }
}

// ============================================================================
// MODIFIERS
// ============================================================================

/// A field modifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum FieldModifier {
    Required,
    Optional,
    Pk,
    Unique,
    /// `unique?`: unique when present, nullable.
    UniqueNullable,
    AutoAdd,
    AutoUpdate,
}

impl FieldModifier {
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldModifier::Required => "required",
            FieldModifier::Optional => "optional",
            FieldModifier::Pk => "pk",
            FieldModifier::Unique => "unique",
            FieldModifier::UniqueNullable => "unique?",
            FieldModifier::AutoAdd => "auto_add",
            FieldModifier::AutoUpdate => "auto_update",
        }
    }
}

impl FromStr for FieldModifier {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "required" => FieldModifier::Required,
            "optional" => FieldModifier::Optional,
            "pk" => FieldModifier::Pk,
            "unique" => FieldModifier::Unique,
            "unique?" => FieldModifier::UniqueNullable,
            "auto_add" => FieldModifier::AutoAdd,
            "auto_update" => FieldModifier::AutoUpdate,
            other => return Err(BuildError::UnknownModifier(other.into())),
        })
    }
}

impl fmt::Display for FieldModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FIELD SPEC
// ============================================================================

/// A validated entity field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "interchange",
    serde(try_from = "RawFieldSpec", into = "RawFieldSpec")
)]
pub struct FieldSpec {
    pub name: SmolStr,
    pub ty: FieldType,
    pub modifiers: Vec<FieldModifier>,
    pub default: Option<Literal>,
    pub pos: LineCol,
}

impl FieldSpec {
    /// Build a field, checking modifiers and default against the type.
    pub fn new(
        name: impl Into<SmolStr>,
        ty: FieldType,
        modifiers: Vec<FieldModifier>,
        default: Option<Literal>,
        pos: LineCol,
    ) -> Result<Self, BuildError> {
        for (i, m) in modifiers.iter().enumerate() {
            if modifiers[..i].contains(m) {
                return Err(BuildError::DuplicateModifier(*m));
            }
        }

        let has = |m: FieldModifier| modifiers.contains(&m);
        if has(FieldModifier::Required) && has(FieldModifier::Optional) {
            return Err(BuildError::RequiredAndOptional);
        }
        if has(FieldModifier::Pk) && has(FieldModifier::Optional) {
            return Err(BuildError::OptionalPrimaryKey);
        }
        for modifier in [FieldModifier::AutoAdd, FieldModifier::AutoUpdate] {
            if has(modifier) && ty != FieldType::Datetime {
                return Err(BuildError::AutoTimestamp {
                    modifier,
                    ty: ty.to_string(),
                });
            }
        }
        if let Some(value) = &default {
            ty.check_default(value)?;
        }

        Ok(Self {
            name: name.into(),
            ty,
            modifiers,
            default,
            pos,
        })
    }

    pub fn has_modifier(&self, modifier: FieldModifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_pk(&self) -> bool {
        self.has_modifier(FieldModifier::Pk)
    }
}

#[cfg(feature = "interchange")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawFieldSpec {
    name: SmolStr,
    ty: FieldType,
    modifiers: Vec<FieldModifier>,
    default: Option<Literal>,
    pos: LineCol,
}

#[cfg(feature = "interchange")]
impl TryFrom<RawFieldSpec> for FieldSpec {
    type Error = BuildError;

    fn try_from(raw: RawFieldSpec) -> Result<Self, Self::Error> {
        FieldSpec::new(raw.name, raw.ty, raw.modifiers, raw.default, raw.pos)
    }
}

#[cfg(feature = "interchange")]
impl From<FieldSpec> for RawFieldSpec {
    fn from(field: FieldSpec) -> Self {
        RawFieldSpec {
            name: field.name,
            ty: field.ty,
            modifiers: field.modifiers,
            default: field.default,
            pos: field.pos,
        }
    }
}
