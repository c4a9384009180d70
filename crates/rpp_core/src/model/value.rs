//! Typed parameter values.
//!
//! # Responsibility
//! - Represent every parameter shape the project grammar produces.
//! - Keep the written source text next to parsed values.
//!
//! # Invariants
//! - A `Param` with retained source text serializes to exactly that text.
//! - Numeric equality ignores the integer/float distinction (`85 == 85.0`).

use super::guid::Guid;

/// A single parameter value on a node line.
#[derive(Debug, Clone)]
pub enum Value {
    /// Signed integer literal.
    Int(i64),
    /// Unsigned integer literal too large for `i64`.
    UInt(u64),
    /// Decimal or exponent literal.
    Float(f64),
    /// Quoted string, stored unquoted and unescaped.
    Str(String),
    /// Any other token, stored as written.
    Bare(String),
    /// Brace-delimited identifier.
    Guid(Guid),
}

impl Value {
    /// Quoted string value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Bareword value.
    pub fn bare(value: impl Into<String>) -> Self {
        Self::Bare(value.into())
    }

    /// Returns the numeric value for integer and float parameters.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::UInt(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer value when the parameter is an integer literal.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Returns string content for quoted and bareword parameters.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str(value) | Self::Bare(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the identifier for brace-delimited parameters.
    pub fn as_guid(&self) -> Option<Guid> {
        match self {
            Self::Guid(guid) => Some(*guid),
            _ => None,
        }
    }

    /// Short kind label used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) | Self::UInt(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bare(_) => "bareword",
            Self::Guid(_) => "identifier",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_) | Self::Float(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bare(a), Self::Bare(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Guid> for Value {
    fn from(value: Guid) -> Self {
        Self::Guid(value)
    }
}

/// A node parameter: typed value plus the text it was parsed from.
#[derive(Debug, Clone)]
pub struct Param {
    value: Value,
    source: Option<String>,
}

impl Param {
    /// Creates a parameter with no source text; it serializes canonically.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            source: None,
        }
    }

    pub(crate) fn parsed(value: Value, source: String) -> Self {
        Self {
            value,
            source: Some(source),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Original token text, present only while the parameter is untouched.
    pub fn source_text(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Whether this parameter still carries its parsed source text.
    pub fn is_pristine(&self) -> bool {
        self.source.is_some()
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
