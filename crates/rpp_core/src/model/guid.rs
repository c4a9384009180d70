//! Brace-delimited project identifiers.
//!
//! # Responsibility
//! - Recognize `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` tokens.
//! - Generate fresh identifiers for created tracks and items.
//!
//! # Invariants
//! - Only the canonical 8-4-4-4-12 hex grouping inside braces is accepted.
//! - Generated identifiers render upper-case, as REAPER writes them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static BRACED_GUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\{([0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12})\}$",
    )
    .expect("valid guid regex")
});

/// Globally unique identifier attached to tracks, items and takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(Uuid);

impl Guid {
    /// Creates a random (v4) identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses a brace-delimited identifier token.
    ///
    /// Returns `None` for anything that is not exactly `{8-4-4-4-12}` hex,
    /// so such tokens stay barewords.
    pub fn parse_braced(text: &str) -> Option<Self> {
        let captures = BRACED_GUID_RE.captures(text)?;
        let inner = captures.get(1)?.as_str();
        Uuid::try_parse(inner).ok().map(Self)
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{:X}}}", self.0.hyphenated())
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::Guid;

    #[test]
    fn parse_braced_accepts_canonical_grouping_in_any_case() {
        let upper = Guid::parse_braced("{0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9}")
            .expect("upper-case guid should parse");
        let lower = Guid::parse_braced("{0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9}")
            .expect("lower-case guid should parse");
        assert_eq!(upper, lower);
    }

    #[test]
    fn parse_braced_rejects_other_shapes() {
        assert!(Guid::parse_braced("0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9").is_none());
        assert!(Guid::parse_braced("{0A1B2C3D4E5F60718293A4B5C6D7E8F9}").is_none());
        assert!(Guid::parse_braced("{not-a-guid}").is_none());
        assert!(Guid::parse_braced("{0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F}").is_none());
    }

    #[test]
    fn display_renders_braced_upper_case() {
        let guid = Guid::parse_braced("{0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9}")
            .expect("guid should parse");
        assert_eq!(guid.to_string(), "{0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9}");
        assert_eq!(Guid::parse_braced(&guid.to_string()), Some(guid));
    }
}
