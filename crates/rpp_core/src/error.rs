//! Error taxonomy shared by the parser, views and edit services.
//!
//! # Responsibility
//! - Name the structural, validation and reference failures precisely
//!   enough (field, node) for callers to report them.
//!
//! # Invariants
//! - Values are never clamped or coerced; out-of-range input is an error.
//! - File existence is never checked here.

use crate::model::guid::Guid;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Unbalanced nesting or a forbidden parent/child combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// A `>` with no open block.
    UnexpectedClose { line: usize },
    /// Input ended while a block was still open.
    UnclosedBlock { tag: String, line: usize },
    /// Input contains no root block.
    MissingRoot,
    /// A second top-level block after the root was closed.
    ContentAfterRoot { line: usize },
    /// A directive line outside of any block.
    DirectiveOutsideBlock { line: usize },
    /// Child tag may not be attached under this parent tag.
    ForbiddenNesting { parent: String, child: String },
    /// Children can only be attached to block nodes.
    ParentNotBlock { parent: String },
    /// No node at the given child-index path.
    InvalidPath { path: Vec<usize> },
    /// A track or item identifier is already in use, or was used before.
    DuplicateIdentifier { tag: String, id: Guid },
}

impl Display for StructuralError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedClose { line } => {
                write!(f, "unbalanced nesting: block close at line {line} has no open block")
            }
            Self::UnclosedBlock { tag, line } => write!(
                f,
                "unbalanced nesting: block `{tag}` opened at line {line} is never closed"
            ),
            Self::MissingRoot => write!(f, "document has no root block"),
            Self::ContentAfterRoot { line } => {
                write!(f, "unexpected block at line {line} after the root block")
            }
            Self::DirectiveOutsideBlock { line } => {
                write!(f, "directive at line {line} is outside of any block")
            }
            Self::ForbiddenNesting { parent, child } => {
                write!(f, "`{child}` may not be nested under `{parent}`")
            }
            Self::ParentNotBlock { parent } => {
                write!(f, "`{parent}` is a directive and cannot hold children")
            }
            Self::InvalidPath { path } => write!(f, "no node at path {path:?}"),
            Self::DuplicateIdentifier { tag, id } => {
                write!(f, "`{tag}` identifier {id} is already in use")
            }
        }
    }
}

impl Error for StructuralError {}

/// Out-of-range or malformed value on a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Node has a different tag than the view expects.
    TagMismatch { expected: &'static str, found: String },
    /// Required param or child directive is absent.
    MissingField { node: String, field: &'static str },
    /// Field exists but does not have the expected shape.
    MalformedField {
        node: String,
        field: &'static str,
        found: String,
    },
    /// Numeric field outside its allowed range.
    OutOfRange {
        node: String,
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    /// Text field that is empty or contains control characters.
    InvalidText {
        node: String,
        field: &'static str,
        reason: &'static str,
    },
    /// Stored source path is not well-formed.
    InvalidReference { node: String, error: ReferenceError },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TagMismatch { expected, found } => {
                write!(f, "expected `{expected}` node, found `{found}`")
            }
            Self::MissingField { node, field } => {
                write!(f, "{node}: required field `{field}` is missing")
            }
            Self::MalformedField { node, field, found } => {
                write!(f, "{node}: field `{field}` is malformed: `{found}`")
            }
            Self::OutOfRange {
                node,
                field,
                value,
                expected,
            } => write!(
                f,
                "{node}: field `{field}` value {value} is out of range (expected {expected})"
            ),
            Self::InvalidText {
                node,
                field,
                reason,
            } => write!(f, "{node}: field `{field}` {reason}"),
            Self::InvalidReference { node, error } => write!(f, "{node}: {error}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidReference { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Syntactically invalid source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Path is empty (or whitespace only).
    EmptyPath,
    /// Path contains a control character at byte `position`.
    ControlCharacter { path: String, position: usize },
}

impl Display for ReferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "source path must not be empty"),
            Self::ControlCharacter { path, position } => write!(
                f,
                "source path {path:?} contains a control character at byte {position}"
            ),
        }
    }
}

impl Error for ReferenceError {}

/// Checks that a source/render path is well-formed.
///
/// Only syntax is checked: non-empty and free of control characters.
pub fn validate_reference(path: &str) -> Result<(), ReferenceError> {
    if path.trim().is_empty() {
        return Err(ReferenceError::EmptyPath);
    }
    if let Some((position, _)) = path.char_indices().find(|(_, ch)| ch.is_control()) {
        return Err(ReferenceError::ControlCharacter {
            path: path.to_string(),
            position,
        });
    }
    Ok(())
}
