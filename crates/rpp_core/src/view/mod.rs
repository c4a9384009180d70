//! Typed read-only projections over generic nodes.
//!
//! # Responsibility
//! - Recognize tracks, items, sources and the project root by tag.
//! - Validate and expose the fields callers need without re-deriving them.
//!
//! # Invariants
//! - Views never mutate; they borrow the document and expire with the borrow.
//! - A view only exists for a node whose required fields validated.

pub mod item;
pub mod project;
pub mod source;
pub mod track;

pub use item::{as_item, Item, ITEM_TAG};
pub use project::{ItemSummary, Project, ProjectSummary, Tempo, TrackSummary};
pub use source::{as_source, Source, SourceKind, SOURCE_TAG};
pub use track::{as_track, Track, TRACK_TAG};

use crate::error::ValidationError;
use crate::model::node::Node;
use crate::model::value::{Param, Value};
use crate::serialize::param_text;
use std::borrow::Cow;

/// Human-readable node label for diagnostics, e.g. `TRACK {…}`.
pub(crate) fn node_label(node: &Node) -> String {
    match node.param(0) {
        Some(Value::Guid(guid)) => format!("{} {}", node.tag(), guid),
        _ => node.tag().to_string(),
    }
}

pub(crate) fn expect_tag(node: &Node, expected: &'static str) -> Result<(), ValidationError> {
    if node.has_tag(expected) {
        Ok(())
    } else {
        Err(ValidationError::TagMismatch {
            expected,
            found: node.tag().to_string(),
        })
    }
}

/// Reads `field` (first param of a child directive) as a number `>= 0`.
pub(crate) fn non_negative_field(node: &Node, field: &'static str) -> Result<f64, ValidationError> {
    let param = child_param(node, field).ok_or_else(|| ValidationError::MissingField {
        node: node_label(node),
        field,
    })?;
    let value = param
        .value()
        .as_f64()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::MalformedField {
            node: node_label(node),
            field,
            found: param_text(param).into_owned(),
        })?;
    if value < 0.0 {
        return Err(ValidationError::OutOfRange {
            node: node_label(node),
            field,
            value,
            expected: ">= 0",
        });
    }
    Ok(value)
}

/// Reads an optional `0`/`1` flag; other values are malformed.
pub(crate) fn optional_flag(node: &Node, field: &'static str) -> Result<Option<bool>, ValidationError> {
    let Some(param) = child_param(node, field) else {
        return Ok(None);
    };
    match param.value().as_i64() {
        Some(0) => Ok(Some(false)),
        Some(1) => Ok(Some(true)),
        _ => Err(ValidationError::MalformedField {
            node: node_label(node),
            field,
            found: param_text(param).into_owned(),
        }),
    }
}

/// First param of the first child directive named `field`.
pub(crate) fn child_param<'a>(node: &'a Node, field: &str) -> Option<&'a Param> {
    node.find_child(field).and_then(|child| child.params().first())
}

/// Text of a param as the user sees it: string content, or written text.
pub(crate) fn display_text(param: &Param) -> Cow<'_, str> {
    match param.value() {
        Value::Str(text) | Value::Bare(text) => Cow::Borrowed(text.as_str()),
        _ => param_text(param),
    }
}
