//! Media item view (`<ITEM ...>`).
//!
//! # Invariants
//! - `POSITION` and `LENGTH` are present, finite and `>= 0`.
//! - Exactly one `SOURCE` child.

use super::source::{Source, SOURCE_TAG};
use super::{child_param, display_text, expect_tag, node_label, non_negative_field, optional_flag};
use crate::error::ValidationError;
use crate::model::guid::Guid;
use crate::model::node::Node;
use crate::serialize::param_text;
use std::borrow::Cow;

pub const ITEM_TAG: &str = "ITEM";
pub const POSITION_FIELD: &str = "POSITION";
pub const LENGTH_FIELD: &str = "LENGTH";
pub const LOOP_FIELD: &str = "LOOP";
/// Item identifier directive.
pub const IGUID_FIELD: &str = "IGUID";

/// Typed view over an `ITEM` block.
#[derive(Debug, Clone)]
pub struct Item<'a> {
    node: &'a Node,
    id: Option<Guid>,
    position: f64,
    length: f64,
    looped: bool,
    source: Source<'a>,
}

impl<'a> Item<'a> {
    /// Validates `node` as an item.
    ///
    /// # Errors
    /// - `TagMismatch` when the tag is not `ITEM`.
    /// - `MissingField`/`MalformedField`/`OutOfRange` for bad position or length.
    /// - `MalformedField` for a non-identifier `IGUID` or a `LOOP` other than 0/1.
    /// - `MissingField`/`MalformedField` unless exactly one `SOURCE` child exists.
    pub fn from_node(node: &'a Node) -> Result<Self, ValidationError> {
        expect_tag(node, ITEM_TAG)?;
        let position = non_negative_field(node, POSITION_FIELD)?;
        let length = non_negative_field(node, LENGTH_FIELD)?;
        let looped = optional_flag(node, LOOP_FIELD)?.unwrap_or(false);

        let id = match child_param(node, IGUID_FIELD) {
            None => None,
            Some(param) => Some(param.value().as_guid().ok_or_else(|| {
                ValidationError::MalformedField {
                    node: node_label(node),
                    field: IGUID_FIELD,
                    found: param_text(param).into_owned(),
                }
            })?),
        };

        let mut sources = node.children_with_tag(SOURCE_TAG);
        let source_node = sources.next().ok_or_else(|| ValidationError::MissingField {
            node: node_label(node),
            field: SOURCE_TAG,
        })?;
        let extra = sources.count();
        if extra > 0 {
            return Err(ValidationError::MalformedField {
                node: node_label(node),
                field: SOURCE_TAG,
                found: format!("{} source blocks", extra + 1),
            });
        }
        let source = Source::from_node(source_node)?;

        Ok(Self {
            node,
            id,
            position,
            length,
            looped,
            source,
        })
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Item identifier (`IGUID`); always present on items this crate creates.
    pub fn id(&self) -> Option<Guid> {
        self.id
    }

    /// Start time, in project time units.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Exclusive end of the item span.
    pub fn end(&self) -> f64 {
        self.position + self.length
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn name(&self) -> Option<Cow<'a, str>> {
        child_param(self.node, "NAME").map(display_text)
    }

    pub fn source(&self) -> &Source<'a> {
        &self.source
    }
}

/// Validates `node` as an item.
pub fn as_item(node: &Node) -> Result<Item<'_>, ValidationError> {
    Item::from_node(node)
}
