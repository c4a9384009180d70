//! Track view (`<TRACK {guid} ...>`).
//!
//! # Invariants
//! - A track always has an identifier: the first header param.

use super::item::{Item, ITEM_TAG};
use super::{child_param, display_text, expect_tag, node_label};
use crate::error::ValidationError;
use crate::model::guid::Guid;
use crate::model::node::Node;
use crate::serialize::param_text;
use std::borrow::Cow;

pub const TRACK_TAG: &str = "TRACK";
pub const NAME_FIELD: &str = "NAME";

/// Typed view over a `TRACK` block.
#[derive(Debug, Clone, Copy)]
pub struct Track<'a> {
    node: &'a Node,
    id: Guid,
}

impl<'a> Track<'a> {
    /// Validates `node` as a track.
    ///
    /// # Errors
    /// - `TagMismatch` when the tag is not `TRACK`.
    /// - `MissingField`/`MalformedField` when the header lacks an identifier.
    pub fn from_node(node: &'a Node) -> Result<Self, ValidationError> {
        expect_tag(node, TRACK_TAG)?;
        let param = node
            .params()
            .first()
            .ok_or_else(|| ValidationError::MissingField {
                node: node_label(node),
                field: "identifier",
            })?;
        let id = param
            .value()
            .as_guid()
            .ok_or_else(|| ValidationError::MalformedField {
                node: node_label(node),
                field: "identifier",
                found: param_text(param).into_owned(),
            })?;
        Ok(Self { node, id })
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn id(&self) -> Guid {
        self.id
    }

    /// Display name; empty when the track has no `NAME`.
    pub fn name(&self) -> Cow<'a, str> {
        child_param(self.node, NAME_FIELD)
            .map(display_text)
            .unwrap_or(Cow::Borrowed(""))
    }

    /// Items in document order, each validated on its own.
    pub fn items(&self) -> impl Iterator<Item = Result<Item<'a>, ValidationError>> + 'a {
        self.node.children_with_tag(ITEM_TAG).map(Item::from_node)
    }

    pub fn item_count(&self) -> usize {
        self.node.children_with_tag(ITEM_TAG).count()
    }
}

/// Validates `node` as a track.
pub fn as_track(node: &Node) -> Result<Track<'_>, ValidationError> {
    Track::from_node(node)
}
