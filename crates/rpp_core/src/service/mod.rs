//! Edit operations over a parsed document.
//!
//! # Responsibility
//! - Validate inputs before touching the tree.
//! - Enforce block nesting rules on every attach.
//! - Issue identifiers through the document so they stay unique.
//!
//! # Invariants
//! - A failed operation leaves the document unchanged.
//! - Only the nodes an operation targets are modified; siblings keep
//!   their verbatim source lines.

pub mod fx_service;
pub mod item_service;
pub mod project_service;
pub mod track_service;

pub use fx_service::ensure_synth;
pub use item_service::add_midi_item;
pub use project_service::{set_render_file, set_tempo, MAX_TEMPO_BPM, MIN_TEMPO_BPM};
pub use track_service::{add_track, ensure_track, find_track, remove_track, TrackQuery};

use crate::error::{ReferenceError, StructuralError, ValidationError};
use crate::model::document::{Document, PROJECT_TAG};
use crate::model::guid::Guid;
use crate::model::node::Node;
use crate::view::item::IGUID_FIELD;
use crate::view::{ITEM_TAG, SOURCE_TAG, TRACK_TAG};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from edit operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    /// Input value out of range or malformed.
    Validation(ValidationError),
    /// Attach would break nesting rules or targets a missing node.
    Structural(StructuralError),
    /// Source or render path is not well-formed.
    Reference(ReferenceError),
    /// No track carries the requested identifier.
    TrackNotFound(Guid),
    /// Every identifier attempt collided with one already in use.
    IdentifierExhausted,
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Structural(err) => write!(f, "{err}"),
            Self::Reference(err) => write!(f, "{err}"),
            Self::TrackNotFound(id) => write!(f, "track not found: {id}"),
            Self::IdentifierExhausted => {
                write!(f, "could not issue a unique identifier")
            }
        }
    }
}

impl Error for EditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Structural(err) => Some(err),
            Self::Reference(err) => Some(err),
            Self::TrackNotFound(_) | Self::IdentifierExhausted => None,
        }
    }
}

impl From<ValidationError> for EditError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StructuralError> for EditError {
    fn from(value: StructuralError) -> Self {
        Self::Structural(value)
    }
}

impl From<ReferenceError> for EditError {
    fn from(value: ReferenceError) -> Self {
        Self::Reference(value)
    }
}

/// Checks that `child` may be nested directly under `parent`.
///
/// - `TRACK` only under the project root;
/// - `ITEM` only under `TRACK`;
/// - `SOURCE` only under `ITEM` or another `SOURCE` (section sources);
/// - anything else under any block.
pub fn check_nesting(parent: &Node, child: &Node) -> Result<(), StructuralError> {
    if !parent.is_block() {
        return Err(StructuralError::ParentNotBlock {
            parent: parent.tag().to_string(),
        });
    }
    let allowed = if child.has_tag(TRACK_TAG) {
        parent.has_tag(PROJECT_TAG)
    } else if child.has_tag(ITEM_TAG) {
        parent.has_tag(TRACK_TAG)
    } else if child.has_tag(SOURCE_TAG) {
        parent.has_tag(ITEM_TAG) || parent.has_tag(SOURCE_TAG)
    } else {
        true
    };
    if allowed {
        Ok(())
    } else {
        Err(StructuralError::ForbiddenNesting {
            parent: parent.tag().to_string(),
            child: child.tag().to_string(),
        })
    }
}

/// Appends `node` as the last child of the node at `parent_path`.
///
/// Identifiers inside `node` are reserved in the document. Returns the
/// child index the node was attached at.
///
/// # Errors
/// - `StructuralError::InvalidPath` when no node exists at `parent_path`.
/// - `StructuralError::ParentNotBlock` / `ForbiddenNesting` per
///   [`check_nesting`].
/// - `StructuralError::DuplicateIdentifier` when a track or item in `node`
///   carries an identifier the document has already seen, including ids
///   of removed nodes, or one repeated inside `node` itself.
pub fn attach_child(
    doc: &mut Document,
    parent_path: &[usize],
    node: Node,
) -> Result<usize, EditError> {
    check_entity_identifiers(doc, &node)?;
    attach_issued(doc, parent_path, node)
}

/// Attach for nodes whose track and item identifiers this document issued.
pub(crate) fn attach_issued(
    doc: &mut Document,
    parent_path: &[usize],
    node: Node,
) -> Result<usize, EditError> {
    let parent = doc
        .node_at(parent_path)
        .ok_or_else(|| StructuralError::InvalidPath {
            path: parent_path.to_vec(),
        })?;
    check_nesting(parent, &node)?;

    let mut identifiers = Vec::new();
    node.walk(&mut |descendant| {
        identifiers.extend(descendant.params().iter().filter_map(|p| p.value().as_guid()));
    });
    for guid in identifiers {
        doc.reserve_identifier(guid);
    }

    let parent = doc
        .node_at_mut(parent_path)
        .ok_or_else(|| StructuralError::InvalidPath {
            path: parent_path.to_vec(),
        })?;
    parent.push_child(node);
    Ok(parent.children().len() - 1)
}

/// Track (`TRACK` param 0) and item (`IGUID`) identifiers must be fresh.
fn check_entity_identifiers(doc: &Document, node: &Node) -> Result<(), StructuralError> {
    let mut entities = Vec::new();
    node.walk(&mut |descendant| {
        let id = if descendant.has_tag(TRACK_TAG) {
            descendant.param(0).and_then(|value| value.as_guid())
        } else if descendant.has_tag(ITEM_TAG) {
            descendant
                .child_value(IGUID_FIELD)
                .and_then(|value| value.as_guid())
        } else {
            None
        };
        if let Some(id) = id {
            entities.push((descendant.tag().to_string(), id));
        }
    });

    let mut seen = HashSet::new();
    for (tag, id) in entities {
        if doc.is_identifier_used(&id) || !seen.insert(id) {
            return Err(StructuralError::DuplicateIdentifier { tag, id });
        }
    }
    Ok(())
}
