//! Track use-cases: add, look up, remove.
//!
//! # Invariants
//! - New tracks get a fresh identifier used for both header and `TRACKID`.
//! - Removing a track never frees its identifier.
//! - Name lookup is exact and skips tracks that fail validation.

use super::{attach_issued, EditError};
use crate::error::ValidationError;
use crate::model::document::Document;
use crate::model::guid::Guid;
use crate::model::node::Node;
use crate::model::value::Value;
use crate::syntax::parse_fragment;
use crate::view::track::NAME_FIELD;
use crate::view::{as_track, Track, TRACK_TAG};
use log::{info, warn};
use once_cell::sync::Lazy;

/// Directives written between `NAME` and `TRACKID` on new tracks.
static TRACK_HEAD_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment(
        "PEAKCOL 16576
BEAT -1
AUTOMODE 0
VOLPAN 1 0 -1 -1 1
REC 0 0 1 0 0 0 0 0
VU 2
NCHAN 2
FX 1
",
    )
    .expect("valid track head defaults")
});

/// Directives written after `TRACKID` on new tracks.
static TRACK_TAIL_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment("PERF 0\nMIDIOUT -1\nMAINSEND 1 0\n").expect("valid track tail defaults")
});

/// How to pick a track in [`find_track`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackQuery {
    /// First track whose `NAME` equals the text exactly.
    Name(String),
    /// Zero-based position among the root's `TRACK` children.
    Index(usize),
}

/// Appends a new track named `name` as the root's last child.
///
/// # Errors
/// - `Validation(InvalidText)` when `name` contains control characters.
/// - `IdentifierExhausted` when no unique identifier could be issued.
/// - `Structural` when the document root is not a project block.
pub fn add_track<'a>(doc: &'a mut Document, name: &str) -> Result<Track<'a>, EditError> {
    if name.chars().any(char::is_control) {
        warn!("event=track_add module=service status=error error_code=invalid_name");
        return Err(ValidationError::InvalidText {
            node: TRACK_TAG.to_string(),
            field: NAME_FIELD,
            reason: "must not contain control characters",
        }
        .into());
    }
    let id = doc.issue_identifier().ok_or(EditError::IdentifierExhausted)?;

    let mut track = Node::block(TRACK_TAG, [Value::Guid(id)]);
    track.push_child(Node::directive(NAME_FIELD, [Value::text(name)]));
    for directive in TRACK_HEAD_DEFAULTS.iter() {
        track.push_child(directive.clone());
    }
    track.push_child(Node::directive("TRACKID", [Value::Guid(id)]));
    for directive in TRACK_TAIL_DEFAULTS.iter() {
        track.push_child(directive.clone());
    }

    let index = attach_issued(doc, &[], track)?;
    info!("event=track_add module=service status=ok track_id={id} index={index}");
    Ok(as_track(&doc.root().children()[index])?)
}

/// Returns the first track named `name`, adding one when none exists.
pub fn ensure_track<'a>(doc: &'a mut Document, name: &str) -> Result<Track<'a>, EditError> {
    match position_of(doc, &TrackQuery::Name(name.to_string())) {
        Some(index) => Ok(as_track(&doc.root().children()[index])?),
        None => add_track(doc, name),
    }
}

/// Finds the first track matching `query` in document order.
pub fn find_track<'a>(doc: &'a Document, query: &TrackQuery) -> Option<Track<'a>> {
    let index = position_of(doc, query)?;
    as_track(&doc.root().children()[index]).ok()
}

/// Removes the track with identifier `track_id` and returns its node.
///
/// The identifier stays reserved, so it is never issued again.
///
/// # Errors
/// - `TrackNotFound` when no valid track carries `track_id`.
pub fn remove_track(doc: &mut Document, track_id: Guid) -> Result<Node, EditError> {
    let Some(index) = position_of_id(doc, track_id) else {
        warn!("event=track_remove module=service status=error track_id={track_id} error_code=track_not_found");
        return Err(EditError::TrackNotFound(track_id));
    };
    let removed = doc
        .root_mut()
        .remove_child(index)
        .ok_or(EditError::TrackNotFound(track_id))?;
    info!("event=track_remove module=service status=ok track_id={track_id}");
    Ok(removed)
}

/// Root child index of the track with identifier `track_id`.
pub(crate) fn position_of_id(doc: &Document, track_id: Guid) -> Option<usize> {
    doc.root().children().iter().position(|node| {
        as_track(node)
            .map(|track| track.id() == track_id)
            .unwrap_or(false)
    })
}

fn position_of(doc: &Document, query: &TrackQuery) -> Option<usize> {
    let children = doc.root().children();
    match query {
        TrackQuery::Name(name) => children.iter().position(|node| {
            as_track(node)
                .map(|track| track.name() == name.as_str())
                .unwrap_or(false)
        }),
        TrackQuery::Index(wanted) => children
            .iter()
            .enumerate()
            .filter(|(_, node)| node.has_tag(TRACK_TAG))
            .nth(*wanted)
            .map(|(index, _)| index),
    }
}

#[cfg(test)]
mod tests {
    use super::{add_track, ensure_track, find_track, remove_track, TrackQuery};
    use crate::model::document::Document;
    use crate::serialize::serialize;
    use crate::service::EditError;
    use crate::syntax::parse;

    #[test]
    fn add_track_writes_defaults_and_shared_identifier() {
        let mut doc = Document::empty();
        let track = add_track(&mut doc, "Drums").expect("track should be added");
        let id = track.id();
        assert_eq!(track.name(), "Drums");

        let node = track.node();
        let tags: Vec<&str> = node.children().iter().map(|child| child.tag()).collect();
        assert_eq!(tags[0], "NAME");
        assert_eq!(tags[tags.len() - 1], "MAINSEND");
        assert_eq!(node.child_value("TRACKID").and_then(|v| v.as_guid()), Some(id));
        assert!(doc.is_identifier_used(&id));

        let text = serialize(&doc);
        assert!(text.contains("  <TRACK {"));
        assert!(text.contains("    NAME \"Drums\""));
        assert!(text.contains("    PEAKCOL 16576"));
    }

    #[test]
    fn add_track_rejects_control_characters() {
        let mut doc = Document::empty();
        let err = add_track(&mut doc, "two\nlines").expect_err("newline must fail");
        assert!(matches!(err, EditError::Validation(_)));
        assert!(doc.root().children().is_empty());
    }

    #[test]
    fn find_track_by_name_and_index() {
        let mut doc = Document::empty();
        let bass = add_track(&mut doc, "Bass").expect("bass").id();
        let keys = add_track(&mut doc, "Keys").expect("keys").id();

        let found = find_track(&doc, &TrackQuery::Name("Keys".to_string()));
        assert_eq!(found.map(|track| track.id()), Some(keys));
        let found = find_track(&doc, &TrackQuery::Index(0));
        assert_eq!(found.map(|track| track.id()), Some(bass));
        assert!(find_track(&doc, &TrackQuery::Name("keys".to_string())).is_none());
        assert!(find_track(&doc, &TrackQuery::Index(2)).is_none());
    }

    #[test]
    fn index_counts_only_track_children() {
        let doc = parse(
            "<REAPER_PROJECT\n  TEMPO 120 4 4\n  <TRACK {0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9}\n    NAME A\n  >\n>\n",
        )
        .expect("project should parse");
        let track = find_track(&doc, &TrackQuery::Index(0)).expect("first track");
        assert_eq!(track.name(), "A");
    }

    #[test]
    fn ensure_track_reuses_existing_track() {
        let mut doc = Document::empty();
        let first = ensure_track(&mut doc, "Drums").expect("created").id();
        let second = ensure_track(&mut doc, "Drums").expect("reused").id();
        assert_eq!(first, second);
        assert_eq!(doc.root().children().len(), 1);
    }

    #[test]
    fn remove_track_keeps_identifier_reserved() {
        let mut doc = Document::empty();
        let id = add_track(&mut doc, "Temp").expect("track").id();
        let removed = remove_track(&mut doc, id).expect("track should be removed");
        assert_eq!(removed.tag(), "TRACK");
        assert!(doc.root().children().is_empty());
        assert!(doc.is_identifier_used(&id));
        assert_eq!(
            remove_track(&mut doc, id).expect_err("second removal must fail"),
            EditError::TrackNotFound(id)
        );
    }
}
