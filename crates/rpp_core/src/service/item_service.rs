//! Media item use-cases.
//!
//! # Invariants
//! - Start must be finite and `>= 0`; length finite and `> 0`.
//! - `IID` is one more than the largest `IID` in the document.
//! - The referenced file is never opened; only the path syntax is checked.

use super::track_service::position_of_id;
use super::{attach_issued, EditError};
use crate::error::{validate_reference, ValidationError};
use crate::model::document::Document;
use crate::model::guid::Guid;
use crate::model::node::Node;
use crate::model::value::Value;
use crate::syntax::parse_fragment;
use crate::view::item::{IGUID_FIELD, LENGTH_FIELD, POSITION_FIELD};
use crate::view::source::FILE_FIELD;
use crate::view::{as_item, Item, ITEM_TAG};
use log::{info, warn};
use once_cell::sync::Lazy;

/// Directives written between `LENGTH` and `IGUID` on new items.
static ITEM_HEAD_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment(
        "LOOP 1
ALLTAKES 0
FADEIN 1 0.01 0 1 0 0 0
FADEOUT 1 0.01 0 1 0 0 0
MUTE 0 0
SEL 0
",
    )
    .expect("valid item head defaults")
});

/// Directives written between `NAME` and `GUID` on new items.
static ITEM_TAIL_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment("VOLPAN 1 0 1 -1\nPLAYRATE 1 1 0 -1 0 0.0025\nCHANMODE 0\n")
        .expect("valid item tail defaults")
});

/// MIDI source block without its `FILE` line.
static MIDI_SOURCE: Lazy<Node> = Lazy::new(|| {
    parse_fragment("<SOURCE MIDI\n  HASDATA 1 960 QN\n>\n")
        .ok()
        .and_then(|nodes| nodes.into_iter().next())
        .expect("valid midi source")
});

/// Appends a MIDI item referencing `path` to the track `track_id`.
///
/// The item loops, spans `[start, start + length)` and is named after the
/// file stem.
///
/// # Errors
/// - `Validation(OutOfRange)` for a negative/non-finite start or a
///   non-positive/non-finite length.
/// - `Reference` when `path` is empty or contains control characters.
/// - `TrackNotFound` when no track carries `track_id`.
/// - `IdentifierExhausted` when no unique identifier could be issued.
pub fn add_midi_item<'a>(
    doc: &'a mut Document,
    track_id: Guid,
    path: &str,
    start: f64,
    length: f64,
) -> Result<Item<'a>, EditError> {
    if let Err(err) = check_span(start, length) {
        warn!("event=item_add module=service status=error track_id={track_id} error_code=invalid_span");
        return Err(err.into());
    }
    if let Err(err) = validate_reference(path) {
        warn!("event=item_add module=service status=error track_id={track_id} error_code=invalid_path");
        return Err(err.into());
    }
    let Some(track_index) = position_of_id(doc, track_id) else {
        warn!("event=item_add module=service status=error track_id={track_id} error_code=track_not_found");
        return Err(EditError::TrackNotFound(track_id));
    };

    let item_id = doc.issue_identifier().ok_or(EditError::IdentifierExhausted)?;
    let take_id = doc.issue_identifier().ok_or(EditError::IdentifierExhausted)?;
    let next_iid = max_item_number(doc) + 1;

    let mut item = Node::block(ITEM_TAG, []);
    item.push_child(Node::directive(POSITION_FIELD, [Value::Float(start)]));
    item.push_child(Node::directive("SNAPOFFS", [Value::Int(0)]));
    item.push_child(Node::directive(LENGTH_FIELD, [Value::Float(length)]));
    for directive in ITEM_HEAD_DEFAULTS.iter() {
        item.push_child(directive.clone());
    }
    item.push_child(Node::directive(IGUID_FIELD, [Value::Guid(item_id)]));
    item.push_child(Node::directive("IID", [Value::Int(next_iid)]));
    item.push_child(Node::directive("NAME", [Value::text(file_stem(path))]));
    for directive in ITEM_TAIL_DEFAULTS.iter() {
        item.push_child(directive.clone());
    }
    item.push_child(Node::directive("GUID", [Value::Guid(take_id)]));
    let mut source = MIDI_SOURCE.clone();
    source.push_child(Node::directive(FILE_FIELD, [Value::text(path)]));
    item.push_child(source);

    let index = attach_issued(doc, &[track_index], item)?;
    info!(
        "event=item_add module=service status=ok track_id={track_id} item_id={item_id} iid={next_iid}"
    );
    Ok(as_item(&doc.root().children()[track_index].children()[index])?)
}

fn check_span(start: f64, length: f64) -> Result<(), ValidationError> {
    if !(start.is_finite() && start >= 0.0) {
        return Err(ValidationError::OutOfRange {
            node: ITEM_TAG.to_string(),
            field: POSITION_FIELD,
            value: start,
            expected: "finite and >= 0",
        });
    }
    if !(length.is_finite() && length > 0.0) {
        return Err(ValidationError::OutOfRange {
            node: ITEM_TAG.to_string(),
            field: LENGTH_FIELD,
            value: length,
            expected: "finite and > 0",
        });
    }
    Ok(())
}

/// Largest item number (`IID`) anywhere in the document, or 0.
fn max_item_number(doc: &Document) -> i64 {
    let mut max = 0;
    doc.root().walk(&mut |node| {
        if node.has_tag(ITEM_TAG) {
            if let Some(iid) = node.child_value("IID").and_then(Value::as_i64) {
                max = max.max(iid);
            }
        }
    });
    max
}

/// File name without directories or the last extension.
fn file_stem(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::{add_midi_item, file_stem};
    use crate::error::{ReferenceError, ValidationError};
    use crate::model::document::Document;
    use crate::model::guid::Guid;
    use crate::serialize::serialize;
    use crate::service::{add_track, EditError};

    #[test]
    fn adds_looping_midi_item_with_file_reference() {
        let mut doc = Document::empty();
        let track_id = add_track(&mut doc, "Drums").expect("track").id();
        let item = add_midi_item(&mut doc, track_id, "midi/drums.mid", 0.0, 8.0)
            .expect("item should be added");

        assert_eq!(item.position(), 0.0);
        assert_eq!(item.length(), 8.0);
        assert!(item.is_looped());
        assert_eq!(item.name().as_deref(), Some("drums"));
        assert_eq!(item.source().file_path(), Some("midi/drums.mid"));
        assert!(item.source().is_midi());
        let item_id = item.id().expect("new items carry an identifier");
        assert!(doc.is_identifier_used(&item_id));

        let text = serialize(&doc);
        assert!(text.contains("    <ITEM\n      POSITION 0\n      SNAPOFFS 0\n      LENGTH 8\n"));
        assert!(text.contains("      IID 1\n"));
        assert!(text.contains("        FILE \"midi/drums.mid\"\n"));
    }

    #[test]
    fn item_numbers_increase_across_tracks() {
        let mut doc = Document::empty();
        let a = add_track(&mut doc, "A").expect("a").id();
        let b = add_track(&mut doc, "B").expect("b").id();
        add_midi_item(&mut doc, a, "a.mid", 0.0, 1.0).expect("first item");
        let second = add_midi_item(&mut doc, b, "b.mid", 1.0, 1.0).expect("second item");
        assert_eq!(second.node().child_value("IID").and_then(|v| v.as_i64()), Some(2));
    }

    #[test]
    fn rejects_bad_span_path_and_track() {
        let mut doc = Document::empty();
        let track_id = add_track(&mut doc, "Drums").expect("track").id();

        let err = add_midi_item(&mut doc, track_id, "a.mid", -1.0, 1.0).expect_err("negative start");
        assert!(matches!(
            err,
            EditError::Validation(ValidationError::OutOfRange { field: "POSITION", .. })
        ));
        for length in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let err = add_midi_item(&mut doc, track_id, "a.mid", 0.0, length)
                .expect_err("bad length must fail");
            assert!(matches!(
                err,
                EditError::Validation(ValidationError::OutOfRange { field: "LENGTH", .. })
            ));
        }
        assert_eq!(
            add_midi_item(&mut doc, track_id, "", 0.0, 1.0).expect_err("empty path"),
            EditError::Reference(ReferenceError::EmptyPath)
        );

        let missing = Guid::new_v4();
        assert_eq!(
            add_midi_item(&mut doc, missing, "a.mid", 0.0, 1.0).expect_err("unknown track"),
            EditError::TrackNotFound(missing)
        );
        let track = &doc.root().children()[0];
        assert_eq!(track.children_with_tag("ITEM").count(), 0);
    }

    #[test]
    fn file_stem_strips_directories_and_extension() {
        assert_eq!(file_stem("midi/drums.mid"), "drums");
        assert_eq!(file_stem(r"C:\loops\bass.line.mid"), "bass.line");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(file_stem("noext"), "noext");
    }
}
