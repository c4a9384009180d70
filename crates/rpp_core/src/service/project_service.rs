//! Project header use-cases: tempo and render target.
//!
//! # Invariants
//! - Tempo stays within `MIN_TEMPO_BPM..=MAX_TEMPO_BPM`; nothing is clamped.
//! - An existing directive is updated in place; its other params keep
//!   their written text.
//! - A missing directive is inserted before the first block child of the
//!   root, so header directives stay ahead of tracks.

use super::EditError;
use crate::error::{validate_reference, ValidationError};
use crate::model::document::{Document, PROJECT_TAG};
use crate::model::node::Node;
use crate::model::value::Value;
use crate::view::project::{DEFAULT_TIME_SIGNATURE, RENDER_FILE_FIELD, TEMPO_FIELD};
use log::{info, warn};

pub const MIN_TEMPO_BPM: f64 = 20.0;
pub const MAX_TEMPO_BPM: f64 = 960.0;

/// Sets the project tempo, keeping the time signature.
///
/// # Errors
/// - `Validation(OutOfRange)` when `bpm` is not finite or outside
///   `MIN_TEMPO_BPM..=MAX_TEMPO_BPM`.
pub fn set_tempo(doc: &mut Document, bpm: f64) -> Result<(), EditError> {
    if let Err(err) = check_tempo(bpm) {
        warn!("event=tempo_set module=service status=error bpm={bpm} error_code=out_of_range");
        return Err(err.into());
    }

    let (numerator, denominator) = DEFAULT_TIME_SIGNATURE;
    upsert_header(
        doc,
        TEMPO_FIELD,
        Value::Float(bpm),
        [
            Value::Int(i64::from(numerator)),
            Value::Int(i64::from(denominator)),
        ],
    );
    info!("event=tempo_set module=service status=ok bpm={bpm}");
    Ok(())
}

/// Sets the render output name (`RENDER_FILE`).
///
/// # Errors
/// - `Reference` when `name` is empty or contains control characters.
pub fn set_render_file(doc: &mut Document, name: &str) -> Result<(), EditError> {
    if let Err(err) = validate_reference(name) {
        warn!("event=render_file_set module=service status=error error_code=invalid_path");
        return Err(err.into());
    }
    upsert_header(doc, RENDER_FILE_FIELD, Value::text(name), []);
    info!("event=render_file_set module=service status=ok");
    Ok(())
}

pub(crate) fn check_tempo(bpm: f64) -> Result<(), ValidationError> {
    if bpm.is_finite() && (MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&bpm) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            node: PROJECT_TAG.to_string(),
            field: TEMPO_FIELD,
            value: bpm,
            expected: "20..=960",
        })
    }
}

/// Replaces param 0 of the root directive `tag`, or inserts
/// `tag value rest...` when the directive is absent.
fn upsert_header<const N: usize>(doc: &mut Document, tag: &str, value: Value, rest: [Value; N]) {
    let root = doc.root_mut();
    if let Some(directive) = root.find_child_mut(tag) {
        if directive.params().is_empty() {
            directive.push_param(value);
        } else {
            directive.replace_param(0, value);
        }
        return;
    }

    let position = root
        .children()
        .iter()
        .position(Node::is_block)
        .unwrap_or(root.children().len());
    let params = std::iter::once(value).chain(rest);
    root.insert_child(position, Node::directive(tag, params));
}

#[cfg(test)]
mod tests {
    use super::{set_render_file, set_tempo};
    use crate::error::{ReferenceError, ValidationError};
    use crate::model::document::Document;
    use crate::serialize::serialize;
    use crate::service::{add_track, EditError};
    use crate::syntax::parse;
    use crate::view::Project;

    #[test]
    fn tempo_bounds_are_inclusive() {
        let mut doc = Document::empty();
        for bpm in [20.0, 960.0, 85.0] {
            set_tempo(&mut doc, bpm).expect("in-range tempo should be accepted");
        }
        for bpm in [19.0, 961.0, 19.999, f64::NAN, f64::INFINITY] {
            let err = set_tempo(&mut doc, bpm).expect_err("out-of-range tempo must fail");
            assert!(matches!(
                err,
                EditError::Validation(ValidationError::OutOfRange { field: "TEMPO", .. })
            ));
        }
        let tempo = Project::new(&doc)
            .tempo()
            .expect("tempo should validate")
            .expect("tempo should exist");
        assert_eq!(tempo.bpm, 85.0);
    }

    #[test]
    fn updates_tempo_in_place_keeping_signature_text() {
        let source = "<REAPER_PROJECT 0.1\n  SAMPLERATE 44100 0 0\n  TEMPO 120.000 7 8\n  <TRACK {0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9}\n  >\n>\n";
        let mut doc = parse(source).expect("project should parse");
        set_tempo(&mut doc, 85.0).expect("tempo should be set");
        assert_eq!(
            serialize(&doc),
            source.replace("TEMPO 120.000 7 8", "TEMPO 85 7 8")
        );
    }

    #[test]
    fn inserts_tempo_before_first_block_when_absent() {
        let mut doc = Document::empty();
        add_track(&mut doc, "Keys").expect("track");
        set_tempo(&mut doc, 100.0).expect("tempo should be set");
        let tags: Vec<&str> = doc.root().children().iter().map(|n| n.tag()).collect();
        assert_eq!(tags, ["TEMPO", "TRACK"]);
        assert!(serialize(&doc).contains("\n  TEMPO 100 4 4\n"));
    }

    #[test]
    fn render_file_is_replaced_or_inserted() {
        let mut doc = Document::empty();
        set_render_file(&mut doc, "mixdown").expect("render file should be set");
        set_render_file(&mut doc, "final take").expect("render file should be replaced");
        assert_eq!(
            Project::new(&doc).render_file().as_deref(),
            Some("final take")
        );
        assert_eq!(
            doc.root().children_with_tag("RENDER_FILE").count(),
            1
        );
        assert_eq!(
            set_render_file(&mut doc, "").expect_err("empty name must fail"),
            EditError::Reference(ReferenceError::EmptyPath)
        );
    }
}
