//! Track FX use-cases.
//!
//! # Invariants
//! - A track gets at most one stock synth; calling again is a no-op.
//! - Every inserted plugin carries a freshly issued `FXID`.
//! - The synth goes ahead of any existing plugin so it feeds the chain.

use super::track_service::position_of_id;
use super::EditError;
use crate::model::document::Document;
use crate::model::guid::Guid;
use crate::model::node::Node;
use crate::model::value::Value;
use crate::syntax::parse_fragment;
use crate::view::ITEM_TAG;
use log::{info, warn};
use once_cell::sync::Lazy;

/// Tag of a track's effect chain block.
pub const FXCHAIN_TAG: &str = "FXCHAIN";
/// Per-plugin identifier directive.
pub const FXID_FIELD: &str = "FXID";

const SYNTH_NAME: &str = "ReaSynth";
const PLUGIN_TAG: &str = "VST";

/// Chain-level directives written at the top of a new `FXCHAIN`.
static CHAIN_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment("SHOW 0\nLASTSEL 0\nDOCKED 0\n").expect("valid fx chain defaults")
});

/// Stock synth plugin with a plain saw patch.
static SYNTH_PLUGIN: Lazy<Node> = Lazy::new(|| {
    parse_fragment(
        r#"<VST "VSTi: ReaSynth (Cockos)" reasynth.vst.dylib 0 "" 1919251321<5653546872736E7265617379>
  eXNlcu5e7f4CAAAAAQAAAAAAAAACAAAAAAAAAAIAAAABAAAAAAAAAAIAAAAAAAAAPAAAAAAAAAAAABA
  AAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA
  AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA
  AAAQAAAA
>
"#,
    )
    .ok()
    .and_then(|nodes| nodes.into_iter().next())
    .expect("valid synth plugin")
});

/// Makes sure the track `track_id` plays its MIDI items through a synth.
///
/// Adds an `FXCHAIN` (ahead of the first item) when the track has none, or
/// puts the synth first in the existing chain. Returns `false` when the
/// chain already holds the synth and nothing changed.
///
/// # Errors
/// - `TrackNotFound` when no track carries `track_id`.
/// - `IdentifierExhausted` when no unique `FXID` could be issued.
pub fn ensure_synth(doc: &mut Document, track_id: Guid) -> Result<bool, EditError> {
    let Some(track_index) = position_of_id(doc, track_id) else {
        warn!("event=synth_add module=service status=error track_id={track_id} error_code=track_not_found");
        return Err(EditError::TrackNotFound(track_id));
    };
    let track = &doc.root().children()[track_index];
    if let Some(chain) = track.find_child(FXCHAIN_TAG) {
        if chain.children().iter().any(is_synth) {
            info!("event=synth_add module=service status=ok track_id={track_id} changed=false");
            return Ok(false);
        }
    }

    let fx_id = doc.issue_identifier().ok_or(EditError::IdentifierExhausted)?;
    let track = &mut doc.root_mut().children_mut()[track_index];
    match track.find_child_mut(FXCHAIN_TAG) {
        Some(chain) => {
            // Per-plugin entries start at `BYPASS`; the synth goes before the first one.
            let at = chain
                .child_position("BYPASS")
                .unwrap_or(chain.children().len());
            for (offset, entry) in synth_entries(fx_id).into_iter().enumerate() {
                chain.insert_child(at + offset, entry);
            }
        }
        None => {
            let mut chain = Node::block(FXCHAIN_TAG, []);
            for directive in CHAIN_DEFAULTS.iter() {
                chain.push_child(directive.clone());
            }
            for entry in synth_entries(fx_id) {
                chain.push_child(entry);
            }
            let at = track
                .child_position(ITEM_TAG)
                .unwrap_or(track.children().len());
            track.insert_child(at, chain);
        }
    }

    info!("event=synth_add module=service status=ok track_id={track_id} fx_id={fx_id} changed=true");
    Ok(true)
}

fn synth_entries(fx_id: Guid) -> Vec<Node> {
    vec![
        Node::directive("BYPASS", [Value::Int(0), Value::Int(0), Value::Int(0)]),
        SYNTH_PLUGIN.clone(),
        Node::directive("FLOATPOS", (0..4).map(|_| Value::Int(0))),
        Node::directive(FXID_FIELD, [Value::Guid(fx_id)]),
        Node::directive("WAK", [Value::Int(0), Value::Int(0)]),
    ]
}

fn is_synth(node: &Node) -> bool {
    node.has_tag(PLUGIN_TAG)
        && node
            .param(0)
            .and_then(Value::as_text)
            .is_some_and(|name| name.contains(SYNTH_NAME))
}

#[cfg(test)]
mod tests {
    use super::{ensure_synth, FXCHAIN_TAG, FXID_FIELD};
    use crate::model::document::Document;
    use crate::model::guid::Guid;
    use crate::serialize::serialize;
    use crate::service::{add_midi_item, add_track, EditError};
    use crate::syntax::parse;

    #[test]
    fn ensure_synth_adds_chain_ahead_of_items() {
        let mut doc = Document::empty();
        let track_id = add_track(&mut doc, "Lead").expect("track").id();
        add_midi_item(&mut doc, track_id, "lead.mid", 0.0, 4.0).expect("item");

        assert_eq!(ensure_synth(&mut doc, track_id), Ok(true));

        let track = &doc.root().children()[0];
        let chain_at = track.child_position(FXCHAIN_TAG).expect("chain should exist");
        let item_at = track.child_position("ITEM").expect("item should exist");
        assert!(chain_at < item_at);

        let chain = &track.children()[chain_at];
        let fx_id = chain
            .child_value(FXID_FIELD)
            .and_then(|value| value.as_guid())
            .expect("plugin should carry an identifier");
        assert!(doc.is_identifier_used(&fx_id));
        assert_ne!(fx_id, track_id);

        let text = serialize(&doc);
        assert!(text.contains(
            "      <VST \"VSTi: ReaSynth (Cockos)\" reasynth.vst.dylib 0 \"\" 1919251321<5653546872736E7265617379>\n        eXNlcu5e"
        ));
        let reparsed = parse(&text).expect("output should parse");
        assert!(reparsed.root().same_structure(doc.root()));
    }

    #[test]
    fn ensure_synth_is_idempotent() {
        let mut doc = Document::empty();
        let track_id = add_track(&mut doc, "Lead").expect("track").id();
        assert_eq!(ensure_synth(&mut doc, track_id), Ok(true));
        let before = serialize(&doc);
        assert_eq!(ensure_synth(&mut doc, track_id), Ok(false));
        assert_eq!(serialize(&doc), before);
    }

    #[test]
    fn ensure_synth_goes_first_in_existing_chain() {
        let mut doc = parse(
            "<REAPER_PROJECT
  <TRACK {0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9}
    <FXCHAIN
      SHOW 0
      BYPASS 0 0 0
      <JS utility/volume \"\"
        0 - - -
      >
      FXID {11111111-2222-3333-4444-555555555555}
    >
  >
>
",
        )
        .expect("project should parse");
        let track_id = Guid::parse_braced("{0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9}")
            .expect("literal identifier should parse");

        assert_eq!(ensure_synth(&mut doc, track_id), Ok(true));
        let chain = doc.root().children()[0]
            .find_child(FXCHAIN_TAG)
            .expect("chain");
        let tags: Vec<&str> = chain.children().iter().map(|node| node.tag()).collect();
        assert_eq!(
            tags,
            ["SHOW", "BYPASS", "VST", "FLOATPOS", "FXID", "WAK", "BYPASS", "JS", "FXID"]
        );
    }

    #[test]
    fn ensure_synth_requires_existing_track() {
        let mut doc = Document::empty();
        let missing = Guid::new_v4();
        assert_eq!(
            ensure_synth(&mut doc, missing),
            Err(EditError::TrackNotFound(missing))
        );
        assert_eq!(doc.identifier_count(), 0);
    }
}
