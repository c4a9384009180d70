//! Default project template.
//!
//! # Responsibility
//! - Build a ready-to-open project with the usual header directives
//!   (sample rate, tempo, master bus, render settings).
//!
//! # Invariants
//! - Settings are validated with the same rules as the edit operations.

use crate::error::{validate_reference, ValidationError};
use crate::model::document::{Document, PROJECT_TAG};
use crate::model::node::Node;
use crate::model::value::Value;
use crate::service::project_service::check_tempo;
use crate::service::EditError;
use crate::syntax::parse_fragment;
use crate::view::project::{DEFAULT_TIME_SIGNATURE, RENDER_FILE_FIELD, SAMPLE_RATE_FIELD, TEMPO_FIELD};
use log::info;
use once_cell::sync::Lazy;

pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_RENDER_FILE: &str = "render";

static EDIT_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment("RIPPLE 0\nGROUPOVERRIDE 0 0 0\nAUTOXFADE 1\n").expect("valid edit defaults")
});

static MASTER_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment(
        "PLAYRATE 1 0 0.25 4
MASTERTRACKHEIGHT 0 0
MASTERTRACKVIEW 0 0.6667 0.5 0.5 -1 -1 -1 0 0 0 -1 -1 0
MASTERHWOUT 0 0 1 0 0 0 0 -1
MASTER_NCH 2 2
MASTER_VOLUME 1 0 -1 -1 1
MASTER_FX 1
MASTER_SEL 0
",
    )
    .expect("valid master defaults")
});

static RENDER_DEFAULTS: Lazy<Vec<Node>> = Lazy::new(|| {
    parse_fragment(
        "RENDER_PATTERN \"\"
RENDER_FMT 0 2 0
RENDER_1X 0
RENDER_RANGE 1 0 0 18 1000
RENDER_RESAMPLE 3 0 1
RENDER_ADDTOPROJ 0
RENDER_STEMS 0
RENDER_DITHER 0
",
    )
    .expect("valid render defaults")
});

/// Header values of a new project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSettings {
    pub tempo_bpm: f64,
    pub time_signature: (u32, u32),
    pub sample_rate: u32,
    pub render_file: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            time_signature: DEFAULT_TIME_SIGNATURE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            render_file: DEFAULT_RENDER_FILE.to_string(),
        }
    }
}

/// Builds a project with header directives and no tracks.
///
/// # Errors
/// - `Validation` for an out-of-range tempo, a zero time-signature part
///   or a zero sample rate.
/// - `Reference` for an empty or control-character render name.
pub fn default_project(settings: &ProjectSettings) -> Result<Document, EditError> {
    check_tempo(settings.tempo_bpm)?;
    let (numerator, denominator) = settings.time_signature;
    for part in [numerator, denominator] {
        if part == 0 {
            return Err(out_of_range(TEMPO_FIELD, f64::from(part)).into());
        }
    }
    if settings.sample_rate == 0 {
        return Err(out_of_range(SAMPLE_RATE_FIELD, 0.0).into());
    }
    validate_reference(&settings.render_file)?;

    let mut doc = Document::empty();
    let root = doc.root_mut();
    for directive in EDIT_DEFAULTS.iter() {
        root.push_child(directive.clone());
    }
    root.push_child(Node::directive(
        SAMPLE_RATE_FIELD,
        [
            Value::Int(i64::from(settings.sample_rate)),
            Value::Int(0),
            Value::Int(0),
        ],
    ));
    root.push_child(Node::directive(
        TEMPO_FIELD,
        [
            Value::Float(settings.tempo_bpm),
            Value::Int(i64::from(numerator)),
            Value::Int(i64::from(denominator)),
        ],
    ));
    for directive in MASTER_DEFAULTS.iter() {
        root.push_child(directive.clone());
    }
    root.push_child(Node::directive(
        RENDER_FILE_FIELD,
        [Value::text(settings.render_file.as_str())],
    ));
    for directive in RENDER_DEFAULTS.iter() {
        root.push_child(directive.clone());
    }

    info!(
        "event=project_new module=template status=ok bpm={} sample_rate={}",
        settings.tempo_bpm, settings.sample_rate
    );
    Ok(doc)
}

fn out_of_range(field: &'static str, value: f64) -> ValidationError {
    ValidationError::OutOfRange {
        node: PROJECT_TAG.to_string(),
        field,
        value,
        expected: "> 0",
    }
}
