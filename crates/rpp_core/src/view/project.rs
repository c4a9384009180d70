//! Project-level view over the document root and its summary read model.
//!
//! # Responsibility
//! - Read header directives (`TEMPO`, `SAMPLERATE`, `RENDER_FILE`).
//! - Enumerate tracks and build the serializable summary used by `inspect`.
//!
//! # Invariants
//! - Absent directives read as `None`; present but malformed ones are errors.
//! - The summary fails on the first invalid track or item instead of
//!   skipping it.

use super::item::Item;
use super::track::{Track, TRACK_TAG};
use super::{child_param, display_text, node_label};
use crate::error::ValidationError;
use crate::model::document::Document;
use crate::model::guid::Guid;
use crate::model::node::Node;
use crate::model::value::Value;
use crate::serialize::{format_value, param_text};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

pub const TEMPO_FIELD: &str = "TEMPO";
pub const SAMPLE_RATE_FIELD: &str = "SAMPLERATE";
pub const RENDER_FILE_FIELD: &str = "RENDER_FILE";
/// Time signature assumed when `TEMPO` carries only the bpm.
pub const DEFAULT_TIME_SIGNATURE: (u32, u32) = (4, 4);

/// Tempo and time signature from the `TEMPO` directive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tempo {
    pub bpm: f64,
    pub numerator: u32,
    pub denominator: u32,
}

/// Read-only view over the project root.
#[derive(Debug, Clone, Copy)]
pub struct Project<'a> {
    doc: &'a Document,
}

impl<'a> Project<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    fn root(&self) -> &'a Node {
        self.doc.root()
    }

    pub fn version(&self) -> Option<&'a str> {
        self.doc.version()
    }

    /// Tempo from `TEMPO bpm [num [denom]]`.
    ///
    /// # Errors
    /// - `MalformedField` when bpm is not a number or the signature is not
    ///   a pair of positive integers.
    /// - `OutOfRange` when bpm is not positive.
    pub fn tempo(&self) -> Result<Option<Tempo>, ValidationError> {
        let root = self.root();
        let Some(tempo) = root.find_child(TEMPO_FIELD) else {
            return Ok(None);
        };
        let Some(first) = tempo.params().first() else {
            return Err(ValidationError::MissingField {
                node: node_label(root),
                field: TEMPO_FIELD,
            });
        };
        let bpm = first
            .value()
            .as_f64()
            .filter(|bpm| bpm.is_finite())
            .ok_or_else(|| malformed(root, TEMPO_FIELD, first.value()))?;
        if bpm <= 0.0 {
            return Err(ValidationError::OutOfRange {
                node: node_label(root),
                field: TEMPO_FIELD,
                value: bpm,
                expected: "> 0",
            });
        }

        let (default_num, default_denom) = DEFAULT_TIME_SIGNATURE;
        let numerator = signature_part(root, tempo, 1, default_num)?;
        let denominator = signature_part(root, tempo, 2, default_denom)?;
        Ok(Some(Tempo {
            bpm,
            numerator,
            denominator,
        }))
    }

    /// Sample rate from `SAMPLERATE rate ...`.
    pub fn sample_rate(&self) -> Result<Option<u32>, ValidationError> {
        let root = self.root();
        let Some(param) = child_param(root, SAMPLE_RATE_FIELD) else {
            return Ok(None);
        };
        param
            .value()
            .as_i64()
            .and_then(|rate| u32::try_from(rate).ok())
            .filter(|rate| *rate > 0)
            .map(Some)
            .ok_or_else(|| ValidationError::MalformedField {
                node: node_label(root),
                field: SAMPLE_RATE_FIELD,
                found: param_text(param).into_owned(),
            })
    }

    /// Render output name from `RENDER_FILE`.
    pub fn render_file(&self) -> Option<Cow<'a, str>> {
        child_param(self.root(), RENDER_FILE_FIELD).map(display_text)
    }

    /// Tracks in document order, each validated on its own.
    pub fn tracks(&self) -> impl Iterator<Item = Result<Track<'a>, ValidationError>> + 'a {
        self.root()
            .children_with_tag(TRACK_TAG)
            .map(Track::from_node)
    }

    pub fn track_count(&self) -> usize {
        self.root().children_with_tag(TRACK_TAG).count()
    }

    /// Builds the owned summary of header values, tracks and items.
    pub fn summary(&self) -> Result<ProjectSummary, ValidationError> {
        let tracks = self
            .tracks()
            .map(|track| TrackSummary::from_track(&track?))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProjectSummary {
            version: self.version().map(str::to_string),
            tempo: self.tempo()?,
            sample_rate: self.sample_rate()?,
            render_file: self.render_file().map(Cow::into_owned),
            tracks,
        })
    }
}

fn malformed(node: &Node, field: &'static str, found: &Value) -> ValidationError {
    ValidationError::MalformedField {
        node: node_label(node),
        field,
        found: format_value(found),
    }
}

fn signature_part(
    root: &Node,
    tempo: &Node,
    index: usize,
    default: u32,
) -> Result<u32, ValidationError> {
    let Some(value) = tempo.param(index) else {
        return Ok(default);
    };
    value
        .as_i64()
        .and_then(|part| u32::try_from(part).ok())
        .filter(|part| *part > 0)
        .ok_or_else(|| malformed(root, TEMPO_FIELD, value))
}

/// Owned project summary, serializable for `inspect --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub version: Option<String>,
    pub tempo: Option<Tempo>,
    pub sample_rate: Option<u32>,
    pub render_file: Option<String>,
    pub tracks: Vec<TrackSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub id: Guid,
    pub name: String,
    pub items: Vec<ItemSummary>,
}

impl TrackSummary {
    fn from_track(track: &Track<'_>) -> Result<Self, ValidationError> {
        let items = track
            .items()
            .map(|item| item.map(|item| ItemSummary::from_item(&item)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: track.id(),
            name: track.name().into_owned(),
            items,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub id: Option<Guid>,
    pub name: Option<String>,
    pub position: f64,
    pub length: f64,
    pub looped: bool,
    pub format: String,
    pub file: Option<String>,
}

impl ItemSummary {
    fn from_item(item: &Item<'_>) -> Self {
        Self {
            id: item.id(),
            name: item.name().map(Cow::into_owned),
            position: item.position(),
            length: item.length(),
            looped: item.is_looped(),
            format: item.source().format().to_string(),
            file: item.source().file_path().map(str::to_string),
        }
    }

    /// Last path component of the referenced file.
    fn file_name(&self) -> Option<&str> {
        self.file
            .as_deref()
            .and_then(|path| path.rsplit(['/', '\\']).next())
    }
}

impl Display for ProjectSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.tempo {
            Some(tempo) => {
                writeln!(f, "Tempo: {} BPM", format_value(&Value::Float(tempo.bpm)))?;
                writeln!(f, "Time Signature: {}/{}", tempo.numerator, tempo.denominator)?;
            }
            None => writeln!(f, "Tempo: not set")?,
        }
        write!(f, "Tracks: {}", self.tracks.len())?;
        for track in &self.tracks {
            write!(f, "\n  - {}", track.name)?;
            for item in &track.items {
                let file = item.file_name().unwrap_or("(embedded)");
                write!(
                    f,
                    "\n      {}: {} at {}s",
                    item.format,
                    file,
                    format_value(&Value::Float(item.position))
                )?;
            }
        }
        Ok(())
    }
}
