//! Lossless reader, editor and writer for REAPER project (`.rpp`) files.
//!
//! Text is parsed into a generic node tree that remembers how every line
//! was written; typed views and edit operations work on top of that tree,
//! and serializing an untouched document reproduces the input byte for byte.

pub mod error;
pub mod logging;
pub mod model;
pub mod serialize;
pub mod service;
pub mod syntax;
pub mod template;
pub mod view;

pub use error::{validate_reference, ReferenceError, StructuralError, ValidationError};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::document::{Document, LineEnding};
pub use model::guid::Guid;
pub use model::node::Node;
pub use model::value::{Param, Value};
pub use serialize::serialize;
pub use service::{
    add_midi_item, add_track, attach_child, ensure_synth, ensure_track, find_track,
    remove_track, set_render_file, set_tempo, EditError, TrackQuery,
};
pub use syntax::{parse, parse_fragment, LexError, ParseError};
pub use template::{default_project, ProjectSettings};
pub use view::{
    as_item, as_source, as_track, Item, Project, ProjectSummary, Source, SourceKind, Tempo,
    Track,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
