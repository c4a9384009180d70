//! Media source view (`<SOURCE ...>`).

use super::{child_param, display_text, expect_tag, node_label};
use crate::error::{validate_reference, ValidationError};
use crate::model::node::Node;
use std::borrow::Cow;

pub const SOURCE_TAG: &str = "SOURCE";
/// Child directive naming an external file.
pub const FILE_FIELD: &str = "FILE";

/// How a source holds its media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind<'a> {
    /// Reference to a file, relative to the project root or absolute.
    File(Cow<'a, str>),
    /// Inline data (e.g. `HASDATA` plus MIDI events), never interpreted.
    Embedded,
}

/// Typed view over a `SOURCE` block.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    node: &'a Node,
    format: Cow<'a, str>,
    kind: SourceKind<'a>,
}

impl<'a> Source<'a> {
    /// Validates `node` as a source.
    ///
    /// # Errors
    /// - `TagMismatch` when the tag is not `SOURCE`.
    /// - `MissingField` when the format param is absent.
    /// - `InvalidReference` when a `FILE` path is not well-formed.
    pub fn from_node(node: &'a Node) -> Result<Self, ValidationError> {
        expect_tag(node, SOURCE_TAG)?;
        let format = node
            .params()
            .first()
            .map(display_text)
            .ok_or_else(|| ValidationError::MissingField {
                node: node_label(node),
                field: "format",
            })?;

        let kind = match child_param(node, FILE_FIELD) {
            Some(param) => {
                let path = display_text(param);
                validate_reference(&path).map_err(|error| ValidationError::InvalidReference {
                    node: node_label(node),
                    error,
                })?;
                SourceKind::File(path)
            }
            None if node.find_child(FILE_FIELD).is_some() => {
                return Err(ValidationError::MissingField {
                    node: node_label(node),
                    field: FILE_FIELD,
                });
            }
            None => SourceKind::Embedded,
        };

        Ok(Self { node, format, kind })
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Media format tag, e.g. `MIDI` or `WAVE`.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn kind(&self) -> &SourceKind<'a> {
        &self.kind
    }

    /// File path for file-reference sources.
    pub fn file_path(&self) -> Option<&str> {
        match &self.kind {
            SourceKind::File(path) => Some(path.as_ref()),
            SourceKind::Embedded => None,
        }
    }

    pub fn is_midi(&self) -> bool {
        self.format.eq_ignore_ascii_case("MIDI")
    }
}

/// Validates `node` as a source.
pub fn as_source(node: &Node) -> Result<Source<'_>, ValidationError> {
    Source::from_node(node)
}

#[cfg(test)]
mod tests {
    use super::{as_source, SourceKind};
    use crate::error::ValidationError;
    use crate::syntax::parse_fragment;

    fn first(text: &str) -> crate::model::node::Node {
        parse_fragment(text)
            .expect("fragment should parse")
            .into_iter()
            .next()
            .expect("fragment should contain a node")
    }

    #[test]
    fn file_reference_source() {
        let node = first("<SOURCE MIDI\n  FILE \"midi/drums.mid\"\n>\n");
        let source = as_source(&node).expect("source should validate");
        assert_eq!(source.format(), "MIDI");
        assert!(source.is_midi());
        assert_eq!(source.file_path(), Some("midi/drums.mid"));
    }

    #[test]
    fn embedded_midi_source() {
        let node = first("<SOURCE MIDI\n  HASDATA 1 960 QN\n  E 480 90 3c 60\n  E 480 80 3c 00\n>\n");
        let source = as_source(&node).expect("source should validate");
        assert_eq!(source.kind(), &SourceKind::Embedded);
        assert_eq!(source.file_path(), None);
    }

    #[test]
    fn rejects_wrong_tag_missing_format_and_bad_path() {
        let item = first("<ITEM\n>\n");
        assert!(matches!(
            as_source(&item),
            Err(ValidationError::TagMismatch { expected: "SOURCE", .. })
        ));

        let bare = first("<SOURCE\n>\n");
        assert!(matches!(
            as_source(&bare),
            Err(ValidationError::MissingField { field: "format", .. })
        ));

        let empty_path = first("<SOURCE WAVE\n  FILE \"\"\n>\n");
        assert!(matches!(
            as_source(&empty_path),
            Err(ValidationError::InvalidReference { .. })
        ));

        let no_path = first("<SOURCE WAVE\n  FILE\n>\n");
        assert!(matches!(
            as_source(&no_path),
            Err(ValidationError::MissingField { field: "FILE", .. })
        ));
    }
}
