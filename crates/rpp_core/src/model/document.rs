//! Parsed project document.
//!
//! # Responsibility
//! - Own the root `REAPER_PROJECT` block and every descendant.
//! - Track identifiers in use and issue fresh ones.
//! - Remember the line ending used for lines the serializer generates.
//!
//! # Invariants
//! - The identifier set only grows; removed nodes never free their ids.
//! - Issued identifiers are unique among every identifier ever seen by
//!   this document instance.

use super::guid::Guid;
use super::node::Node;
use super::value::Value;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tag of the root project block.
pub const PROJECT_TAG: &str = "REAPER_PROJECT";
/// Format version written into new skeletons.
pub const SKELETON_FORMAT_VERSION: f64 = 0.1;
/// Application version string written into new skeletons.
pub const SKELETON_APP_VERSION: &str = "7.0";

const MAX_IDENTIFIER_ATTEMPTS: usize = 16;

/// Line terminator for generated lines.
///
/// Parsed lines keep their own terminator; this only applies to lines
/// produced for new or modified nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// Ending of the first terminated line, `Lf` when there is none.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(end) if text[..end].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }
}

/// In-memory project: root node plus bookkeeping.
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
    identifiers: HashSet<Guid>,
    version: Option<String>,
    line_ending: LineEnding,
    final_newline: bool,
}

impl Document {
    /// Wraps an existing root node, collecting the identifiers it contains.
    pub fn from_root(root: Node) -> Self {
        Self::with_layout(root, LineEnding::Lf, true)
    }

    pub(crate) fn with_layout(root: Node, line_ending: LineEnding, final_newline: bool) -> Self {
        let mut identifiers = HashSet::new();
        root.walk(&mut |node| {
            identifiers.extend(node.params().iter().filter_map(|p| p.value().as_guid()));
        });
        let version = root.params().first().map(|param| match param.value() {
            Value::Str(text) | Value::Bare(text) => text.clone(),
            _ => param
                .source_text()
                .map(str::to_string)
                .unwrap_or_else(|| crate::serialize::format_value(param.value())),
        });
        Self {
            root,
            identifiers,
            version,
            line_ending,
            final_newline,
        }
    }

    /// Minimal two-line skeleton: a project block with no children.
    pub fn empty() -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or(0);
        Self::from_root(Node::block(
            PROJECT_TAG,
            [
                Value::Float(SKELETON_FORMAT_VERSION),
                Value::text(SKELETON_APP_VERSION),
                Value::Int(created_at),
            ],
        ))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Format-version marker copied from the root's first param.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Whether the serialized text ends with a line terminator.
    pub fn final_newline(&self) -> bool {
        self.final_newline
    }

    /// Node reached by following child indices from the root.
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(&self.root, |node, index| node.children().get(*index))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter().try_fold(&mut self.root, |node, index| {
            node.children_mut().get_mut(*index)
        })
    }

    /// Whether `guid` was seen in this document or issued by it.
    pub fn is_identifier_used(&self, guid: &Guid) -> bool {
        self.identifiers.contains(guid)
    }

    /// Number of identifiers reserved so far.
    pub fn identifier_count(&self) -> usize {
        self.identifiers.len()
    }

    /// Marks an externally supplied identifier as used.
    ///
    /// Returns `false` when it was already reserved.
    pub fn reserve_identifier(&mut self, guid: Guid) -> bool {
        self.identifiers.insert(guid)
    }

    /// Issues a fresh random identifier and reserves it.
    ///
    /// Returns `None` only when every attempt collides, which is not
    /// expected given the v4 keyspace.
    pub fn issue_identifier(&mut self) -> Option<Guid> {
        self.issue_identifier_with(Guid::new_v4)
    }

    pub(crate) fn issue_identifier_with(
        &mut self,
        mut generate: impl FnMut() -> Guid,
    ) -> Option<Guid> {
        for _ in 0..MAX_IDENTIFIER_ATTEMPTS {
            let candidate = generate();
            if self.identifiers.insert(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}
