//! Generic project tree node.
//!
//! # Responsibility
//! - Hold tag, ordered params, ordered children and attached comment lines.
//! - Remember verbatim source lines so untouched nodes serialize unchanged.
//!
//! # Invariants
//! - Any param or tag mutation drops the verbatim header line; children
//!   edits never do.
//! - Block-ness is decided at construction (`<TAG` vs plain line) and does
//!   not change when children are added or removed.
//! - Verbatim lines (header, close, comments) are stored as written; a
//!   line that ended in CRLF keeps its trailing `\r`.

use super::value::{Param, Value};

/// Verbatim text a node was parsed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SourceLines {
    indent: Option<String>,
    header: Option<String>,
    close: Option<String>,
}

/// Universal tree element of a project document.
#[derive(Debug, Clone)]
pub struct Node {
    tag: String,
    params: Vec<Param>,
    children: Vec<Node>,
    is_block: bool,
    leading_comments: Vec<String>,
    trailing_comments: Vec<String>,
    inner_comments: Vec<String>,
    source: SourceLines,
}

impl Node {
    /// Creates a block node (`<TAG ... >`) with no children.
    pub fn block(tag: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        Self::fresh(tag.into(), params, true)
    }

    /// Creates a single-line directive node.
    pub fn directive(tag: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        Self::fresh(tag.into(), params, false)
    }

    fn fresh(tag: String, params: impl IntoIterator<Item = Value>, is_block: bool) -> Self {
        Self {
            tag,
            params: params.into_iter().map(Param::new).collect(),
            children: Vec::new(),
            is_block,
            leading_comments: Vec::new(),
            trailing_comments: Vec::new(),
            inner_comments: Vec::new(),
            source: SourceLines::default(),
        }
    }

    pub(crate) fn parsed(
        tag: String,
        params: Vec<Param>,
        is_block: bool,
        header_line: &str,
    ) -> Self {
        let indent_len = header_line.len() - header_line.trim_start().len();
        Self {
            tag,
            params,
            children: Vec::new(),
            is_block,
            leading_comments: Vec::new(),
            trailing_comments: Vec::new(),
            inner_comments: Vec::new(),
            source: SourceLines {
                indent: Some(header_line[..indent_len].to_string()),
                header: Some(header_line.to_string()),
                close: None,
            },
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether the tag equals `tag`, ignoring ASCII case.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.get(index).map(Param::value)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Whether the node was written (or created) as `<TAG ... >`.
    pub fn is_block(&self) -> bool {
        self.is_block
    }

    /// Replaces the param at `index`, returning the previous value.
    ///
    /// Returns `None` and leaves the node unchanged when `index` is out of range.
    pub fn replace_param(&mut self, index: usize, value: Value) -> Option<Value> {
        let slot = self.params.get_mut(index)?;
        let previous = std::mem::replace(slot, Param::new(value));
        self.source.header = None;
        Some(previous.value().clone())
    }

    /// Appends a param at the end of the line.
    pub fn push_param(&mut self, value: Value) {
        self.params.push(Param::new(value));
        self.source.header = None;
    }

    /// Renames the node.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
        self.source.header = None;
    }

    /// Appends one child as the last child.
    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Inserts one child at `index`, clamped to the child count.
    pub fn insert_child(&mut self, index: usize, child: Node) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// Removes and returns the child at `index`.
    pub fn remove_child(&mut self, index: usize) -> Option<Node> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// First child whose tag matches, ignoring ASCII case.
    pub fn find_child(&self, tag: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.has_tag(tag))
    }

    pub fn find_child_mut(&mut self, tag: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|child| child.has_tag(tag))
    }

    /// Position of the first child whose tag matches.
    pub fn child_position(&self, tag: &str) -> Option<usize> {
        self.children.iter().position(|child| child.has_tag(tag))
    }

    /// All children whose tag matches, in document order.
    pub fn children_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |child| child.has_tag(tag))
    }

    /// First param of the first child directive named `tag`.
    pub fn child_value(&self, tag: &str) -> Option<&Value> {
        self.find_child(tag).and_then(|child| child.param(0))
    }

    pub fn leading_comments(&self) -> &[String] {
        &self.leading_comments
    }

    pub fn trailing_comments(&self) -> &[String] {
        &self.trailing_comments
    }

    /// Comment lines held by a block that has no children.
    pub fn inner_comments(&self) -> &[String] {
        &self.inner_comments
    }

    pub(crate) fn push_trailing_comment(&mut self, line: impl Into<String>) {
        self.trailing_comments.push(line.into());
    }

    pub(crate) fn set_leading_comments(&mut self, lines: Vec<String>) {
        self.leading_comments = lines;
    }

    pub(crate) fn set_inner_comments(&mut self, lines: Vec<String>) {
        self.inner_comments = lines;
    }

    pub(crate) fn set_close_line(&mut self, line: &str) {
        self.source.close = Some(line.to_string());
    }

    /// Verbatim header line, present while tag and params are untouched.
    pub fn source_header(&self) -> Option<&str> {
        self.source.header.as_deref()
    }

    /// Verbatim close line of a parsed block.
    pub fn source_close(&self) -> Option<&str> {
        self.source.close.as_deref()
    }

    /// Leading whitespace of the parsed header line.
    pub fn source_indent(&self) -> Option<&str> {
        self.source.indent.as_deref()
    }

    /// Whether the header line will be reproduced verbatim.
    pub fn is_pristine(&self) -> bool {
        self.source.header.is_some()
    }

    /// Forgets layout (indentation, verbatim lines) for this subtree.
    ///
    /// Param source text is kept, so numerics still serialize as written.
    /// Used when parsed fragments are grafted at a different depth.
    pub fn into_relocated(mut self) -> Self {
        self.source = SourceLines::default();
        self.children = self
            .children
            .into_iter()
            .map(Node::into_relocated)
            .collect();
        self
    }

    /// Structural equality: tags, params and children in order.
    ///
    /// Comment lines and source layout are ignored.
    pub fn same_structure(&self, other: &Node) -> bool {
        self.tag == other.tag
            && self.is_block == other.is_block
            && self.params == other.params
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a.same_structure(b))
    }

    /// Pre-order walk over this node and every descendant.
    pub fn walk(&self, visit: &mut impl FnMut(&Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
