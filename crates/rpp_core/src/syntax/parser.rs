//! Stack-based tree builder.
//!
//! # Responsibility
//! - Turn the lexer's line tokens into a `Document` (or a node fragment).
//! - Attach blank/comment lines to neighbouring nodes.
//!
//! # Invariants
//! - No tag allow-list: unknown tags become generic nodes.
//! - Unbalanced nesting is always a `StructuralError`, never repaired.
//! - Comment attachment is deterministic:
//!   - after a sibling in the same block: that sibling's trailing comments;
//!   - before the first child of a block: leading comments of that child;
//!   - in a block that never gets a child: the block's inner comments;
//!   - before the root: root leading; after the root: root trailing.
//! - Inside plugin-state blocks every non-blank line is payload, so a
//!   base64 line such as `//8AAAA` is a node, not a comment.

use super::lexer::{LexError, Lexer};
use super::token::{Lexeme, TokenKind};
use crate::error::StructuralError;
use crate::model::document::{Document, LineEnding};
use crate::model::node::Node;
use crate::model::value::Param;
use log::{debug, error};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Failure to turn text into a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Malformed token (e.g. unterminated quoted string).
    Lex(LexError),
    /// Unbalanced or misplaced blocks.
    Structural(StructuralError),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(err) => write!(f, "lex error: {err}"),
            Self::Structural(err) => write!(f, "structural error: {err}"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lex(err) => Some(err),
            Self::Structural(err) => Some(err),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(value: LexError) -> Self {
        Self::Lex(value)
    }
}

impl From<StructuralError> for ParseError {
    fn from(value: StructuralError) -> Self {
        Self::Structural(value)
    }
}

/// Parses a complete project text.
///
/// # Errors
/// - `ParseError::Lex` for malformed tokens.
/// - `ParseError::Structural` for unbalanced blocks, a missing root,
///   content after the root, or directives outside any block.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let started_at = Instant::now();
    let result = TreeBuilder::new(Mode::Document).run(source);
    match result {
        Ok(mut roots) => {
            let root = roots.pop().ok_or(StructuralError::MissingRoot)?;
            let doc = Document::with_layout(
                root,
                LineEnding::detect(source),
                source.ends_with('\n'),
            );
            debug!(
                "event=parse module=syntax status=ok bytes={} duration_ms={}",
                source.len(),
                started_at.elapsed().as_millis()
            );
            Ok(doc)
        }
        Err(err) => {
            error!(
                "event=parse module=syntax status=error bytes={} duration_ms={} error={}",
                source.len(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Parses a sequence of directives/blocks that is not wrapped in a root.
///
/// Returned nodes are relocatable: they render with the indentation of
/// wherever they are attached, while params keep their written text.
pub fn parse_fragment(source: &str) -> Result<Vec<Node>, ParseError> {
    let nodes = TreeBuilder::new(Mode::Fragment).run(source)?;
    Ok(nodes.into_iter().map(Node::into_relocated).collect())
}

/// Blocks whose body is opaque encoded state rather than directives.
const PAYLOAD_BLOCK_TAGS: [&str; 8] = [
    "VST",
    "AU",
    "DX",
    "CLAP",
    "LV2",
    "RECORD_CFG",
    "RENDER_CFG",
    "APPLY_CFG",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Document,
    Fragment,
}

struct TreeBuilder {
    mode: Mode,
    stack: Vec<(Node, usize)>,
    top_level: Vec<Node>,
    pending: Vec<String>,
}

impl TreeBuilder {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            stack: Vec::new(),
            top_level: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn run(mut self, source: &str) -> Result<Vec<Node>, ParseError> {
        for token in Lexer::new(source) {
            let token = token?;
            match token.kind {
                TokenKind::Trivia if self.in_payload_block() && !token.text.trim().is_empty() => {
                    let tag = token.text.trim().to_string();
                    let mut node = Node::parsed(tag, Vec::new(), false, token.raw);
                    node.set_leading_comments(std::mem::take(&mut self.pending));
                    self.append(node);
                }
                TokenKind::Trivia => self.trivia(token.raw),
                TokenKind::Open { tag, params } => {
                    self.ensure_root_slot(token.line)?;
                    let mut node = Node::parsed(tag, to_params(params), true, token.raw);
                    node.set_leading_comments(std::mem::take(&mut self.pending));
                    self.stack.push((node, token.line));
                }
                TokenKind::Directive { tag, params } => {
                    if self.stack.is_empty() && self.mode == Mode::Document {
                        return Err(
                            StructuralError::DirectiveOutsideBlock { line: token.line }.into()
                        );
                    }
                    let mut node = Node::parsed(tag, to_params(params), false, token.raw);
                    node.set_leading_comments(std::mem::take(&mut self.pending));
                    self.append(node);
                }
                TokenKind::Close => {
                    let (mut node, _) = self
                        .stack
                        .pop()
                        .ok_or(StructuralError::UnexpectedClose { line: token.line })?;
                    node.set_close_line(token.raw);
                    if !self.pending.is_empty() {
                        node.set_inner_comments(std::mem::take(&mut self.pending));
                    }
                    self.append(node);
                }
            }
        }

        if let Some((node, line)) = self.stack.pop() {
            return Err(StructuralError::UnclosedBlock {
                tag: node.tag().to_string(),
                line,
            }
            .into());
        }
        if self.mode == Mode::Document && self.top_level.is_empty() {
            return Err(StructuralError::MissingRoot.into());
        }
        if let Some(last) = self.top_level.last_mut() {
            for line in std::mem::take(&mut self.pending) {
                last.push_trailing_comment(line);
            }
        }
        Ok(self.top_level)
    }

    fn ensure_root_slot(&self, line: usize) -> Result<(), StructuralError> {
        if self.mode == Mode::Document && self.stack.is_empty() && !self.top_level.is_empty() {
            return Err(StructuralError::ContentAfterRoot { line });
        }
        Ok(())
    }

    fn in_payload_block(&self) -> bool {
        self.stack.last().is_some_and(|(parent, _)| {
            PAYLOAD_BLOCK_TAGS.iter().any(|tag| parent.has_tag(tag))
        })
    }

    fn trivia(&mut self, text: &str) {
        let siblings = match self.stack.last_mut() {
            Some((parent, _)) => parent.children_mut(),
            None => &mut self.top_level,
        };
        match siblings.last_mut() {
            Some(previous) if self.pending.is_empty() => {
                previous.push_trailing_comment(text);
            }
            _ => self.pending.push(text.to_string()),
        }
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some((parent, _)) => parent.push_child(node),
            None => self.top_level.push(node),
        }
    }
}

fn to_params(lexemes: Vec<Lexeme>) -> Vec<Param> {
    lexemes
        .into_iter()
        .map(|lexeme| Param::parsed(lexeme.value, lexeme.text))
        .collect()
}
