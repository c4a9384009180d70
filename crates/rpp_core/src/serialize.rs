//! Tree-to-text writer.
//!
//! # Responsibility
//! - Emit the project grammar from a `Document`.
//! - Reproduce untouched lines byte-for-byte; regenerate only mutated ones.
//!
//! # Invariants
//! - Pristine header/close lines and comment lines are written verbatim.
//! - Pristine params keep their written text even on regenerated lines.
//! - Canonical numerics parse back to the same value.
//! - Output always re-parses with `syntax::parse`.

use crate::model::document::Document;
use crate::model::node::Node;
use crate::model::value::{Param, Value};
use crate::syntax::lexer::{classify, QUOTE_CHARS};
use std::borrow::Cow;

const INDENT_UNIT: &str = "  ";

/// One output line.
enum Line<'a> {
    /// Parsed line written as it was, a CRLF line still carrying its `\r`.
    Verbatim(&'a str),
    /// Line produced for a new or modified node.
    Generated(String),
}

/// Serializes the whole document.
///
/// Verbatim lines get `\n` after their stored text, so each keeps the
/// terminator it was read with; generated lines use the document's
/// line ending.
pub fn serialize(doc: &Document) -> String {
    let mut lines = Vec::new();
    write_node(doc.root(), 0, &mut lines);

    let generated_ending = doc.line_ending().as_str();
    let last = lines.len().saturating_sub(1);
    let mut out = String::new();
    for (index, line) in lines.into_iter().enumerate() {
        let ending = match line {
            Line::Verbatim(text) => {
                out.push_str(text);
                "\n"
            }
            Line::Generated(text) => {
                out.push_str(&text);
                generated_ending
            }
        };
        if index < last || doc.final_newline() {
            out.push_str(ending);
        }
    }
    out
}

fn write_node<'a>(node: &'a Node, depth: usize, lines: &mut Vec<Line<'a>>) {
    lines.extend(node.leading_comments().iter().map(|line| Line::Verbatim(line.as_str())));

    let indent: Cow<'a, str> = match node.source_indent() {
        Some(indent) => Cow::Borrowed(indent),
        None => Cow::Owned(INDENT_UNIT.repeat(depth)),
    };
    match node.source_header() {
        Some(header) => lines.push(Line::Verbatim(header)),
        None => lines.push(Line::Generated(render_header(node, &indent))),
    }

    for child in node.children() {
        write_node(child, depth + 1, lines);
    }

    if node.is_block() {
        lines.extend(node.inner_comments().iter().map(|line| Line::Verbatim(line.as_str())));
        match node.source_close() {
            Some(close) => lines.push(Line::Verbatim(close)),
            None => lines.push(Line::Generated(format!("{indent}>"))),
        }
    }

    lines.extend(node.trailing_comments().iter().map(|line| Line::Verbatim(line.as_str())));
}

fn render_header(node: &Node, indent: &str) -> String {
    let mut header = String::from(indent);
    if node.is_block() {
        header.push('<');
    }
    header.push_str(node.tag());
    for param in node.params() {
        header.push(' ');
        header.push_str(&param_text(param));
    }
    header
}

/// Text a param is written as: its source text when pristine, else canonical.
pub fn param_text(param: &Param) -> Cow<'_, str> {
    match param.source_text() {
        Some(text) => Cow::Borrowed(text),
        None => Cow::Owned(format_value(param.value())),
    }
}

/// Canonical text for a value.
///
/// - integers: plain decimal;
/// - floats: shortest text that parses back to the same `f64`, in
///   exponent form when that is shorter;
/// - strings: quoted with the first quote character they do not contain,
///   line breaks written as spaces;
/// - barewords: as written, quoted when they would not re-lex as a bareword.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Int(number) => number.to_string(),
        Value::UInt(number) => number.to_string(),
        Value::Float(number) => format_float(*number),
        Value::Str(text) => quote(text),
        Value::Bare(text) => {
            if needs_quoting(text) {
                quote(text)
            } else {
                text.clone()
            }
        }
        Value::Guid(guid) => guid.to_string(),
    }
}

fn format_float(number: f64) -> String {
    if number == 0.0 {
        return "0".to_string();
    }
    // Both forms are shortest round-tripping ("85", "1e21"); keep the shorter.
    let plain = number.to_string();
    let exponent = format!("{number:e}");
    if exponent.len() < plain.len() {
        exponent
    } else {
        plain
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text.chars().any(char::is_whitespace)
        || text.starts_with(QUOTE_CHARS)
        || text.starts_with(['<', '#', '|'])
        || text.starts_with("//")
        || text == ">"
        || !matches!(classify(text), Value::Bare(_))
}

fn quote(text: &str) -> String {
    let text: Cow<'_, str> = if text.contains(['\r', '\n']) {
        Cow::Owned(text.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(text)
    };
    match QUOTE_CHARS.iter().find(|quote| !text.contains(**quote)) {
        Some(quote) => format!("{quote}{text}{quote}"),
        None => format!("\"{}\"", text.replace('"', "\\\"")),
    }
}
