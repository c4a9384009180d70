//! Line lexer for project text.
//!
//! # Responsibility
//! - Classify each line as block open, block close, directive or trivia.
//! - Split parameters into quoted strings, numerics, identifiers and barewords.
//!
//! # Invariants
//! - Single forward pass; the iterator stops after the first error.
//! - Every lexeme keeps its exact source text.
//! - A quoted string never spans lines.

use super::token::{Lexeme, Token, TokenKind};
use crate::model::guid::Guid;
use crate::model::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::Split;

/// Characters that may open a quoted string.
pub const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("valid integer regex"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .expect("valid float regex")
});

/// Malformed token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl LexError {
    fn new(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            message: message.into(),
            line,
            col,
        }
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.col, self.message)
    }
}

impl Error for LexError {}

/// Lazy token stream over project text.
pub struct Lexer<'a> {
    lines: Option<Split<'a, char>>,
    line: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        // One terminator at the very end does not start another line.
        let body = source.strip_suffix('\n').unwrap_or(source);
        Self {
            lines: (!source.is_empty()).then(|| body.split('\n')),
            line: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let raw = self.lines.as_mut()?.next()?;
        self.line += 1;
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        let line = self.line;
        let result = lex_line(text, line).map(|kind| Token {
            kind,
            line,
            text,
            raw,
        });
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Classifies one line (without terminator).
pub fn lex_line(text: &str, line: usize) -> Result<TokenKind, LexError> {
    let indent = text.len() - text.trim_start().len();
    let content = text.trim();

    if content.is_empty() || content.starts_with('#') || content.starts_with("//") {
        return Ok(TokenKind::Trivia);
    }
    // Notes text: the whole line is one opaque token.
    if content.starts_with('|') {
        return Ok(TokenKind::Directive {
            tag: content.to_string(),
            params: Vec::new(),
        });
    }
    if content == ">" {
        return Ok(TokenKind::Close);
    }

    let (is_open, body, offset) = match content.strip_prefix('<') {
        Some(rest) => (true, rest, indent + 1),
        None => (false, content, indent),
    };
    let mut lexemes = scan_lexemes(body, line, offset)?;
    if lexemes.is_empty() {
        return Err(LexError::new("block open marker without a tag", line, indent + 1));
    }
    let tag = lexemes.remove(0).text;

    Ok(if is_open {
        TokenKind::Open {
            tag,
            params: lexemes,
        }
    } else {
        TokenKind::Directive {
            tag,
            params: lexemes,
        }
    })
}

fn scan_lexemes(body: &str, line: usize, offset: usize) -> Result<Vec<Lexeme>, LexError> {
    let mut lexemes = Vec::new();
    let mut rest = body;
    let mut consumed = 0;

    loop {
        let trimmed = rest.trim_start_matches([' ', '\t']);
        consumed += rest.len() - trimmed.len();
        rest = trimmed;
        let Some(first) = rest.chars().next() else {
            break;
        };

        let len = if QUOTE_CHARS.contains(&first) {
            let (value, len) = scan_quoted(rest, first).ok_or_else(|| {
                LexError::new(
                    format!("unterminated quoted string opened with `{first}`"),
                    line,
                    offset + consumed + 1,
                )
            })?;
            lexemes.push(Lexeme {
                value: Value::Str(value),
                text: rest[..len].to_string(),
            });
            len
        } else {
            let len = rest.find([' ', '\t']).unwrap_or(rest.len());
            let word = &rest[..len];
            lexemes.push(Lexeme {
                value: classify(word),
                text: word.to_string(),
            });
            len
        };

        rest = &rest[len..];
        consumed += len;
    }

    Ok(lexemes)
}

/// Scans a quoted string starting at `input[0] == quote`.
///
/// A backslash before the quote character escapes it only when another
/// quote character follows later on the line, so a path such as
/// `"C:\renders\"` still terminates.
fn scan_quoted(input: &str, quote: char) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = input.char_indices().skip(1).peekable();

    while let Some((index, ch)) = chars.next() {
        if ch == quote {
            return Some((value, index + ch.len_utf8()));
        }
        if ch == '\\' {
            if let Some(&(next_index, next)) = chars.peek() {
                if next == quote && input[next_index + 1..].contains(quote) {
                    value.push(quote);
                    chars.next();
                    continue;
                }
            }
        }
        value.push(ch);
    }
    None
}

/// Classifies an unquoted token.
pub fn classify(word: &str) -> Value {
    if INTEGER_RE.is_match(word) {
        if let Ok(value) = word.parse::<i64>() {
            return Value::Int(value);
        }
        if let Ok(value) = word.trim_start_matches('+').parse::<u64>() {
            return Value::UInt(value);
        }
        // Wider than any integer type: keep it numeric.
        if let Ok(value) = word.parse::<f64>() {
            return Value::Float(value);
        }
        return Value::Bare(word.to_string());
    }
    if FLOAT_RE.is_match(word) {
        if let Ok(value) = word.parse::<f64>() {
            return Value::Float(value);
        }
    }
    if let Some(guid) = Guid::parse_braced(word) {
        return Value::Guid(guid);
    }
    Value::Bare(word.to_string())
}
