//! Token types produced by the project lexer.

use crate::model::value::Value;

/// One line of project text, classified.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// 1-based line number.
    pub line: usize,
    /// The line as written, without its terminator.
    pub text: &'a str,
    /// The line as written, keeping the `\r` of a CRLF terminator.
    pub raw: &'a str,
}

/// Structural meaning of a line.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `<TAG params...`
    Open { tag: String, params: Vec<Lexeme> },
    /// `>`
    Close,
    /// `TAG params...`
    Directive { tag: String, params: Vec<Lexeme> },
    /// Blank or comment line, preserved verbatim.
    Trivia,
}

/// A classified parameter token and the exact text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub value: Value,
    pub text: String,
}
