//! Project text syntax: tokens, lexer and tree builder.
//!
//! # Responsibility
//! - Turn raw `.rpp` text into a generic node tree.
//!
//! # Invariants
//! - Parsing performs no I/O and keeps no state between calls.

pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::{LexError, Lexer};
pub use parser::{parse, parse_fragment, ParseError};
