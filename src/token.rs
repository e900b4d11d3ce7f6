//! The token definition for the stored query language.

use std::borrow::Cow;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    Where,    // "WHERE"
    Order,    // "ORDER"
    By,       // "BY"
    And,      // "AND"
    Or,       // "OR"
    Not,      // "NOT"
    Contains, // "CONTAINS"
    Under,    // "UNDER"
    Ever,     // "EVER"

    // Literals
    Field(&'a str),      // [System.Id], without the brackets
    String(Cow<'a, str>), // 'text', unescaped
    Number(&'a str),
    Parameter(&'a str),  // @project, without the '@'
    Identifier(&'a str),

    // Punctuation
    LParen, // (
    RParen, // )
    Comma,  // ,

    // Operators
    Eq,    // =
    NotEq, // <> or !=
    Gt,    // >
    Lt,    // <
    Gte,   // >=
    Lte,   // <=

    // Special
    Unterminated(Unterminated), // A bracket, quote or parameter that never closes
    Illegal,                    // An illegal/unknown character
}

/// What an unterminated token was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unterminated {
    Bracket,
    Quote,
    Parameter,
}

impl Unterminated {
    pub fn describe(self) -> &'static str {
        match self {
            Unterminated::Bracket => "unterminated field reference, expected `]`",
            Unterminated::Quote => "unterminated string literal, expected `'`",
            Unterminated::Parameter => "parameter name expected after `@`",
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
