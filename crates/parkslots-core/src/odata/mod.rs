//! OData query support for Graph list-item queries
//!
//! Callers write `$filter` and `$orderby` clauses with the list's friendly
//! column names (`Title`, `ID`). Graph addresses custom columns under a
//! `fields/` prefix and the item key as `id`, so clauses are parsed into a
//! small expression tree, rewritten, and rendered back to canonical text.
//! Working on the tree means string literals and `/` paths are never
//! touched by the rewrite, and every literal is re-emitted with its single
//! quotes doubled.
//!
//! ## Modules
//!
//! - [`lexer`] - Tokenizer for OData clause text
//! - [`expr`] - Filter and orderby trees, parser, and renderer
//! - [`query`] - Ordered query-string assembly

pub mod expr;
pub mod lexer;
pub mod query;

use thiserror::Error;

pub use expr::{BinaryOp, Direction, Expr, Filter, LambdaOp, OrderBy, OrderItem, MAX_DEPTH, MAX_TOKENS};
pub use query::{encode_path_segment, ODataQuery};

/// Errors produced while parsing an OData clause
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ODataError {
    /// The clause contains nothing but whitespace
    #[error("Empty expression")]
    Empty,

    /// A character that cannot start any token
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    /// A string literal is missing its closing quote
    #[error("Unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    /// A token that does not fit the grammar at this point
    #[error("Unexpected '{found}' at position {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        pos: usize,
        expected: &'static str,
    },

    /// Input ended while more was required
    #[error("Unexpected end of expression, expected {0}")]
    UnexpectedEnd(&'static str),

    /// Parentheses, `not`, or lambdas nested beyond the supported depth
    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),

    /// More tokens than a single clause may hold
    #[error("Expression longer than {0} tokens")]
    TooLong(usize),
}

/// Escapes a value for use inside a single-quoted OData string literal
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Renders `value` as a complete OData string literal, quotes included
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}
