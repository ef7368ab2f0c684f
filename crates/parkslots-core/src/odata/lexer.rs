//! Tokenizer for OData `$filter` / `$orderby` text

use super::ODataError;

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword (`fields`, `Title`, `eq`, `and`, `true`, ...)
    Ident(String),
    /// Single-quoted string, with `''` escapes already collapsed
    Str(String),
    /// Unquoted literal starting with a digit: numbers, dates, GUIDs
    Bare(String),
    Slash,
    LParen,
    RParen,
    Comma,
    /// Separates a lambda variable from its predicate
    Colon,
}

impl TokenKind {
    /// Source-like text for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) | TokenKind::Bare(s) => s.clone(),
            TokenKind::Str(s) => format!("'{s}'"),
            TokenKind::Slash => "/".into(),
            TokenKind::LParen => "(".into(),
            TokenKind::RParen => ")".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::Colon => ":".into(),
        }
    }
}

/// A token and its character offset in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '+')
}

/// Splits `input` into tokens
pub fn tokenize(input: &str) -> Result<Vec<Token>, ODataError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = match c {
            '/' => {
                i += 1;
                TokenKind::Slash
            }
            '(' => {
                i += 1;
                TokenKind::LParen
            }
            ')' => {
                i += 1;
                TokenKind::RParen
            }
            ',' => {
                i += 1;
                TokenKind::Comma
            }
            ':' => {
                i += 1;
                TokenKind::Colon
            }
            '\'' => {
                i += 1;
                let mut value = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(ODataError::UnterminatedString(start)),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            value.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                TokenKind::Str(value)
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                i += 1;
                while i < chars.len() && is_bare_char(chars[i]) {
                    i += 1;
                }
                TokenKind::Bare(chars[start..i].iter().collect())
            }
            c if is_ident_start(c) => {
                i += 1;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                TokenKind::Ident(chars[start..i].iter().collect())
            }
            other => return Err(ODataError::UnexpectedChar { ch: other, pos: start }),
        };

        tokens.push(Token { kind, pos: start });
    }

    Ok(tokens)
}
