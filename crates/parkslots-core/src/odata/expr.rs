//! Filter and orderby expression trees
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! or       := and ("or" and)*
//! and      := unary ("and" unary)*
//! unary    := "not" unary | compare
//! compare  := additive (cmp additive | "in" list)?
//! cmp      := "eq"|"ne"|"gt"|"ge"|"lt"|"le"|"has"
//! additive := multiply (("add"|"sub") multiply)*
//! multiply := primary (("mul"|"div"|"divby"|"mod") primary)*
//! primary  := "(" or ")" | string | literal | call | path [lambda]
//! list     := "(" or ("," or)* ")"
//! call     := ident "(" [or ("," or)*] ")"
//! lambda   := "/" ("any"|"all") "(" [ident ":" or] ")"
//! path     := ident ("/" ident)*
//! orderby  := path ["asc"|"desc"] ("," path ["asc"|"desc"])*
//! ```
//!
//! Nesting is capped at [`MAX_DEPTH`] and clause length at [`MAX_TOKENS`],
//! so rendering and normalizing a parsed tree never recurse without bound.

use std::fmt::{self, Display, Formatter};

use super::lexer::{tokenize, Token, TokenKind};
use super::{quote_literal, ODataError};

/// Deepest nesting of groups, `not`, call arguments, and lambdas
pub const MAX_DEPTH: usize = 64;

/// Longest clause, in tokens
pub const MAX_TOKENS: usize = 1024;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Has,
    /// Right operand is an [`Expr::List`]
    In,
    Add,
    Sub,
    Mul,
    Div,
    DivBy,
    Mod,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Has => "has",
            BinaryOp::In => "in",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::DivBy => "divby",
            BinaryOp::Mod => "mod",
        }
    }

    fn comparison(word: &str) -> Option<Self> {
        match word {
            "eq" => Some(BinaryOp::Eq),
            "ne" => Some(BinaryOp::Ne),
            "gt" => Some(BinaryOp::Gt),
            "ge" => Some(BinaryOp::Ge),
            "lt" => Some(BinaryOp::Lt),
            "le" => Some(BinaryOp::Le),
            "has" => Some(BinaryOp::Has),
            _ => None,
        }
    }

    fn additive(word: &str) -> Option<Self> {
        match word {
            "add" => Some(BinaryOp::Add),
            "sub" => Some(BinaryOp::Sub),
            _ => None,
        }
    }

    fn multiplicative(word: &str) -> Option<Self> {
        match word {
            "mul" => Some(BinaryOp::Mul),
            "div" => Some(BinaryOp::Div),
            "divby" => Some(BinaryOp::DivBy),
            "mod" => Some(BinaryOp::Mod),
            _ => None,
        }
    }
}

/// Collection operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaOp {
    Any,
    All,
}

impl LambdaOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LambdaOp::Any => "any",
            LambdaOp::All => "all",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "any" => Some(LambdaOp::Any),
            "all" => Some(LambdaOp::All),
            _ => None,
        }
    }
}

/// A filter expression node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Property path such as `Title` or `fields/Codigo`
    Path(Vec<String>),
    /// String literal, stored unescaped
    Str(String),
    /// Unquoted literal (`true`, `null`, `42`, dates), stored verbatim
    Literal(String),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Parenthesized sub-expression
    Group(Box<Expr>),
    /// Parenthesized operand list of `in`
    List(Vec<Expr>),
    /// `collection/any(var:predicate)`; `any()` has neither part
    Lambda {
        collection: Vec<String>,
        op: LambdaOp,
        variable: Option<String>,
        predicate: Option<Box<Expr>>,
    },
}

impl Expr {
    /// Builds a path from `a/b/c` text
    pub fn path(text: &str) -> Self {
        Expr::Path(text.split('/').map(String::from).collect())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    pub fn compare(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Rewrites friendly column names to Graph paths.
    ///
    /// A bare `ID` becomes the item key `id`; a bare `Title` becomes
    /// `fields/Title`. Multi-segment paths and literals are left alone.
    pub fn normalize_field_tokens(self) -> Self {
        match self {
            Expr::Path(segments) => Expr::Path(normalize_path(segments)),
            Expr::Call { name, args } => Expr::Call {
                name,
                args: args.into_iter().map(Expr::normalize_field_tokens).collect(),
            },
            Expr::Not(inner) => Expr::Not(Box::new(inner.normalize_field_tokens())),
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(left.normalize_field_tokens()),
                right: Box::new(right.normalize_field_tokens()),
            },
            Expr::Group(inner) => Expr::Group(Box::new(inner.normalize_field_tokens())),
            Expr::List(items) => {
                Expr::List(items.into_iter().map(Expr::normalize_field_tokens).collect())
            }
            Expr::Lambda {
                collection,
                op,
                variable,
                predicate,
            } => Expr::Lambda {
                collection: normalize_path(collection),
                op,
                variable,
                predicate: predicate.map(|p| Box::new(p.normalize_field_tokens())),
            },
            other => other,
        }
    }
}

fn normalize_path(segments: Vec<String>) -> Vec<String> {
    if segments.len() != 1 {
        return segments;
    }
    match segments[0].as_str() {
        "ID" => vec!["id".to_string()],
        "Title" => vec!["fields".to_string(), "Title".to_string()],
        _ => segments,
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path(segments) => write!(f, "{}", segments.join("/")),
            Expr::Str(value) => write!(f, "{}", quote_literal(value)),
            Expr::Literal(raw) => write!(f, "{raw}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Not(inner) => write!(f, "not {inner}"),
            Expr::Binary { op, left, right } => write!(f, "{left} {} {right}", op.as_str()),
            Expr::Group(inner) => write!(f, "({inner})"),
            Expr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Expr::Lambda {
                collection,
                op,
                variable,
                predicate,
            } => {
                write!(f, "{}/{}(", collection.join("/"), op.as_str())?;
                if let (Some(variable), Some(predicate)) = (variable, predicate) {
                    write!(f, "{variable}:{predicate}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A parsed `$filter` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter(Expr);

impl Filter {
    /// Parses filter text.
    ///
    /// # Errors
    ///
    /// Returns an [`ODataError`] when the text is empty or does not follow
    /// the filter grammar.
    pub fn parse(text: &str) -> Result<Self, ODataError> {
        let mut parser = Parser::new(text)?;
        let expr = parser.parse_or()?;
        parser.expect_end()?;
        Ok(Self(expr))
    }

    pub fn from_expr(expr: Expr) -> Self {
        Self(expr)
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }

    pub fn normalize_field_tokens(self) -> Self {
        Self(self.0.normalize_field_tokens())
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `$orderby` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub path: Vec<String>,
    pub direction: Option<Direction>,
}

impl Display for OrderItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("/"))?;
        match self.direction {
            Some(Direction::Asc) => write!(f, " asc"),
            Some(Direction::Desc) => write!(f, " desc"),
            None => Ok(()),
        }
    }
}

/// A parsed `$orderby` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy(Vec<OrderItem>);

impl OrderBy {
    /// Parses orderby text.
    ///
    /// # Errors
    ///
    /// Returns an [`ODataError`] when the text is empty or malformed.
    pub fn parse(text: &str) -> Result<Self, ODataError> {
        let mut parser = Parser::new(text)?;
        let mut items = Vec::new();
        loop {
            let path = parser.parse_path()?;
            let direction = match parser.peek_word() {
                Some("asc") => {
                    parser.advance();
                    Some(Direction::Asc)
                }
                Some("desc") => {
                    parser.advance();
                    Some(Direction::Desc)
                }
                _ => None,
            };
            items.push(OrderItem { path, direction });

            if parser.eat(&TokenKind::Comma) {
                continue;
            }
            parser.expect_end()?;
            return Ok(Self(items));
        }
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.0
    }

    pub fn normalize_field_tokens(self) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|item| OrderItem {
                    path: normalize_path(item.path),
                    direction: item.direction,
                })
                .collect(),
        )
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Words that cannot be used as a bare path
const RESERVED: &[&str] = &[
    "and", "or", "not", "eq", "ne", "gt", "ge", "lt", "le", "has", "in", "add", "sub", "mul",
    "div", "divby", "mod", "asc", "desc",
];

/// Words rendered as unquoted literals
const KEYWORD_LITERALS: &[&str] = &["true", "false", "null"];

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, ODataError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ODataError::Empty);
        }
        Ok(Self {
            tokens,
            index: 0,
            depth: 0,
        })
    }

    /// Runs `parse` one nesting level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ODataError>,
    ) -> Result<T, ODataError> {
        if self.depth >= MAX_DEPTH {
            return Err(ODataError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + offset).map(|t| &t.kind)
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ODataError> {
        if self.eat(kind) {
            return Ok(());
        }
        match self.peek() {
            Some(t) => Err(Self::unexpected(t, expected)),
            None => Err(ODataError::UnexpectedEnd(expected)),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(word),
                ..
            }) => Some(word.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(token: &Token, expected: &'static str) -> ODataError {
        ODataError::UnexpectedToken {
            found: token.kind.describe(),
            pos: token.pos,
            expected,
        }
    }

    fn expect_end(&self) -> Result<(), ODataError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(Self::unexpected(token, "end of expression")),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ODataError> {
        let mut left = self.parse_and()?;
        while self.peek_word() == Some("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::compare(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ODataError> {
        let mut left = self.parse_unary()?;
        while self.peek_word() == Some("and") {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::compare(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ODataError> {
        if self.peek_word() == Some("not") {
            self.advance();
            let inner = self.nested(Self::parse_unary)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, ODataError> {
        let left = self.parse_additive()?;
        if self.peek_word() == Some("in") {
            self.advance();
            let list = self.parse_list()?;
            return Ok(Expr::compare(BinaryOp::In, left, list));
        }
        if let Some(op) = self.peek_word().and_then(BinaryOp::comparison) {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Expr::compare(op, left, right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ODataError> {
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.peek_word().and_then(BinaryOp::additive) {
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::compare(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ODataError> {
        let mut left = self.parse_primary()?;
        while let Some(op) = self.peek_word().and_then(BinaryOp::multiplicative) {
            self.advance();
            let right = self.parse_primary()?;
            left = Expr::compare(op, left, right);
        }
        Ok(left)
    }

    fn parse_list(&mut self) -> Result<Expr, ODataError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let items = self.nested(|p| {
            let mut items = vec![p.parse_or()?];
            while p.eat(&TokenKind::Comma) {
                items.push(p.parse_or()?);
            }
            Ok(items)
        })?;
        self.expect(&TokenKind::RParen, "',' or ')'")?;
        Ok(Expr::List(items))
    }

    /// Parses the part of `path/any(...)` after the path's final `/`
    fn parse_lambda(&mut self, collection: Vec<String>, op: LambdaOp) -> Result<Expr, ODataError> {
        // operator name and "("
        self.index += 2;
        if self.eat(&TokenKind::RParen) {
            return Ok(Expr::Lambda {
                collection,
                op,
                variable: None,
                predicate: None,
            });
        }

        let variable = self.parse_segment()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let predicate = self.nested(Self::parse_or)?;
        self.expect(&TokenKind::RParen, "')'")?;

        Ok(Expr::Lambda {
            collection,
            op,
            variable: Some(variable),
            predicate: Some(Box::new(predicate)),
        })
    }

    /// A path, possibly ending in a lambda operator
    fn parse_path_operand(&mut self) -> Result<Expr, ODataError> {
        let mut segments = vec![self.parse_segment()?];
        while self.eat(&TokenKind::Slash) {
            let lambda = match (self.peek_word(), self.peek_kind_at(1)) {
                (Some(word), Some(TokenKind::LParen)) => LambdaOp::from_word(word),
                _ => None,
            };
            if let Some(op) = lambda {
                return self.parse_lambda(segments, op);
            }
            segments.push(self.parse_segment()?);
        }
        Ok(Expr::Path(segments))
    }

    fn parse_primary(&mut self) -> Result<Expr, ODataError> {
        // every operand passes here, which bounds the size of the tree
        if self.index >= MAX_TOKENS {
            return Err(ODataError::TooLong(MAX_TOKENS));
        }
        let token = self
            .peek()
            .cloned()
            .ok_or(ODataError::UnexpectedEnd("operand"))?;

        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.nested(Self::parse_or)?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Expr::Group(Box::new(inner)))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expr::Str(value))
            }
            TokenKind::Bare(raw) => {
                self.advance();
                Ok(Expr::Literal(raw))
            }
            TokenKind::Ident(ref word) if KEYWORD_LITERALS.contains(&word.as_str()) => {
                self.advance();
                Ok(Expr::Literal(word.clone()))
            }
            TokenKind::Ident(ref word)
                if self.tokens.get(self.index + 1).map(|t| &t.kind)
                    == Some(&TokenKind::LParen) =>
            {
                let name = word.clone();
                self.index += 2;
                let mut args = Vec::new();
                if !self.eat(&TokenKind::RParen) {
                    args = self.nested(|p| {
                        let mut args = vec![p.parse_or()?];
                        while p.eat(&TokenKind::Comma) {
                            args.push(p.parse_or()?);
                        }
                        Ok(args)
                    })?;
                    self.expect(&TokenKind::RParen, "',' or ')'")?;
                }
                Ok(Expr::Call { name, args })
            }
            TokenKind::Ident(_) => self.parse_path_operand(),
            _ => Err(Self::unexpected(&token, "operand")),
        }
    }

    fn parse_path(&mut self) -> Result<Vec<String>, ODataError> {
        let mut segments = vec![self.parse_segment()?];
        while self.eat(&TokenKind::Slash) {
            segments.push(self.parse_segment()?);
        }
        Ok(segments)
    }

    fn parse_segment(&mut self) -> Result<String, ODataError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(word),
                pos,
            }) => {
                if RESERVED.contains(&word.as_str()) {
                    Err(ODataError::UnexpectedToken {
                        found: word,
                        pos,
                        expected: "property name",
                    })
                } else {
                    Ok(word)
                }
            }
            Some(token) => Err(Self::unexpected(&token, "property name")),
            None => Err(ODataError::UnexpectedEnd("property name")),
        }
    }
}
