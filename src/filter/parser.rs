//! Recursive-descent filter parser.
//!
//! ```text
//! filter  = or
//! or      = and { "or" and }
//! and     = not { "and" not }
//! not     = "not" not | primary
//! primary = "(" filter ")" | attrPath "pr" | attrPath compareOp literal
//! literal = STRING | NUMBER | "true" | "false" | "null"
//! ```
//!
//! Keywords and operators are case-insensitive.

use super::ast::{CompareOp, Expr, Literal};
use super::lexer::{Token, TokenKind, tokenize};
use crate::error::FilterError;

/// Maximum accepted filter length in bytes.
pub const MAX_FILTER_LENGTH: usize = 4096;

/// Maximum nesting of parentheses and `not`.
pub const MAX_FILTER_DEPTH: usize = 32;

pub fn parse(input: &str) -> Result<Expr, FilterError> {
    if input.len() > MAX_FILTER_LENGTH {
        return Err(FilterError::TooLong {
            length: input.len(),
            max: MAX_FILTER_LENGTH,
        });
    }
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FilterError::Empty);
    }

    let mut parser = Parser {
        tokens,
        position: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(unexpected(token)),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) if word.eq_ignore_ascii_case(keyword) => {
                self.position += 1;
                true
            }
            _ => false,
        }
    }

    fn enter(&mut self) -> Result<(), FilterError> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(FilterError::TooDeep {
                max: MAX_FILTER_DEPTH,
            });
        }
        Ok(())
    }

    fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_and()?;
        while self.try_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_not()?;
        while self.try_keyword("and") {
            let right = self.parse_not()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterError> {
        if self.try_keyword("not") {
            self.enter()?;
            let inner = self.parse_not()?;
            self.exit();
            return Ok(Expr::not(inner));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, FilterError> {
        let token = self.advance().ok_or(FilterError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.exit();
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(unexpected(&other)),
                    None => Err(FilterError::UnexpectedEnd),
                }
            }
            TokenKind::Word(path) if !is_reserved(&path) => self.parse_comparison(path),
            _ => Err(unexpected(&token)),
        }
    }

    fn parse_comparison(&mut self, path: String) -> Result<Expr, FilterError> {
        let operator = match self.advance() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) => word,
            _ => return Err(FilterError::MissingOperator { attribute: path }),
        };

        if operator.eq_ignore_ascii_case("pr") {
            return Ok(Expr::Present { path });
        }
        let op = CompareOp::from_keyword(&operator)
            .ok_or(FilterError::UnknownOperator { operator })?;

        let token = self.advance().ok_or(FilterError::UnexpectedEnd)?;
        let value = literal(&token)?;
        Ok(Expr::Compare { path, op, value })
    }
}

fn literal(token: &Token) -> Result<Literal, FilterError> {
    match &token.kind {
        TokenKind::Str(s) => Ok(Literal::String(s.clone())),
        TokenKind::Number(text) => parse_number(text),
        TokenKind::Word(word) => match word.to_ascii_lowercase().as_str() {
            "true" => Ok(Literal::Boolean(true)),
            "false" => Ok(Literal::Boolean(false)),
            "null" => Ok(Literal::Null),
            _ => Err(FilterError::InvalidLiteral {
                literal: word.clone(),
            }),
        },
        TokenKind::LParen | TokenKind::RParen => Err(unexpected(token)),
    }
}

fn parse_number(text: &str) -> Result<Literal, FilterError> {
    let invalid = || FilterError::InvalidLiteral {
        literal: text.to_string(),
    };
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if unsigned.contains(['.', 'e', 'E']) {
        let value: f64 = unsigned.parse().map_err(|_| invalid())?;
        if value.is_finite() {
            Ok(Literal::Decimal(value))
        } else {
            Err(invalid())
        }
    } else if let Ok(value) = unsigned.parse() {
        Ok(Literal::Integer(value))
    } else {
        // Integers beyond i64 are still valid JSON numbers.
        let digits = unsigned.strip_prefix('-').unwrap_or(unsigned);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        unsigned.parse().map(Literal::Decimal).map_err(|_| invalid())
    }
}

fn is_reserved(word: &str) -> bool {
    ["and", "or", "not", "pr"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

fn unexpected(token: &Token) -> FilterError {
    FilterError::UnexpectedToken {
        token: token.text(),
        position: token.position,
    }
}
