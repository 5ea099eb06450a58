//! Filter tokenizer.
//!
//! Words (attribute paths, operators, keywords) are split on whitespace and
//! parentheses; the parser decides what each word means. String literals use
//! JSON string syntax and are decoded with `serde_json`.

use crate::error::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An attribute path, operator or keyword.
    Word(String),
    /// A decoded string literal.
    Str(String),
    /// A numeric literal, kept as written.
    Number(String),
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub position: usize,
}

impl Token {
    /// Source-like text for error messages.
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Word(w) | TokenKind::Number(w) => w.clone(),
            TokenKind::Str(s) => serde_json::Value::String(s.clone()).to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::LParen,
                    position,
                });
            }
            ')' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::RParen,
                    position,
                });
            }
            '[' | ']' => return Err(FilterError::NestedFilter { position }),
            '"' => {
                let end = string_end(input, position)?;
                let raw = &input[position..end];
                let decoded: String = serde_json::from_str(raw)
                    .map_err(|_| FilterError::InvalidLiteral { literal: raw.to_string() })?;
                tokens.push(Token {
                    kind: TokenKind::Str(decoded),
                    position,
                });
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let word = take_word(&mut chars, input, position);
                tokens.push(Token {
                    kind: TokenKind::Number(word.to_string()),
                    position,
                });
            }
            c if is_word_start(c) => {
                let word = take_word(&mut chars, input, position);
                if let Some(offset) = word.find(['[', ']']) {
                    return Err(FilterError::NestedFilter {
                        position: position + offset,
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Word(word.to_string()),
                    position,
                });
            }
            other => {
                return Err(FilterError::UnexpectedCharacter {
                    ch: other,
                    position,
                });
            }
        }
    }

    Ok(tokens)
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '$' || c == '_'
}

fn is_word_char(c: char) -> bool {
    !(c.is_whitespace() || c == '(' || c == ')' || c == '"')
}

fn take_word<'a>(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    input: &'a str,
    start: usize,
) -> &'a str {
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if !is_word_char(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    &input[start..end]
}

/// Byte offset just past the closing quote of the string starting at `start`.
fn string_end(input: &str, start: usize) -> Result<usize, FilterError> {
    let mut escaped = false;
    for (i, c) in input[start + 1..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Ok(start + 1 + i + 1),
            _ => {}
        }
    }
    Err(FilterError::UnterminatedString { position: start })
}
