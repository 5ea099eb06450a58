//! PATCH path parsing (RFC 7644 §3.5.2).
//!
//! ```text
//! path     = [URN ":"] attrPath
//! attrPath = ATTRNAME ["." SUBATTR]
//!          | ATTRNAME "[" SUBATTR "eq" literal "]" ["." SUBATTR]
//! ```
//!
//! Only a single equality condition is accepted inside the brackets. Any
//! other operator, presence test or logical combination is rejected rather
//! than approximated.

use crate::error::PathError;
use crate::filter::{CompareOp, Expr, Filter, Literal};
use std::fmt;
use std::str::FromStr;

/// A collection element selector, `[attribute eq value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub attribute: String,
    pub value: Literal,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} eq {}", self.attribute, self.value)
    }
}

/// A parsed PATCH path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSpec {
    raw: String,
    /// Schema URI qualifying the attribute, if given.
    pub schema: Option<String>,
    pub attribute: String,
    pub selector: Option<Selector>,
    pub sub_attribute: Option<String>,
}

impl PathSpec {
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let raw = text.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let (head, bracket) = match raw.find('[') {
            Some(open) => (&raw[..open], Some(open)),
            None => (raw, None),
        };
        let (schema, attr_part) = split_urn(raw, head)?;

        let mut spec = Self {
            raw: raw.to_string(),
            schema,
            attribute: String::new(),
            selector: None,
            sub_attribute: None,
        };

        match bracket {
            None => {
                let mut names = attr_part.split('.');
                spec.attribute = checked_name(raw, names.next())?;
                spec.sub_attribute = names.next().map(|n| checked_name(raw, Some(n))).transpose()?;
                if names.next().is_some() {
                    return Err(PathError::malformed(raw, "too many '.' separators"));
                }
            }
            Some(open) => {
                spec.attribute = checked_name(raw, Some(attr_part))?;
                let close = closing_bracket(raw, open)?;
                spec.selector = Some(parse_selector(raw, &raw[open + 1..close])?);

                let rest = &raw[close + 1..];
                if !rest.is_empty() {
                    let sub = rest
                        .strip_prefix('.')
                        .ok_or_else(|| PathError::malformed(raw, "expected '.' after ']'"))?;
                    spec.sub_attribute = Some(checked_name(raw, Some(sub))?);
                }
            }
        }

        Ok(spec)
    }

    /// A plain path to one attribute, optionally in an extension namespace.
    pub fn attribute(schema: Option<&str>, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        let raw = match schema {
            Some(uri) => format!("{}:{}", uri, attribute),
            None => attribute.clone(),
        };
        Self {
            raw,
            schema: schema.map(str::to_string),
            attribute,
            selector: None,
            sub_attribute: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PathSpec {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split a schema URI off the part of the path before any selector.
fn split_urn<'a>(raw: &str, head: &'a str) -> Result<(Option<String>, &'a str), PathError> {
    match head.rfind(':') {
        None => Ok((None, head)),
        Some(colon) => {
            let (urn, attr) = (&head[..colon], &head[colon + 1..]);
            if !urn.to_ascii_lowercase().starts_with("urn:") {
                return Err(PathError::malformed(raw, "schema prefix must be a URN"));
            }
            Ok((Some(urn.to_string()), attr))
        }
    }
}

fn checked_name(raw: &str, name: Option<&str>) -> Result<String, PathError> {
    let name = name.unwrap_or_default();
    let mut chars = name.chars();
    let valid_start = match chars.next() {
        Some('$') => name == "$ref",
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    };
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$') {
        Ok(name.to_string())
    } else {
        Err(PathError::malformed(raw, format!("invalid attribute name '{}'", name)))
    }
}

/// Index of the `]` closing the selector opened at `open`, skipping string
/// literals.
fn closing_bracket(raw: &str, open: usize) -> Result<usize, PathError> {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw[open + 1..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '[' if !in_string => {
                return Err(PathError::UnsupportedSelector {
                    path: raw.to_string(),
                });
            }
            ']' if !in_string => return Ok(open + 1 + i),
            _ => {}
        }
    }
    Err(PathError::malformed(raw, "unclosed '['"))
}

fn parse_selector(raw: &str, inner: &str) -> Result<Selector, PathError> {
    let filter = Filter::parse(inner).map_err(|e| PathError::malformed(raw, e.to_string()))?;
    match filter.into_expr() {
        Expr::Compare {
            path,
            op: CompareOp::Eq,
            value,
        } => {
            let attribute = checked_name(raw, Some(&path))?;
            Ok(Selector { attribute, value })
        }
        Expr::Compare { op, .. } => Err(PathError::UnsupportedSelectorOperator {
            path: raw.to_string(),
            operator: op.to_string(),
        }),
        Expr::Present { .. } => Err(PathError::UnsupportedSelectorOperator {
            path: raw.to_string(),
            operator: "pr".to_string(),
        }),
        Expr::And(..) | Expr::Or(..) | Expr::Not(_) => Err(PathError::UnsupportedSelector {
            path: raw.to_string(),
        }),
    }
}
