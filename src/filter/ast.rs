//! Filter expression tree.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Comparison operators (RFC 7644 §3.4.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Parse an operator keyword, ignoring case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "co" => Some(Self::Co),
            "sw" => Some(Self::Sw),
            "ew" => Some(Self::Ew),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Co => "co",
            Self::Sw => "sw",
            Self::Ew => "ew",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }

    /// Equality-class operators compare strings ignoring case; ordering
    /// operators do not.
    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Co | Self::Sw | Self::Ew)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comparison value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Decimal(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Null => Value::Null,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // JSON string encoding, the inverse of the lexer's decoding.
            Self::String(s) => write!(f, "{}", Value::String(s.clone())),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Decimal(n) => write!(f, "{:?}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Null => f.write_str("null"),
        }
    }
}

/// A parsed filter expression. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        path: String,
        op: CompareOp,
        value: Literal,
    },
    Present {
        path: String,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Expr) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Every attribute path referenced, left to right.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare { path, .. } | Self::Present { path } => out.push(path),
            Self::And(left, right) | Self::Or(left, right) => {
                left.collect_paths(out);
                right.collect_paths(out);
            }
            Self::Not(inner) => inner.collect_paths(out),
        }
    }

    /// Reverse-Polish form: operands before their operator.
    pub fn to_rpn(&self) -> Vec<RpnToken> {
        let mut out = Vec::new();
        self.push_rpn(&mut out);
        out
    }

    fn push_rpn(&self, out: &mut Vec<RpnToken>) {
        match self {
            Self::Compare { path, op, value } => out.push(RpnToken::Compare {
                path: path.clone(),
                op: *op,
                value: value.clone(),
            }),
            Self::Present { path } => out.push(RpnToken::Present { path: path.clone() }),
            Self::And(left, right) => {
                left.push_rpn(out);
                right.push_rpn(out);
                out.push(RpnToken::And);
            }
            Self::Or(left, right) => {
                left.push_rpn(out);
                right.push_rpn(out);
                out.push(RpnToken::Or);
            }
            Self::Not(inner) => {
                inner.push_rpn(out);
                out.push(RpnToken::Not);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            Self::Not(_) => 3,
            Self::Compare { .. } | Self::Present { .. } => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Renders canonical filter text. Parentheses appear only where precedence
/// or left-associativity requires them, so re-parsing yields the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { path, op, value } => write!(f, "{} {} {}", path, op, value),
            Self::Present { path } => write!(f, "{} pr", path),
            Self::And(left, right) => {
                left.fmt_operand(f, 2)?;
                f.write_str(" and ")?;
                right.fmt_operand(f, 3)
            }
            Self::Or(left, right) => {
                left.fmt_operand(f, 1)?;
                f.write_str(" or ")?;
                right.fmt_operand(f, 2)
            }
            Self::Not(inner) => {
                f.write_str("not ")?;
                inner.fmt_operand(f, 3)
            }
        }
    }
}

/// One token of an expression's reverse-Polish form.
#[derive(Debug, Clone, PartialEq)]
pub enum RpnToken {
    Compare {
        path: String,
        op: CompareOp,
        value: Literal,
    },
    Present {
        path: String,
    },
    And,
    Or,
    Not,
}

impl fmt::Display for RpnToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { path, op, value } => write!(f, "{} {} {}", path, op, value),
            Self::Present { path } => write!(f, "{} pr", path),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Not => f.write_str("not"),
        }
    }
}
