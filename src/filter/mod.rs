//! SCIM filter expressions (RFC 7644 §3.4.2.2).
//!
//! Filters are tokenized, parsed into an [`Expr`] tree with `not` binding
//! tighter than `and`, and `and` tighter than `or`, then resolved against a
//! [`QueryableAttributes`] map into a backend-agnostic [`Predicate`].
//! Value selectors (`emails[type eq "work"]`) are not accepted inside filters.
//!
//! # Examples
//!
//! ```rust
//! use scim_core::filter::{Filter, QueryableAttributes};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let filter: Filter = r#"userName eq "BJensen" and not (active eq false)"#.parse()?;
//! assert_eq!(filter.to_string(), r#"userName eq "BJensen" and not active eq false"#);
//!
//! let queryable = QueryableAttributes::new()
//!     .with("userName", "user_name")
//!     .with("active", "active");
//! let predicate = filter.evaluate(&queryable)?;
//!
//! let row = json!({"user_name": "bjensen", "active": true});
//! assert!(predicate.matches(row.as_object().unwrap()));
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod evaluate;
pub mod lexer;
pub mod parser;

pub use ast::{CompareOp, Expr, Literal, RpnToken};
pub use evaluate::{Predicate, QueryableAttributes};

use crate::error::FilterError;
use std::fmt;
use std::str::FromStr;

/// A parsed filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    expr: Expr,
}

impl Filter {
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        Ok(Self {
            expr: parser::parse(text)?,
        })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    pub fn to_rpn(&self) -> Vec<RpnToken> {
        self.expr.to_rpn()
    }

    /// Resolve the filter into a predicate over backend fields.
    ///
    /// Fails with [`FilterError::UnmappedAttribute`] when any referenced path
    /// is not queryable.
    pub fn evaluate(&self, attributes: &QueryableAttributes) -> Result<Predicate, FilterError> {
        Predicate::resolve(&self.expr, attributes)
    }
}

impl From<Expr> for Filter {
    fn from(expr: Expr) -> Self {
        Self { expr }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.expr, f)
    }
}
