//! Resolving filters against backend fields.
//!
//! A [`QueryableAttributes`] map decides which attribute paths may appear in
//! a filter and which backend field each one reads. Resolution produces a
//! [`Predicate`] over backend field names that host glue can translate into
//! its own query language, or evaluate in memory with [`Predicate::matches`].

use super::ast::{CompareOp, Expr, Literal};
use crate::error::FilterError;
use crate::mapper::EntityFields;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Host-supplied mapping from attribute path to backend field.
///
/// Paths match case-insensitively. Backend fields may be dotted to reach
/// into nested objects or arrays of sub-entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryableAttributes {
    fields: HashMap<String, String>,
    schema_prefixes: Vec<String>,
}

impl QueryableAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, field: impl Into<String>) {
        self.fields
            .insert(path.into().to_ascii_lowercase(), field.into());
    }

    pub fn with(mut self, path: impl Into<String>, field: impl Into<String>) -> Self {
        self.insert(path, field);
        self
    }

    /// Also accept paths qualified with this schema URI, such as
    /// `urn:ietf:params:scim:schemas:core:2.0:User:userName`.
    pub fn with_schema_prefix(mut self, uri: impl Into<String>) -> Self {
        let mut prefix = uri.into().to_ascii_lowercase();
        prefix.push(':');
        self.schema_prefixes.push(prefix);
        self
    }

    /// The backend field for an attribute path.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        let lower = path.to_ascii_lowercase();
        if let Some(field) = self.fields.get(&lower) {
            return Some(field);
        }
        self.schema_prefixes
            .iter()
            .filter_map(|prefix| lower.strip_prefix(prefix.as_str()))
            .find_map(|rest| self.fields.get(rest))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryableAttributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attributes = Self::new();
        for (path, field) in iter {
            attributes.insert(path, field);
        }
        attributes
    }
}

/// A filter resolved to backend field names.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: String,
        op: CompareOp,
        value: Literal,
        /// Whether string comparison folds case.
        case_insensitive: bool,
    },
    Present {
        field: String,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Resolve every path first so an unmapped one fails before any
    /// predicate is built.
    pub(crate) fn resolve(expr: &Expr, attributes: &QueryableAttributes) -> Result<Self, FilterError> {
        if let Some(unmapped) = expr.paths().into_iter().find(|p| attributes.resolve(p).is_none()) {
            return Err(FilterError::UnmappedAttribute {
                attribute: unmapped.to_string(),
            });
        }
        Self::build(expr, attributes)
    }

    fn build(expr: &Expr, attributes: &QueryableAttributes) -> Result<Self, FilterError> {
        let field = |path: &str| {
            attributes
                .resolve(path)
                .map(str::to_string)
                .ok_or_else(|| FilterError::UnmappedAttribute {
                    attribute: path.to_string(),
                })
        };
        Ok(match expr {
            Expr::Compare { path, op, value } => Self::Compare {
                field: field(path)?,
                op: *op,
                value: value.clone(),
                case_insensitive: op.is_case_insensitive(),
            },
            Expr::Present { path } => Self::Present { field: field(path)? },
            Expr::And(left, right) => Self::And(
                Box::new(Self::build(left, attributes)?),
                Box::new(Self::build(right, attributes)?),
            ),
            Expr::Or(left, right) => Self::Or(
                Box::new(Self::build(left, attributes)?),
                Box::new(Self::build(right, attributes)?),
            ),
            Expr::Not(inner) => Self::Not(Box::new(Self::build(inner, attributes)?)),
        })
    }

    /// Backend fields the predicate reads, left to right.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Compare { field, .. } | Self::Present { field } => vec![field.as_str()],
            Self::And(left, right) | Self::Or(left, right) => {
                let mut fields = left.fields();
                fields.extend(right.fields());
                fields
            }
            Self::Not(inner) => inner.fields(),
        }
    }

    /// Evaluate against an entity's fields.
    ///
    /// A field holding an array matches when any element matches, except for
    /// `ne`, which holds only when no element is equal.
    pub fn matches(&self, entity: &EntityFields) -> bool {
        match self {
            Self::Present { field } => lookup(entity, field).into_iter().any(is_present),
            Self::Compare {
                field,
                op,
                value,
                case_insensitive,
            } => {
                let candidates = lookup(entity, field);
                match (op, value) {
                    (CompareOp::Eq, Literal::Null) => !candidates.into_iter().any(is_present),
                    (CompareOp::Ne, Literal::Null) => candidates.into_iter().any(is_present),
                    (CompareOp::Ne, _) => !candidates
                        .into_iter()
                        .any(|v| compare(v, CompareOp::Eq, value, *case_insensitive)),
                    _ => candidates
                        .into_iter()
                        .any(|v| compare(v, *op, value, *case_insensitive)),
                }
            }
            Self::And(left, right) => left.matches(entity) && right.matches(entity),
            Self::Or(left, right) => left.matches(entity) || right.matches(entity),
            Self::Not(inner) => !inner.matches(entity),
        }
    }
}

/// Values at a dotted field path, with arrays flattened along the way.
fn lookup<'a>(entity: &'a EntityFields, field: &str) -> Vec<&'a Value> {
    let mut segments = field.split('.');
    let Some(first) = segments.next().and_then(|s| entity.get(s)) else {
        return Vec::new();
    };
    let mut current = flatten(first);
    for segment in segments {
        current = current
            .into_iter()
            .filter_map(|v| v.get(segment))
            .flat_map(flatten)
            .collect();
    }
    current
}

fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => map.values().any(is_present),
        _ => true,
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Literal, case_insensitive: bool) -> bool {
    match (actual, expected) {
        (Value::String(actual), Literal::String(expected)) => {
            compare_strings(actual, op, expected, case_insensitive)
        }
        (Value::Number(actual), Literal::Integer(_) | Literal::Decimal(_)) => {
            let ordering = match (actual.as_i64(), expected) {
                (Some(a), Literal::Integer(e)) => Some(a.cmp(e)),
                _ => actual
                    .as_f64()
                    .zip(literal_f64(expected))
                    .and_then(|(a, e)| a.partial_cmp(&e)),
            };
            ordering.is_some_and(|o| ordering_matches(op, o))
        }
        (Value::Bool(actual), Literal::Boolean(expected)) => match op {
            CompareOp::Eq => actual == expected,
            _ => false,
        },
        _ => false,
    }
}

fn literal_f64(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Integer(n) => Some(*n as f64),
        Literal::Decimal(n) => Some(*n),
        _ => None,
    }
}

fn compare_strings(actual: &str, op: CompareOp, expected: &str, case_insensitive: bool) -> bool {
    // Date-times compare as instants, whatever offset each side was written in.
    if matches!(op, CompareOp::Eq | CompareOp::Ne) || op.is_ordering() {
        if let (Some(a), Some(e)) = (parse_date(actual), parse_date(expected)) {
            return ordering_matches(op, a.cmp(&e));
        }
    }
    if op.is_ordering() {
        return ordering_matches(op, actual.cmp(expected));
    }

    let (actual, expected) = if case_insensitive {
        (actual.to_lowercase(), expected.to_lowercase())
    } else {
        (actual.to_string(), expected.to_string())
    };
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Ne => actual != expected,
        CompareOp::Co => actual.contains(&expected),
        CompareOp::Sw => actual.starts_with(&expected),
        CompareOp::Ew => actual.ends_with(&expected),
        _ => false,
    }
}

fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok()
}

fn ordering_matches(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Co | CompareOp::Sw | CompareOp::Ew => false,
    }
}

/// Literal equality used by PATCH selectors: strings compare ignoring case
/// unless `case_exact`, numbers by value.
pub(crate) fn literal_equals(actual: &Value, expected: &Literal, case_exact: bool) -> bool {
    match (actual, expected) {
        (Value::String(a), Literal::String(e)) if case_exact => a == e,
        (Value::Null, Literal::Null) => true,
        _ => compare(actual, CompareOp::Eq, expected, true),
    }
}
