//! The runtime attribute tree.
//!
//! An [`AttributeTree`] maps attribute names to [`AttributeValue`]s: a scalar,
//! a nested tree for complex attributes, or an ordered list for multi-valued
//! attributes. Extension attributes live in a nested tree keyed by the
//! extension schema URI. Lookups ignore attribute name case, as SCIM does.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A value held by an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A simple value. Kept as raw JSON so validation can report type
    /// mismatches instead of coercing.
    Scalar(Value),
    /// A complex value.
    Complex(AttributeTree),
    /// The values of a multi-valued attribute, in order.
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Build a value from JSON with no schema guidance.
    pub fn from_json_untyped(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let mut tree = AttributeTree::new();
                for (key, item) in map {
                    tree.insert(key.clone(), Self::from_json_untyped(item));
                }
                Self::Complex(tree)
            }
            Value::Array(items) => Self::List(items.iter().map(Self::from_json_untyped).collect()),
            other => Self::Scalar(other.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Complex(tree) => tree.to_json(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Null scalars and empty lists count as "no value".
    pub fn is_unassigned(&self) -> bool {
        match self {
            Self::Scalar(value) => value.is_null(),
            Self::Complex(_) => false,
            Self::List(items) => items.is_empty(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    pub fn as_complex(&self) -> Option<&AttributeTree> {
        match self {
            Self::Complex(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_complex_mut(&mut self) -> Option<&mut AttributeTree> {
        match self {
            Self::Complex(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<AttributeValue>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short shape name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Complex(_) => "complex",
            Self::List(_) => "array",
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        Self::from_json_untyped(&value)
    }
}

impl From<AttributeTree> for AttributeValue {
    fn from(tree: AttributeTree) -> Self {
        Self::Complex(tree)
    }
}

/// Mapping from attribute name to value for one resource instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTree {
    attributes: BTreeMap<String, AttributeValue>,
}

impl AttributeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored key matching `name`, ignoring case.
    fn key_for(&self, name: &str) -> Option<&String> {
        if let Some((key, _)) = self.attributes.get_key_value(name) {
            return Some(key);
        }
        self.attributes
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        let key = self.key_for(name)?;
        self.attributes.get(key)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeValue> {
        let key = self.key_for(name)?.clone();
        self.attributes.get_mut(&key)
    }

    /// Insert a value, replacing any entry whose name differs only in case.
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        let name = name.into();
        let previous = self.remove(&name);
        self.attributes.insert(name, value);
        previous
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let key = self.key_for(name)?.clone();
        self.attributes.remove(&key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.key_for(name).is_some()
    }

    /// Get the value for `name`, inserting `default()` first if absent.
    pub fn entry_or_insert_with(
        &mut self,
        name: &str,
        default: impl FnOnce() -> AttributeValue,
    ) -> &mut AttributeValue {
        let key = self
            .key_for(name)
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.attributes.entry(key).or_insert_with(default)
    }

    /// Follow a dotted sequence of names through nested complex values.
    pub fn get_path(&self, segments: &[&str]) -> Option<&AttributeValue> {
        let (first, rest) = segments.split_first()?;
        let value = self.get(first)?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.as_complex()?.get_path(rest)
        }
    }

    /// String value of a direct scalar attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeTree {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        let mut tree = Self::new();
        for (name, value) in iter {
            tree.insert(name, value);
        }
        tree
    }
}
