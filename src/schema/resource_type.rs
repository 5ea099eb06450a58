//! Resource types: a primary schema composed with extension schemas.

use super::embedded;
use super::types::{AttributeDefinition, Schema, find_by_name};
use crate::error::{ValidationError, ValidationErrors};
use crate::resource::{AttributeTree, builder};
use serde_json::Value;
use std::sync::Arc;

/// An extension schema attached to a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaExtension {
    pub schema: Arc<Schema>,
    pub required: bool,
}

/// A named composition of one primary schema plus optional extension schemas.
///
/// Extension attributes live under the extension's URN, both in resource JSON
/// and in [`AttributeTree`]s built for this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceType {
    pub name: String,
    pub endpoint: String,
    pub schema: Arc<Schema>,
    pub extensions: Vec<SchemaExtension>,
}

impl ResourceType {
    /// Schema URIs in declaration order, primary first.
    pub fn schema_ids(&self) -> Vec<&str> {
        std::iter::once(self.schema.id.as_str())
            .chain(self.extensions.iter().map(|ext| ext.schema.id.as_str()))
            .collect()
    }

    /// Find an extension by its schema URI, ignoring case.
    pub fn extension(&self, uri: &str) -> Option<&SchemaExtension> {
        self.extensions
            .iter()
            .find(|ext| ext.schema.id.eq_ignore_ascii_case(uri))
    }

    /// Whether `uri` names the primary schema or one of the extensions.
    pub fn has_schema(&self, uri: &str) -> bool {
        self.schema.id.eq_ignore_ascii_case(uri) || self.extension(uri).is_some()
    }

    /// Top-level attribute of the primary schema or a common attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.schema
            .attribute(name)
            .or_else(|| find_by_name(embedded::common_attributes(), name))
    }

    /// Attribute definitions addressable at the given namespace.
    ///
    /// `None` is the resource root (primary schema plus common attributes).
    pub(crate) fn namespace_attributes(&self, namespace: Option<&str>) -> Option<&[AttributeDefinition]> {
        match namespace {
            None => Some(self.schema.attributes.as_slice()),
            Some(uri) if self.schema.id.eq_ignore_ascii_case(uri) => {
                Some(self.schema.attributes.as_slice())
            }
            Some(uri) => self
                .extension(uri)
                .map(|ext| ext.schema.attributes.as_slice()),
        }
    }

    /// Split a leading schema URI off an attribute path.
    ///
    /// Returns the matched schema id (if any) and the remaining attribute path.
    /// `"urn:...:enterprise:2.0:User:manager.value"` yields the enterprise URN and
    /// `"manager.value"`.
    pub fn split_schema_prefix<'p>(&self, path: &'p str) -> (Option<&str>, &'p str) {
        for id in self.schema_ids() {
            if path.len() > id.len()
                && path.is_char_boundary(id.len())
                && path[..id.len()].eq_ignore_ascii_case(id)
                && path[id.len()..].starts_with(':')
            {
                return (Some(id), &path[id.len() + 1..]);
            }
        }
        (None, path)
    }

    /// Locate an attribute definition by path segments.
    ///
    /// The first segment may be a schema URI. Numeric segments address a
    /// collection element rather than a distinct attribute and are skipped, so
    /// `["emails", "0", "value"]` finds the same definition as
    /// `["emails", "value"]`.
    pub fn find_attribute(&self, segments: &[&str]) -> Option<&AttributeDefinition> {
        let mut segments = segments.iter().copied().filter(|s| s.parse::<usize>().is_err());
        let first = segments.next()?;

        let mut current = if self.has_schema(first) {
            let attrs = self.namespace_attributes(Some(first))?;
            find_by_name(attrs, segments.next()?)?
        } else {
            self.attribute(first)?
        };

        for segment in segments {
            current = current.sub_attribute(segment)?;
        }
        Some(current)
    }

    /// Locate an attribute definition from a dotted path, with an optional
    /// leading schema URI.
    pub fn find_attribute_path(&self, path: &str) -> Option<&AttributeDefinition> {
        let (schema, rest) = self.split_schema_prefix(path);
        let mut segments: Vec<&str> = Vec::new();
        if let Some(schema) = schema {
            segments.push(schema);
        }
        segments.extend(rest.split('.'));
        self.find_attribute(&segments)
    }

    /// Build an attribute tree from raw resource JSON.
    ///
    /// Building never fails outright: unknown keys and unusable shapes are
    /// reported alongside the tree. Type conformance is left to [`Self::validate`].
    pub fn build_tree(&self, raw: &Value) -> (AttributeTree, Vec<ValidationError>) {
        builder::build_tree(self, raw)
    }

    /// Validate a tree against this resource type's schemas.
    pub fn validate(&self, tree: &AttributeTree) -> Result<(), ValidationErrors> {
        super::validation::validate_tree(self, tree)
    }
}
