//! A validated resource instance ready to render.

use crate::error::{ScimError, ScimResult, ValidationErrors};
use crate::resource::{AttributeTree, ResourceVersion, serialization};
use crate::schema::ResourceType;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Server-maintained resource metadata (RFC 7643 §3.1).
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Absolute URI of the resource, when a base URL is configured.
    pub location: Option<String>,
}

impl Meta {
    /// Metadata for a resource created now.
    pub fn new_now() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            last_modified: now,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// An attribute tree bound to its resource type.
///
/// The tree holds `id` and `externalId` like any other attribute; `meta` is
/// rendered from [`Meta`] rather than from the tree, since clients cannot
/// write it.
#[derive(Debug, Clone)]
pub struct Resource {
    resource_type: Arc<ResourceType>,
    tree: AttributeTree,
    meta: Option<Meta>,
}

impl Resource {
    pub fn new(resource_type: Arc<ResourceType>, tree: AttributeTree) -> Self {
        Self {
            resource_type,
            tree,
            meta: None,
        }
    }

    /// Build and validate a resource from inbound JSON.
    ///
    /// Build errors (unknown attributes, unknown schema URIs) and validation
    /// errors are reported together, in that order.
    pub fn from_json(resource_type: Arc<ResourceType>, raw: &Value) -> ScimResult<Self> {
        let (tree, build_errors) = resource_type.build_tree(raw);
        let mut errors = ValidationErrors::from(build_errors);
        if let Err(validation_errors) = resource_type.validate(&tree) {
            errors.extend(validation_errors);
        }
        errors.into_result().map_err(ScimError::Validation)?;
        Ok(Self::new(resource_type, tree))
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn resource_type(&self) -> &Arc<ResourceType> {
        &self.resource_type
    }

    pub fn id(&self) -> Option<&str> {
        self.tree.get_str("id")
    }

    pub fn tree(&self) -> &AttributeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut AttributeTree {
        &mut self.tree
    }

    pub fn into_tree(self) -> AttributeTree {
        self.tree
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// Version of the rendered attributes, excluding `meta` itself.
    pub fn version(&self) -> ResourceVersion {
        ResourceVersion::from_json(&serialization::render_body(&self.resource_type, &self.tree))
    }

    /// Render the outbound resource JSON.
    pub fn to_json(&self) -> Value {
        serialization::render(self)
    }
}
