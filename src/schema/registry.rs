//! Schema registry for loading, composing and accessing SCIM schemas.
//!
//! The registry is assembled once at startup (schemas defined, resource types
//! composed) and then shared read-only, typically behind an `Arc`. Definition
//! problems such as a resource type naming an unknown schema are configuration
//! errors reported here rather than per request.

use super::embedded;
use super::resource_type::{ResourceType, SchemaExtension};
use super::types::{AttributeDefinition, Schema};
use crate::error::{ScimError, ScimResult};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Registry of schemas and the resource types composed from them.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    // Keyed by lowercased schema URI.
    schemas: HashMap<String, Arc<Schema>>,
    resource_types: HashMap<String, Arc<ResourceType>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the embedded core schemas and the standard
    /// `User` (with the enterprise extension) and `Group` resource types.
    pub fn with_embedded_schemas() -> ScimResult<Self> {
        let mut registry = Self::new();
        registry.add_schema(Self::load_schema_from_str(embedded::core_user_schema())?)?;
        registry.add_schema(Self::load_schema_from_str(embedded::core_group_schema())?)?;
        registry.add_schema(Self::load_schema_from_str(
            embedded::enterprise_user_schema(),
        )?)?;

        registry.compose_resource_type(
            "User",
            "/Users",
            embedded::USER_SCHEMA,
            &[(embedded::ENTERPRISE_USER_SCHEMA, false)],
        )?;
        registry.compose_resource_type("Group", "/Groups", embedded::GROUP_SCHEMA, &[])?;
        Ok(registry)
    }

    /// Create a registry by loading every `*.json` schema in a directory.
    ///
    /// No resource types are composed; call [`Self::compose_resource_type`].
    pub fn from_schema_dir<P: AsRef<Path>>(schema_dir: P) -> ScimResult<Self> {
        let mut registry = Self::new();
        let entries = fs::read_dir(schema_dir.as_ref()).map_err(|e| {
            ScimError::configuration(format!(
                "cannot read schema directory {}: {}",
                schema_dir.as_ref().display(),
                e
            ))
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let schema = Self::load_schema_from_file(&path)?;
            registry.add_schema(schema)?;
        }
        Ok(registry)
    }

    /// Load a schema from a JSON file.
    pub fn load_schema_from_file<P: AsRef<Path>>(path: P) -> ScimResult<Schema> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ScimError::configuration(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::load_schema_from_str(&content)
    }

    /// Load a schema from an RFC 7643 schema JSON document.
    pub fn load_schema_from_str(content: &str) -> ScimResult<Schema> {
        let schema: Schema = serde_json::from_str(content)?;
        Ok(schema)
    }

    /// Define a schema from its id and attributes and register it.
    pub fn define_schema(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        attributes: Vec<AttributeDefinition>,
    ) -> ScimResult<Arc<Schema>> {
        self.add_schema(Schema::new(id, name, attributes))
    }

    /// Register a schema after checking its definitions are consistent.
    pub fn add_schema(&mut self, schema: Schema) -> ScimResult<Arc<Schema>> {
        if schema.id.trim().is_empty() {
            return Err(ScimError::configuration("schema id cannot be empty"));
        }
        Self::validate_definitions(&schema.attributes, &schema.id)?;

        debug!(
            "Registering schema '{}' with {} attributes",
            schema.id,
            schema.attributes.len()
        );
        let schema = Arc::new(schema);
        self.schemas
            .insert(schema.id.to_ascii_lowercase(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Check attribute definitions for duplicate names and complex attributes
    /// without sub-attributes.
    pub fn validate_definitions(attributes: &[AttributeDefinition], context: &str) -> ScimResult<()> {
        let mut seen = HashSet::new();
        for attr in attributes {
            if attr.name.trim().is_empty() {
                return Err(ScimError::configuration(format!(
                    "{}: attribute name cannot be empty",
                    context
                )));
            }
            if !seen.insert(attr.name.to_ascii_lowercase()) {
                return Err(ScimError::configuration(format!(
                    "{}: duplicate attribute '{}'",
                    context, attr.name
                )));
            }

            let path = format!("{}.{}", context, attr.name);
            if attr.is_complex() {
                if attr.sub_attributes.is_empty() {
                    return Err(ScimError::configuration(format!(
                        "{}: complex attribute has no sub-attributes",
                        path
                    )));
                }
                Self::validate_definitions(&attr.sub_attributes, &path)?;
            } else if !attr.sub_attributes.is_empty() {
                return Err(ScimError::configuration(format!(
                    "{}: only complex attributes can have sub-attributes",
                    path
                )));
            }
        }
        Ok(())
    }

    /// Compose a resource type from registered schemas.
    ///
    /// `extensions` lists `(schema id, required)` pairs in declaration order.
    pub fn compose_resource_type(
        &mut self,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        primary: &str,
        extensions: &[(&str, bool)],
    ) -> ScimResult<Arc<ResourceType>> {
        let name = name.into();
        let schema = self.require_schema(primary, &name)?;

        let mut composed = Vec::with_capacity(extensions.len());
        for (id, required) in extensions {
            composed.push(SchemaExtension {
                schema: self.require_schema(id, &name)?,
                required: *required,
            });
        }

        let resource_type = Arc::new(ResourceType {
            name: name.clone(),
            endpoint: endpoint.into(),
            schema,
            extensions: composed,
        });
        debug!(
            "Composed resource type '{}' from {:?}",
            name,
            resource_type.schema_ids()
        );
        self.resource_types
            .insert(name, Arc::clone(&resource_type));
        Ok(resource_type)
    }

    fn require_schema(&self, id: &str, resource_type: &str) -> ScimResult<Arc<Schema>> {
        self.get_schema(id).cloned().ok_or_else(|| {
            ScimError::configuration(format!(
                "resource type '{}' references undefined schema '{}'",
                resource_type, id
            ))
        })
    }

    /// Get all available schemas.
    pub fn get_schemas(&self) -> Vec<&Arc<Schema>> {
        self.schemas.values().collect()
    }

    /// Get a specific schema by URI, ignoring case.
    pub fn get_schema(&self, id: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(&id.to_ascii_lowercase())
    }

    /// Get a resource type by name.
    pub fn resource_type(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.resource_types.get(name)
    }

    /// Get all composed resource types.
    pub fn resource_types(&self) -> Vec<&Arc<ResourceType>> {
        self.resource_types.values().collect()
    }
}
