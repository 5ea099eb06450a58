//! Resource operations over an entity store.
//!
//! [`ResourceService`] wires the core together for one resource type: inbound
//! JSON is built and validated, mapped to entity fields and handed to an
//! [`EntityStore`]; stored entities are mapped back and rendered. Filters and
//! PATCH requests go through the same schema and mapping. HTTP routing is left
//! to the host; every method returns resource JSON or a [`ScimError`] that
//! renders as a SCIM error response.

use crate::config::ScimConfig;
use crate::error::{ScimError, ScimResult};
use crate::filter::{Filter, Predicate};
use crate::mapper::{MappingDescription, WriteMode};
use crate::pagination::{ListQuery, ListResponse, PageWindow};
use crate::patch::apply::check_immutable;
use crate::patch::{PatchEngine, PatchRequest};
use crate::resource::{AttributeTree, AttributeValue, EtagParseError, Resource, ResourceVersion};
use crate::schema::ResourceType;
use crate::storage::{Entity, EntityStore, StoreError};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

/// SCIM operations for one resource type backed by an [`EntityStore`].
pub struct ResourceService<S> {
    resource_type: Arc<ResourceType>,
    mapping: MappingDescription,
    store: S,
    config: ScimConfig,
}

impl<S: EntityStore> ResourceService<S> {
    /// The configuration's missing-attribute policy is applied to `mapping`.
    pub fn new(resource_type: Arc<ResourceType>, mapping: MappingDescription, store: S, config: ScimConfig) -> Self {
        let mapping = mapping.with_missing_policy(config.missing_attribute_policy);
        Self {
            resource_type,
            mapping,
            store,
            config,
        }
    }

    pub fn resource_type(&self) -> &Arc<ResourceType> {
        &self.resource_type
    }

    pub fn mapping(&self) -> &MappingDescription {
        &self.mapping
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn create(&self, body: &Value) -> ScimResult<Value> {
        let resource = Resource::from_json(self.resource_type.clone(), body)?;
        let fields = self
            .mapping
            .to_entity_fields(resource.tree(), None, WriteMode::Replace);
        let entity = self.store.create(fields).await.map_err(|e| self.store_error(e))?;

        info!("Created {} {}", self.resource_type.name, entity.id);
        Ok(self.render(&entity))
    }

    pub async fn get(&self, id: &str) -> ScimResult<Value> {
        let entity = self.find(id).await?;
        Ok(self.render(&entity))
    }

    /// Full replace (PUT). Immutable attributes that already hold a value
    /// must be sent unchanged or left out.
    pub async fn replace(&self, id: &str, body: &Value) -> ScimResult<Value> {
        let existing = self.find(id).await?;
        self.replace_entity(existing, body).await
    }

    /// Full replace guarded by an `If-Match` ETag. A stale version fails with
    /// [`ScimError::PreconditionFailed`] and nothing is written.
    pub async fn replace_if_match(&self, id: &str, body: &Value, if_match: &str) -> ScimResult<Value> {
        let existing = self.find(id).await?;
        self.check_version(&existing, if_match)?;
        self.replace_entity(existing, body).await
    }

    /// Apply a PATCH request body. The patched resource must validate as a
    /// whole before anything is written.
    pub async fn patch(&self, id: &str, body: &Value) -> ScimResult<Value> {
        let request = PatchRequest::from_json(body)?;
        let existing = self.find(id).await?;
        self.patch_entity(existing, &request).await
    }

    /// PATCH guarded by an `If-Match` ETag.
    pub async fn patch_if_match(&self, id: &str, body: &Value, if_match: &str) -> ScimResult<Value> {
        let request = PatchRequest::from_json(body)?;
        let existing = self.find(id).await?;
        self.check_version(&existing, if_match)?;
        self.patch_entity(existing, &request).await
    }

    async fn replace_entity(&self, existing: Entity, body: &Value) -> ScimResult<Value> {
        let resource = Resource::from_json(self.resource_type.clone(), body)?;

        let current = self.mapping.from_entity(&existing.fields);
        self.check_replace_immutable(&current, resource.tree())?;

        let fields = self
            .mapping
            .to_entity_fields(resource.tree(), Some(&existing.fields), WriteMode::Replace);
        let entity = self
            .store
            .update(&existing.id, fields)
            .await
            .map_err(|e| self.store_error(e))?;

        info!("Replaced {} {}", self.resource_type.name, entity.id);
        Ok(self.render(&entity))
    }

    async fn patch_entity(&self, existing: Entity, request: &PatchRequest) -> ScimResult<Value> {
        let mut tree = self.mapping.from_entity(&existing.fields);
        PatchEngine::new(&self.resource_type).apply(&mut tree, &request.operations)?;
        self.resource_type.validate(&tree)?;

        let fields = self
            .mapping
            .to_entity_fields(&tree, Some(&existing.fields), WriteMode::Patch);
        let entity = self
            .store
            .update(&existing.id, fields)
            .await
            .map_err(|e| self.store_error(e))?;

        info!(
            "Patched {} {} with {} operation(s)",
            self.resource_type.name,
            entity.id,
            request.operations.len()
        );
        Ok(self.render(&entity))
    }

    /// List resources, optionally filtered. A filter naming an attribute the
    /// mapping cannot query is rejected before the store is consulted.
    pub async fn list(&self, query: &ListQuery) -> ScimResult<ListResponse<Value>> {
        let predicate = match query.filter.as_deref() {
            Some(text) => Some(self.predicate(text)?),
            None => None,
        };

        let mut window = PageWindow::compute(
            query.start_index,
            query.count,
            0,
            self.config.default_count,
            self.config.max_count,
        );
        let (entities, total) = self
            .store
            .list(predicate.as_ref(), window.offset(), window.limit())
            .await
            .map_err(|e| self.store_error(e))?;
        window.total_results = total;

        debug!(
            "Listed {} {} of {} (startIndex {})",
            entities.len(),
            self.resource_type.name,
            total,
            window.start_index
        );
        let resources = entities.iter().map(|entity| self.render(entity)).collect();
        Ok(ListResponse::new(&window, resources))
    }

    pub async fn delete(&self, id: &str) -> ScimResult<()> {
        let deleted = self.store.delete(id).await.map_err(|e| self.store_error(e))?;
        if !deleted {
            return Err(ScimError::not_found(&self.resource_type.name, id));
        }
        info!("Deleted {} {}", self.resource_type.name, id);
        Ok(())
    }

    /// Resolve filter text against this service's queryable attributes.
    pub fn predicate(&self, filter: &str) -> ScimResult<Predicate> {
        let queryable = self
            .mapping
            .queryable_attributes()
            .with_schema_prefix(self.resource_type.schema.id.clone());
        Ok(Filter::parse(filter)?.evaluate(&queryable)?)
    }

    async fn find(&self, id: &str) -> ScimResult<Entity> {
        self.store
            .find(id)
            .await
            .map_err(|e| self.store_error(e))?
            .ok_or_else(|| ScimError::not_found(&self.resource_type.name, id))
    }

    fn resource(&self, entity: &Entity) -> Resource {
        let mut tree = self.mapping.from_entity(&entity.fields);
        tree.insert("id", AttributeValue::Scalar(Value::String(entity.id.clone())));
        Resource::new(self.resource_type.clone(), tree)
    }

    fn render(&self, entity: &Entity) -> Value {
        let meta = entity
            .meta()
            .with_location(self.config.location(&self.resource_type.endpoint, &entity.id));
        self.resource(entity).with_meta(meta).to_json()
    }

    /// `*` matches any stored version.
    fn check_version(&self, entity: &Entity, if_match: &str) -> ScimResult<()> {
        if if_match.trim() == "*" {
            return Ok(());
        }
        let expected: ResourceVersion = if_match
            .parse()
            .map_err(|e: EtagParseError| ScimError::invalid_request(e.to_string()))?;
        let current = self.resource(entity).version();
        if expected != current {
            warn!(
                "Version mismatch on {} {}: expected {}, current {}",
                self.resource_type.name, entity.id, expected, current
            );
            return Err(ScimError::PreconditionFailed {
                expected: expected.to_etag(),
                current: current.to_etag(),
            });
        }
        Ok(())
    }

    fn check_replace_immutable(&self, current: &AttributeTree, new: &AttributeTree) -> ScimResult<()> {
        let resource_type = &self.resource_type;
        for definition in &resource_type.schema.attributes {
            if let Some(value) = new.get(&definition.name) {
                check_immutable(definition, current.get(&definition.name), value, &definition.name)?;
            }
        }
        for extension in &resource_type.extensions {
            let id = &extension.schema.id;
            let (Some(current), Some(new)) = (
                current.get(id).and_then(AttributeValue::as_complex),
                new.get(id).and_then(AttributeValue::as_complex),
            ) else {
                continue;
            };
            for definition in &extension.schema.attributes {
                if let Some(value) = new.get(&definition.name) {
                    let path = format!("{}:{}", id, definition.name);
                    check_immutable(definition, current.get(&definition.name), value, &path)?;
                }
            }
        }
        Ok(())
    }

    fn store_error(&self, error: StoreError) -> ScimError {
        error.into_scim(&self.resource_type.name)
    }
}
