//! In-memory entity store.
//!
//! A thread-safe [`EntityStore`] backed by a `Vec` behind a tokio `RwLock`.
//! Entities keep insertion order, which gives list pages a stable order.
//! Intended for tests, demos and as a model for real backends.

use super::{Entity, EntityStore, StoreError};
use crate::filter::Predicate;
use crate::mapper::EntityFields;
use chrono::Utc;
use log::debug;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory entity store.
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    entities: Arc<RwLock<Vec<Entity>>>,
    unique_fields: Vec<String>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject creates and updates that would give two entities the same value
    /// in `field`. Strings compare ignoring case.
    pub fn with_unique_field(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }

    /// Remove every entity.
    pub async fn clear(&self) {
        self.entities.write().await.clear();
    }

    fn check_unique(&self, entities: &[Entity], fields: &EntityFields, except: Option<&str>) -> Result<(), StoreError> {
        for field in &self.unique_fields {
            let Some(value) = fields.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = entities
                .iter()
                .filter(|e| Some(e.id.as_str()) != except)
                .any(|e| e.fields.get(field).is_some_and(|other| same_value(other, value)));
            if taken {
                return Err(StoreError::Uniqueness { field: field.clone() });
            }
        }
        Ok(())
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}

/// Merge an update set: `null` clears a field.
fn merge(target: &mut EntityFields, updates: EntityFields) {
    for (field, value) in updates {
        if value.is_null() {
            target.remove(&field);
        } else {
            target.insert(field, value);
        }
    }
}

impl EntityStore for InMemoryEntityStore {
    async fn find(&self, id: &str) -> Result<Option<Entity>, StoreError> {
        let entities = self.entities.read().await;
        Ok(entities.iter().find(|e| e.id == id).cloned())
    }

    async fn list(
        &self,
        predicate: Option<&Predicate>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Entity>, usize), StoreError> {
        let entities = self.entities.read().await;
        let matching: Vec<&Entity> = entities
            .iter()
            .filter(|e| predicate.is_none_or(|p| p.matches(&e.fields)))
            .collect();
        let total = matching.len();
        let page = matching.into_iter().skip(offset).take(limit).cloned().collect();
        Ok((page, total))
    }

    async fn create(&self, fields: EntityFields) -> Result<Entity, StoreError> {
        let mut entities = self.entities.write().await;
        self.check_unique(&entities, &fields, None)?;

        let now = Utc::now();
        let mut stored = EntityFields::new();
        merge(&mut stored, fields);
        let entity = Entity {
            id: Uuid::new_v4().to_string(),
            fields: stored,
            created: now,
            last_modified: now,
        };
        debug!("Created entity {}", entity.id);
        entities.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: &str, fields: EntityFields) -> Result<Entity, StoreError> {
        let mut entities = self.entities.write().await;
        self.check_unique(&entities, &fields, Some(id))?;

        let entity = entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        merge(&mut entity.fields, fields);
        entity.last_modified = Utc::now();
        debug!("Updated entity {}", id);
        Ok(entity.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut entities = self.entities.write().await;
        let before = entities.len();
        entities.retain(|e| e.id != id);
        Ok(entities.len() < before)
    }
}
