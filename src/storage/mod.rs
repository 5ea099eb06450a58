//! Persistence collaborator interface.
//!
//! The core never talks to a database. An [`EntityStore`] holds backend
//! entities (flat field maps produced by a
//! [`MappingDescription`](crate::mapper::MappingDescription)) for one resource
//! type and answers the handful of questions a SCIM service asks of it.
//!
//! The store is responsible for:
//! - assigning ids and maintaining created/modified timestamps
//! - applying field update sets atomically
//! - detecting uniqueness conflicts
//! - evaluating [`Predicate`]s, or translating them into its own query form
//!
//! It is not responsible for schema validation, attribute mapping or PATCH
//! semantics; those happen before a store is called.
//!
//! # Example Usage
//!
//! ```rust
//! use scim_core::storage::{EntityStore, InMemoryEntityStore};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryEntityStore::new().with_unique_field("login");
//!
//! let fields = json!({"login": "bjensen"}).as_object().cloned().unwrap();
//! let entity = store.create(fields).await?;
//!
//! let found = store.find(&entity.id).await?;
//! assert_eq!(found.map(|e| e.fields["login"].clone()), Some(json!("bjensen")));
//!
//! assert!(store.delete(&entity.id).await?);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::StoreError;
pub use in_memory::InMemoryEntityStore;

use crate::filter::Predicate;
use crate::mapper::EntityFields;
use crate::resource::Meta;
use chrono::{DateTime, Utc};
use std::future::Future;

/// A stored backend entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub fields: EntityFields,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Entity {
    /// Resource metadata for this entity, without a location.
    pub fn meta(&self) -> Meta {
        Meta {
            created: self.created,
            last_modified: self.last_modified,
            location: None,
        }
    }
}

/// Storage for the entities of one resource type.
///
/// All operations are async so implementations can sit on real databases.
/// Field update sets follow the mapper's convention: a `null` value clears
/// the field, absent fields are left alone.
pub trait EntityStore: Send + Sync {
    /// Fetch an entity by id, `None` if it does not exist.
    fn find(&self, id: &str) -> impl Future<Output = Result<Option<Entity>, StoreError>> + Send;

    /// Entities matching `predicate` (all when `None`), skipping `offset` and
    /// returning at most `limit`, together with the total number of matches.
    ///
    /// Results must be consistently ordered so that pages do not overlap.
    fn list(
        &self,
        predicate: Option<&Predicate>,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<(Vec<Entity>, usize), StoreError>> + Send;

    /// Store a new entity and return it with its assigned id.
    fn create(&self, fields: EntityFields) -> impl Future<Output = Result<Entity, StoreError>> + Send;

    /// Merge a field update set into an existing entity.
    fn update(
        &self,
        id: &str,
        fields: EntityFields,
    ) -> impl Future<Output = Result<Entity, StoreError>> + Send;

    /// Delete an entity. Returns whether it existed.
    fn delete(&self, id: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
