//! SCIM 2.0 data model for Rust.
//!
//! Schemas, attribute trees, filters, PATCH and attribute mapping for SCIM
//! (RFC 7643/7644), independent of HTTP framework and storage technology.
//!
//! # Core Components
//!
//! - [`SchemaRegistry`] - Schemas and resource types, built once and shared
//! - [`AttributeTree`] - A resource instance, built from JSON and validated on demand
//! - [`MappingDescription`] - Correspondence between attribute trees and backend entity fields
//! - [`Filter`] - Filter expressions resolved into backend-agnostic [`Predicate`]s
//! - [`PatchEngine`] - PATCH operations against trees or backend entities
//! - [`PageWindow`] - `startIndex`/`count` to offset/limit
//! - [`ResourceService`] - The above wired to an [`EntityStore`]
//!
//! # Quick Start
//!
//! ```rust
//! use scim_core::{Filter, SchemaRegistry};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_embedded_schemas()?;
//! let user = registry.resource_type("User").unwrap();
//!
//! let (tree, errors) = user.build_tree(&json!({"userName": "bjensen", "active": true}));
//! assert!(errors.is_empty());
//! assert!(user.validate(&tree).is_ok());
//!
//! let filter = Filter::parse(r#"userName sw "bj" and active eq true"#)?;
//! assert_eq!(filter.expr().paths(), vec!["userName", "active"]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod pagination;
pub mod patch;
pub mod resource;
pub mod schema;
pub mod service;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::ScimConfig;
pub use error::{FilterError, PathError, ScimError, ScimResult, ValidationError, ValidationErrors};
pub use filter::{Filter, Predicate, QueryableAttributes};
pub use mapper::{EntityFields, MappingDescription, MissingAttributePolicy, WriteMode};
pub use pagination::{ListQuery, ListResponse, PageWindow};
pub use patch::{PatchEngine, PatchOperation, PatchRequest, PathSpec};
pub use resource::{AttributeTree, AttributeValue, Resource};
pub use schema::{AttributeDefinition, ResourceType, Schema, SchemaRegistry};
pub use service::ResourceService;
pub use storage::{Entity, EntityStore, InMemoryEntityStore, StoreError};
