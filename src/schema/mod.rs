//! Schema definitions and validation for SCIM resources.
//!
//! This module provides the schema registry and validation engine implementing
//! RFC 7643 SCIM core schemas.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`SchemaRegistry`] - Registry for defining schemas and composing resource types
//! - [`ResourceType`] - A primary schema plus extension schemas
//! - [`AttributeDefinition`] - Individual attribute specifications and constraints
//!
//! # Examples
//!
//! ```rust
//! use scim_core::schema::SchemaRegistry;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_embedded_schemas()?;
//! let user = registry.resource_type("User").unwrap();
//!
//! let (tree, build_errors) = user.build_tree(&json!({"userName": "bjensen"}));
//! assert!(build_errors.is_empty());
//! assert!(user.validate(&tree).is_ok());
//! # Ok(())
//! # }
//! ```

pub mod embedded;
pub mod registry;
pub mod resource_type;
pub mod types;
pub mod validation;


// Re-export the main types for convenience
pub use registry::SchemaRegistry;
pub use resource_type::{ResourceType, SchemaExtension};
pub use types::{AttributeDefinition, AttributeType, Mutability, Returned, Schema, Uniqueness};
