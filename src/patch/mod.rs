//! SCIM PATCH (RFC 7644 §3.5.2).
//!
//! [`PatchRequest`] parses the request body, [`PathSpec`] parses operation
//! paths and [`PatchEngine`] applies the operations to an [`AttributeTree`]
//! or, through a [`MappingDescription`], to backend entity fields.
//!
//! ```rust
//! use scim_core::patch::{PatchEngine, PatchRequest};
//! use scim_core::schema::SchemaRegistry;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_embedded_schemas()?;
//! let user = registry.resource_type("User").unwrap();
//! let (mut tree, _) = user.build_tree(&json!({
//!     "userName": "bjensen",
//!     "emails": [
//!         {"type": "work", "value": "bjensen@example.com"},
//!         {"type": "home", "value": "babs@example.org"}
//!     ]
//! }));
//!
//! let request = PatchRequest::from_json(&json!({
//!     "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!     "Operations": [{"op": "remove", "path": "emails[type eq \"work\"]"}]
//! }))?;
//! PatchEngine::new(user).apply(&mut tree, &request.operations)?;
//!
//! assert_eq!(tree.get("emails").unwrap().as_list().unwrap().len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! [`AttributeTree`]: crate::resource::AttributeTree
//! [`MappingDescription`]: crate::mapper::MappingDescription

pub mod apply;
pub mod operation;
pub mod path;

pub use apply::PatchEngine;
pub use operation::{PATCH_OP_SCHEMA, PatchOp, PatchOperation, PatchRequest};
pub use path::{PathSpec, Selector};
