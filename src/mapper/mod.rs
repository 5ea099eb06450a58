//! Mapping between attribute trees and backend entity fields.
//!
//! A [`MappingDescription`] declares, per attribute, where its value lives in
//! a backend entity: a single field, a group of fields for a complex value, a
//! set of flat fields selected by a sub-attribute value (the work email in
//! `work_email`, the home email in `home_email`), or an array of sub-entities
//! reconciled by key.
//!
//! Writing produces a field update set and never touches storage. Reading
//! rebuilds a tree that can be validated and rendered like any other.
//!
//! ```rust
//! use scim_core::mapper::{AttributeMappings, MappingDescription, MatchedSlot, WriteMode};
//! use scim_core::schema::SchemaRegistry;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_embedded_schemas()?;
//! let user = registry.resource_type("User").unwrap();
//!
//! let mapping = MappingDescription::new(
//!     AttributeMappings::new()
//!         .field("userName", "login")
//!         .matched("emails", vec![MatchedSlot::new(
//!             "type",
//!             "work",
//!             AttributeMappings::new().field("value", "work_email"),
//!         )]),
//! );
//!
//! let (tree, _) = user.build_tree(&json!({
//!     "userName": "bjensen",
//!     "emails": [{"type": "work", "value": "bjensen@example.com"}]
//! }));
//! let fields = mapping.to_entity_fields(&tree, None, WriteMode::Replace);
//! assert_eq!(fields["work_email"], "bjensen@example.com");
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod description;

pub use description::{
    AttributeMappings, ListMapping, Mapping, MappingDescription, MatchedSlot,
    MissingAttributePolicy, WriteMode,
};

/// A backend entity's fields, keyed by backend field name.
pub type EntityFields = serde_json::Map<String, serde_json::Value>;
