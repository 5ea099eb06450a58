//! Integration tests by component.
//!
//! Each module drives one part of the public API against the embedded
//! resource types and the shared mappings in `common`. `service` runs the
//! same flows end to end over [`InMemoryEntityStore`], and `properties` holds
//! the proptest suites.
//!
//! [`InMemoryEntityStore`]: scim_core::InMemoryEntityStore

pub mod filter;
pub mod mapper;
pub mod patch;
pub mod properties;
pub mod service;
pub mod validation;
