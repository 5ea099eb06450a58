//! Runtime resource representation.
//!
//! This module provides the attribute tree that inbound JSON is built into,
//! the [`Resource`] wrapper that binds a tree to its resource type, and the
//! content-derived versions rendered as `meta.version`.
//!
//! # Key Components
//!
//! * [`AttributeTree`] / [`AttributeValue`] - schema-shaped values of one resource
//! * [`builder`] - building trees from raw JSON
//! * [`Resource`] - a validated tree with its resource type and metadata
//! * [`ResourceVersion`] - weak ETags derived from resource content

pub mod builder;
pub mod resource;
pub mod serialization;
pub mod tree;
pub mod version;

pub use resource::{Meta, Resource};
pub use tree::{AttributeTree, AttributeValue};
pub use version::{EtagParseError, ResourceVersion};
