//! Errors reported by entity stores.

use crate::error::ScimError;

/// Failures an [`EntityStore`](super::EntityStore) reports.
///
/// These carry backend vocabulary (ids, field names). [`StoreError::into_scim`]
/// turns them into request-level errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("entity '{id}' not found")]
    NotFound { id: String },

    /// Another entity already holds this value in a unique field.
    #[error("field '{field}' must be unique")]
    Uniqueness { field: String },

    /// The backend rejected the field values.
    #[error("rejected by backend: {message}")]
    Validation { message: String },

    #[error("backend failure: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Convert to a request-level error for a resource type.
    pub fn into_scim(self, resource_type: &str) -> ScimError {
        match self {
            Self::NotFound { id } => ScimError::not_found(resource_type, id),
            Self::Uniqueness { field } => ScimError::Uniqueness { attribute: field },
            Self::Validation { message } => ScimError::invalid_value(message),
            Self::Backend { message } => ScimError::Storage { message },
        }
    }
}
