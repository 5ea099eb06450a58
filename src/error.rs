//! Error types for SCIM operations.
//!
//! Every failure a request can produce is recoverable at the request boundary:
//! [`ScimError`] carries enough context to render an RFC 7644 §3.12 error
//! response via [`ScimError::to_response`]. Schema validation reports an ordered
//! list of field-scoped [`ValidationError`]s instead of stopping at the first one.

use serde_json::{Value, json};
use std::fmt;

/// Schema URI for SCIM error responses.
pub const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Result type alias for SCIM operations.
pub type ScimResult<T> = Result<T, ScimError>;

/// Main error type for SCIM operations.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Resource data doesn't conform to its schema
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Filter text could not be parsed or references unmapped attributes
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// PATCH path is malformed, unsupported or names an unknown attribute
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// A value in the request is unusable for the addressed attribute
    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    /// Write attempted on a read-only or already-set immutable attribute
    #[error("Attribute '{attribute}' is {mutability} and cannot be modified")]
    Mutability {
        attribute: String,
        mutability: String,
    },

    /// A value selection filter in a PATCH path matched nothing
    #[error("No target matched path '{path}'")]
    NoTarget { path: String },

    /// Backend-detected duplicate value
    #[error("Attribute '{attribute}' violates uniqueness constraint")]
    Uniqueness { attribute: String },

    /// `If-Match` version does not match the stored resource
    #[error("Version mismatch: expected {expected}, current {current}")]
    PreconditionFailed { expected: String, current: String },

    /// Unknown resource identifier
    #[error("Resource not found: {resource_type} with ID {id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// Unknown schema URI
    #[error("Schema not found: {schema_id}")]
    SchemaNotFound { schema_id: String },

    /// Request body is structurally unusable
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported by the persistence collaborator
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Inconsistent schema or resource type definitions
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ScimError {
    /// Create a not-found error for a resource type and id.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// The RFC 7644 `scimType` keyword for this error, if one applies.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::Validation(_) | Self::InvalidValue { .. } => Some("invalidValue"),
            Self::InvalidFilter(_) => Some("invalidFilter"),
            Self::InvalidPath(_) => Some("invalidPath"),
            Self::Mutability { .. } => Some("mutability"),
            Self::NoTarget { .. } => Some("noTarget"),
            Self::Uniqueness { .. } => Some("uniqueness"),
            Self::InvalidRequest { .. } | Self::Json(_) => Some("invalidSyntax"),
            Self::ResourceNotFound { .. }
            | Self::SchemaNotFound { .. }
            | Self::PreconditionFailed { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. } => None,
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::ResourceNotFound { .. } | Self::SchemaNotFound { .. } => 404,
            Self::Uniqueness { .. } => 409,
            Self::PreconditionFailed { .. } => 412,
            Self::Storage { .. } | Self::Configuration { .. } => 500,
            _ => 400,
        }
    }

    /// Render the RFC 7644 §3.12 error response body.
    pub fn to_response(&self) -> Value {
        let mut body = json!({
            "schemas": [ERROR_SCHEMA],
            "status": self.status().to_string(),
            "detail": self.to_string(),
        });
        if let Some(scim_type) = self.scim_type() {
            body["scimType"] = Value::String(scim_type.to_string());
        }
        body
    }
}

/// Field-scoped schema validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required attribute is missing
    #[error("Required attribute '{attribute}' is missing")]
    MissingRequiredAttribute { attribute: String },

    /// Attribute value doesn't match the declared type
    #[error("Attribute '{attribute}' has invalid type, expected {expected}, got {actual}")]
    InvalidDataType {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// Multi-valued attribute provided as single value
    #[error("Attribute '{attribute}' must be multi-valued (array)")]
    ExpectedMultiValue { attribute: String },

    /// Single-valued attribute provided as array
    #[error("Attribute '{attribute}' must be single-valued (not array)")]
    ExpectedSingleValue { attribute: String },

    /// Invalid value for attribute with canonical values
    #[error("Attribute '{attribute}' has invalid value '{value}', allowed values: {allowed:?}")]
    InvalidCanonicalValue {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    /// DateTime value is not RFC 3339
    #[error("Attribute '{attribute}' has invalid dateTime '{value}'")]
    InvalidDateTimeFormat { attribute: String, value: String },

    /// Binary value is not base64
    #[error("Attribute '{attribute}' has invalid base64 binary data")]
    InvalidBinaryData { attribute: String },

    /// Integer outside the 32-bit range SCIM allows
    #[error("Attribute '{attribute}' has out of range integer {value}")]
    InvalidIntegerValue { attribute: String, value: String },

    /// Unknown attribute in resource
    #[error("Unknown attribute '{attribute}' in schema '{schema_id}'")]
    UnknownAttribute {
        attribute: String,
        schema_id: String,
    },

    /// Schema URI not part of the resource type
    #[error("Unknown schema URI: {uri}")]
    UnknownSchemaUri { uri: String },

    /// Required extension schema not supplied
    #[error("Missing required extension schema '{uri}'")]
    MissingRequiredExtension { uri: String },

    /// General validation error with custom message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}

impl ValidationError {
    /// Create a missing required attribute error.
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create a custom validation error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    /// The attribute path this error is scoped to, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredAttribute { attribute }
            | Self::InvalidDataType { attribute, .. }
            | Self::ExpectedMultiValue { attribute }
            | Self::ExpectedSingleValue { attribute }
            | Self::InvalidCanonicalValue { attribute, .. }
            | Self::InvalidDateTimeFormat { attribute, .. }
            | Self::InvalidBinaryData { attribute }
            | Self::InvalidIntegerValue { attribute, .. }
            | Self::UnknownAttribute { attribute, .. } => Some(attribute),
            Self::UnknownSchemaUri { uri } | Self::MissingRequiredExtension { uri } => Some(uri),
            Self::Custom { .. } => None,
        }
    }
}

/// Ordered list of validation errors collected in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.0.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&ValidationError> {
        self.0.first()
    }

    /// `Ok(())` when no errors were collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl From<ValidationError> for ScimError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.into())
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Filter tokenizing, parsing and resolution errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("filter is empty")]
    Empty,

    #[error("filter exceeds maximum length ({length} bytes, max {max})")]
    TooLong { length: usize, max: usize },

    #[error("filter exceeds maximum nesting depth ({max})")]
    TooDeep { max: usize },

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("unexpected end of filter")]
    UnexpectedEnd,

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("attribute '{attribute}' is not followed by a comparison operator")]
    MissingOperator { attribute: String },

    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("invalid literal '{literal}'")]
    InvalidLiteral { literal: String },

    #[error("value filters ('[...]') are not supported inside filter expressions (position {position})")]
    NestedFilter { position: usize },

    #[error("attribute '{attribute}' cannot be used in a filter")]
    UnmappedAttribute { attribute: String },
}

/// PATCH path errors. Each variant names the offending path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("malformed path '{path}': {reason}")]
    Malformed { path: String, reason: String },

    #[error("path '{path}' uses unsupported selector operator '{operator}', only 'eq' is allowed")]
    UnsupportedSelectorOperator { path: String, operator: String },

    #[error("path '{path}' selector must be a single equality condition")]
    UnsupportedSelector { path: String },

    #[error("path '{path}' does not name a known attribute")]
    UnknownAttribute { path: String },
}

impl PathError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
