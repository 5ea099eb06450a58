//! Schema validation logic for attribute trees.
//!
//! Validation walks every attribute definition of a resource type and collects
//! all violations in order: required-and-present, scalar type conformance (a
//! mismatch is an error, never a coercion) and recursive validity of complex
//! and multi-valued values. Complex values are accepted structurally: any
//! nested tree whose contents satisfy the sub-attribute definitions is valid.

use super::embedded;
use super::resource_type::ResourceType;
use super::types::{AttributeDefinition, AttributeType};
use crate::error::{ValidationError, ValidationErrors};
use crate::resource::{AttributeTree, AttributeValue};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::DateTime;
use serde_json::Value;

/// Validate a tree against a resource type.
pub fn validate_tree(resource_type: &ResourceType, tree: &AttributeTree) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    validate_attributes(&resource_type.schema.attributes, tree, "", &mut errors);
    for common in embedded::common_attributes() {
        if let Some(value) = tree.get(&common.name) {
            validate_attribute(common, Some(value), &common.name, &mut errors);
        }
    }

    for extension in &resource_type.extensions {
        match tree.get(&extension.schema.id) {
            Some(AttributeValue::Complex(ext_tree)) => {
                validate_attributes(
                    &extension.schema.attributes,
                    ext_tree,
                    &format!("{}:", extension.schema.id),
                    &mut errors,
                );
            }
            Some(other) => errors.push(ValidationError::InvalidDataType {
                attribute: extension.schema.id.clone(),
                expected: "complex".to_string(),
                actual: other.kind().to_string(),
            }),
            None if extension.required => errors.push(ValidationError::MissingRequiredExtension {
                uri: extension.schema.id.clone(),
            }),
            None => {}
        }
    }

    errors.into_result()
}

/// Validate a single attribute value (including its multi-valued shape).
pub fn validate_value(definition: &AttributeDefinition, value: &AttributeValue, path: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    validate_attribute(definition, Some(value), path, &mut errors);
    errors
}

/// Validate one element of a multi-valued attribute, or a single value.
pub fn validate_element(definition: &AttributeDefinition, value: &AttributeValue, path: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    validate_single(definition, value, path, &mut errors);
    errors
}

fn validate_attributes(
    definitions: &[AttributeDefinition],
    tree: &AttributeTree,
    prefix: &str,
    errors: &mut ValidationErrors,
) {
    for definition in definitions {
        let path = join_path(prefix, &definition.name);
        validate_attribute(definition, tree.get(&definition.name), &path, errors);
    }
}

fn validate_attribute(
    definition: &AttributeDefinition,
    value: Option<&AttributeValue>,
    path: &str,
    errors: &mut ValidationErrors,
) {
    let value = match value {
        Some(value) if !value.is_unassigned() => value,
        _ => {
            if definition.required {
                errors.push(ValidationError::missing_required(path));
            }
            return;
        }
    };

    match (definition.multi_valued, value) {
        (true, AttributeValue::List(items)) => {
            for item in items {
                validate_single(definition, item, path, errors);
            }
        }
        (true, _) => errors.push(ValidationError::ExpectedMultiValue {
            attribute: path.to_string(),
        }),
        (false, AttributeValue::List(_)) => errors.push(ValidationError::ExpectedSingleValue {
            attribute: path.to_string(),
        }),
        (false, value) => validate_single(definition, value, path, errors),
    }
}

fn validate_single(
    definition: &AttributeDefinition,
    value: &AttributeValue,
    path: &str,
    errors: &mut ValidationErrors,
) {
    match (definition.data_type, value) {
        (AttributeType::Complex, AttributeValue::Complex(tree)) => {
            validate_attributes(&definition.sub_attributes, tree, path, errors);
        }
        (AttributeType::Complex, other) => errors.push(type_mismatch(definition, path, other)),
        (_, AttributeValue::Scalar(scalar)) => validate_scalar(definition, scalar, path, errors),
        (_, other) => errors.push(type_mismatch(definition, path, other)),
    }
}

fn validate_scalar(definition: &AttributeDefinition, value: &Value, path: &str, errors: &mut ValidationErrors) {
    let conforms = match definition.data_type {
        AttributeType::String | AttributeType::Reference => value.is_string(),
        AttributeType::Boolean => value.is_boolean(),
        AttributeType::Integer => value.is_i64() || value.is_u64(),
        AttributeType::Decimal => value.is_number(),
        AttributeType::DateTime | AttributeType::Binary => value.is_string(),
        AttributeType::Complex => false,
    };
    if !conforms {
        errors.push(ValidationError::InvalidDataType {
            attribute: path.to_string(),
            expected: definition.data_type.to_string(),
            actual: json_type_name(value).to_string(),
        });
        return;
    }

    match definition.data_type {
        AttributeType::String => {
            let text = value.as_str().unwrap_or_default();
            if !definition.canonical_values.is_empty()
                && !definition
                    .canonical_values
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(text))
            {
                errors.push(ValidationError::InvalidCanonicalValue {
                    attribute: path.to_string(),
                    value: text.to_string(),
                    allowed: definition.canonical_values.clone(),
                });
            }
        }
        AttributeType::Integer => {
            let in_range = value
                .as_i64()
                .is_some_and(|n| n >= i32::MIN as i64 && n <= i32::MAX as i64);
            if !in_range {
                errors.push(ValidationError::InvalidIntegerValue {
                    attribute: path.to_string(),
                    value: value.to_string(),
                });
            }
        }
        AttributeType::DateTime => {
            let text = value.as_str().unwrap_or_default();
            if DateTime::parse_from_rfc3339(text).is_err() {
                errors.push(ValidationError::InvalidDateTimeFormat {
                    attribute: path.to_string(),
                    value: text.to_string(),
                });
            }
        }
        AttributeType::Binary => {
            let text = value.as_str().unwrap_or_default();
            if BASE64.decode(text).is_err() {
                errors.push(ValidationError::InvalidBinaryData {
                    attribute: path.to_string(),
                });
            }
        }
        _ => {}
    }
}

fn type_mismatch(definition: &AttributeDefinition, path: &str, value: &AttributeValue) -> ValidationError {
    let actual = match value {
        AttributeValue::Scalar(scalar) => json_type_name(scalar),
        other => other.kind(),
    };
    ValidationError::InvalidDataType {
        attribute: path.to_string(),
        expected: definition.data_type.to_string(),
        actual: actual.to_string(),
    }
}

/// Get the type name of a JSON value for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Join an attribute name onto a path. A prefix ending in `:` is a schema URI.
pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() || prefix.ends_with(':') {
        format!("{}{}", prefix, name)
    } else {
        format!("{}.{}", prefix, name)
    }
}
