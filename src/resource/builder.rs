//! Building attribute trees from raw JSON.
//!
//! Each key is matched against the resource type's attribute definitions and
//! its value is built recursively. Complex values are accepted structurally:
//! any JSON object is descended into using the complex attribute's
//! sub-attribute definitions, whatever produced it. Building never coerces;
//! a value of the wrong shape is stored as-is so validation can report it.

use crate::error::ValidationError;
use crate::resource::{AttributeTree, AttributeValue};
use crate::schema::types::{AttributeDefinition, find_by_name};
use crate::schema::validation::join_path;
use crate::schema::{ResourceType, validation};
use serde_json::{Map, Value};

/// Build a tree for `resource_type` from a resource JSON object.
pub(crate) fn build_tree(resource_type: &ResourceType, raw: &Value) -> (AttributeTree, Vec<ValidationError>) {
    let mut tree = AttributeTree::new();
    let mut errors = Vec::new();

    let Some(object) = raw.as_object() else {
        errors.push(ValidationError::InvalidDataType {
            attribute: String::new(),
            expected: "object".to_string(),
            actual: validation::json_type_name(raw).to_string(),
        });
        return (tree, errors);
    };

    for (key, value) in object {
        if key.eq_ignore_ascii_case("schemas") {
            check_schemas(resource_type, value, &mut errors);
        } else if let Some(extension) = resource_type.extension(key) {
            let schema = &extension.schema;
            let built = match value.as_object() {
                Some(ext_object) => AttributeValue::Complex(build_attributes(
                    &schema.attributes,
                    ext_object,
                    &format!("{}:", schema.id),
                    &schema.id,
                    &mut errors,
                )),
                None => AttributeValue::from_json_untyped(value),
            };
            tree.insert(schema.id.clone(), built);
        } else if let Some(definition) = resource_type.attribute(key) {
            let built = build_value(definition, value, &definition.name, &resource_type.schema.id, &mut errors);
            tree.insert(definition.name.clone(), built);
        } else {
            errors.push(ValidationError::UnknownAttribute {
                attribute: key.clone(),
                schema_id: resource_type.schema.id.clone(),
            });
        }
    }

    (tree, errors)
}

/// Build the value of one attribute, honouring its multi-valued flag.
pub fn build_attribute_value(
    definition: &AttributeDefinition,
    value: &Value,
    path: &str,
    schema_id: &str,
) -> (AttributeValue, Vec<ValidationError>) {
    let mut errors = Vec::new();
    let built = build_value(definition, value, path, schema_id, &mut errors);
    (built, errors)
}

/// Build a single element of an attribute (one entry of a multi-valued one).
pub fn build_element(
    definition: &AttributeDefinition,
    value: &Value,
    path: &str,
    schema_id: &str,
) -> (AttributeValue, Vec<ValidationError>) {
    let mut errors = Vec::new();
    let built = build_single(definition, value, path, schema_id, &mut errors);
    (built, errors)
}

fn check_schemas(resource_type: &ResourceType, value: &Value, errors: &mut Vec<ValidationError>) {
    let Some(uris) = value.as_array() else {
        errors.push(ValidationError::InvalidDataType {
            attribute: "schemas".to_string(),
            expected: "array".to_string(),
            actual: validation::json_type_name(value).to_string(),
        });
        return;
    };
    for uri in uris {
        match uri.as_str() {
            Some(uri) if resource_type.has_schema(uri) => {}
            Some(uri) => errors.push(ValidationError::UnknownSchemaUri { uri: uri.to_string() }),
            None => errors.push(ValidationError::InvalidDataType {
                attribute: "schemas".to_string(),
                expected: "string".to_string(),
                actual: validation::json_type_name(uri).to_string(),
            }),
        }
    }
}

fn build_attributes(
    definitions: &[AttributeDefinition],
    object: &Map<String, Value>,
    prefix: &str,
    schema_id: &str,
    errors: &mut Vec<ValidationError>,
) -> AttributeTree {
    let mut tree = AttributeTree::new();
    for (key, value) in object {
        match find_by_name(definitions, key) {
            Some(definition) => {
                let path = join_path(prefix, &definition.name);
                let built = build_value(definition, value, &path, schema_id, errors);
                tree.insert(definition.name.clone(), built);
            }
            None => errors.push(ValidationError::UnknownAttribute {
                attribute: join_path(prefix, key),
                schema_id: schema_id.to_string(),
            }),
        }
    }
    tree
}

fn build_value(
    definition: &AttributeDefinition,
    value: &Value,
    path: &str,
    schema_id: &str,
    errors: &mut Vec<ValidationError>,
) -> AttributeValue {
    match value {
        Value::Array(items) if definition.multi_valued => AttributeValue::List(
            items
                .iter()
                .map(|item| build_single(definition, item, path, schema_id, errors))
                .collect(),
        ),
        // Kept as a list so validation reports the single-valued violation.
        Value::Array(_) => AttributeValue::from_json_untyped(value),
        _ => build_single(definition, value, path, schema_id, errors),
    }
}

fn build_single(
    definition: &AttributeDefinition,
    value: &Value,
    path: &str,
    schema_id: &str,
    errors: &mut Vec<ValidationError>,
) -> AttributeValue {
    match value {
        Value::Object(object) if definition.is_complex() => AttributeValue::Complex(
            build_attributes(&definition.sub_attributes, object, path, schema_id, errors),
        ),
        Value::Object(_) | Value::Array(_) => AttributeValue::from_json_untyped(value),
        scalar => AttributeValue::Scalar(scalar.clone()),
    }
}
