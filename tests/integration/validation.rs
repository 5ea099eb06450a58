//! Building and validating resources against the embedded schemas.

use crate::common::{self, fixtures::rfc_examples};
use scim_core::schema::embedded::{ENTERPRISE_USER_SCHEMA, USER_SCHEMA};
use scim_core::schema::{AttributeDefinition, AttributeType, SchemaRegistry};
use scim_core::{AttributeValue, Resource, ScimError, ValidationError};
use serde_json::json;

fn errors_for(raw: serde_json::Value) -> Vec<ValidationError> {
    let user = common::user_type();
    let (tree, mut errors) = user.build_tree(&raw);
    if let Err(validation) = user.validate(&tree) {
        errors.extend(validation);
    }
    errors
}

#[test]
fn test_rfc_full_user_is_valid() {
    common::init_logging();
    let resource = Resource::from_json(common::user_type(), &rfc_examples::user_full()).unwrap();

    assert_eq!(resource.tree().get_str("userName"), Some("bjensen@example.com"));
    let rendered = resource.to_json();
    assert_eq!(rendered["schemas"], json!([USER_SCHEMA]));
    assert_eq!(rendered["meta"]["resourceType"], "User");
    assert!(rendered.get("password").is_none(), "writeOnly attributes are never returned");
    assert_eq!(rendered["name"]["givenName"], "Barbara");
}

#[test]
fn test_rfc_enterprise_user_lists_extension_schema() {
    let resource = Resource::from_json(common::user_type(), &rfc_examples::user_enterprise()).unwrap();
    let rendered = resource.to_json();

    assert_eq!(rendered["schemas"], json!([USER_SCHEMA, ENTERPRISE_USER_SCHEMA]));
    assert_eq!(rendered[ENTERPRISE_USER_SCHEMA]["employeeNumber"], "701984");
    assert_eq!(
        rendered[ENTERPRISE_USER_SCHEMA]["manager"]["value"],
        "26118915-6090-4610-87e4-49d8ca9f808d"
    );
}

#[test]
fn test_rfc_group_is_valid() {
    let resource = Resource::from_json(common::group_type(), &rfc_examples::group_basic()).unwrap();
    let members = resource
        .tree()
        .get("members")
        .and_then(AttributeValue::as_list)
        .unwrap();
    assert_eq!(members.len(), 2);
}

#[test]
fn test_missing_required_attribute() {
    let errors = errors_for(json!({"displayName": "No Username"}));
    assert_eq!(errors, vec![ValidationError::missing_required("userName")]);

    let err = Resource::from_json(common::user_type(), &json!({"displayName": "x"})).unwrap_err();
    assert!(matches!(err, ScimError::Validation(_)));
    assert_eq!(err.scim_type(), Some("invalidValue"));
    assert_eq!(err.status(), 400);
}

#[test]
fn test_type_mismatch_is_not_coerced() {
    let errors = errors_for(json!({"userName": "bjensen", "active": "true"}));
    assert_eq!(
        errors,
        vec![ValidationError::InvalidDataType {
            attribute: "active".to_string(),
            expected: "boolean".to_string(),
            actual: "string".to_string(),
        }]
    );
}

#[test]
fn test_required_sub_attribute_in_collection() {
    let errors = errors_for(json!({
        "userName": "bjensen",
        "emails": [{"value": "a@example.com"}, {"type": "home"}]
    }));
    assert_eq!(errors, vec![ValidationError::missing_required("emails.value")]);
}

#[test]
fn test_complex_value_accepted_structurally() {
    // Any object whose contents satisfy the sub-attributes is a valid name.
    let errors = errors_for(json!({"userName": "bjensen", "name": {"familyName": "Jensen"}}));
    assert!(errors.is_empty());

    let errors = errors_for(json!({"userName": "bjensen", "name": "Barbara Jensen"}));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].attribute(), Some("name"));
}

#[test]
fn test_multi_valued_shape() {
    let errors = errors_for(json!({"userName": "bjensen", "emails": {"value": "a@example.com"}}));
    assert_eq!(
        errors,
        vec![ValidationError::ExpectedMultiValue {
            attribute: "emails".to_string()
        }]
    );

    let errors = errors_for(json!({"userName": "bjensen", "title": ["a", "b"]}));
    assert_eq!(
        errors,
        vec![ValidationError::ExpectedSingleValue {
            attribute: "title".to_string()
        }]
    );
}

#[test]
fn test_unknown_attribute_and_schema() {
    let errors = errors_for(json!({
        "schemas": [USER_SCHEMA, "urn:example:unknown"],
        "userName": "bjensen",
        "favouriteColour": "teal"
    }));
    assert!(errors.contains(&ValidationError::UnknownSchemaUri {
        uri: "urn:example:unknown".to_string()
    }));
    assert!(errors.contains(&ValidationError::UnknownAttribute {
        attribute: "favouriteColour".to_string(),
        schema_id: USER_SCHEMA.to_string(),
    }));
}

#[test]
fn test_all_errors_reported_in_one_pass() {
    let errors = errors_for(json!({
        "active": 1,
        "emails": [{"type": "work"}],
        ENTERPRISE_USER_SCHEMA: {"employeeNumber": 701984}
    }));
    let attributes: Vec<_> = errors.iter().filter_map(ValidationError::attribute).collect();
    assert_eq!(
        attributes,
        vec![
            "userName",
            "active",
            "emails.value",
            &format!("{}:employeeNumber", ENTERPRISE_USER_SCHEMA)[..]
        ]
    );
}

#[test]
fn test_extension_attributes_validated() {
    let errors = errors_for(json!({
        "userName": "bjensen",
        ENTERPRISE_USER_SCHEMA: {"manager": {"value": 42}}
    }));
    assert_eq!(
        errors[0].attribute(),
        Some(&format!("{}:manager.value", ENTERPRISE_USER_SCHEMA)[..])
    );
}

#[test]
fn test_find_attribute_ignores_element_index() {
    let user = common::user_type();
    let indexed = user.find_attribute(&["emails", "1", "value"]).unwrap();
    assert_eq!(indexed.name, "value");
    assert_eq!(indexed, user.find_attribute(&["emails", "value"]).unwrap());
    assert!(user.find_attribute(&["emails", "1", "nickname"]).is_none());
}

#[test]
fn test_custom_resource_type() {
    let mut registry = SchemaRegistry::new();
    registry
        .define_schema(
            "urn:example:params:scim:schemas:core:2.0:Device",
            "Device",
            vec![
                AttributeDefinition::string("serialNumber").required(),
                AttributeDefinition::integer("ports"),
                AttributeDefinition::complex(
                    "location",
                    vec![
                        AttributeDefinition::string("building"),
                        AttributeDefinition::decimal("latitude"),
                    ],
                ),
            ],
        )
        .unwrap();
    let device = registry
        .compose_resource_type(
            "Device",
            "/Devices",
            "urn:example:params:scim:schemas:core:2.0:Device",
            &[],
        )
        .unwrap();

    let resource = Resource::from_json(
        device.clone(),
        &json!({"serialNumber": "SN-1", "ports": 4, "location": {"building": "B2", "latitude": 51.5}}),
    )
    .unwrap();
    assert_eq!(resource.to_json()["location"]["latitude"], 51.5);

    let (tree, _) = device.build_tree(&json!({"serialNumber": "SN-1", "ports": 4.5}));
    let errors = device.validate(&tree).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        device.find_attribute(&["location", "latitude"]).map(|a| a.data_type),
        Some(AttributeType::Decimal)
    );
}

#[test]
fn test_registry_rejects_undefined_schema() {
    let mut registry = SchemaRegistry::new();
    let err = registry
        .compose_resource_type("Widget", "/Widgets", "urn:example:missing", &[])
        .unwrap_err();
    assert!(matches!(err, ScimError::Configuration { .. }));

    let err = registry
        .define_schema(
            "urn:example:bad",
            "Bad",
            vec![AttributeDefinition::complex("empty", vec![])],
        )
        .unwrap_err();
    assert!(matches!(err, ScimError::Configuration { .. }));
    assert!(common::registry().get_schema(USER_SCHEMA).is_some());
}
