//! Mapping attribute trees to backend entity fields and back.

use crate::common::{self, fields, fixtures::rfc_examples};
use scim_core::schema::embedded::ENTERPRISE_USER_SCHEMA;
use scim_core::{AttributeValue, MissingAttributePolicy, ScimConfig, WriteMode};
use serde_json::{Value, json};

#[test]
fn test_round_trip_of_rfc_enterprise_user() {
    let user = common::user_type();
    let mapping = common::user_mapping();
    let (tree, errors) = user.build_tree(&rfc_examples::user_enterprise());
    assert!(errors.is_empty(), "{:?}", errors);

    let entity = mapping.to_entity_fields(&tree, None, WriteMode::Replace);
    assert_eq!(
        entity,
        fields(json!({
            "login": "bjensen@example.com",
            "display_name": "Babs Jensen",
            "job_title": "Tour Guide",
            "enabled": true,
            "first_name": "Barbara",
            "last_name": "Jensen",
            "work_email": "bjensen@example.com",
            "work_email_primary": true,
            "home_email": "babs@jensen.org",
            "employee_no": "701984",
            "department": "Tour Operations"
        }))
    );

    let back = mapping.from_entity(&entity);
    assert_eq!(back.get_str("userName"), Some("bjensen@example.com"));
    assert_eq!(back.get("active").and_then(AttributeValue::as_scalar), Some(&json!(true)));
    assert_eq!(
        back.get_path(&["name", "givenName"]).and_then(AttributeValue::as_str),
        Some("Barbara")
    );
    assert_eq!(
        back.get("emails").map(AttributeValue::to_json),
        Some(json!([
            {"type": "work", "value": "bjensen@example.com", "primary": true},
            {"type": "home", "value": "babs@jensen.org"}
        ]))
    );
    assert_eq!(
        back.get(ENTERPRISE_USER_SCHEMA).map(AttributeValue::to_json),
        Some(json!({"employeeNumber": "701984", "department": "Tour Operations"}))
    );
    assert!(user.validate(&back).is_ok());
}

#[test]
fn test_unmatched_collection_entries_are_not_mapped() {
    let user = common::user_type();
    let (tree, _) = user.build_tree(&json!({
        "userName": "bjensen",
        "emails": [{"type": "other", "value": "x@example.com"}, {"type": "Work", "value": "w@example.com"}]
    }));

    let entity = common::user_mapping().to_entity_fields(&tree, None, WriteMode::Replace);
    assert_eq!(entity["work_email"], "w@example.com");
    assert_eq!(entity["home_email"], Value::Null);
    assert!(!entity.values().any(|v| v == "x@example.com"));
}

#[test]
fn test_missing_policy_from_configuration() {
    let config = ScimConfig::from_json_str(r#"{"missingAttributePolicy": "preserve"}"#).unwrap();
    assert_eq!(config.missing_attribute_policy, MissingAttributePolicy::Preserve);

    let user = common::user_type();
    let (tree, _) = user.build_tree(&json!({"userName": "bjensen"}));
    let existing = fields(json!({"login": "bjensen", "job_title": "Tour Guide"}));

    let preserving = common::user_mapping().with_missing_policy(config.missing_attribute_policy);
    let updates = preserving.to_entity_fields(&tree, Some(&existing), WriteMode::Replace);
    assert_eq!(updates, fields(json!({"login": "bjensen"})));

    let clearing = common::user_mapping();
    let updates = clearing.to_entity_fields(&tree, Some(&existing), WriteMode::Replace);
    assert_eq!(updates["job_title"], Value::Null);
}

#[test]
fn test_display_only_sub_fields_never_written() {
    let group = common::group_type();
    let mapping = common::group_mapping();
    let existing = fields(json!({
        "title": "Tour Guides",
        "memberships": [{"user_id": "u1", "user_label": "Babs Jensen"}]
    }));
    let (tree, errors) = group.build_tree(&json!({
        "displayName": "Tour Guides",
        "members": [
            {"value": "u1", "display": "Somebody Else"},
            {"value": "u2", "display": "Mandy Pepperidge"}
        ]
    }));
    assert!(errors.is_empty());

    let updates = mapping.to_entity_fields(&tree, Some(&existing), WriteMode::Replace);
    assert_eq!(
        updates["memberships"],
        json!([
            {"user_id": "u1", "user_label": "Babs Jensen"},
            {"user_id": "u2"}
        ])
    );

    // The mapping is fully replaceable, so PUT drops members left out.
    let (tree, _) = group.build_tree(&json!({"displayName": "Tour Guides", "members": []}));
    let updates = mapping.to_entity_fields(&tree, Some(&existing), WriteMode::Replace);
    assert_eq!(updates["memberships"], json!([]));
}
