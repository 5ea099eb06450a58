//! PATCH paths, request bodies and batches against trees and entities.

use crate::common::{self, fields, fixtures::rfc_examples};
use scim_core::filter::Literal;
use scim_core::mapper::{AttributeMappings, ListMapping};
use scim_core::patch::{PatchOp, Selector};
use scim_core::schema::embedded::USER_SCHEMA;
use scim_core::{AttributeTree, AttributeValue, MappingDescription, PatchEngine, PatchOperation, PatchRequest, PathError, PathSpec, ScimError};
use serde_json::{Value, json};

fn user_tree(raw: Value) -> AttributeTree {
    let (tree, errors) = common::user_type().build_tree(&raw);
    assert!(errors.is_empty(), "{:?}", errors);
    tree
}

fn json_at(tree: &AttributeTree, name: &str) -> Value {
    tree.get(name).map(AttributeValue::to_json).unwrap_or(Value::Null)
}

#[test]
fn test_path_shapes() {
    let plain = PathSpec::parse("name.givenName").unwrap();
    assert_eq!((plain.attribute.as_str(), plain.sub_attribute.as_deref()), ("name", Some("givenName")));
    assert!(plain.schema.is_none() && plain.selector.is_none());

    let selected = PathSpec::parse(r#"emails[type eq "work"].value"#).unwrap();
    assert_eq!(
        selected.selector,
        Some(Selector {
            attribute: "type".into(),
            value: Literal::String("work".into()),
        })
    );
    assert_eq!(selected.sub_attribute.as_deref(), Some("value"));

    let qualified: PathSpec = format!("{}:name.familyName", USER_SCHEMA).parse().unwrap();
    assert_eq!(qualified.schema.as_deref(), Some(USER_SCHEMA));
    assert_eq!(qualified.attribute, "name");
    assert_eq!(qualified.to_string(), format!("{}:name.familyName", USER_SCHEMA));
}

#[test]
fn test_selector_restricted_to_single_equality() {
    let path = r#"emails[type ne "work"]"#;
    assert_eq!(
        PathSpec::parse(path),
        Err(PathError::UnsupportedSelectorOperator {
            path: path.to_string(),
            operator: "ne".to_string(),
        })
    );
    assert!(matches!(
        PathSpec::parse(r#"emails[type eq "work" and primary eq true]"#),
        Err(PathError::UnsupportedSelector { .. })
    ));
    assert!(matches!(
        PathSpec::parse(r#"emails[not (type eq "work")]"#),
        Err(PathError::UnsupportedSelector { .. })
    ));
    assert!(matches!(
        PathSpec::parse("emails[value pr]"),
        Err(PathError::UnsupportedSelectorOperator { .. })
    ));

    let err = ScimError::from(PathSpec::parse(path).unwrap_err());
    assert_eq!(err.scim_type(), Some("invalidPath"));
}

#[test]
fn test_malformed_paths() {
    for path in ["", "name..givenName", "emails[type eq \"work\"", "1title", "emails[type eq \"work\"]value", "a.b.c"] {
        assert!(PathSpec::parse(path).is_err(), "{:?} should not parse", path);
    }
}

#[test]
fn test_request_body() {
    let request = PatchRequest::from_json(&json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
        "Operations": [
            {"op": "add", "path": "emails[type eq \"work\"].value", "value": "bjensen@example.com"},
            {"op": "Remove", "path": "nickName"}
        ]
    }))
    .unwrap();
    assert_eq!(request.operations[1].op, PatchOp::Remove);

    let err = PatchRequest::from_json(&json!({"Operations": []})).unwrap_err();
    assert_eq!(err.scim_type(), Some("invalidSyntax"));

    let err = PatchRequest::from_json(&json!({"Operations": [{"op": "move", "path": "title"}]})).unwrap_err();
    assert_eq!(err.scim_type(), Some("invalidSyntax"));

    let err = PatchRequest::from_json(&json!({"Operations": [{"op": "remove"}]})).unwrap_err();
    assert_eq!(err.scim_type(), Some("noTarget"));

    let err = PatchRequest::from_json(&json!({"Operations": [{"op": "replace", "path": "title"}]})).unwrap_err();
    assert_eq!(err.scim_type(), Some("invalidValue"));
}

#[test]
fn test_selector_removal_on_collection() {
    let user = common::user_type();
    let engine = PatchEngine::new(&user);
    let original = user_tree(json!({
        "userName": "bjensen",
        "emails": [{"type": "work", "value": "a"}, {"type": "home", "value": "b"}]
    }));

    let mut tree = original.clone();
    engine
        .apply(&mut tree, &[PatchOperation::remove(r#"emails[type eq "work"]"#)])
        .unwrap();
    assert_eq!(json_at(&tree, "emails"), json!([{"type": "home", "value": "b"}]));

    let mut tree = original.clone();
    engine.apply(&mut tree, &[PatchOperation::remove("emails")]).unwrap();
    assert_eq!(json_at(&tree, "emails"), json!([]));

    let mut tree = original;
    engine
        .apply(&mut tree, &[PatchOperation::remove(r#"emails[type eq "other"]"#)])
        .unwrap();
    assert_eq!(json_at(&tree, "emails").as_array().map(Vec::len), Some(2));
}

#[test]
fn test_batch_on_rfc_user() {
    let user = common::user_type();
    let engine = PatchEngine::new(&user);
    let (mut tree, _) = user.build_tree(&rfc_examples::user_full());

    engine
        .apply(
            &mut tree,
            &[
                PatchOperation::replace(format!("{}:name.givenName", USER_SCHEMA), json!("Babs")),
                PatchOperation::replace(r#"phoneNumbers[type eq "mobile"].value"#, json!("555-555-0000")),
                PatchOperation::add(r#"emails[type eq "other"]"#, json!({"value": "b@example.net"})),
                PatchOperation::remove("emails.primary"),
                PatchOperation::replace("active", json!(false)),
            ],
        )
        .unwrap();

    assert_eq!(tree.get_path(&["name", "givenName"]).and_then(AttributeValue::as_str), Some("Babs"));
    assert_eq!(tree.get_path(&["name", "familyName"]).and_then(AttributeValue::as_str), Some("Jensen"));
    assert_eq!(
        json_at(&tree, "phoneNumbers"),
        json!([
            {"value": "555-555-5555", "type": "work"},
            {"value": "555-555-0000", "type": "mobile"}
        ])
    );
    assert_eq!(
        json_at(&tree, "emails"),
        json!([
            {"value": "bjensen@example.com", "type": "work"},
            {"value": "babs@jensen.org", "type": "home"},
            {"value": "b@example.net", "type": "other"}
        ])
    );
    assert!(user.validate(&tree).is_ok());
}

#[test]
fn test_failed_batch_is_reported_with_path() {
    let user = common::user_type();
    let engine = PatchEngine::new(&user);
    let mut tree = user_tree(json!({"userName": "bjensen"}));

    let err = engine
        .apply(
            &mut tree,
            &[
                PatchOperation::add("title", json!("Tour Guide")),
                PatchOperation::replace(r#"emails[type ne "work"].value"#, json!("x")),
            ],
        )
        .unwrap_err();

    assert!(matches!(err, ScimError::InvalidPath(PathError::UnsupportedSelectorOperator { .. })));
    assert!(err.to_string().contains(r#"emails[type ne "work"].value"#));
    assert_eq!(tree.get_str("title"), Some("Tour Guide"));
}

#[test]
fn test_patch_entity_through_matched_slots() {
    let user = common::user_type();
    let mapping = common::user_mapping();
    let engine = PatchEngine::new(&user);
    let mut entity = fields(json!({
        "login": "bjensen",
        "work_email": "bjensen@example.com",
        "home_email": "babs@jensen.org",
        "first_name": "Barbara"
    }));

    let updates = engine
        .apply_to_entity(
            &mut entity,
            &mapping,
            &[
                PatchOperation::replace(r#"emails[type eq "work"].value"#, json!("babs@example.com")),
                PatchOperation::remove(r#"emails[type eq "home"]"#),
                PatchOperation::add("name.familyName", json!("Jensen")),
            ],
        )
        .unwrap();

    assert_eq!(updates["work_email"], "babs@example.com");
    assert_eq!(updates["home_email"], Value::Null);
    assert_eq!(updates["last_name"], "Jensen");
    assert_eq!(
        entity,
        fields(json!({
            "login": "bjensen",
            "work_email": "babs@example.com",
            "first_name": "Barbara",
            "last_name": "Jensen"
        }))
    );
}

#[test]
fn test_patch_group_memberships() {
    let group = common::group_type();
    let mapping = common::group_mapping();
    let engine = PatchEngine::new(&group);
    let mut entity = fields(json!({
        "title": "Admins",
        "memberships": [
            {"user_id": "u1", "user_label": "Alice"},
            {"user_id": "u2", "user_label": "Bob"}
        ]
    }));

    engine
        .apply_to_entity(
            &mut entity,
            &mapping,
            &[
                PatchOperation::remove(r#"members[value eq "u1"]"#),
                PatchOperation::add(r#"members[value eq "u3"]"#, json!({"value": "u3", "display": "Carol"})),
            ],
        )
        .unwrap();
    assert_eq!(
        entity["memberships"],
        json!([{"user_id": "u2", "user_label": "Bob"}, {"user_id": "u3"}])
    );

    let err = engine
        .apply_to_entity(
            &mut entity,
            &mapping,
            &[
                PatchOperation::replace("displayName", json!("Operators")),
                PatchOperation::replace(r#"members[value eq "u2"].value"#, json!("u9")),
            ],
        )
        .unwrap_err();
    assert_eq!(err.scim_type(), Some("mutability"));
    assert_eq!(entity["title"], "Operators");
    assert_eq!(entity["memberships"][0]["user_id"], "u2");
}

#[test]
fn test_patch_unkeyed_list_keeps_entries_with_their_elements() {
    let group = common::group_type();
    let engine = PatchEngine::new(&group);
    let mapping = MappingDescription::new(
        AttributeMappings::new().field("displayName", "title").list(
            "members",
            ListMapping::new(
                "memberships",
                AttributeMappings::new()
                    .field("value", "user_id")
                    .read_only("display", "user_label"),
            ),
        ),
    );
    let mut entity = fields(json!({
        "title": "Admins",
        "memberships": [
            {"user_id": "u1", "user_label": "Alice", "joined": "2024-01-01"},
            {"user_id": "u2", "user_label": "Bob", "joined": "2024-02-01"}
        ]
    }));

    engine
        .apply_to_entity(&mut entity, &mapping, &[PatchOperation::remove(r#"members[value eq "u1"]"#)])
        .unwrap();
    assert_eq!(
        entity["memberships"],
        json!([{"user_id": "u2", "user_label": "Bob", "joined": "2024-02-01"}])
    );

    engine
        .apply_to_entity(
            &mut entity,
            &mapping,
            &[PatchOperation::add(r#"members[value eq "u3"]"#, json!({"value": "u3", "display": "Carol"}))],
        )
        .unwrap();
    assert_eq!(
        entity["memberships"],
        json!([
            {"user_id": "u2", "user_label": "Bob", "joined": "2024-02-01"},
            {"user_id": "u3"}
        ])
    );
}
