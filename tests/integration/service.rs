//! End-to-end resource operations over the in-memory store.

use crate::common;
use scim_core::patch::PATCH_OP_SCHEMA;
use scim_core::{InMemoryEntityStore, ListQuery, ResourceService, ScimConfig};
use serde_json::{Value, json};

fn users() -> ResourceService<InMemoryEntityStore> {
    common::init_logging();
    ResourceService::new(
        common::user_type(),
        common::user_mapping(),
        InMemoryEntityStore::new().with_unique_field("login"),
        ScimConfig::new()
            .with_base_url("https://scim.example.com")
            .with_page_sizes(10, 50),
    )
}

fn groups() -> ResourceService<InMemoryEntityStore> {
    ResourceService::new(
        common::group_type(),
        common::group_mapping(),
        InMemoryEntityStore::new(),
        ScimConfig::new(),
    )
}

fn patch_body(operations: Value) -> Value {
    json!({"schemas": [PATCH_OP_SCHEMA], "Operations": operations})
}

fn id_of(resource: &Value) -> String {
    resource["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_user_lifecycle() {
    let service = users();

    let created = service
        .create(&json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bjensen",
            "displayName": "Babs Jensen",
            "title": "Tour Guide",
            "name": {"givenName": "Barbara", "familyName": "Jensen"},
            "emails": [{"value": "bjensen@example.com", "type": "work"}]
        }))
        .await
        .unwrap();
    let id = id_of(&created);
    assert_eq!(created["name"]["familyName"], "Jensen");
    assert_eq!(created["emails"][0]["value"], "bjensen@example.com");
    assert_eq!(
        created["meta"]["location"],
        format!("https://scim.example.com/v2/Users/{}", id)
    );

    // PUT leaves out title, which clears it.
    let replaced = service
        .replace(&id, &json!({"userName": "bjensen", "displayName": "Babs"}))
        .await
        .unwrap();
    assert_eq!(replaced["displayName"], "Babs");
    assert!(replaced.get("title").is_none());
    assert!(replaced.get("emails").is_none());

    let patched = service
        .patch(
            &id,
            &patch_body(json!([
                {"op": "add", "path": "title", "value": "Head Guide"},
                {"op": "add", "path": "emails[type eq \"work\"].value", "value": "babs@example.com"}
            ])),
        )
        .await
        .unwrap();
    assert_eq!(patched["title"], "Head Guide");
    assert_eq!(patched["displayName"], "Babs");
    assert_eq!(patched["emails"], json!([{"value": "babs@example.com", "type": "work"}]));
    assert_eq!(service.get(&id).await.unwrap(), patched);

    service.delete(&id).await.unwrap();
    let err = service.get(&id).await.unwrap_err();
    assert_eq!(err.status(), 404);
}

#[tokio::test]
async fn test_list_pages_and_filters() {
    let service = users();
    for login in ["alice", "bob", "carol"] {
        service.create(&json!({"userName": login})).await.unwrap();
    }

    let page = service
        .list(&ListQuery::new().with_start_index(2).with_count(2))
        .await
        .unwrap();
    assert_eq!(page.total_results, 3);
    assert_eq!(page.start_index, 2);
    assert_eq!(page.items_per_page, 2);
    let names: Vec<_> = page.resources.iter().map(|r| r["userName"].clone()).collect();
    assert_eq!(names, vec![json!("bob"), json!("carol")]);

    let rendered = serde_json::to_value(&page).unwrap();
    assert_eq!(rendered["totalResults"], 3);
    assert_eq!(rendered["Resources"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        rendered["schemas"],
        json!(["urn:ietf:params:scim:api:messages:2.0:ListResponse"])
    );

    let filtered = service
        .list(
            &ListQuery::new()
                .with_filter(r#"userName sw "B" or userName eq "CAROL""#)
                .with_count(1),
        )
        .await
        .unwrap();
    assert_eq!(filtered.total_results, 2);
    assert_eq!(filtered.resources.len(), 1);
    assert_eq!(filtered.resources[0]["userName"], "bob");

    let beyond = service
        .list(&ListQuery::new().with_start_index(10))
        .await
        .unwrap();
    assert_eq!(beyond.total_results, 3);
    assert!(beyond.resources.is_empty());
}

#[tokio::test]
async fn test_unmapped_filter_is_rejected() {
    let service = users();
    service.create(&json!({"userName": "bjensen"})).await.unwrap();

    let err = service
        .list(&ListQuery::new().with_filter(r#"nickName eq "Babs""#))
        .await
        .unwrap_err();
    assert_eq!(err.scim_type(), Some("invalidFilter"));
    assert_eq!(err.status(), 400);

    let err = service
        .list(&ListQuery::new().with_filter("userName"))
        .await
        .unwrap_err();
    assert_eq!(err.scim_type(), Some("invalidFilter"));
}

#[tokio::test]
async fn test_conflicts_and_missing_resources() {
    let service = users();
    let created = service.create(&json!({"userName": "bjensen"})).await.unwrap();

    let err = service.create(&json!({"userName": "BJensen"})).await.unwrap_err();
    assert_eq!(err.scim_type(), Some("uniqueness"));
    assert_eq!(err.status(), 409);

    let other = service.create(&json!({"userName": "mpepperidge"})).await.unwrap();
    let err = service
        .replace(&id_of(&other), &json!({"userName": "bjensen"}))
        .await
        .unwrap_err();
    assert_eq!(err.scim_type(), Some("uniqueness"));

    assert_eq!(service.get("missing").await.unwrap_err().status(), 404);
    assert_eq!(
        service
            .replace("missing", &json!({"userName": "x"}))
            .await
            .unwrap_err()
            .status(),
        404
    );
    assert!(service.delete("missing").await.is_err());
    assert!(service.get(&id_of(&created)).await.is_ok());
}

#[tokio::test]
async fn test_rejected_patch_writes_nothing() {
    let service = users();
    let created = service
        .create(&json!({"userName": "bjensen", "title": "Tour Guide"}))
        .await
        .unwrap();
    let id = id_of(&created);

    let err = service
        .patch(
            &id,
            &patch_body(json!([
                {"op": "replace", "path": "title", "value": "Manager"},
                {"op": "remove", "path": "userName"}
            ])),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);

    let err = service
        .patch(&id, &json!({"Operations": [{"op": "copy", "path": "title"}]}))
        .await
        .unwrap_err();
    assert_eq!(err.scim_type(), Some("invalidSyntax"));

    let current = service.get(&id).await.unwrap();
    assert_eq!(current["title"], "Tour Guide");
    assert_eq!(current["userName"], "bjensen");
}

#[tokio::test]
async fn test_group_memberships() {
    let service = groups();
    let created = service
        .create(&json!({
            "displayName": "Tour Guides",
            "members": [{"value": "u1", "display": "Babs Jensen"}, {"value": "u2"}]
        }))
        .await
        .unwrap();
    let id = id_of(&created);
    assert_eq!(created["members"], json!([{"value": "u1"}, {"value": "u2"}]));

    let found = service
        .list(&ListQuery::new().with_filter(r#"members.value eq "u2""#))
        .await
        .unwrap();
    assert_eq!(found.total_results, 1);

    let patched = service
        .patch(&id, &patch_body(json!([{"op": "remove", "path": "members[value eq \"u1\"]"}])))
        .await
        .unwrap();
    assert_eq!(patched["members"], json!([{"value": "u2"}]));

    let err = service
        .patch(
            &id,
            &patch_body(json!([{"op": "replace", "path": "members[value eq \"u2\"].value", "value": "u9"}])),
        )
        .await
        .unwrap_err();
    assert_eq!(err.scim_type(), Some("mutability"));

    let none = service
        .list(&ListQuery::new().with_filter(r#"members.value eq "u1""#))
        .await
        .unwrap();
    assert_eq!(none.total_results, 0);
}

#[tokio::test]
async fn test_if_match_guards_writes() {
    let service = users();
    let created = service.create(&json!({"userName": "bjensen"})).await.unwrap();
    let id = id_of(&created);
    let original = created["meta"]["version"].as_str().unwrap().to_string();

    let patched = service
        .patch_if_match(
            &id,
            &patch_body(json!([{"op": "add", "path": "title", "value": "Tour Guide"}])),
            &original,
        )
        .await
        .unwrap();
    let current = patched["meta"]["version"].as_str().unwrap().to_string();
    assert_ne!(current, original);

    let err = service
        .replace_if_match(&id, &json!({"userName": "bjensen"}), &original)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 412);
    assert_eq!(service.get(&id).await.unwrap()["title"], "Tour Guide");

    let err = service
        .replace_if_match(&id, &json!({"userName": "bjensen"}), "W/\"")
        .await
        .unwrap_err();
    assert_eq!(err.scim_type(), Some("invalidSyntax"));

    let replaced = service
        .replace_if_match(&id, &json!({"userName": "bjensen", "displayName": "Babs"}), &current)
        .await
        .unwrap();
    assert_eq!(replaced["displayName"], "Babs");
    assert!(replaced.get("title").is_none());

    service
        .replace_if_match(&id, &json!({"userName": "bjensen"}), "*")
        .await
        .unwrap();
}
