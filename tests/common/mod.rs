//! Common test utilities.
//!
//! A shared registry built from the embedded schemas, the resource types
//! composed from it, and the entity mappings the service tests store through.

use scim_core::mapper::{AttributeMappings, ListMapping, MatchedSlot};
use scim_core::schema::embedded::ENTERPRISE_USER_SCHEMA;
use scim_core::{EntityFields, MappingDescription, ResourceType, SchemaRegistry};
use serde_json::Value;
use std::sync::{Arc, LazyLock};


static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(|| {
    SchemaRegistry::with_embedded_schemas().expect("embedded schemas must load")
});

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

pub fn user_type() -> Arc<ResourceType> {
    REGISTRY.resource_type("User").expect("User resource type").clone()
}

pub fn group_type() -> Arc<ResourceType> {
    REGISTRY.resource_type("Group").expect("Group resource type").clone()
}

/// A user row with flat columns: work and home emails in their own fields,
/// the name split into first/last and the enterprise employee number.
pub fn user_mapping() -> MappingDescription {
    MappingDescription::new(
        AttributeMappings::new()
            .field("userName", "login")
            .field("displayName", "display_name")
            .field("title", "job_title")
            .field("active", "enabled")
            .complex(
                "name",
                AttributeMappings::new()
                    .field("givenName", "first_name")
                    .field("familyName", "last_name"),
            )
            .matched(
                "emails",
                vec![
                    MatchedSlot::new(
                        "type",
                        "work",
                        AttributeMappings::new()
                            .field("value", "work_email")
                            .field("primary", "work_email_primary"),
                    ),
                    MatchedSlot::new("type", "home", AttributeMappings::new().field("value", "home_email")),
                ],
            )
            .complex(
                ENTERPRISE_USER_SCHEMA,
                AttributeMappings::new()
                    .field("employeeNumber", "employee_no")
                    .field("department", "department"),
            ),
    )
}

/// A group row holding its members as an array of membership records keyed
/// by user id. The member label is display-only.
pub fn group_mapping() -> MappingDescription {
    MappingDescription::new(
        AttributeMappings::new().field("displayName", "title").list(
            "members",
            ListMapping::new(
                "memberships",
                AttributeMappings::new()
                    .field("value", "user_id")
                    .read_only("display", "user_label"),
            )
            .keyed_by("value")
            .replaceable(),
        ),
    )
}

pub fn fields(value: Value) -> EntityFields {
    value.as_object().cloned().expect("entity fields must be an object")
}
