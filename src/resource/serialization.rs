//! Rendering resources to their outbound JSON shape.
//!
//! `schemas` lists the primary schema first, followed by each extension that
//! has data, in declaration order. Attributes that are never returned
//! (`returned: never`, `mutability: writeOnly`) and unassigned values are
//! omitted. `meta` always carries `resourceType` and `version`.

use crate::resource::{AttributeTree, AttributeValue, Resource};
use crate::schema::ResourceType;
use crate::schema::embedded;
use crate::schema::types::AttributeDefinition;
use chrono::SecondsFormat;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

pub(crate) fn render(resource: &Resource) -> Value {
    let resource_type = resource.resource_type();
    let mut body = render_body(resource_type, resource.tree());

    let mut meta = Map::new();
    meta.insert("resourceType".into(), json!(resource_type.name));
    if let Some(m) = resource.meta() {
        meta.insert(
            "created".into(),
            json!(m.created.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        meta.insert(
            "lastModified".into(),
            json!(m.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if let Some(location) = &m.location {
            meta.insert("location".into(), json!(location));
        }
    }
    meta.insert("version".into(), json!(resource.version().to_etag()));

    if let Value::Object(map) = &mut body {
        map.insert("meta".into(), Value::Object(meta));
    }
    body
}

/// Everything except `meta`.
pub(crate) fn render_body(resource_type: &ResourceType, tree: &AttributeTree) -> Value {
    let mut body = Map::new();
    let mut schemas = vec![json!(resource_type.schema.id)];

    for common in embedded::common_attributes() {
        if common.name == "meta" {
            continue;
        }
        render_attribute(common, tree, &mut body);
    }
    for definition in &resource_type.schema.attributes {
        render_attribute(definition, tree, &mut body);
    }

    for extension in &resource_type.extensions {
        let Some(ext_tree) = tree
            .get(&extension.schema.id)
            .and_then(AttributeValue::as_complex)
        else {
            continue;
        };
        let rendered = render_attributes(&extension.schema.attributes, ext_tree);
        if !rendered.is_empty() {
            schemas.push(json!(extension.schema.id));
            body.insert(extension.schema.id.clone(), Value::Object(rendered));
        }
    }

    body.insert("schemas".into(), Value::Array(schemas));
    Value::Object(body)
}

fn render_attributes(definitions: &[AttributeDefinition], tree: &AttributeTree) -> Map<String, Value> {
    let mut out = Map::new();
    for definition in definitions {
        render_attribute(definition, tree, &mut out);
    }
    out
}

fn render_attribute(definition: &AttributeDefinition, tree: &AttributeTree, out: &mut Map<String, Value>) {
    if !definition.is_returnable() {
        return;
    }
    match tree.get(&definition.name) {
        Some(value) if !value.is_unassigned() => {
            out.insert(definition.name.clone(), render_value(definition, value));
        }
        _ => {}
    }
}

fn render_value(definition: &AttributeDefinition, value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Complex(tree) if definition.is_complex() => {
            Value::Object(render_attributes(&definition.sub_attributes, tree))
        }
        AttributeValue::List(items) => {
            Value::Array(items.iter().map(|item| render_value(definition, item)).collect())
        }
        other => other.to_json(),
    }
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}
