//! Tree to entity field conversion and back.

use super::description::{AttributeMappings, ListMapping, Mapping, MappingDescription, MatchedSlot, WriteMode};
use super::EntityFields;
use crate::filter::QueryableAttributes;
use crate::resource::{AttributeTree, AttributeValue};
use crate::schema::validation::join_path;
use log::trace;
use serde_json::{Map, Value};

impl MappingDescription {
    /// Compute the backend field update set for a tree.
    ///
    /// `existing` is the current entity, if any; list correspondences reconcile
    /// against its entries. Only fields the mapping can write appear in the
    /// result, so callers merge it over the stored entity.
    pub fn to_entity_fields(
        &self,
        tree: &AttributeTree,
        existing: Option<&EntityFields>,
        mode: WriteMode,
    ) -> EntityFields {
        let mut writer = Writer {
            clear_missing: self.clears_missing(mode),
            mode,
            existing,
            out: Map::new(),
        };
        writer.write_attributes(&self.attributes, Some(tree));
        trace!("Mapped tree to {} entity fields ({:?})", writer.out.len(), mode);
        writer.out
    }

    /// Build a tree from an entity's fields.
    pub fn from_entity(&self, entity: &EntityFields) -> AttributeTree {
        let mut tree = AttributeTree::new();
        read_attributes(&self.attributes, entity, &mut tree);
        tree
    }

    /// Attribute paths usable in filters, derived from field correspondences.
    ///
    /// Nested mappings yield dotted paths (`name.familyName`), extension
    /// mappings yield URN-qualified paths and list mappings yield dotted
    /// backend fields reaching into each sub-entity.
    pub fn queryable_attributes(&self) -> QueryableAttributes {
        let mut queryable = QueryableAttributes::new();
        collect_queryable(&self.attributes, "", "", &mut queryable);
        queryable
    }
}

struct Writer<'a> {
    clear_missing: bool,
    mode: WriteMode,
    existing: Option<&'a EntityFields>,
    out: EntityFields,
}

impl Writer<'_> {
    fn write_attributes(&mut self, mappings: &AttributeMappings, tree: Option<&AttributeTree>) {
        for (name, mapping) in mappings.iter() {
            let value = tree
                .and_then(|t| t.get(name))
                .filter(|v| !v.is_unassigned());
            match mapping {
                Mapping::Field { writable: false, .. } | Mapping::Constant(_) => {}
                Mapping::Field { field, .. } => match value {
                    Some(value) => {
                        self.out.insert(field.clone(), value.to_json());
                    }
                    None if self.clear_missing => {
                        self.out.insert(field.clone(), Value::Null);
                    }
                    None => {}
                },
                Mapping::Complex(nested) => {
                    let nested_tree = value.and_then(AttributeValue::as_complex);
                    if nested_tree.is_some() || self.clear_missing {
                        self.write_attributes(nested, nested_tree);
                    }
                }
                Mapping::Matched(slots) => {
                    for slot in slots {
                        let element = value.and_then(|v| find_slot_element(v, slot));
                        if element.is_some() || self.clear_missing {
                            self.write_attributes(&slot.using, element);
                        }
                    }
                }
                Mapping::List(list) => {
                    if value.is_some() || self.clear_missing {
                        self.write_list(list, value);
                    }
                }
            }
        }
    }

    fn write_list(&mut self, list: &ListMapping, value: Option<&AttributeValue>) {
        let elements: Vec<&AttributeTree> = match value {
            Some(AttributeValue::List(items)) => items.iter().filter_map(AttributeValue::as_complex).collect(),
            Some(AttributeValue::Complex(tree)) => vec![tree],
            _ => Vec::new(),
        };
        let existing: Vec<&EntityFields> = self
            .existing
            .and_then(|e| e.get(&list.field))
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();

        let mut claimed = vec![false; existing.len()];
        let mut entries = Vec::with_capacity(elements.len());

        for element in elements.iter().copied() {
            let matched = match &list.key {
                Some(key) => element_key(element, key).and_then(|key_value| {
                    let field = key_field(list, key)?;
                    (0..existing.len()).find(|&i| {
                        !claimed[i] && existing[i].get(field).is_some_and(|v| v == key_value)
                    })
                }),
                None => (0..existing.len())
                    .find(|&i| !claimed[i] && writable_fields_agree(&list.using, Some(element), existing[i])),
            };

            let mut entry = match matched {
                Some(i) => {
                    claimed[i] = true;
                    existing[i].clone()
                }
                None => Map::new(),
            };
            let mut entry_writer = Writer {
                clear_missing: self.clear_missing,
                mode: self.mode,
                existing: Some(&entry),
                out: Map::new(),
            };
            entry_writer.write_attributes(&list.using, Some(element));
            let updates = entry_writer.out;
            entry.extend(updates);
            entries.push(Value::Object(entry));
        }

        // A full replace of a non-replaceable list keeps entries the client
        // did not mention; anywhere else they are gone.
        if self.mode == WriteMode::Replace && !list.replaceable {
            for (i, entry) in existing.iter().enumerate() {
                if !claimed[i] {
                    entries.push(Value::Object((*entry).clone()));
                }
            }
        }

        self.out.insert(list.field.clone(), Value::Array(entries));
    }
}

fn find_slot_element<'a>(value: &'a AttributeValue, slot: &MatchedSlot) -> Option<&'a AttributeTree> {
    let matches = |tree: &&AttributeTree| {
        tree.get_str(&slot.match_attribute)
            .is_some_and(|v| slot.matches(v))
    };
    match value {
        AttributeValue::List(items) => items.iter().filter_map(AttributeValue::as_complex).find(matches),
        AttributeValue::Complex(tree) => Some(tree).filter(matches),
        AttributeValue::Scalar(_) => None,
    }
}

/// Whether every writable field an element maps to holds the same value in
/// `entry`. Absent and null count as equal.
fn writable_fields_agree(mappings: &AttributeMappings, tree: Option<&AttributeTree>, entry: &EntityFields) -> bool {
    mappings.iter().all(|(name, mapping)| {
        let value = tree.and_then(|t| t.get(name)).filter(|v| !v.is_unassigned());
        match mapping {
            Mapping::Field { field, writable: true } => {
                let stored = entry.get(field).filter(|v| !v.is_null());
                match (value, stored) {
                    (Some(value), Some(stored)) => value.to_json() == *stored,
                    (None, None) => true,
                    _ => false,
                }
            }
            Mapping::Complex(nested) => {
                writable_fields_agree(nested, value.and_then(AttributeValue::as_complex), entry)
            }
            _ => true,
        }
    })
}

fn element_key<'a>(element: &'a AttributeTree, key: &str) -> Option<&'a Value> {
    element.get(key).and_then(AttributeValue::as_scalar).filter(|v| !v.is_null())
}

/// Backend field that stores a list's key sub-attribute.
fn key_field<'a>(list: &'a ListMapping, key: &str) -> Option<&'a str> {
    match list.using.get(key)? {
        Mapping::Field { field, .. } => Some(field),
        _ => None,
    }
}

/// Returns whether any non-constant mapping contributed a value.
fn read_attributes(mappings: &AttributeMappings, fields: &EntityFields, tree: &mut AttributeTree) -> bool {
    let mut found = false;
    for (name, mapping) in mappings.iter() {
        match mapping {
            Mapping::Field { field, .. } => {
                if let Some(value) = fields.get(field).filter(|v| !v.is_null()) {
                    tree.insert(name, AttributeValue::from_json_untyped(value));
                    found = true;
                }
            }
            Mapping::Constant(value) => {
                tree.insert(name, AttributeValue::Scalar(value.clone()));
            }
            Mapping::Complex(nested) => {
                let mut nested_tree = AttributeTree::new();
                if read_attributes(nested, fields, &mut nested_tree) {
                    tree.insert(name, AttributeValue::Complex(nested_tree));
                    found = true;
                }
            }
            Mapping::Matched(slots) => {
                let mut elements = Vec::new();
                for slot in slots {
                    let mut element = AttributeTree::new();
                    if read_attributes(&slot.using, fields, &mut element) {
                        if !element.contains(&slot.match_attribute) {
                            element.insert(
                                slot.match_attribute.clone(),
                                AttributeValue::Scalar(Value::String(slot.match_value.clone())),
                            );
                        }
                        elements.push(AttributeValue::Complex(element));
                    }
                }
                if !elements.is_empty() {
                    tree.insert(name, AttributeValue::List(elements));
                    found = true;
                }
            }
            Mapping::List(list) => {
                let elements: Vec<AttributeValue> = fields
                    .get(&list.field)
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_object)
                    .filter_map(|entry| {
                        let mut element = AttributeTree::new();
                        read_attributes(&list.using, entry, &mut element)
                            .then_some(AttributeValue::Complex(element))
                    })
                    .collect();
                if !elements.is_empty() {
                    tree.insert(name, AttributeValue::List(elements));
                    found = true;
                }
            }
        }
    }
    found
}

fn collect_queryable(mappings: &AttributeMappings, path_prefix: &str, field_prefix: &str, out: &mut QueryableAttributes) {
    for (name, mapping) in mappings.iter() {
        let path = join_path(path_prefix, name);
        match mapping {
            Mapping::Field { field, .. } => out.insert(path, format!("{}{}", field_prefix, field)),
            Mapping::Complex(nested) => {
                // Extension namespaces are addressed as `urn:...:attr`.
                let nested_prefix = if name.contains(':') { format!("{}:", path) } else { path };
                collect_queryable(nested, &nested_prefix, field_prefix, out);
            }
            Mapping::List(list) => {
                collect_queryable(&list.using, &path, &format!("{}{}.", field_prefix, list.field), out);
            }
            Mapping::Constant(_) | Mapping::Matched(_) => {}
        }
    }
}
