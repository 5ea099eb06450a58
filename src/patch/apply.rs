//! Applying PATCH operations to attribute trees and backend entities.

use super::operation::{PatchOp, PatchOperation};
use super::path::{PathSpec, Selector};
use crate::error::{PathError, ScimError, ScimResult, ValidationError, ValidationErrors};
use crate::filter::evaluate::literal_equals;
use crate::mapper::{EntityFields, MappingDescription, WriteMode};
use crate::resource::builder::{build_attribute_value, build_element};
use crate::resource::{AttributeTree, AttributeValue};
use crate::schema::types::find_by_name;
use crate::schema::validation::{join_path, validate_value};
use crate::schema::{AttributeDefinition, Mutability, ResourceType};
use log::{debug, warn};
use serde_json::Value;

/// Applies PATCH operations for one resource type.
///
/// Operations run in order and each sees the effect of the ones before it.
/// An operation is applied to a working copy and only committed once its path
/// resolved, mutability allowed the write and the touched attribute still
/// validates, so a failing operation leaves the target as the previous
/// operation left it.
#[derive(Debug, Clone, Copy)]
pub struct PatchEngine<'a> {
    resource_type: &'a ResourceType,
}

/// A resolved path: the attribute definitions it addresses and where they live.
struct Target<'a> {
    path: String,
    /// Validation path of the top-level attribute.
    label: String,
    /// Extension URN holding the attribute, `None` at the resource root.
    namespace: Option<String>,
    schema_id: String,
    definition: &'a AttributeDefinition,
    selector: Option<Selector>,
    sub: Option<&'a AttributeDefinition>,
}

impl<'a> PatchEngine<'a> {
    pub fn new(resource_type: &'a ResourceType) -> Self {
        Self { resource_type }
    }

    /// Apply `operations` to `tree` in order, stopping at the first failure.
    pub fn apply(&self, tree: &mut AttributeTree, operations: &[PatchOperation]) -> ScimResult<()> {
        for (index, operation) in operations.iter().enumerate() {
            if let Err(error) = self.apply_operation(tree, operation) {
                warn!(
                    "PATCH operation {} ({} {}) on {} failed: {}",
                    index,
                    operation.op,
                    operation.path.as_deref().unwrap_or("<root>"),
                    self.resource_type.name,
                    error
                );
                return Err(error);
            }
        }
        Ok(())
    }

    pub fn apply_operation(&self, tree: &mut AttributeTree, operation: &PatchOperation) -> ScimResult<()> {
        operation.check()?;

        let mut working = tree.clone();
        match operation.path.as_deref() {
            Some(path) => {
                let spec = PathSpec::parse(path)?;
                self.apply_path(&mut working, operation.op, &spec, operation.value.as_ref())?;
            }
            None => {
                let Some(value) = operation.value.as_ref() else {
                    return Err(ScimError::NoTarget { path: String::new() });
                };
                self.apply_root(&mut working, operation.op, value)?;
            }
        }
        *tree = working;

        debug!(
            "Applied PATCH {} {} on {}",
            operation.op,
            operation.path.as_deref().unwrap_or("<root>"),
            self.resource_type.name
        );
        Ok(())
    }

    /// Patch a backend entity through its mapping.
    ///
    /// The entity is read into a tree, patched, and written back in
    /// [`WriteMode::Patch`]. The resulting field updates are merged into
    /// `entity` even when a later operation fails, so operations that
    /// succeeded stay applied; on success they are also returned.
    pub fn apply_to_entity(
        &self,
        entity: &mut EntityFields,
        mapping: &MappingDescription,
        operations: &[PatchOperation],
    ) -> ScimResult<EntityFields> {
        let mut tree = mapping.from_entity(entity);
        let result = self.apply(&mut tree, operations);
        let updates = mapping.to_entity_fields(&tree, Some(entity), WriteMode::Patch);
        for (field, value) in &updates {
            if value.is_null() {
                entity.remove(field);
            } else {
                entity.insert(field.clone(), value.clone());
            }
        }
        result.map(|()| updates)
    }

    /// A path-less add or replace: every key of the value object is applied
    /// as if it were its own path.
    fn apply_root(&self, tree: &mut AttributeTree, op: PatchOp, value: &Value) -> ScimResult<()> {
        let object = value.as_object().ok_or_else(|| {
            ScimError::invalid_value(format!("'{}' without a path requires an object value", op))
        })?;

        for (key, value) in object {
            if key.eq_ignore_ascii_case("schemas") {
                continue;
            }
            if let Some(extension) = self.resource_type.extension(key) {
                let attributes = value.as_object().ok_or_else(|| {
                    ScimError::invalid_value(format!("extension '{}' requires an object value", key))
                })?;
                for (name, value) in attributes {
                    let spec = PathSpec::attribute(Some(&extension.schema.id), name.clone());
                    self.apply_path(tree, op, &spec, Some(value))?;
                }
            } else {
                let spec = PathSpec::parse(key)?;
                self.apply_path(tree, op, &spec, Some(value))?;
            }
        }
        Ok(())
    }

    fn apply_path(
        &self,
        tree: &mut AttributeTree,
        op: PatchOp,
        spec: &PathSpec,
        value: Option<&Value>,
    ) -> ScimResult<()> {
        let target = self.resolve(spec)?;
        match (op, value) {
            (PatchOp::Remove, _) => self.remove(tree, &target)?,
            (_, Some(value)) => self.set(tree, &target, op, value)?,
            (_, None) => {
                return Err(ScimError::invalid_value(format!("'{}' operation requires a value", op)));
            }
        }
        revalidate(tree, &target)
    }

    fn resolve(&self, spec: &PathSpec) -> ScimResult<Target<'a>> {
        let resource_type = self.resource_type;
        let unknown = || {
            ScimError::from(PathError::UnknownAttribute {
                path: spec.to_string(),
            })
        };

        let (namespace, schema_id, definition) = match spec.schema.as_deref() {
            Some(uri) if !resource_type.schema.id.eq_ignore_ascii_case(uri) => {
                let extension = resource_type.extension(uri).ok_or_else(unknown)?;
                let definition = find_by_name(&extension.schema.attributes, &spec.attribute).ok_or_else(unknown)?;
                let id = extension.schema.id.clone();
                (Some(id.clone()), id, definition)
            }
            _ => {
                let definition = resource_type.attribute(&spec.attribute).ok_or_else(unknown)?;
                (None, resource_type.schema.id.clone(), definition)
            }
        };

        if let Some(selector) = &spec.selector {
            if !(definition.multi_valued && definition.is_complex()) {
                return Err(PathError::malformed(
                    spec.as_str(),
                    format!("'{}' is not a multi-valued complex attribute", definition.name),
                )
                .into());
            }
            definition.sub_attribute(&selector.attribute).ok_or_else(unknown)?;
        }
        let sub = match &spec.sub_attribute {
            Some(name) => Some(definition.sub_attribute(name).ok_or_else(unknown)?),
            None => None,
        };

        let label = match &namespace {
            Some(uri) => format!("{}:{}", uri, definition.name),
            None => definition.name.clone(),
        };
        Ok(Target {
            path: spec.to_string(),
            label,
            namespace,
            schema_id,
            definition,
            selector: spec.selector.clone(),
            sub,
        })
    }

    fn set(&self, tree: &mut AttributeTree, target: &Target<'_>, op: PatchOp, value: &Value) -> ScimResult<()> {
        check_writable(target)?;
        let container = container_mut(tree, target)?;
        match (&target.selector, target.sub) {
            (None, None) => set_attribute(container, target, value),
            (None, Some(sub)) => set_sub_attribute(container, target, sub, op, value),
            (Some(selector), sub) => set_selected(container, target, selector, sub, op, value),
        }
    }

    fn remove(&self, tree: &mut AttributeTree, target: &Target<'_>) -> ScimResult<()> {
        check_writable(target)?;
        let definition = target.definition;
        let container = match &target.namespace {
            None => tree,
            Some(uri) => match tree.get_mut(uri).and_then(AttributeValue::as_complex_mut) {
                Some(extension) => extension,
                None => return Ok(()),
            },
        };

        match (&target.selector, target.sub) {
            (None, None) => {
                check_removable(definition, container.get(&definition.name), &target.path)?;
                if definition.multi_valued {
                    container.insert(definition.name.clone(), AttributeValue::List(Vec::new()));
                } else {
                    container.remove(&definition.name);
                }
            }
            (None, Some(sub)) => match container.get_mut(&definition.name) {
                Some(AttributeValue::Complex(parent)) => {
                    check_removable(sub, parent.get(&sub.name), &target.path)?;
                    parent.remove(&sub.name);
                    if parent.is_empty() {
                        container.remove(&definition.name);
                    }
                }
                Some(AttributeValue::List(elements)) => {
                    for element in elements.iter_mut().filter_map(AttributeValue::as_complex_mut) {
                        check_removable(sub, element.get(&sub.name), &target.path)?;
                        element.remove(&sub.name);
                    }
                }
                _ => {}
            },
            (Some(selector), sub) => {
                let case_exact = selector_case_exact(definition, selector);
                let Some(elements) = container
                    .get_mut(&definition.name)
                    .and_then(AttributeValue::as_list_mut)
                else {
                    return Ok(());
                };
                match sub {
                    None => elements.retain(|element| !selects(element, selector, case_exact)),
                    Some(sub) => {
                        for element in elements
                            .iter_mut()
                            .filter(|element| selects(element, selector, case_exact))
                            .filter_map(AttributeValue::as_complex_mut)
                        {
                            check_removable(sub, element.get(&sub.name), &target.path)?;
                            element.remove(&sub.name);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn set_attribute(container: &mut AttributeTree, target: &Target<'_>, value: &Value) -> ScimResult<()> {
    let definition = target.definition;
    let wrapped;
    let value = if definition.multi_valued && !value.is_array() {
        wrapped = Value::Array(vec![value.clone()]);
        &wrapped
    } else {
        value
    };

    let mut built = build(definition, value, target, false)?;
    strip_read_only(definition, &mut built);

    // Single-valued complex attributes merge: sub-attributes absent from the
    // value keep their current content.
    let merged = match (container.get(&definition.name), &built) {
        (Some(AttributeValue::Complex(current)), AttributeValue::Complex(update)) if !definition.multi_valued => {
            let mut merged = current.clone();
            for (name, value) in update.iter() {
                merged.insert(name.clone(), value.clone());
            }
            Some(AttributeValue::Complex(merged))
        }
        _ => None,
    };
    if let Some(merged) = merged {
        built = merged;
    }

    check_immutable(definition, container.get(&definition.name), &built, &target.path)?;
    container.insert(definition.name.clone(), built);
    Ok(())
}

fn set_sub_attribute(
    container: &mut AttributeTree,
    target: &Target<'_>,
    sub: &AttributeDefinition,
    op: PatchOp,
    value: &Value,
) -> ScimResult<()> {
    let definition = target.definition;
    let built = build(sub, value, target, false)?;

    if !definition.multi_valued {
        let parent = complex_at(container, &definition.name, &target.path)?;
        check_immutable(sub, parent.get(&sub.name), &built, &target.path)?;
        parent.insert(sub.name.clone(), built);
        return Ok(());
    }

    // Without a selector the sub-attribute is set on every element.
    let elements = list_at(container, &definition.name, &target.path)?;
    if elements.is_empty() {
        if op == PatchOp::Replace {
            return Err(ScimError::NoTarget {
                path: target.path.clone(),
            });
        }
        let mut element = AttributeTree::new();
        element.insert(sub.name.clone(), built);
        elements.push(AttributeValue::Complex(element));
        return Ok(());
    }
    for element in elements.iter_mut() {
        let element = element
            .as_complex_mut()
            .ok_or_else(|| ScimError::invalid_value(format!("'{}' holds a non-complex element", target.label)))?;
        check_immutable(sub, element.get(&sub.name), &built, &target.path)?;
        element.insert(sub.name.clone(), built.clone());
    }
    Ok(())
}

fn set_selected(
    container: &mut AttributeTree,
    target: &Target<'_>,
    selector: &Selector,
    sub: Option<&AttributeDefinition>,
    op: PatchOp,
    value: &Value,
) -> ScimResult<()> {
    let definition = target.definition;
    let case_exact = selector_case_exact(definition, selector);

    let update = match sub {
        Some(sub) => build(sub, value, target, false)?,
        None => {
            let mut element = build(definition, value, target, true)?;
            let AttributeValue::Complex(tree) = &mut element else {
                return Err(ScimError::invalid_value(format!(
                    "'{}' requires an object value",
                    target.path
                )));
            };
            if !tree.contains(&selector.attribute) {
                tree.insert(selector.attribute.clone(), AttributeValue::Scalar(selector.value.to_json()));
            }
            strip_read_only(definition, &mut element);
            element
        }
    };

    let elements = list_at(container, &definition.name, &target.path)?;
    let matched: Vec<usize> = elements
        .iter()
        .enumerate()
        .filter(|(_, element)| selects(element, selector, case_exact))
        .map(|(index, _)| index)
        .collect();

    if matched.is_empty() {
        if op == PatchOp::Replace {
            return Err(ScimError::NoTarget {
                path: target.path.clone(),
            });
        }
        let element = match sub {
            Some(sub) => {
                let mut element = AttributeTree::new();
                element.insert(selector.attribute.clone(), AttributeValue::Scalar(selector.value.to_json()));
                element.insert(sub.name.clone(), update);
                AttributeValue::Complex(element)
            }
            None => update,
        };
        elements.push(element);
        return Ok(());
    }

    for index in matched {
        match sub {
            Some(sub) => {
                let element = elements[index].as_complex_mut().ok_or_else(|| {
                    ScimError::invalid_value(format!("'{}' holds a non-complex element", target.label))
                })?;
                check_immutable(sub, element.get(&sub.name), &update, &target.path)?;
                element.insert(sub.name.clone(), update.clone());
            }
            None => {
                let mut replacement = update.clone();
                if let (Some(current), Some(new)) = (elements[index].as_complex(), replacement.as_complex_mut()) {
                    carry_read_only(definition, current, new);
                }
                check_immutable(definition, Some(&elements[index]), &replacement, &target.path)?;
                elements[index] = replacement;
            }
        }
    }
    Ok(())
}

fn build(definition: &AttributeDefinition, value: &Value, target: &Target<'_>, element: bool) -> ScimResult<AttributeValue> {
    let path = match target.sub {
        Some(sub) if std::ptr::eq(sub, definition) => join_path(&target.label, &sub.name),
        _ => target.label.clone(),
    };
    let (built, errors) = if element {
        build_element(definition, value, &path, &target.schema_id)
    } else {
        build_attribute_value(definition, value, &path, &target.schema_id)
    };
    if errors.is_empty() {
        Ok(built)
    } else {
        Err(ValidationErrors::from(errors).into())
    }
}

/// The touched attribute must still satisfy its definition after the change.
fn revalidate(tree: &AttributeTree, target: &Target<'_>) -> ScimResult<()> {
    let container = match &target.namespace {
        None => Some(tree),
        Some(uri) => tree.get(uri).and_then(AttributeValue::as_complex),
    };
    let definition = target.definition;
    let value = container
        .and_then(|c| c.get(&definition.name))
        .filter(|v| !v.is_unassigned());

    let errors = match value {
        Some(value) => validate_value(definition, value, &target.label),
        None if definition.required => ValidationError::missing_required(&target.label).into(),
        None => ValidationErrors::new(),
    };
    errors.into_result().map_err(ScimError::from)
}

fn container_mut<'t>(tree: &'t mut AttributeTree, target: &Target<'_>) -> ScimResult<&'t mut AttributeTree> {
    match &target.namespace {
        None => Ok(tree),
        Some(uri) => complex_at(tree, uri, &target.path),
    }
}

fn complex_at<'t>(tree: &'t mut AttributeTree, name: &str, path: &str) -> ScimResult<&'t mut AttributeTree> {
    let slot = tree.entry_or_insert_with(name, || AttributeValue::Complex(AttributeTree::new()));
    if slot.is_unassigned() {
        *slot = AttributeValue::Complex(AttributeTree::new());
    }
    slot.as_complex_mut()
        .ok_or_else(|| ScimError::invalid_value(format!("'{}' does not hold a complex value", path)))
}

fn list_at<'t>(tree: &'t mut AttributeTree, name: &str, path: &str) -> ScimResult<&'t mut Vec<AttributeValue>> {
    let slot = tree.entry_or_insert_with(name, || AttributeValue::List(Vec::new()));
    if slot.is_unassigned() {
        *slot = AttributeValue::List(Vec::new());
    }
    slot.as_list_mut()
        .ok_or_else(|| ScimError::invalid_value(format!("'{}' does not hold multiple values", path)))
}

fn selects(element: &AttributeValue, selector: &Selector, case_exact: bool) -> bool {
    element
        .as_complex()
        .and_then(|tree| tree.get(&selector.attribute))
        .and_then(AttributeValue::as_scalar)
        .is_some_and(|value| literal_equals(value, &selector.value, case_exact))
}

fn selector_case_exact(definition: &AttributeDefinition, selector: &Selector) -> bool {
    definition
        .sub_attribute(&selector.attribute)
        .is_some_and(|sub| sub.case_exact)
}

fn mutability_error(path: &str, mutability: &str) -> ScimError {
    ScimError::Mutability {
        attribute: path.to_string(),
        mutability: mutability.to_string(),
    }
}

fn check_writable(target: &Target<'_>) -> ScimResult<()> {
    let read_only = !target.definition.is_writable() || target.sub.is_some_and(|sub| !sub.is_writable());
    if read_only {
        return Err(mutability_error(&target.path, "readOnly"));
    }
    Ok(())
}

/// An immutable attribute may be set once; afterwards only the same value is
/// accepted. Complex values are checked sub-attribute by sub-attribute.
pub(crate) fn check_immutable(
    definition: &AttributeDefinition,
    current: Option<&AttributeValue>,
    new: &AttributeValue,
    path: &str,
) -> ScimResult<()> {
    let Some(current) = current.filter(|v| !v.is_unassigned()) else {
        return Ok(());
    };
    if definition.mutability == Mutability::Immutable && current != new {
        return Err(mutability_error(path, "immutable"));
    }
    if let (AttributeValue::Complex(current), AttributeValue::Complex(new)) = (current, new) {
        for sub in &definition.sub_attributes {
            if let Some(new_value) = new.get(&sub.name) {
                check_immutable(sub, current.get(&sub.name), new_value, &join_path(path, &sub.name))?;
            }
        }
    }
    Ok(())
}

fn check_removable(definition: &AttributeDefinition, current: Option<&AttributeValue>, path: &str) -> ScimResult<()> {
    let assigned = current.is_some_and(|v| !v.is_unassigned());
    if definition.mutability == Mutability::Immutable && assigned {
        return Err(mutability_error(path, "immutable"));
    }
    Ok(())
}

/// Drop read-only sub-attributes from a client-supplied value.
fn strip_read_only(definition: &AttributeDefinition, value: &mut AttributeValue) {
    match value {
        AttributeValue::Complex(tree) => {
            for sub in &definition.sub_attributes {
                if !sub.is_writable() {
                    tree.remove(&sub.name);
                } else if let Some(nested) = tree.get_mut(&sub.name) {
                    strip_read_only(sub, nested);
                }
            }
        }
        AttributeValue::List(items) => {
            for item in items {
                strip_read_only(definition, item);
            }
        }
        AttributeValue::Scalar(_) => {}
    }
}

/// Keep the server-maintained sub-attributes of an element being replaced.
fn carry_read_only(definition: &AttributeDefinition, current: &AttributeTree, new: &mut AttributeTree) {
    for sub in definition.sub_attributes.iter().filter(|sub| !sub.is_writable()) {
        if let Some(value) = current.get(&sub.name) {
            new.insert(sub.name.clone(), value.clone());
        }
    }
}
