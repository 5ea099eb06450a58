//! Declarative mapping descriptions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How one attribute corresponds to backend entity fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    /// The attribute's value is stored in one backend field. Fields that are
    /// not writable are read for display but never written back.
    Field { field: String, writable: bool },
    /// A fixed value reported on read and ignored on write.
    Constant(Value),
    /// A complex attribute whose sub-attributes map to fields of the same entity.
    Complex(AttributeMappings),
    /// Elements of a multi-valued attribute selected by a sub-attribute value,
    /// each stored in its own set of flat fields (`emails[type eq "work"]`
    /// in `work_email`).
    Matched(Vec<MatchedSlot>),
    /// A multi-valued attribute stored as a backend collection of sub-entities.
    List(ListMapping),
}

/// Ordered attribute name to [`Mapping`] table. Names match case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMappings {
    entries: Vec<(String, Mapping)>,
}

impl AttributeMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, mapping: Mapping) -> Self {
        let name = name.into();
        self.entries.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.entries.push((name, mapping));
        self
    }

    /// A writable field correspondence.
    pub fn field(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.with(
            name,
            Mapping::Field {
                field: field.into(),
                writable: true,
            },
        )
    }

    /// A display-only field correspondence.
    pub fn read_only(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.with(
            name,
            Mapping::Field {
                field: field.into(),
                writable: false,
            },
        )
    }

    pub fn constant(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, Mapping::Constant(value.into()))
    }

    pub fn complex(self, name: impl Into<String>, mappings: AttributeMappings) -> Self {
        self.with(name, Mapping::Complex(mappings))
    }

    pub fn matched(self, name: impl Into<String>, slots: Vec<MatchedSlot>) -> Self {
        self.with(name, Mapping::Matched(slots))
    }

    pub fn list(self, name: impl Into<String>, list: ListMapping) -> Self {
        self.with(name, Mapping::List(list))
    }

    pub fn get(&self, name: &str) -> Option<&Mapping> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, mapping)| mapping)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mapping)> {
        self.entries.iter().map(|(name, mapping)| (name.as_str(), mapping))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One element slot of a [`Mapping::Matched`] attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedSlot {
    pub match_attribute: String,
    pub match_value: String,
    pub using: AttributeMappings,
}

impl MatchedSlot {
    pub fn new(
        match_attribute: impl Into<String>,
        match_value: impl Into<String>,
        using: AttributeMappings,
    ) -> Self {
        Self {
            match_attribute: match_attribute.into(),
            match_value: match_value.into(),
            using,
        }
    }

    /// Whether an element with this match value belongs in the slot.
    pub fn matches(&self, value: &str) -> bool {
        self.match_value.eq_ignore_ascii_case(value)
    }
}

/// A multi-valued attribute stored as an array of sub-entities.
#[derive(Debug, Clone, PartialEq)]
pub struct ListMapping {
    /// Backend field holding the array.
    pub field: String,
    /// Sub-attribute identifying an element across writes. Without a key, an
    /// inbound element pairs with the first unclaimed backend entry whose
    /// writable fields it leaves unchanged; any other element is a new entry.
    pub key: Option<String>,
    /// Mappings for each element, relative to the sub-entity.
    pub using: AttributeMappings,
    /// Whether a full replace removes backend entries absent from the input.
    pub replaceable: bool,
}

impl ListMapping {
    pub fn new(field: impl Into<String>, using: AttributeMappings) -> Self {
        Self {
            field: field.into(),
            key: None,
            using,
            replaceable: false,
        }
    }

    pub fn keyed_by(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn replaceable(mut self) -> Self {
        self.replaceable = true;
        self
    }
}

/// What a full replace does with mapped attributes absent from the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingAttributePolicy {
    /// Clear the backend field (PUT replaces the whole resource).
    #[default]
    Clear,
    /// Leave the backend field untouched, deferring to backend defaults.
    Preserve,
}

/// The operation a field update set is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// A full replace (create or PUT) from client-supplied attributes.
    Replace,
    /// Writing back a tree read from the entity and then patched. The tree is
    /// complete, so absent attributes are cleared and absent list entries
    /// dropped regardless of policy.
    Patch,
}

/// Mapping between one resource type's attribute tree and a backend entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingDescription {
    pub attributes: AttributeMappings,
    pub missing: MissingAttributePolicy,
}

impl MappingDescription {
    pub fn new(attributes: AttributeMappings) -> Self {
        Self {
            attributes,
            missing: MissingAttributePolicy::default(),
        }
    }

    pub fn with_missing_policy(mut self, policy: MissingAttributePolicy) -> Self {
        self.missing = policy;
        self
    }

    /// Whether absent attributes clear their fields in the given mode.
    pub(crate) fn clears_missing(&self, mode: WriteMode) -> bool {
        mode == WriteMode::Patch || self.missing == MissingAttributePolicy::Clear
    }
}
