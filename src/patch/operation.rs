//! PATCH request payloads (RFC 7644 §3.5.2).

use crate::error::{ScimError, ScimResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Schema URI of a PATCH request body.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// PATCH operation kind. Parsing ignores case, since several clients send
/// `Add` or `Replace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchOp {
    type Err = ScimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            _ => Err(ScimError::invalid_request(format!("unknown PATCH operation '{}'", s))),
        }
    }
}

impl<'de> Deserialize<'de> for PatchOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of a PATCH request's `Operations` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: Some(path.into()),
            value: None,
        }
    }

    /// An add or replace without a path, merging `value` at the resource root.
    pub fn at_root(op: PatchOp, value: Value) -> Self {
        Self {
            op,
            path: None,
            value: Some(value),
        }
    }

    pub fn from_json(value: &Value) -> ScimResult<Self> {
        let operation: Self = serde_json::from_value(value.clone())
            .map_err(|e| ScimError::invalid_request(format!("invalid PATCH operation: {}", e)))?;
        operation.check()?;
        Ok(operation)
    }

    /// Shape checks that need no schema: `remove` needs a target and the
    /// other operations need a value.
    pub fn check(&self) -> ScimResult<()> {
        match self.op {
            PatchOp::Remove if self.path.as_deref().is_none_or(|p| p.trim().is_empty()) => {
                Err(ScimError::NoTarget { path: String::new() })
            }
            PatchOp::Add | PatchOp::Replace if self.value.is_none() => Err(ScimError::invalid_value(format!(
                "'{}' operation requires a value",
                self.op
            ))),
            _ => Ok(()),
        }
    }
}

/// A PATCH request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations", alias = "operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }

    /// Parse and check a request body. `schemas` may be omitted, but when
    /// present it must name the PatchOp message schema.
    pub fn from_json(value: &Value) -> ScimResult<Self> {
        let request: Self = serde_json::from_value(value.clone())
            .map_err(|e| ScimError::invalid_request(format!("invalid PATCH request: {}", e)))?;

        if !request.schemas.is_empty()
            && !request
                .schemas
                .iter()
                .any(|s| s.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
        {
            return Err(ScimError::invalid_request(format!(
                "PATCH request schemas must contain '{}'",
                PATCH_OP_SCHEMA
            )));
        }
        if request.operations.is_empty() {
            return Err(ScimError::invalid_request("PATCH request has no operations"));
        }
        for operation in &request.operations {
            operation.check()?;
        }
        Ok(request)
    }
}
