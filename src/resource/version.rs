//! Content-derived resource versions.
//!
//! `meta.version` is a weak ETag computed from the rendered resource body, so
//! any attribute change yields a new version without the store tracking
//! sequence numbers.
//!
//! ```rust
//! use scim_core::resource::ResourceVersion;
//!
//! let v1 = ResourceVersion::from_content(br#"{"userName":"bjensen"}"#);
//! let v2: ResourceVersion = v1.to_etag().parse().unwrap();
//! assert_eq!(v1, v2);
//! ```

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Opaque version of a resource's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceVersion {
    opaque: String,
}

impl ResourceVersion {
    /// Hash arbitrary content. Only the first 8 digest bytes are kept.
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self {
            opaque: BASE64.encode(&digest[..8]),
        }
    }

    /// Hash a JSON value. Object keys are serialized in sorted order, so
    /// equal values always produce equal versions.
    pub fn from_json(value: &Value) -> Self {
        Self::from_content(value.to_string().as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.opaque
    }

    /// Weak ETag form, `W/"<opaque>"`.
    pub fn to_etag(&self) -> String {
        format!("W/\"{}\"", self.opaque)
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_etag())
    }
}

/// Malformed ETag text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid ETag: {0}")]
pub struct EtagParseError(String);

impl FromStr for ResourceVersion {
    type Err = EtagParseError;

    /// Accepts weak (`W/"x"`), strong (`"x"`) or bare forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unprefixed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let opaque = match (unprefixed.strip_prefix('"'), unprefixed.ends_with('"')) {
            (Some(rest), true) if !rest.is_empty() => &rest[..rest.len() - 1],
            (None, false) => unprefixed,
            _ => return Err(EtagParseError(s.to_string())),
        };
        if opaque.is_empty() || opaque.contains('"') {
            return Err(EtagParseError(s.to_string()));
        }
        Ok(Self {
            opaque: opaque.to_string(),
        })
    }
}
