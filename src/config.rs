//! Service configuration.
//!
//! [`ScimConfig`] carries the settings a [`ResourceService`] needs beyond
//! schemas and mappings: where resources live (for `meta.location`), page
//! size limits, and the policy for mapped attributes a write leaves out.
//!
//! [`ResourceService`]: crate::service::ResourceService

use crate::error::{ScimError, ScimResult};
use crate::mapper::MissingAttributePolicy;
use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "https://localhost".to_string()
}

fn default_scim_version() -> String {
    "v2".to_string()
}

fn default_count() -> usize {
    100
}

/// Settings for a SCIM service.
///
/// Deserializes from camelCase JSON; absent keys take their defaults.
///
/// ```rust
/// use scim_core::config::ScimConfig;
///
/// let config = ScimConfig::from_json_str(r#"{"baseUrl": "https://scim.example.com", "maxCount": 50}"#).unwrap();
/// assert_eq!(config.max_count, 50);
/// assert_eq!(config.location("/Users", "42"), "https://scim.example.com/v2/Users/42");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimConfig {
    /// Base URL without the SCIM version segment, e.g. `https://scim.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_scim_version")]
    pub scim_version: String,
    /// Page size used when a list request gives no `count`.
    #[serde(default = "default_count")]
    pub default_count: usize,
    #[serde(default = "default_count")]
    pub max_count: usize,
    #[serde(default)]
    pub missing_attribute_policy: MissingAttributePolicy,
}

impl Default for ScimConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scim_version: default_scim_version(),
            default_count: default_count(),
            max_count: default_count(),
            missing_attribute_policy: MissingAttributePolicy::default(),
        }
    }
}

impl ScimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_scim_version(mut self, version: impl Into<String>) -> Self {
        self.scim_version = version.into();
        self
    }

    pub fn with_page_sizes(mut self, default_count: usize, max_count: usize) -> Self {
        self.default_count = default_count;
        self.max_count = max_count;
        self
    }

    pub fn with_missing_attribute_policy(mut self, policy: MissingAttributePolicy) -> Self {
        self.missing_attribute_policy = policy;
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(content: &str) -> ScimResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ScimError::configuration(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ScimResult<()> {
        if self.base_url.is_empty() {
            return Err(ScimError::configuration("Base URL cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ScimError::configuration("Base URL must start with http:// or https://"));
        }
        if self.scim_version.is_empty() {
            return Err(ScimError::configuration("SCIM version cannot be empty"));
        }
        if self.max_count == 0 {
            return Err(ScimError::configuration("maxCount must be at least 1"));
        }
        Ok(())
    }

    /// The `meta.location` URL of a resource.
    pub fn location(&self, endpoint: &str, id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.scim_version,
            endpoint.trim_matches('/'),
            id
        )
    }
}
