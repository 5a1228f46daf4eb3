//! Policy configuration file format.
//!
//! ```json
//! {
//!   "customAttributes": {
//!     "paragraph": {
//!       "data-level": { "type": "number", "label": "Level", "defaultValue": 1 }
//!     }
//!   },
//!   "customClasses": {
//!     "paragraph": { "choices": ["lead", "note"], "multiple": true }
//!   }
//! }
//! ```

use crate::error::PolicyResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Choice,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    #[serde(rename = "type")]
    pub kind: AttributeType,

    #[serde(default)]
    pub label: String,

    /// Permitted values for `choice` attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    /// `choice` attributes only: several space-separated choices
    #[serde(default)]
    pub multiple: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl AttributeDefinition {
    /// Default rendered as the string the model stores.
    pub fn default_string(&self) -> Option<String> {
        match self.default_value.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPolicy {
    pub choices: Vec<String>,

    #[serde(default)]
    pub multiple: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Element-type name → attribute name → definition
pub type AttributePolicies = BTreeMap<String, BTreeMap<String, AttributeDefinition>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    #[serde(default)]
    pub custom_attributes: AttributePolicies,

    #[serde(default)]
    pub custom_classes: BTreeMap<String, ClassPolicy>,
}

impl PolicyConfig {
    pub fn from_json(source: &str) -> PolicyResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a policy file; a missing file yields an empty policy.
    pub fn load(path: &Path) -> PolicyResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no policy file, using empty policy");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            attribute_elements = config.custom_attributes.len(),
            class_elements = config.custom_classes.len(),
            "policy loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "customAttributes": {
                "paragraph": {
                    "data-level": { "type": "number", "label": "Level", "defaultValue": 1 },
                    "data-kind": { "type": "choice", "label": "Kind", "choices": ["a", "b"], "multiple": true }
                }
            },
            "customClasses": {
                "ul": { "choices": ["compact"], "multiple": false, "defaultValue": "compact" }
            }
        }"#;

        let config = PolicyConfig::from_json(json).unwrap();
        let paragraph = &config.custom_attributes["paragraph"];
        assert_eq!(paragraph["data-level"].kind, AttributeType::Number);
        assert_eq!(paragraph["data-level"].default_string(), Some("1".to_string()));
        assert!(paragraph["data-kind"].multiple);
        assert_eq!(config.custom_classes["ul"].choices, vec!["compact"]);
    }

    #[test]
    fn test_default_config() {
        let config = PolicyConfig::default();
        assert!(config.custom_attributes.is_empty());
        assert!(config.custom_classes.is_empty());
    }
}
