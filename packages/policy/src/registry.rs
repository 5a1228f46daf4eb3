//! # Policy Registry
//!
//! Read-only view over a [`PolicyConfig`] answering, per element-type name,
//! which custom attributes and classes are permitted and whether a value is
//! valid under that type's definition.

use crate::config::{AttributeDefinition, AttributeType, ClassPolicy, PolicyConfig};
use crate::error::{PolicyError, PolicyResult};
use std::collections::BTreeMap;

/// Element-type name used for link attribute forms.
pub const LINK_ELEMENT: &str = "link";

/// Map a model element name to the name used as a policy key.
///
/// `custom_tag_name` is consulted only for custom tags.
pub fn config_name(model_name: &str, custom_tag_name: Option<&str>) -> String {
    match model_name {
        "listItem" => "li".to_string(),
        "embedInline" => "embedinline".to_string(),
        "customTag" => custom_tag_name.unwrap_or(model_name).to_string(),
        other => other.to_string(),
    }
}

/// Element-type name of a whole list, by `listType`.
pub fn list_config_name(list_type: &str) -> Option<&'static str> {
    match list_type {
        "bulleted" => Some("ul"),
        "numbered" => Some("ol"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    config: PolicyConfig,
}

impl PolicyRegistry {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn attributes_for(&self, element: &str) -> Option<&BTreeMap<String, AttributeDefinition>> {
        self.config.custom_attributes.get(element)
    }

    pub fn attribute(&self, element: &str, attribute: &str) -> Option<&AttributeDefinition> {
        self.attributes_for(element)?.get(attribute)
    }

    pub fn classes_for(&self, element: &str) -> Option<&ClassPolicy> {
        self.config.custom_classes.get(element)
    }

    /// Custom attribute/class editing is available for `element`.
    pub fn is_enabled(&self, element: &str) -> bool {
        let has_attributes = self.attributes_for(element).is_some_and(|a| !a.is_empty());
        let has_classes = self.classes_for(element).is_some_and(|c| !c.choices.is_empty());
        has_attributes || has_classes
    }

    /// Check `value` against the definition of `attribute` on `element`.
    pub fn validate_value(&self, element: &str, attribute: &str, value: &str) -> PolicyResult<()> {
        let definition = self
            .attribute(element, attribute)
            .ok_or_else(|| PolicyError::UnknownAttribute {
                element: element.to_string(),
                attribute: attribute.to_string(),
            })?;

        let invalid = |reason: &str| PolicyError::InvalidValue {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match definition.kind {
            AttributeType::String => Ok(()),
            AttributeType::Number => value
                .trim()
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| invalid("not a number")),
            AttributeType::Boolean => match value {
                "true" | "false" => Ok(()),
                _ => Err(invalid("expected true or false")),
            },
            AttributeType::Choice => {
                let tokens: Vec<&str> = if definition.multiple {
                    value.split_whitespace().collect()
                } else {
                    vec![value]
                };
                if tokens.is_empty() {
                    return Err(invalid("no choice selected"));
                }
                if tokens
                    .iter()
                    .all(|t| definition.choices.iter().any(|c| c.as_str() == *t))
                {
                    Ok(())
                } else {
                    Err(invalid("not one of the permitted choices"))
                }
            }
        }
    }

    pub fn is_valid_value(&self, element: &str, attribute: &str, value: &str) -> bool {
        self.validate_value(element, attribute, value).is_ok()
    }

    /// Every token of a space-separated class list is a permitted choice.
    pub fn permits_classes(&self, element: &str, classes: &str) -> bool {
        let Some(policy) = self.classes_for(element) else {
            return false;
        };
        classes
            .split_whitespace()
            .all(|token| policy.choices.iter().any(|c| c == token))
    }

    pub fn validate_classes(&self, element: &str, classes: &str) -> PolicyResult<()> {
        let policy = self.classes_for(element);
        for token in classes.split_whitespace() {
            if !policy.is_some_and(|p| p.choices.iter().any(|c| c == token)) {
                return Err(PolicyError::ClassNotPermitted {
                    element: element.to_string(),
                    class: token.to_string(),
                });
            }
        }
        if let Some(policy) = policy {
            if !policy.multiple && classes.split_whitespace().count() > 1 {
                return Err(PolicyError::InvalidValue {
                    element: element.to_string(),
                    attribute: "class".to_string(),
                    value: classes.to_string(),
                    reason: "only one class may be selected".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Default value of every attribute defined for `element`.
    pub fn attribute_defaults(&self, element: &str) -> BTreeMap<String, String> {
        self.attributes_for(element)
            .map(|defs| {
                defs.iter()
                    .filter_map(|(name, def)| def.default_string().map(|v| (name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn class_default(&self, element: &str) -> Option<&str> {
        self.classes_for(element)?.default_value.as_deref()
    }
}
