//! # Attribute Cleanup
//!
//! Custom attributes and classes are only meaningful for the element type
//! that defines them. When the selection context moves to another element
//! (or a change turns a paragraph into a heading, a heading into a list
//! item, ...), values that do not belong to the new type are stripped.
//!
//! Refresh is idempotent: a second run over the same state removes nothing.

use crate::errors::EditorResult;
use richtext_model::{keys, ChangeOrigin, Model, NodeId, NodeKind};
use richtext_policy::{config_name, list_config_name, PolicyRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Outcome of refreshing one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub node: NodeId,
    pub config_name: String,
    pub removed: Vec<String>,
    /// Whether the element type has any custom attribute or class policy
    pub enabled: bool,
}

/// Current values of the custom attribute form, defaults filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAttributeForm {
    pub node: NodeId,
    pub config_name: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: Option<String>,
    pub enabled: bool,
}

/// Policy key of `node`. With `list_selected`, a list item stands for its
/// whole list and resolves to `ul`/`ol`.
pub fn element_config_name(model: &Model, node: NodeId, list_selected: bool) -> Option<String> {
    let element = model.get(node)?;
    if list_selected && element.kind == NodeKind::ListItem {
        if let Some(name) = element.attribute_str(keys::LIST_TYPE).and_then(list_config_name) {
            return Some(name.to_string());
        }
    }
    Some(config_name(&element.name, element.attribute_str(keys::CUSTOM_TAG_NAME)))
}

/// Contiguous siblings of a list item sharing its list type, in order.
pub fn list_run(model: &Model, item: NodeId) -> Vec<NodeId> {
    let list_type = |id: NodeId| {
        model
            .get(id)
            .filter(|n| n.kind == NodeKind::ListItem)
            .and_then(|n| n.attribute_str(keys::LIST_TYPE))
            .map(str::to_string)
    };
    let Some(kind) = list_type(item) else {
        return vec![item];
    };

    let mut first = item;
    while let Some(prev) = model.previous_sibling(first) {
        if list_type(prev).as_deref() != Some(kind.as_str()) {
            break;
        }
        first = prev;
    }

    let mut run = vec![first];
    let mut current = first;
    while let Some(next) = model.next_sibling(current) {
        if list_type(next).as_deref() != Some(kind.as_str()) {
            break;
        }
        run.push(next);
        current = next;
    }
    run
}

#[derive(Debug, Clone)]
pub struct CleanupEngine {
    policy: Arc<PolicyRegistry>,
}

impl CleanupEngine {
    pub fn new(policy: Arc<PolicyRegistry>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyRegistry {
        &self.policy
    }

    /// Keys of `node` that the resolved element type does not admit.
    pub fn plan(&self, model: &Model, node: NodeId, list_selected: bool) -> Vec<String> {
        let (Some(element), Some(name)) = (model.get(node), element_config_name(model, node, list_selected)) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        for (key, value) in &element.attributes {
            if let Some(attribute) = key.strip_prefix(keys::CUSTOM_ATTRIBUTE_PREFIX) {
                let valid = value
                    .as_str()
                    .is_some_and(|v| self.policy.is_valid_value(&name, attribute, v));
                if !valid {
                    removed.push(key.clone());
                }
            }
        }

        if let Some(classes) = element.attribute(keys::CUSTOM_CLASSES) {
            let permitted = classes
                .as_str()
                .is_some_and(|c| self.policy.permits_classes(&name, c));
            if !permitted {
                removed.push(keys::CUSTOM_CLASSES.to_string());
            }
        }

        removed
    }

    /// Clean the selection context element. Returns `None` when nothing is
    /// selected.
    pub fn refresh(&self, model: &mut Model) -> EditorResult<Option<CleanupReport>> {
        let Some(node) = model.context_element() else {
            return Ok(None);
        };
        let list_selected = model.selection().list_selected;
        let Some(config_name) = element_config_name(model, node, list_selected) else {
            return Ok(None);
        };

        let targets = if list_selected {
            list_run(model, node)
        } else {
            vec![node]
        };

        let plans: Vec<(NodeId, Vec<String>)> = targets
            .into_iter()
            .map(|id| (id, self.plan(model, id, list_selected)))
            .filter(|(_, keys)| !keys.is_empty())
            .collect();

        let mut removed = Vec::new();
        if !plans.is_empty() {
            model.change(ChangeOrigin::Cleanup, |w| {
                for (id, keys) in &plans {
                    for key in keys {
                        w.remove_attribute(*id, key)?;
                    }
                }
                Ok(())
            })?;
            for (_, keys) in plans {
                for key in keys {
                    if !removed.contains(&key) {
                        removed.push(key);
                    }
                }
            }
            debug!(node = %node, config_name, ?removed, "removed foreign custom attributes");
        }

        Ok(Some(CleanupReport {
            node,
            enabled: self.policy.is_enabled(&config_name),
            config_name,
            removed,
        }))
    }

    /// Clean every element of the document as if it were selected on its own.
    pub fn clean_all(&self, model: &mut Model) -> EditorResult<Vec<CleanupReport>> {
        let reports: Vec<CleanupReport> = model
            .descendants(model.root())
            .into_iter()
            .filter(|id| model.get(*id).is_some_and(|n| !n.is_text() && n.kind != NodeKind::Root))
            .filter_map(|id| {
                let removed = self.plan(model, id, false);
                if removed.is_empty() {
                    return None;
                }
                let config_name = element_config_name(model, id, false)?;
                Some(CleanupReport {
                    node: id,
                    enabled: self.policy.is_enabled(&config_name),
                    config_name,
                    removed,
                })
            })
            .collect();

        if !reports.is_empty() {
            model.change(ChangeOrigin::Cleanup, |w| {
                for report in &reports {
                    for key in &report.removed {
                        w.remove_attribute(report.node, key)?;
                    }
                }
                Ok(())
            })?;
        }
        Ok(reports)
    }

    /// Current custom attribute values of the context element, with policy
    /// defaults for those not set.
    pub fn form(&self, model: &Model) -> Option<CustomAttributeForm> {
        let node = model.context_element()?;
        let list_selected = model.selection().list_selected;
        let name = element_config_name(model, node, list_selected)?;
        let element = model.get(node)?;

        let mut attributes = self.policy.attribute_defaults(&name);
        for (key, value) in &element.attributes {
            if let (Some(attribute), Some(value)) = (key.strip_prefix(keys::CUSTOM_ATTRIBUTE_PREFIX), value.as_str()) {
                attributes.insert(attribute.to_string(), value.to_string());
            }
        }

        let classes = element
            .attribute_str(keys::CUSTOM_CLASSES)
            .map(str::to_string)
            .or_else(|| self.policy.class_default(&name).map(str::to_string));

        Some(CustomAttributeForm {
            node,
            enabled: self.policy.is_enabled(&name),
            config_name: name,
            attributes,
            classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_model::{Fragment, Position, Selection};
    use richtext_policy::PolicyConfig;

    fn engine() -> CleanupEngine {
        let config = PolicyConfig::from_json(
            r#"{
              "customAttributes": {
                "paragraph": { "data-x": { "type": "number" } },
                "heading": { "data-x": { "type": "choice", "choices": ["a", "b"] } },
                "ul": { "data-style": { "type": "string" } }
              },
              "customClasses": {
                "paragraph": { "choices": ["lead", "note"], "multiple": true }
              }
            }"#,
        )
        .unwrap();
        CleanupEngine::new(Arc::new(PolicyRegistry::new(config)))
    }

    fn model_with(block: Fragment) -> (Model, NodeId) {
        let mut model = Model::new();
        let root = model.root();
        let id = model
            .change(ChangeOrigin::Load, |w| w.insert(root, 0, block.with_child(Fragment::text("x"))))
            .unwrap();
        model.set_selection(Selection::caret(Position::new(id, 0)));
        model.take_batches();
        (model, id)
    }

    #[test]
    fn test_cross_type_value_is_removed() {
        // Valid number for paragraphs, not a heading choice
        let (mut model, id) = model_with(Fragment::heading(2).with_attr("custom-attribute:data-x", "5"));

        let report = engine().refresh(&mut model).unwrap().unwrap();

        assert_eq!(report.config_name, "heading");
        assert_eq!(report.removed, vec!["custom-attribute:data-x".to_string()]);
        assert!(report.enabled);
        assert!(!model.get(id).unwrap().has_attribute("custom-attribute:data-x"));
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let (mut model, id) = model_with(
            Fragment::paragraph()
                .with_attr("custom-attribute:data-x", "5")
                .with_attr("custom-attribute:data-y", "1")
                .with_attr(keys::CUSTOM_CLASSES, "lead other"),
        );
        let engine = engine();

        let first = engine.refresh(&mut model).unwrap().unwrap();
        assert_eq!(first.removed.len(), 2);
        let after_first = model.get(id).unwrap().attributes.clone();

        let second = engine.refresh(&mut model).unwrap().unwrap();
        assert!(second.removed.is_empty());
        assert_eq!(model.get(id).unwrap().attributes, after_first);
        assert_eq!(model.get(id).unwrap().attribute_str("custom-attribute:data-x"), Some("5"));
    }

    #[test]
    fn test_selected_list_uses_list_policy() {
        let (mut model, id) = model_with(
            Fragment::list_item("bulleted")
                .with_attr("custom-attribute:data-style", "wide")
                .with_attr("custom-attribute:data-x", "1"),
        );
        let mut selection = model.selection().clone();
        selection.list_selected = true;
        model.set_selection(selection);

        let report = engine().refresh(&mut model).unwrap().unwrap();

        assert_eq!(report.config_name, "ul");
        assert_eq!(report.removed, vec!["custom-attribute:data-x".to_string()]);
        assert_eq!(model.get(id).unwrap().attribute_str("custom-attribute:data-style"), Some("wide"));
    }

    #[test]
    fn test_form_fills_defaults() {
        let config = PolicyConfig::from_json(
            r#"{"customAttributes": {"paragraph": {"data-x": {"type": "number", "defaultValue": 3}}}}"#,
        )
        .unwrap();
        let engine = CleanupEngine::new(Arc::new(PolicyRegistry::new(config)));
        let (model, _) = model_with(Fragment::paragraph());

        let form = engine.form(&model).unwrap();
        assert_eq!(form.attributes.get("data-x").map(String::as_str), Some("3"));
        assert!(form.enabled);
    }
}
