//! # Model Operations
//!
//! Low-level, invertible changes to the model tree. Every edit (commands,
//! cleanup, resolver cache fills, undo) is expressed as a sequence of these.
//!
//! ## Semantics
//!
//! - Each operation is validated against the current tree before it is applied
//! - Applying an operation yields its inverse, which restores the exact
//!   previous state (including node ids)
//! - Fresh ids are resolved at apply time, so the recorded operation can be
//!   replayed verbatim for redo

use crate::document::Model;
use crate::errors::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::node::{AttributeValue, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    /// Insert a detached subtree as the `index`-th child of `parent`
    Insert {
        parent: NodeId,
        index: usize,
        fragment: Fragment,
    },

    /// Remove a node and all its descendants
    Remove { node: NodeId },

    /// Relocate a node. `index` is measured after the node left its old parent.
    Move {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },

    /// Set (`Some`) or remove (`None`) an attribute
    SetAttribute {
        node: NodeId,
        key: String,
        value: Option<AttributeValue>,
    },

    /// Replace the character data of a text run
    SetText { node: NodeId, data: String },

    /// Split a text run at a character offset; the tail becomes a new sibling
    SplitText {
        node: NodeId,
        offset: usize,
        new_id: Option<NodeId>,
    },

    /// Merge a text run with its following sibling run
    MergeText { node: NodeId },

    /// Change a node's kind and model name in place
    Rename {
        node: NodeId,
        kind: NodeKind,
        name: String,
    },
}

impl Operation {
    /// Node the operation is primarily about.
    pub fn target(&self) -> NodeId {
        match self {
            Operation::Insert { parent, .. } => *parent,
            Operation::Remove { node }
            | Operation::Move { node, .. }
            | Operation::SetAttribute { node, .. }
            | Operation::SetText { node, .. }
            | Operation::SplitText { node, .. }
            | Operation::MergeText { node }
            | Operation::Rename { node, .. } => *node,
        }
    }

    /// Validate without applying
    pub fn validate(&self, model: &Model) -> ModelResult<()> {
        let schema = model.schema();

        match self {
            Operation::Insert { parent, index, fragment } => {
                let parent_node = model
                    .get(*parent)
                    .ok_or(ModelError::ParentNotFound(*parent))?;

                if *index > parent_node.children.len() {
                    return Err(ModelError::OffsetOutOfBounds {
                        node: *parent,
                        offset: *index,
                    });
                }

                if !schema.allows_child(parent_node.kind, fragment.kind) {
                    return Err(ModelError::InvalidStructure(format!(
                        "'{}' cannot contain '{}'",
                        parent_node.name, fragment.name
                    )));
                }

                Self::validate_fragment(model, fragment)
            }

            Operation::Remove { node } => {
                if *node == model.root() {
                    return Err(ModelError::RootRemoval);
                }
                model.node(*node)?;
                Ok(())
            }

            Operation::Move { node, parent, index } => {
                if *node == model.root() {
                    return Err(ModelError::RootRemoval);
                }
                let moved = model.node(*node)?;
                let target = model
                    .get(*parent)
                    .ok_or(ModelError::ParentNotFound(*parent))?;

                if model.is_ancestor_or_self(*node, *parent) {
                    return Err(ModelError::CycleDetected);
                }

                if !schema.allows_child(target.kind, moved.kind) {
                    return Err(ModelError::InvalidStructure(format!(
                        "'{}' cannot contain '{}'",
                        target.name, moved.name
                    )));
                }

                let available = if moved.parent == Some(*parent) {
                    target.children.len() - 1
                } else {
                    target.children.len()
                };
                if *index > available {
                    return Err(ModelError::OffsetOutOfBounds {
                        node: *parent,
                        offset: *index,
                    });
                }

                Ok(())
            }

            Operation::SetAttribute { node, key, value } => {
                let target = model.node(*node)?;
                if value.is_some() && !schema.allows_attribute(target.kind, &target.name, key) {
                    return Err(ModelError::AttributeNotAllowed {
                        name: target.name.clone(),
                        key: key.clone(),
                    });
                }
                Ok(())
            }

            Operation::SetText { node, .. } => {
                let target = model.node(*node)?;
                if !target.is_text() {
                    return Err(ModelError::NotText(*node));
                }
                Ok(())
            }

            Operation::SplitText { node, offset, new_id } => {
                let target = model.node(*node)?;
                if !target.is_text() {
                    return Err(ModelError::NotText(*node));
                }
                if *offset == 0 || *offset >= target.offset_size() {
                    return Err(ModelError::OffsetOutOfBounds {
                        node: *node,
                        offset: *offset,
                    });
                }
                if let Some(id) = new_id {
                    if model.contains(*id) {
                        return Err(ModelError::InvalidStructure(format!("id {} is in use", id)));
                    }
                }
                Ok(())
            }

            Operation::MergeText { node } => {
                let target = model.node(*node)?;
                if !target.is_text() {
                    return Err(ModelError::NotText(*node));
                }
                let next = model
                    .next_sibling(*node)
                    .and_then(|id| model.get(id))
                    .ok_or_else(|| ModelError::InvalidStructure(format!("{} has no following run", node)))?;
                if !next.is_text() {
                    return Err(ModelError::NotText(next.id));
                }
                if next.attributes != target.attributes {
                    return Err(ModelError::InvalidStructure(
                        "cannot merge runs with different attributes".to_string(),
                    ));
                }
                Ok(())
            }

            Operation::Rename { node, kind, .. } => {
                if *node == model.root() {
                    return Err(ModelError::InvalidStructure("cannot rename the root".to_string()));
                }
                let target = model.node(*node)?;
                if let Some(parent) = target.parent.and_then(|p| model.get(p)) {
                    if !schema.allows_child(parent.kind, *kind) {
                        return Err(ModelError::InvalidStructure(format!(
                            "'{}' cannot contain {:?}",
                            parent.name, kind
                        )));
                    }
                }
                for child in model.children(*node) {
                    let child_kind = model.node(*child)?.kind;
                    if !schema.allows_child(*kind, child_kind) {
                        return Err(ModelError::InvalidStructure(format!(
                            "{:?} cannot contain {:?}",
                            kind, child_kind
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    fn validate_fragment(model: &Model, fragment: &Fragment) -> ModelResult<()> {
        let schema = model.schema();

        if let Some(id) = fragment.id {
            if model.contains(id) {
                return Err(ModelError::InvalidStructure(format!("id {} is in use", id)));
            }
        }

        if fragment.kind == NodeKind::Root || fragment.kind == NodeKind::ListContainer {
            return Err(ModelError::InvalidStructure(format!(
                "{:?} cannot be inserted into the model",
                fragment.kind
            )));
        }

        for key in fragment.attributes.keys() {
            if !schema.allows_attribute(fragment.kind, &fragment.name, key) {
                return Err(ModelError::AttributeNotAllowed {
                    name: fragment.name.clone(),
                    key: key.clone(),
                });
            }
        }

        for child in &fragment.children {
            if !schema.allows_child(fragment.kind, child.kind) {
                return Err(ModelError::InvalidStructure(format!(
                    "'{}' cannot contain '{}'",
                    fragment.name, child.name
                )));
            }
            Self::validate_fragment(model, child)?;
        }

        Ok(())
    }

    /// Validate, resolve fresh ids and apply. Returns the operation as
    /// applied (ids filled in) together with its inverse.
    pub(crate) fn apply_to(self, model: &mut Model) -> ModelResult<(Operation, Operation)> {
        self.validate(model)?;

        match self {
            Operation::Insert { parent, index, mut fragment } => {
                model.assign_ids(&mut fragment);
                let id = model.attach_fragment(parent, index, fragment.clone());
                let inverse = Operation::Remove { node: id };
                Ok((Operation::Insert { parent, index, fragment }, inverse))
            }

            Operation::Remove { node } => {
                let (parent, index) = model
                    .location(node)
                    .ok_or(ModelError::NodeNotFound(node))?;
                let fragment = model.detach_subtree(node)?;
                let inverse = Operation::Insert { parent, index, fragment };
                Ok((Operation::Remove { node }, inverse))
            }

            Operation::Move { node, parent, index } => {
                let (old_parent, old_index) = model
                    .location(node)
                    .ok_or(ModelError::NodeNotFound(node))?;
                model.unlink(node, old_parent);
                model.link(node, parent, index);
                let inverse = Operation::Move {
                    node,
                    parent: old_parent,
                    index: old_index,
                };
                Ok((Operation::Move { node, parent, index }, inverse))
            }

            Operation::SetAttribute { node, key, value } => {
                let target = model.node_mut(node)?;
                let previous = match &value {
                    Some(value) => target.attributes.insert(key.clone(), value.clone()),
                    None => target.attributes.remove(&key),
                };
                let inverse = Operation::SetAttribute {
                    node,
                    key: key.clone(),
                    value: previous,
                };
                Ok((Operation::SetAttribute { node, key, value }, inverse))
            }

            Operation::SetText { node, data } => {
                let target = model.node_mut(node)?;
                let previous = std::mem::replace(&mut target.data, data.clone());
                let inverse = Operation::SetText { node, data: previous };
                Ok((Operation::SetText { node, data }, inverse))
            }

            Operation::SplitText { node, offset, new_id } => {
                let new_id = new_id.unwrap_or_else(|| model.allocate_id());
                model.reserve_id(new_id);

                let (parent, index) = model
                    .location(node)
                    .ok_or(ModelError::NodeNotFound(node))?;
                let target = model.node_mut(node)?;
                let byte = byte_offset(&target.data, offset);
                let tail = target.data.split_off(byte);
                let attributes = target.attributes.clone();

                let mut fragment = Fragment::text(tail);
                fragment.id = Some(new_id);
                fragment.attributes = attributes;
                model.attach_fragment(parent, index + 1, fragment);

                let inverse = Operation::MergeText { node };
                Ok((
                    Operation::SplitText {
                        node,
                        offset,
                        new_id: Some(new_id),
                    },
                    inverse,
                ))
            }

            Operation::MergeText { node } => {
                let next = model
                    .next_sibling(node)
                    .ok_or(ModelError::NodeNotFound(node))?;
                let offset = model.node(node)?.offset_size();
                let tail = model.detach_subtree(next)?;
                model.node_mut(node)?.data.push_str(&tail.data);

                let inverse = Operation::SplitText {
                    node,
                    offset,
                    new_id: Some(next),
                };
                Ok((Operation::MergeText { node }, inverse))
            }

            Operation::Rename { node, kind, name } => {
                let target = model.node_mut(node)?;
                let old_kind = std::mem::replace(&mut target.kind, kind);
                let old_name = std::mem::replace(&mut target.name, name.clone());
                let inverse = Operation::Rename {
                    node,
                    kind: old_kind,
                    name: old_name,
                };
                Ok((Operation::Rename { node, kind, name }, inverse))
            }
        }
    }
}

/// Byte index of the `chars`-th character.
pub(crate) fn byte_offset(data: &str, chars: usize) -> usize {
    data.char_indices()
        .nth(chars)
        .map(|(byte, _)| byte)
        .unwrap_or(data.len())
}
