//! # Writer
//!
//! The only handle that can mutate a [`Model`]. Obtained from
//! [`Model::change`]; higher-level helpers (range attributes, text insertion,
//! block splitting) are compositions of [`Operation`]s so every edit stays
//! invertible.

use crate::document::Model;
use crate::errors::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::node::{keys, AttributeValue, Attributes, NodeId, NodeKind};
use crate::operation::Operation;
use crate::position::{Position, Range, Selection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who produced a change. Undo grouping and observers key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOrigin {
    User,
    Undo,
    Redo,
    Resolver,
    PostEffect,
    Cleanup,
    Load,
}

/// Operations committed by one outermost change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub version: u64,
    pub origin: ChangeOrigin,
    pub operations: Vec<Operation>,
    /// Inverses in application order; undo replays them reversed.
    pub inverses: Vec<Operation>,
    pub selection_before: Selection,
    pub selection_changed: bool,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Every node id mentioned by the batch.
    pub fn touched_nodes(&self) -> BTreeSet<NodeId> {
        self.operations.iter().map(Operation::target).collect()
    }

    /// `(node, key)` pairs of attribute writes.
    pub fn attribute_changes(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.operations.iter().filter_map(|op| match op {
            Operation::SetAttribute { node, key, .. } => Some((*node, key.as_str())),
            _ => None,
        })
    }

    /// True when the batch only rewrote embed cache attributes.
    pub fn is_cache_only(&self) -> bool {
        !self.operations.is_empty()
            && self.operations.iter().all(|op| {
                matches!(op, Operation::SetAttribute { key, .. } if keys::EMBED_CACHE.contains(&key.as_str()))
            })
    }

    /// Nodes created by the batch (roots of inserted fragments).
    pub fn inserted_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for op in &self.operations {
            if let Operation::Insert { fragment, .. } = op {
                collect_ids(fragment, &mut out);
            }
        }
        out
    }
}

fn collect_ids(fragment: &Fragment, out: &mut Vec<NodeId>) {
    if let Some(id) = fragment.id {
        out.push(id);
    }
    for child in &fragment.children {
        collect_ids(child, out);
    }
}

pub struct Writer<'a> {
    model: &'a mut Model,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(model: &'a mut Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Model {
        &*self.model
    }

    /// Nested change; flattens into the enclosing one.
    pub fn change<R>(&mut self, f: impl FnOnce(&mut Writer<'_>) -> ModelResult<R>) -> ModelResult<R> {
        f(self)
    }

    pub fn apply(&mut self, operation: Operation) -> ModelResult<()> {
        self.model.apply(operation)
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.model.set_selection_in_change(selection);
    }

    pub fn set_selection_attribute(&mut self, key: &str, value: AttributeValue) {
        let mut selection = self.model.selection().clone();
        selection.set_attribute(key, value);
        self.set_selection(selection);
    }

    pub fn remove_selection_attribute(&mut self, key: &str) {
        let mut selection = self.model.selection().clone();
        if selection.remove_attribute(key).is_some() {
            self.set_selection(selection);
        }
    }

    // ---- node operations -----------------------------------------------

    /// Insert a fragment; returns the id of its root node.
    pub fn insert(&mut self, parent: NodeId, index: usize, mut fragment: Fragment) -> ModelResult<NodeId> {
        self.model.assign_ids(&mut fragment);
        let id = fragment
            .id
            .ok_or_else(|| ModelError::InvalidStructure("fragment without id".to_string()))?;
        self.apply(Operation::Insert { parent, index, fragment })?;
        Ok(id)
    }

    /// Insert a fragment at a position, splitting a text run if needed.
    pub fn insert_at(&mut self, position: Position, fragment: Fragment) -> ModelResult<NodeId> {
        let index = self.split_at(position)?;
        self.insert(position.parent, index, fragment)
    }

    pub fn remove(&mut self, node: NodeId) -> ModelResult<()> {
        self.apply(Operation::Remove { node })
    }

    pub fn move_node(&mut self, node: NodeId, parent: NodeId, index: usize) -> ModelResult<()> {
        self.apply(Operation::Move { node, parent, index })
    }

    pub fn set_attribute(&mut self, node: NodeId, key: &str, value: impl Into<AttributeValue>) -> ModelResult<()> {
        let value = value.into();
        if self.model.node(node)?.attribute(key) == Some(&value) {
            return Ok(());
        }
        self.apply(Operation::SetAttribute {
            node,
            key: key.to_string(),
            value: Some(value),
        })
    }

    pub fn remove_attribute(&mut self, node: NodeId, key: &str) -> ModelResult<()> {
        if !self.model.node(node)?.has_attribute(key) {
            return Ok(());
        }
        self.apply(Operation::SetAttribute {
            node,
            key: key.to_string(),
            value: None,
        })
    }

    pub fn set_text(&mut self, node: NodeId, data: impl Into<String>) -> ModelResult<()> {
        self.apply(Operation::SetText { node, data: data.into() })
    }

    pub fn rename(&mut self, node: NodeId, kind: NodeKind, name: &str) -> ModelResult<()> {
        let current = self.model.node(node)?;
        if current.kind == kind && current.name == name {
            return Ok(());
        }
        self.apply(Operation::Rename {
            node,
            kind,
            name: name.to_string(),
        })
    }

    // ---- position helpers ----------------------------------------------

    /// Make `position` fall on a child boundary; returns the child index at
    /// that boundary.
    pub fn split_at(&mut self, position: Position) -> ModelResult<usize> {
        let spans = self.model.child_spans(position.parent);
        let max = spans.last().map(|s| s.2).unwrap_or(0);
        if position.offset > max {
            return Err(ModelError::OffsetOutOfBounds {
                node: position.parent,
                offset: position.offset,
            });
        }

        for (index, (id, start, end)) in spans.iter().enumerate() {
            if *start == position.offset {
                return Ok(index);
            }
            if *start < position.offset && position.offset < *end {
                self.apply(Operation::SplitText {
                    node: *id,
                    offset: position.offset - start,
                    new_id: None,
                })?;
                return Ok(index + 1);
            }
        }

        Ok(spans.len())
    }

    /// Split both ends of a range; returns the child index span it covers.
    pub fn split_range(&mut self, range: &Range) -> ModelResult<(usize, usize)> {
        let start = self.split_at(range.start_position())?;
        let end = self.split_at(range.end_position())?;
        Ok((start, end))
    }

    /// Merge adjacent text runs with identical attributes and drop empty runs.
    pub fn normalize_text(&mut self, parent: NodeId) -> ModelResult<()> {
        let mut index = 0;
        loop {
            let children = self.model.children(parent).to_vec();
            let Some(current) = children.get(index).copied() else {
                break;
            };
            let node = self.model.node(current)?;
            if node.is_text() && node.data.is_empty() {
                self.remove(current)?;
                continue;
            }

            let mergeable = children
                .get(index + 1)
                .and_then(|next| self.model.get(*next))
                .is_some_and(|next| {
                    node.is_text() && next.is_text() && next.attributes == node.attributes
                });
            if mergeable {
                self.apply(Operation::MergeText { node: current })?;
            } else {
                index += 1;
            }
        }
        Ok(())
    }

    // ---- range helpers -------------------------------------------------

    /// Set `key` on every child in the range that may carry it. Children the
    /// schema rejects are skipped.
    pub fn set_attribute_on_range(
        &mut self,
        range: &Range,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> ModelResult<()> {
        if range.is_collapsed() {
            return Ok(());
        }
        let value = value.into();
        let (start, end) = self.split_range(range)?;
        let children = self.model.children(range.parent)[start..end].to_vec();
        for child in children {
            let node = self.model.node(child)?;
            if self.model.schema().allows_attribute(node.kind, &node.name, key) {
                self.set_attribute(child, key, value.clone())?;
            }
        }
        self.normalize_text(range.parent)
    }

    pub fn remove_attribute_on_range(&mut self, range: &Range, key: &str) -> ModelResult<()> {
        if range.is_collapsed() {
            return Ok(());
        }
        let (start, end) = self.split_range(range)?;
        let children = self.model.children(range.parent)[start..end].to_vec();
        for child in children {
            self.remove_attribute(child, key)?;
        }
        self.normalize_text(range.parent)
    }

    /// Insert a text run carrying `attributes`; returns the range it covers.
    pub fn insert_text(&mut self, position: Position, text: &str, attributes: Attributes) -> ModelResult<Range> {
        let length = text.chars().count();
        if length == 0 {
            return Ok(Range::collapsed(position));
        }
        let mut fragment = Fragment::text(text);
        fragment.attributes = attributes;
        self.insert_at(position, fragment)?;
        self.normalize_text(position.parent)?;
        Ok(Range::new(position.parent, position.offset, position.offset + length))
    }

    /// Remove everything inside a flat range.
    pub fn delete_range(&mut self, range: &Range) -> ModelResult<()> {
        if range.is_collapsed() {
            return Ok(());
        }
        let (start, end) = self.split_range(range)?;
        let children = self.model.children(range.parent)[start..end].to_vec();
        for child in children {
            self.remove(child)?;
        }
        self.normalize_text(range.parent)
    }

    /// Split the text block owning `position` in two. The new block copies the
    /// original's kind, name and attributes and receives everything after the
    /// position. Returns the new block.
    pub fn split_block(&mut self, position: Position) -> ModelResult<NodeId> {
        let block = self.model.node(position.parent)?;
        if !block.kind.is_text_block() {
            return Err(ModelError::InvalidStructure(format!(
                "cannot split '{}'",
                block.name
            )));
        }
        let mut fragment = Fragment::element(block.kind, block.name.clone());
        fragment.attributes = block.attributes.clone();

        let (grandparent, block_index) = self
            .model
            .location(position.parent)
            .ok_or(ModelError::ParentNotFound(position.parent))?;

        let split_index = self.split_at(position)?;
        let new_block = self.insert(grandparent, block_index + 1, fragment)?;

        let tail = self.model.children(position.parent)[split_index..].to_vec();
        for (index, child) in tail.into_iter().enumerate() {
            self.move_node(child, new_block, index)?;
        }

        Ok(new_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_paragraph(text: &str) -> (Model, NodeId) {
        let mut model = Model::new();
        let root = model.root();
        let paragraph = model
            .change(ChangeOrigin::Load, |w| {
                w.insert(root, 0, Fragment::paragraph().with_child(Fragment::text(text)))
            })
            .unwrap();
        model.take_batches();
        (model, paragraph)
    }

    #[test]
    fn test_split_at_middle_of_text() {
        let (mut model, paragraph) = model_with_paragraph("hello");
        let index = model
            .change(ChangeOrigin::User, |w| w.split_at(Position::new(paragraph, 2)))
            .unwrap();

        assert_eq!(index, 1);
        let children = model.children(paragraph);
        assert_eq!(children.len(), 2);
        assert_eq!(model.get(children[0]).unwrap().data, "he");
        assert_eq!(model.get(children[1]).unwrap().data, "llo");
    }

    #[test]
    fn test_range_attribute_merges_equal_runs() {
        let (mut model, paragraph) = model_with_paragraph("hello world");
        model
            .change(ChangeOrigin::User, |w| {
                w.set_attribute_on_range(&Range::new(paragraph, 0, 5), keys::BOLD, "true")?;
                w.remove_attribute_on_range(&Range::new(paragraph, 0, 11), keys::BOLD)
            })
            .unwrap();

        let children = model.children(paragraph);
        assert_eq!(children.len(), 1);
        assert_eq!(model.get(children[0]).unwrap().data, "hello world");
    }

    #[test]
    fn test_split_block_copies_attributes() {
        let (mut model, paragraph) = model_with_paragraph("abcd");
        let new_block = model
            .change(ChangeOrigin::User, |w| {
                w.set_attribute(paragraph, keys::ANCHOR, "top")?;
                w.split_block(Position::new(paragraph, 1))
            })
            .unwrap();

        assert_eq!(model.text_content(paragraph), "a");
        assert_eq!(model.text_content(new_block), "bcd");
        assert_eq!(model.get(new_block).unwrap().anchor(), Some("top"));
    }

    #[test]
    fn test_cache_only_batch() {
        let mut model = Model::new();
        let root = model.root();
        let embed = model
            .change(ChangeOrigin::Load, |w| w.insert(root, 0, Fragment::embed_block("42")))
            .unwrap();
        model.take_batches();

        model
            .change(ChangeOrigin::Resolver, |w| w.set_attribute(embed, keys::DISPLAY_NAME, "Foo"))
            .unwrap();

        let batches = model.take_batches();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_cache_only());
    }
}
