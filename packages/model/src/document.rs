//! # Document Model
//!
//! Arena-backed tree of typed nodes. The model is the single source of truth
//! while editing; the rendered view and the persisted form are derived from it.
//!
//! All mutation goes through [`Model::change`], which hands out a [`Writer`].
//! Nested changes flatten into the outermost one and a failing change is
//! rolled back before the error is returned.

use crate::errors::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::node::{names, AttributeValue, Attributes, Node, NodeId, NodeKind};
use crate::operation::Operation;
use crate::position::{Position, Range, Selection};
use crate::schema::Schema;
use crate::writer::{ChangeBatch, ChangeOrigin, Writer};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Batch being recorded by the outermost active change.
#[derive(Debug)]
pub(crate) struct PendingBatch {
    origin: ChangeOrigin,
    operations: Vec<Operation>,
    inverses: Vec<Operation>,
    selection_before: Selection,
    selection_changed: bool,
}

#[derive(Debug)]
pub struct Model {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    schema: Schema,
    selection: Selection,
    depth: usize,
    pending: Option<PendingBatch>,
    committed: Vec<ChangeBatch>,
    version: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                id: root,
                kind: NodeKind::Root,
                name: names::ROOT.to_string(),
                attributes: Attributes::new(),
                children: Vec::new(),
                parent: None,
                data: String::new(),
            },
        );

        Self {
            nodes,
            root,
            next_id: 1,
            schema: Schema::new(),
            selection: Selection::caret(Position::new(root, 0)),
            depth: 0,
            pending: None,
            committed: Vec::new(),
            version: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of committed, non-empty changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_in_change(&self) -> bool {
        self.depth > 0
    }

    // ---- queries -------------------------------------------------------

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node(&self, id: NodeId) -> ModelResult<&Node> {
        self.nodes.get(&id).ok_or(ModelError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> ModelResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(ModelError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Whether the node is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            let Some(node) = self.nodes.get(&node_id) else {
                return false;
            };
            let Some(parent) = node.parent else {
                return false;
            };
            // Confirm the parent actually owns the node
            match self.nodes.get(&parent) {
                Some(p) if p.children.contains(&node_id) => {}
                _ => return false,
            }
            current = Some(parent);
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
        }
        false
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Parent and child index of a node.
    pub fn location(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|c| *c == id)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.location(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.location(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.parent(node_id);
        }
        false
    }

    /// Pre-order descendants, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Nearest block-level node at or above `id`.
    pub fn ancestor_block(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            if node.kind.is_block_level() {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }

    /// Concatenated character data below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.get(id) {
            if node.is_text() {
                out.push_str(&node.data);
            }
        }
        for child in self.descendants(id) {
            if let Some(node) = self.get(child) {
                if node.is_text() {
                    out.push_str(&node.data);
                }
            }
        }
        out
    }

    /// Nodes whose non-empty anchor equals `anchor`.
    pub fn find_by_anchor(&self, anchor: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.get(*id).and_then(Node::anchor) == Some(anchor))
            .collect()
    }

    // ---- offsets -------------------------------------------------------

    /// Children of `parent` with their `[start, end)` offsets.
    pub fn child_spans(&self, parent: NodeId) -> Vec<(NodeId, usize, usize)> {
        let mut offset = 0;
        self.children(parent)
            .iter()
            .filter_map(|id| {
                let size = self.get(*id)?.offset_size();
                let span = (*id, offset, offset + size);
                offset += size;
                Some(span)
            })
            .collect()
    }

    pub fn max_offset(&self, parent: NodeId) -> usize {
        self.child_spans(parent).last().map(|s| s.2).unwrap_or(0)
    }

    pub fn offset_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.child_spans(parent)
            .into_iter()
            .find(|(child, _, _)| *child == id)
            .map(|(_, start, _)| start)
    }

    /// Position just before `id`.
    pub fn position_before(&self, id: NodeId) -> Option<Position> {
        Some(Position::new(self.parent(id)?, self.offset_of(id)?))
    }

    /// Position just after `id`.
    pub fn position_after(&self, id: NodeId) -> Option<Position> {
        let size = self.get(id)?.offset_size();
        Some(Position::new(self.parent(id)?, self.offset_of(id)? + size))
    }

    /// Range spanning `id` inside its parent.
    pub fn range_on(&self, id: NodeId) -> Option<Range> {
        let start = self.position_before(id)?;
        let size = self.get(id)?.offset_size();
        Some(Range::new(start.parent, start.offset, start.offset + size))
    }

    /// Range over the whole content of `id`.
    pub fn range_in(&self, id: NodeId) -> Range {
        Range::new(id, 0, self.max_offset(id))
    }

    /// Node that starts exactly at the position.
    pub fn node_after(&self, position: Position) -> Option<NodeId> {
        self.child_spans(position.parent)
            .into_iter()
            .find(|(_, start, _)| *start == position.offset)
            .map(|(id, _, _)| id)
    }

    /// Node that ends exactly at the position.
    pub fn node_before(&self, position: Position) -> Option<NodeId> {
        self.child_spans(position.parent)
            .into_iter()
            .find(|(_, _, end)| *end == position.offset && position.offset > 0)
            .map(|(id, _, _)| id)
    }

    /// Text run that strictly contains the position.
    pub fn text_node_at(&self, position: Position) -> Option<NodeId> {
        self.child_spans(position.parent)
            .into_iter()
            .find(|(_, start, end)| *start < position.offset && position.offset < *end)
            .map(|(id, _, _)| id)
    }

    /// Children intersecting a range, in order.
    pub fn nodes_in_range(&self, range: &Range) -> Vec<NodeId> {
        self.child_spans(range.parent)
            .into_iter()
            .filter(|(_, start, end)| *start < range.end && *end > range.start)
            .map(|(id, _, _)| id)
            .collect()
    }

    /// Attributes a caret at `position` inherits: those of the text run
    /// before it, or the one after it at the start of a block.
    pub fn attributes_at(&self, position: Position) -> Attributes {
        let candidate = self
            .text_node_at(position)
            .or_else(|| self.node_before(position))
            .or_else(|| self.node_after(position));
        candidate
            .and_then(|id| self.get(id))
            .filter(|n| n.is_text())
            .map(|n| n.attributes.clone())
            .unwrap_or_default()
    }

    /// Largest flat range around `position` whose children all carry
    /// `key = value`. Collapsed at `position` when neither neighbour matches.
    pub fn find_attribute_range(&self, position: Position, key: &str, value: &AttributeValue) -> Range {
        let spans = self.child_spans(position.parent);
        let matches = |index: usize| {
            spans
                .get(index)
                .and_then(|(id, _, _)| self.get(*id))
                .and_then(|n| n.attribute(key))
                == Some(value)
        };

        let inside = spans
            .iter()
            .position(|(_, start, end)| *start < position.offset && position.offset < *end);

        let start = match inside {
            Some(i) if matches(i) => Some(i),
            Some(_) => None,
            None => spans
                .iter()
                .position(|(_, _, end)| *end == position.offset && position.offset > 0)
                .filter(|i| matches(*i)),
        }
        .map(|mut first| {
            while first > 0 && matches(first - 1) {
                first -= 1;
            }
            spans[first].1
        })
        .unwrap_or(position.offset);

        let end = match inside {
            Some(i) if matches(i) => Some(i),
            Some(_) => None,
            None => spans
                .iter()
                .position(|(_, start, _)| *start == position.offset)
                .filter(|i| matches(*i)),
        }
        .map(|mut last| {
            while last + 1 < spans.len() && matches(last + 1) {
                last += 1;
            }
            spans[last].2
        })
        .unwrap_or(position.offset);

        Range::new(position.parent, start, end)
    }

    // ---- selection -----------------------------------------------------

    /// The single non-text node covered by the selection, if any.
    pub fn selected_element(&self) -> Option<NodeId> {
        let [range] = self.selection.ranges.as_slice() else {
            return None;
        };
        if range.end != range.start + 1 {
            return None;
        }
        let id = self.node_after(range.start_position())?;
        let node = self.get(id)?;
        (!node.is_text()).then_some(id)
    }

    /// Element the selection is focused on: the selected element, or the
    /// block owning the first position.
    pub fn context_element(&self) -> Option<NodeId> {
        if let Some(selected) = self.selected_element() {
            return Some(selected);
        }
        let position = self.selection.first_position()?;
        if position.parent == self.root {
            return self.node_after(position).or_else(|| self.node_before(position));
        }
        self.ancestor_block(position.parent)
    }

    /// Blocks intersecting the selection, in document order.
    pub fn selection_blocks(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::new();
        for range in &self.selection.ranges {
            let Some(parent) = self.get(range.parent) else {
                continue;
            };
            let found: Vec<NodeId> = if parent.kind.is_text_block() {
                vec![range.parent]
            } else {
                self.nodes_in_range(range)
                    .into_iter()
                    .filter(|id| self.get(*id).is_some_and(|n| n.kind.is_block_level()))
                    .collect()
            };
            for id in found {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Replace the selection outside of a change.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.sanitize_selection();
    }

    /// Drop ranges on detached parents and clamp offsets.
    pub fn sanitize_selection(&mut self) {
        let mut ranges = Vec::new();
        for range in &self.selection.ranges {
            if !self.is_attached(range.parent) {
                continue;
            }
            let max = self.max_offset(range.parent);
            ranges.push(Range::new(range.parent, range.start.min(max), range.end.min(max)));
        }

        if ranges.is_empty() {
            let fallback = self
                .descendants(self.root)
                .into_iter()
                .find(|id| self.get(*id).is_some_and(|n| n.kind.is_text_block()))
                .unwrap_or(self.root);
            ranges.push(Range::new(fallback, 0, 0));
        }

        self.selection.ranges = ranges;
    }

    // ---- transactions --------------------------------------------------

    /// Run `f` inside a change transaction. Observers see the resulting
    /// batch only after the outermost change returns.
    pub fn change<R>(
        &mut self,
        origin: ChangeOrigin,
        f: impl FnOnce(&mut Writer<'_>) -> ModelResult<R>,
    ) -> ModelResult<R> {
        let outermost = self.depth == 0;
        if outermost {
            self.pending = Some(PendingBatch {
                origin,
                operations: Vec::new(),
                inverses: Vec::new(),
                selection_before: self.selection.clone(),
                selection_changed: false,
            });
        }

        self.depth += 1;
        let result = {
            let mut writer = Writer::new(self);
            f(&mut writer)
        };
        self.depth -= 1;

        if !outermost {
            return result;
        }

        let Some(pending) = self.pending.take() else {
            return result;
        };

        match result {
            Ok(value) => {
                self.sanitize_selection();
                if !pending.operations.is_empty() || pending.selection_changed {
                    if !pending.operations.is_empty() {
                        self.version += 1;
                    }
                    debug!(
                        origin = ?pending.origin,
                        operations = pending.operations.len(),
                        version = self.version,
                        "change committed"
                    );
                    self.committed.push(ChangeBatch {
                        version: self.version,
                        origin: pending.origin,
                        operations: pending.operations,
                        inverses: pending.inverses,
                        selection_before: pending.selection_before,
                        selection_changed: pending.selection_changed,
                    });
                }
                Ok(value)
            }
            Err(err) => {
                warn!(origin = ?pending.origin, error = %err, "change failed, rolling back");
                for inverse in pending.inverses.into_iter().rev() {
                    if let Err(rollback_err) = inverse.apply_to(self) {
                        warn!(error = %rollback_err, "rollback step failed");
                    }
                }
                self.selection = pending.selection_before;
                Err(err)
            }
        }
    }

    /// Apply a single operation. Only valid inside [`Model::change`].
    pub fn apply(&mut self, operation: Operation) -> ModelResult<()> {
        if self.depth == 0 {
            return Err(ModelError::TransactionViolation);
        }
        let (applied, inverse) = operation.apply_to(self)?;
        if let Some(pending) = self.pending.as_mut() {
            pending.operations.push(applied);
            pending.inverses.push(inverse);
        }
        Ok(())
    }

    pub(crate) fn set_selection_in_change(&mut self, selection: Selection) {
        self.selection = selection;
        if let Some(pending) = self.pending.as_mut() {
            pending.selection_changed = true;
        }
    }

    /// Batches committed since the last call, oldest first.
    pub fn take_batches(&mut self) -> Vec<ChangeBatch> {
        std::mem::take(&mut self.committed)
    }

    // ---- storage (crate-internal) --------------------------------------

    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn reserve_id(&mut self, id: NodeId) {
        if id.0 >= self.next_id {
            self.next_id = id.0 + 1;
        }
    }

    pub(crate) fn assign_ids(&mut self, fragment: &mut Fragment) {
        match fragment.id {
            Some(id) => self.reserve_id(id),
            None => fragment.id = Some(self.allocate_id()),
        }
        for child in &mut fragment.children {
            self.assign_ids(child);
        }
    }

    /// Store a fragment (ids already assigned) and link it under `parent`.
    pub(crate) fn attach_fragment(&mut self, parent: NodeId, index: usize, fragment: Fragment) -> NodeId {
        let id = self.store_fragment(fragment, Some(parent));
        self.link(id, parent, index);
        id
    }

    fn store_fragment(&mut self, fragment: Fragment, parent: Option<NodeId>) -> NodeId {
        let id = fragment.id.unwrap_or_else(|| self.allocate_id());
        self.reserve_id(id);
        let children = fragment
            .children
            .into_iter()
            .map(|child| self.store_fragment(child, Some(id)))
            .collect();
        self.nodes.insert(
            id,
            Node {
                id,
                kind: fragment.kind,
                name: fragment.name,
                attributes: fragment.attributes,
                children,
                parent,
                data: fragment.data,
            },
        );
        id
    }

    /// Unlink `id` from its parent and drop the subtree from the arena.
    pub(crate) fn detach_subtree(&mut self, id: NodeId) -> ModelResult<Fragment> {
        if let Some(parent) = self.parent(id) {
            self.unlink(id, parent);
        }
        self.take_fragment(id)
    }

    fn take_fragment(&mut self, id: NodeId) -> ModelResult<Fragment> {
        let node = self.nodes.remove(&id).ok_or(ModelError::NodeNotFound(id))?;
        let children = node
            .children
            .iter()
            .map(|child| self.take_fragment(*child))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Fragment {
            id: Some(id),
            kind: node.kind,
            name: node.name,
            attributes: node.attributes,
            children,
            data: node.data,
        })
    }

    pub(crate) fn unlink(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }

    pub(crate) fn link(&mut self, id: NodeId, parent: NodeId, index: usize) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(parent);
        }
    }

    /// Snapshot of a subtree as a detached fragment (ids kept).
    pub fn to_fragment(&self, id: NodeId) -> ModelResult<Fragment> {
        let node = self.node(id)?;
        let children = node
            .children
            .iter()
            .map(|child| self.to_fragment(*child))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Fragment {
            id: Some(id),
            kind: node.kind,
            name: node.name.clone(),
            attributes: node.attributes.clone(),
            children,
            data: node.data.clone(),
        })
    }
}
