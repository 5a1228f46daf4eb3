//! Detached subtrees.
//!
//! A `Fragment` is an owned tree that is not part of any model. Insert
//! operations carry one, and removals capture one so they can be undone.

use crate::node::{keys, names, AttributeValue, Attributes, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Id to restore on insertion (set when the fragment was captured from
    /// a removal). Fresh ids are allocated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub children: Vec<Fragment>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
}

impl Fragment {
    pub fn element(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
            data: String::new(),
        }
    }

    pub fn paragraph() -> Self {
        Self::element(NodeKind::Block, names::PARAGRAPH)
    }

    pub fn heading(level: u8) -> Self {
        Self::element(NodeKind::Block, names::HEADING).with_attr(keys::HEADING_LEVEL, level.to_string())
    }

    pub fn list_item(list_type: &str) -> Self {
        Self::element(NodeKind::ListItem, names::LIST_ITEM).with_attr(keys::LIST_TYPE, list_type)
    }

    pub fn text(data: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: NodeKind::InlineTextRun,
            name: names::TEXT.to_string(),
            attributes: Attributes::new(),
            children: Vec::new(),
            data: data.into(),
        }
    }

    pub fn embed_inline(external_id: impl Into<String>) -> Self {
        Self::element(NodeKind::EmbedInline, names::EMBED_INLINE)
            .with_attr(keys::EXTERNAL_ID, external_id.into())
    }

    pub fn embed_block(external_id: impl Into<String>) -> Self {
        Self::element(NodeKind::EmbedBlock, names::EMBED).with_attr(keys::EXTERNAL_ID, external_id.into())
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.children.extend(children);
        self
    }

    /// Total number of nodes in the subtree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Fragment::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
