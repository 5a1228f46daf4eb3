//! # Schema
//!
//! Structural allow-list: which attribute keys a node may carry and which
//! children it may own. Custom attribute *names* are governed by the policy
//! registry; the schema only admits the `custom-attribute:` namespace.

use crate::node::{keys, names, NodeKind};

#[derive(Debug, Clone, Default)]
pub struct Schema;

impl Schema {
    pub fn new() -> Self {
        Self
    }

    /// Check whether a node of the given kind/name may carry `key`.
    pub fn allows_attribute(&self, kind: NodeKind, name: &str, key: &str) -> bool {
        match kind {
            NodeKind::Root | NodeKind::ListContainer => false,
            NodeKind::InlineTextRun => {
                keys::is_link_key(key)
                    || matches!(
                        key,
                        keys::BOLD
                            | keys::ITALIC
                            | keys::UNDERLINE
                            | keys::SUPERSCRIPT
                            | keys::SUBSCRIPT
                    )
            }
            NodeKind::Block | NodeKind::ListItem | NodeKind::CustomTag => {
                if Self::is_common_block_key(key) {
                    return true;
                }
                match name {
                    names::HEADING => key == keys::HEADING_LEVEL,
                    names::LIST_ITEM => key == keys::LIST_TYPE,
                    names::CUSTOM_TAG => {
                        key == keys::CUSTOM_TAG_NAME
                            || key.starts_with(keys::CUSTOM_TAG_PARAM_PREFIX)
                    }
                    _ => false,
                }
            }
            NodeKind::EmbedBlock => {
                Self::is_common_block_key(key) || Self::is_embed_key(key) || keys::is_link_key(key)
            }
            NodeKind::EmbedInline => Self::is_common_block_key(key) || Self::is_embed_key(key),
        }
    }

    /// Check whether `child` may be placed inside `parent`.
    pub fn allows_child(&self, parent: NodeKind, child: NodeKind) -> bool {
        match parent {
            NodeKind::Root | NodeKind::CustomTag => child.is_block_level(),
            NodeKind::Block | NodeKind::ListItem => child.is_inline(),
            _ => false,
        }
    }

    fn is_common_block_key(key: &str) -> bool {
        key == keys::ANCHOR
            || key == keys::CUSTOM_CLASSES
            || key.starts_with(keys::CUSTOM_ATTRIBUTE_PREFIX)
    }

    fn is_embed_key(key: &str) -> bool {
        key == keys::EXTERNAL_ID || keys::EMBED_CACHE.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_allowed_on_blocks_and_embeds() {
        let schema = Schema::new();
        assert!(schema.allows_attribute(NodeKind::Block, names::PARAGRAPH, keys::ANCHOR));
        assert!(schema.allows_attribute(NodeKind::ListItem, names::LIST_ITEM, keys::ANCHOR));
        assert!(schema.allows_attribute(NodeKind::EmbedInline, names::EMBED_INLINE, keys::ANCHOR));
        assert!(!schema.allows_attribute(NodeKind::InlineTextRun, names::TEXT, keys::ANCHOR));
    }

    #[test]
    fn test_link_keys_only_on_text_and_block_embeds() {
        let schema = Schema::new();
        assert!(schema.allows_attribute(NodeKind::InlineTextRun, names::TEXT, keys::LINK_HREF));
        assert!(schema.allows_attribute(NodeKind::EmbedBlock, names::EMBED, keys::LINK_HREF));
        assert!(!schema.allows_attribute(NodeKind::EmbedInline, names::EMBED_INLINE, keys::LINK_HREF));
        assert!(!schema.allows_attribute(NodeKind::Block, names::PARAGRAPH, keys::LINK_HREF));
    }

    #[test]
    fn test_name_specific_keys() {
        let schema = Schema::new();
        assert!(schema.allows_attribute(NodeKind::Block, names::HEADING, keys::HEADING_LEVEL));
        assert!(!schema.allows_attribute(NodeKind::Block, names::PARAGRAPH, keys::HEADING_LEVEL));
        assert!(!schema.allows_attribute(NodeKind::Block, names::PARAGRAPH, keys::LIST_TYPE));
    }

    #[test]
    fn test_children() {
        let schema = Schema::new();
        assert!(schema.allows_child(NodeKind::Root, NodeKind::Block));
        assert!(schema.allows_child(NodeKind::CustomTag, NodeKind::ListItem));
        assert!(schema.allows_child(NodeKind::Block, NodeKind::EmbedInline));
        assert!(!schema.allows_child(NodeKind::Block, NodeKind::Block));
        assert!(!schema.allows_child(NodeKind::Root, NodeKind::InlineTextRun));
    }
}
