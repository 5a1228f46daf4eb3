//! # Conversion Table
//!
//! Downcast builders keyed by `(stage, node kind)` and upcast handlers keyed
//! by persisted tag name. Every cell is a plain function, so each one can be
//! exercised on its own.

use crate::upcast::UpcastContext;
use crate::view::ViewNode;
use crate::{blocks, embed, inline, lists, vocabulary::xml};
use richtext_model::{Fragment, Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Model → rendered view
    Editing,
    /// Model → persisted form
    Data,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Scheme of embed references, as in `ezcontent://42`
    #[serde(default = "default_reference_scheme")]
    pub reference_scheme: String,

    /// Icon sprite used by embed previews
    #[serde(default = "default_icon_sprite")]
    pub icon_sprite: String,
}

fn default_reference_scheme() -> String {
    "ezcontent".to_string()
}

fn default_icon_sprite() -> String {
    "/bundles/ibexaicons/img/all-icons.svg".to_string()
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            reference_scheme: default_reference_scheme(),
            icon_sprite: default_icon_sprite(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DowncastContext {
    pub stage: Stage,
    pub options: ConversionOptions,
}

impl DowncastContext {
    pub fn new(stage: Stage, options: ConversionOptions) -> Self {
        Self { stage, options }
    }

    pub fn editing() -> Self {
        Self::new(Stage::Editing, ConversionOptions::default())
    }

    pub fn data() -> Self {
        Self::new(Stage::Data, ConversionOptions::default())
    }
}

/// Builds the element for a model node from its already converted children.
/// For `ListContainer` the node is the first list item it wraps.
pub type ElementBuilder = fn(&Node, Vec<ViewNode>, &DowncastContext) -> ViewNode;

/// Converts one persisted block-context element into model fragments.
pub type BlockUpcaster = fn(&ViewNode, &mut UpcastContext<'_>) -> Vec<Fragment>;

pub struct ConversionTable {
    downcast: HashMap<(Stage, NodeKind), ElementBuilder>,
    upcast: HashMap<String, BlockUpcaster>,
}

impl ConversionTable {
    pub fn empty() -> Self {
        Self {
            downcast: HashMap::new(),
            upcast: HashMap::new(),
        }
    }

    /// The table for the standard vocabulary.
    pub fn standard() -> Self {
        let mut table = Self::empty();

        for stage in [Stage::Editing, Stage::Data] {
            table.register_downcast(stage, NodeKind::Root, blocks::root);
            table.register_downcast(stage, NodeKind::Block, blocks::block);
            table.register_downcast(stage, NodeKind::CustomTag, blocks::custom_tag);
            table.register_downcast(stage, NodeKind::InlineTextRun, inline::text_run);
            table.register_downcast(stage, NodeKind::ListItem, lists::list_item);
            table.register_downcast(stage, NodeKind::ListContainer, lists::list_container);
            table.register_downcast(stage, NodeKind::EmbedBlock, embed::embed_block);
            table.register_downcast(stage, NodeKind::EmbedInline, embed::embed_inline);
        }

        table.register_upcast(xml::PARA, blocks::upcast_para);
        table.register_upcast(xml::TITLE, blocks::upcast_title);
        table.register_upcast(xml::PROGRAMLISTING, blocks::upcast_programlisting);
        table.register_upcast(xml::TEMPLATE, blocks::upcast_template);
        table.register_upcast(xml::ITEMIZEDLIST, lists::upcast_list);
        table.register_upcast(xml::ORDEREDLIST, lists::upcast_list);
        table.register_upcast(xml::EMBED, embed::upcast_embed_block);

        table
    }

    pub fn register_downcast(&mut self, stage: Stage, kind: NodeKind, builder: ElementBuilder) {
        self.downcast.insert((stage, kind), builder);
    }

    pub fn register_upcast(&mut self, tag: &str, upcaster: BlockUpcaster) {
        self.upcast.insert(tag.to_string(), upcaster);
    }

    pub fn builder(&self, stage: Stage, kind: NodeKind) -> Option<ElementBuilder> {
        self.downcast.get(&(stage, kind)).copied()
    }

    pub fn upcaster(&self, tag: &str) -> Option<BlockUpcaster> {
        self.upcast.get(tag).copied()
    }
}

/// Shared instance of [`ConversionTable::standard`].
pub fn standard_table() -> &'static ConversionTable {
    static TABLE: OnceLock<ConversionTable> = OnceLock::new();
    TABLE.get_or_init(ConversionTable::standard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_cell_in_both_stages() {
        let table = ConversionTable::standard();
        for stage in [Stage::Editing, Stage::Data] {
            for kind in [
                NodeKind::Root,
                NodeKind::Block,
                NodeKind::InlineTextRun,
                NodeKind::ListItem,
                NodeKind::ListContainer,
                NodeKind::EmbedBlock,
                NodeKind::EmbedInline,
                NodeKind::CustomTag,
            ] {
                assert!(table.builder(stage, kind).is_some(), "{:?}/{:?}", stage, kind);
            }
        }
    }

    #[test]
    fn test_upcast_lookup_by_tag() {
        let table = ConversionTable::standard();
        assert!(table.upcaster("para").is_some());
        assert!(table.upcaster("itemizedlist").is_some());
        assert!(table.upcaster("unknown").is_none());
    }
}
