//! # Upcast
//!
//! Persisted XML → model. Each block-context element is dispatched through
//! the conversion table by tag; inline content is handled by
//! [`crate::inline::upcast_inline`].
//!
//! ## Recovery
//!
//! Only XML syntax errors fail a load. Anything else the vocabulary does not
//! cover is recovered locally and reported:
//!
//! - stray text or inline content at block level is wrapped in a paragraph
//! - unknown elements with children are unwrapped into their parent
//! - empty unknown elements, invalid embeds and image-typed inline embeds
//!   are dropped

use crate::error::ConvertResult;
use crate::inline;
use crate::table::{standard_table, ConversionOptions, ConversionTable};
use crate::view::ViewNode;
use crate::vocabulary::xml;
use crate::xml::parse_xml;
use richtext_model::{
    keys, Attributes, ChangeOrigin, Fragment, Model, NodeId, Position, Selection,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryAction {
    Unwrapped,
    Wrapped,
    Dropped,
}

/// A local repair made while reading malformed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recovery {
    pub element: String,
    pub action: RecoveryAction,
    pub detail: String,
}

/// An embed created by upcast that still needs resolving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEmbed {
    pub node: NodeId,
    pub external_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpcastReport {
    pub pending: Vec<PendingEmbed>,
    pub recoveries: Vec<Recovery>,
}

pub struct UpcastContext<'a> {
    table: &'a ConversionTable,
    options: &'a ConversionOptions,
    recoveries: Vec<Recovery>,
}

impl<'a> UpcastContext<'a> {
    pub fn new(table: &'a ConversionTable, options: &'a ConversionOptions) -> Self {
        Self {
            table,
            options,
            recoveries: Vec::new(),
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        self.options
    }

    pub fn recover(&mut self, element: &str, action: RecoveryAction, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(element, ?action, detail = %detail, "recovered malformed input");
        self.recoveries.push(Recovery {
            element: element.to_string(),
            action,
            detail,
        });
    }

    pub fn recoveries(&self) -> &[Recovery] {
        &self.recoveries
    }

    pub fn into_recoveries(self) -> Vec<Recovery> {
        self.recoveries
    }

    /// Convert a sequence of block-context nodes.
    pub fn upcast_blocks(&mut self, nodes: &[ViewNode]) -> Vec<Fragment> {
        let mut out = Vec::new();
        let mut stray: Vec<ViewNode> = Vec::new();

        for node in nodes {
            match node {
                ViewNode::Text { content, .. } => {
                    if !stray.is_empty() || !content.trim().is_empty() {
                        stray.push(node.clone());
                    }
                }
                ViewNode::Element { tag, children, .. } => {
                    if let Some(upcaster) = self.table.upcaster(tag) {
                        self.flush_stray(&mut stray, &mut out);
                        debug!(tag = %tag, "upcasting block");
                        out.extend(upcaster(node, self));
                    } else if inline::is_inline_tag(tag) {
                        stray.push(node.clone());
                    } else {
                        self.flush_stray(&mut stray, &mut out);
                        if children.is_empty() {
                            self.recover(tag, RecoveryAction::Dropped, "empty unknown element");
                        } else {
                            self.recover(tag, RecoveryAction::Unwrapped, "unknown element");
                            out.extend(self.upcast_blocks(children));
                        }
                    }
                }
            }
        }

        self.flush_stray(&mut stray, &mut out);
        out
    }

    fn flush_stray(&mut self, stray: &mut Vec<ViewNode>, out: &mut Vec<Fragment>) {
        while stray
            .last()
            .is_some_and(|n| n.tag().is_none() && n.text_content().trim().is_empty())
        {
            stray.pop();
        }
        if stray.is_empty() {
            return;
        }

        let element = stray.iter().find_map(ViewNode::tag).unwrap_or("#text").to_string();
        self.recover(&element, RecoveryAction::Wrapped, "inline content at block level");
        let nodes = std::mem::take(stray);
        let children = self.upcast_inline(&nodes);
        if !children.is_empty() {
            out.push(Fragment::paragraph().with_children(children));
        }
    }

    pub fn upcast_inline(&mut self, nodes: &[ViewNode]) -> Vec<Fragment> {
        inline::upcast_inline(nodes, &Attributes::new(), self)
    }
}

/// Reads persisted documents into a model.
pub struct Upcaster<'a> {
    table: &'a ConversionTable,
    options: ConversionOptions,
}

impl<'a> Upcaster<'a> {
    pub fn new(table: &'a ConversionTable, options: ConversionOptions) -> Self {
        Self { table, options }
    }

    /// Convert a parsed document into root-level fragments.
    pub fn fragments(&self, root: &ViewNode) -> (Vec<Fragment>, Vec<Recovery>) {
        let mut ctx = UpcastContext::new(self.table, &self.options);
        if !root.is_tag(xml::SECTION) {
            let tag = root.tag().unwrap_or_default().to_string();
            ctx.recover(&tag, RecoveryAction::Unwrapped, "document root is not a section");
        }
        let blocks = if root.is_tag(xml::SECTION) {
            ctx.upcast_blocks(root.children())
        } else {
            ctx.upcast_blocks(std::slice::from_ref(root))
        };
        (blocks, ctx.into_recoveries())
    }

    /// Replace the model content with `source`. Embeds are created as
    /// placeholders and listed in the report for resolution.
    #[instrument(skip_all, fields(bytes = source.len()))]
    pub fn load(&self, model: &mut Model, source: &str) -> ConvertResult<UpcastReport> {
        let root = parse_xml(source)?;
        let (fragments, recoveries) = self.fragments(&root);
        let block_count = fragments.len();

        model.change(ChangeOrigin::Load, |writer| {
            let root = writer.model().root();
            let existing: Vec<NodeId> = writer.model().children(root).to_vec();
            for child in existing {
                writer.remove(child)?;
            }
            for (index, fragment) in fragments.into_iter().enumerate() {
                writer.insert(root, index, fragment)?;
            }
            let caret = first_text_block(writer.model()).unwrap_or(root);
            writer.set_selection(Selection::caret(Position::new(caret, 0)));
            Ok(())
        })?;

        let pending = pending_embeds(model);
        info!(
            blocks = block_count,
            pending = pending.len(),
            recoveries = recoveries.len(),
            "document loaded"
        );

        Ok(UpcastReport { pending, recoveries })
    }
}

fn first_text_block(model: &Model) -> Option<NodeId> {
    model
        .descendants(model.root())
        .into_iter()
        .find(|id| model.get(*id).is_some_and(|n| n.kind.is_text_block()))
}

/// Embeds in document order that carry an external id.
pub fn pending_embeds(model: &Model) -> Vec<PendingEmbed> {
    model
        .descendants(model.root())
        .into_iter()
        .filter_map(|id| {
            let node = model.get(id)?;
            if !node.kind.is_embed() {
                return None;
            }
            let external_id = node.attribute_str(keys::EXTERNAL_ID)?;
            Some(PendingEmbed {
                node: id,
                external_id: external_id.to_string(),
            })
        })
        .collect()
}

/// Load `source` into `model` with the standard table.
pub fn upcast(model: &mut Model, source: &str, options: &ConversionOptions) -> ConvertResult<UpcastReport> {
    Upcaster::new(standard_table(), options.clone()).load(model, source)
}

/// Upcast without a model, for inspection.
pub fn upcast_fragments(source: &str, options: &ConversionOptions) -> ConvertResult<(Vec<Fragment>, Vec<Recovery>)> {
    let root = parse_xml(source)?;
    Ok(Upcaster::new(standard_table(), options.clone()).fragments(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_model::{names, NodeKind};

    fn fragments(source: &str) -> (Vec<Fragment>, Vec<Recovery>) {
        upcast_fragments(source, &ConversionOptions::default()).unwrap()
    }

    #[test]
    fn test_stray_text_is_wrapped() {
        let (blocks, recoveries) = fragments("<section>loose <emphasis>text</emphasis><para>ok</para></section>");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, names::PARAGRAPH);
        assert_eq!(blocks[0].children.len(), 2);
        assert_eq!(recoveries[0].action, RecoveryAction::Wrapped);
    }

    #[test]
    fn test_unknown_elements() {
        let (blocks, recoveries) =
            fragments("<section><sidebar><para>inner</para></sidebar><br/></section>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].children[0].data, "inner");
        assert_eq!(
            recoveries.iter().map(|r| r.action).collect::<Vec<_>>(),
            vec![RecoveryAction::Unwrapped, RecoveryAction::Dropped]
        );
    }

    #[test]
    fn test_formatting_whitespace_between_blocks_is_ignored() {
        let (blocks, recoveries) = fragments("<section>\n  <para>a</para>\n  <para>b</para>\n</section>");
        assert_eq!(blocks.len(), 2);
        assert!(recoveries.is_empty());
    }

    #[test]
    fn test_container_id_becomes_item_anchor() {
        let (blocks, _) = fragments(
            r#"<section><itemizedlist id="steps"><listitem><para>one</para></listitem><listitem><para>two</para></listitem></itemizedlist></section>"#,
        );
        assert_eq!(blocks.len(), 2);
        for item in &blocks {
            assert_eq!(item.kind, NodeKind::ListItem);
            assert_eq!(item.attributes.get(keys::ANCHOR).and_then(|a| a.as_str()), Some("steps"));
        }
    }

    #[test]
    fn test_invalid_embeds_dropped() {
        let (blocks, recoveries) = fragments(
            r#"<section><ezembed xlink:href="bogus" view="embed"/><para>x<ezembedinline xlink:href="ezcontent://1" ezxhtml:class="ibexa-embed-type-image"/></para></section>"#,
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].children.len(), 1);
        assert_eq!(recoveries.len(), 2);
        assert!(recoveries.iter().all(|r| r.action == RecoveryAction::Dropped));
    }
}
