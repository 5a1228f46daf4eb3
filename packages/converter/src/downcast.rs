//! # Downcast
//!
//! Model → element tree, for either stage. The walker only dispatches; every
//! element is built by a cell of the [`ConversionTable`].
//!
//! Block sequences are where list items meet their containers: each item is
//! wrapped in its own container, its anchor relocated, and the containers
//! merged per [`crate::lists::merge_containers`].

use crate::error::{ConvertError, ConvertResult};
use crate::html::{render_html, RenderOptions};
use crate::table::{standard_table, ConversionOptions, ConversionTable, DowncastContext, Stage};
use crate::view::ViewNode;
use crate::xml::write_xml;
use crate::{inline, lists};
use richtext_model::{Model, Node, NodeId, NodeKind};
use tracing::{info, instrument};

pub struct Downcaster<'a> {
    table: &'a ConversionTable,
    ctx: DowncastContext,
}

impl<'a> Downcaster<'a> {
    pub fn new(table: &'a ConversionTable, ctx: DowncastContext) -> Self {
        Self { table, ctx }
    }

    pub fn stage(&self) -> Stage {
        self.ctx.stage
    }

    /// Convert the whole document.
    #[instrument(skip_all, fields(stage = ?self.ctx.stage, version = model.version()))]
    pub fn run(&self, model: &Model) -> ConvertResult<ViewNode> {
        let view = self.convert(model, model.root())?;
        info!(blocks = view.children().len(), "downcast complete");
        Ok(view)
    }

    /// Convert one node and its subtree.
    pub fn convert(&self, model: &Model, id: NodeId) -> ConvertResult<ViewNode> {
        let node = model.node(id)?;

        let children = match node.kind {
            kind if kind.is_text_block() => self.convert_inline(model, node)?,
            NodeKind::Root | NodeKind::CustomTag => self.convert_blocks(model, node)?,
            _ => Vec::new(),
        };

        let builder = self.builder(node.kind)?;
        Ok(builder(node, children, &self.ctx).with_model(id))
    }

    fn builder(&self, kind: NodeKind) -> ConvertResult<crate::table::ElementBuilder> {
        self.table.builder(self.ctx.stage, kind).ok_or(ConvertError::Unsupported {
            stage: self.ctx.stage,
            kind,
        })
    }

    fn convert_blocks(&self, model: &Model, parent: &Node) -> ConvertResult<Vec<ViewNode>> {
        let mut out = Vec::with_capacity(parent.children.len());

        for child in &parent.children {
            let node = model.node(*child)?;
            if node.kind != NodeKind::ListItem {
                out.push(self.convert(model, *child)?);
                continue;
            }

            let item = self.convert(model, *child)?;
            let container_builder = self.builder(NodeKind::ListContainer)?;
            let mut container = container_builder(node, vec![item], &self.ctx);
            lists::relocate_anchor(&mut container, node);
            out.push(container);
        }

        Ok(lists::merge_containers(out))
    }

    fn convert_inline(&self, model: &Model, parent: &Node) -> ConvertResult<Vec<ViewNode>> {
        let children = parent
            .children
            .iter()
            .map(|child| self.convert(model, *child))
            .collect::<ConvertResult<Vec<_>>>()?;
        Ok(inline::merge_adjacent(children))
    }
}

/// Downcast with the standard table.
pub fn downcast(model: &Model, ctx: DowncastContext) -> ConvertResult<ViewNode> {
    Downcaster::new(standard_table(), ctx).run(model)
}

/// The rendered view tree.
pub fn editing_view(model: &Model, options: &ConversionOptions) -> ConvertResult<ViewNode> {
    downcast(model, DowncastContext::new(Stage::Editing, options.clone()))
}

/// The rendered view as HTML.
pub fn editing_html(model: &Model, options: &ConversionOptions, render: &RenderOptions) -> ConvertResult<String> {
    Ok(render_html(&editing_view(model, options)?, render))
}

/// The persisted document.
pub fn data_xml(model: &Model, options: &ConversionOptions) -> ConvertResult<String> {
    let tree = downcast(model, DowncastContext::new(Stage::Data, options.clone()))?;
    Ok(write_xml(&tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_model::{keys, ChangeOrigin, Fragment};

    fn model_with(blocks: Vec<Fragment>) -> Model {
        let mut model = Model::new();
        model
            .change(ChangeOrigin::Load, |w| {
                let root = w.model().root();
                for (i, block) in blocks.into_iter().enumerate() {
                    w.insert(root, i, block)?;
                }
                Ok(())
            })
            .unwrap();
        model
    }

    fn item(text: &str, anchor: Option<&str>) -> Fragment {
        let mut item = Fragment::list_item("bulleted").with_child(Fragment::text(text));
        if let Some(anchor) = anchor {
            item = item.with_attr(keys::ANCHOR, anchor);
        }
        item
    }

    #[test]
    fn test_anchor_lands_on_one_container() {
        let model = model_with(vec![item("one", Some("steps")), item("two", None)]);
        let view = editing_view(&model, &ConversionOptions::default()).unwrap();

        assert_eq!(view.count_attr("id", "steps"), 1);
        let list = &view.children()[0];
        assert_eq!(list.tag(), Some("ul"));
        assert_eq!(list.attr("id"), Some("steps"));
        assert!(list.children().iter().all(|li| li.attr("id").is_none()));
        assert_eq!(list.children().len(), 2);
    }

    #[test]
    fn test_data_pass_absorbs_unanchored_neighbour() {
        let model = model_with(vec![item("one", Some("steps")), item("two", None), item("three", Some("steps"))]);
        let tree = downcast(&model, DowncastContext::data()).unwrap();
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.count_attr("id", "steps"), 1);
        assert_eq!(tree.children()[0].children().len(), 3);
    }

    #[test]
    fn test_plain_lists_merge() {
        let model = model_with(vec![item("one", None), item("two", None), item("three", None)]);
        let tree = downcast(&model, DowncastContext::data()).unwrap();
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].children().len(), 3);
    }

    #[test]
    fn test_data_xml_has_namespaces() {
        let model = model_with(vec![Fragment::paragraph().with_child(Fragment::text("Hi"))]);
        let xml = data_xml(&model, &ConversionOptions::default()).unwrap();
        assert!(xml.contains(r#"xmlns="http://docbook.org/ns/docbook""#));
        assert!(xml.contains("<para>Hi</para>"));
    }
}
