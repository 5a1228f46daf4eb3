//! Keeps embed previews in the rendered view in step with their cache
//! attributes, and tells the host where to attach the actions menu.

use crate::events::EmbedMenuRequest;
use crate::pipeline::Pipeline;
use richtext_converter::embed::{attachment_points, preview, PREVIEW_CLASS};
use richtext_converter::{DowncastContext, ViewNode};
use richtext_model::{keys, ChangeBatch, Model, Node, NodeId};
use tracing::debug;

#[derive(Debug, Default)]
pub struct EmbedSynchronizer;

impl EmbedSynchronizer {
    pub fn new() -> Self {
        Self
    }

    /// Attached embeds whose cache attributes were written by `batches`.
    pub fn changed_embeds(&self, model: &Model, batches: &[ChangeBatch]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for (node, key) in batches.iter().flat_map(|b| b.attribute_changes()) {
            if !keys::EMBED_CACHE.contains(&key) || out.contains(&node) || !model.is_attached(node) {
                continue;
            }
            if model.get(node).is_some_and(|n| n.kind.is_embed()) {
                out.push(node);
            }
        }
        out
    }

    /// Rebuild the previews of changed embeds and describe the menus to attach.
    pub fn synchronize(&self, model: &Model, pipeline: &mut Pipeline, batches: &[ChangeBatch]) -> Vec<EmbedMenuRequest> {
        let ctx = pipeline.context();
        let mut requests = Vec::new();

        for id in self.changed_embeds(model, batches) {
            let Some(node) = model.get(id) else {
                continue;
            };
            if let Some(element) = pipeline.view_mut().and_then(|view| view.find_by_model_mut(id)) {
                replace_preview(element, node, &ctx);
                debug!(node = %id, "embed preview refreshed");
            }
            requests.push(menu_request(node));
        }
        requests
    }
}

fn replace_preview(element: &mut ViewNode, node: &Node, ctx: &DowncastContext) {
    let Some(children) = element.children_mut() else {
        return;
    };
    let fresh = preview(node, ctx);
    match children.iter().position(|c| c.is_ui() && c.has_class(PREVIEW_CLASS)) {
        Some(index) => children[index] = fresh,
        None => children.push(fresh),
    }
}

fn menu_request(node: &Node) -> EmbedMenuRequest {
    EmbedMenuRequest {
        node: node.id,
        external_id: node.attribute_str(keys::EXTERNAL_ID).unwrap_or_default().to_string(),
        location_id: node.attribute_str(keys::LOCATION_ID).map(str::to_string),
        language_codes: node
            .attribute(keys::LANGUAGE_CODES)
            .and_then(|v| v.as_list())
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        attachment_points: attachment_points(node.id),
    }
}
