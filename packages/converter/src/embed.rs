//! Embed reference nodes.
//!
//! The persisted form carries only the reference (`scheme://id`) and the
//! view discriminator. The rendered form adds a UI preview built from the
//! node's cache attributes; the preview is rebuilt from scratch every time
//! those attributes change.

use crate::blocks::{apply_common_attributes, common_attributes};
use crate::table::{DowncastContext, Stage};
use crate::upcast::{RecoveryAction, UpcastContext};
use crate::view::ViewNode;
use crate::vocabulary::{html, xml, IMAGE_EMBED_CLASS};
use richtext_model::{keys, AttributeValue, Fragment, Node, NodeId};

pub const PREVIEW_CLASS: &str = "ibexa-embed-content";
pub const TITLE_CLASS: &str = "ibexa-embed-content__title";
pub const ACTIONS_TRIGGER_CLASS: &str = "ibexa-embedded-item__actions-menu-trigger-btn";
pub const ACTIONS_CONTAINER_CLASS: &str = "ibexa-embedded-item-actions";
pub const EMBED_CLASS: &str = "ibexa-embed";
pub const ICON_NAME: &str = "embed";

/// Render `id` as a reference URI.
pub fn format_reference(scheme: &str, id: &str) -> String {
    format!("{}://{}", scheme, id)
}

/// Extract the external id from a reference URI with the given scheme.
pub fn parse_reference<'a>(href: &'a str, scheme: &str) -> Option<&'a str> {
    href.strip_prefix(scheme)?
        .strip_prefix("://")
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// The UI preview fragment: icon, display name, actions trigger and the
/// container the actions menu attaches to.
pub fn preview(node: &Node, ctx: &DowncastContext) -> ViewNode {
    let display_name = node.attribute_str(keys::DISPLAY_NAME).unwrap_or_default();

    let icon = ViewNode::ui_element("svg")
        .with_attr(html::CLASS, "ibexa-icon ibexa-icon--medium")
        .with_child(
            ViewNode::ui_element("use")
                .with_attr("xlink:href", format!("{}#{}", ctx.options.icon_sprite, ICON_NAME)),
        );

    let mut title = ViewNode::ui_element(html::SPAN)
        .with_attr(html::CLASS, TITLE_CLASS)
        .with_attr("data-ibexa-update-source-data-path", "Content.Name");
    if !display_name.is_empty() {
        if let Some(id) = node.attribute_str(keys::EXTERNAL_ID) {
            title.set_attr("data-ibexa-update-content-id", id);
        }
        title = title.with_child(ViewNode::text(display_name));
    }

    let trigger = ViewNode::ui_element(html::SPAN).with_child(
        ViewNode::ui_element("button")
            .with_attr("type", "button")
            .with_attr(html::CLASS, format!("btn ibexa-btn ibexa-btn--ghost ibexa-btn--no-text {}", ACTIONS_TRIGGER_CLASS)),
    );

    let actions = ViewNode::ui_element(html::DIV).with_attr(html::CLASS, ACTIONS_CONTAINER_CLASS);

    ViewNode::ui_element(html::SPAN)
        .with_attr(html::CLASS, PREVIEW_CLASS)
        .with_children(vec![icon, title, trigger, actions])
}

/// Selectors identifying where the actions menu attaches for `node`.
pub fn attachment_points(node: NodeId) -> Vec<String> {
    vec![
        format!("[data-model-id=\"{}\"] .{}", node, ACTIONS_CONTAINER_CLASS),
        format!("[data-model-id=\"{}\"] .{}", node, ACTIONS_TRIGGER_CLASS),
    ]
}

fn reference(node: &Node, ctx: &DowncastContext) -> String {
    let id = node.attribute_str(keys::EXTERNAL_ID).unwrap_or_default();
    format_reference(&ctx.options.reference_scheme, id)
}

pub fn embed_block(node: &Node, _children: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    match ctx.stage {
        Stage::Editing => {
            let element = ViewNode::element(html::DIV)
                .with_attr(html::ELEMENT, xml::EMBED)
                .with_attr(html::VIEW, xml::VIEW_EMBED)
                .with_attr(html::CLASS, EMBED_CLASS)
                .with_attr("data-model-id", node.id.to_string());
            apply_common_attributes(element, node, ctx.stage, true).with_child(preview(node, ctx))
        }
        Stage::Data => {
            let element = ViewNode::element(xml::EMBED)
                .with_attr(xml::HREF, reference(node, ctx))
                .with_attr(xml::VIEW, xml::VIEW_EMBED);
            let mut element = apply_common_attributes(element, node, ctx.stage, true);
            if let Some(link) = embed_link(node) {
                element = element.with_child(link);
            }
            element
        }
    }
}

pub fn embed_inline(node: &Node, _children: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    match ctx.stage {
        Stage::Editing => {
            let element = ViewNode::element(html::SPAN)
                .with_attr(html::ELEMENT, xml::EMBED_INLINE)
                .with_attr(html::VIEW, xml::VIEW_EMBED_INLINE)
                .with_attr(html::CLASS, EMBED_CLASS)
                .with_attr("data-model-id", node.id.to_string());
            apply_common_attributes(element, node, ctx.stage, true).with_child(preview(node, ctx))
        }
        Stage::Data => {
            let element = ViewNode::element(xml::EMBED_INLINE)
                .with_attr(xml::HREF, reference(node, ctx))
                .with_attr(xml::VIEW, xml::VIEW_EMBED_INLINE);
            apply_common_attributes(element, node, ctx.stage, true)
        }
    }
}

/// `ezlink` child for block embeds carrying a link.
fn embed_link(node: &Node) -> Option<ViewNode> {
    let href = node.attribute_str(keys::LINK_HREF).filter(|h| !h.is_empty())?;
    let mut link = ViewNode::element(xml::EMBED_LINK).with_attr(xml::HREF, href);
    for (key, xml_key) in [
        (keys::LINK_TITLE, xml::LINK_TITLE),
        (keys::LINK_TARGET, xml::TARGET),
        (keys::LINK_CLASSES, xml::CLASS),
    ] {
        if let Some(value) = node.attribute_str(key).filter(|v| !v.is_empty()) {
            link.set_attr(xml_key, value);
        }
    }
    Some(link)
}

// ---- upcast ------------------------------------------------------------

fn embed_attributes(element: &ViewNode, external_id: &str) -> richtext_model::Attributes {
    let mut attributes = common_attributes(element);
    attributes.insert(keys::EXTERNAL_ID.to_string(), AttributeValue::from(external_id));
    attributes
}

pub fn upcast_embed_block(element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    let scheme = ctx.options().reference_scheme.clone();
    let Some(id) = element.attr(xml::HREF).and_then(|h| parse_reference(h, &scheme)) else {
        ctx.recover(xml::EMBED, RecoveryAction::Dropped, "embed without a valid reference");
        return Vec::new();
    };

    let mut fragment = Fragment::embed_block(id);
    fragment.attributes = embed_attributes(element, id);

    if let Some(link) = element.child_elements().find(|c| c.is_tag(xml::EMBED_LINK)) {
        for (xml_key, key) in [
            (xml::HREF, keys::LINK_HREF),
            (xml::LINK_TITLE, keys::LINK_TITLE),
            (xml::TARGET, keys::LINK_TARGET),
            (xml::CLASS, keys::LINK_CLASSES),
        ] {
            if let Some(value) = link.attr(xml_key).filter(|v| !v.is_empty()) {
                fragment.attributes.insert(key.to_string(), AttributeValue::from(value));
            }
        }
    }

    vec![fragment]
}

/// Inline embed, or `None` when the element is recovered by dropping it.
pub fn upcast_embed_inline(element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Option<Fragment> {
    if element.has_class(IMAGE_EMBED_CLASS) {
        ctx.recover(xml::EMBED_INLINE, RecoveryAction::Dropped, "image embeds are not supported inline");
        return None;
    }

    let scheme = ctx.options().reference_scheme.clone();
    let Some(id) = element.attr(xml::HREF).and_then(|h| parse_reference(h, &scheme)) else {
        ctx.recover(xml::EMBED_INLINE, RecoveryAction::Dropped, "embed without a valid reference");
        return None;
    };

    let mut fragment = Fragment::embed_inline(id);
    fragment.attributes = embed_attributes(element, id);
    Some(fragment)
}
