//! Text runs and their style/link wrappers.
//!
//! Downcast wraps a run from the outside in: link, bold, italic, underline,
//! then super/subscript. Adjacent wrappers with identical attributes are
//! merged afterwards so a link spanning differently styled runs renders as
//! one element.

use crate::embed;
use crate::table::{DowncastContext, Stage};
use crate::upcast::{RecoveryAction, UpcastContext};
use crate::view::ViewNode;
use crate::vocabulary::{html, xml};
use richtext_model::{keys, AttributeValue, Attributes, Fragment, Node};

/// Persisted tags that carry inline content.
pub fn is_inline_tag(tag: &str) -> bool {
    matches!(
        tag,
        xml::LINK | xml::EMPHASIS | xml::SUPERSCRIPT | xml::SUBSCRIPT | xml::EMBED_INLINE
    )
}

fn is_wrapper_tag(tag: &str) -> bool {
    matches!(
        tag,
        html::A | html::STRONG | html::EM | html::U | html::SUP | html::SUB
    ) || matches!(tag, xml::LINK | xml::EMPHASIS | xml::SUPERSCRIPT | xml::SUBSCRIPT)
}

fn flag(node: &Node, key: &str) -> bool {
    node.attribute_str(key).is_some_and(|v| !v.is_empty() && v != "false")
}

pub fn text_run(node: &Node, _children: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    let mut current = ViewNode::text(node.data.clone()).with_model(node.id);

    let styles: [(&str, &str, Option<&str>); 5] = match ctx.stage {
        Stage::Editing => [
            (keys::SUBSCRIPT, html::SUB, None),
            (keys::SUPERSCRIPT, html::SUP, None),
            (keys::UNDERLINE, html::U, None),
            (keys::ITALIC, html::EM, None),
            (keys::BOLD, html::STRONG, None),
        ],
        Stage::Data => [
            (keys::SUBSCRIPT, xml::SUBSCRIPT, None),
            (keys::SUPERSCRIPT, xml::SUPERSCRIPT, None),
            (keys::UNDERLINE, xml::EMPHASIS, Some(xml::ROLE_UNDERLINED)),
            (keys::ITALIC, xml::EMPHASIS, None),
            (keys::BOLD, xml::EMPHASIS, Some(xml::ROLE_STRONG)),
        ],
    };

    for (key, tag, role) in styles {
        if flag(node, key) {
            let mut wrapper = ViewNode::element(tag);
            if let Some(role) = role {
                wrapper.set_attr(xml::ROLE, role);
            }
            current = wrapper.with_child(current);
        }
    }

    match node.attribute_str(keys::LINK_HREF).filter(|h| !h.is_empty()) {
        Some(href) => link_wrapper(node, href, ctx.stage).with_child(current),
        None => current,
    }
}

fn link_wrapper(node: &Node, href: &str, stage: Stage) -> ViewNode {
    let (tag, href_key, title_key, target_key, class_key, prefix) = match stage {
        Stage::Editing => (
            html::A,
            html::HREF,
            html::TITLE,
            html::TARGET,
            html::CLASS,
            html::CUSTOM_ATTRIBUTE_PREFIX,
        ),
        Stage::Data => (
            xml::LINK,
            xml::HREF,
            xml::LINK_TITLE,
            xml::TARGET,
            xml::CLASS,
            xml::CUSTOM_ATTRIBUTE_PREFIX,
        ),
    };

    let mut link = ViewNode::element(tag).with_attr(href_key, href);
    let optional = [
        (keys::LINK_TITLE, title_key),
        (keys::LINK_TARGET, target_key),
        (keys::LINK_CLASSES, class_key),
    ];
    for (key, view_key) in optional {
        if let Some(value) = node.attribute_str(key).filter(|v| !v.is_empty()) {
            link.set_attr(view_key, value);
        }
    }
    for (key, value) in &node.attributes {
        if let Some(name) = key.strip_prefix(keys::LINK_ATTRIBUTE_PREFIX) {
            link.set_attr(format!("{}{}", prefix, name), value.to_string());
        }
    }
    link
}

/// Merge adjacent wrapper elements that carry identical attributes.
pub fn merge_adjacent(nodes: Vec<ViewNode>) -> Vec<ViewNode> {
    let mut out: Vec<ViewNode> = Vec::with_capacity(nodes.len());

    for node in nodes {
        let mergeable = match (out.last(), &node) {
            (
                Some(ViewNode::Element { tag: a, attributes: attrs_a, ui: false, .. }),
                ViewNode::Element { tag: b, attributes: attrs_b, ui: false, .. },
            ) => a == b && attrs_a == attrs_b && is_wrapper_tag(a),
            _ => false,
        };

        if !mergeable {
            out.push(node);
            continue;
        }

        if let (Some(ViewNode::Element { children: into, .. }), ViewNode::Element { children, .. }) =
            (out.last_mut(), node)
        {
            into.extend(children);
            let merged = merge_adjacent(std::mem::take(into));
            *into = merged;
        }
    }

    out
}

/// Convert persisted inline content. `inherited` holds the text attributes
/// accumulated from enclosing wrappers.
pub fn upcast_inline(nodes: &[ViewNode], inherited: &Attributes, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    let mut out = Vec::new();

    for node in nodes {
        match node {
            ViewNode::Text { content, .. } => {
                if !content.is_empty() {
                    let mut run = Fragment::text(content.clone());
                    run.attributes = inherited.clone();
                    out.push(run);
                }
            }
            ViewNode::Element { tag, children, .. } => match tag.as_str() {
                xml::LINK => {
                    let attributes = link_attributes(node, inherited);
                    out.extend(upcast_inline(children, &attributes, ctx));
                }
                xml::EMPHASIS => {
                    let key = match node.attr(xml::ROLE) {
                        Some(xml::ROLE_STRONG) => keys::BOLD,
                        Some(xml::ROLE_UNDERLINED) => keys::UNDERLINE,
                        _ => keys::ITALIC,
                    };
                    out.extend(upcast_inline(children, &with_flag(inherited, key), ctx));
                }
                xml::SUPERSCRIPT => {
                    out.extend(upcast_inline(children, &with_flag(inherited, keys::SUPERSCRIPT), ctx));
                }
                xml::SUBSCRIPT => {
                    out.extend(upcast_inline(children, &with_flag(inherited, keys::SUBSCRIPT), ctx));
                }
                xml::EMBED_INLINE => {
                    if let Some(embed) = embed::upcast_embed_inline(node, ctx) {
                        out.push(embed);
                    }
                }
                other => {
                    if children.is_empty() {
                        ctx.recover(other, RecoveryAction::Dropped, "empty unknown inline element");
                    } else {
                        ctx.recover(other, RecoveryAction::Unwrapped, "unknown inline element");
                        out.extend(upcast_inline(children, inherited, ctx));
                    }
                }
            },
        }
    }

    merge_runs(out)
}

fn with_flag(inherited: &Attributes, key: &str) -> Attributes {
    let mut attributes = inherited.clone();
    attributes.insert(key.to_string(), AttributeValue::from("true"));
    attributes
}

fn link_attributes(element: &ViewNode, inherited: &Attributes) -> Attributes {
    let mut attributes = inherited.clone();
    let mapping = [
        (xml::HREF, keys::LINK_HREF),
        (xml::LINK_TITLE, keys::LINK_TITLE),
        (xml::TARGET, keys::LINK_TARGET),
        (xml::CLASS, keys::LINK_CLASSES),
    ];
    for (xml_key, key) in mapping {
        if let Some(value) = element.attr(xml_key).filter(|v| !v.is_empty()) {
            attributes.insert(key.to_string(), AttributeValue::from(value));
        }
    }
    for (key, value) in element.attributes().into_iter().flatten() {
        if let Some(name) = key.strip_prefix(xml::CUSTOM_ATTRIBUTE_PREFIX) {
            attributes.insert(keys::link_attribute(name), AttributeValue::from(value.as_str()));
        }
    }
    attributes
}

/// Adjacent runs with identical attributes become one run.
fn merge_runs(fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut out: Vec<Fragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if let Some(last) = out.last_mut() {
            if last.kind == fragment.kind
                && fragment.kind == richtext_model::NodeKind::InlineTextRun
                && last.attributes == fragment.attributes
            {
                last.data.push_str(&fragment.data);
                continue;
            }
        }
        out.push(fragment);
    }
    out
}
