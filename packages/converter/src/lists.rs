//! List items, their containers and anchor relocation.
//!
//! The model keeps list items flat. Downcast gives every item its own
//! container, moves the item's anchor onto that container, then merges
//! neighbouring containers:
//!
//! Both passes fold each container into the preceding one of the same kind
//! unless the two carry different identifiers. A container without an
//! identifier joins its neighbour and the merged container keeps the single
//! identifier, so an item split off an anchored list stays in that list.

use crate::blocks::{apply_common_attributes, common_attributes};
use crate::table::{DowncastContext, Stage};
use crate::upcast::{RecoveryAction, UpcastContext};
use crate::view::ViewNode;
use crate::vocabulary::{html, xml};
use richtext_model::{keys, AttributeValue, Fragment, Node};
use tracing::debug;

pub const BULLETED: &str = "bulleted";
pub const NUMBERED: &str = "numbered";

fn list_type(node: &Node) -> &str {
    match node.attribute_str(keys::LIST_TYPE) {
        Some(NUMBERED) => NUMBERED,
        _ => BULLETED,
    }
}

pub fn list_item(node: &Node, children: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    match ctx.stage {
        Stage::Editing => apply_common_attributes(ViewNode::element(html::LI), node, ctx.stage, false)
            .with_children(children),
        Stage::Data => apply_common_attributes(ViewNode::element(xml::LISTITEM), node, ctx.stage, false)
            .with_child(ViewNode::element(xml::PARA).with_children(children)),
    }
}

/// Container for `first`; `items` are its already converted items.
pub fn list_container(first: &Node, items: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    let tag = match (ctx.stage, list_type(first)) {
        (Stage::Editing, NUMBERED) => html::OL,
        (Stage::Editing, _) => html::UL,
        (Stage::Data, NUMBERED) => xml::ORDEREDLIST,
        (Stage::Data, _) => xml::ITEMIZEDLIST,
    };
    ViewNode::element(tag).with_children(items)
}

/// Move the item's anchor onto its container. The item element itself never
/// carries the identifier.
pub fn relocate_anchor(container: &mut ViewNode, item: &Node) {
    let Some(anchor) = item.anchor() else {
        return;
    };
    for child in container.children_mut().into_iter().flatten() {
        child.remove_attr(html::ID);
    }
    container.set_attr(html::ID, anchor);
    debug!(item = %item.id, anchor, "relocated anchor to list container");
}

pub fn is_container(node: &ViewNode) -> bool {
    matches!(
        node.tag(),
        Some(html::UL) | Some(html::OL) | Some(xml::ITEMIZEDLIST) | Some(xml::ORDEREDLIST)
    )
}

fn can_merge(previous: &ViewNode, next: &ViewNode) -> bool {
    if !is_container(previous) || previous.tag() != next.tag() {
        return false;
    }
    let id = |node: &ViewNode| node.attr(html::ID).filter(|id| !id.is_empty()).map(str::to_owned);
    match (id(previous), id(next)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Merge neighbouring containers of the same kind in a sequence of sibling
/// blocks, preserving item order.
pub fn merge_containers(nodes: Vec<ViewNode>) -> Vec<ViewNode> {
    let mut out: Vec<ViewNode> = Vec::with_capacity(nodes.len());

    for node in nodes {
        let merge = out.last().is_some_and(|previous| can_merge(previous, &node));
        if !merge {
            out.push(node);
            continue;
        }

        let Some(previous) = out.last_mut() else {
            continue;
        };
        if previous.attr(html::ID).map_or(true, str::is_empty) {
            if let Some(id) = node.attr(html::ID).filter(|id| !id.is_empty()) {
                previous.set_attr(html::ID, id);
            }
        }
        if let (Some(into), ViewNode::Element { children, .. }) = (previous.children_mut(), node) {
            into.extend(children);
        }
    }

    out
}

// ---- upcast ------------------------------------------------------------

pub fn upcast_list(element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    let kind = if element.is_tag(xml::ORDEREDLIST) { NUMBERED } else { BULLETED };
    let container_anchor = element
        .attr(xml::ID)
        .or_else(|| element.attr(xml::XML_ID))
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    let mut items = Vec::new();
    for child in element.children() {
        match child {
            ViewNode::Text { content, .. } if content.trim().is_empty() => {}
            ViewNode::Element { tag, .. } if tag == xml::LISTITEM => {
                items.extend(upcast_list_item(child, kind, ctx));
            }
            ViewNode::Element { tag, .. } if tag == xml::ITEMIZEDLIST || tag == xml::ORDEREDLIST => {
                ctx.recover(tag, RecoveryAction::Unwrapped, "list directly inside a list");
                items.extend(upcast_list(child, ctx));
            }
            other => {
                let name = other.tag().unwrap_or("#text").to_string();
                ctx.recover(&name, RecoveryAction::Dropped, "unexpected content in a list");
            }
        }
    }

    if let Some(anchor) = container_anchor {
        for item in &mut items {
            item.attributes
                .entry(keys::ANCHOR.to_string())
                .or_insert_with(|| AttributeValue::from(anchor.as_str()));
        }
    }

    items
}

fn upcast_list_item(element: &ViewNode, kind: &str, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    let mut base = common_attributes(element);
    // Items never own the identifier; the container's wins below
    base.remove(keys::ANCHOR);

    let new_item = |children: Vec<Fragment>| {
        let mut item = Fragment::list_item(kind);
        item.attributes.extend(base.clone());
        item.children = children;
        item
    };

    let mut out = Vec::new();
    let mut stray = Vec::new();
    let mut paras = 0;

    for child in element.children() {
        match child.tag() {
            Some(xml::PARA) => {
                paras += 1;
                if paras > 1 {
                    ctx.recover(xml::LISTITEM, RecoveryAction::Unwrapped, "list item with several paragraphs");
                }
                let content = ctx.upcast_inline(child.children());
                out.push(new_item(content));
            }
            Some(tag @ (xml::ITEMIZEDLIST | xml::ORDEREDLIST)) => {
                ctx.recover(tag, RecoveryAction::Unwrapped, "nested list flattened");
                out.extend(upcast_list(child, ctx));
            }
            _ => stray.push(child.clone()),
        }
    }

    let has_content = stray
        .iter()
        .any(|n| n.tag().is_some() || !n.text_content().trim().is_empty());
    if has_content {
        ctx.recover(xml::LISTITEM, RecoveryAction::Wrapped, "inline content outside a paragraph");
        let content = ctx.upcast_inline(&stray);
        out.push(new_item(content));
    }

    if out.is_empty() {
        out.push(new_item(Vec::new()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(tag: &str, id: Option<&str>, items: &[&str]) -> ViewNode {
        let mut node = ViewNode::element(tag)
            .with_children(items.iter().map(|t| ViewNode::element("li").with_child(ViewNode::text(*t))).collect());
        if let Some(id) = id {
            node.set_attr("id", id);
        }
        node
    }

    #[test]
    fn test_same_anchor_merges() {
        let merged = merge_containers(vec![container("ul", Some("a"), &["one"]), container("ul", Some("a"), &["two"])]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].attr("id"), Some("a"));
        assert_eq!(merged[0].text_content(), "onetwo");
    }

    #[test]
    fn test_unanchored_neighbour_is_absorbed() {
        let merged = merge_containers(vec![
            container("ol", Some("a"), &["one"]),
            container("ol", None, &["middle"]),
            container("ol", Some("a"), &["two"]),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].attr("id"), Some("a"));
        assert_eq!(merged[0].text_content(), "onemiddletwo");
    }

    #[test]
    fn test_unanchored_container_takes_following_anchor() {
        let merged = merge_containers(vec![container("ul", None, &["one"]), container("ul", Some("a"), &["two"])]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].attr("id"), Some("a"));
    }

    #[test]
    fn test_anchored_run_stays_apart_from_other_anchor() {
        let merged = merge_containers(vec![
            container("ul", Some("a"), &["one"]),
            container("ul", None, &["two"]),
            container("ul", Some("b"), &["three"]),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].attr("id"), Some("a"));
        assert_eq!(merged[0].text_content(), "onetwo");
        assert_eq!(merged[1].attr("id"), Some("b"));
    }

    #[test]
    fn test_different_anchors_never_merge() {
        let merged = merge_containers(vec![container("ul", Some("a"), &["one"]), container("ul", Some("b"), &["two"])]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_kinds_do_not_mix() {
        let merged = merge_containers(vec![container("ul", None, &["one"]), container("ol", None, &["two"])]);
        assert_eq!(merged.len(), 2);
    }
}
