//! Block-level cells: root, paragraphs/headings/formatted, custom tags, and
//! the reserved block attributes shared by every block-like element.

use crate::table::{DowncastContext, Stage};
use crate::upcast::{RecoveryAction, UpcastContext};
use crate::view::ViewNode;
use crate::vocabulary::{html, xml};
use richtext_model::{keys, names, AttributeValue, Attributes, Fragment, Node, NodeKind};

/// Copy `anchor`, `custom-classes` and `custom-attribute:*` onto an element.
/// List items never carry the identifier, so `with_id` is false for them.
pub fn apply_common_attributes(mut element: ViewNode, node: &Node, stage: Stage, with_id: bool) -> ViewNode {
    let (id_key, class_key, custom_prefix) = match stage {
        Stage::Editing => (html::ID, html::CLASS, html::CUSTOM_ATTRIBUTE_PREFIX),
        Stage::Data => (xml::ID, xml::CLASS, xml::CUSTOM_ATTRIBUTE_PREFIX),
    };

    if with_id {
        if let Some(anchor) = node.anchor() {
            element.set_attr(id_key, anchor);
        }
    }

    if let Some(classes) = node.attribute_str(keys::CUSTOM_CLASSES).filter(|c| !c.is_empty()) {
        let merged = match element.attr(class_key) {
            Some(existing) => format!("{} {}", existing, classes),
            None => classes.to_string(),
        };
        element.set_attr(class_key, merged);
    }

    for (key, value) in &node.attributes {
        if let Some(name) = key.strip_prefix(keys::CUSTOM_ATTRIBUTE_PREFIX) {
            element.set_attr(format!("{}{}", custom_prefix, name), value.to_string());
        }
    }

    element
}

/// Inverse of [`apply_common_attributes`] for persisted elements.
pub fn common_attributes(element: &ViewNode) -> Attributes {
    let mut attributes = Attributes::new();

    let anchor = element
        .attr(xml::ID)
        .or_else(|| element.attr(xml::XML_ID))
        .filter(|a| !a.is_empty());
    if let Some(anchor) = anchor {
        attributes.insert(keys::ANCHOR.to_string(), AttributeValue::from(anchor));
    }

    if let Some(classes) = element.attr(xml::CLASS).filter(|c| !c.trim().is_empty()) {
        attributes.insert(keys::CUSTOM_CLASSES.to_string(), AttributeValue::from(classes));
    }

    for (key, value) in element.attributes().into_iter().flatten() {
        if let Some(name) = key.strip_prefix(xml::CUSTOM_ATTRIBUTE_PREFIX) {
            attributes.insert(keys::custom_attribute(name), AttributeValue::from(value.as_str()));
        }
    }

    attributes
}

fn heading_level(node: &Node) -> u8 {
    node.attribute_str(keys::HEADING_LEVEL)
        .and_then(|l| l.parse::<u8>().ok())
        .unwrap_or(1)
        .clamp(1, 6)
}

pub fn root(_node: &Node, children: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    match ctx.stage {
        Stage::Editing => ViewNode::element(html::ROOT)
            .with_attr(html::ROOT_MARKER, "true")
            .with_children(children),
        Stage::Data => {
            let mut section = ViewNode::element(xml::SECTION);
            for (key, value) in xml::NAMESPACES {
                section.set_attr(key, value);
            }
            section.with_children(children)
        }
    }
}

pub fn block(node: &Node, children: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    let element = match (ctx.stage, node.name.as_str()) {
        (Stage::Editing, names::HEADING) => ViewNode::element(html::heading(heading_level(node))),
        (Stage::Editing, names::FORMATTED) => ViewNode::element(html::PRE),
        (Stage::Editing, _) => ViewNode::element(html::P),
        (Stage::Data, names::HEADING) => {
            ViewNode::element(xml::TITLE).with_attr(xml::LEVEL, heading_level(node).to_string())
        }
        (Stage::Data, names::FORMATTED) => ViewNode::element(xml::PROGRAMLISTING),
        (Stage::Data, _) => ViewNode::element(xml::PARA),
    };

    apply_common_attributes(element, node, ctx.stage, true).with_children(children)
}

pub fn custom_tag(node: &Node, children: Vec<ViewNode>, ctx: &DowncastContext) -> ViewNode {
    let name = node.attribute_str(keys::CUSTOM_TAG_NAME).unwrap_or_default();
    let params: Vec<(&str, String)> = node
        .attributes
        .iter()
        .filter_map(|(k, v)| Some((k.strip_prefix(keys::CUSTOM_TAG_PARAM_PREFIX)?, v.to_string())))
        .collect();

    let element = match ctx.stage {
        Stage::Editing => {
            let mut element = ViewNode::element(html::DIV)
                .with_attr(html::ELEMENT, xml::TEMPLATE)
                .with_attr(html::TEMPLATE_NAME, name)
                .with_child(
                    ViewNode::element(html::DIV)
                        .with_attr(html::ELEMENT, xml::TEMPLATE_CONTENT)
                        .with_children(children),
                );
            if !params.is_empty() {
                let values = params.into_iter().map(|(key, value)| {
                    ViewNode::element(html::SPAN)
                        .with_attr(html::ELEMENT, xml::TEMPLATE_VALUE)
                        .with_attr(html::TEMPLATE_VALUE_KEY, key)
                        .with_child(ViewNode::text(value))
                });
                element = element.with_child(
                    ViewNode::element(html::SPAN)
                        .with_attr(html::ELEMENT, xml::TEMPLATE_CONFIG)
                        .with_children(values.collect()),
                );
            }
            element
        }
        Stage::Data => {
            let mut element = ViewNode::element(xml::TEMPLATE)
                .with_attr(xml::NAME, name)
                .with_child(ViewNode::element(xml::TEMPLATE_CONTENT).with_children(children));
            if !params.is_empty() {
                let values = params.into_iter().map(|(key, value)| {
                    ViewNode::element(xml::TEMPLATE_VALUE)
                        .with_attr(xml::KEY, key)
                        .with_child(ViewNode::text(value))
                });
                element = element.with_child(ViewNode::element(xml::TEMPLATE_CONFIG).with_children(values.collect()));
            }
            element
        }
    };

    apply_common_attributes(element, node, ctx.stage, true)
}

// ---- upcast ------------------------------------------------------------

fn text_block(name: &str, element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Fragment {
    let mut fragment = Fragment::element(NodeKind::Block, name);
    fragment.attributes = common_attributes(element);
    fragment.children = ctx.upcast_inline(element.children());
    fragment
}

pub fn upcast_para(element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    vec![text_block(names::PARAGRAPH, element, ctx)]
}

pub fn upcast_title(element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    let level = element
        .attr(xml::LEVEL)
        .and_then(|l| l.trim().parse::<u8>().ok())
        .unwrap_or(1)
        .clamp(1, 6);
    let fragment = text_block(names::HEADING, element, ctx).with_attr(keys::HEADING_LEVEL, level.to_string());
    vec![fragment]
}

pub fn upcast_programlisting(element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    vec![text_block(names::FORMATTED, element, ctx)]
}

pub fn upcast_template(element: &ViewNode, ctx: &mut UpcastContext<'_>) -> Vec<Fragment> {
    let Some(name) = element.attr(xml::NAME).filter(|n| !n.is_empty()) else {
        ctx.recover(xml::TEMPLATE, RecoveryAction::Unwrapped, "custom tag without a name");
        let content: Vec<ViewNode> = element
            .children()
            .iter()
            .filter(|c| c.is_tag(xml::TEMPLATE_CONTENT))
            .flat_map(|c| c.children().to_vec())
            .collect();
        return ctx.upcast_blocks(&content);
    };

    let mut fragment = Fragment::element(NodeKind::CustomTag, names::CUSTOM_TAG);
    fragment.attributes = common_attributes(element);
    fragment
        .attributes
        .insert(keys::CUSTOM_TAG_NAME.to_string(), AttributeValue::from(name));

    for child in element.child_elements() {
        match child.tag() {
            Some(xml::TEMPLATE_CONTENT) => {
                let blocks = ctx.upcast_blocks(child.children());
                fragment.children.extend(blocks);
            }
            Some(xml::TEMPLATE_CONFIG) => {
                for value in child.child_elements().filter(|v| v.is_tag(xml::TEMPLATE_VALUE)) {
                    if let Some(key) = value.attr(xml::KEY) {
                        fragment.attributes.insert(
                            format!("{}{}", keys::CUSTOM_TAG_PARAM_PREFIX, key),
                            AttributeValue::from(value.text_content()),
                        );
                    }
                }
            }
            Some(other) => {
                let other = other.to_string();
                ctx.recover(&other, RecoveryAction::Dropped, "unexpected element in custom tag");
            }
            None => {}
        }
    }

    vec![fragment]
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_model::NodeId;

    fn node(kind: NodeKind, name: &str, attributes: &[(&str, &str)]) -> Node {
        Node {
            id: NodeId(1),
            kind,
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), AttributeValue::from(*v)))
                .collect(),
            children: Vec::new(),
            parent: None,
            data: String::new(),
        }
    }

    #[test]
    fn test_heading_cells() {
        let heading = node(NodeKind::Block, names::HEADING, &[(keys::HEADING_LEVEL, "3"), (keys::ANCHOR, "top")]);

        let view = block(&heading, vec![], &DowncastContext::editing());
        assert_eq!(view.tag(), Some("h3"));
        assert_eq!(view.attr("id"), Some("top"));

        let data = block(&heading, vec![], &DowncastContext::data());
        assert_eq!(data.tag(), Some("title"));
        assert_eq!(data.attr("ezxhtml:level"), Some("3"));
        assert_eq!(data.attr("id"), Some("top"));
    }

    #[test]
    fn test_custom_attributes_and_classes() {
        let paragraph = node(
            NodeKind::Block,
            names::PARAGRAPH,
            &[(keys::CUSTOM_CLASSES, "lead note"), ("custom-attribute:data-level", "2")],
        );

        let view = block(&paragraph, vec![], &DowncastContext::editing());
        assert_eq!(view.attr("class"), Some("lead note"));
        assert_eq!(view.attr("data-ezattribute-data-level"), Some("2"));

        let data = block(&paragraph, vec![], &DowncastContext::data());
        assert_eq!(data.attr("ezxhtml:class"), Some("lead note"));
        assert_eq!(data.attr("ezattribute:data-level"), Some("2"));

        let back = common_attributes(&data);
        assert_eq!(back, paragraph.attributes);
    }

    #[test]
    fn test_custom_tag_data_shape() {
        let tag = node(
            NodeKind::CustomTag,
            names::CUSTOM_TAG,
            &[(keys::CUSTOM_TAG_NAME, "factbox"), ("customTagParam:title", "Facts")],
        );

        let data = custom_tag(&tag, vec![ViewNode::element("para")], &DowncastContext::data());
        assert_eq!(data.tag(), Some("eztemplate"));
        assert_eq!(data.attr("name"), Some("factbox"));
        assert!(data.children()[0].is_tag("ezcontent"));
        let value = data.find(&|n: &ViewNode| n.is_tag("ezvalue")).unwrap();
        assert_eq!(value.attr("key"), Some("title"));
        assert_eq!(value.text_content(), "Facts");
    }
}
