//! Persisted form reader and writer.
//!
//! The reader keeps every text node verbatim (no global trimming); upcast
//! decides which whitespace is formatting. Only XML syntax errors fail here.

use crate::error::{ConvertError, ConvertResult};
use crate::view::ViewNode;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str;

pub const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Parse a persisted document into an element tree rooted at its document element.
pub fn parse_xml(source: &str) -> ConvertResult<ViewNode> {
    let mut reader = Reader::from_str(source);

    let mut stack: Vec<ViewNode> = Vec::new();
    let mut root: Option<ViewNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from(&e)?),

            Event::Empty(e) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element)?;
            }

            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ConvertError::Malformed("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }

            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                push_text(&mut stack, text);
            }

            Event::CData(c) => {
                let text = str::from_utf8(&c)?.to_string();
                push_text(&mut stack, text);
            }

            Event::Eof => break,

            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConvertError::Malformed(format!(
            "unclosed element <{}>",
            open.tag().unwrap_or_default()
        )));
    }

    root.ok_or_else(|| ConvertError::Malformed("document has no root element".to_string()))
}

fn element_from(e: &BytesStart<'_>) -> ConvertResult<ViewNode> {
    let tag = str::from_utf8(e.name().as_ref())?.to_string();
    let mut element = ViewNode::element(tag);
    for attribute in e.attributes() {
        let attribute = attribute?;
        let key = str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        element.set_attr(key, value);
    }
    Ok(element)
}

fn attach(stack: &mut [ViewNode], root: &mut Option<ViewNode>, element: ViewNode) -> ConvertResult<()> {
    match stack.last_mut().and_then(ViewNode::children_mut) {
        Some(children) => children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(ConvertError::Malformed(
                "more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

fn push_text(stack: &mut [ViewNode], text: String) {
    // Text outside the document element is ignorable
    let Some(children) = stack.last_mut().and_then(ViewNode::children_mut) else {
        return;
    };
    if let Some(ViewNode::Text { content, .. }) = children.last_mut() {
        content.push_str(&text);
    } else {
        children.push(ViewNode::text(text));
    }
}

/// Serialize an element tree with an XML declaration. Output is compact so
/// inline whitespace survives a round trip.
pub fn write_xml(root: &ViewNode) -> String {
    let mut out = String::from(DECLARATION);
    out.push('\n');
    write_node(root, &mut out);
    out.push('\n');
    out
}

fn write_node(node: &ViewNode, out: &mut String) {
    match node {
        ViewNode::Text { content, .. } => out.push_str(&quick_xml::escape::escape(content.as_str())),
        ViewNode::Element { tag, attributes, children, .. } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&quick_xml::escape::escape(value.as_str()));
                out.push('"');
            }
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
