//! Rendered view → HTML text.
//!
//! Block structure is indented when `pretty` is set; any element that holds
//! text is written on a single line so inline whitespace is preserved.

use crate::view::ViewNode;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Pretty print block structure
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
    /// Emit `data-model-id` style bookkeeping attributes
    pub model_ids: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
            model_ids: true,
        }
    }
}

struct Context<'a> {
    options: &'a RenderOptions,
    depth: usize,
    buffer: String,
}

impl<'a> Context<'a> {
    fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            self.add_indent();
        }
        self.add(text);
        if self.options.pretty {
            self.add("\n");
        }
    }

    fn add_indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(&self.options.indent);
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

/// Render a view tree as HTML.
pub fn render_html(root: &ViewNode, options: &RenderOptions) -> String {
    let mut ctx = Context::new(options);
    render_node(root, &mut ctx);
    ctx.get_output()
}

fn render_node(node: &ViewNode, ctx: &mut Context<'_>) {
    match node {
        ViewNode::Text { content, .. } => ctx.add_line(&escape_html(content)),
        ViewNode::Element { tag, children, .. } => {
            if holds_text(node) {
                let mut line = String::new();
                write_compact(node, ctx.options, &mut line);
                ctx.add_line(&line);
                return;
            }

            let open = open_tag(node, ctx.options);
            if is_self_closing(tag) {
                ctx.add_line(&open);
                return;
            }
            if children.is_empty() {
                ctx.add_line(&format!("{}</{}>", open, tag));
                return;
            }

            ctx.add_line(&open);
            ctx.indent();
            for child in children {
                render_node(child, ctx);
            }
            ctx.dedent();
            ctx.add_line(&format!("</{}>", tag));
        }
    }
}

fn holds_text(node: &ViewNode) -> bool {
    node.children().iter().any(|c| c.tag().is_none())
}

fn write_compact(node: &ViewNode, options: &RenderOptions, out: &mut String) {
    match node {
        ViewNode::Text { content, .. } => out.push_str(&escape_html(content)),
        ViewNode::Element { tag, children, .. } => {
            out.push_str(&open_tag(node, options));
            if is_self_closing(tag) {
                return;
            }
            for child in children {
                write_compact(child, options, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn open_tag(node: &ViewNode, options: &RenderOptions) -> String {
    let mut open = format!("<{}", node.tag().unwrap_or_default());
    for (key, value) in node.attributes().into_iter().flatten() {
        if !options.model_ids && key == "data-model-id" {
            continue;
        }
        open.push_str(&format!(" {}=\"{}\"", key, escape_html(value)));
    }
    open.push('>');
    open
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn is_self_closing(tag: &str) -> bool {
    matches!(tag, "img" | "input" | "br" | "hr" | "wbr")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_content_stays_on_one_line() {
        let tree = ViewNode::element("div").with_child(
            ViewNode::element("p")
                .with_child(ViewNode::text("see "))
                .with_child(
                    ViewNode::element("a")
                        .with_attr("href", "https://example.com/?a=1&b=2")
                        .with_child(ViewNode::text("site")),
                ),
        );

        let html = render_html(&tree, &RenderOptions::default());
        assert_eq!(
            html,
            "<div>\n  <p>see <a href=\"https://example.com/?a=1&amp;b=2\">site</a></p>\n</div>\n"
        );
    }

    #[test]
    fn test_compact_output() {
        let tree = ViewNode::element("ul").with_child(ViewNode::element("li"));
        let options = RenderOptions {
            pretty: false,
            ..RenderOptions::default()
        };
        assert_eq!(render_html(&tree, &options), "<ul><li></li></ul>");
    }
}
