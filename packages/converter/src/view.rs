use richtext_model::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Element tree produced by downcast and read by upcast.
///
/// The same shape serves both the rendered view and the persisted document;
/// only the vocabulary differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewNode {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<ViewNode>,
        /// Model node this element was produced from
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<NodeId>,
        /// UI-only subtree (embed previews). Replaced wholesale, never upcast.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        ui: bool,
    },

    Text {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<NodeId>,
    },
}

impl ViewNode {
    pub fn element(tag: impl Into<String>) -> Self {
        ViewNode::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            model: None,
            ui: false,
        }
    }

    pub fn ui_element(tag: impl Into<String>) -> Self {
        Self::element(tag).as_ui()
    }

    pub fn text(content: impl Into<String>) -> Self {
        ViewNode::Text {
            content: content.into(),
            model: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: ViewNode) -> Self {
        if let ViewNode::Element { ref mut children, .. } = self {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<ViewNode>) -> Self {
        if let ViewNode::Element { ref mut children, .. } = self {
            children.extend(new_children);
        }
        self
    }

    pub fn with_model(mut self, id: NodeId) -> Self {
        match self {
            ViewNode::Element { ref mut model, .. } | ViewNode::Text { ref mut model, .. } => {
                *model = Some(id);
            }
        }
        self
    }

    fn as_ui(mut self) -> Self {
        if let ViewNode::Element { ref mut ui, .. } = self {
            *ui = true;
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            ViewNode::Element { tag, .. } => Some(tag),
            ViewNode::Text { .. } => None,
        }
    }

    pub fn is_tag(&self, name: &str) -> bool {
        self.tag() == Some(name)
    }

    pub fn is_ui(&self) -> bool {
        matches!(self, ViewNode::Element { ui: true, .. })
    }

    pub fn model(&self) -> Option<NodeId> {
        match self {
            ViewNode::Element { model, .. } | ViewNode::Text { model, .. } => *model,
        }
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ViewNode::Element { attributes, .. } => Some(attributes),
            ViewNode::Text { .. } => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes()?.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let ViewNode::Element { attributes, .. } = self {
            attributes.insert(key.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        match self {
            ViewNode::Element { attributes, .. } => attributes.remove(key),
            ViewNode::Text { .. } => None,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .or_else(|| self.attr("ezxhtml:class"))
            .is_some_and(|c| c.split_whitespace().any(|t| t == class))
    }

    pub fn children(&self) -> &[ViewNode] {
        match self {
            ViewNode::Element { children, .. } => children,
            ViewNode::Text { .. } => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<ViewNode>> {
        match self {
            ViewNode::Element { children, .. } => Some(children),
            ViewNode::Text { .. } => None,
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &ViewNode> {
        self.children().iter().filter(|c| c.tag().is_some())
    }

    pub fn text_content(&self) -> String {
        match self {
            ViewNode::Text { content, .. } => content.clone(),
            ViewNode::Element { children, .. } => children.iter().map(ViewNode::text_content).collect(),
        }
    }

    /// Depth-first search, self included.
    pub fn find(&self, predicate: &impl Fn(&ViewNode) -> bool) -> Option<&ViewNode> {
        if predicate(self) {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(predicate))
    }

    pub fn find_all<'a>(&'a self, predicate: &impl Fn(&ViewNode) -> bool, out: &mut Vec<&'a ViewNode>) {
        if predicate(self) {
            out.push(self);
        }
        for child in self.children() {
            child.find_all(predicate, out);
        }
    }

    /// Elements and text nodes produced from `id`.
    pub fn find_by_model(&self, id: NodeId) -> Option<&ViewNode> {
        self.find(&|n: &ViewNode| n.model() == Some(id))
    }

    pub fn find_by_model_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        if self.model() == Some(id) {
            return Some(self);
        }
        match self {
            ViewNode::Element { children, .. } => children.iter_mut().find_map(|c| c.find_by_model_mut(id)),
            ViewNode::Text { .. } => None,
        }
    }

    /// Path from `self` down to the node produced from `id`, both ends included.
    pub fn path_to_model(&self, id: NodeId) -> Option<Vec<&ViewNode>> {
        if self.model() == Some(id) {
            return Some(vec![self]);
        }
        for child in self.children() {
            if let Some(mut path) = child.path_to_model(id) {
                path.insert(0, self);
                return Some(path);
            }
        }
        None
    }

    /// Number of elements in the subtree carrying `key = value`.
    pub fn count_attr(&self, key: &str, value: &str) -> usize {
        let mut found = Vec::new();
        self.find_all(&|n: &ViewNode| n.attr(key) == Some(value), &mut found);
        found.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let node = ViewNode::element("p")
            .with_attr("id", "intro")
            .with_child(ViewNode::text("Hello").with_model(NodeId(2)))
            .with_model(NodeId(1));

        assert_eq!(node.tag(), Some("p"));
        assert_eq!(node.attr("id"), Some("intro"));
        assert_eq!(node.text_content(), "Hello");
        assert_eq!(node.model(), Some(NodeId(1)));
    }

    #[test]
    fn test_path_to_model() {
        let tree = ViewNode::element("div").with_child(
            ViewNode::element("p").with_child(
                ViewNode::element("a")
                    .with_attr("href", "https://example.com")
                    .with_child(ViewNode::text("link").with_model(NodeId(7))),
            ),
        );

        let path = tree.path_to_model(NodeId(7)).unwrap();
        let tags: Vec<_> = path.iter().filter_map(|n| n.tag()).collect();
        assert_eq!(tags, vec!["div", "p", "a"]);
    }

    #[test]
    fn test_serialization_skips_defaults() {
        let json = serde_json::to_string(&ViewNode::element("p")).unwrap();
        assert!(!json.contains("model"));
        assert!(!json.contains("ui"));
    }
}
