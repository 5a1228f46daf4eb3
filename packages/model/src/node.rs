use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved attribute keys with structural meaning.
pub mod keys {
    pub const ANCHOR: &str = "anchor";
    pub const CUSTOM_CLASSES: &str = "custom-classes";
    pub const CUSTOM_ATTRIBUTE_PREFIX: &str = "custom-attribute:";

    pub const LIST_TYPE: &str = "listType";
    pub const HEADING_LEVEL: &str = "headingLevel";
    pub const CUSTOM_TAG_NAME: &str = "customTagName";
    pub const CUSTOM_TAG_PARAM_PREFIX: &str = "customTagParam:";

    pub const EXTERNAL_ID: &str = "externalId";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const LOCATION_ID: &str = "locationId";
    pub const LANGUAGE_CODES: &str = "languageCodes";

    pub const LINK_HREF: &str = "linkHref";
    pub const LINK_TITLE: &str = "linkTitle";
    pub const LINK_TARGET: &str = "linkTarget";
    pub const LINK_CLASSES: &str = "linkClasses";
    pub const LINK_ATTRIBUTE_PREFIX: &str = "linkAttribute:";

    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINE: &str = "underline";
    pub const SUPERSCRIPT: &str = "superscript";
    pub const SUBSCRIPT: &str = "subscript";

    /// Embed cache keys. Never persisted.
    pub const EMBED_CACHE: [&str; 3] = [DISPLAY_NAME, LOCATION_ID, LANGUAGE_CODES];

    /// Keys removed together when a link is removed.
    pub const LINK_CORE: [&str; 3] = [LINK_HREF, LINK_TITLE, LINK_TARGET];

    pub fn is_link_key(key: &str) -> bool {
        key == LINK_HREF
            || key == LINK_TITLE
            || key == LINK_TARGET
            || key == LINK_CLASSES
            || key.starts_with(LINK_ATTRIBUTE_PREFIX)
    }

    pub fn custom_attribute(name: &str) -> String {
        format!("{}{}", CUSTOM_ATTRIBUTE_PREFIX, name)
    }

    pub fn link_attribute(name: &str) -> String {
        format!("{}{}", LINK_ATTRIBUTE_PREFIX, name)
    }
}

/// Well-known model element names.
pub mod names {
    pub const ROOT: &str = "$root";
    pub const TEXT: &str = "$text";
    pub const PARAGRAPH: &str = "paragraph";
    pub const HEADING: &str = "heading";
    pub const FORMATTED: &str = "formatted";
    pub const LIST_ITEM: &str = "listItem";
    pub const CUSTOM_TAG: &str = "customTag";
    pub const EMBED: &str = "embed";
    pub const EMBED_INLINE: &str = "embedInline";
}

/// Stable node identity. Ids are allocated monotonically and never reused,
/// so a lookup failure means the node was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Block,
    InlineTextRun,
    ListItem,
    /// Only produced by conversion; the model keeps list items flat.
    ListContainer,
    EmbedBlock,
    EmbedInline,
    CustomTag,
}

impl NodeKind {
    /// Nodes that own inline content (text runs, inline embeds).
    pub fn is_text_block(self) -> bool {
        matches!(self, NodeKind::Block | NodeKind::ListItem)
    }

    /// Nodes that sit at block level.
    pub fn is_block_level(self) -> bool {
        matches!(
            self,
            NodeKind::Block | NodeKind::ListItem | NodeKind::EmbedBlock | NodeKind::CustomTag
        )
    }

    pub fn is_embed(self) -> bool {
        matches!(self, NodeKind::EmbedBlock | NodeKind::EmbedInline)
    }

    pub fn is_inline(self) -> bool {
        matches!(self, NodeKind::InlineTextRun | NodeKind::EmbedInline)
    }
}

/// Attribute value. Most attributes are strings; `languageCodes` is an
/// ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttributeValue::List(items) => Some(items),
            AttributeValue::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Text(s) => s.is_empty(),
            AttributeValue::List(items) => items.is_empty(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::List(value)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// A node stored in the model arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub attributes: Attributes,
    pub children: Vec<NodeId>,
    /// Advisory back-reference. Never used for ownership decisions.
    pub parent: Option<NodeId>,
    /// Character data, only for text runs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
}

impl Node {
    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::InlineTextRun
    }

    /// Number of model offsets the node occupies inside its parent.
    pub fn offset_size(&self) -> usize {
        if self.is_text() {
            self.data.chars().count()
        } else {
            1
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttributeValue::as_str)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Anchor value, treating an empty string as absent.
    pub fn anchor(&self) -> Option<&str> {
        self.attribute_str(keys::ANCHOR).filter(|a| !a.is_empty())
    }
}
