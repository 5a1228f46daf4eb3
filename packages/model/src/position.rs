//! Positions, ranges and the document selection.
//!
//! A position addresses a gap between children of a parent node. Text runs
//! occupy one offset per character; every other node occupies one offset.

use crate::node::{AttributeValue, Attributes, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub parent: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(parent: NodeId, offset: usize) -> Self {
        Self { parent, offset }
    }
}

/// A flat range: both ends share the same parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub parent: NodeId,
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(parent: NodeId, start: usize, end: usize) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self { parent, start, end }
    }

    pub fn collapsed(position: Position) -> Self {
        Self::new(position.parent, position.offset, position.offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn start_position(&self) -> Position {
        Position::new(self.parent, self.start)
    }

    pub fn end_position(&self) -> Position {
        Position::new(self.parent, self.end)
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Document selection: ranges plus the attributes a caret insertion picks up.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub ranges: Vec<Range>,
    #[serde(default)]
    pub attributes: Attributes,
    /// Set when the user selected a whole list rather than a position in it.
    #[serde(default)]
    pub list_selected: bool,
}

impl Selection {
    pub fn caret(position: Position) -> Self {
        Self::from_range(Range::collapsed(position))
    }

    pub fn from_range(range: Range) -> Self {
        Self {
            ranges: vec![range],
            attributes: Attributes::new(),
            list_selected: false,
        }
    }

    pub fn from_ranges(ranges: Vec<Range>) -> Self {
        Self {
            ranges,
            attributes: Attributes::new(),
            list_selected: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_collapsed(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_collapsed()
    }

    pub fn first_range(&self) -> Option<&Range> {
        self.ranges.first()
    }

    pub fn first_position(&self) -> Option<Position> {
        self.ranges.first().map(Range::start_position)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }
}
