//! # Richtext Model
//!
//! The editing model: a typed node tree with attributes, flat positions and
//! ranges, invertible operations, and scoped change transactions.

pub mod document;
pub mod errors;
pub mod fragment;
pub mod node;
pub mod operation;
pub mod position;
pub mod schema;
pub mod writer;

pub use document::Model;
pub use errors::{ModelError, ModelResult};
pub use fragment::Fragment;
pub use node::{keys, names, AttributeValue, Attributes, Node, NodeId, NodeKind};
pub use operation::Operation;
pub use position::{Position, Range, Selection};
pub use schema::Schema;
pub use writer::{ChangeBatch, ChangeOrigin, Writer};
