//! # Richtext Converter
//!
//! Conversion between the three forms of a document.
//!
//! ```text
//! persisted XML ──upcast──▶ model ──editing downcast──▶ rendered view
//!                              └────data downcast────▶ persisted XML
//! ```
//!
//! Every element is produced by a cell of the [`ConversionTable`], keyed by
//! `(stage, node kind)` for downcast and by tag for upcast.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use richtext_converter::{upcast, editing_view, data_xml, ConversionOptions};
//! use richtext_model::Model;
//!
//! let options = ConversionOptions::default();
//! let mut model = Model::new();
//! let report = upcast(&mut model, source, &options)?;
//! let view = editing_view(&model, &options)?;
//! let saved = data_xml(&model, &options)?;
//! ```

pub mod blocks;
pub mod downcast;
pub mod embed;
pub mod error;
pub mod html;
pub mod inline;
pub mod lists;
pub mod table;
pub mod upcast;
pub mod view;
pub mod vocabulary;
pub mod xml;

pub use downcast::{data_xml, downcast, editing_html, editing_view, Downcaster};
pub use error::{ConvertError, ConvertResult};
pub use html::{render_html, RenderOptions};
pub use table::{standard_table, ConversionOptions, ConversionTable, DowncastContext, Stage};
pub use upcast::{
    pending_embeds, upcast, upcast_fragments, PendingEmbed, Recovery, RecoveryAction, UpcastContext,
    UpcastReport, Upcaster,
};
pub use view::ViewNode;
pub use xml::{parse_xml, write_xml};
