use crate::table::Stage;
use richtext_model::{ModelError, NodeKind};
use thiserror::Error;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("No converter for {kind:?} in the {stage:?} stage")]
    Unsupported { stage: Stage, kind: NodeKind },

    #[error(transparent)]
    Model(#[from] ModelError),
}
