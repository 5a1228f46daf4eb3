//! Error types for the editor

use richtext_policy::PolicyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] richtext_model::ModelError),

    #[error("Conversion error: {0}")]
    Convert(#[from] richtext_converter::ConvertError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// User-facing rejection of a command or form submission. Nothing is written
/// to the model when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Link URL cannot be empty")]
    EmptyUrl,

    #[error("Anchor '{0}' is already used by another element")]
    DuplicateAnchor(String),

    #[error("{0}")]
    Policy(String),

    #[error("Nothing is selected")]
    NoContext,

    #[error("Custom attributes are not enabled for '{0}'")]
    NotEnabled(String),

    #[error("Embed reference cannot be empty")]
    EmptyReference,
}

impl From<PolicyError> for ValidationError {
    fn from(err: PolicyError) -> Self {
        ValidationError::Policy(err.to_string())
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
