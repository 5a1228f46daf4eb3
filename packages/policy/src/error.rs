use thiserror::Error;

pub type PolicyResult<T> = Result<T, PolicyError>;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid policy configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Attribute '{attribute}' is not defined for '{element}'")]
    UnknownAttribute { element: String, attribute: String },

    #[error("Invalid value '{value}' for '{attribute}' on '{element}': {reason}")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("Class '{class}' is not permitted on '{element}'")]
    ClassNotPermitted { element: String, class: String },
}
