//! # Richtext Policy
//!
//! Per-element-type whitelist of custom attributes and classes, loaded once
//! per editing session from a JSON file.

pub mod config;
pub mod error;
pub mod registry;

pub use config::{AttributeDefinition, AttributePolicies, AttributeType, ClassPolicy, PolicyConfig};
pub use error::{PolicyError, PolicyResult};
pub use registry::{config_name, list_config_name, PolicyRegistry, LINK_ELEMENT};
