//! Editor session configuration.
//!
//! ```json
//! {
//!   "credentials": { "token": "abc", "siteAccess": "admin" },
//!   "referenceScheme": "ezcontent",
//!   "iconSprite": "/bundles/ibexaicons/img/all-icons.svg",
//!   "undoLevels": 100
//! }
//! ```

use crate::errors::EditorResult;
use richtext_converter::ConversionOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Passed explicitly to every resolver call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub site_access: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default = "default_reference_scheme")]
    pub reference_scheme: String,

    #[serde(default = "default_icon_sprite")]
    pub icon_sprite: String,

    /// Maximum undo steps kept (0 = unlimited)
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,
}

fn default_reference_scheme() -> String {
    ConversionOptions::default().reference_scheme
}

fn default_icon_sprite() -> String {
    ConversionOptions::default().icon_sprite
}

fn default_undo_levels() -> usize {
    100
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            reference_scheme: default_reference_scheme(),
            icon_sprite: default_icon_sprite(),
            undo_levels: default_undo_levels(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(source: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> EditorResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no editor config, using defaults");
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            reference_scheme: self.reference_scheme.clone(),
            icon_sprite: self.icon_sprite.clone(),
        }
    }
}
