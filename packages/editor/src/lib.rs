//! # Richtext Editor
//!
//! Editing session on top of the model and the conversion passes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ converter: persisted XML → model (upcast)   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: session lifecycle                   │
//! │  - Validate and apply commands              │
//! │  - Post-effects and policy cleanup          │
//! │  - Undo/redo                                │
//! │  - Embed resolution and link forms          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ converter: model → rendered view / XML      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Model is source of truth**: the view and persisted XML are derived
//! 2. **One change, one commit**: observers run after the outermost change
//! 3. **Validate, then apply**: rejected commands leave no trace
//! 4. **Resolution is asynchronous**: results arrive over a channel and are
//!    applied as their own changes; stale ones are dropped
//!
//! ## Usage
//!
//! ```rust,ignore
//! use richtext_editor::{Command, Editor, EditorConfig, StaticResolver};
//! use richtext_policy::PolicyRegistry;
//! use std::sync::Arc;
//!
//! let mut editor = Editor::new(EditorConfig::default(), PolicyRegistry::default(), Arc::new(StaticResolver::new()));
//! editor.load(source)?;
//! editor.execute(Command::InsertText { text: "Hello".into() })?;
//! editor.process_resolutions()?;
//! let saved = editor.data_xml()?;
//! ```

mod commands;
mod config;
mod custom_attributes;
mod editor;
mod embeds;
mod errors;
mod events;
mod link;
mod pipeline;
mod post_effects;
mod resolver;
mod undo_stack;

pub use commands::{execute, BlockType, Command, CommandOutcome, LinkValues};
pub use config::{Credentials, EditorConfig};
pub use custom_attributes::{element_config_name, list_run, CleanupEngine, CleanupReport, CustomAttributeForm};
pub use editor::Editor;
pub use embeds::EmbedSynchronizer;
pub use errors::{EditorError, EditorResult, ValidationError};
pub use events::{EditorEvent, EmbedMenuRequest, EventBus};
pub use link::{encode_url_query, rendered_link_at, LinkState, LinkUi};
pub use pipeline::{Pipeline, PipelineResult};
pub use post_effects::{ClearAnchorAfterEnter, PostEffect, PostEffectEngine};
pub use resolver::{
    ContentLookup, LookupError, LookupResolver, ReferenceResolver, Resolution, ResolutionCallback, ResolvedContent,
    StaticResolver,
};
pub use undo_stack::{UndoStack, UndoStep};

// Re-export common types for convenience
pub use richtext_converter::{PendingEmbed, RenderOptions, ViewNode};
pub use richtext_model::{Model, Position, Range, Selection};
