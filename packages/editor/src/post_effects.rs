//! # Post-Effect System
//!
//! Commands trigger follow-up edits that keep the document consistent.
//!
//! ## Design
//!
//! After a command's change commits, every registered effect inspects the
//! command and the resulting model and returns the operations it needs.
//! The engine applies them together in one `PostEffect` change, which the
//! undo stack folds into the command's step.
//!
//! Post-effects are:
//! - **Deterministic**: same command and model always produce the same operations
//! - **Minimal**: only operations that change something are returned

use crate::commands::Command;
use crate::errors::EditorResult;
use richtext_model::{keys, ChangeOrigin, Model, Operation};
use tracing::debug;

pub trait PostEffect: std::fmt::Debug + Send + Sync {
    /// Operations to run after `command` produced `model`
    fn analyze(&self, command: &Command, model: &Model) -> Vec<Operation>;
}

/// A split block copies its attributes, anchor included. Anchors are unique,
/// so blocks under the selection after Enter lose theirs.
#[derive(Debug)]
pub struct ClearAnchorAfterEnter;

impl PostEffect for ClearAnchorAfterEnter {
    fn analyze(&self, command: &Command, model: &Model) -> Vec<Operation> {
        if !matches!(command, Command::Enter) {
            return vec![];
        }
        model
            .selection_blocks()
            .into_iter()
            .filter(|id| model.get(*id).is_some_and(|n| n.has_attribute(keys::ANCHOR)))
            .map(|node| Operation::SetAttribute {
                node,
                key: keys::ANCHOR.to_string(),
                value: None,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PostEffectEngine {
    /// Engine with the default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(ClearAnchorAfterEnter)],
        }
    }

    pub fn empty() -> Self {
        Self { effects: Vec::new() }
    }

    pub fn register(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    pub fn analyze(&self, command: &Command, model: &Model) -> Vec<Operation> {
        self.effects
            .iter()
            .flat_map(|effect| effect.analyze(command, model))
            .collect()
    }

    /// Analyze and apply. Returns the number of operations applied.
    pub fn apply(&self, command: &Command, model: &mut Model) -> EditorResult<usize> {
        let operations = self.analyze(command, model);
        if operations.is_empty() {
            return Ok(0);
        }
        let count = operations.len();
        model.change(ChangeOrigin::PostEffect, |w| {
            for operation in operations {
                w.apply(operation)?;
            }
            Ok(())
        })?;
        debug!(command = command.description(), count, "post-effects applied");
        Ok(count)
    }
}
