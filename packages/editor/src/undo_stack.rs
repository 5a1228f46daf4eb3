//! # Undo/Redo Stack
//!
//! Tracks committed change batches and replays them backwards or forwards.
//!
//! ## Design
//!
//! - One undo step per user command. The post-effect and cleanup batches
//!   committed in response to that command are folded into the same step
//! - Undo applies the recorded inverses in reverse order inside an `Undo`
//!   change and restores the selection from before the command
//! - Redo replays the recorded operations verbatim inside a `Redo` change
//! - A new step clears the redo stack
//! - Loading a document clears all history
//! - Resolver cache fills are not recorded. They only write attributes, and
//!   every inverse sets an attribute to an absolute value, so recorded steps
//!   stay applicable around them
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! execute(&mut model, &command, &policy)?;
//! stack.record(&model.take_batches(), model.selection(), command.description());
//!
//! stack.undo(&mut model)?;
//! stack.redo(&mut model)?;
//! ```

use crate::errors::EditorResult;
use richtext_model::{ChangeBatch, ChangeOrigin, Model, Operation, Selection};
use tracing::{debug, warn};

/// Operations undone/redone together
#[derive(Debug, Clone)]
pub struct UndoStep {
    /// Operations in application order
    pub operations: Vec<Operation>,

    /// Inverses in application order; undo walks them backwards
    pub inverses: Vec<Operation>,

    pub selection_before: Selection,
    pub selection_after: Selection,

    pub description: Option<String>,
}

impl UndoStep {
    fn from_batch(batch: &ChangeBatch) -> Self {
        Self {
            operations: batch.operations.clone(),
            inverses: batch.inverses.clone(),
            selection_before: batch.selection_before.clone(),
            selection_after: batch.selection_before.clone(),
            description: None,
        }
    }

    fn absorb(&mut self, batch: &ChangeBatch) {
        self.operations.extend(batch.operations.iter().cloned());
        self.inverses.extend(batch.inverses.iter().cloned());
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug)]
pub struct UndoStack {
    /// Applied steps (most recent last)
    undo_stack: Vec<UndoStep>,

    /// Undone steps (most recent last)
    redo_stack: Vec<UndoStep>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record the batches of one commit. `selection_after` is the selection
    /// once every batch has been applied.
    pub fn record(&mut self, batches: &[ChangeBatch], selection_after: &Selection, description: &str) {
        let mut step: Option<UndoStep> = None;

        for batch in batches {
            match batch.origin {
                ChangeOrigin::Load => {
                    self.clear();
                    step = None;
                }
                ChangeOrigin::User => match step.as_mut() {
                    Some(step) => step.absorb(batch),
                    None => step = Some(UndoStep::from_batch(batch).with_description(description)),
                },
                ChangeOrigin::PostEffect | ChangeOrigin::Cleanup => {
                    if let Some(step) = step.as_mut() {
                        step.absorb(batch);
                    }
                }
                ChangeOrigin::Resolver | ChangeOrigin::Undo | ChangeOrigin::Redo => {}
            }
        }

        if let Some(mut step) = step {
            if step.operations.is_empty() {
                return;
            }
            step.selection_after = selection_after.clone();
            self.push_step(step);
        }
    }

    fn push_step(&mut self, step: UndoStep) {
        self.undo_stack.push(step);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the future
        self.redo_stack.clear();
    }

    /// Undo the most recent step. Returns false when there is nothing to undo.
    pub fn undo(&mut self, model: &mut Model) -> EditorResult<bool> {
        let Some(step) = self.undo_stack.pop() else {
            return Ok(false);
        };

        let result = model.change(ChangeOrigin::Undo, |w| {
            for inverse in step.inverses.iter().rev() {
                w.apply(inverse.clone())?;
            }
            w.set_selection(step.selection_before.clone());
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(description = ?step.description, "undo");
                self.redo_stack.push(step);
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "undo failed");
                self.undo_stack.push(step);
                Err(err.into())
            }
        }
    }

    /// Redo the most recently undone step.
    pub fn redo(&mut self, model: &mut Model) -> EditorResult<bool> {
        let Some(step) = self.redo_stack.pop() else {
            return Ok(false);
        };

        let result = model.change(ChangeOrigin::Redo, |w| {
            for operation in &step.operations {
                w.apply(operation.clone())?;
            }
            w.set_selection(step.selection_after.clone());
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(description = ?step.description, "redo");
                self.undo_stack.push(step);
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "redo failed");
                self.redo_stack.push(step);
                Err(err.into())
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().and_then(|step| step.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().and_then(|step| step.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
