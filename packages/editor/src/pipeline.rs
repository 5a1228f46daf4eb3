//! # Editing Pipeline
//!
//! Keeps the rendered view in step with the model: Commit → Downcast → View
//!
//! The Pipeline manages:
//! - Re-rendering after committed changes
//! - Skipping the full render for cache-only batches, whose previews the
//!   embed synchronizer patches in place
//! - The cached view for click hit-testing and HTML output

use crate::errors::EditorResult;
use richtext_converter::{editing_view, render_html, ConversionOptions, DowncastContext, RenderOptions, Stage, ViewNode};
use richtext_model::{ChangeBatch, Model};
use tracing::debug;

#[derive(Debug)]
pub struct Pipeline {
    options: ConversionOptions,
    view: Option<ViewNode>,
    renders: usize,
    rendered_version: Option<u64>,
}

/// What the pipeline did with a set of batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
    /// Nothing structural changed
    Unchanged,
    /// The view was rebuilt from the model
    Rendered { version: u64 },
    /// Only embed caches changed; previews need patching
    CacheOnly,
}

impl Pipeline {
    pub fn new(options: ConversionOptions) -> Self {
        Self {
            options,
            view: None,
            renders: 0,
            rendered_version: None,
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn context(&self) -> DowncastContext {
        DowncastContext::new(Stage::Editing, self.options.clone())
    }

    /// Full render (initial load, recovery)
    pub fn render(&mut self, model: &Model) -> EditorResult<&ViewNode> {
        let view = editing_view(model, &self.options)?;
        self.renders += 1;
        self.rendered_version = Some(model.version());
        debug!(version = model.version(), renders = self.renders, "view rendered");
        Ok(&*self.view.insert(view))
    }

    /// Bring the view up to date with committed `batches`.
    pub fn apply(&mut self, model: &Model, batches: &[ChangeBatch]) -> EditorResult<PipelineResult> {
        let changed: Vec<&ChangeBatch> = batches.iter().filter(|b| !b.is_empty()).collect();
        if changed.is_empty() {
            return Ok(PipelineResult::Unchanged);
        }
        if self.view.is_some() && changed.iter().all(|b| b.is_cache_only()) {
            return Ok(PipelineResult::CacheOnly);
        }
        self.render(model)?;
        Ok(PipelineResult::Rendered {
            version: model.version(),
        })
    }

    pub fn view(&self) -> Option<&ViewNode> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut ViewNode> {
        self.view.as_mut()
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn rendered_version(&self) -> Option<u64> {
        self.rendered_version
    }

    pub fn html(&self, options: &RenderOptions) -> Option<String> {
        self.view.as_ref().map(|view| render_html(view, options))
    }

    /// Force a full render on the next commit
    pub fn clear_cache(&mut self) {
        self.view = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_model::{keys, ChangeOrigin, Fragment};

    #[test]
    fn test_cache_only_batches_skip_render() {
        let mut model = Model::new();
        let root = model.root();
        let embed = model
            .change(ChangeOrigin::Load, |w| w.insert(root, 0, Fragment::embed_block("1")))
            .unwrap();
        let mut pipeline = Pipeline::new(ConversionOptions::default());
        let batches = model.take_batches();
        pipeline.apply(&model, &batches).unwrap();
        assert_eq!(pipeline.render_count(), 1);

        model
            .change(ChangeOrigin::Resolver, |w| w.set_attribute(embed, keys::DISPLAY_NAME, "Foo"))
            .unwrap();
        let batches = model.take_batches();
        let result = pipeline.apply(&model, &batches).unwrap();

        assert_eq!(result, PipelineResult::CacheOnly);
        assert_eq!(pipeline.render_count(), 1);
    }

    #[test]
    fn test_selection_only_change_is_unchanged() {
        let mut model = Model::new();
        let mut pipeline = Pipeline::new(ConversionOptions::default());
        model
            .change(ChangeOrigin::User, |w| {
                let mut selection = w.model().selection().clone();
                selection.list_selected = true;
                w.set_selection(selection);
                Ok(())
            })
            .unwrap();

        let batches = model.take_batches();
        let result = pipeline.apply(&model, &batches).unwrap();
        assert_eq!(result, PipelineResult::Unchanged);
        assert!(pipeline.view().is_none());
    }
}
