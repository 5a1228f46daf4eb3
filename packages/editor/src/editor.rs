//! # Editor Session
//!
//! Owns the model and everything that reacts to it. Every path that changes
//! the model ends in [`Editor::commit`], which runs once per outermost change:
//!
//! 1. attribute cleanup for the selection context (folded into the same undo step)
//! 2. undo recording
//! 3. view update (full render, or preview patching for cache-only batches)
//! 4. embed synchronization and events

use crate::commands::{self, Command, CommandOutcome, LinkValues};
use crate::config::EditorConfig;
use crate::custom_attributes::{CleanupEngine, CleanupReport, CustomAttributeForm};
use crate::embeds::EmbedSynchronizer;
use crate::errors::EditorResult;
use crate::events::{EditorEvent, EventBus};
use crate::link::{LinkState, LinkUi};
use crate::pipeline::{Pipeline, PipelineResult};
use crate::post_effects::PostEffectEngine;
use crate::resolver::{ReferenceResolver, Resolution, ResolutionCallback, StaticResolver};
use crate::undo_stack::UndoStack;
use richtext_converter::{data_xml, upcast, ConversionOptions, PendingEmbed, Recovery, RenderOptions, UpcastReport, ViewNode};
use richtext_model::{keys, AttributeValue, ChangeOrigin, Model, Position, Selection};
use richtext_policy::PolicyRegistry;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, instrument};

pub struct Editor {
    model: Model,
    policy: Arc<PolicyRegistry>,
    config: EditorConfig,
    options: ConversionOptions,
    pipeline: Pipeline,
    undo: UndoStack,
    post_effects: PostEffectEngine,
    cleanup: CleanupEngine,
    synchronizer: EmbedSynchronizer,
    resolver: Arc<dyn ReferenceResolver>,
    resolutions_tx: UnboundedSender<Resolution>,
    resolutions_rx: UnboundedReceiver<Resolution>,
    events: EventBus,
    link: LinkUi,
    attributes_enabled: bool,
    recoveries: Vec<Recovery>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default(), PolicyRegistry::default(), Arc::new(StaticResolver::new()))
    }
}

impl Editor {
    pub fn new(config: EditorConfig, policy: PolicyRegistry, resolver: Arc<dyn ReferenceResolver>) -> Self {
        let policy = Arc::new(policy);
        let options = config.conversion_options();
        let (resolutions_tx, resolutions_rx) = unbounded_channel();
        Self {
            model: Model::new(),
            cleanup: CleanupEngine::new(Arc::clone(&policy)),
            policy,
            pipeline: Pipeline::new(options.clone()),
            undo: UndoStack::with_max_levels(config.undo_levels),
            options,
            config,
            post_effects: PostEffectEngine::new(),
            synchronizer: EmbedSynchronizer::new(),
            resolver,
            resolutions_tx,
            resolutions_rx,
            events: EventBus::new(),
            link: LinkUi::new(),
            attributes_enabled: false,
            recoveries: Vec::new(),
        }
    }

    /// Replace the document with `source`. Embeds start resolving right away.
    #[instrument(skip(self, source), fields(bytes = source.len()))]
    pub fn load(&mut self, source: &str) -> EditorResult<UpcastReport> {
        let report = upcast(&mut self.model, source, &self.options)?;
        self.recoveries = report.recoveries.clone();
        self.link = LinkUi::new();
        self.commit("Load")?;
        self.request_resolutions(&report.pending);
        info!(
            pending = report.pending.len(),
            recoveries = report.recoveries.len(),
            "document loaded"
        );
        Ok(report)
    }

    /// Validate and apply a command as one undo step.
    pub fn execute(&mut self, command: Command) -> EditorResult<CommandOutcome> {
        let outcome = commands::execute(&mut self.model, &command, &self.policy)?;
        self.post_effects.apply(&command, &mut self.model)?;
        self.commit(command.description())?;
        self.request_resolutions(&outcome.pending);
        Ok(outcome)
    }

    /// Move the selection. Cleanup runs for the new context element.
    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        self.model.set_selection(selection);
        self.commit("Select")
    }

    /// Toggle whether the whole list around the selection is selected.
    pub fn select_list(&mut self, selected: bool) -> EditorResult<()> {
        let mut selection = self.model.selection().clone();
        selection.list_selected = selected;
        self.set_selection(selection)
    }

    pub fn undo(&mut self) -> EditorResult<bool> {
        let undone = self.undo.undo(&mut self.model)?;
        self.commit("Undo")?;
        Ok(undone)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        let redone = self.undo.redo(&mut self.model)?;
        self.commit("Redo")?;
        Ok(redone)
    }

    fn commit(&mut self, description: &str) -> EditorResult<()> {
        if let Some(report) = self.cleanup.refresh(&mut self.model)? {
            self.attributes_enabled = report.enabled;
        }

        let batches = self.model.take_batches();
        if batches.is_empty() {
            return Ok(());
        }

        self.undo.record(&batches, self.model.selection(), description);

        if let PipelineResult::Rendered { version } = self.pipeline.apply(&self.model, &batches)? {
            self.events.emit(EditorEvent::ViewRendered { version });
        }
        for request in self.synchronizer.synchronize(&self.model, &mut self.pipeline, &batches) {
            self.events.emit(EditorEvent::EmbedMenuRequested(request));
        }
        Ok(())
    }

    // ---- resolution ------------------------------------------------------

    fn request_resolutions(&self, pending: &[PendingEmbed]) {
        for embed in pending {
            let callback = ResolutionCallback::new(embed.node, embed.external_id.clone(), self.resolutions_tx.clone());
            self.resolver.resolve(&self.config.credentials, &embed.external_id, callback);
        }
    }

    /// Apply every resolution that has already arrived. Returns how many
    /// changed the document.
    pub fn process_resolutions(&mut self) -> EditorResult<usize> {
        let mut applied = 0;
        while let Ok(resolution) = self.resolutions_rx.try_recv() {
            if self.apply_resolution(resolution)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Wait for the next resolution and apply it. Returns whether it changed
    /// the document. Waits indefinitely when nothing is in flight.
    pub async fn next_resolution(&mut self) -> EditorResult<bool> {
        match self.resolutions_rx.recv().await {
            Some(resolution) => self.apply_resolution(resolution),
            None => Ok(false),
        }
    }

    fn apply_resolution(&mut self, resolution: Resolution) -> EditorResult<bool> {
        let node = resolution.node;
        let current = self
            .model
            .get(node)
            .filter(|n| n.kind.is_embed() && self.model.is_attached(node))
            .and_then(|n| n.attribute_str(keys::EXTERNAL_ID));
        if current != Some(resolution.external_id.as_str()) {
            debug!(node = %node, external_id = %resolution.external_id, "stale resolution ignored");
            return Ok(false);
        }
        let Some(content) = resolution.results.into_iter().next() else {
            return Ok(false);
        };

        self.model.change(ChangeOrigin::Resolver, |w| {
            w.set_attribute(node, keys::DISPLAY_NAME, content.display_name.as_str())?;
            match &content.location_id {
                Some(location) => w.set_attribute(node, keys::LOCATION_ID, location.as_str())?,
                None => w.remove_attribute(node, keys::LOCATION_ID)?,
            }
            w.set_attribute(node, keys::LANGUAGE_CODES, AttributeValue::from(content.language_codes.clone()))
        })?;
        self.commit("Resolve")?;
        Ok(true)
    }

    // ---- links -----------------------------------------------------------

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn link_ui(&self) -> &LinkUi {
        &self.link
    }

    pub fn link_add(&mut self) -> EditorResult<()> {
        let command = self.link.add_link(&self.policy);
        self.execute(command)?;
        Ok(())
    }

    /// Click at `position`. Opens the link form when the click lands inside
    /// a rendered link.
    pub fn link_click(&mut self, position: Position) -> EditorResult<bool> {
        self.set_selection(Selection::caret(position))?;
        let Some(view) = self.pipeline.view() else {
            return Ok(false);
        };
        Ok(self.link.click(&self.model, view, position, &self.policy))
    }

    pub fn link_save(&mut self, values: LinkValues) -> EditorResult<()> {
        let command = self.link.save(values)?;
        self.execute(command)?;
        self.link.committed();
        Ok(())
    }

    pub fn link_remove(&mut self) -> EditorResult<()> {
        let command = self.link.remove();
        self.execute(command)?;
        Ok(())
    }

    pub fn link_close(&mut self) -> EditorResult<()> {
        if let Some(command) = self.link.close() {
            self.execute(command)?;
        }
        Ok(())
    }

    // ---- accessors -------------------------------------------------------

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn policy(&self) -> &PolicyRegistry {
        &self.policy
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn view(&self) -> Option<&ViewNode> {
        self.pipeline.view()
    }

    pub fn render_count(&self) -> usize {
        self.pipeline.render_count()
    }

    pub fn html(&self, options: &RenderOptions) -> Option<String> {
        self.pipeline.html(options)
    }

    /// The persisted form of the current document.
    pub fn data_xml(&self) -> EditorResult<String> {
        Ok(data_xml(&self.model, &self.options)?)
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<EditorEvent> {
        self.events.subscribe()
    }

    pub fn attributes_enabled(&self) -> bool {
        self.attributes_enabled
    }

    pub fn custom_attribute_form(&self) -> Option<CustomAttributeForm> {
        self.cleanup.form(&self.model)
    }

    /// Strip every policy violation in the document.
    pub fn clean_all(&mut self) -> EditorResult<Vec<CleanupReport>> {
        let reports = self.cleanup.clean_all(&mut self.model)?;
        self.commit("Clean")?;
        Ok(reports)
    }

    pub fn recoveries(&self) -> &[Recovery] {
        &self.recoveries
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }
}
