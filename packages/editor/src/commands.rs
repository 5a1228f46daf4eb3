//! # Commands
//!
//! Every user edit goes through a [`Command`]. Execution is validate-then-apply:
//! all checks run against the current model first, and only then is a single
//! `User` change opened, so a rejected command leaves no trace in the model or
//! the undo history.
//!
//! Commands operate on the current selection. Secondary edits that follow from
//! a command (anchor clearing, policy cleanup) are not part of it; the editor
//! runs them as post-effects after the command's change commits.

use crate::custom_attributes::{element_config_name, list_run};
use crate::errors::{EditorResult, ValidationError};
use richtext_converter::PendingEmbed;
use richtext_model::{
    keys, names, AttributeValue, Attributes, ChangeOrigin, Fragment, Model, ModelError, ModelResult, NodeId,
    NodeKind, Position, Range, Selection, Writer,
};
use richtext_policy::PolicyRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Values of the link form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkValues {
    pub href: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub classes: Option<String>,
    /// Link custom attributes, by name
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl LinkValues {
    pub fn href(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    /// Model attributes carried by linked content. `linkHref` is always
    /// present; empty optional values are left out.
    pub fn to_attributes(&self) -> Attributes {
        let mut out = Attributes::new();
        out.insert(keys::LINK_HREF.to_string(), AttributeValue::from(self.href.as_str()));
        let optional = [
            (keys::LINK_TITLE, &self.title),
            (keys::LINK_TARGET, &self.target),
            (keys::LINK_CLASSES, &self.classes),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                out.insert(key.to_string(), AttributeValue::from(value));
            }
        }
        for (name, value) in &self.attributes {
            if !value.is_empty() {
                out.insert(keys::link_attribute(name), AttributeValue::from(value.as_str()));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockType {
    Paragraph,
    Heading {
        level: u8,
    },
    Formatted,
    ListItem {
        #[serde(rename = "listType")]
        list_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Split the block at the selection
    Enter,
    InsertText {
        text: String,
    },
    DeleteSelection,
    InsertEmbed {
        #[serde(rename = "externalId")]
        external_id: String,
        #[serde(default)]
        inline: bool,
    },
    InsertLink(LinkValues),
    RemoveLink,
    SetAnchor {
        anchor: String,
    },
    SetCustomAttributes {
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        #[serde(default)]
        classes: Option<String>,
    },
    RemoveCustomAttributes,
    SetBlockType {
        #[serde(rename = "blockType")]
        block_type: BlockType,
    },
}

impl Command {
    pub fn description(&self) -> &'static str {
        match self {
            Command::Enter => "Split block",
            Command::InsertText { .. } => "Type",
            Command::DeleteSelection => "Delete",
            Command::InsertEmbed { .. } => "Insert embed",
            Command::InsertLink(_) => "Link",
            Command::RemoveLink => "Unlink",
            Command::SetAnchor { .. } => "Set anchor",
            Command::SetCustomAttributes { .. } => "Set custom attributes",
            Command::RemoveCustomAttributes => "Remove custom attributes",
            Command::SetBlockType { .. } => "Change block type",
        }
    }
}

/// What a command produced besides model changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    /// Embeds created by the command that still need resolving
    pub pending: Vec<PendingEmbed>,
}

/// Validate and run `command` against the current selection.
pub fn execute(model: &mut Model, command: &Command, policy: &PolicyRegistry) -> EditorResult<CommandOutcome> {
    debug!(command = command.description(), "executing command");
    match command {
        Command::Enter => enter(model),
        Command::InsertText { text } => insert_text(model, text),
        Command::DeleteSelection => delete_selection(model),
        Command::InsertEmbed { external_id, inline } => insert_embed(model, external_id, *inline),
        Command::InsertLink(values) => insert_link(model, values),
        Command::RemoveLink => remove_link(model),
        Command::SetAnchor { anchor } => set_anchor(model, anchor),
        Command::SetCustomAttributes { attributes, classes } => {
            set_custom_attributes(model, policy, attributes, classes.as_deref())
        }
        Command::RemoveCustomAttributes => remove_custom_attributes(model),
        Command::SetBlockType { block_type } => set_block_type(model, block_type),
    }
}

fn first_range(model: &Model) -> Result<Range, ValidationError> {
    model.selection().first_range().cloned().ok_or(ValidationError::NoContext)
}

fn enter(model: &mut Model) -> EditorResult<CommandOutcome> {
    let range = first_range(model)?;
    model.change(ChangeOrigin::User, |w| {
        w.delete_range(&range)?;
        let new_block = w.split_block(range.start_position())?;
        w.set_selection(Selection::caret(Position::new(new_block, 0)));
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

fn insert_text(model: &mut Model, text: &str) -> EditorResult<CommandOutcome> {
    let range = first_range(model)?;
    let mut attributes = model.attributes_at(range.start_position());
    attributes.extend(model.selection().attributes.clone());

    model.change(ChangeOrigin::User, |w| {
        w.delete_range(&range)?;
        let inserted = w.insert_text(range.start_position(), text, attributes)?;
        w.set_selection(Selection::caret(inserted.end_position()));
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

fn delete_selection(model: &mut Model) -> EditorResult<CommandOutcome> {
    let mut ranges = model.selection().ranges.clone();
    let Some(first) = ranges.first().cloned() else {
        return Err(ValidationError::NoContext.into());
    };
    // Later ranges first so earlier offsets stay valid
    ranges.sort_by_key(|r| std::cmp::Reverse(r.start));

    model.change(ChangeOrigin::User, |w| {
        for range in &ranges {
            w.delete_range(range)?;
        }
        w.set_selection(Selection::caret(first.start_position()));
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

fn insert_embed(model: &mut Model, external_id: &str, inline: bool) -> EditorResult<CommandOutcome> {
    let external_id = external_id.trim();
    if external_id.is_empty() {
        return Err(ValidationError::EmptyReference.into());
    }
    let position = model.selection().first_position().ok_or(ValidationError::NoContext)?;

    let node = if inline {
        model.change(ChangeOrigin::User, |w| {
            let node = w.insert_at(position, Fragment::embed_inline(external_id))?;
            w.set_selection(Selection::caret(Position::new(position.parent, position.offset + 1)));
            Ok(node)
        })?
    } else {
        let (parent, index) = block_insertion_point(model, position)?;
        model.change(ChangeOrigin::User, |w| {
            let node = w.insert(parent, index, Fragment::embed_block(external_id))?;
            w.set_selection(Selection::from_range(Range::new(parent, index, index + 1)));
            Ok(node)
        })?
    };

    Ok(CommandOutcome {
        pending: vec![PendingEmbed {
            node,
            external_id: external_id.to_string(),
        }],
    })
}

/// Where a new block goes: right after the block holding `position`, or at
/// the position itself when it sits between blocks.
fn block_insertion_point(model: &Model, position: Position) -> ModelResult<(NodeId, usize)> {
    let parent = model.node(position.parent)?;
    if !parent.kind.is_text_block() && model.schema().allows_child(parent.kind, NodeKind::EmbedBlock) {
        return Ok((position.parent, position.offset));
    }
    let block = model
        .ancestor_block(position.parent)
        .ok_or(ModelError::ParentNotFound(position.parent))?;
    let (grandparent, index) = model.location(block).ok_or(ModelError::ParentNotFound(block))?;
    Ok((grandparent, index + 1))
}

/// Link keys present on any node in `range`.
fn link_keys_in(model: &Model, range: &Range) -> BTreeSet<String> {
    model
        .nodes_in_range(range)
        .into_iter()
        .filter_map(|id| model.get(id))
        .flat_map(|n| n.attributes.keys())
        .filter(|k| keys::is_link_key(k))
        .cloned()
        .collect()
}

/// Value of `linkHref` a caret belongs to: the selection's own, or the one
/// inherited from the surrounding text.
pub(crate) fn caret_link_value(model: &Model, position: Position) -> Option<AttributeValue> {
    model
        .selection()
        .attribute(keys::LINK_HREF)
        .cloned()
        .or_else(|| model.attributes_at(position).get(keys::LINK_HREF).cloned())
}

/// Range of the link the caret sits in. Collapsed when there is none.
pub(crate) fn link_range_at(model: &Model, position: Position) -> Range {
    match caret_link_value(model, position) {
        Some(value) => model.find_attribute_range(position, keys::LINK_HREF, &value),
        None => Range::collapsed(position),
    }
}

fn apply_link(w: &mut Writer<'_>, range: &Range, attributes: &Attributes) -> ModelResult<()> {
    let stale: Vec<String> = link_keys_in(w.model(), range)
        .into_iter()
        .filter(|k| !attributes.contains_key(k))
        .collect();
    for key in stale {
        w.remove_attribute_on_range(range, &key)?;
    }
    for (key, value) in attributes {
        w.set_attribute_on_range(range, key, value.clone())?;
    }
    Ok(())
}

fn clear_selection_link(w: &mut Writer<'_>) {
    let keys: Vec<String> = w
        .model()
        .selection()
        .attributes
        .keys()
        .filter(|k| keys::is_link_key(k))
        .cloned()
        .collect();
    for key in keys {
        w.remove_selection_attribute(&key);
    }
}

fn insert_link(model: &mut Model, values: &LinkValues) -> EditorResult<CommandOutcome> {
    let attributes = values.to_attributes();
    let selection = model.selection().clone();

    if !selection.is_collapsed() {
        model.change(ChangeOrigin::User, |w| {
            for range in &selection.ranges {
                apply_link(w, range, &attributes)?;
            }
            Ok(())
        })?;
        return Ok(CommandOutcome::default());
    }

    let position = selection.first_position().ok_or(ValidationError::NoContext)?;
    let range = link_range_at(model, position);

    model.change(ChangeOrigin::User, |w| {
        if !range.is_collapsed() {
            apply_link(w, &range, &attributes)?;
            clear_selection_link(w);
            w.set_selection(Selection::caret(range.end_position()));
        } else if values.href.is_empty() {
            // Placeholder: text typed next picks the link up
            for (key, value) in &attributes {
                w.set_selection_attribute(key, value.clone());
            }
        } else {
            let mut run = w.model().attributes_at(position);
            run.retain(|k, _| !keys::is_link_key(k));
            run.extend(attributes.clone());
            let inserted = w.insert_text(position, &values.href, run)?;
            w.set_selection(Selection::caret(inserted.end_position()));
        }
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

fn remove_link(model: &mut Model) -> EditorResult<CommandOutcome> {
    if let Some(element) = model.selected_element() {
        let node = model.node(element)?;
        if model.schema().allows_attribute(node.kind, &node.name, keys::LINK_HREF) {
            let stale: Vec<String> = node.attributes.keys().filter(|k| keys::is_link_key(k)).cloned().collect();
            model.change(ChangeOrigin::User, |w| {
                for key in &stale {
                    w.remove_attribute(element, key)?;
                }
                Ok(())
            })?;
            return Ok(CommandOutcome::default());
        }
    }

    let selection = model.selection().clone();
    let ranges = if selection.is_collapsed() {
        let position = selection.first_position().ok_or(ValidationError::NoContext)?;
        vec![link_range_at(model, position)]
    } else {
        selection.ranges.clone()
    };

    model.change(ChangeOrigin::User, |w| {
        for range in &ranges {
            for key in link_keys_in(w.model(), range) {
                w.remove_attribute_on_range(range, &key)?;
            }
        }
        clear_selection_link(w);
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

/// Nodes an anchor or custom attribute edit applies to. A list item stands
/// for its whole list when the list is selected, and always for anchors.
fn context_targets(model: &Model, whole_list: bool) -> Result<(NodeId, Vec<NodeId>), ValidationError> {
    let node = model.context_element().ok_or(ValidationError::NoContext)?;
    let is_item = model.get(node).is_some_and(|n| n.kind == NodeKind::ListItem);
    let targets = if is_item && whole_list {
        list_run(model, node)
    } else {
        vec![node]
    };
    Ok((node, targets))
}

fn set_anchor(model: &mut Model, anchor: &str) -> EditorResult<CommandOutcome> {
    let anchor = anchor.trim();
    let (_, targets) = context_targets(model, true)?;

    if !anchor.is_empty() && model.find_by_anchor(anchor).iter().any(|id| !targets.contains(id)) {
        return Err(ValidationError::DuplicateAnchor(anchor.to_string()).into());
    }

    model.change(ChangeOrigin::User, |w| {
        for target in &targets {
            if anchor.is_empty() {
                w.remove_attribute(*target, keys::ANCHOR)?;
            } else {
                w.set_attribute(*target, keys::ANCHOR, anchor)?;
            }
        }
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

fn set_custom_attributes(
    model: &mut Model,
    policy: &PolicyRegistry,
    attributes: &BTreeMap<String, String>,
    classes: Option<&str>,
) -> EditorResult<CommandOutcome> {
    let list_selected = model.selection().list_selected;
    let (node, targets) = context_targets(model, list_selected)?;
    let name = element_config_name(model, node, list_selected).ok_or(ValidationError::NoContext)?;

    if !policy.is_enabled(&name) {
        return Err(ValidationError::NotEnabled(name).into());
    }
    for (attribute, value) in attributes {
        if !value.is_empty() {
            policy
                .validate_value(&name, attribute, value)
                .map_err(ValidationError::from)?;
        }
    }
    if let Some(classes) = classes.filter(|c| !c.trim().is_empty()) {
        policy.validate_classes(&name, classes).map_err(ValidationError::from)?;
    }

    model.change(ChangeOrigin::User, |w| {
        for target in &targets {
            for (attribute, value) in attributes {
                let key = keys::custom_attribute(attribute);
                if value.is_empty() {
                    w.remove_attribute(*target, &key)?;
                } else {
                    w.set_attribute(*target, &key, value.as_str())?;
                }
            }
            match classes.map(str::trim) {
                Some("") => w.remove_attribute(*target, keys::CUSTOM_CLASSES)?,
                Some(classes) => w.set_attribute(*target, keys::CUSTOM_CLASSES, classes)?,
                None => {}
            }
        }
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

fn remove_custom_attributes(model: &mut Model) -> EditorResult<CommandOutcome> {
    let list_selected = model.selection().list_selected;
    let (_, targets) = context_targets(model, list_selected)?;

    model.change(ChangeOrigin::User, |w| {
        for target in &targets {
            let stale: Vec<String> = w
                .model()
                .node(*target)?
                .attributes
                .keys()
                .filter(|k| k.starts_with(keys::CUSTOM_ATTRIBUTE_PREFIX) || k.as_str() == keys::CUSTOM_CLASSES)
                .cloned()
                .collect();
            for key in stale {
                w.remove_attribute(*target, &key)?;
            }
        }
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

fn set_block_type(model: &mut Model, block_type: &BlockType) -> EditorResult<CommandOutcome> {
    let blocks: Vec<NodeId> = model
        .selection_blocks()
        .into_iter()
        .filter(|id| model.get(*id).is_some_and(|n| n.kind.is_text_block()))
        .collect();
    if blocks.is_empty() {
        return Err(ValidationError::NoContext.into());
    }

    let (kind, name, extra): (NodeKind, &str, Option<(&str, String)>) = match block_type {
        BlockType::Paragraph => (NodeKind::Block, names::PARAGRAPH, None),
        BlockType::Heading { level } => (
            NodeKind::Block,
            names::HEADING,
            Some((keys::HEADING_LEVEL, (*level).clamp(1, 6).to_string())),
        ),
        BlockType::Formatted => (NodeKind::Block, names::FORMATTED, None),
        BlockType::ListItem { list_type } => (NodeKind::ListItem, names::LIST_ITEM, Some((keys::LIST_TYPE, list_type.clone()))),
    };

    model.change(ChangeOrigin::User, |w| {
        for block in &blocks {
            w.remove_attribute(*block, keys::HEADING_LEVEL)?;
            w.remove_attribute(*block, keys::LIST_TYPE)?;
            w.rename(*block, kind, name)?;
            if let Some((key, value)) = &extra {
                w.set_attribute(*block, key, value.as_str())?;
            }
        }
        Ok(())
    })?;
    Ok(CommandOutcome::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_policy::PolicyConfig;

    fn model_with(blocks: Vec<Fragment>) -> Model {
        let mut model = Model::new();
        let root = model.root();
        model
            .change(ChangeOrigin::Load, |w| {
                for (i, block) in blocks.into_iter().enumerate() {
                    w.insert(root, i, block)?;
                }
                Ok(())
            })
            .unwrap();
        model.take_batches();
        model
    }

    fn run(model: &mut Model, command: Command) -> EditorResult<CommandOutcome> {
        execute(model, &command, &PolicyRegistry::default())
    }

    fn block(model: &Model, index: usize) -> NodeId {
        model.children(model.root())[index]
    }

    #[test]
    fn test_enter_moves_caret_to_new_block() {
        let mut model = model_with(vec![Fragment::paragraph().with_child(Fragment::text("hello"))]);
        let paragraph = block(&model, 0);
        model.set_selection(Selection::caret(Position::new(paragraph, 2)));

        run(&mut model, Command::Enter).unwrap();

        let second = block(&model, 1);
        assert_eq!(model.text_content(paragraph), "he");
        assert_eq!(model.text_content(second), "llo");
        assert_eq!(model.selection().first_position(), Some(Position::new(second, 0)));
    }

    #[test]
    fn test_link_on_range_merges_runs() {
        let mut model = model_with(vec![Fragment::paragraph().with_child(Fragment::text("click here"))]);
        let paragraph = block(&model, 0);
        model.set_selection(Selection::from_range(Range::new(paragraph, 6, 10)));

        run(&mut model, Command::InsertLink(LinkValues::href("https://a.test"))).unwrap();
        model.set_selection(Selection::from_range(Range::new(paragraph, 8, 10)));
        run(&mut model, Command::InsertLink(LinkValues::href("https://a.test"))).unwrap();

        let children = model.children(paragraph);
        assert_eq!(children.len(), 2);
        let link = model.get(children[1]).unwrap();
        assert_eq!(link.data, "here");
        assert_eq!(link.attribute_str(keys::LINK_HREF), Some("https://a.test"));
    }

    #[test]
    fn test_collapsed_link_inserts_href_text() {
        let mut model = model_with(vec![Fragment::paragraph().with_child(Fragment::text("go "))]);
        let paragraph = block(&model, 0);
        model.set_selection(Selection::caret(Position::new(paragraph, 3)));

        run(&mut model, Command::InsertLink(LinkValues::href("https://b.test"))).unwrap();

        assert_eq!(model.text_content(paragraph), "go https://b.test");
        let link = model.get(model.children(paragraph)[1]).unwrap();
        assert_eq!(link.attribute_str(keys::LINK_HREF), Some("https://b.test"));
    }

    #[test]
    fn test_caret_inside_link_edits_whole_link() {
        let mut model = model_with(vec![Fragment::paragraph()
            .with_child(Fragment::text("a "))
            .with_child(
                Fragment::text("link")
                    .with_attr(keys::LINK_HREF, "https://old.test")
                    .with_attr(keys::LINK_TITLE, "Old"),
            )]);
        let paragraph = block(&model, 0);
        model.set_selection(Selection::caret(Position::new(paragraph, 4)));

        run(&mut model, Command::InsertLink(LinkValues::href("https://new.test"))).unwrap();

        let link = model.get(model.children(paragraph)[1]).unwrap();
        assert_eq!(link.data, "link");
        assert_eq!(link.attribute_str(keys::LINK_HREF), Some("https://new.test"));
        assert!(link.attribute(keys::LINK_TITLE).is_none());

        run(&mut model, Command::RemoveLink).unwrap();
        assert_eq!(model.children(paragraph).len(), 1);
    }

    #[test]
    fn test_remove_link_from_selected_embed() {
        let mut model = model_with(vec![Fragment::embed_block("4").with_attr(keys::LINK_HREF, "https://c.test")]);
        let root = model.root();
        model.set_selection(Selection::from_range(Range::new(root, 0, 1)));

        run(&mut model, Command::RemoveLink).unwrap();

        assert!(model.get(block(&model, 0)).unwrap().attribute(keys::LINK_HREF).is_none());
    }

    #[test]
    fn test_insert_block_embed_after_context_block() {
        let mut model = model_with(vec![
            Fragment::paragraph().with_child(Fragment::text("a")),
            Fragment::paragraph().with_child(Fragment::text("b")),
        ]);
        let first = block(&model, 0);
        model.set_selection(Selection::caret(Position::new(first, 1)));

        let outcome = run(
            &mut model,
            Command::InsertEmbed {
                external_id: "42".to_string(),
                inline: false,
            },
        )
        .unwrap();

        let embed = block(&model, 1);
        assert_eq!(outcome.pending[0].node, embed);
        assert_eq!(model.selected_element(), Some(embed));
        let node = model.get(embed).unwrap();
        assert_eq!(node.attribute_str(keys::EXTERNAL_ID), Some("42"));
        assert!(node.attribute(keys::DISPLAY_NAME).is_none());
    }

    #[test]
    fn test_empty_embed_reference_is_rejected() {
        let mut model = model_with(vec![Fragment::paragraph()]);
        let err = run(
            &mut model,
            Command::InsertEmbed {
                external_id: " ".to_string(),
                inline: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, crate::EditorError::Validation(ValidationError::EmptyReference)));
        assert!(model.take_batches().is_empty());
    }

    #[test]
    fn test_anchor_applies_to_whole_list() {
        let mut model = model_with(vec![
            Fragment::list_item("bulleted").with_child(Fragment::text("one")),
            Fragment::list_item("bulleted").with_child(Fragment::text("two")),
            Fragment::list_item("numbered").with_child(Fragment::text("other")),
        ]);
        let second = block(&model, 1);
        model.set_selection(Selection::caret(Position::new(second, 0)));

        run(&mut model, Command::SetAnchor { anchor: "steps".to_string() }).unwrap();

        assert_eq!(model.find_by_anchor("steps"), vec![block(&model, 0), second]);
    }

    #[test]
    fn test_duplicate_anchor_is_rejected() {
        let mut model = model_with(vec![
            Fragment::heading(1).with_attr(keys::ANCHOR, "top").with_child(Fragment::text("t")),
            Fragment::paragraph().with_child(Fragment::text("p")),
        ]);
        let paragraph = block(&model, 1);
        model.set_selection(Selection::caret(Position::new(paragraph, 0)));

        let err = run(&mut model, Command::SetAnchor { anchor: "top".to_string() }).unwrap_err();

        assert!(matches!(err, crate::EditorError::Validation(ValidationError::DuplicateAnchor(_))));
        assert!(model.get(paragraph).unwrap().anchor().is_none());
    }

    #[test]
    fn test_anchor_of_another_list_is_rejected() {
        let mut model = model_with(vec![
            Fragment::list_item("bulleted")
                .with_attr(keys::ANCHOR, "steps")
                .with_child(Fragment::text("one")),
            Fragment::paragraph().with_child(Fragment::text("between")),
            Fragment::list_item("bulleted").with_child(Fragment::text("two")),
        ]);
        let item = block(&model, 2);
        model.set_selection(Selection::caret(Position::new(item, 0)));

        let err = run(&mut model, Command::SetAnchor { anchor: "steps".to_string() }).unwrap_err();

        assert!(matches!(err, crate::EditorError::Validation(ValidationError::DuplicateAnchor(_))));
        assert_eq!(model.find_by_anchor("steps"), vec![block(&model, 0)]);
    }

    #[test]
    fn test_invalid_custom_attribute_writes_nothing() {
        let config = PolicyConfig::from_json(
            r#"{"customAttributes": {"paragraph": {"data-n": {"type": "number"}, "data-b": {"type": "boolean"}}}}"#,
        )
        .unwrap();
        let policy = PolicyRegistry::new(config);
        let mut model = model_with(vec![Fragment::paragraph().with_child(Fragment::text("p"))]);
        let paragraph = block(&model, 0);
        model.set_selection(Selection::caret(Position::new(paragraph, 0)));

        let mut attributes = BTreeMap::new();
        attributes.insert("data-b".to_string(), "true".to_string());
        attributes.insert("data-n".to_string(), "many".to_string());
        let command = Command::SetCustomAttributes {
            attributes: attributes.clone(),
            classes: None,
        };
        assert!(execute(&mut model, &command, &policy).is_err());
        assert!(model.get(paragraph).unwrap().attribute("custom-attribute:data-b").is_none());

        attributes.insert("data-n".to_string(), "4".to_string());
        let command = Command::SetCustomAttributes { attributes, classes: None };
        execute(&mut model, &command, &policy).unwrap();
        assert_eq!(model.get(paragraph).unwrap().attribute_str("custom-attribute:data-n"), Some("4"));
    }

    #[test]
    fn test_block_type_change_drops_old_keys() {
        let mut model = model_with(vec![Fragment::heading(3).with_child(Fragment::text("h"))]);
        let heading = block(&model, 0);
        model.set_selection(Selection::caret(Position::new(heading, 0)));

        run(
            &mut model,
            Command::SetBlockType {
                block_type: BlockType::ListItem {
                    list_type: "numbered".to_string(),
                },
            },
        )
        .unwrap();

        let node = model.get(heading).unwrap();
        assert_eq!(node.kind, NodeKind::ListItem);
        assert!(node.attribute(keys::HEADING_LEVEL).is_none());
        assert_eq!(node.attribute_str(keys::LIST_TYPE), Some("numbered"));
    }

    #[test]
    fn test_command_json_shape() {
        let command: Command =
            serde_json::from_str(r#"{"command": "insertEmbed", "externalId": "9", "inline": true}"#).unwrap();
        assert_eq!(
            command,
            Command::InsertEmbed {
                external_id: "9".to_string(),
                inline: true
            }
        );
    }
}
