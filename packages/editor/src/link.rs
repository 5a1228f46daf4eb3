//! # Link Lifecycle
//!
//! ```text
//!            add_link                      save
//!  Absent ─────────────▶ EditingNew ───────────────▶ Committed
//!    ▲                      │ close (rollback)          │ click
//!    │◀─────────────────────┘                           ▼
//!    │◀──────────── remove ──────────────────── EditingExisting
//!                                     close / save ─────┘
//! ```
//!
//! The state machine decides what should happen; the editor executes the
//! resulting commands so they go through the normal commit path.

use crate::commands::{Command, LinkValues};
use crate::errors::ValidationError;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use richtext_converter::vocabulary::html;
use richtext_converter::ViewNode;
use richtext_model::{Model, Position};
use richtext_policy::{PolicyRegistry, LINK_ELEMENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Characters left alone inside a query key or value
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkState {
    #[default]
    Absent,
    EditingNew,
    EditingExisting,
    Committed,
}

#[derive(Debug, Clone, Default)]
pub struct LinkUi {
    state: LinkState,
    form: LinkValues,
    error: Option<ValidationError>,
}

impl LinkUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Values shown in the open form
    pub fn form(&self) -> &LinkValues {
        &self.form
    }

    /// Error from the last save attempt, kept for display
    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, LinkState::EditingNew | LinkState::EditingExisting)
    }

    /// Open the form for a new link. Returns the placeholder command.
    pub fn add_link(&mut self, policy: &PolicyRegistry) -> Command {
        self.state = LinkState::EditingNew;
        self.error = None;
        self.form = defaults(policy);
        Command::InsertLink(LinkValues::href(""))
    }

    /// Open the form for the link rendered around `position`, if any.
    pub fn click(&mut self, model: &Model, view: &ViewNode, position: Position, policy: &PolicyRegistry) -> bool {
        let Some(anchor) = rendered_link_at(model, view, position) else {
            return false;
        };

        let mut form = defaults(policy);
        form.href = anchor.attr(html::HREF).unwrap_or_default().to_string();
        if let Some(title) = anchor.attr(html::TITLE) {
            form.title = Some(title.to_string());
        }
        if let Some(target) = anchor.attr(html::TARGET) {
            form.target = Some(target.to_string());
        }
        if let Some(class) = anchor.attr(html::CLASS) {
            form.classes = Some(class.to_string());
        }
        for (key, value) in anchor.attributes().into_iter().flatten() {
            if let Some(name) = key.strip_prefix(html::CUSTOM_ATTRIBUTE_PREFIX) {
                form.attributes.insert(name.to_string(), value.clone());
            }
        }

        debug!(href = %form.href, "editing existing link");
        self.form = form;
        self.error = None;
        self.state = LinkState::EditingExisting;
        true
    }

    /// Validate the submitted values. On success returns the command to run;
    /// call [`LinkUi::committed`] once it has been applied.
    pub fn save(&mut self, values: LinkValues) -> Result<Command, ValidationError> {
        if values.href.trim().is_empty() {
            self.error = Some(ValidationError::EmptyUrl);
            return Err(ValidationError::EmptyUrl);
        }
        let mut values = values;
        values.href = encode_url_query(values.href.trim());
        self.form = values.clone();
        self.error = None;
        Ok(Command::InsertLink(values))
    }

    pub fn committed(&mut self) {
        self.state = LinkState::Committed;
    }

    pub fn remove(&mut self) -> Command {
        self.state = LinkState::Absent;
        self.error = None;
        Command::RemoveLink
    }

    /// Close without saving. A new link is rolled back, which needs the
    /// returned command to run.
    pub fn close(&mut self) -> Option<Command> {
        self.error = None;
        match self.state {
            LinkState::EditingNew => {
                self.state = LinkState::Absent;
                Some(Command::RemoveLink)
            }
            LinkState::EditingExisting => {
                self.state = LinkState::Committed;
                None
            }
            LinkState::Absent | LinkState::Committed => None,
        }
    }
}

fn defaults(policy: &PolicyRegistry) -> LinkValues {
    LinkValues {
        attributes: policy.attribute_defaults(LINK_ELEMENT),
        classes: policy.class_default(LINK_ELEMENT).map(str::to_string),
        ..LinkValues::default()
    }
}

/// The `a[href]` element the text at `position` is rendered in.
pub fn rendered_link_at<'v>(model: &Model, view: &'v ViewNode, position: Position) -> Option<&'v ViewNode> {
    let run = model
        .text_node_at(position)
        .or_else(|| model.node_before(position))
        .or_else(|| model.node_after(position))
        .filter(|id| model.get(*id).is_some_and(|n| n.is_text()))?;

    view.path_to_model(run)?
        .into_iter()
        .rev()
        .find(|n| n.is_tag(html::A) && n.attr(html::HREF).is_some())
}

/// Percent-encode the query string of `url`. Already encoded sequences are
/// decoded first so encoding twice changes nothing.
pub fn encode_url_query(url: &str) -> String {
    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    let Some((base, query)) = rest.split_once('?') else {
        return url.to_string();
    };

    let encoded: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => format!("{}={}", encode_component(key), encode_component(value)),
            None => encode_component(pair),
        })
        .collect();

    let mut out = format!("{}?{}", base, encoded.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn encode_component(component: &str) -> String {
    let decoded = percent_decode_str(component).decode_utf8_lossy();
    utf8_percent_encode(&decoded, QUERY_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_converter::{editing_view, ConversionOptions};
    use richtext_model::{keys, ChangeOrigin, Fragment};
    use richtext_policy::PolicyConfig;

    #[test]
    fn test_query_is_encoded_once() {
        let url = "https://example.com/search?q=a b&lang=fr-FR#top";
        let encoded = encode_url_query(url);
        assert_eq!(encoded, "https://example.com/search?q=a%20b&lang=fr-FR#top");
        assert_eq!(encode_url_query(&encoded), encoded);
        assert_eq!(encode_url_query("https://example.com/plain"), "https://example.com/plain");
    }

    #[test]
    fn test_empty_url_keeps_state_and_error() {
        let mut ui = LinkUi::new();
        ui.add_link(&PolicyRegistry::default());

        let err = ui.save(LinkValues::href("  ")).unwrap_err();

        assert_eq!(err, ValidationError::EmptyUrl);
        assert_eq!(ui.state(), LinkState::EditingNew);
        assert_eq!(ui.error(), Some(&ValidationError::EmptyUrl));
    }

    #[test]
    fn test_close_rolls_back_only_new_links() {
        let mut ui = LinkUi::new();
        ui.add_link(&PolicyRegistry::default());
        assert_eq!(ui.close(), Some(Command::RemoveLink));
        assert_eq!(ui.state(), LinkState::Absent);

        ui.state = LinkState::EditingExisting;
        assert_eq!(ui.close(), None);
        assert_eq!(ui.state(), LinkState::Committed);
    }

    #[test]
    fn test_click_prefills_from_rendered_link() {
        let mut model = Model::new();
        let root = model.root();
        let paragraph = model
            .change(ChangeOrigin::Load, |w| {
                w.insert(
                    root,
                    0,
                    Fragment::paragraph().with_child(Fragment::text("see ")).with_child(
                        Fragment::text("docs")
                            .with_attr(keys::LINK_HREF, "https://docs.test")
                            .with_attr(keys::LINK_TARGET, "_blank")
                            .with_attr(keys::BOLD, "true")
                            .with_attr("linkAttribute:data-track", "yes"),
                    ),
                )
            })
            .unwrap();
        let view = editing_view(&model, &ConversionOptions::default()).unwrap();
        let policy = PolicyRegistry::new(
            PolicyConfig::from_json(r#"{"customClasses": {"link": {"choices": ["btn"], "defaultValue": "btn"}}}"#)
                .unwrap(),
        );

        let mut ui = LinkUi::new();
        assert!(!ui.click(&model, &view, Position::new(paragraph, 2), &policy));
        assert!(ui.click(&model, &view, Position::new(paragraph, 6), &policy));

        assert_eq!(ui.state(), LinkState::EditingExisting);
        assert_eq!(ui.form().href, "https://docs.test");
        assert_eq!(ui.form().target.as_deref(), Some("_blank"));
        assert_eq!(ui.form().classes.as_deref(), Some("btn"));
        assert_eq!(ui.form().attributes.get("data-track").map(String::as_str), Some("yes"));
    }
}
