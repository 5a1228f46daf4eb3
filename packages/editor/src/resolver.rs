//! # Reference Resolution
//!
//! Embeds are created holding only an external id. Filling in their display
//! data is the resolver's job and happens out of band:
//!
//! ```text
//! editor ──resolve(credentials, id, callback)──▶ resolver
//!    ▲                                              │
//!    └──── mpsc ◀── callback.complete(results) ─────┘
//! ```
//!
//! The callback is consumed by `complete`, so it fires at most once. A
//! resolver that finds nothing simply drops it.

use crate::config::Credentials;
use async_trait::async_trait;
use richtext_model::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Display data for one external content item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContent {
    #[serde(default)]
    pub external_id: String,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub language_codes: Vec<String>,
}

/// Result posted back to the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub node: NodeId,
    pub external_id: String,
    pub results: Vec<ResolvedContent>,
}

/// One-shot completion handle for a resolve request.
#[derive(Debug)]
pub struct ResolutionCallback {
    node: NodeId,
    external_id: String,
    sender: UnboundedSender<Resolution>,
}

impl ResolutionCallback {
    pub fn new(node: NodeId, external_id: impl Into<String>, sender: UnboundedSender<Resolution>) -> Self {
        Self {
            node,
            external_id: external_id.into(),
            sender,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn complete(self, results: Vec<ResolvedContent>) {
        let resolution = Resolution {
            node: self.node,
            external_id: self.external_id,
            results,
        };
        if self.sender.send(resolution).is_err() {
            debug!(node = %self.node, "editor closed before resolution arrived");
        }
    }
}

pub trait ReferenceResolver: Send + Sync {
    /// Start resolving `external_id`. Must not block; completion (if any)
    /// goes through `callback`.
    fn resolve(&self, credentials: &Credentials, external_id: &str, callback: ResolutionCallback);
}

/// Resolver backed by a fixed table; completes synchronously.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, ResolvedContent>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, content: ResolvedContent) -> Self {
        self.entries.insert(content.external_id.clone(), content);
        self
    }

    /// Parse a fixture file: an object keyed by external id.
    ///
    /// ```json
    /// { "42": { "name": "Foo", "locationId": "7", "languageCodes": ["eng-GB"] } }
    /// ```
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, ResolvedContent> = serde_json::from_str(source)?;
        let entries = raw
            .into_iter()
            .map(|(id, mut content)| {
                content.external_id = id.clone();
                (id, content)
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let source = std::fs::read_to_string(path).map_err(|e| LookupError::Failed(e.to_string()))?;
        Self::from_json(&source).map_err(|e| LookupError::Failed(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferenceResolver for StaticResolver {
    fn resolve(&self, _credentials: &Credentials, external_id: &str, callback: ResolutionCallback) {
        match self.entries.get(external_id) {
            Some(content) => callback.complete(vec![content.clone()]),
            None => warn!(external_id, node = %callback.node(), "no content found for embed"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("Lookup failed: {0}")]
    Failed(String),

    #[error("Access denied")]
    Unauthorized,
}

/// Async content search, typically a remote API.
#[async_trait]
pub trait ContentLookup: Send + Sync {
    async fn find_content(&self, credentials: &Credentials, external_id: &str) -> Result<Vec<ResolvedContent>, LookupError>;
}

/// Adapts a [`ContentLookup`] to the fire-and-forget resolver interface by
/// spawning each lookup on a tokio runtime.
pub struct LookupResolver<L> {
    lookup: Arc<L>,
    runtime: Handle,
}

impl<L: ContentLookup + 'static> LookupResolver<L> {
    pub fn new(lookup: L, runtime: Handle) -> Self {
        Self {
            lookup: Arc::new(lookup),
            runtime,
        }
    }

    /// Use the runtime of the calling context.
    pub fn current(lookup: L) -> Self {
        Self::new(lookup, Handle::current())
    }
}

impl<L: ContentLookup + 'static> ReferenceResolver for LookupResolver<L> {
    fn resolve(&self, credentials: &Credentials, external_id: &str, callback: ResolutionCallback) {
        let lookup = Arc::clone(&self.lookup);
        let credentials = credentials.clone();
        let external_id = external_id.to_string();

        self.runtime.spawn(async move {
            match lookup.find_content(&credentials, &external_id).await {
                Ok(results) if !results.is_empty() => callback.complete(results),
                Ok(_) => warn!(external_id, "lookup returned no content"),
                Err(err) => warn!(external_id, error = %err, "lookup failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_static_resolver_fires_once_when_found() {
        let resolver = StaticResolver::from_json(r#"{"42": {"name": "Foo", "locationId": "7"}}"#).unwrap();
        let (tx, mut rx) = unbounded_channel();

        resolver.resolve(&Credentials::default(), "42", ResolutionCallback::new(NodeId(3), "42", tx.clone()));
        resolver.resolve(&Credentials::default(), "99", ResolutionCallback::new(NodeId(4), "99", tx));

        let resolution = rx.try_recv().unwrap();
        assert_eq!(resolution.node, NodeId(3));
        assert_eq!(resolution.results[0].display_name, "Foo");
        assert_eq!(resolution.results[0].external_id, "42");
        assert!(rx.try_recv().is_err());
    }

    struct FailingLookup;

    #[async_trait]
    impl ContentLookup for FailingLookup {
        async fn find_content(&self, _: &Credentials, _: &str) -> Result<Vec<ResolvedContent>, LookupError> {
            Err(LookupError::Unauthorized)
        }
    }

    #[tokio::test]
    async fn test_failed_lookup_never_completes() {
        let resolver = LookupResolver::current(FailingLookup);
        let (tx, mut rx) = unbounded_channel();

        resolver.resolve(&Credentials::default(), "1", ResolutionCallback::new(NodeId(1), "1", tx));

        // The spawned task drops the callback, closing the channel.
        assert!(rx.recv().await.is_none());
    }
}
