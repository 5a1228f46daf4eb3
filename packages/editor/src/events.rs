//! Notifications for code outside the editor.

use richtext_model::NodeId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Asks the host to attach an actions menu to a resolved embed preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedMenuRequest {
    pub node: NodeId,
    pub external_id: String,
    pub location_id: Option<String>,
    pub language_codes: Vec<String>,
    pub attachment_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EditorEvent {
    EmbedMenuRequested(EmbedMenuRequest),
    ViewRendered { version: u64 },
}

/// Fan-out of editor events. Subscribers that dropped their receiver are
/// forgotten on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<UnboundedSender<EditorEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<EditorEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: EditorEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let mut kept = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(EditorEvent::ViewRendered { version: 3 });

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap(), EditorEvent::ViewRendered { version: 3 });
    }
}
