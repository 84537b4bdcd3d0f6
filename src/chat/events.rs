//! Change notifications emitted by the chat store.
//!
//! Message events fire at streaming frequency (one per received chunk), so
//! subscribers that only render the sidebar should ignore them.

use tokio::sync::broadcast;

use crate::chat::core::ids::{ConversationId, MessageId};

/// A change applied to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// A conversation was added at the front of the list.
    ConversationAdded(ConversationId),
    /// A conversation was removed.
    ConversationDeleted(ConversationId),
    /// The active conversation changed.
    ActiveChanged(Option<ConversationId>),
    /// The message list of a conversation was replaced or truncated.
    MessagesReplaced(ConversationId),
    /// A message was appended.
    MessageAppended {
        /// Conversation that changed.
        conversation_id: ConversationId,
        /// New message.
        message_id: MessageId,
    },
    /// A message was edited or received streamed text.
    MessageEdited {
        /// Conversation that changed.
        conversation_id: ConversationId,
        /// Edited message.
        message_id: MessageId,
    },
    /// A message was deleted.
    MessageDeleted {
        /// Conversation that changed.
        conversation_id: ConversationId,
        /// Deleted message.
        message_id: MessageId,
    },
    /// Model, locale, purpose or title changed.
    SettingsChanged(ConversationId),
    /// The whole state was replaced from a snapshot.
    Restored,
}

impl StoreEvent {
    /// Conversation affected by the event, if any.
    #[must_use]
    pub const fn conversation_id(&self) -> Option<ConversationId> {
        match self {
            Self::ConversationAdded(id)
            | Self::ConversationDeleted(id)
            | Self::MessagesReplaced(id)
            | Self::SettingsChanged(id) => Some(*id),
            Self::ActiveChanged(id) => *id,
            Self::MessageAppended {
                conversation_id, ..
            }
            | Self::MessageEdited {
                conversation_id, ..
            }
            | Self::MessageDeleted {
                conversation_id, ..
            } => Some(*conversation_id),
            Self::Restored => None,
        }
    }

    /// Whether the event changes per-message content.
    #[must_use]
    pub const fn is_message_level(&self) -> bool {
        matches!(
            self,
            Self::MessageAppended { .. } | Self::MessageEdited { .. } | Self::MessageDeleted { .. }
        )
    }
}

/// Broadcast fan-out of store events.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is not an error.
    pub fn emit(&self, event: StoreEvent) {
        let _ = self.sender.send(event);
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
