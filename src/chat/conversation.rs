//! Conversation model: an ordered thread of messages plus its model/purpose selection.

use serde::{Deserialize, Serialize};

use crate::chat::core::catalog::{ChatModelId, LocaleId, SystemPurposeId};
use crate::chat::core::config::StoreConfig;
use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::message::{Message, now_ms};

/// Name of the placeholder returned when no conversation is active.
pub const MISSING_CONVERSATION_NAME: &str = "Missing Conversation";

/// A list of messages between humans and bots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier.
    pub id: ConversationId,
    /// Display name.
    pub name: String,
    /// Messages in insertion order.
    pub messages: Vec<Message>,
    /// Selected purpose.
    pub system_purpose_id: SystemPurposeId,
    /// Selected model.
    pub chat_model_id: ChatModelId,
    /// Selected locale.
    pub locale_id: LocaleId,
    /// Title set by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_title: Option<String>,
    /// Title generated automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_title: Option<String>,
    /// Sum of the message token counts.
    pub token_count: u32,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created: i64,
    /// Last change timestamp in milliseconds since Unix epoch.
    pub updated: Option<i64>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(
        id: ConversationId,
        name: impl Into<String>,
        system_purpose_id: SystemPurposeId,
        chat_model_id: ChatModelId,
        locale_id: LocaleId,
    ) -> Self {
        let now = now_ms();
        Self {
            id,
            name: name.into(),
            messages: Vec::new(),
            system_purpose_id,
            chat_model_id,
            locale_id,
            user_title: None,
            auto_title: None,
            token_count: 0,
            created: now,
            updated: Some(now),
        }
    }

    /// Create an empty conversation with the configured defaults.
    #[must_use]
    pub fn with_defaults(config: &StoreConfig) -> Self {
        Self::new(
            ConversationId::new(),
            config.default_name.clone(),
            config.default_purpose,
            config.default_model.clone(),
            config.default_locale.clone(),
        )
    }

    /// Placeholder shown when the active conversation cannot be found.
    #[must_use]
    pub fn missing(config: &StoreConfig) -> Self {
        Self::new(
            ConversationId::missing(),
            MISSING_CONVERSATION_NAME,
            config.default_purpose,
            config.default_model.clone(),
            config.default_locale.clone(),
        )
    }

    /// Title to display: user title, else automatic title, else name.
    #[must_use]
    pub fn title(&self) -> &str {
        self.user_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.auto_title.as_deref().filter(|t| !t.trim().is_empty()))
            .unwrap_or(&self.name)
    }

    /// Position of a message.
    #[must_use]
    pub fn position(&self, message_id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    /// Borrow a message.
    #[must_use]
    pub fn message(&self, message_id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    /// Sum of cached message token counts.
    #[must_use]
    pub fn sum_token_counts(&self) -> u32 {
        self.messages
            .iter()
            .fold(0_u32, |sum, m| sum.saturating_add(m.token_count))
    }

    /// Re-derive the aggregate token count from the messages.
    pub fn refresh_token_count(&mut self) {
        self.token_count = self.sum_token_counts();
    }
}
