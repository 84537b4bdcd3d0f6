//! Message model: a single turn sent or received by humans or bots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::catalog::SystemPurposeId;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::MessageId;

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Model output.
    Assistant,
    /// System prompt.
    System,
    /// Human input.
    User,
}

impl Role {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::User => "user",
        }
    }

    /// Pretty sender name used when none is given.
    #[must_use]
    pub const fn default_sender(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant | Self::System => "Bot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            _ => Err(ChatError::InvalidValue(format!("unknown role: {value}"))),
        }
    }
}

/// A message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Message body (Markdown with fenced code).
    pub text: String,
    /// Pretty sender name.
    pub sender: String,
    /// Optional avatar image URL.
    pub avatar: Option<String>,
    /// Still receiving streamed tokens.
    pub typing: bool,
    /// Author role.
    pub role: Role,
    /// Purpose active when an assistant/system message was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_id: Option<SystemPurposeId>,
    /// Model that generated an assistant message; may be outside the catalog.
    #[serde(default, rename = "originLLM", skip_serializing_if = "Option::is_none")]
    pub origin_llm: Option<String>,
    /// Cached token count for the conversation model (0 = not yet calculated).
    pub token_count: u32,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created: i64,
    /// Last edit timestamp in milliseconds since Unix epoch.
    pub updated: Option<i64>,
}

impl Message {
    /// Create a message for `role` with default sender and no avatar.
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            sender: role.default_sender().to_string(),
            avatar: None,
            typing: false,
            role,
            purpose_id: None,
            origin_llm: None,
            token_count: 0,
            created: now_ms(),
            updated: None,
        }
    }

    /// User message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// System message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Set the typing flag.
    #[must_use]
    pub const fn with_typing(mut self, typing: bool) -> Self {
        self.typing = typing;
        self
    }

    /// Tag with the purpose it was produced under.
    #[must_use]
    pub const fn with_purpose(mut self, purpose_id: SystemPurposeId) -> Self {
        self.purpose_id = Some(purpose_id);
        self
    }

    /// Tag with the model that produced it.
    #[must_use]
    pub fn with_origin_llm(mut self, model: impl Into<String>) -> Self {
        self.origin_llm = Some(model.into());
        self
    }

    /// Attach an avatar image.
    ///
    /// # Errors
    /// Returns an error if `url` is not an absolute URL.
    pub fn with_avatar(mut self, url: &str) -> ChatResult<Self> {
        self.avatar = Some(Url::parse(url)?.to_string());
        Ok(self)
    }

    /// Whether the message was edited after creation.
    #[must_use]
    pub const fn was_edited(&self) -> bool {
        self.updated.is_some()
    }
}

/// Partial update for a message; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessagePatch {
    /// New text.
    pub text: Option<String>,
    /// New sender name.
    pub sender: Option<String>,
    /// New avatar (`Some(None)` clears it).
    pub avatar: Option<Option<String>>,
    /// New typing flag.
    pub typing: Option<bool>,
    /// New role.
    pub role: Option<Role>,
    /// New purpose tag.
    pub purpose_id: Option<Option<SystemPurposeId>>,
    /// New origin model tag.
    pub origin_llm: Option<Option<String>>,
}

impl MessagePatch {
    /// Patch that replaces the text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Also set the typing flag.
    #[must_use]
    pub const fn with_typing(mut self, typing: bool) -> Self {
        self.typing = Some(typing);
        self
    }

    /// Also set the origin model.
    #[must_use]
    pub fn with_origin_llm(mut self, model: impl Into<String>) -> Self {
        self.origin_llm = Some(Some(model.into()));
        self
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the patch into `message`.
    pub fn apply_to(&self, message: &mut Message) {
        if let Some(text) = &self.text {
            message.text.clone_from(text);
        }
        if let Some(sender) = &self.sender {
            message.sender.clone_from(sender);
        }
        if let Some(avatar) = &self.avatar {
            message.avatar.clone_from(avatar);
        }
        if let Some(typing) = self.typing {
            message.typing = typing;
        }
        if let Some(role) = self.role {
            message.role = role;
        }
        if let Some(purpose_id) = self.purpose_id {
            message.purpose_id = purpose_id;
        }
        if let Some(origin_llm) = &self.origin_llm {
            message.origin_llm.clone_from(origin_llm);
        }
    }
}
