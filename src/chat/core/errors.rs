//! Error types for the chat state and rendering layers.

use thiserror::Error;

use crate::chat::core::catalog::CatalogIdError;
use crate::chat::core::ids::{ConversationId, MessageId};

/// Chat subsystem error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The referenced conversation is not in the store.
    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),
    /// The referenced message is not in the conversation.
    #[error("message {message_id} not found in conversation {conversation_id}")]
    MessageNotFound {
        /// Conversation that was searched.
        conversation_id: ConversationId,
        /// Message that was not found.
        message_id: MessageId,
    },
    /// Invalid identifier or catalog value.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// Snapshot written by an unknown schema version.
    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedSnapshot {
        /// Version found in storage.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
    /// Invalid model, locale or purpose identifier.
    #[error("invalid catalog id: {0}")]
    Catalog(#[from] CatalogIdError),
    /// Syntax highlighting failure.
    #[error("highlight error: {0}")]
    Highlight(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Identifier parse error.
    #[error("invalid identifier: {0}")]
    Id(#[from] uuid::Error),
    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
