//! Configuration for the chat store, snapshot storage and renderer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chat::core::catalog::{ChatModelId, LocaleId, SystemPurposeId};
use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable overriding the snapshot database path.
pub const ENV_DB_PATH: &str = "HALLDYLL_CHAT_DB";
/// Environment variable toggling Markdown rendering (`0`/`false` to disable).
pub const ENV_MARKDOWN: &str = "HALLDYLL_CHAT_MARKDOWN";
/// Environment variable selecting the highlight theme.
pub const ENV_THEME: &str = "HALLDYLL_CHAT_THEME";

/// Check that `table` is safe to format into SQL as a table name.
///
/// # Errors
/// Returns `InvalidConfig` unless the name is non-empty ASCII alphanumerics and `_`.
pub fn check_table_name(table: &str) -> ChatResult<()> {
    if table.is_empty() || !table.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(ChatError::InvalidConfig(format!(
            "storage.table must be a plain identifier, got {table:?}"
        )));
    }
    Ok(())
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Store behaviour and defaults for new conversations.
    pub store: StoreConfig,
    /// Snapshot storage settings.
    pub storage: StorageConfig,
    /// Message rendering settings.
    pub render: RenderConfig,
    /// Token estimation settings.
    pub tokens: TokenConfig,
}

impl ChatConfig {
    /// Load a JSON config file, falling back to defaults for missing fields.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> ChatResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(flag) = lookup(ENV_MARKDOWN) {
            self.render.render_markdown = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        if let Some(theme) = lookup(ENV_THEME).filter(|t| !t.trim().is_empty()) {
            self.render.highlight_theme = theme;
        }
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.store.max_conversations == 0 {
            return Err(ChatError::InvalidConfig(
                "store.max_conversations must be > 0".to_string(),
            ));
        }

        if self.store.event_capacity == 0 {
            return Err(ChatError::InvalidConfig(
                "store.event_capacity must be > 0".to_string(),
            ));
        }

        check_table_name(&self.storage.table)?;

        if self.storage.snapshot_key.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.snapshot_key must not be empty".to_string(),
            ));
        }

        if self.render.collapse_after_lines == 0 {
            return Err(ChatError::InvalidConfig(
                "render.collapse_after_lines must be > 0".to_string(),
            ));
        }

        if self.render.markdown_cache_capacity == 0 {
            return Err(ChatError::InvalidConfig(
                "render.markdown_cache_capacity must be > 0".to_string(),
            ));
        }

        if !(self.tokens.chars_per_token.is_finite() && self.tokens.chars_per_token > 0.0) {
            return Err(ChatError::InvalidConfig(
                "tokens.chars_per_token must be a positive number".to_string(),
            ));
        }

        Ok(())
    }
}

/// Store behaviour and defaults for new conversations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of conversations kept; the oldest are dropped.
    pub max_conversations: usize,
    /// Name given to new conversations.
    pub default_name: String,
    /// Purpose for new conversations.
    pub default_purpose: SystemPurposeId,
    /// Model for new conversations.
    pub default_model: ChatModelId,
    /// Locale for new conversations.
    pub default_locale: LocaleId,
    /// Buffered store events per subscriber.
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_conversations: 20,
            default_name: "Conversation".to_string(),
            default_purpose: SystemPurposeId::default(),
            default_model: ChatModelId::default(),
            default_locale: LocaleId::default(),
            event_capacity: 256,
        }
    }
}

/// Snapshot storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Key-value table name.
    pub table: String,
    /// Key under which the store snapshot is kept.
    pub snapshot_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("chats.sqlite"),
            table: "kv_snapshots".to_string(),
            snapshot_key: "app-chats".to_string(),
        }
    }
}

/// Avatar density.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZenMode {
    /// Avatars shown.
    #[default]
    Clean,
    /// Avatars hidden.
    Cleaner,
}

/// Message rendering settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Avatar density.
    pub zen_mode: ZenMode,
    /// Render non-system text blocks as Markdown.
    pub render_markdown: bool,
    /// Offer the "speak" action.
    pub speech_enabled: bool,
    /// User messages with more lines than this are collapsed.
    pub collapse_after_lines: usize,
    /// Syntect theme used for the exported stylesheet.
    pub highlight_theme: String,
    /// Entries kept in the Markdown render cache.
    pub markdown_cache_capacity: usize,
    /// Avatar shown while the assistant is typing.
    pub typing_avatar_url: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            zen_mode: ZenMode::Clean,
            render_markdown: true,
            speech_enabled: false,
            collapse_after_lines: 10,
            highlight_theme: "InspiredGitHub".to_string(),
            markdown_cache_capacity: 256,
            typing_avatar_url: "https://i.giphy.com/media/jJxaUysjzO9ri/giphy.webp".to_string(),
        }
    }
}

/// Token estimation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Average characters per token.
    pub chars_per_token: f32,
    /// Ratio overrides keyed by model id prefix.
    pub model_overrides: HashMap<String, f32>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            chars_per_token: 4.0,
            model_overrides: HashMap::new(),
        }
    }
}
