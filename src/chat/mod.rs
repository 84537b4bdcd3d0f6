//! Chat state for the Halldyll chat client.
//!
//! - `core`: identifiers, errors, configuration and the model/purpose catalog
//! - `message` / `conversation`: the persisted data model
//! - `tokens`: token-count estimation
//! - `store`: the conversation store and its invariants
//! - `events`: change notifications
//! - `snapshot`: `SQLite` snapshot persistence and JSON export/import

pub mod conversation;
pub mod core;
pub mod events;
pub mod message;
pub mod snapshot;
pub mod store;
pub mod tokens;

pub use conversation::{Conversation, MISSING_CONVERSATION_NAME};
pub use core::{
    ChatConfig, ChatError, ChatModelId, ChatResult, ConversationId, LocaleId, MessageId,
    PurposeCatalog, SystemPurposeId,
};
pub use events::{EventBus, StoreEvent};
pub use message::{Message, MessagePatch, Role};
pub use snapshot::{
    ChatSnapshot, SnapshotStore, SqliteSnapshotStore, export_conversation_json,
    import_conversation_json, load_store, save_store,
};
pub use store::{ActiveConfiguration, ChatStore, ConversationName};
pub use tokens::{HeuristicCounter, TokenCounter, update_token_count};
