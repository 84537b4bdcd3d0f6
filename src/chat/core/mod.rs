//! Core chat types: identifiers, errors, configuration and catalogs.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod ids;

pub use catalog::{
    CHAT_MODELS, CatalogIdError, ChatModel, ChatModelId, LocaleId, PurposeCatalog, SystemPurpose,
    SystemPurposeId, chat_model, pretty_base_model,
};
pub use config::{ChatConfig, RenderConfig, StorageConfig, StoreConfig, TokenConfig, ZenMode};
pub use errors::{ChatError, ChatResult};
pub use ids::{ConversationId, MessageId};
