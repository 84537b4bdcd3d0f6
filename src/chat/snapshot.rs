//! Snapshot persistence for the chat store, plus single-conversation JSON export/import.
//!
//! The whole store is serialized as one JSON document under a key
//! (`app-chats` by default) in a small `SQLite` key-value table.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::chat::conversation::Conversation;
use crate::chat::core::config::{StorageConfig, check_table_name};
use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::ConversationId;
use crate::chat::message::now_ms;
use crate::chat::store::ChatStore;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Boxed future type for snapshot store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Serialized store state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    /// Format version.
    pub version: u32,
    /// Conversations, newest first.
    pub conversations: Vec<Conversation>,
    /// Active conversation.
    pub active_conversation_id: Option<ConversationId>,
}

/// Key-value backend for snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot stored under `key`.
    ///
    /// # Errors
    /// Returns an error if storage access or decoding fails.
    fn load(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<ChatSnapshot>>>;

    /// Save a snapshot under `key`, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if storage access or encoding fails.
    fn save(&self, key: &str, snapshot: &ChatSnapshot) -> StoreFuture<'_, ChatResult<()>>;

    /// Remove the snapshot under `key`. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove(&self, key: &str) -> StoreFuture<'_, ChatResult<bool>>;
}

/// `SQLite` implementation of the snapshot store.
pub struct SqliteSnapshotStore {
    conn: Connection,
    table: String,
}

impl SqliteSnapshotStore {
    /// Open (or create) the database configured in `config`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> ChatResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::init(conn, config.table.clone()).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub async fn open_in_memory(table: &str) -> ChatResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn, table.to_string()).await
    }

    async fn init(conn: Connection, table: String) -> ChatResult<Self> {
        check_table_name(&table)?;
        let table_name = table.clone();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<ChatSnapshot>>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();

            let raw = self
                .conn
                .call(move |conn| {
                    let value: Option<String> = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE key = ?1"),
                            rusqlite::params![key],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(value)
                })
                .await?;

            match raw {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn save(&self, key: &str, snapshot: &ChatSnapshot) -> StoreFuture<'_, ChatResult<()>> {
        let key = key.to_string();
        let encoded = serde_json::to_string(snapshot);
        Box::pin(async move {
            let table = self.table.clone();
            let value = encoded?;
            let updated_at = now_ms();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table} (key, value, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![key, value, updated_at],
                    )?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_, ChatResult<bool>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();

            let removed = self
                .conn
                .call(move |conn| {
                    let rows = conn.execute(
                        &format!("DELETE FROM {table} WHERE key = ?1"),
                        rusqlite::params![key],
                    )?;
                    Ok(rows > 0)
                })
                .await?;

            Ok(removed)
        })
    }
}

/// Restore `store` from the snapshot under `key`. Returns whether one was found.
///
/// # Errors
/// Returns an error if loading fails or the snapshot version is unsupported.
pub async fn load_store(
    store: &mut ChatStore,
    backend: &dyn SnapshotStore,
    key: &str,
) -> ChatResult<bool> {
    match backend.load(key).await? {
        Some(snapshot) => {
            store.restore(snapshot)?;
            Ok(true)
        }
        None => {
            debug!("No snapshot under key {}", key);
            Ok(false)
        }
    }
}

/// Save the current state of `store` under `key`.
///
/// # Errors
/// Returns an error if saving fails.
pub async fn save_store(store: &ChatStore, backend: &dyn SnapshotStore, key: &str) -> ChatResult<()> {
    let snapshot = store.snapshot();
    backend.save(key, &snapshot).await?;
    debug!(
        "Saved {} conversation(s) under key {}",
        snapshot.conversations.len(),
        key
    );
    Ok(())
}

/// File name used when exporting a conversation.
#[must_use]
pub fn conversation_filename(id: ConversationId) -> String {
    format!("conversation-{id}.json")
}

/// Write one conversation as pretty JSON into `dir`.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn export_conversation_json(conversation: &Conversation, dir: &Path) -> ChatResult<PathBuf> {
    let path = dir.join(conversation_filename(conversation.id));
    let json = serde_json::to_string_pretty(conversation)?;
    std::fs::write(&path, json)?;
    info!("Exported conversation {} to {}", conversation.id, path.display());
    Ok(path)
}

/// Read a conversation exported with [`export_conversation_json`] and add it to `store`.
///
/// Token counts are recalculated. A conversation whose id is already present
/// gets a fresh id.
///
/// # Errors
/// Returns an error if reading or decoding fails.
pub fn import_conversation_json(store: &mut ChatStore, path: &Path) -> ChatResult<ConversationId> {
    let raw = std::fs::read_to_string(path)?;
    let mut conversation: Conversation = serde_json::from_str(&raw)?;

    if conversation.id.is_nil() || store.conversation(conversation.id).is_some() {
        conversation.id = ConversationId::new();
    }
    for message in &mut conversation.messages {
        message.token_count = 0;
    }

    let id = conversation.id;
    store.add_conversation(conversation)?;
    info!("Imported conversation {} from {}", id, path.display());
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::config::ChatConfig;
    use crate::chat::core::errors::ChatError;
    use crate::chat::message::Message;

    fn store_with_messages() -> (ChatStore, ConversationId) {
        let mut store = ChatStore::new(&ChatConfig::default());
        let id = store.conversations()[0].id;
        store.append_message(id, Message::user("abcdefgh")).unwrap();
        store.append_message(id, Message::assistant("abcd")).unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let backend = SqliteSnapshotStore::open_in_memory("kv_snapshots")
            .await
            .unwrap();
        let (store, id) = store_with_messages();
        save_store(&store, &backend, "app-chats").await.unwrap();

        let mut fresh = ChatStore::new(&ChatConfig::default());
        assert!(load_store(&mut fresh, &backend, "app-chats").await.unwrap());
        assert_eq!(fresh.active_conversation_id(), Some(id));
        assert_eq!(fresh.conversation(id).unwrap().token_count, 3);
    }

    #[tokio::test]
    async fn test_missing_key_and_remove() {
        let backend = SqliteSnapshotStore::open_in_memory("kv_snapshots")
            .await
            .unwrap();
        assert!(backend.load("app-chats").await.unwrap().is_none());

        let (store, _) = store_with_messages();
        backend.save("app-chats", &store.snapshot()).await.unwrap();
        assert!(backend.remove("app-chats").await.unwrap());
        assert!(!backend.remove("app-chats").await.unwrap());
    }

    #[tokio::test]
    async fn test_unsafe_table_name_rejected() {
        let opened = SqliteSnapshotStore::open_in_memory("kv; DROP TABLE users").await;
        assert!(matches!(opened, Err(ChatError::InvalidConfig(_))));

        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            sqlite_path: dir.path().join("chats.sqlite"),
            table: String::new(),
            ..StorageConfig::default()
        };
        assert!(SqliteSnapshotStore::new(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            sqlite_path: dir.path().join("chats.sqlite"),
            ..StorageConfig::default()
        };
        let (store, id) = store_with_messages();
        {
            let backend = SqliteSnapshotStore::new(&config).await.unwrap();
            save_store(&store, &backend, &config.snapshot_key)
                .await
                .unwrap();
        }

        let backend = SqliteSnapshotStore::new(&config).await.unwrap();
        let snapshot = backend.load(&config.snapshot_key).await.unwrap().unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.conversations[0].id, id);
    }

    #[test]
    fn test_export_then_import_gets_fresh_id() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, id) = store_with_messages();
        let conversation = store.conversation(id).unwrap().clone();

        let path = export_conversation_json(&conversation, dir.path()).unwrap();
        assert!(path.ends_with(conversation_filename(id)));

        let imported = import_conversation_json(&mut store, &path).unwrap();
        assert_ne!(imported, id);
        assert_eq!(store.conversations().len(), 2);
        assert_eq!(store.conversations()[0].id, imported);
        assert_eq!(store.conversation(imported).unwrap().token_count, 3);
    }
}
