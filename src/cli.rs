//! Command-line interface over the persisted chat store.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use crate::chat::core::catalog::{ChatModelId, PurposeCatalog, SystemPurposeId};
use crate::chat::core::config::ChatConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::ConversationId;
use crate::chat::message::Message;
use crate::chat::snapshot::{
    SqliteSnapshotStore, export_conversation_json, import_conversation_json, load_store,
    save_store,
};
use crate::chat::store::ChatStore;
use crate::render::view::{MessageRenderer, collapse_text};

/// Author of a message added from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RoleArg {
    /// Human input.
    #[default]
    User,
    /// Model output.
    Assistant,
    /// System prompt.
    System,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "halldyll-chat",
    about = "Manage persisted chat conversations",
    version,
    long_about = None,
)]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a JSON config file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// SQLite database holding the snapshot (overrides config and environment)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List conversations, newest first
    List,
    /// Start a new conversation and make it active
    New {
        /// Title for the conversation
        #[arg(long)]
        title: Option<String>,
        /// Purpose preset (developer, scientist, catalyst, executive, designer, generic, custom)
        #[arg(long, short = 'p')]
        purpose: Option<String>,
        /// Model id, e.g. "gpt-4"
        #[arg(long, short = 'm')]
        model: Option<String>,
    },
    /// Make a conversation active
    Activate {
        /// Conversation id
        id: String,
    },
    /// Delete a conversation
    Delete {
        /// Conversation id
        id: String,
    },
    /// Append a message to a conversation
    Send {
        /// Message text
        text: String,
        /// Author of the message
        #[arg(long, value_enum, default_value = "user")]
        role: RoleArg,
        /// Target conversation (defaults to the active one)
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Print a conversation
    Show {
        /// Conversation (defaults to the active one)
        id: Option<String>,
        /// Emit HTML instead of text
        #[arg(long)]
        html: bool,
        /// Do not collapse long user messages
        #[arg(long)]
        expand: bool,
    },
    /// Write a conversation to a JSON file
    Export {
        /// Conversation (defaults to the active one)
        id: Option<String>,
        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        dir: PathBuf,
    },
    /// Add a conversation from an exported JSON file
    Import {
        /// File written by `export`
        path: PathBuf,
    },
    /// List purpose presets
    Purposes {
        /// Only show purposes whose title contains this text
        search: Option<String>,
    },
    /// Print the stylesheet for highlighted code
    Css {
        /// Theme name (defaults to the configured theme)
        #[arg(long)]
        theme: Option<String>,
    },
}

impl Commands {
    const fn mutates(&self) -> bool {
        matches!(
            self,
            Self::New { .. }
                | Self::Activate { .. }
                | Self::Delete { .. }
                | Self::Send { .. }
                | Self::Import { .. }
        )
    }
}

/// Build the effective configuration: file, then environment, then flags.
///
/// # Errors
/// Returns an error if the config file cannot be read or the result is invalid.
pub fn load_config(cli: &Cli) -> Result<ChatConfig> {
    let config = match &cli.config {
        Some(path) => ChatConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ChatConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(db) = &cli.db {
        config.storage.sqlite_path.clone_from(db);
    }
    config.validate()?;
    Ok(config)
}

fn resolve_conversation(store: &ChatStore, id: Option<&str>) -> ChatResult<ConversationId> {
    match id {
        Some(raw) => {
            let id: ConversationId = raw.trim().parse()?;
            if store.conversation(id).is_none() {
                return Err(ChatError::ConversationNotFound(id));
            }
            Ok(id)
        }
        None => store
            .active_conversation_id()
            .ok_or(ChatError::ConversationNotFound(ConversationId::missing())),
    }
}

fn message_for(role: RoleArg, text: String, store: &ChatStore, id: ConversationId) -> Message {
    match role {
        RoleArg::User => Message::user(text),
        RoleArg::System => Message::system(text),
        RoleArg::Assistant => {
            let conversation = store.conversation(id);
            let mut message = Message::assistant(text);
            if let Some(c) = conversation {
                message = message
                    .with_purpose(c.system_purpose_id)
                    .with_origin_llm(c.chat_model_id.as_str());
            }
            message
        }
    }
}

/// Execute a parsed command against the store at `config.storage`.
///
/// # Errors
/// Returns an error if storage access fails or the command is invalid.
pub async fn execute(cli: Cli, config: ChatConfig) -> Result<()> {
    let backend = SqliteSnapshotStore::new(&config.storage)
        .await
        .with_context(|| format!("failed to open {}", config.storage.sqlite_path.display()))?;
    let key = config.storage.snapshot_key.clone();

    let mut store = ChatStore::new(&config);
    if !load_store(&mut store, &backend, &key).await? {
        debug!("Starting with a fresh store");
    }

    let mutates = cli.command.mutates();
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::List => {
            let active = store.active_conversation_id();
            for entry in store.conversation_names() {
                let marker = if Some(entry.id) == active { '*' } else { ' ' };
                let conversation = store.conversation(entry.id);
                let (messages, tokens) =
                    conversation.map_or((0, 0), |c| (c.messages.len(), c.token_count));
                writeln!(
                    out,
                    "{marker} {}  {:<40}  {:<10}  {} msg  {} tok",
                    entry.id, entry.name, entry.system_purpose_id, messages, tokens
                )?;
            }
        }
        Commands::New {
            title,
            purpose,
            model,
        } => {
            let id = store.new_conversation();
            if let Some(purpose) = purpose {
                let purpose: SystemPurposeId = purpose.parse().map_err(ChatError::from)?;
                store.set_system_purpose_id(id, purpose)?;
            }
            if let Some(model) = model {
                store.set_chat_model_id(id, ChatModelId::new(model).map_err(ChatError::from)?)?;
            }
            if title.is_some() {
                store.set_user_title(id, title)?;
            }
            writeln!(out, "{id}")?;
        }
        Commands::Activate { id } => {
            let id: ConversationId = id.trim().parse().map_err(ChatError::from)?;
            store.set_active_conversation_id(id)?;
        }
        Commands::Delete { id } => {
            let id: ConversationId = id.trim().parse().map_err(ChatError::from)?;
            store.delete_conversation(id)?;
        }
        Commands::Send {
            text,
            role,
            conversation,
        } => {
            let id = resolve_conversation(&store, conversation.as_deref())?;
            let message = message_for(role, text, &store, id);
            let message_id = store.append_message(id, message)?;
            writeln!(out, "{message_id}")?;
        }
        Commands::Show { id, html, expand } => {
            let id = resolve_conversation(&store, id.as_deref())?;
            let renderer = MessageRenderer::new(config.render.clone(), PurposeCatalog::default())?;
            if let Some(conversation) = store.conversation(id) {
                if !html {
                    writeln!(
                        out,
                        "# {} ({}, {}, {} tokens)",
                        conversation.title(),
                        conversation.chat_model_id,
                        conversation.system_purpose_id,
                        conversation.token_count
                    )?;
                }
                for message in &conversation.messages {
                    let view = renderer.render(message, expand, false)?;
                    if html {
                        writeln!(out, "{}", view.to_html())?;
                        continue;
                    }
                    writeln!(out, "\n[{}]", view.sender)?;
                    if let Some(issue) = view.issue {
                        writeln!(out, "! {issue}")?;
                        continue;
                    }
                    if view.collapsed {
                        let (text, _) =
                            collapse_text(&message.text, config.render.collapse_after_lines);
                        writeln!(out, "{text}\n... (use --expand to see the full message)")?;
                    } else {
                        writeln!(out, "{}", message.text)?;
                    }
                }
            }
        }
        Commands::Export { id, dir } => {
            let id = resolve_conversation(&store, id.as_deref())?;
            if let Some(conversation) = store.conversation(id) {
                let path = export_conversation_json(conversation, &dir)?;
                writeln!(out, "{}", path.display())?;
            }
        }
        Commands::Import { path } => {
            let id = import_conversation_json(&mut store, &path)?;
            writeln!(out, "{id}")?;
        }
        Commands::Purposes { search } => {
            let catalog = PurposeCatalog::default();
            for purpose in catalog.search(search.as_deref().unwrap_or_default()) {
                writeln!(
                    out,
                    "{} {:<10} {:<12} {}",
                    purpose.symbol, purpose.id, purpose.title, purpose.description
                )?;
            }
        }
        Commands::Css { theme } => {
            let renderer = MessageRenderer::new(config.render.clone(), PurposeCatalog::default())?;
            let css = match theme {
                Some(theme) => renderer.highlighter().stylesheet(&theme)?,
                None => renderer.stylesheet()?,
            };
            out.write_all(css.as_bytes())?;
        }
    }

    drop(out);
    if mutates {
        save_store(&store, &backend, &key).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from(["halldyll-chat", "send", "hello", "--role", "assistant"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Send {
                role: RoleArg::Assistant,
                ..
            }
        ));
        assert!(cli.command.mutates());
    }

    #[test]
    fn test_read_only_commands_do_not_save() {
        let cli = Cli::try_parse_from(["halldyll-chat", "show", "--html"]).unwrap();
        assert!(!cli.command.mutates());
    }

    #[test]
    fn test_db_flag_overrides_config() {
        let cli =
            Cli::try_parse_from(["halldyll-chat", "--db", "/tmp/x.sqlite", "list"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.storage.sqlite_path, PathBuf::from("/tmp/x.sqlite"));
    }

    #[test]
    fn test_resolve_conversation() {
        let store = ChatStore::new(&ChatConfig::default());
        let active = store.active_conversation_id().unwrap();
        assert_eq!(resolve_conversation(&store, None).unwrap(), active);
        assert_eq!(
            resolve_conversation(&store, Some(&active.to_string())).unwrap(),
            active
        );
        assert!(resolve_conversation(&store, Some("not-a-uuid")).is_err());
        assert!(resolve_conversation(&store, Some(&ConversationId::new().to_string())).is_err());
    }

    #[tokio::test]
    async fn test_execute_persists_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("chats.sqlite");
        let db_arg = db.to_string_lossy().to_string();

        let cli =
            Cli::try_parse_from(["halldyll-chat", "--db", db_arg.as_str(), "send", "abcdefgh"])
                .unwrap();
        let config = load_config(&cli).unwrap();
        execute(cli, config.clone()).await.unwrap();

        let backend = SqliteSnapshotStore::new(&config.storage).await.unwrap();
        let mut store = ChatStore::new(&config);
        assert!(load_store(&mut store, &backend, "app-chats").await.unwrap());
        let conversation = store.active_conversation();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.token_count, 2);
    }
}
