//! Conversation store.
//!
//! A reducer-style container over an ordered list of conversations (newest
//! first) with at most one active conversation. Every mutation re-derives the
//! aggregate token count of the touched conversation, so
//! `conversation.token_count == sum(message.token_count)` always holds.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::chat::conversation::Conversation;
use crate::chat::core::catalog::{ChatModelId, LocaleId, SystemPurposeId};
use crate::chat::core::config::{ChatConfig, StoreConfig};
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::events::{EventBus, StoreEvent};
use crate::chat::message::{Message, MessagePatch, now_ms};
use crate::chat::snapshot::{ChatSnapshot, SNAPSHOT_VERSION};
use crate::chat::tokens::{HeuristicCounter, TokenCounter, update_token_count};

/// Selection of the active conversation, as shown in the toolbar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveConfiguration {
    /// Active conversation (nil when none is active).
    pub conversation_id: ConversationId,
    /// Selected locale.
    pub locale_id: LocaleId,
    /// Selected model.
    pub chat_model_id: ChatModelId,
    /// Selected purpose.
    pub system_purpose_id: SystemPurposeId,
    /// Aggregate token count.
    pub token_count: u32,
}

/// Sidebar entry for a conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationName {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Display title.
    pub name: String,
    /// Selected purpose.
    pub system_purpose_id: SystemPurposeId,
}

/// In-memory chat state.
pub struct ChatStore {
    config: StoreConfig,
    conversations: Vec<Conversation>,
    active_conversation_id: Option<ConversationId>,
    counter: Arc<dyn TokenCounter>,
    events: EventBus,
}

impl fmt::Debug for ChatStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatStore")
            .field("conversations", &self.conversations.len())
            .field("active_conversation_id", &self.active_conversation_id)
            .finish_non_exhaustive()
    }
}

fn find_mut(
    conversations: &mut [Conversation],
    id: ConversationId,
) -> ChatResult<&mut Conversation> {
    conversations
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or(ChatError::ConversationNotFound(id))
}

fn message_index(conversation: &Conversation, message_id: MessageId) -> ChatResult<usize> {
    conversation
        .position(message_id)
        .ok_or(ChatError::MessageNotFound {
            conversation_id: conversation.id,
            message_id,
        })
}

impl ChatStore {
    /// Create a store holding one default conversation, marked active.
    #[must_use]
    pub fn new(config: &ChatConfig) -> Self {
        Self::with_counter(
            config.store.clone(),
            Arc::new(HeuristicCounter::from_config(&config.tokens)),
        )
    }

    /// Create a store with a custom token counter.
    #[must_use]
    pub fn with_counter(config: StoreConfig, counter: Arc<dyn TokenCounter>) -> Self {
        let first = Conversation::with_defaults(&config);
        let active = Some(first.id);
        let events = EventBus::new(config.event_capacity);
        Self {
            config,
            conversations: vec![first],
            active_conversation_id: active,
            counter,
            events,
        }
    }

    // ----- reads -------------------------------------------------------------

    /// Store configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Token counter used for message counts.
    #[must_use]
    pub fn counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    /// All conversations, newest first.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Look up a conversation.
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Active conversation id, if any.
    #[must_use]
    pub const fn active_conversation_id(&self) -> Option<ConversationId> {
        self.active_conversation_id
    }

    /// The active conversation, or the "missing conversation" placeholder.
    #[must_use]
    pub fn active_conversation(&self) -> Cow<'_, Conversation> {
        self.active_conversation_id
            .and_then(|id| self.conversation(id))
            .map_or_else(
                || Cow::Owned(Conversation::missing(&self.config)),
                Cow::Borrowed,
            )
    }

    /// Model/purpose/locale selection of the active conversation.
    #[must_use]
    pub fn active_configuration(&self) -> ActiveConfiguration {
        let conversation = self.active_conversation();
        ActiveConfiguration {
            conversation_id: conversation.id,
            locale_id: conversation.locale_id.clone(),
            chat_model_id: conversation.chat_model_id.clone(),
            system_purpose_id: conversation.system_purpose_id,
            token_count: conversation.token_count,
        }
    }

    /// Sidebar entries, newest first.
    #[must_use]
    pub fn conversation_names(&self) -> Vec<ConversationName> {
        self.conversations
            .iter()
            .map(|c| ConversationName {
                id: c.id,
                name: c.title().to_string(),
                system_purpose_id: c.system_purpose_id,
            })
            .collect()
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ----- conversation list -------------------------------------------------

    /// Create a conversation with the configured defaults and make it active.
    pub fn new_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::with_defaults(&self.config);
        let id = conversation.id;
        self.insert_front(conversation);
        self.activate(Some(id));
        id
    }

    /// Add a conversation at the front, dropping the oldest beyond the limit.
    ///
    /// # Errors
    /// Returns an error if a conversation with the same id already exists.
    pub fn add_conversation(&mut self, mut conversation: Conversation) -> ChatResult<()> {
        if self.conversation(conversation.id).is_some() {
            return Err(ChatError::InvalidValue(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }

        let model = conversation.chat_model_id.clone();
        for message in &mut conversation.messages {
            update_token_count(message, self.counter.as_ref(), &model, false);
        }
        conversation.refresh_token_count();
        self.insert_front(conversation);
        Ok(())
    }

    fn insert_front(&mut self, conversation: Conversation) {
        let id = conversation.id;
        self.conversations.insert(0, conversation);
        if self.conversations.len() > self.config.max_conversations {
            let dropped = self.conversations.len() - self.config.max_conversations;
            self.conversations.truncate(self.config.max_conversations);
            debug!("Dropped {} old conversation(s) over the limit", dropped);
        }
        info!("Added conversation: {}", id);
        self.events.emit(StoreEvent::ConversationAdded(id));
        self.ensure_active_exists();
    }

    /// Remove a conversation; if it was active, the newest remaining one becomes active.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn delete_conversation(&mut self, id: ConversationId) -> ChatResult<()> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return Err(ChatError::ConversationNotFound(id));
        }

        info!("Deleted conversation: {}", id);
        self.events.emit(StoreEvent::ConversationDeleted(id));
        self.ensure_active_exists();
        Ok(())
    }

    /// Mark a conversation as active.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn set_active_conversation_id(&mut self, id: ConversationId) -> ChatResult<()> {
        if self.conversation(id).is_none() {
            return Err(ChatError::ConversationNotFound(id));
        }
        self.activate(Some(id));
        debug!("Switched to conversation: {}", id);
        Ok(())
    }

    fn activate(&mut self, id: Option<ConversationId>) {
        if self.active_conversation_id != id {
            self.active_conversation_id = id;
            self.events.emit(StoreEvent::ActiveChanged(id));
        }
    }

    fn ensure_active_exists(&mut self) {
        let dangling = self
            .active_conversation_id
            .is_some_and(|id| self.conversation(id).is_none());
        if dangling {
            let next = self.conversations.first().map(|c| c.id);
            self.activate(next);
        }
    }

    // ----- messages ----------------------------------------------------------

    /// Replace the message list, counting tokens where missing.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn set_messages(&mut self, id: ConversationId, messages: Vec<Message>) -> ChatResult<()> {
        let conversation = find_mut(&mut self.conversations, id)?;
        let counter = self.counter.as_ref();

        conversation.messages = messages;
        let model = conversation.chat_model_id.clone();
        for message in &mut conversation.messages {
            update_token_count(message, counter, &model, false);
        }
        conversation.refresh_token_count();
        conversation.updated = Some(now_ms());

        debug!(
            "Replaced messages of {}: {} message(s), {} token(s)",
            id,
            conversation.messages.len(),
            conversation.token_count
        );
        self.events.emit(StoreEvent::MessagesReplaced(id));
        Ok(())
    }

    /// Append a message. Finished (non-typing) messages are counted immediately.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn append_message(
        &mut self,
        id: ConversationId,
        mut message: Message,
    ) -> ChatResult<MessageId> {
        let conversation = find_mut(&mut self.conversations, id)?;
        let counter = self.counter.as_ref();

        if !message.typing {
            update_token_count(&mut message, counter, &conversation.chat_model_id, true);
        }
        let message_id = message.id;
        conversation.messages.push(message);
        conversation.refresh_token_count();
        conversation.updated = Some(now_ms());

        debug!("Appended message {} to {}", message_id, id);
        self.events.emit(StoreEvent::MessageAppended {
            conversation_id: id,
            message_id,
        });
        Ok(message_id)
    }

    /// Delete a message.
    ///
    /// # Errors
    /// Returns an error if the conversation or message does not exist.
    pub fn delete_message(&mut self, id: ConversationId, message_id: MessageId) -> ChatResult<()> {
        let conversation = find_mut(&mut self.conversations, id)?;
        let index = message_index(conversation, message_id)?;

        conversation.messages.remove(index);
        conversation.refresh_token_count();
        conversation.updated = Some(now_ms());

        debug!("Deleted message {} from {}", message_id, id);
        self.events.emit(StoreEvent::MessageDeleted {
            conversation_id: id,
            message_id,
        });
        Ok(())
    }

    /// Merge `patch` into a message.
    ///
    /// With `touch`, the message and conversation `updated` stamps move to now.
    /// The token count is refreshed once the message is no longer typing.
    ///
    /// # Errors
    /// Returns an error if the conversation or message does not exist.
    pub fn edit_message(
        &mut self,
        id: ConversationId,
        message_id: MessageId,
        patch: &MessagePatch,
        touch: bool,
    ) -> ChatResult<()> {
        let conversation = find_mut(&mut self.conversations, id)?;
        let index = message_index(conversation, message_id)?;
        let counter = self.counter.as_ref();
        let model = conversation.chat_model_id.clone();
        let now = now_ms();

        let message = &mut conversation.messages[index];
        let was_typing = message.typing;
        patch.apply_to(message);
        if touch {
            message.updated = Some(now);
        }
        if patch.typing == Some(false) || !was_typing {
            update_token_count(message, counter, &model, true);
        }

        conversation.refresh_token_count();
        if touch {
            conversation.updated = Some(now);
        }

        self.events.emit(StoreEvent::MessageEdited {
            conversation_id: id,
            message_id,
        });
        Ok(())
    }

    /// Append streamed text to a message without touching its timestamps.
    ///
    /// # Errors
    /// Returns an error if the conversation or message does not exist.
    pub fn append_to_message(
        &mut self,
        id: ConversationId,
        message_id: MessageId,
        chunk: &str,
    ) -> ChatResult<()> {
        let conversation = find_mut(&mut self.conversations, id)?;
        let index = message_index(conversation, message_id)?;
        let counter = self.counter.as_ref();
        let model = conversation.chat_model_id.clone();

        let message = &mut conversation.messages[index];
        message.text.push_str(chunk);
        if !message.typing {
            update_token_count(message, counter, &model, true);
        }
        conversation.refresh_token_count();

        self.events.emit(StoreEvent::MessageEdited {
            conversation_id: id,
            message_id,
        });
        Ok(())
    }

    /// Drop the messages after `index(message_id) + offset` and return what is kept.
    ///
    /// Assistant retries use offset `-1` (the reply itself is dropped), user
    /// "run again" uses `0` (the prompt is kept).
    ///
    /// # Errors
    /// Returns an error if the conversation or message does not exist.
    pub fn truncate_for_rerun(
        &mut self,
        id: ConversationId,
        message_id: MessageId,
        offset: isize,
    ) -> ChatResult<Vec<Message>> {
        let conversation = find_mut(&mut self.conversations, id)?;
        let index = message_index(conversation, message_id)?;

        let end = isize::try_from(index)
            .unwrap_or(isize::MAX)
            .saturating_add(offset)
            .saturating_add(1);
        let keep = usize::try_from(end)
            .unwrap_or(0)
            .min(conversation.messages.len());
        conversation.messages.truncate(keep);
        conversation.refresh_token_count();
        conversation.updated = Some(now_ms());

        debug!("Truncated {} to {} message(s) for rerun", id, keep);
        self.events.emit(StoreEvent::MessagesReplaced(id));
        Ok(conversation.messages.clone())
    }

    // ----- settings ----------------------------------------------------------

    /// Switch the model; every message is recounted for it.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn set_chat_model_id(&mut self, id: ConversationId, model: ChatModelId) -> ChatResult<()> {
        let conversation = find_mut(&mut self.conversations, id)?;
        let counter = self.counter.as_ref();

        for message in &mut conversation.messages {
            update_token_count(message, counter, &model, true);
        }
        conversation.chat_model_id = model;
        conversation.refresh_token_count();

        debug!("Model of {} set to {}", id, conversation.chat_model_id);
        self.events.emit(StoreEvent::SettingsChanged(id));
        Ok(())
    }

    /// Switch the locale.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn set_locale_id(&mut self, id: ConversationId, locale: LocaleId) -> ChatResult<()> {
        self.edit_settings(id, |c| c.locale_id = locale)
    }

    /// Switch the purpose.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn set_system_purpose_id(
        &mut self,
        id: ConversationId,
        purpose: SystemPurposeId,
    ) -> ChatResult<()> {
        self.edit_settings(id, |c| c.system_purpose_id = purpose)
    }

    /// Set or clear the user title.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn set_user_title(&mut self, id: ConversationId, title: Option<String>) -> ChatResult<()> {
        self.edit_settings(id, |c| c.user_title = title)
    }

    /// Set or clear the automatic title.
    ///
    /// # Errors
    /// Returns an error if the conversation does not exist.
    pub fn set_auto_title(&mut self, id: ConversationId, title: Option<String>) -> ChatResult<()> {
        self.edit_settings(id, |c| c.auto_title = title)
    }

    fn edit_settings(
        &mut self,
        id: ConversationId,
        update: impl FnOnce(&mut Conversation),
    ) -> ChatResult<()> {
        let conversation = find_mut(&mut self.conversations, id)?;
        update(conversation);
        self.events.emit(StoreEvent::SettingsChanged(id));
        Ok(())
    }

    // ----- snapshots ---------------------------------------------------------

    /// Serializable copy of the state.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            version: SNAPSHOT_VERSION,
            conversations: self.conversations.clone(),
            active_conversation_id: self.active_conversation_id,
        }
    }

    /// Replace the state with a snapshot.
    ///
    /// Aggregates are re-derived and a dangling active id is repaired.
    ///
    /// # Errors
    /// Returns an error if the snapshot version is not supported.
    pub fn restore(&mut self, snapshot: ChatSnapshot) -> ChatResult<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ChatError::UnsupportedSnapshot {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let mut conversations = snapshot.conversations;
        conversations.truncate(self.config.max_conversations);
        for conversation in &mut conversations {
            let model = conversation.chat_model_id.clone();
            for message in &mut conversation.messages {
                update_token_count(message, self.counter.as_ref(), &model, false);
            }
            conversation.refresh_token_count();
        }

        self.conversations = conversations;
        self.active_conversation_id = snapshot.active_conversation_id;
        self.ensure_active_exists();

        info!(
            "Restored {} conversation(s) from snapshot",
            self.conversations.len()
        );
        self.events.emit(StoreEvent::Restored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ChatStore {
        ChatStore::new(&ChatConfig::default())
    }

    fn assert_invariant(store: &ChatStore) {
        for conversation in store.conversations() {
            assert_eq!(conversation.token_count, conversation.sum_token_counts());
        }
    }

    #[test]
    fn test_new_store_has_active_default() {
        let store = store();
        assert_eq!(store.conversations().len(), 1);
        let active = store.active_conversation();
        assert_eq!(Some(active.id), store.active_conversation_id());
        assert_eq!(active.name, "Conversation");
    }

    #[test]
    fn test_add_keeps_newest_first_and_caps() {
        let mut store = store();
        let mut last = ConversationId::missing();
        for _ in 0..25 {
            let conversation = Conversation::with_defaults(store.config());
            last = conversation.id;
            store.add_conversation(conversation).unwrap();
        }
        assert_eq!(store.conversations().len(), 20);
        assert_eq!(store.conversations()[0].id, last);
        assert!(store.active_conversation_id().is_some());
        assert_invariant(&store);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut store = store();
        let existing = store.conversations()[0].clone();
        assert!(store.add_conversation(existing).is_err());
    }

    #[test]
    fn test_delete_active_moves_selection() {
        let mut store = store();
        let first = store.conversations()[0].id;
        let second = store.new_conversation();
        assert_eq!(store.active_conversation_id(), Some(second));

        store.delete_conversation(second).unwrap();
        assert_eq!(store.active_conversation_id(), Some(first));

        store.delete_conversation(first).unwrap();
        assert_eq!(store.active_conversation_id(), None);
        assert_eq!(store.active_conversation().name, "Missing Conversation");
        assert!(matches!(
            store.delete_conversation(first),
            Err(ChatError::ConversationNotFound(_))
        ));
    }

    #[test]
    fn test_set_active_requires_existing() {
        let mut store = store();
        assert!(store.set_active_conversation_id(ConversationId::new()).is_err());
    }

    #[test]
    fn test_append_counts_finished_messages_only() {
        let mut store = store();
        let id = store.conversations()[0].id;
        store.append_message(id, Message::user("abcdefgh")).unwrap();
        let typing = Message::assistant("abcd").with_typing(true);
        store.append_message(id, typing).unwrap();

        let conversation = store.conversation(id).unwrap();
        assert_eq!(conversation.messages[0].token_count, 2);
        assert_eq!(conversation.messages[1].token_count, 0);
        assert_eq!(conversation.token_count, 2);
    }

    #[test]
    fn test_streaming_then_finish_counts_tokens() {
        let mut store = store();
        let id = store.conversations()[0].id;
        let reply = Message::assistant("").with_typing(true);
        let reply_id = store.append_message(id, reply).unwrap();

        store.append_to_message(id, reply_id, "Hello ").unwrap();
        store.append_to_message(id, reply_id, "world!").unwrap();
        assert_eq!(store.conversation(id).unwrap().token_count, 0);

        store
            .edit_message(id, reply_id, &MessagePatch::default().with_typing(false), false)
            .unwrap();
        let conversation = store.conversation(id).unwrap();
        assert_eq!(conversation.messages[0].text, "Hello world!");
        assert_eq!(conversation.messages[0].token_count, 3);
        assert_eq!(conversation.token_count, 3);
        assert!(conversation.messages[0].updated.is_none());
    }

    #[test]
    fn test_edit_with_touch_recounts_and_stamps() {
        let mut store = store();
        let id = store.conversations()[0].id;
        let message_id = store.append_message(id, Message::user("abcd")).unwrap();

        store
            .edit_message(id, message_id, &MessagePatch::text("abcdefghijkl"), true)
            .unwrap();
        let conversation = store.conversation(id).unwrap();
        assert_eq!(conversation.messages[0].token_count, 3);
        assert!(conversation.messages[0].was_edited());
        assert_eq!(conversation.token_count, 3);
    }

    #[test]
    fn test_edit_while_typing_keeps_count() {
        let mut store = store();
        let id = store.conversations()[0].id;
        store.append_message(id, Message::user("abcdefgh")).unwrap();
        let reply_id = store
            .append_message(id, Message::assistant("").with_typing(true))
            .unwrap();

        store
            .edit_message(id, reply_id, &MessagePatch::text("partial reply text"), false)
            .unwrap();
        let conversation = store.conversation(id).unwrap();
        assert!(conversation.messages[1].typing);
        assert_eq!(conversation.messages[1].text, "partial reply text");
        assert_eq!(conversation.messages[1].token_count, 0);
        assert_eq!(conversation.token_count, 2);
        assert_invariant(&store);
    }

    #[test]
    fn test_edit_missing_message_leaves_store_unchanged() {
        let mut store = store();
        let id = store.conversations()[0].id;
        store.append_message(id, Message::user("abcd")).unwrap();
        let before = store.conversation(id).cloned();

        let result = store.edit_message(id, MessageId::new(), &MessagePatch::text("x"), true);
        assert!(matches!(result, Err(ChatError::MessageNotFound { .. })));
        assert_eq!(store.conversation(id).cloned(), before);
    }

    #[test]
    fn test_delete_message_updates_total() {
        let mut store = store();
        let id = store.conversations()[0].id;
        let a = store.append_message(id, Message::user("abcdefgh")).unwrap();
        store.append_message(id, Message::assistant("abcd")).unwrap();
        assert_eq!(store.conversation(id).unwrap().token_count, 3);

        store.delete_message(id, a).unwrap();
        assert_eq!(store.conversation(id).unwrap().token_count, 1);
        assert!(store.delete_message(id, a).is_err());
    }

    #[test]
    fn test_set_messages_counts_missing_only() {
        let mut store = store();
        let id = store.conversations()[0].id;
        let mut cached = Message::assistant("abcdefgh");
        cached.token_count = 10;
        store
            .set_messages(id, vec![Message::user("abcd"), cached])
            .unwrap();
        assert_eq!(store.conversation(id).unwrap().token_count, 11);
        assert_invariant(&store);
    }

    #[test]
    fn test_model_switch_recounts_everything() {
        let mut config = ChatConfig::default();
        config
            .tokens
            .model_overrides
            .insert("gpt-3.5".to_string(), 2.0);
        let mut store = ChatStore::new(&config);
        let id = store.conversations()[0].id;
        store.append_message(id, Message::user("abcdefgh")).unwrap();
        assert_eq!(store.conversation(id).unwrap().token_count, 2);

        let turbo = ChatModelId::new("gpt-3.5-turbo").unwrap();
        store.set_chat_model_id(id, turbo.clone()).unwrap();
        let conversation = store.conversation(id).unwrap();
        assert_eq!(conversation.chat_model_id, turbo);
        assert_eq!(conversation.token_count, 4);
    }

    #[test]
    fn test_truncate_for_rerun() {
        let mut store = store();
        let id = store.conversations()[0].id;
        let user = store.append_message(id, Message::user("question")).unwrap();
        let reply = store.append_message(id, Message::assistant("answer")).unwrap();
        store.append_message(id, Message::user("follow-up")).unwrap();

        let kept = store.truncate_for_rerun(id, reply, -1).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, user);

        let kept = store.truncate_for_rerun(id, user, 0).unwrap();
        assert_eq!(kept.len(), 1);
        assert_invariant(&store);

        let kept = store.truncate_for_rerun(id, user, -1).unwrap();
        assert!(kept.is_empty());
        assert_eq!(store.conversation(id).unwrap().token_count, 0);
    }

    #[test]
    fn test_active_configuration_and_names() {
        let mut store = store();
        let id = store.conversations()[0].id;
        store
            .set_system_purpose_id(id, SystemPurposeId::Designer)
            .unwrap();
        store
            .set_locale_id(id, LocaleId::new("zh-CN").unwrap())
            .unwrap();
        store
            .set_user_title(id, Some("Logo ideas".to_string()))
            .unwrap();

        let active = store.active_configuration();
        assert_eq!(active.conversation_id, id);
        assert_eq!(active.system_purpose_id, SystemPurposeId::Designer);
        assert_eq!(active.locale_id.as_str(), "zh-CN");

        let names = store.conversation_names();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].name, "Logo ideas");
    }

    #[test]
    fn test_events_are_emitted() {
        let mut store = store();
        let mut rx = store.subscribe();
        let id = store.conversations()[0].id;
        let message_id = store.append_message(id, Message::user("hi")).unwrap();
        assert_eq!(
            rx.try_recv().ok(),
            Some(StoreEvent::MessageAppended {
                conversation_id: id,
                message_id
            })
        );
    }

    #[test]
    fn test_snapshot_restore_repairs_state() {
        let mut store = store();
        let id = store.conversations()[0].id;
        store.append_message(id, Message::user("abcdefgh")).unwrap();

        let mut snapshot = store.snapshot();
        snapshot.conversations[0].token_count = 999;
        snapshot.active_conversation_id = Some(ConversationId::new());

        let mut restored = ChatStore::new(&ChatConfig::default());
        restored.restore(snapshot).unwrap();
        assert_eq!(restored.conversations().len(), 1);
        assert_eq!(restored.conversation(id).unwrap().token_count, 2);
        assert_eq!(restored.active_conversation_id(), Some(id));
    }

    #[test]
    fn test_restore_rejects_unknown_version() {
        let mut store = store();
        let mut snapshot = store.snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        assert!(matches!(
            store.restore(snapshot),
            Err(ChatError::UnsupportedSnapshot { .. })
        ));
    }
}
