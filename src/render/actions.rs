//! Message menu and code block actions.
//!
//! Actions resolve to [`ActionEffect`]s. Effects that change chat state are
//! applied to a [`ChatStore`]; clipboard and speech are left to the caller.

use serde_json::json;
use tracing::debug;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::message::{Message, MessagePatch, Role};
use crate::chat::store::ChatStore;
use crate::render::blocks::CodeBlock;

/// Endpoint accepting a `data` form field with the pen definition.
pub const CODEPEN_DEFINE_URL: &str = "https://codepen.io/pen/define";

const CODEPEN_LANGUAGES: [&str; 5] = ["html", "css", "javascript", "json", "typescript"];

/// Entry of the message operations menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    /// Copy the message text.
    Copy,
    /// Read the message aloud.
    Speak,
    /// Start or discard an inline edit.
    Edit,
    /// Retry (assistant) or run again (user) from this message.
    RunAgain,
    /// Delete the message.
    Delete,
}

/// A menu entry with its label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuItem {
    /// Action triggered.
    pub action: MenuAction,
    /// Label shown.
    pub label: &'static str,
}

/// What an action asks the application to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionEffect {
    /// Put text on the clipboard.
    CopyToClipboard(String),
    /// Speak text.
    Speak(String),
    /// Toggle inline editing.
    ToggleEdit,
    /// Truncate history after `index(message_id) + offset` and generate again.
    RunFrom {
        /// Anchor message.
        message_id: MessageId,
        /// `-1` drops the anchor (retry), `0` keeps it (run again).
        offset: isize,
    },
    /// Replace the text of a message.
    EditText {
        /// Edited message.
        message_id: MessageId,
        /// New text.
        text: String,
    },
    /// Delete a message.
    Delete(MessageId),
}

/// Result of applying an effect to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppliedEffect {
    /// The store was updated.
    Updated,
    /// History was truncated; these messages should be sent to the model.
    Rerun(Vec<Message>),
    /// Nothing to do in the store; the caller handles it.
    External(ActionEffect),
}

/// Menu entries available for `message`.
#[must_use]
pub fn menu_items(message: &Message, speech_enabled: bool, is_editing: bool) -> Vec<MenuItem> {
    let mut items = vec![MenuItem {
        action: MenuAction::Copy,
        label: "Copy",
    }];
    if speech_enabled {
        items.push(MenuItem {
            action: MenuAction::Speak,
            label: "Speak",
        });
    }
    items.push(MenuItem {
        action: MenuAction::Edit,
        label: if is_editing { "Discard" } else { "Edit" },
    });
    match message.role {
        Role::Assistant => items.push(MenuItem {
            action: MenuAction::RunAgain,
            label: "Retry",
        }),
        Role::User => items.push(MenuItem {
            action: MenuAction::RunAgain,
            label: "Run again",
        }),
        Role::System => {}
    }
    items.push(MenuItem {
        action: MenuAction::Delete,
        label: "Delete",
    });
    items
}

/// Resolve a menu action for `message`.
#[must_use]
pub fn resolve_action(action: MenuAction, message: &Message) -> Option<ActionEffect> {
    match action {
        MenuAction::Copy => Some(ActionEffect::CopyToClipboard(message.text.clone())),
        MenuAction::Speak => Some(ActionEffect::Speak(message.text.clone())),
        MenuAction::Edit => Some(ActionEffect::ToggleEdit),
        MenuAction::RunAgain => match message.role {
            Role::Assistant => Some(ActionEffect::RunFrom {
                message_id: message.id,
                offset: -1,
            }),
            Role::User => Some(ActionEffect::RunFrom {
                message_id: message.id,
                offset: 0,
            }),
            Role::System => None,
        },
        MenuAction::Delete => Some(ActionEffect::Delete(message.id)),
    }
}

/// Commit an inline edit; blank or unchanged text is ignored.
#[must_use]
pub fn handle_text_edited(message: &Message, edited: &str) -> Option<ActionEffect> {
    if edited.trim().is_empty() || edited == message.text {
        return None;
    }
    Some(ActionEffect::EditText {
        message_id: message.id,
        text: edited.to_string(),
    })
}

/// Apply an effect to the conversation `conversation_id`.
///
/// # Errors
/// Returns an error if the conversation or message does not exist.
pub fn apply_effect(
    store: &mut ChatStore,
    conversation_id: ConversationId,
    effect: ActionEffect,
) -> ChatResult<AppliedEffect> {
    match effect {
        ActionEffect::RunFrom { message_id, offset } => {
            let history = store.truncate_for_rerun(conversation_id, message_id, offset)?;
            debug!("Rerun from {} with {} message(s)", message_id, history.len());
            Ok(AppliedEffect::Rerun(history))
        }
        ActionEffect::EditText { message_id, text } => {
            store.edit_message(conversation_id, message_id, &MessagePatch::text(text), true)?;
            Ok(AppliedEffect::Updated)
        }
        ActionEffect::Delete(message_id) => {
            store.delete_message(conversation_id, message_id)?;
            Ok(AppliedEffect::Updated)
        }
        other => Ok(AppliedEffect::External(other)),
    }
}

/// A prefilled `CodePen` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodePenForm {
    /// Form action.
    pub action: &'static str,
    /// JSON value of the `data` field.
    pub data: String,
}

/// Actions offered on a code block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeActions {
    /// Toggle between the code and a rendered SVG.
    pub svg_preview: bool,
    /// Open in `CodePen`.
    pub codepen: Option<CodePenForm>,
    /// Open in Replit.
    pub replit_url: Option<String>,
    /// Text copied by the copy button.
    pub copy_text: String,
}

fn codepen_form(code: &str, language: &str) -> CodePenForm {
    let data = match language {
        "css" => json!({ "title": "Chat snippet", "css": code }),
        "javascript" | "json" | "typescript" => json!({ "title": "Chat snippet", "js": code }),
        _ => json!({ "title": "Chat snippet", "html": code }),
    };
    CodePenForm {
        action: CODEPEN_DEFINE_URL,
        data: data.to_string(),
    }
}

fn replit_url(language: &str) -> Option<String> {
    let target = match language {
        "python" => "python3",
        "java" => "java",
        "csharp" => "csharp",
        _ => return None,
    };
    Some(format!("https://replit.com/languages/{target}"))
}

impl CodeActions {
    /// Actions for a parsed code block.
    #[must_use]
    pub fn for_block(block: &CodeBlock) -> Self {
        let svg = block.is_svg();
        let language = block.language.as_deref().unwrap_or_default();

        let codepen = if svg {
            Some(codepen_form(&block.code, "html"))
        } else if CODEPEN_LANGUAGES.contains(&language) {
            Some(codepen_form(&block.code, language))
        } else {
            None
        };

        Self {
            svg_preview: svg,
            codepen,
            replit_url: replit_url(language),
            copy_text: block.code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::config::ChatConfig;

    fn code_block(code: &str, language: Option<&str>) -> CodeBlock {
        CodeBlock {
            content: String::new(),
            language: language.map(str::to_string),
            complete: true,
            code: code.to_string(),
        }
    }

    #[test]
    fn test_menu_for_roles() {
        let labels = |m: &Message, speech| {
            menu_items(m, speech, false)
                .into_iter()
                .map(|i| i.label)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            labels(&Message::assistant("a"), true),
            vec!["Copy", "Speak", "Edit", "Retry", "Delete"]
        );
        assert_eq!(
            labels(&Message::user("u"), false),
            vec!["Copy", "Edit", "Run again", "Delete"]
        );
        assert_eq!(
            labels(&Message::system("s"), false),
            vec!["Copy", "Edit", "Delete"]
        );
        assert_eq!(menu_items(&Message::user("u"), false, true)[1].label, "Discard");
    }

    #[test]
    fn test_run_again_offsets() {
        let reply = Message::assistant("a");
        assert_eq!(
            resolve_action(MenuAction::RunAgain, &reply),
            Some(ActionEffect::RunFrom {
                message_id: reply.id,
                offset: -1
            })
        );
        let prompt = Message::user("u");
        assert_eq!(
            resolve_action(MenuAction::RunAgain, &prompt),
            Some(ActionEffect::RunFrom {
                message_id: prompt.id,
                offset: 0
            })
        );
        assert_eq!(resolve_action(MenuAction::RunAgain, &Message::system("s")), None);
    }

    #[test]
    fn test_text_edit_commit_rules() {
        let message = Message::user("original");
        assert_eq!(handle_text_edited(&message, "   "), None);
        assert_eq!(handle_text_edited(&message, "original"), None);
        assert!(matches!(
            handle_text_edited(&message, "changed"),
            Some(ActionEffect::EditText { .. })
        ));
    }

    #[test]
    fn test_apply_effects_to_store() {
        let mut store = ChatStore::new(&ChatConfig::default());
        let id = store.conversations()[0].id;
        let prompt = Message::user("question");
        store.append_message(id, prompt.clone()).unwrap();
        let reply = Message::assistant("answer");
        store.append_message(id, reply.clone()).unwrap();

        let edit = handle_text_edited(&prompt, "better question").unwrap();
        assert_eq!(apply_effect(&mut store, id, edit).unwrap(), AppliedEffect::Updated);
        assert_eq!(
            store.conversation(id).unwrap().messages[0].text,
            "better question"
        );

        let retry = resolve_action(MenuAction::RunAgain, &reply).unwrap();
        match apply_effect(&mut store, id, retry).unwrap() {
            AppliedEffect::Rerun(history) => {
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].id, prompt.id);
            }
            other => panic!("unexpected {other:?}"),
        }

        let copy = resolve_action(MenuAction::Copy, &prompt).unwrap();
        assert!(matches!(
            apply_effect(&mut store, id, copy).unwrap(),
            AppliedEffect::External(ActionEffect::CopyToClipboard(_))
        ));

        let delete = resolve_action(MenuAction::Delete, &prompt).unwrap();
        apply_effect(&mut store, id, delete).unwrap();
        assert!(store.conversation(id).unwrap().messages.is_empty());
    }

    #[test]
    fn test_code_actions() {
        let python = CodeActions::for_block(&code_block("print(1)", Some("python")));
        assert_eq!(
            python.replit_url.as_deref(),
            Some("https://replit.com/languages/python3")
        );
        assert!(python.codepen.is_none());

        let css = CodeActions::for_block(&code_block("a{}", Some("css")));
        let form = css.codepen.unwrap();
        assert_eq!(form.action, CODEPEN_DEFINE_URL);
        let data: serde_json::Value = serde_json::from_str(&form.data).unwrap();
        assert_eq!(data["css"], "a{}");

        let svg = CodeActions::for_block(&code_block("<svg></svg>", Some("xml")));
        assert!(svg.svg_preview);
        assert!(svg.codepen.is_some());
        assert!(svg.replit_url.is_none());
        assert_eq!(svg.copy_text, "<svg></svg>");
    }
}
