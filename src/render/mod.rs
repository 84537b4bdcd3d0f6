//! Message rendering: block parsing, language inference, highlighting,
//! Markdown, provider error explanations and message actions.

pub mod actions;
pub mod blocks;
pub mod highlight;
pub mod issues;
pub mod language;
pub mod markdown;
pub mod view;

pub use actions::{
    ActionEffect, AppliedEffect, CodeActions, MenuAction, MenuItem, apply_effect,
    handle_text_edited, menu_items, resolve_action,
};
pub use blocks::{Block, BlockParser, CodeBlock, TextBlock};
pub use highlight::Highlighter;
pub use issues::{ErrorExplainer, ErrorReport, KnownIssue};
pub use language::infer_code_language;
pub use markdown::{MarkdownRenderer, html_escape};
pub use view::{Avatar, MessageRenderer, MessageView, RenderedBlock, Tone, collapse_text};
