//! Presentation model of a single message.
//!
//! [`MessageRenderer`] turns a stored [`Message`] into a [`MessageView`]:
//! parsed and highlighted blocks, tone, avatar, model label and error
//! explanation. [`MessageView::to_html`] serializes the view for display.

use std::borrow::Cow;
use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::chat::core::catalog::{PurposeCatalog, pretty_base_model};
use crate::chat::core::config::{RenderConfig, ZenMode};
use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::MessageId;
use crate::chat::message::{Message, Role};
use crate::render::actions::{CodeActions, MenuItem, menu_items};
use crate::render::blocks::{Block, BlockParser, CodeBlock};
use crate::render::highlight::Highlighter;
use crate::render::issues::{ErrorExplainer, KnownIssue};
use crate::render::markdown::{MarkdownRenderer, html_escape, render_text};

/// Notice shown on system messages edited by the user.
pub const EDITED_SYSTEM_NOTICE: &str = "modified by user - auto-update disabled";

const UNKNOWN_MODEL: &str = "unk-model";

/// Background tone of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Default surface.
    Surface,
    /// User input.
    Primary,
    /// Edited system prompt.
    Warning,
    /// Assistant error without explanation.
    Danger,
}

impl Tone {
    /// CSS-friendly name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Primary => "primary",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// Avatar shown next to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Avatar {
    /// Explicit image.
    Image {
        /// Image URL.
        url: String,
        /// Alt text (the sender).
        alt: String,
    },
    /// Generic system icon.
    SystemIcon,
    /// Animated avatar while the assistant is typing.
    Typing {
        /// Animation URL.
        url: String,
    },
    /// Purpose emoji.
    Symbol(String),
    /// Generic assistant icon.
    AssistantIcon,
    /// Generic user icon.
    UserIcon,
}

/// A rendered block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedBlock {
    /// Text rendered as Markdown.
    Markdown(String),
    /// Text rendered verbatim.
    Text(String),
    /// Highlighted code with its actions.
    Code {
        /// Parsed block.
        block: CodeBlock,
        /// Available actions.
        actions: CodeActions,
        /// Show a complete SVG as an image instead of its source.
        show_svg: bool,
    },
}

fn svg_image(code: &str) -> String {
    format!(
        "<img class=\"svg-preview\" src=\"data:image/svg+xml;base64,{}\" alt=\"SVG\"/>",
        STANDARD.encode(code)
    )
}

/// Everything needed to display a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageView {
    /// Message identifier.
    pub message_id: MessageId,
    /// Author role.
    pub role: Role,
    /// Sender name.
    pub sender: String,
    /// Avatar; `None` in the cleaner zen mode.
    pub avatar: Option<Avatar>,
    /// Pretty model name (assistant messages with avatars).
    pub model_label: Option<String>,
    /// Full model id for the label tooltip.
    pub model_tooltip: Option<String>,
    /// Still streaming.
    pub typing: bool,
    /// Background tone.
    pub tone: Tone,
    /// Notice above the blocks.
    pub notice: Option<&'static str>,
    /// Content blocks; empty when an explanation replaces the text.
    pub blocks: Vec<RenderedBlock>,
    /// Explanation of a known provider error.
    pub issue: Option<KnownIssue>,
    /// Text was collapsed and can be expanded.
    pub collapsed: bool,
    /// Operations menu.
    pub menu: Vec<MenuItem>,
}

/// Keep the first `max_lines` lines. Returns the text and whether it was cut.
#[must_use]
pub fn collapse_text(text: &str, max_lines: usize) -> (Cow<'_, str>, bool) {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > max_lines {
        (Cow::Owned(lines[..max_lines].join("\n")), true)
    } else {
        (Cow::Borrowed(text), false)
    }
}

/// Renders messages with shared highlighter, Markdown cache and purpose catalog.
#[derive(Debug)]
pub struct MessageRenderer {
    config: RenderConfig,
    purposes: PurposeCatalog,
    highlighter: Highlighter,
    markdown: MarkdownRenderer,
    parser: BlockParser,
    explainer: ErrorExplainer,
}

impl MessageRenderer {
    /// Create a renderer.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RenderConfig, purposes: PurposeCatalog) -> ChatResult<Self> {
        let markdown = MarkdownRenderer::new(config.markdown_cache_capacity)?;
        Ok(Self {
            config,
            purposes,
            highlighter: Highlighter::new(),
            markdown,
            parser: BlockParser::new()?,
            explainer: ErrorExplainer::new()?,
        })
    }

    /// Rendering settings.
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Shared highlighter.
    #[must_use]
    pub const fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    /// Stylesheet for the configured highlight theme.
    ///
    /// # Errors
    /// Returns an error if the theme does not exist.
    pub fn stylesheet(&self) -> ChatResult<String> {
        self.highlighter.stylesheet(&self.config.highlight_theme)
    }

    fn avatar(&self, message: &Message) -> Option<Avatar> {
        if self.config.zen_mode == ZenMode::Cleaner {
            return None;
        }
        if let Some(url) = message.avatar.as_deref().filter(|u| !u.is_empty()) {
            return Some(Avatar::Image {
                url: url.to_string(),
                alt: message.sender.clone(),
            });
        }
        Some(match message.role {
            Role::System => Avatar::SystemIcon,
            Role::Assistant if message.typing => Avatar::Typing {
                url: self.config.typing_avatar_url.clone(),
            },
            Role::Assistant => message
                .purpose_id
                .and_then(|id| self.purposes.symbol(id))
                .map_or(Avatar::AssistantIcon, |s| Avatar::Symbol(s.to_string())),
            Role::User => Avatar::UserIcon,
        })
    }

    /// Build the view of `message`.
    ///
    /// Long user messages are collapsed unless `expanded`.
    ///
    /// # Errors
    /// Returns an error if highlighting fails.
    pub fn render(
        &self,
        message: &Message,
        expanded: bool,
        is_editing: bool,
    ) -> ChatResult<MessageView> {
        let from_assistant = message.role == Role::Assistant;
        let from_system = message.role == Role::System;
        let from_user = message.role == Role::User;

        let report = self.explainer.explain(&message.text, from_assistant);

        let tone = if from_system && message.was_edited() {
            Tone::Warning
        } else if from_user {
            Tone::Primary
        } else if report.is_unexplained() {
            Tone::Danger
        } else {
            Tone::Surface
        };

        let (text, collapsed) = if from_user && !expanded {
            collapse_text(&message.text, self.config.collapse_after_lines)
        } else {
            (Cow::Borrowed(message.text.as_str()), false)
        };

        let blocks = if report.issue.is_some() {
            Vec::new()
        } else {
            let use_markdown = self.config.render_markdown && !from_system;
            self.parser
                .parse(from_system, &text, &self.highlighter)?
                .into_iter()
                .map(|block| match block {
                    Block::Code(block) => {
                        let actions = CodeActions::for_block(&block);
                        let show_svg = actions.svg_preview;
                        RenderedBlock::Code {
                            block,
                            actions,
                            show_svg,
                        }
                    }
                    Block::Text(prose) if use_markdown => {
                        RenderedBlock::Markdown(self.markdown.render(&prose.content))
                    }
                    Block::Text(prose) => RenderedBlock::Text(render_text(&prose.content)),
                })
                .collect()
        };

        let avatar = self.avatar(message);
        let (model_label, model_tooltip) = if from_assistant && avatar.is_some() {
            (
                Some(pretty_base_model(message.origin_llm.as_deref())),
                Some(
                    message
                        .origin_llm
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
                ),
            )
        } else {
            (None, None)
        };

        Ok(MessageView {
            message_id: message.id,
            role: message.role,
            sender: message.sender.clone(),
            avatar,
            model_label,
            model_tooltip,
            typing: message.typing,
            tone,
            notice: (from_system && message.was_edited()).then_some(EDITED_SYSTEM_NOTICE),
            blocks,
            issue: report.issue,
            collapsed,
            menu: menu_items(message, self.config.speech_enabled, is_editing),
        })
    }
}

impl MessageView {
    /// Flip between the SVG image and its source for the code block at `index`.
    ///
    /// Returns the new state, or `None` if that block is not a complete SVG.
    pub fn toggle_svg(&mut self, index: usize) -> Option<bool> {
        match self.blocks.get_mut(index) {
            Some(RenderedBlock::Code {
                actions, show_svg, ..
            }) if actions.svg_preview => {
                *show_svg = !*show_svg;
                Some(*show_svg)
            }
            _ => None,
        }
    }

    /// Serialize the view as an HTML fragment.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "<div class=\"message message-{} tone-{}{}\" data-id=\"{}\">",
            self.role,
            self.tone.as_str(),
            if self.typing { " typing" } else { "" },
            self.message_id
        );

        if let Some(avatar) = &self.avatar {
            out.push_str("<div class=\"avatar\">");
            match avatar {
                Avatar::Image { url, alt } => {
                    let _ = write!(
                        out,
                        "<img src=\"{}\" alt=\"{}\"/>",
                        html_escape(url),
                        html_escape(alt)
                    );
                }
                Avatar::Typing { url } => {
                    let _ = write!(
                        out,
                        "<img class=\"typing\" src=\"{}\" alt=\"{}\"/>",
                        html_escape(url),
                        html_escape(&self.sender)
                    );
                }
                Avatar::Symbol(symbol) => {
                    let _ = write!(out, "<span class=\"symbol\">{}</span>", html_escape(symbol));
                }
                Avatar::SystemIcon => out.push_str("<span class=\"icon icon-system\"></span>"),
                Avatar::AssistantIcon => {
                    out.push_str("<span class=\"icon icon-assistant\"></span>");
                }
                Avatar::UserIcon => out.push_str("<span class=\"icon icon-user\"></span>"),
            }
            if let (Some(label), Some(tooltip)) = (&self.model_label, &self.model_tooltip) {
                let _ = write!(
                    out,
                    "<span class=\"model\" title=\"{}\">{}</span>",
                    html_escape(tooltip),
                    html_escape(label)
                );
            }
            out.push_str("</div>");
        }

        out.push_str("<div class=\"blocks\">");
        if let Some(notice) = self.notice {
            let _ = write!(out, "<p class=\"notice\">{notice}</p>");
        }
        for block in &self.blocks {
            match block {
                RenderedBlock::Markdown(html) => {
                    let _ = write!(out, "<div class=\"markdown-body\">{html}</div>");
                }
                RenderedBlock::Text(html) => out.push_str(html),
                RenderedBlock::Code {
                    block,
                    show_svg: true,
                    ..
                } if block.is_svg() => out.push_str(&svg_image(&block.code)),
                RenderedBlock::Code { block, .. } => {
                    let language = block.language.as_deref().unwrap_or("text");
                    let _ = write!(
                        out,
                        "<pre class=\"code\" data-language=\"{}\"><code>{}</code></pre>",
                        html_escape(language),
                        block.content
                    );
                }
            }
        }
        if let Some(issue) = &self.issue {
            let _ = write!(
                out,
                "<div class=\"alert alert-warning\">{}</div>",
                html_escape(&issue.to_string())
            );
        }
        if self.collapsed {
            out.push_str("<button class=\"expand\">... expand ...</button>");
        }
        out.push_str("</div></div>");
        out
    }
}
