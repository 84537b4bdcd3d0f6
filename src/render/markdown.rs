//! Markdown rendering of text blocks.
//!
//! Uses pulldown-cmark with the GitHub extensions. Raw HTML in the source is
//! shown as text, never passed through, and link or image destinations with a
//! scheme outside [`SAFE_URL_SCHEMES`] are dropped. Results are cached by
//! content hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Escape HTML entities.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// URL schemes allowed in link and image destinations. Relative URLs are always allowed.
pub const SAFE_URL_SCHEMES: [&str; 6] = ["http", "https", "irc", "ircs", "mailto", "xmpp"];

/// Whether `dest` may be emitted as an `href` or `src`.
#[must_use]
pub fn is_safe_url(dest: &str) -> bool {
    match Url::parse(dest) {
        Ok(url) => SAFE_URL_SCHEMES.contains(&url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_safe_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_safe_url(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        other => other,
    }
}

fn hash_content(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Cached Markdown to HTML renderer.
#[derive(Debug)]
pub struct MarkdownRenderer {
    options: Options,
    cache: Mutex<LruCache<u64, String>>,
}

impl MarkdownRenderer {
    /// Create a renderer caching up to `capacity` documents.
    ///
    /// # Errors
    /// Returns an error if `capacity` is zero.
    pub fn new(capacity: usize) -> ChatResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            ChatError::InvalidConfig("render.markdown_cache_capacity must be > 0".to_string())
        })?;

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);

        Ok(Self {
            options,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Render Markdown to HTML, reusing a cached result when available.
    pub fn render(&self, content: &str) -> String {
        let hash = hash_content(content);
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(html) = cache.get(&hash) {
                return html.clone();
            }
        }

        let html = self.render_uncached(content);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(hash, html.clone());
        html
    }

    fn render_uncached(&self, content: &str) -> String {
        let parser = Parser::new_ext(content, self.options).map(sanitize_event);
        let mut out = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }

    /// Number of cached documents.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Render plain text: escaped, whitespace preserved by the `plain-text` class.
#[must_use]
pub fn render_text(content: &str) -> String {
    format!("<div class=\"plain-text\">{}</div>", html_escape(content))
}
