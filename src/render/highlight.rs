//! Syntax highlighting of code blocks with syntect.
//!
//! Output is classed HTML (`<span class="source js">`), so colours come from a
//! stylesheet exported with [`Highlighter::stylesheet`].

use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::{ParseState, ScopeStackOp, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Language used when a block has no (known) language.
pub const FALLBACK_LANGUAGE: &str = "typescript";

/// Map a language name to the token syntect registers it under.
///
/// The default syntax pack has no TypeScript grammar; the JavaScript one is
/// close enough for highlighting.
#[must_use]
pub fn syntax_token(language: &str) -> &str {
    match language {
        "bash" | "sh" | "shell" => "bash",
        "csharp" => "cs",
        "javascript" | "jsx" | "typescript" | "ts" | "tsx" => "js",
        "markdown" => "md",
        "python" => "py",
        other => other,
    }
}

/// Syntax and theme sets loaded once and shared by all renders.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("syntaxes", &self.syntaxes.syntaxes().len())
            .field("themes", &self.themes.themes.len())
            .finish()
    }
}

impl Highlighter {
    /// Load the bundled syntaxes and themes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    fn syntax_for(&self, language: &str) -> Option<&SyntaxReference> {
        let language = language.trim();
        if language.is_empty() {
            return None;
        }
        self.syntaxes
            .find_syntax_by_token(syntax_token(&language.to_ascii_lowercase()))
    }

    /// Whether a grammar exists for `language`.
    #[must_use]
    pub fn supports(&self, language: &str) -> bool {
        self.syntax_for(language).is_some()
    }

    /// Highlight `code` as classed HTML.
    ///
    /// Unknown languages fall back to [`FALLBACK_LANGUAGE`], then to plain text.
    ///
    /// # Errors
    /// Returns an error if the grammar fails to parse a line.
    pub fn highlight(&self, code: &str, language: Option<&str>) -> ChatResult<String> {
        let syntax = language
            .and_then(|l| self.syntax_for(l))
            .or_else(|| self.syntax_for(FALLBACK_LANGUAGE))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| ChatError::Highlight(e.to_string()))?;
        }
        Ok(generator.finalize())
    }

    /// Number of scopes the grammar for `language` recognizes in `code`.
    ///
    /// Used to guess the language of unlabeled code; 0 when there is no grammar.
    #[must_use]
    pub fn token_score(&self, language: &str, code: &str) -> usize {
        let Some(syntax) = self.syntax_for(language) else {
            return 0;
        };

        let mut state = ParseState::new(syntax);
        let mut score = 0;
        for line in LinesWithEndings::from(code) {
            match state.parse_line(line, &self.syntaxes) {
                Ok(ops) => {
                    score += ops
                        .iter()
                        .filter(|(_, op)| matches!(op, ScopeStackOp::Push(_)))
                        .count();
                }
                Err(_) => break,
            }
        }
        score
    }

    /// CSS for the classed HTML output in the given theme.
    ///
    /// # Errors
    /// Returns an error if the theme does not exist.
    pub fn stylesheet(&self, theme: &str) -> ChatResult<String> {
        let Some(theme_data) = self.themes.themes.get(theme) else {
            return Err(ChatError::InvalidConfig(format!(
                "unknown highlight theme {theme:?}, available: {}",
                self.theme_names().join(", ")
            )));
        };
        css_for_theme_with_class_style(theme_data, ClassStyle::Spaced)
            .map_err(|e| ChatError::Highlight(e.to_string()))
    }

    /// Names of the bundled themes.
    #[must_use]
    pub fn theme_names(&self) -> Vec<&str> {
        self.themes.themes.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_python_emits_spans() {
        let highlighter = Highlighter::new();
        let html = highlighter
            .highlight("def add(a, b):\n    return a + b\n", Some("python"))
            .unwrap();
        assert!(html.contains("<span class=\""));
        assert!(html.contains("add"));
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let highlighter = Highlighter::new();
        assert!(!highlighter.supports("brainfudge"));
        let html = highlighter
            .highlight("const x = 1;", Some("brainfudge"))
            .unwrap();
        assert!(html.contains("source js"));
    }

    #[test]
    fn test_escapes_markup() {
        let highlighter = Highlighter::new();
        let html = highlighter.highlight("a < b && c", None).unwrap();
        assert!(html.contains("&lt;"));
        assert!(!html.contains("a < b"));
    }

    #[test]
    fn test_language_aliases() {
        let highlighter = Highlighter::new();
        for language in ["bash", "css", "java", "javascript", "json", "markdown", "python"] {
            assert!(highlighter.supports(language), "{language}");
        }
        assert!(highlighter.supports("typescript"));
        assert!(highlighter.supports("csharp"));
    }

    #[test]
    fn test_stylesheet() {
        let highlighter = Highlighter::new();
        let css = highlighter.stylesheet("InspiredGitHub").unwrap();
        assert!(css.contains('{'));
        assert!(matches!(
            highlighter.stylesheet("nope"),
            Err(ChatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_token_score_prefers_matching_grammar() {
        let highlighter = Highlighter::new();
        let code = r#"{"name": "halldyll", "tags": [1, 2, 3]}"#;
        assert!(highlighter.token_score("json", code) > 0);
        assert_eq!(highlighter.token_score("nope", code), 0);
    }
}
