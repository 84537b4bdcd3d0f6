//! Split message text into prose and fenced code blocks.

use regex::Regex;

use crate::chat::core::errors::ChatResult;
use crate::render::highlight::Highlighter;
use crate::render::language::infer_code_language;

/// Prose between code fences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    /// Raw text.
    pub content: String,
}

/// A fenced code block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlock {
    /// Highlighted HTML.
    pub content: String,
    /// Inferred language.
    pub language: Option<String>,
    /// A closing fence was found (false while the block is still streaming).
    pub complete: bool,
    /// Trimmed source code.
    pub code: String,
}

impl CodeBlock {
    /// Whether the code is a complete inline SVG document.
    #[must_use]
    pub fn is_svg(&self) -> bool {
        self.code.starts_with("<svg") && self.code.ends_with("</svg>")
    }
}

/// A piece of a parsed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Prose.
    Text(TextBlock),
    /// Code.
    Code(CodeBlock),
}

/// Fence-aware block parser.
#[derive(Debug)]
pub struct BlockParser {
    fence: Regex,
}

impl BlockParser {
    /// Compile the fence pattern.
    ///
    /// # Errors
    /// Returns an error if the pattern fails to compile.
    pub fn new() -> ChatResult<Self> {
        Ok(Self {
            fence: Regex::new(r"`{3,}([\w\\.+]+)?\n([\s\S]*?)(`{3,}|\z)")?,
        })
    }

    /// Parse `text` into blocks.
    ///
    /// With `force_text` the whole text is a single text block. Otherwise every
    /// fence yields the text before it (possibly empty) followed by the code.
    ///
    /// # Errors
    /// Returns an error if highlighting fails.
    pub fn parse(
        &self,
        force_text: bool,
        text: &str,
        highlighter: &Highlighter,
    ) -> ChatResult<Vec<Block>> {
        if force_text {
            return Ok(vec![Block::Text(TextBlock {
                content: text.to_string(),
            })]);
        }

        let mut blocks = Vec::new();
        let mut last_index = 0;

        for captures in self.fence.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let hint = captures.get(1).map_or("", |m| m.as_str().trim());
            let code = captures.get(2).map_or("", |m| m.as_str().trim());
            let complete = captures
                .get(3)
                .is_some_and(|m| m.as_str().starts_with("```"));

            let language = infer_code_language(hint, code, highlighter);
            let content = highlighter.highlight(code, language.as_deref())?;

            blocks.push(Block::Text(TextBlock {
                content: text[last_index..whole.start()].to_string(),
            }));
            blocks.push(Block::Code(CodeBlock {
                content,
                language,
                complete,
                code: code.to_string(),
            }));
            last_index = whole.end();
        }

        if last_index < text.len() {
            blocks.push(Block::Text(TextBlock {
                content: text[last_index..].to_string(),
            }));
        }

        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(force_text: bool, text: &str) -> Vec<Block> {
        BlockParser::new()
            .unwrap()
            .parse(force_text, text, &Highlighter::new())
            .unwrap()
    }

    fn code(block: &Block) -> &CodeBlock {
        match block {
            Block::Code(code) => code,
            Block::Text(_) => panic!("expected code block"),
        }
    }

    fn text(block: &Block) -> &str {
        match block {
            Block::Text(text) => &text.content,
            Block::Code(_) => panic!("expected text block"),
        }
    }

    #[test]
    fn test_plain_text_is_one_block() {
        let blocks = parse(false, "just words");
        assert_eq!(blocks.len(), 1);
        assert_eq!(text(&blocks[0]), "just words");
    }

    #[test]
    fn test_force_text_ignores_fences() {
        let blocks = parse(true, "a\n```py\nx = 1\n```\n");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_text_code_text() {
        let blocks = parse(false, "Here:\n```python\nprint('hi')\n```\nDone.");
        assert_eq!(blocks.len(), 3);
        assert_eq!(text(&blocks[0]), "Here:\n");
        let block = code(&blocks[1]);
        assert_eq!(block.code, "print('hi')");
        assert_eq!(block.language.as_deref(), Some("python"));
        assert!(block.complete);
        assert_eq!(text(&blocks[2]), "\nDone.");
    }

    #[test]
    fn test_leading_fence_keeps_empty_text_block() {
        let blocks = parse(false, "```json\n{}\n```");
        assert_eq!(blocks.len(), 2);
        assert_eq!(text(&blocks[0]), "");
        assert_eq!(code(&blocks[1]).code, "{}");
    }

    #[test]
    fn test_unterminated_fence_is_incomplete() {
        let blocks = parse(false, "Streaming:\n```js\nconst a = 1;\nconst b");
        assert_eq!(blocks.len(), 2);
        let block = code(&blocks[1]);
        assert!(!block.complete);
        assert_eq!(block.code, "const a = 1;\nconst b");
    }

    #[test]
    fn test_file_name_hint() {
        let blocks = parse(false, "```app.ts\nlet x: number = 1;\n```");
        assert_eq!(code(&blocks[1]).language.as_deref(), Some("typescript"));
    }

    #[test]
    fn test_svg_detection() {
        let blocks = parse(false, "```\n<svg viewBox=\"0 0 1 1\"></svg>\n```");
        let block = code(&blocks[1]);
        assert!(block.is_svg());
        assert_eq!(block.language.as_deref(), Some("xml"));
    }
}
