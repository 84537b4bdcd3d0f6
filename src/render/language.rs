//! Guess the language of a fenced code block.

use crate::render::highlight::Highlighter;

/// Languages tried, in order, when nothing else identifies the code.
///
/// `typescript` is scored with the JavaScript grammar and ties with
/// `javascript`, which comes first, so scoring never picks it. Annotated
/// TypeScript is caught earlier by [`TYPESCRIPT_ANNOTATIONS`].
pub const SCORED_LANGUAGES: [&str; 8] = [
    "bash",
    "css",
    "java",
    "javascript",
    "json",
    "markdown",
    "python",
    "typescript",
];

const CODE_STARTS: &[(&[&str], &str)] = &[
    (&["<!DOCTYPE html", "<html"], "html"),
    (&["<"], "xml"),
    (&["from "], "python"),
    (&["import ", "export "], "typescript"),
    (&["interface ", "function "], "typescript"),
    (&["package "], "java"),
    (&["using "], "csharp"),
];

/// Type annotations that mark code as TypeScript rather than JavaScript or Python.
pub const TYPESCRIPT_ANNOTATIONS: [&str; 8] = [
    ": number",
    ": string",
    ": boolean",
    ": void",
    ": unknown",
    ": never",
    ": any",
    ": Record<",
];

fn language_for_extension(extension: &str) -> Option<&'static str> {
    Some(match extension {
        "cs" => "csharp",
        "html" => "html",
        "java" => "java",
        "js" | "jsx" => "javascript",
        "json" => "json",
        "md" => "markdown",
        "py" => "python",
        "sh" => "bash",
        "ts" | "tsx" => "typescript",
        "xml" => "xml",
        _ => return None,
    })
}

/// Infer the language from the fence hint, then the opening of the code,
/// then TypeScript annotations, then the grammar that recognizes the most tokens.
#[must_use]
pub fn infer_code_language(hint: &str, code: &str, highlighter: &Highlighter) -> Option<String> {
    if !hint.is_empty() {
        if !hint.contains('.') {
            return Some(hint.to_string());
        }
        // a file name: use the extension
        if let Some(language) = hint.rsplit('.').next().and_then(language_for_extension) {
            return Some(language.to_string());
        }
    }

    for (starts, language) in CODE_STARTS {
        if starts.iter().any(|s| code.starts_with(s)) {
            return Some((*language).to_string());
        }
    }

    if TYPESCRIPT_ANNOTATIONS.iter().any(|a| code.contains(a)) {
        return Some("typescript".to_string());
    }

    let mut best: Option<&str> = None;
    let mut best_score = 0;
    for language in SCORED_LANGUAGES {
        let score = highlighter.token_score(language, code);
        if score > best_score {
            best_score = score;
            best = Some(language);
        }
    }
    best.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(hint: &str, code: &str) -> Option<String> {
        infer_code_language(hint, code, &Highlighter::new())
    }

    #[test]
    fn test_hint_without_dot_is_taken_verbatim() {
        assert_eq!(infer("rust", "fn main() {}").as_deref(), Some("rust"));
    }

    #[test]
    fn test_file_name_hint_maps_extension() {
        assert_eq!(infer("app.tsx", "x").as_deref(), Some("typescript"));
        assert_eq!(infer("run.sh", "x").as_deref(), Some("bash"));
        assert_eq!(infer("Main.cs", "x").as_deref(), Some("csharp"));
    }

    #[test]
    fn test_unknown_extension_falls_through_to_code_starts() {
        assert_eq!(infer("notes.txt", "package main").as_deref(), Some("java"));
    }

    #[test]
    fn test_code_starts() {
        assert_eq!(infer("", "<!DOCTYPE html><html></html>").as_deref(), Some("html"));
        assert_eq!(infer("", "<svg></svg>").as_deref(), Some("xml"));
        assert_eq!(infer("", "from os import path").as_deref(), Some("python"));
        assert_eq!(infer("", "import React from 'react'").as_deref(), Some("typescript"));
        assert_eq!(infer("", "function f() {}").as_deref(), Some("typescript"));
        assert_eq!(infer("", "using System;").as_deref(), Some("csharp"));
    }

    #[test]
    fn test_type_annotations_mean_typescript() {
        assert_eq!(
            infer("", "let x: number = 1; const y = (a: string) => a;").as_deref(),
            Some("typescript")
        );
        assert_ne!(
            infer("", "def f(a: int) -> str:\n    return str(a)\n").as_deref(),
            Some("typescript")
        );
    }

    #[test]
    fn test_scored_fallback_finds_something() {
        let guess = infer("", "body { color: red; margin: 0 auto; }\n");
        assert!(guess.is_some());
        assert!(SCORED_LANGUAGES.contains(&guess.as_deref().unwrap_or_default()));
    }

    #[test]
    fn test_empty_code_has_no_language() {
        assert_eq!(infer("", ""), None);
    }
}
