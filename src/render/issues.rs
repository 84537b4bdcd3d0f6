//! Recognize provider errors echoed into assistant messages.

use std::fmt;

use regex::Regex;

use crate::chat::core::errors::ChatResult;

const ISSUE_PREFIXES: [&str; 2] = ["[Issue] ", "[OpenAI Issue]"];

const USAGE_URL: &str = "https://platform.openai.com/account/usage";
const LIMITS_URL: &str = "https://platform.openai.com/account/billing/limits";

/// A known provider error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownIssue {
    /// HTTP 429 from the provider.
    RateLimited,
    /// The key has no access to the requested model.
    ModelNotFound,
    /// Prompt plus completion exceed the model context window.
    ContextExceeded {
        /// Tokens requested, when the provider reported it.
        requested: Option<u64>,
        /// Context window, when the provider reported it.
        maximum: Option<u64>,
    },
    /// The key was rejected.
    InvalidApiKey,
    /// The account ran out of quota.
    InsufficientQuota,
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for KnownIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => f.write_str(
                "The model is currently overloaded (429 Too Many Requests). Please try again in a moment.",
            ),
            Self::ModelNotFound => f.write_str(
                "The API key is not authorized to use this model. Please select another model or check your account access.",
            ),
            Self::ContextExceeded { requested, maximum } => {
                f.write_str("The conversation is too long for the model context window")?;
                if let (Some(requested), Some(maximum)) = (requested, maximum) {
                    write!(
                        f,
                        " ({} tokens > {})",
                        group_thousands(*requested),
                        group_thousands(*maximum)
                    )?;
                }
                f.write_str(". Please shorten the conversation or delete some messages.")
            }
            Self::InvalidApiKey => f.write_str(
                "The API key is invalid. Please check the key in the settings.",
            ),
            Self::InsufficientQuota => write!(
                f,
                "The API key appears to have insufficient quota. Please check your usage ({USAGE_URL}) and make sure the usage is under the limits ({LIMITS_URL})."
            ),
        }
    }
}

/// Outcome of inspecting a message for provider errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorReport {
    /// The message is an assistant error.
    pub is_assistant_error: bool,
    /// Recognized error, rendered instead of the message text.
    pub issue: Option<KnownIssue>,
}

impl ErrorReport {
    /// An error that could not be explained.
    #[must_use]
    pub const fn is_unexplained(&self) -> bool {
        self.is_assistant_error && self.issue.is_none()
    }
}

/// Classifier for assistant error messages.
#[derive(Debug)]
pub struct ErrorExplainer {
    context_pattern: Regex,
}

impl ErrorExplainer {
    /// Compile the patterns.
    ///
    /// # Errors
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> ChatResult<Self> {
        Ok(Self {
            context_pattern: Regex::new(
                r"maximum context length is (\d+) tokens.+you requested (\d+) tokens",
            )?,
        })
    }

    /// Inspect `text`. Only assistant messages can be errors.
    #[must_use]
    pub fn explain(&self, text: &str, is_assistant: bool) -> ErrorReport {
        let is_assistant_error =
            is_assistant && ISSUE_PREFIXES.iter().any(|prefix| text.starts_with(prefix));
        if !is_assistant_error {
            return ErrorReport::default();
        }

        let issue = if text.contains("429 Too Many Requests") {
            Some(KnownIssue::RateLimited)
        } else if text.contains("\"model_not_found\"") {
            Some(KnownIssue::ModelNotFound)
        } else if text.contains("\"context_length_exceeded\"") {
            let numbers = self.context_pattern.captures(text);
            let number = |index: usize| {
                numbers
                    .as_ref()
                    .and_then(|c| c.get(index))
                    .and_then(|m| m.as_str().parse::<u64>().ok())
            };
            Some(KnownIssue::ContextExceeded {
                requested: number(2),
                maximum: number(1),
            })
        } else if text.contains("\"invalid_api_key\"") {
            Some(KnownIssue::InvalidApiKey)
        } else if text.contains("\"insufficient_quota\"") {
            Some(KnownIssue::InsufficientQuota)
        } else {
            None
        };

        ErrorReport {
            is_assistant_error,
            issue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explain(text: &str) -> ErrorReport {
        ErrorExplainer::new().unwrap().explain(text, true)
    }

    #[test]
    fn test_not_an_error() {
        assert_eq!(explain("All good"), ErrorReport::default());
        let user = ErrorExplainer::new()
            .unwrap()
            .explain("[Issue] \"invalid_api_key\"", false);
        assert!(!user.is_assistant_error);
    }

    #[test]
    fn test_rate_limit() {
        let report = explain("[OpenAI Issue] OpenAI API error: 429 Too Many Requests");
        assert_eq!(report.issue, Some(KnownIssue::RateLimited));
    }

    #[test]
    fn test_context_exceeded_parses_numbers() {
        let report = explain(
            "[Issue] {\"code\": \"context_length_exceeded\", \"message\": \"This model's maximum context length is 8192 tokens. However, you requested 10500 tokens (10000 in the messages, 500 in the completion).\"}",
        );
        assert_eq!(
            report.issue,
            Some(KnownIssue::ContextExceeded {
                requested: Some(10500),
                maximum: Some(8192)
            })
        );
        let text = report.issue.map(|i| i.to_string()).unwrap();
        assert!(text.contains("10,500 tokens > 8,192"));
    }

    #[test]
    fn test_context_exceeded_without_numbers() {
        let report = explain("[Issue] \"context_length_exceeded\"");
        assert_eq!(
            report.issue,
            Some(KnownIssue::ContextExceeded {
                requested: None,
                maximum: None
            })
        );
    }

    #[test]
    fn test_other_known_codes() {
        assert_eq!(
            explain("[Issue] {\"code\":\"model_not_found\"}").issue,
            Some(KnownIssue::ModelNotFound)
        );
        assert_eq!(
            explain("[Issue] {\"code\":\"invalid_api_key\"}").issue,
            Some(KnownIssue::InvalidApiKey)
        );
        let quota = explain("[Issue] {\"code\":\"insufficient_quota\"}");
        assert_eq!(quota.issue, Some(KnownIssue::InsufficientQuota));
        assert!(quota.issue.unwrap().to_string().contains(USAGE_URL));
    }

    #[test]
    fn test_unknown_error_is_unexplained() {
        let report = explain("[Issue] something broke");
        assert!(report.is_unexplained());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(7), "7");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
