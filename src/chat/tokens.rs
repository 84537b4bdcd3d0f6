//! Token-count estimation for messages.
//!
//! Counts are estimates used for display and budgeting, cached on each
//! message (`token_count == 0` means "not yet calculated").

use std::collections::HashMap;

use crate::chat::core::catalog::ChatModelId;
use crate::chat::core::config::TokenConfig;
use crate::chat::message::Message;

/// Estimates how many tokens a model would see for a text.
pub trait TokenCounter: Send + Sync {
    /// Count tokens of `text` for `model`.
    fn count(&self, text: &str, model: &ChatModelId) -> u32;
}

/// Character-ratio estimator: `ceil(chars / chars_per_token)`.
#[derive(Clone, Debug)]
pub struct HeuristicCounter {
    chars_per_token: f32,
    model_overrides: HashMap<String, f32>,
}

impl Default for HeuristicCounter {
    fn default() -> Self {
        Self::from_config(&TokenConfig::default())
    }
}

impl HeuristicCounter {
    /// Build from configuration.
    #[must_use]
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            chars_per_token: config.chars_per_token,
            model_overrides: config.model_overrides.clone(),
        }
    }

    /// Ratio for a model; the longest matching override prefix wins.
    #[must_use]
    pub fn ratio_for(&self, model: &ChatModelId) -> f32 {
        self.model_overrides
            .iter()
            .filter(|(prefix, ratio)| model.as_str().starts_with(prefix.as_str()) && **ratio > 0.0)
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.chars_per_token, |(_, ratio)| *ratio)
    }
}

impl TokenCounter for HeuristicCounter {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn count(&self, text: &str, model: &ChatModelId) -> u32 {
        let chars = text.chars().count();
        if chars == 0 {
            return 0;
        }
        let estimate = (chars as f64 / f64::from(self.ratio_for(model))).ceil();
        estimate.min(f64::from(u32::MAX)) as u32
    }
}

/// Refresh the cached count when missing (or always with `force`) and return it.
pub fn update_token_count(
    message: &mut Message,
    counter: &dyn TokenCounter,
    model: &ChatModelId,
    force: bool,
) -> u32 {
    if message.token_count == 0 || force {
        message.token_count = counter.count(&message.text, model);
    }
    message.token_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpt4() -> ChatModelId {
        ChatModelId::default()
    }

    #[test]
    fn test_heuristic_rounds_up() {
        let counter = HeuristicCounter::default();
        assert_eq!(counter.count("", &gpt4()), 0);
        assert_eq!(counter.count("abc", &gpt4()), 1);
        assert_eq!(counter.count("abcd", &gpt4()), 1);
        assert_eq!(counter.count("abcde", &gpt4()), 2);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let counter = HeuristicCounter::default();
        assert_eq!(counter.count("éééé", &gpt4()), 1);
    }

    #[test]
    fn test_model_override_prefix() {
        let mut config = TokenConfig::default();
        config.model_overrides.insert("gpt-3.5".to_string(), 2.0);
        let counter = HeuristicCounter::from_config(&config);
        let turbo = ChatModelId::new("gpt-3.5-turbo").unwrap();
        assert_eq!(counter.count("abcd", &turbo), 2);
        assert_eq!(counter.count("abcd", &gpt4()), 1);
    }

    #[test]
    fn test_update_only_when_missing_or_forced() {
        let counter = HeuristicCounter::default();
        let mut message = Message::user("abcdefgh");
        assert_eq!(update_token_count(&mut message, &counter, &gpt4(), false), 2);

        message.text = "abcdefghijkl".to_string();
        assert_eq!(update_token_count(&mut message, &counter, &gpt4(), false), 2);
        assert_eq!(update_token_count(&mut message, &counter, &gpt4(), true), 3);
    }
}
