//! Catalog of chat models, system purposes and locales.
//!
//! Models and locales are open-ended (a message may carry the id of a model
//! that this build does not know about), so they are validated string
//! newtypes. Purposes are a closed set of presets.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when parsing/validating a catalog identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogIdError {
    /// Empty (or whitespace-only) identifier.
    #[error("identifier must not be empty")]
    Empty,
    /// Exceeds the maximum accepted length.
    #[error("identifier too long: got {got}, max {max}")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
    /// Contains a disallowed character.
    #[error("identifier contains invalid character {ch:?} at index {index}")]
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
    /// Not a known purpose name.
    #[error("unknown purpose: {0}")]
    UnknownPurpose(String),
}

fn validate_token(
    raw: &str,
    max: usize,
    extra: fn(char) -> bool,
) -> Result<String, CatalogIdError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(CatalogIdError::Empty);
    }
    if s.len() > max {
        return Err(CatalogIdError::TooLong { max, got: s.len() });
    }
    for (index, ch) in s.chars().enumerate() {
        if !(ch.is_ascii_alphanumeric() || extra(ch)) {
            return Err(CatalogIdError::InvalidChar { ch, index });
        }
    }
    Ok(s.to_owned())
}

// ===== Models ===============================================================

/// Identifier of a chat model (e.g. `gpt-4`, `gpt-3.5-turbo-0301`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatModelId(String);

impl ChatModelId {
    /// Hard ceiling to prevent pathological payloads.
    pub const MAX_LEN: usize = 192;

    /// Build a validated model id from the conservative set `[A-Za-z0-9._:/+-@]`.
    ///
    /// # Errors
    /// Returns `CatalogIdError` if the input is empty, too long, or contains invalid characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CatalogIdError> {
        validate_token(raw.as_ref(), Self::MAX_LEN, |ch| {
            matches!(ch, '.' | '_' | ':' | '/' | '-' | '+' | '@')
        })
        .map(Self)
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChatModelId {
    fn default() -> Self {
        Self(DEFAULT_CHAT_MODEL.to_owned())
    }
}

impl fmt::Display for ChatModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatModelId {
    type Err = CatalogIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChatModelId {
    type Error = CatalogIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChatModelId> for String {
    fn from(value: ChatModelId) -> Self {
        value.0
    }
}

/// Model used by new conversations.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// A model known to the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatModel {
    /// Model identifier.
    pub id: &'static str,
    /// Short display title.
    pub title: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Context window in tokens.
    pub context_window: u32,
}

/// Models offered for selection.
pub const CHAT_MODELS: &[ChatModel] = &[
    ChatModel {
        id: "gpt-4",
        title: "GPT-4",
        description: "Most insightful, larger problems, but slow, expensive, and may be unavailable",
        context_window: 8192,
    },
    ChatModel {
        id: "gpt-3.5-turbo",
        title: "3.5-Turbo",
        description: "A good balance between speed and insight",
        context_window: 4097,
    },
];

/// Look up a known model.
#[must_use]
pub fn chat_model(id: &ChatModelId) -> Option<&'static ChatModel> {
    CHAT_MODELS.iter().find(|model| model.id == id.as_str())
}

/// Short display name for the model that produced a message.
///
/// Dated snapshots collapse onto their base model (`gpt-4-0314` is `gpt-4`).
#[must_use]
pub fn pretty_base_model(model: Option<&str>) -> String {
    match model {
        None | Some("") => String::new(),
        Some(m) if m.starts_with("gpt-4-32k") => "gpt-4-32k".to_string(),
        Some(m) if m.starts_with("gpt-4") => "gpt-4".to_string(),
        Some(m) if m.starts_with("gpt-3.5-turbo") => "3.5 Turbo".to_string(),
        Some(m) => m.to_string(),
    }
}

// ===== Locales ==============================================================

/// Locale selected for a conversation (`en`, `zh-CN`, `pt_BR`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleId(String);

impl LocaleId {
    /// Longest accepted tag.
    pub const MAX_LEN: usize = 35;

    /// Build a validated locale tag.
    ///
    /// # Errors
    /// Returns `CatalogIdError` if the tag is empty, too long, or contains invalid characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CatalogIdError> {
        validate_token(raw.as_ref(), Self::MAX_LEN, |ch| matches!(ch, '-' | '_')).map(Self)
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LocaleId {
    fn default() -> Self {
        Self("en".to_owned())
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocaleId {
    type Err = CatalogIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LocaleId {
    type Error = CatalogIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocaleId> for String {
    fn from(value: LocaleId) -> Self {
        value.0
    }
}

// ===== Purposes =============================================================

/// System-prompt preset selectable per conversation.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemPurposeId {
    /// Programming assistant.
    #[default]
    Developer,
    /// Scientific writing assistant.
    Scientist,
    /// Marketing and growth.
    Catalyst,
    /// Business correspondence.
    Executive,
    /// Visual design and SVG prototypes.
    Designer,
    /// General-purpose assistant.
    Generic,
    /// User-defined system message.
    Custom,
}

impl SystemPurposeId {
    /// Every purpose, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Developer,
        Self::Scientist,
        Self::Catalyst,
        Self::Executive,
        Self::Designer,
        Self::Generic,
        Self::Custom,
    ];

    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Developer => "Developer",
            Self::Scientist => "Scientist",
            Self::Catalyst => "Catalyst",
            Self::Executive => "Executive",
            Self::Designer => "Designer",
            Self::Generic => "Generic",
            Self::Custom => "Custom",
        }
    }
}

impl fmt::Display for SystemPurposeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemPurposeId {
    type Err = CatalogIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| CatalogIdError::UnknownPurpose(value.to_string()))
    }
}

/// A purpose preset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPurpose {
    /// Purpose identifier.
    pub id: SystemPurposeId,
    /// Tile title.
    pub title: String,
    /// One-line description.
    pub description: String,
    /// System message template; `{{Today}}` is replaced with the current date.
    pub system_message: String,
    /// Emoji shown as the assistant avatar.
    pub symbol: String,
}

const TODAY_PLACEHOLDER: &str = "{{Today}}";

impl SystemPurpose {
    fn preset(
        id: SystemPurposeId,
        title: &str,
        description: &str,
        system_message: &str,
        symbol: &str,
    ) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            system_message: system_message.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// System message with the date placeholder filled in.
    #[must_use]
    pub fn system_message_for(&self, today: NaiveDate) -> String {
        self.system_message
            .replace(TODAY_PLACEHOLDER, &today.format("%Y-%m-%d").to_string())
    }
}

/// The set of purposes a user can pick from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeCatalog {
    purposes: Vec<SystemPurpose>,
}

impl Default for PurposeCatalog {
    fn default() -> Self {
        Self {
            purposes: vec![
                SystemPurpose::preset(
                    SystemPurposeId::Developer,
                    "Developer",
                    "Helps you code",
                    "You are a sophisticated, accurate, and modern AI programming assistant",
                    "👩‍💻",
                ),
                SystemPurpose::preset(
                    SystemPurposeId::Scientist,
                    "Scientist",
                    "Helps you write scientific papers",
                    "You are a scientist's assistant. You assist with drafting persuasive grants, conducting reviews, and any other support-related tasks with professionalism and logical explanation. You have a broad and in-depth understanding of all scientific disciplines and their terminology, and are able to write clear, concise, and well-organized text.",
                    "🔬",
                ),
                SystemPurpose::preset(
                    SystemPurposeId::Catalyst,
                    "Catalyst",
                    "Growth hacker with marketing superpowers 🚀",
                    "You are a marketing extraordinaire for a booming startup fusing creativity, data-smarts, and digital prowess to skyrocket growth & wow audiences. So fun. Much meme. 🚀🎯💡",
                    "🚀",
                ),
                SystemPurpose::preset(
                    SystemPurposeId::Executive,
                    "Executive",
                    "Helps you write business emails",
                    "You are an AI corporate assistant. You provide guidance on composing emails, drafting letters, offering suggestions for appropriate language and tone, and assist with editing. You are concise. You explain your process step-by-step and concisely. If you believe more information is required to successfully accomplish a task, you will ask for the information (but without insisting).",
                    "👔",
                ),
                SystemPurpose::preset(
                    SystemPurposeId::Designer,
                    "Designer",
                    "Helps you design",
                    "You are an AI visual design assistant. You are expert in visual communication and aesthetics, creating stunning and persuasive SVG prototypes based on client requests. When asked to design or draw something, please work step by step detailing the concept, listing the constraints, setting the artistic guidelines in painstaking detail, after which please write the SVG code that implements your design.",
                    "🖌️",
                ),
                SystemPurpose::preset(
                    SystemPurposeId::Generic,
                    "ChatGPT4",
                    "Helps you think",
                    "You are ChatGPT, a large language model trained by OpenAI, based on the GPT-4 architecture.\nKnowledge cutoff: 2021-09\nCurrent date: {{Today}}",
                    "🧠",
                ),
                SystemPurpose::preset(
                    SystemPurposeId::Custom,
                    "Custom",
                    "User-defined purpose",
                    "You are ChatGPT, a large language model trained by OpenAI, based on the GPT-4 architecture.\nCurrent date: {{Today}}",
                    "✨",
                ),
            ],
        }
    }
}

impl PurposeCatalog {
    /// Look up a purpose. Every id has an entry.
    #[must_use]
    pub fn get(&self, id: SystemPurposeId) -> Option<&SystemPurpose> {
        self.purposes.iter().find(|p| p.id == id)
    }

    /// Symbol for a purpose, if any.
    #[must_use]
    pub fn symbol(&self, id: SystemPurposeId) -> Option<&str> {
        self.get(id)
            .map(|p| p.symbol.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Purposes whose title contains `term` (case-insensitive), sorted by title.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&SystemPurpose> {
        let needle = term.to_lowercase();
        let mut found: Vec<&SystemPurpose> = self
            .purposes
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .collect();
        found.sort_by(|a, b| a.title.cmp(&b.title));
        found
    }

    /// Replace the system message of the `Custom` purpose.
    pub fn set_custom_system_message(&mut self, message: impl Into<String>) {
        if let Some(custom) = self
            .purposes
            .iter_mut()
            .find(|p| p.id == SystemPurposeId::Custom)
        {
            custom.system_message = message.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_validation() {
        assert!(ChatModelId::new("gpt-3.5-turbo-0301").is_ok());
        assert_eq!(ChatModelId::new("  "), Err(CatalogIdError::Empty));
        assert!(matches!(
            ChatModelId::new("gpt 4"),
            Err(CatalogIdError::InvalidChar { ch: ' ', index: 3 })
        ));
    }

    #[test]
    fn test_known_models() {
        let gpt4 = ChatModelId::default();
        assert_eq!(chat_model(&gpt4).map(|m| m.context_window), Some(8192));
        let unknown = ChatModelId::new("llama-2").unwrap();
        assert!(chat_model(&unknown).is_none());
    }

    #[test]
    fn test_pretty_base_model() {
        assert_eq!(pretty_base_model(None), "");
        assert_eq!(pretty_base_model(Some("gpt-4-0314")), "gpt-4");
        assert_eq!(pretty_base_model(Some("gpt-4-32k-0314")), "gpt-4-32k");
        assert_eq!(pretty_base_model(Some("gpt-3.5-turbo-0301")), "3.5 Turbo");
        assert_eq!(pretty_base_model(Some("claude-2")), "claude-2");
    }

    #[test]
    fn test_locale_serde_validates() {
        let ok: Result<LocaleId, _> = serde_json::from_str("\"zh-CN\"");
        assert!(ok.is_ok());
        let bad: Result<LocaleId, _> = serde_json::from_str("\"en US\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_purpose_parse() {
        assert_eq!("designer".parse(), Ok(SystemPurposeId::Designer));
        assert!("Wizard".parse::<SystemPurposeId>().is_err());
    }

    #[test]
    fn test_purpose_search_sorted_and_filtered() {
        let catalog = PurposeCatalog::default();
        let titles: Vec<&str> = catalog.search("").iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles.len(), SystemPurposeId::ALL.len());
        let mut sorted = titles.clone();
        sorted.sort_unstable();
        assert_eq!(titles, sorted);

        let hits = catalog.search("SCI");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, SystemPurposeId::Scientist);
    }

    #[test]
    fn test_custom_message_and_today() {
        let mut catalog = PurposeCatalog::default();
        catalog.set_custom_system_message("Be brief. Today is {{Today}}.");
        let custom = catalog.get(SystemPurposeId::Custom);
        let day = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        assert_eq!(
            custom.map(|p| p.system_message_for(day)),
            Some("Be brief. Today is 2023-04-01.".to_string())
        );
    }
}
