//! Supported languages, preference persistence and UI string tables.

use std::collections::HashMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::source::ContentSource;
use crate::storage::Storage;

/// Storage key holding the chosen translation language.
pub const PREFERENCE_KEY: &str = "preferred_language";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "kn")]
    Kannada,
}

impl Language {
    pub const DEFAULT: Language = Language::English;
    pub const ALL: [Language; 2] = [Language::English, Language::Kannada];

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Kannada => "kn",
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Kannada => "ಕನ್ನಡ",
        }
    }

    /// Accepts bare codes and region tags (`kn-IN`, `en_US.UTF-8`).
    pub fn from_code(code: &str) -> Option<Language> {
        let primary = code
            .trim()
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Language::ALL.into_iter().find(|l| l.code() == primary)
    }

    pub fn is_default(self) -> bool { self == Language::DEFAULT }

    /// File name for this language's variant of `stem.ext`.
    pub fn suffixed(self, stem: &str, ext: &str) -> String {
        if self.is_default() {
            format!("{stem}.{ext}")
        } else {
            format!("{stem}.{}.{ext}", self.code())
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

/// Stored preference first, then the environment locale, then the default.
pub fn detect_language(stored: Option<&str>, environment: Option<&str>) -> Language {
    stored
        .and_then(Language::from_code)
        .or_else(|| environment.and_then(Language::from_code))
        .unwrap_or(Language::DEFAULT)
}

pub async fn load_preference(storage: &dyn Storage) -> Option<Language> {
    match storage.get_value(PREFERENCE_KEY).await {
        Ok(v) => v.as_deref().and_then(Language::from_code),
        Err(e) => {
            warn!(error = %e, "language preference unavailable");
            None
        }
    }
}

pub async fn save_preference(storage: &dyn Storage, lang: Language) -> Result<()> {
    storage.put_value(PREFERENCE_KEY, lang.code()).await
}

pub async fn reset_preference(storage: &dyn Storage) -> Result<()> {
    storage.remove_value(PREFERENCE_KEY).await
}

/// UI strings from `locales/<code>/translation.json`.
#[derive(Debug, Clone, Default)]
pub struct Translations {
    tables: HashMap<Language, HashMap<String, String>>,
    language: Language,
}

impl Translations {
    pub async fn load(source: &dyn ContentSource, language: Language) -> Self {
        let mut tables = HashMap::new();
        for lang in Language::ALL {
            let path = format!("locales/{}/translation.json", lang.code());
            match source.read(&path).await {
                Ok(Some(text)) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                    Ok(table) => { tables.insert(lang, table); }
                    Err(e) => warn!(%path, error = %e, "ignoring malformed translation table"),
                },
                Ok(None) => debug!(%path, "no translation table"),
                Err(e) => warn!(%path, error = %e, "failed to read translation table"),
            }
        }
        Self { tables, language }
    }

    pub fn from_tables(tables: HashMap<Language, HashMap<String, String>>, language: Language) -> Self {
        Self { tables, language }
    }

    pub fn language(&self) -> Language { self.language }

    pub fn set_language(&mut self, language: Language) { self.language = language; }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.lookup(self.language, key)
            .or_else(|| self.lookup(Language::DEFAULT, key))
            .unwrap_or(key)
    }

    fn lookup(&self, lang: Language, key: &str) -> Option<&str> {
        self.tables.get(&lang)?.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn codes_and_region_tags() {
        assert_eq!(Language::from_code("kn"), Some(Language::Kannada));
        assert_eq!(Language::from_code("KN-in"), Some(Language::Kannada));
        assert_eq!(Language::from_code("en_US.UTF-8"), Some(Language::English));
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::from_code(""), None);
    }

    #[test]
    fn suffixed_names() {
        assert_eq!(Language::English.suffixed("links", "json"), "links.json");
        assert_eq!(Language::Kannada.suffixed("content", "md"), "content.kn.md");
    }

    #[test]
    fn detection_order() {
        assert_eq!(detect_language(Some("kn"), Some("en_US")), Language::Kannada);
        assert_eq!(detect_language(Some("xx"), Some("kn_IN")), Language::Kannada);
        assert_eq!(detect_language(None, Some("de_DE")), Language::English);
        assert_eq!(detect_language(None, None), Language::English);
    }

    #[tokio::test]
    async fn preference_round_trip() {
        let s = MemoryStorage::new();
        assert_eq!(load_preference(&s).await, None);
        save_preference(&s, Language::Kannada).await.unwrap();
        assert_eq!(load_preference(&s).await, Some(Language::Kannada));
        reset_preference(&s).await.unwrap();
        assert_eq!(load_preference(&s).await, None);
    }

    #[test]
    fn translation_falls_back_to_english_then_key() {
        let mut tables = HashMap::new();
        tables.insert(
            Language::English,
            HashMap::from([("loading".to_string(), "Loading...".to_string()), ("back".to_string(), "Back".to_string())]),
        );
        tables.insert(Language::Kannada, HashMap::from([("back".to_string(), "ಹಿಂದೆ".to_string())]));
        let t = Translations::from_tables(tables, Language::Kannada);
        assert_eq!(t.t("back"), "ಹಿಂದೆ");
        assert_eq!(t.t("loading"), "Loading...");
        assert_eq!(t.t("missing"), "missing");
    }
}
