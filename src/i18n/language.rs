//! Language type: validated representation of the two site languages.

use anyhow::{bail, Result};

/// A supported site language.
///
/// Spanish is the canonical (source) language; English is its translation
/// sibling. Every language has exactly one sibling, which keeps the
/// bilingual write path (`save` merges both slots) total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Spanish,
    English,
}

impl Language {
    /// Create a Language from an ISO 639-1 code.
    ///
    /// # Returns
    /// * `Ok(Language)` for `"es"` or `"en"`
    /// * `Err` for anything else
    pub fn from_code(code: &str) -> Result<Language> {
        match code {
            "es" => Ok(Language::Spanish),
            "en" => Ok(Language::English),
            other => bail!("Unknown language code: '{}'", other),
        }
    }

    /// The canonical (source) language all content is authored in.
    pub fn canonical() -> Language {
        Language::Spanish
    }

    /// The ISO 639-1 code (`"es"` / `"en"`).
    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
        }
    }

    /// English name of the language, used in translation prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Spanish => "Spanish",
            Language::English => "English",
        }
    }

    /// Whether this is the canonical language.
    pub fn is_canonical(&self) -> bool {
        *self == Language::canonical()
    }

    /// The other site language.
    pub fn sibling(&self) -> Language {
        match self {
            Language::Spanish => Language::English,
            Language::English => Language::Spanish,
        }
    }
}
