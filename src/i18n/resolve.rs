//! The display-string fallback chain.

use crate::i18n::Language;
use crate::store::ContentValue;

/// Compute the display string for a content key.
///
/// The chain is: requested language → Spanish (the canonical source
/// language) → the caller-supplied default. Legacy scalar entries predate
/// the bilingual shape and are returned as-is for every language.
pub fn resolve(requested: Language, stored: Option<&ContentValue>, fallback: &str) -> String {
    match stored {
        None => fallback.to_string(),
        Some(ContentValue::Scalar(text)) => text.clone(),
        Some(ContentValue::Localized(map)) => map
            .get(requested.code())
            .or_else(|| map.get(Language::canonical().code()))
            .cloned()
            .unwrap_or_else(|| fallback.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn localized(pairs: &[(&str, &str)]) -> ContentValue {
        ContentValue::Localized(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    // ==================== Chain Tier Tests ====================

    #[test]
    fn test_absent_returns_fallback() {
        assert_eq!(resolve(Language::Spanish, None, "default"), "default");
        assert_eq!(resolve(Language::English, None, "default"), "default");
    }

    #[test]
    fn test_scalar_wins_regardless_of_language() {
        let stored = ContentValue::Scalar("legado".to_string());
        assert_eq!(resolve(Language::Spanish, Some(&stored), "x"), "legado");
        assert_eq!(resolve(Language::English, Some(&stored), "x"), "legado");
    }

    #[test]
    fn test_map_prefers_requested_language() {
        let stored = localized(&[("es", "Hola"), ("en", "Hello")]);
        assert_eq!(resolve(Language::English, Some(&stored), "x"), "Hello");
        assert_eq!(resolve(Language::Spanish, Some(&stored), "x"), "Hola");
    }

    #[test]
    fn test_map_falls_back_to_spanish() {
        let stored = localized(&[("es", "Hola")]);
        assert_eq!(resolve(Language::English, Some(&stored), "x"), "Hola");
    }

    #[test]
    fn test_map_without_spanish_falls_back_to_default() {
        let stored = localized(&[("en", "Hello")]);
        assert_eq!(resolve(Language::Spanish, Some(&stored), "x"), "x");
    }

    #[test]
    fn test_empty_map_falls_back_to_default() {
        let stored = localized(&[]);
        assert_eq!(resolve(Language::English, Some(&stored), "x"), "x");
    }

    #[test]
    fn test_empty_string_slot_is_still_a_value() {
        // An empty translation is a stored value, not an absence.
        let stored = localized(&[("es", "Hola"), ("en", "")]);
        assert_eq!(resolve(Language::English, Some(&stored), "x"), "");
    }

    // ==================== Property Tests ====================

    proptest! {
        #[test]
        fn prop_absent_always_yields_fallback(fallback in ".*") {
            prop_assert_eq!(resolve(Language::English, None, &fallback), fallback.clone());
            prop_assert_eq!(resolve(Language::Spanish, None, &fallback), fallback);
        }

        #[test]
        fn prop_scalar_always_wins(text in ".*", fallback in ".*") {
            let stored = ContentValue::Scalar(text.clone());
            prop_assert_eq!(resolve(Language::English, Some(&stored), &fallback), text.clone());
            prop_assert_eq!(resolve(Language::Spanish, Some(&stored), &fallback), text);
        }

        #[test]
        fn prop_requested_language_wins(es in ".*", en in ".*", fallback in ".*") {
            let stored = localized(&[("es", es.as_str()), ("en", en.as_str())]);
            prop_assert_eq!(resolve(Language::Spanish, Some(&stored), &fallback), es);
            prop_assert_eq!(resolve(Language::English, Some(&stored), &fallback), en);
        }

        #[test]
        fn prop_spanish_beats_fallback(es in ".*", fallback in ".*") {
            let stored = localized(&[("es", es.as_str())]);
            prop_assert_eq!(resolve(Language::English, Some(&stored), &fallback), es);
        }
    }
}
