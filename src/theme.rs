//! Named color palettes and the runtime style block.
//!
//! Palettes are persisted as individual documents and applied client-side
//! by rewriting a style block's custom-property declarations. The active
//! selection is a best-effort client-local cache, never authoritative.

use crate::store::ContentStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

const THEME_KEY_PREFIX: &str = "theme:";

/// The fixed token palette, as HSL triplet strings (e.g. `"222.2 84% 4.9%"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColorTokens {
    pub background: String,
    pub foreground: String,
    pub card: String,
    pub card_foreground: String,
    pub popover: String,
    pub popover_foreground: String,
    pub primary: String,
    pub primary_foreground: String,
    pub secondary: String,
    pub secondary_foreground: String,
    pub muted: String,
    pub muted_foreground: String,
    pub accent: String,
    pub accent_foreground: String,
    pub destructive: String,
    pub destructive_foreground: String,
    pub border: String,
    pub input: String,
    pub ring: String,
}

impl ColorTokens {
    /// Token name/value pairs in declaration order.
    pub fn entries(&self) -> [(&'static str, &str); 19] {
        [
            ("background", &self.background),
            ("foreground", &self.foreground),
            ("card", &self.card),
            ("card-foreground", &self.card_foreground),
            ("popover", &self.popover),
            ("popover-foreground", &self.popover_foreground),
            ("primary", &self.primary),
            ("primary-foreground", &self.primary_foreground),
            ("secondary", &self.secondary),
            ("secondary-foreground", &self.secondary_foreground),
            ("muted", &self.muted),
            ("muted-foreground", &self.muted_foreground),
            ("accent", &self.accent),
            ("accent-foreground", &self.accent_foreground),
            ("destructive", &self.destructive),
            ("destructive-foreground", &self.destructive_foreground),
            ("border", &self.border),
            ("input", &self.input),
            ("ring", &self.ring),
        ]
    }

    pub fn default_light() -> Self {
        Self {
            background: "0 0% 100%".into(),
            foreground: "222.2 84% 4.9%".into(),
            card: "0 0% 100%".into(),
            card_foreground: "222.2 84% 4.9%".into(),
            popover: "0 0% 100%".into(),
            popover_foreground: "222.2 84% 4.9%".into(),
            primary: "142.1 76.2% 36.3%".into(),
            primary_foreground: "355.7 100% 97.3%".into(),
            secondary: "210 40% 96.1%".into(),
            secondary_foreground: "222.2 47.4% 11.2%".into(),
            muted: "210 40% 96.1%".into(),
            muted_foreground: "215.4 16.3% 46.9%".into(),
            accent: "210 40% 96.1%".into(),
            accent_foreground: "222.2 47.4% 11.2%".into(),
            destructive: "0 84.2% 60.2%".into(),
            destructive_foreground: "210 40% 98%".into(),
            border: "214.3 31.8% 91.4%".into(),
            input: "214.3 31.8% 91.4%".into(),
            ring: "142.1 76.2% 36.3%".into(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "20 14.3% 4.1%".into(),
            foreground: "0 0% 95%".into(),
            card: "24 9.8% 10%".into(),
            card_foreground: "0 0% 95%".into(),
            popover: "0 0% 9%".into(),
            popover_foreground: "0 0% 95%".into(),
            primary: "142.1 70.6% 45.3%".into(),
            primary_foreground: "144.9 80.4% 10%".into(),
            secondary: "240 3.7% 15.9%".into(),
            secondary_foreground: "0 0% 98%".into(),
            muted: "0 0% 15%".into(),
            muted_foreground: "240 5% 64.9%".into(),
            accent: "12 6.5% 15.1%".into(),
            accent_foreground: "0 0% 98%".into(),
            destructive: "0 62.8% 30.6%".into(),
            destructive_foreground: "0 85.7% 97.3%".into(),
            border: "240 3.7% 15.9%".into(),
            input: "240 3.7% 15.9%".into(),
            ring: "142.4 71.8% 29.2%".into(),
        }
    }
}

/// Light and dark token sets for one palette.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeColors {
    pub light: ColorTokens,
    pub dark: ColorTokens,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            light: ColorTokens::default_light(),
            dark: ColorTokens::default_dark(),
        }
    }
}

/// A named, user-created palette document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredefinedTheme {
    pub id: String,
    pub name: String,
    pub colors: ThemeColors,
}

/// Render the custom-property declarations for a palette.
///
/// Pure: the same palette always renders to the same block, so re-applying
/// a palette rewrites the style block with identical text.
pub fn render_css(colors: &ThemeColors) -> String {
    let mut css = String::new();
    css.push_str(":root {\n");
    for (token, value) in colors.light.entries() {
        let _ = writeln!(css, "  --{}: {};", token, value);
    }
    css.push_str("}\n\n.dark {\n");
    for (token, value) in colors.dark.entries() {
        let _ = writeln!(css, "  --{}: {};", token, value);
    }
    css.push_str("}\n");
    css
}

/// CRUD over persisted palette documents.
#[derive(Clone)]
pub struct ThemeRegistry {
    store: ContentStore,
}

impl ThemeRegistry {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    fn doc_id(theme_id: &str) -> String {
        format!("{}{}", THEME_KEY_PREFIX, theme_id)
    }

    pub async fn list(&self) -> Result<Vec<PredefinedTheme>> {
        let documents = self.store.list_json_prefix(THEME_KEY_PREFIX).await?;
        let mut themes = Vec::with_capacity(documents.len());
        for (id, raw) in documents {
            match serde_json::from_value::<PredefinedTheme>(raw) {
                Ok(theme) => themes.push(theme),
                Err(e) => warn!("Skipping malformed theme document '{}': {}", id, e),
            }
        }
        Ok(themes)
    }

    pub async fn get(&self, theme_id: &str) -> Option<PredefinedTheme> {
        let raw = self.store.get_json(&Self::doc_id(theme_id)).await?;
        serde_json::from_value(raw).ok()
    }

    /// Persist a new palette under a fresh id.
    pub async fn save(&self, name: &str, colors: ThemeColors) -> Result<PredefinedTheme> {
        let theme = PredefinedTheme {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            colors,
        };
        self.put(&theme).await?;
        Ok(theme)
    }

    /// Replace an existing palette document wholesale.
    pub async fn update(&self, theme: &PredefinedTheme) -> Result<()> {
        self.put(theme).await
    }

    async fn put(&self, theme: &PredefinedTheme) -> Result<()> {
        let raw = serde_json::to_value(theme).context("Failed to encode theme document")?;
        self.store.put_json(&Self::doc_id(&theme.id), &raw).await
    }

    pub async fn delete(&self, theme_id: &str) -> Result<bool> {
        self.store.remove(&Self::doc_id(theme_id)).await
    }
}

/// The client-local runtime style block plus the active-palette selection.
///
/// Nothing here touches the store; the selection is lost on restart and
/// that is acceptable.
pub struct ActiveTheme {
    state: Mutex<ActiveState>,
}

struct ActiveState {
    selected: Option<String>,
    css: String,
}

impl Default for ActiveTheme {
    fn default() -> Self {
        Self {
            state: Mutex::new(ActiveState {
                selected: None,
                css: render_css(&ThemeColors::default()),
            }),
        }
    }
}

impl ActiveTheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite the style block from a palette and remember the selection.
    pub fn apply(&self, theme: &PredefinedTheme) {
        let mut state = self.state.lock().unwrap();
        state.selected = Some(theme.id.clone());
        state.css = render_css(&theme.colors);
    }

    /// Rewrite the style block from raw token sets (no selection change).
    pub fn apply_colors(&self, colors: &ThemeColors) {
        self.state.lock().unwrap().css = render_css(colors);
    }

    pub fn css(&self) -> String {
        self.state.lock().unwrap().css.clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.state.lock().unwrap().selected.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ThemeRegistry {
        ThemeRegistry::new(ContentStore::open_in_memory().unwrap())
    }

    // ==================== Rendering Tests ====================

    #[test]
    fn test_render_css_contains_both_blocks() {
        let css = render_css(&ThemeColors::default());
        assert!(css.starts_with(":root {"));
        assert!(css.contains(".dark {"));
    }

    #[test]
    fn test_render_css_declares_every_token() {
        let css = render_css(&ThemeColors::default());
        for (token, _) in ColorTokens::default_light().entries() {
            // One declaration in :root, one in .dark.
            assert_eq!(
                css.matches(&format!("--{}:", token)).count(),
                2,
                "token {} missing",
                token
            );
        }
    }

    #[test]
    fn test_render_css_is_idempotent() {
        let colors = ThemeColors::default();
        assert_eq!(render_css(&colors), render_css(&colors));
    }

    #[test]
    fn test_render_css_uses_hsl_triplets_verbatim() {
        let css = render_css(&ThemeColors::default());
        assert!(css.contains("--background: 0 0% 100%;"));
        assert!(css.contains("--background: 20 14.3% 4.1%;"));
    }

    // ==================== Registry CRUD Tests ====================

    #[tokio::test]
    async fn test_save_assigns_unique_ids() {
        let registry = registry();
        let a = registry.save("Bosque", ThemeColors::default()).await.unwrap();
        let b = registry.save("Bosque", ThemeColors::default()).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_list_returns_saved_themes() {
        let registry = registry();
        registry.save("Bosque", ThemeColors::default()).await.unwrap();
        registry.save("Volcán", ThemeColors::default()).await.unwrap();

        let themes = registry.list().await.unwrap();
        assert_eq!(themes.len(), 2);
        let names: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"Bosque"));
        assert!(names.contains(&"Volcán"));
    }

    #[tokio::test]
    async fn test_get_round_trips_colors() {
        let registry = registry();
        let saved = registry.save("Bosque", ThemeColors::default()).await.unwrap();

        let fetched = registry.get(&saved.id).await.unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test]
    async fn test_update_replaces_wholesale() {
        let registry = registry();
        let mut theme = registry.save("Bosque", ThemeColors::default()).await.unwrap();

        theme.name = "Bosque Oscuro".to_string();
        theme.colors.light.primary = "160 84% 39%".to_string();
        registry.update(&theme).await.unwrap();

        let fetched = registry.get(&theme.id).await.unwrap();
        assert_eq!(fetched.name, "Bosque Oscuro");
        assert_eq!(fetched.colors.light.primary, "160 84% 39%");
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let registry = registry();
        let theme = registry.save("Bosque", ThemeColors::default()).await.unwrap();

        assert!(registry.delete(&theme.id).await.unwrap());
        assert!(!registry.delete(&theme.id).await.unwrap());
        assert!(registry.get(&theme.id).await.is_none());
        assert!(registry.list().await.unwrap().is_empty());
    }

    // ==================== Active Theme Tests ====================

    #[test]
    fn test_active_theme_starts_with_default_palette() {
        let active = ActiveTheme::new();
        assert!(active.selected().is_none());
        assert_eq!(active.css(), render_css(&ThemeColors::default()));
    }

    #[tokio::test]
    async fn test_apply_sets_selection_and_css() {
        let registry = registry();
        let theme = registry.save("Bosque", ThemeColors::default()).await.unwrap();

        let active = ActiveTheme::new();
        active.apply(&theme);

        assert_eq!(active.selected(), Some(theme.id.clone()));
        assert_eq!(active.css(), render_css(&theme.colors));
    }

    #[test]
    fn test_apply_twice_is_a_no_op() {
        let active = ActiveTheme::new();
        let colors = ThemeColors::default();

        active.apply_colors(&colors);
        let first = active.css();
        active.apply_colors(&colors);

        assert_eq!(active.css(), first);
    }

    #[test]
    fn test_apply_is_not_persisted() {
        let theme = PredefinedTheme {
            id: "local".to_string(),
            name: "Local".to_string(),
            colors: ThemeColors::default(),
        };
        let active = ActiveTheme::new();
        active.apply(&theme);

        // A fresh instance knows nothing about the previous selection.
        assert!(ActiveTheme::new().selected().is_none());
    }
}
