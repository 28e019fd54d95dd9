//! The system-settings aggregate.
//!
//! Administrative pages edit one typed `SystemSettings` document, but every
//! leaf lives under its own content key so the inline editor and the
//! settings form share storage. Reads fill gaps from the compiled-in
//! default table; writes decompose into one `put` per leaf with no
//! cross-key transaction, so a failure partway through leaves the earlier
//! leaves committed.

use crate::i18n::{resolve, Language};
use crate::store::{ContentStore, ContentValue};
use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Result shape returned to administrative callers for any batch write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteOutcome {
    pub success: bool,
    pub message: String,
}

impl WriteOutcome {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// Field-level validation failure, surfaced before any leaf is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: must be a valid URL")]
    InvalidUrl { field: String },
    #[error("{field}: must contain digits only")]
    InvalidPhone { field: String },
    #[error("{field}: Spanish text must not be empty")]
    MissingSpanish { field: String },
    #[error("{field}: unknown entry")]
    UnknownEntry { field: String },
}

/// One navigation link: both labels plus its visibility toggle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavLink {
    pub es: String,
    pub en: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// A bilingual caption (button label, Open Graph text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caption {
    pub es: String,
    pub en: String,
}

/// The full settings aggregate assembled from individual content keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub logo_url: String,
    pub whatsapp_community_link: String,
    pub instagram_url: String,
    pub facebook_url: String,
    pub tiktok_url: String,
    pub whatsapp_number: String,
    pub nav_links: BTreeMap<String, NavLink>,
    pub home_buttons: BTreeMap<String, Caption>,
    pub component_buttons: BTreeMap<String, Caption>,
    pub og_title: Caption,
    pub og_description: Caption,
}

// ==================== Default value table ====================
// One literal fallback per leaf, applied whenever the key is absent.

const DEFAULT_LOGO_URL: &str = "https://static.ceremonias.cr/brand/logo.png";
const DEFAULT_WHATSAPP_COMMUNITY_LINK: &str = "https://chat.whatsapp.com/ceremoniascr";
const DEFAULT_INSTAGRAM_URL: &str = "https://www.instagram.com/ceremonias.cr";
const DEFAULT_FACEBOOK_URL: &str = "https://www.facebook.com/ceremonias.cr";
const DEFAULT_TIKTOK_URL: &str = "https://www.tiktok.com/@ceremonias.cr";
const DEFAULT_WHATSAPP_NUMBER: &str = "50687992560";

struct EntryDefault {
    key: &'static str,
    es: &'static str,
    en: &'static str,
}

const NAV_DEFAULTS: &[EntryDefault] = &[
    EntryDefault { key: "home", es: "Inicio", en: "Home" },
    EntryDefault { key: "ceremonies", es: "Ceremonias", en: "Ceremonies" },
    EntryDefault { key: "guide", es: "Guía", en: "Guide" },
    EntryDefault { key: "gallery", es: "Galería", en: "Gallery" },
    EntryDefault { key: "contact", es: "Contacto", en: "Contact" },
];

const HOME_BUTTON_DEFAULTS: &[EntryDefault] = &[
    EntryDefault { key: "bookCeremony", es: "Reserva tu ceremonia", en: "Book your ceremony" },
    EntryDefault { key: "exploreGuide", es: "Explora la guía", en: "Explore the guide" },
    EntryDefault { key: "joinCommunity", es: "Únete a la comunidad", en: "Join the community" },
];

const COMPONENT_BUTTON_DEFAULTS: &[EntryDefault] = &[
    EntryDefault { key: "send", es: "Enviar", en: "Send" },
    EntryDefault { key: "readMore", es: "Leer más", en: "Read more" },
    EntryDefault { key: "bookNow", es: "Reservar ahora", en: "Book now" },
    EntryDefault { key: "backHome", es: "Volver al inicio", en: "Back to home" },
];

const DEFAULT_OG_TITLE: (&str, &str) = ("Ceremonias en Costa Rica", "Ceremonies in Costa Rica");
const DEFAULT_OG_DESCRIPTION: (&str, &str) = (
    "Vive una ceremonia guiada en la naturaleza",
    "Experience a guided ceremony in nature",
);

/// Content key for one aggregate entry: camel-case topic + field name,
/// e.g. `("nav", "home")` -> `navHome`.
fn leaf_key(topic: &str, name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", topic, first.to_uppercase(), chars.as_str()),
        None => topic.to_string(),
    }
}

impl SystemSettings {
    /// The aggregate with every leaf at its compiled-in default.
    pub fn defaults() -> Self {
        Self {
            logo_url: DEFAULT_LOGO_URL.to_string(),
            whatsapp_community_link: DEFAULT_WHATSAPP_COMMUNITY_LINK.to_string(),
            instagram_url: DEFAULT_INSTAGRAM_URL.to_string(),
            facebook_url: DEFAULT_FACEBOOK_URL.to_string(),
            tiktok_url: DEFAULT_TIKTOK_URL.to_string(),
            whatsapp_number: DEFAULT_WHATSAPP_NUMBER.to_string(),
            nav_links: NAV_DEFAULTS
                .iter()
                .map(|d| {
                    (
                        d.key.to_string(),
                        NavLink {
                            es: d.es.to_string(),
                            en: d.en.to_string(),
                            visible: true,
                        },
                    )
                })
                .collect(),
            home_buttons: caption_defaults(HOME_BUTTON_DEFAULTS),
            component_buttons: caption_defaults(COMPONENT_BUTTON_DEFAULTS),
            og_title: Caption {
                es: DEFAULT_OG_TITLE.0.to_string(),
                en: DEFAULT_OG_TITLE.1.to_string(),
            },
            og_description: Caption {
                es: DEFAULT_OG_DESCRIPTION.0.to_string(),
                en: DEFAULT_OG_DESCRIPTION.1.to_string(),
            },
        }
    }
}

fn caption_defaults(defaults: &[EntryDefault]) -> BTreeMap<String, Caption> {
    defaults
        .iter()
        .map(|d| {
            (
                d.key.to_string(),
                Caption {
                    es: d.es.to_string(),
                    en: d.en.to_string(),
                },
            )
        })
        .collect()
}

/// Validate the aggregate shape. Runs before any leaf is written; a
/// non-empty result means nothing was persisted for the submission.
pub fn validate(settings: &SystemSettings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let url_fields = [
        ("logoUrl", &settings.logo_url),
        ("whatsappCommunityLink", &settings.whatsapp_community_link),
        ("instagramUrl", &settings.instagram_url),
        ("facebookUrl", &settings.facebook_url),
        ("tiktokUrl", &settings.tiktok_url),
    ];
    for (field, value) in url_fields {
        if Url::parse(value).is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: field.to_string(),
            });
        }
    }

    if settings.whatsapp_number.is_empty()
        || !settings.whatsapp_number.chars().all(|c| c.is_ascii_digit())
    {
        errors.push(ValidationError::InvalidPhone {
            field: "whatsappNumber".to_string(),
        });
    }

    check_entries(
        "nav",
        NAV_DEFAULTS,
        settings.nav_links.iter().map(|(k, v)| (k.as_str(), v.es.as_str())),
        &mut errors,
    );
    check_entries(
        "homeButton",
        HOME_BUTTON_DEFAULTS,
        settings.home_buttons.iter().map(|(k, v)| (k.as_str(), v.es.as_str())),
        &mut errors,
    );
    check_entries(
        "componentButton",
        COMPONENT_BUTTON_DEFAULTS,
        settings.component_buttons.iter().map(|(k, v)| (k.as_str(), v.es.as_str())),
        &mut errors,
    );

    for (field, caption) in [("ogTitle", &settings.og_title), ("ogDescription", &settings.og_description)] {
        if caption.es.trim().is_empty() {
            errors.push(ValidationError::MissingSpanish {
                field: field.to_string(),
            });
        }
    }

    errors
}

fn check_entries<'a>(
    topic: &str,
    known: &[EntryDefault],
    entries: impl Iterator<Item = (&'a str, &'a str)>,
    errors: &mut Vec<ValidationError>,
) {
    for (name, es) in entries {
        let field = leaf_key(topic, name);
        if !known.iter().any(|d| d.key == name) {
            errors.push(ValidationError::UnknownEntry { field });
        } else if es.trim().is_empty() {
            errors.push(ValidationError::MissingSpanish { field });
        }
    }
}

/// Batch reader/writer over the individual settings leaves.
#[derive(Clone)]
pub struct SettingsService {
    store: ContentStore,
}

impl SettingsService {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    /// Assemble the aggregate, filling every absent leaf from the default
    /// table. Store failures degrade to defaults per leaf.
    pub async fn read(&self) -> SystemSettings {
        SystemSettings {
            logo_url: self.read_scalar("logoUrl", DEFAULT_LOGO_URL).await,
            whatsapp_community_link: self
                .read_scalar("whatsappCommunityLink", DEFAULT_WHATSAPP_COMMUNITY_LINK)
                .await,
            instagram_url: self.read_scalar("instagramUrl", DEFAULT_INSTAGRAM_URL).await,
            facebook_url: self.read_scalar("facebookUrl", DEFAULT_FACEBOOK_URL).await,
            tiktok_url: self.read_scalar("tiktokUrl", DEFAULT_TIKTOK_URL).await,
            whatsapp_number: self.read_scalar("whatsappNumber", DEFAULT_WHATSAPP_NUMBER).await,
            nav_links: join_all(NAV_DEFAULTS.iter().map(|d| self.read_nav_entry(d)))
                .await
                .into_iter()
                .collect(),
            home_buttons: join_all(
                HOME_BUTTON_DEFAULTS.iter().map(|d| self.read_caption_entry("homeButton", d)),
            )
            .await
            .into_iter()
            .collect(),
            component_buttons: join_all(
                COMPONENT_BUTTON_DEFAULTS
                    .iter()
                    .map(|d| self.read_caption_entry("componentButton", d)),
            )
            .await
            .into_iter()
            .collect(),
            og_title: self
                .read_caption("ogTitle", DEFAULT_OG_TITLE.0, DEFAULT_OG_TITLE.1)
                .await,
            og_description: self
                .read_caption("ogDescription", DEFAULT_OG_DESCRIPTION.0, DEFAULT_OG_DESCRIPTION.1)
                .await,
        }
    }

    /// Decompose the aggregate into one `put` per leaf.
    ///
    /// Validation failures reject the submission before any write. A put
    /// failure stops the batch and is reported in the outcome; leaves
    /// written before the failure stay committed.
    pub async fn write(&self, settings: &SystemSettings) -> WriteOutcome {
        let errors = validate(settings);
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return WriteOutcome::failed(message);
        }

        match self.write_leaves(settings).await {
            Ok(()) => WriteOutcome::ok("System settings updated"),
            Err(e) => {
                warn!("System settings write failed: {:#}", e);
                WriteOutcome::failed(format!("{:#}", e))
            }
        }
    }

    async fn write_leaves(&self, settings: &SystemSettings) -> Result<()> {
        let scalars = [
            ("logoUrl", &settings.logo_url),
            ("whatsappCommunityLink", &settings.whatsapp_community_link),
            ("instagramUrl", &settings.instagram_url),
            ("facebookUrl", &settings.facebook_url),
            ("tiktokUrl", &settings.tiktok_url),
            ("whatsappNumber", &settings.whatsapp_number),
        ];
        for (key, value) in scalars {
            self.store.put(key, &ContentValue::Scalar(value.clone())).await?;
        }

        for (name, link) in &settings.nav_links {
            self.store
                .put_json(
                    &leaf_key("nav", name),
                    &json!({ "es": link.es, "en": link.en, "visible": link.visible }),
                )
                .await?;
        }
        for (name, caption) in &settings.home_buttons {
            self.put_caption(&leaf_key("homeButton", name), caption).await?;
        }
        for (name, caption) in &settings.component_buttons {
            self.put_caption(&leaf_key("componentButton", name), caption).await?;
        }
        self.put_caption("ogTitle", &settings.og_title).await?;
        self.put_caption("ogDescription", &settings.og_description).await?;
        Ok(())
    }

    async fn put_caption(&self, key: &str, caption: &Caption) -> Result<()> {
        let mut map = BTreeMap::new();
        map.insert("es".to_string(), caption.es.clone());
        map.insert("en".to_string(), caption.en.clone());
        self.store.put(key, &ContentValue::Localized(map)).await
    }

    async fn read_scalar(&self, key: &str, default: &str) -> String {
        let value = self.store.get(key).await;
        resolve(Language::canonical(), value.as_ref(), default)
    }

    async fn read_caption(&self, key: &str, default_es: &str, default_en: &str) -> Caption {
        let value = self.store.get(key).await;
        Caption {
            es: resolve(Language::Spanish, value.as_ref(), default_es),
            en: resolve(Language::English, value.as_ref(), default_en),
        }
    }

    async fn read_caption_entry(&self, topic: &str, default: &EntryDefault) -> (String, Caption) {
        let caption = self
            .read_caption(&leaf_key(topic, default.key), default.es, default.en)
            .await;
        (default.key.to_string(), caption)
    }

    async fn read_nav_entry(&self, default: &EntryDefault) -> (String, NavLink) {
        let raw = self.store.get_json(&leaf_key("nav", default.key)).await;
        let value = raw.as_ref().and_then(ContentValue::from_json);
        // Legacy entries wrote no visibility flag; absent means shown.
        let visible = raw
            .as_ref()
            .and_then(|v| v.get("visible"))
            .and_then(Value::as_bool)
            .unwrap_or(true);
        (
            default.key.to_string(),
            NavLink {
                es: resolve(Language::Spanish, value.as_ref(), default.es),
                en: resolve(Language::English, value.as_ref(), default.en),
                visible,
            },
        )
    }
}
