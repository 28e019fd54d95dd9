//! Named environment profiles for external-service credentials.
//!
//! One fixed document holds every profile (`production`, `backup`) plus the
//! active-profile selector. Writes merge field-by-field into the stored
//! document so saving one profile never erases the sibling's credentials.

use crate::config::Config;
use crate::settings::WriteOutcome;
use crate::store::ContentStore;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fixed document id for the environment profiles.
pub const ENVIRONMENT_DOC_ID: &str = "systemEnvironment";

/// Firebase project credentials. Every field is required for a usable
/// profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl FirebaseConfig {
    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("FIREBASE_API_KEY", &self.api_key),
            ("FIREBASE_AUTH_DOMAIN", &self.auth_domain),
            ("FIREBASE_PROJECT_ID", &self.project_id),
            ("FIREBASE_STORAGE_BUCKET", &self.storage_bucket),
            ("FIREBASE_MESSAGING_SENDER_ID", &self.messaging_sender_id),
            ("FIREBASE_APP_ID", &self.app_id),
        ]
    }

    pub fn is_complete(&self) -> bool {
        self.fields().iter().all(|(_, value)| !value.is_empty())
    }

    /// Field-level merge: non-empty incoming values win, empty ones keep
    /// what is stored.
    fn merged_into(&self, stored: &FirebaseConfig) -> FirebaseConfig {
        let pick = |incoming: &str, stored: &str| {
            if incoming.is_empty() {
                stored.to_string()
            } else {
                incoming.to_string()
            }
        };
        FirebaseConfig {
            api_key: pick(&self.api_key, &stored.api_key),
            auth_domain: pick(&self.auth_domain, &stored.auth_domain),
            project_id: pick(&self.project_id, &stored.project_id),
            storage_bucket: pick(&self.storage_bucket, &stored.storage_bucket),
            messaging_sender_id: pick(&self.messaging_sender_id, &stored.messaging_sender_id),
            app_id: pick(&self.app_id, &stored.app_id),
        }
    }
}

/// One named bundle of external-service credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentProfile {
    pub firebase_config: FirebaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resend_api_key: Option<String>,
}

impl EnvironmentProfile {
    fn merged_into(&self, stored: &EnvironmentProfile) -> EnvironmentProfile {
        EnvironmentProfile {
            firebase_config: self.firebase_config.merged_into(&stored.firebase_config),
            google_api_key: self.google_api_key.clone().or_else(|| stored.google_api_key.clone()),
            resend_api_key: self.resend_api_key.clone().or_else(|| stored.resend_api_key.clone()),
        }
    }

    /// Newline-separated `KEY=value` lines for every populated field.
    /// Unset optional keys are omitted. Used for copy-to-clipboard export;
    /// no store side effect.
    pub fn export_as_text(&self) -> String {
        let mut lines: Vec<String> = self
            .firebase_config
            .fields()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        if let Some(key) = &self.google_api_key {
            lines.push(format!("GOOGLE_API_KEY={}", key));
        }
        if let Some(key) = &self.resend_api_key {
            lines.push(format!("RESEND_API_KEY={}", key));
        }
        lines.join("\n")
    }
}

/// The whole environment document: every profile plus the active selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentProfiles {
    pub production: EnvironmentProfile,
    pub backup: EnvironmentProfile,
    pub active_environment: String,
}

impl Default for EnvironmentProfiles {
    fn default() -> Self {
        Self {
            production: EnvironmentProfile::default(),
            backup: EnvironmentProfile::default(),
            active_environment: "production".to_string(),
        }
    }
}

impl EnvironmentProfiles {
    pub fn profile(&self, name: &str) -> Option<&EnvironmentProfile> {
        match name {
            "production" => Some(&self.production),
            "backup" => Some(&self.backup),
            _ => None,
        }
    }

    pub fn active_profile(&self) -> Option<&EnvironmentProfile> {
        self.profile(&self.active_environment)
    }
}

/// Reader/writer for the environment document.
#[derive(Clone)]
pub struct EnvironmentService {
    store: ContentStore,
    defaults: EnvironmentProfiles,
}

impl EnvironmentService {
    /// `config` supplies the last-resort production credentials used until
    /// an administrator saves the document for the first time.
    pub fn new(store: ContentStore, config: &Config) -> Self {
        let defaults = EnvironmentProfiles {
            production: EnvironmentProfile {
                firebase_config: FirebaseConfig {
                    api_key: config.firebase_api_key.clone(),
                    auth_domain: config.firebase_auth_domain.clone(),
                    project_id: config.firebase_project_id.clone(),
                    storage_bucket: config.firebase_storage_bucket.clone(),
                    messaging_sender_id: config.firebase_messaging_sender_id.clone(),
                    app_id: config.firebase_app_id.clone(),
                },
                google_api_key: config.google_api_key.clone(),
                resend_api_key: config.resend_api_key.clone(),
            },
            backup: EnvironmentProfile::default(),
            active_environment: "production".to_string(),
        };
        Self { store, defaults }
    }

    /// Fetch the document, synthesizing defaults from process configuration
    /// when it does not exist yet.
    pub async fn read(&self) -> EnvironmentProfiles {
        match self.store.get_json(ENVIRONMENT_DOC_ID).await {
            Some(raw) => match serde_json::from_value::<EnvironmentProfiles>(raw) {
                Ok(profiles) => profiles,
                Err(e) => {
                    warn!("Environment document is malformed, using defaults: {}", e);
                    self.defaults.clone()
                }
            },
            None => self.defaults.clone(),
        }
    }

    /// Merge `incoming` into the stored document and persist it.
    ///
    /// Empty incoming fields keep their stored values, so a submission that
    /// only fills one profile leaves the sibling untouched.
    pub async fn write(&self, incoming: &EnvironmentProfiles) -> WriteOutcome {
        let stored = self.read().await;
        let merged = EnvironmentProfiles {
            production: incoming.production.merged_into(&stored.production),
            backup: incoming.backup.merged_into(&stored.backup),
            active_environment: if incoming.active_environment.is_empty() {
                stored.active_environment.clone()
            } else {
                incoming.active_environment.clone()
            },
        };

        if merged.profile(&merged.active_environment).is_none() {
            return WriteOutcome::failed(format!(
                "activeEnvironment: unknown profile '{}'",
                merged.active_environment
            ));
        }
        if let Some(active) = merged.active_profile() {
            if !active.firebase_config.is_complete() {
                return WriteOutcome::failed(format!(
                    "{}: firebaseConfig fields must all be set for the active profile",
                    merged.active_environment
                ));
            }
        }

        let raw = match serde_json::to_value(&merged) {
            Ok(raw) => raw,
            Err(e) => return WriteOutcome::failed(format!("Failed to encode environment: {}", e)),
        };
        match self.store.put_json(ENVIRONMENT_DOC_ID, &raw).await {
            Ok(()) => WriteOutcome::ok("Environment updated"),
            Err(e) => {
                warn!("Environment write failed: {:#}", e);
                WriteOutcome::failed(format!("{:#}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firebase(tag: &str) -> FirebaseConfig {
        FirebaseConfig {
            api_key: format!("{}-api-key", tag),
            auth_domain: format!("{}.firebaseapp.com", tag),
            project_id: tag.to_string(),
            storage_bucket: format!("{}.appspot.com", tag),
            messaging_sender_id: "123456".to_string(),
            app_id: format!("1:123456:web:{}", tag),
        }
    }

    fn config_with_env_defaults() -> Config {
        Config {
            database_path: ":memory:".to_string(),
            port: 8080,
            admin_token: "token".to_string(),
            openai_api_key: "key".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            firebase_api_key: "env-api-key".to_string(),
            firebase_auth_domain: "env.firebaseapp.com".to_string(),
            firebase_project_id: "env-project".to_string(),
            firebase_storage_bucket: "env.appspot.com".to_string(),
            firebase_messaging_sender_id: "999".to_string(),
            firebase_app_id: "1:999:web:env".to_string(),
            google_api_key: Some("env-google-key".to_string()),
            resend_api_key: None,
        }
    }

    fn service() -> (EnvironmentService, ContentStore) {
        let store = ContentStore::open_in_memory().unwrap();
        (
            EnvironmentService::new(store.clone(), &config_with_env_defaults()),
            store,
        )
    }

    // ==================== Read Tests ====================

    #[tokio::test]
    async fn test_read_absent_document_synthesizes_from_config() {
        let (service, _store) = service();
        let profiles = service.read().await;

        assert_eq!(profiles.active_environment, "production");
        assert_eq!(profiles.production.firebase_config.api_key, "env-api-key");
        assert_eq!(profiles.production.google_api_key, Some("env-google-key".to_string()));
        assert_eq!(profiles.backup, EnvironmentProfile::default());
    }

    #[tokio::test]
    async fn test_read_round_trip_after_write() {
        let (service, _store) = service();
        let mut incoming = service.read().await;
        incoming.backup = EnvironmentProfile {
            firebase_config: firebase("backup"),
            google_api_key: None,
            resend_api_key: Some("re-123".to_string()),
        };

        let outcome = service.write(&incoming).await;
        assert!(outcome.success, "{}", outcome.message);

        let read_back = service.read().await;
        assert_eq!(read_back.backup.firebase_config, firebase("backup"));
        assert_eq!(read_back.backup.resend_api_key, Some("re-123".to_string()));
    }

    // ==================== Merge Tests ====================

    #[tokio::test]
    async fn test_writing_backup_never_touches_production() {
        let (service, _store) = service();

        // Seed the document with full production credentials.
        let mut seed = EnvironmentProfiles::default();
        seed.production = EnvironmentProfile {
            firebase_config: firebase("prod"),
            google_api_key: Some("g-prod".to_string()),
            resend_api_key: Some("re-prod".to_string()),
        };
        assert!(service.write(&seed).await.success);

        // Submit only backup fields; production is left empty in the form.
        let mut incoming = EnvironmentProfiles::default();
        incoming.backup = EnvironmentProfile {
            firebase_config: firebase("backup"),
            google_api_key: None,
            resend_api_key: None,
        };

        assert!(service.write(&incoming).await.success);

        let read_back = service.read().await;
        assert_eq!(read_back.production.firebase_config, firebase("prod"));
        assert_eq!(read_back.production.google_api_key, Some("g-prod".to_string()));
        assert_eq!(read_back.backup.firebase_config, firebase("backup"));
    }

    #[tokio::test]
    async fn test_merge_is_field_level_within_a_profile() {
        let (service, _store) = service();

        let mut seed = EnvironmentProfiles::default();
        seed.production = EnvironmentProfile {
            firebase_config: firebase("prod"),
            google_api_key: None,
            resend_api_key: None,
        };
        assert!(service.write(&seed).await.success);

        // Only the API key changes; every other field arrives empty.
        let mut incoming = EnvironmentProfiles::default();
        incoming.production.firebase_config.api_key = "rotated-key".to_string();

        assert!(service.write(&incoming).await.success);

        let read_back = service.read().await;
        assert_eq!(read_back.production.firebase_config.api_key, "rotated-key");
        assert_eq!(
            read_back.production.firebase_config.auth_domain,
            "prod.firebaseapp.com"
        );
    }

    #[tokio::test]
    async fn test_switching_active_environment() {
        let (service, _store) = service();

        let mut seed = EnvironmentProfiles::default();
        seed.production = EnvironmentProfile {
            firebase_config: firebase("prod"),
            ..EnvironmentProfile::default()
        };
        seed.backup = EnvironmentProfile {
            firebase_config: firebase("backup"),
            ..EnvironmentProfile::default()
        };
        assert!(service.write(&seed).await.success);

        let mut incoming = EnvironmentProfiles::default();
        incoming.active_environment = "backup".to_string();
        assert!(service.write(&incoming).await.success);

        let read_back = service.read().await;
        assert_eq!(read_back.active_environment, "backup");
        assert_eq!(
            read_back.active_profile().unwrap().firebase_config,
            firebase("backup")
        );
    }

    // ==================== Validation Tests ====================

    #[tokio::test]
    async fn test_write_rejects_unknown_active_environment() {
        let (service, store) = service();

        let mut incoming = service.read().await;
        incoming.active_environment = "staging".to_string();

        let outcome = service.write(&incoming).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("staging"));
        assert!(store.get_json(ENVIRONMENT_DOC_ID).await.is_none());
    }

    #[tokio::test]
    async fn test_write_rejects_incomplete_active_profile() {
        let store = ContentStore::open_in_memory().unwrap();
        // No env-var defaults this time: production starts empty.
        let mut config = config_with_env_defaults();
        config.firebase_api_key = String::new();
        config.firebase_auth_domain = String::new();
        config.firebase_project_id = String::new();
        config.firebase_storage_bucket = String::new();
        config.firebase_messaging_sender_id = String::new();
        config.firebase_app_id = String::new();
        let service = EnvironmentService::new(store, &config);

        let incoming = EnvironmentProfiles::default();
        let outcome = service.write(&incoming).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("firebaseConfig"));
    }

    // ==================== Export Tests ====================

    #[test]
    fn test_export_contains_one_line_per_field() {
        let profile = EnvironmentProfile {
            firebase_config: firebase("prod"),
            google_api_key: Some("g-key".to_string()),
            resend_api_key: Some("re-key".to_string()),
        };

        let text = profile.export_as_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines.contains(&"FIREBASE_API_KEY=prod-api-key"));
        assert!(lines.contains(&"FIREBASE_AUTH_DOMAIN=prod.firebaseapp.com"));
        assert!(lines.contains(&"GOOGLE_API_KEY=g-key"));
        assert!(lines.contains(&"RESEND_API_KEY=re-key"));
    }

    #[test]
    fn test_export_omits_unset_optional_keys() {
        let profile = EnvironmentProfile {
            firebase_config: firebase("prod"),
            google_api_key: None,
            resend_api_key: None,
        };

        let text = profile.export_as_text();
        assert_eq!(text.lines().count(), 6);
        assert!(!text.contains("GOOGLE_API_KEY"));
        assert!(!text.contains("RESEND_API_KEY"));
    }

    #[test]
    fn test_export_has_no_store_side_effect() {
        // Pure formatting: same input, same output, nothing else touched.
        let profile = EnvironmentProfile {
            firebase_config: firebase("prod"),
            google_api_key: None,
            resend_api_key: None,
        };
        assert_eq!(profile.export_as_text(), profile.export_as_text());
    }

    // ==================== Profile Accessor Tests ====================

    #[test]
    fn test_profile_lookup_by_name() {
        let profiles = EnvironmentProfiles::default();
        assert!(profiles.profile("production").is_some());
        assert!(profiles.profile("backup").is_some());
        assert!(profiles.profile("staging").is_none());
    }

    #[test]
    fn test_default_active_environment_is_production() {
        assert_eq!(EnvironmentProfiles::default().active_environment, "production");
    }
}
