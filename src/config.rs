use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub database_path: String,
    pub port: u16,
    pub admin_token: String,

    // Translation (OpenAI-compatible endpoint)
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,

    // Last-resort environment credentials, read only until the environment
    // document is first saved by an administrator
    pub firebase_api_key: String,
    pub firebase_auth_domain: String,
    pub firebase_project_id: String,
    pub firebase_storage_bucket: String,
    pub firebase_messaging_sender_id: String,
    pub firebase_app_id: String,
    pub google_api_key: Option<String>,
    pub resend_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Server
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/content.db".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            admin_token: std::env::var("ADMIN_TOKEN").context("ADMIN_TOKEN not set")?,

            // Translation
            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),

            // Environment credential fallbacks
            firebase_api_key: std::env::var("FIREBASE_API_KEY").unwrap_or_default(),
            firebase_auth_domain: std::env::var("FIREBASE_AUTH_DOMAIN").unwrap_or_default(),
            firebase_project_id: std::env::var("FIREBASE_PROJECT_ID").unwrap_or_default(),
            firebase_storage_bucket: std::env::var("FIREBASE_STORAGE_BUCKET").unwrap_or_default(),
            firebase_messaging_sender_id: std::env::var("FIREBASE_MESSAGING_SENDER_ID")
                .unwrap_or_default(),
            firebase_app_id: std::env::var("FIREBASE_APP_ID").unwrap_or_default(),
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "DATABASE_PATH",
            "PORT",
            "ADMIN_TOKEN",
            "OPENAI_API_KEY",
            "OPENAI_MODEL",
            "OPENAI_API_URL",
            "FIREBASE_API_KEY",
            "GOOGLE_API_KEY",
            "RESEND_API_KEY",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_admin_token() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "key");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("ADMIN_TOKEN"));
    }

    #[test]
    #[serial]
    fn test_from_env_applies_defaults() {
        clear_env();
        std::env::set_var("ADMIN_TOKEN", "secret");
        std::env::set_var("OPENAI_API_KEY", "key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_path, "data/content.db");
        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert!(config.firebase_api_key.is_empty());
        assert!(config.google_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_overrides() {
        clear_env();
        std::env::set_var("ADMIN_TOKEN", "secret");
        std::env::set_var("OPENAI_API_KEY", "key");
        std::env::set_var("PORT", "9090");
        std::env::set_var("FIREBASE_API_KEY", "fb-key");
        std::env::set_var("GOOGLE_API_KEY", "g-key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.firebase_api_key, "fb-key");
        assert_eq!(config.google_api_key, Some("g-key".to_string()));
        clear_env();
    }
}
