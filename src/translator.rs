//! Machine translation client for keeping both language slots in sync.
//!
//! Every admin edit is written in one language and machine-translated into
//! the sibling language. Translation is best-effort: callers degrade to a
//! single-language write when it fails, so errors here must stay cheap to
//! recover from.

use crate::config::Config;
use crate::i18n::Language;
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Produce the counterpart text for the sibling language.
///
/// Implementations must return the input unchanged when `source == target`.
#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;
}

/// Chat Completion request used for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Build the system prompt for translating one piece of site copy
fn build_system_prompt(source: Language, target: Language) -> String {
    format!(
        r#"You are a professional translator for a public website. Translate the given site text from {} to {}.

## Rules

- The text is a short piece of UI copy: a heading, caption, button label, or paragraph.
- Preserve placeholders, URLs, phone numbers, and emojis exactly as written.
- Keep proper names untranslated.
- Match the register of the original: a button label stays short, a paragraph stays a paragraph.
- Reply with the translated text only, no quotes and no commentary."#,
        source.name(),
        target.name()
    )
}

/// HTTP translator backed by an OpenAI-compatible chat-completions endpoint.
pub struct HttpTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    retry: RetryConfig,
}

impl HttpTranslator {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            retry: RetryConfig::translation_call(),
        }
    }

    /// Override the retry policy. Tests use a single fast attempt.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request_translation(&self, text: &str, source: Language, target: Language) -> Result<String> {
        let request = TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(source, target),
                },
                Message {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_completion_tokens: 2000,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send translation request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("Translation API error ({}): {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        let translated = chat_response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .context("Translation response contained no choices")?;

        Ok(translated)
    }
}

#[async_trait]
impl Translate for HttpTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        if source == target {
            return Ok(text.to_string());
        }

        with_retry_if(
            &self.retry,
            &format!("Translation {} -> {}", source.code(), target.code()),
            || self.request_translation(text, source, target),
            is_retryable_error,
        )
        .await
    }
}

/// Determine if an error is retryable (5xx errors, 429 rate limit, network errors)
/// Other 4xx client errors should not be retried
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = error.to_string();

    // Error format: "Translation API error (400 Bad Request): ..."
    if error_str.contains("Translation API error") {
        if let Some(start) = error_str.find('(') {
            if let Some(end) = error_str[start..].find(')') {
                let status_str = &error_str[start + 1..start + end];
                let status_num = status_str.split_whitespace().next().unwrap_or("");
                if let Ok(status) = status_num.parse::<u16>() {
                    // Retry 429 (rate limit) and 5xx errors
                    return status == 429 || status >= 500;
                }
            }
        }
    }

    // Retry network errors, timeouts, and other transient failures
    true
}
