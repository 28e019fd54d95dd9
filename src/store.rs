//! Generic key/value content store over a SQLite document table.
//!
//! Each row is one content key addressing a JSON document of the shape
//! `{"value": <string | object>}`. The store performs no validation; shape
//! correctness is the caller's contract. Reads fail soft so every caller
//! can fall back to a compiled-in default instead of failing the page.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::i18n::Language;

/// The value held by one content key.
///
/// Legacy entries are bare scalars; bilingual entries map a two-letter
/// language code to its localized string. Once a key holds a language map
/// it never regresses to a scalar: edits always upgrade through
/// [`ContentValue::merged`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentValue {
    Scalar(String),
    Localized(BTreeMap<String, String>),
}

impl ContentValue {
    /// Interpret a raw document value.
    ///
    /// A JSON string is a legacy scalar. A JSON object is a language map;
    /// only its string-valued members are language slots (a navigation
    /// entry also carries a `visible` boolean, which stays in the raw
    /// document and is read through [`ContentStore::get_json`]).
    pub fn from_json(value: &Value) -> Option<ContentValue> {
        match value {
            Value::String(text) => Some(ContentValue::Scalar(text.clone())),
            Value::Object(members) => Some(ContentValue::Localized(
                members
                    .iter()
                    .filter_map(|(key, member)| {
                        member.as_str().map(|text| (key.clone(), text.to_string()))
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    /// The raw document value for this entry.
    pub fn to_json(&self) -> Value {
        match self {
            ContentValue::Scalar(text) => Value::String(text.clone()),
            ContentValue::Localized(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
            }
        }
    }

    /// Merge `text` into the `language` slot of a prior value.
    ///
    /// Absent and scalar priors upgrade to a language map; a scalar's text
    /// is dropped in favor of the edit (the scalar shape is read-only
    /// legacy). Existing sibling slots are retained.
    pub fn merged(prior: Option<&ContentValue>, language: Language, text: &str) -> ContentValue {
        let mut map = match prior {
            Some(ContentValue::Localized(existing)) => existing.clone(),
            _ => BTreeMap::new(),
        };
        map.insert(language.code().to_string(), text.to_string());
        ContentValue::Localized(map)
    }

    /// Overwrite one language slot in place, upgrading scalars to maps.
    pub fn set_language(&mut self, language: Language, text: &str) {
        *self = ContentValue::merged(Some(self), language, text);
    }

    /// The stored string for one language slot, if any.
    pub fn language(&self, language: Language) -> Option<&str> {
        match self {
            ContentValue::Scalar(_) => None,
            ContentValue::Localized(map) => map.get(language.code()).map(String::as_str),
        }
    }
}

/// SQLite-backed document store shared by cloning.
#[derive(Clone)]
pub struct ContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl ContentStore {
    /// Open (or create) the store at `database_path`.
    pub fn open(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .context(format!("Failed to open content store at {}", database_path))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store. Used by tests and ephemeral tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory content store")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS content (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create content table")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fetch the value for `id`, failing soft.
    ///
    /// Any lookup error (missing row, malformed body, storage failure)
    /// yields `None` so the caller can apply its fallback chain.
    pub async fn get(&self, id: &str) -> Option<ContentValue> {
        self.get_json(id).await.and_then(|v| ContentValue::from_json(&v))
    }

    /// Fetch the raw document value for `id`, failing soft.
    pub async fn get_json(&self, id: &str) -> Option<Value> {
        match self.fetch_body(id) {
            Ok(Some(body)) => match serde_json::from_str::<Value>(&body) {
                Ok(doc) => doc.get("value").cloned(),
                Err(e) => {
                    warn!("Content entry '{}' holds malformed JSON: {}", id, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Content lookup for '{}' failed: {}", id, e);
                None
            }
        }
    }

    fn fetch_body(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT body FROM content WHERE id = ?1")?;
        let body = stmt
            .query_row(params![id], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(body)
    }

    /// Overwrite the entire value for `id`.
    ///
    /// No partial-field merge happens here; merging is the caller's
    /// responsibility.
    pub async fn put(&self, id: &str, value: &ContentValue) -> Result<()> {
        self.put_json(id, &value.to_json()).await
    }

    /// Overwrite the raw document value for `id`.
    pub async fn put_json(&self, id: &str, value: &Value) -> Result<()> {
        let body = serde_json::to_string(&serde_json::json!({ "value": value }))
            .context("Failed to encode content document")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO content (id, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET body = ?2, updated_at = ?3",
            params![id, body, Utc::now().to_rfc3339()],
        )
        .context(format!("Failed to write content entry '{}'", id))?;
        Ok(())
    }

    /// Delete the document for `id`. Returns whether a row existed.
    ///
    /// Content entries are never deleted by the editing subsystem itself;
    /// this serves administrative document management (theme removal).
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute("DELETE FROM content WHERE id = ?1", params![id])
            .context(format!("Failed to delete content entry '{}'", id))?;
        Ok(rows > 0)
    }

    /// All documents whose id starts with `prefix`, as raw values.
    pub async fn list_json_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, body FROM content WHERE id LIKE ?1 || '%' ORDER BY id")?;
        let rows = stmt
            .query_map(params![prefix], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let mut documents = Vec::with_capacity(rows.len());
        for (id, body) in rows {
            match serde_json::from_str::<Value>(&body) {
                Ok(doc) => {
                    if let Some(value) = doc.get("value") {
                        documents.push((id, value.clone()));
                    }
                }
                Err(e) => warn!("Skipping malformed content entry '{}': {}", id, e),
            }
        }
        Ok(documents)
    }
}
