//! Inline editing: the per-page context and the per-field controller.
//!
//! Every editable piece of text on a page is bound to one content key. All
//! fields on a page share one [`EditableContext`], which carries the
//! caller's admin flag and a cache of fetched values so a key rendered in
//! several places is fetched once. The [`EditableField`] state machine
//! walks `Viewing -> Editing -> Saving -> Viewing`; there is no error
//! state, failures land back in `Viewing` with the pre-edit value.

use crate::i18n::{resolve, Language};
use crate::store::{ContentStore, ContentValue};
use crate::translator::Translate;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Shared page-scope state: admin flag plus the fetched-content cache.
///
/// The cache maps content key to the last known server value as of the most
/// recent fetch or successful write. It is never persisted and is rebuilt
/// on every page load. Entries are only ever overwritten by key, never
/// removed, so concurrent field controllers cannot invalidate each other's
/// unrelated entries.
pub struct EditableContext {
    is_admin: bool,
    cache: Mutex<HashMap<String, ContentValue>>,
}

impl EditableContext {
    pub fn new(is_admin: bool) -> Self {
        Self {
            is_admin,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the current caller may edit. Supplied by the session layer;
    /// no authorization decision is made here.
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn get(&self, id: &str) -> Option<ContentValue> {
        self.cache.lock().unwrap().get(id).cloned()
    }

    pub fn set(&self, id: &str, value: ContentValue) {
        self.cache.lock().unwrap().insert(id.to_string(), value);
    }

    pub fn has(&self, id: &str) -> bool {
        self.cache.lock().unwrap().contains_key(id)
    }
}

/// Lifecycle state of one editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Viewing,
    Editing,
    Saving,
}

/// Controller for one editable field, bound to one content key.
pub struct EditableField {
    id: String,
    fallback: String,
    language: Language,
    state: FieldState,
    buffer: String,
    context: Arc<EditableContext>,
    store: ContentStore,
    translator: Arc<dyn Translate>,
}

impl EditableField {
    /// Mount a field: resolve the key through the context cache, fetching
    /// from the store on a miss, and enter `Viewing`.
    pub async fn mount(
        id: impl Into<String>,
        fallback: impl Into<String>,
        language: Language,
        context: Arc<EditableContext>,
        store: ContentStore,
        translator: Arc<dyn Translate>,
    ) -> Self {
        let id = id.into();
        if !context.has(&id) {
            if let Some(value) = store.get(&id).await {
                context.set(&id, value);
            }
        }

        Self {
            id,
            fallback: fallback.into(),
            language,
            state: FieldState::Viewing,
            buffer: String::new(),
            context,
            store,
            translator,
        }
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    /// The string currently shown for this field.
    pub fn display(&self) -> String {
        resolve(self.language, self.context.get(&self.id).as_ref(), &self.fallback)
    }

    /// Enter `Editing`, snapshotting the resolved value into the buffer.
    ///
    /// Returns `false` (and stays in `Viewing`) for non-admin callers or
    /// when the field is not currently viewable.
    pub fn begin_edit(&mut self) -> bool {
        if !self.context.is_admin() || self.state != FieldState::Viewing {
            return false;
        }
        self.buffer = self.display();
        self.state = FieldState::Editing;
        true
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn set_buffer(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Discard the edit buffer and return to `Viewing`.
    pub fn cancel(&mut self) {
        if self.state == FieldState::Editing {
            self.buffer.clear();
            self.state = FieldState::Viewing;
        }
    }

    /// Persist `new_text` for the current UI language and a machine
    /// translation for the sibling language.
    ///
    /// The cache is updated optimistically before translation starts. A
    /// translation failure degrades to a single-language write: the edited
    /// slot is persisted, the sibling slot keeps whatever it held before.
    /// A store-write failure restores the pre-edit cache value and is
    /// returned to the caller. Every path ends in `Viewing`.
    pub async fn save(&mut self, new_text: &str) -> Result<()> {
        if self.state != FieldState::Editing {
            bail!("Field '{}' is not in edit mode", self.id);
        }
        self.state = FieldState::Saving;

        let prior = self.context.get(&self.id);
        let mut merged = ContentValue::merged(prior.as_ref(), self.language, new_text);
        self.context.set(&self.id, merged.clone());

        match self
            .translator
            .translate(new_text, self.language, self.language.sibling())
            .await
        {
            Ok(translated) => {
                merged.set_language(self.language.sibling(), &translated);
                self.context.set(&self.id, merged.clone());
            }
            Err(e) => {
                warn!(
                    "Translation for '{}' failed, saving {} only: {}",
                    self.id,
                    self.language.code(),
                    e
                );
            }
        }

        let written = self.store.put(&self.id, &merged).await;
        self.state = FieldState::Viewing;
        self.buffer.clear();

        if let Err(e) = written {
            if let Some(previous) = prior {
                self.context.set(&self.id, previous);
            }
            return Err(e).context(format!("Failed to save content entry '{}'", self.id));
        }
        Ok(())
    }
}
