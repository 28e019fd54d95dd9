//! HTTP admin surface.
//!
//! Handlers stay thin: every behavior lives in the library modules, and
//! each mutating route derives the caller's admin flag from the shared
//! bearer token before touching anything.

use crate::config::Config;
use crate::editable::{EditableContext, EditableField};
use crate::environment::{EnvironmentProfiles, EnvironmentService};
use crate::i18n::{resolve, Language};
use crate::security;
use crate::settings::{SettingsService, SystemSettings, WriteOutcome};
use crate::store::ContentStore;
use crate::theme::{render_css, PredefinedTheme, ThemeColors, ThemeRegistry};
use crate::translator::Translate;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub store: ContentStore,
    pub translator: Arc<dyn Translate>,
    pub settings: SettingsService,
    pub environment: EnvironmentService,
    pub themes: ThemeRegistry,
    pub admin_token: String,
}

impl AppState {
    pub fn new(store: ContentStore, translator: Arc<dyn Translate>, config: &Config) -> Self {
        Self {
            settings: SettingsService::new(store.clone()),
            environment: EnvironmentService::new(store.clone(), config),
            themes: ThemeRegistry::new(store.clone()),
            store,
            translator,
            admin_token: config.admin_token.clone(),
        }
    }

    fn is_admin(&self, headers: &HeaderMap) -> bool {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        security::is_admin_request(authorization, &self.admin_token)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/content/:id", get(get_content).put(put_content))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/environment", get(get_environment).put(put_environment))
        .route("/api/environment/export", get(export_environment))
        .route("/api/themes", get(list_themes).post(create_theme))
        .route("/api/themes/:id", put(update_theme).delete(delete_theme))
        .route("/api/themes/:id/css", get(theme_css))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(WriteOutcome::failed("Administrator token required".to_string())),
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ==================== Content ====================

#[derive(Deserialize)]
struct ContentEdit {
    text: String,
    lang: String,
    #[serde(default)]
    fallback: Option<String>,
}

async fn get_content(
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    match params.get("lang") {
        Some(code) => {
            let language = match Language::from_code(code) {
                Ok(language) => language,
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(WriteOutcome::failed(e.to_string())),
                    )
                        .into_response()
                }
            };
            let fallback = params.get("fallback").map(String::as_str).unwrap_or("");
            let stored = state.store.get(&id).await;
            let text = resolve(language, stored.as_ref(), fallback);
            Json(json!({ "id": id, "text": text })).into_response()
        }
        None => {
            let value = state.store.get_json(&id).await;
            Json(json!({ "id": id, "value": value })).into_response()
        }
    }
}

async fn put_content(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(edit): Json<ContentEdit>,
) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    let language = match Language::from_code(&edit.lang) {
        Ok(language) => language,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(WriteOutcome::failed(e.to_string())),
            )
                .into_response()
        }
    };

    // Server-side rendition of the inline editing flow: one context per
    // request, admin flag already verified.
    let context = Arc::new(EditableContext::new(true));
    let mut field = EditableField::mount(
        id.clone(),
        edit.fallback.unwrap_or_default(),
        language,
        context,
        state.store.clone(),
        state.translator.clone(),
    )
    .await;

    if !field.begin_edit() {
        return (
            StatusCode::CONFLICT,
            Json(WriteOutcome::failed(format!("Field '{}' is not editable", id))),
        )
            .into_response();
    }
    match field.save(&edit.text).await {
        Ok(()) => Json(WriteOutcome::ok("Content updated")).into_response(),
        Err(e) => {
            error!("Content save for '{}' failed: {:#}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WriteOutcome::failed(format!("{:#}", e))),
            )
                .into_response()
        }
    }
}

// ==================== Settings ====================

async fn get_settings(State(state): State<AppState>) -> Json<SystemSettings> {
    Json(state.settings.read().await)
}

async fn put_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(settings): Json<SystemSettings>,
) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    let outcome = state.settings.write(&settings).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(outcome)).into_response()
}

// ==================== Environment ====================

async fn get_environment(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    Json(state.environment.read().await).into_response()
}

async fn put_environment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profiles): Json<EnvironmentProfiles>,
) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    let outcome = state.environment.write(&profiles).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(outcome)).into_response()
}

async fn export_environment(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    let profiles = state.environment.read().await;
    let name = params.get("profile").map(String::as_str).unwrap_or("production");
    match profiles.profile(name) {
        Some(profile) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            profile.export_as_text(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(WriteOutcome::failed(format!("Unknown profile '{}'", name))),
        )
            .into_response(),
    }
}

// ==================== Themes ====================

#[derive(Deserialize)]
struct ThemePayload {
    name: String,
    colors: ThemeColors,
}

async fn list_themes(State(state): State<AppState>) -> Response {
    match state.themes.list().await {
        Ok(themes) => Json(themes).into_response(),
        Err(e) => {
            error!("Theme listing failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WriteOutcome::failed(format!("{:#}", e))),
            )
                .into_response()
        }
    }
}

async fn create_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ThemePayload>,
) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    match state.themes.save(&payload.name, payload.colors).await {
        Ok(theme) => (StatusCode::CREATED, Json(theme)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WriteOutcome::failed(format!("{:#}", e))),
        )
            .into_response(),
    }
}

async fn update_theme(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ThemePayload>,
) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    let theme = PredefinedTheme {
        id,
        name: payload.name,
        colors: payload.colors,
    };
    match state.themes.update(&theme).await {
        Ok(()) => Json(theme).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WriteOutcome::failed(format!("{:#}", e))),
        )
            .into_response(),
    }
}

async fn delete_theme(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    match state.themes.delete(&id).await {
        Ok(true) => Json(WriteOutcome::ok("Theme deleted")).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(WriteOutcome::failed(format!("Unknown theme '{}'", id))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WriteOutcome::failed(format!("{:#}", e))),
        )
            .into_response(),
    }
}

async fn theme_css(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    match state.themes.get(&id).await {
        Some(theme) => (
            [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
            render_css(&theme.colors),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
