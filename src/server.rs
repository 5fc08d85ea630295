//!
//! lobbyd HTTP server
//! ------------------
//! Axum-based HTTP API for the lobby administration backend.
//!
//! Responsibilities:
//! - Login/refresh/logout endpoints backed by the token lifecycle manager.
//! - Bearer-credential extraction and guard wiring in front of handlers.
//! - Administrative user management and the credential purge sweep.
//! - Entity listing (list and count paths) through the generic filter
//!   engine, translating raw query parameters into each entity's filter map.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::{AuthConfig, ServerConfig};
use crate::entities::{lobby, LOBBIES_TABLE, LOBBY_FILTERS, PARTICIPANT_FILTERS, PARTICIPANTS_TABLE, TEAM_FILTERS, TEAMS_TABLE};
use crate::error::{AppError, AppResult};
use crate::filter::{self, FieldType, FilterSpec, ListQuery, QueryOutcome, SortDir};
use crate::identity::{require_or, AccessGuard, Role, Subject, TokenManager, TOKENS_TABLE};
use crate::security;
use crate::store::Store;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: Arc<TokenManager>,
}

/// Start the lobbyd HTTP server with configuration from the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(ServerConfig::from_env(), AuthConfig::from_env()).await
}

pub async fn run_with_config(cfg: ServerConfig, auth: AuthConfig) -> anyhow::Result<()> {
    let store = Store::open(&cfg.db_root)?;
    // Provision the catalogs and the bootstrap admin before accepting logins
    for table in [security::USERS_TABLE, TOKENS_TABLE, LOBBIES_TABLE, TEAMS_TABLE, PARTICIPANTS_TABLE] {
        store.create_table(table)?;
    }
    security::ensure_default_admin(&store)?;
    let tokens = Arc::new(TokenManager::new(store.clone(), auth));
    let state = AppState { store, tokens };

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting lobbyd on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "lobbyd ok" }))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/admin/users", post(create_user))
        .route("/admin/users/{id}", delete(remove_user))
        .route("/admin/tokens/purge", post(purge_tokens))
        .route("/lobbies", get(list_lobbies).post(create_lobby))
        .route("/lobbies/{id}", patch(edit_lobby))
        .route("/teams", get(list_teams))
        .route("/participants", get(list_participants))
        .with_state(state)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let v = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let s = v.to_str().ok()?;
    let rest = s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer "))?;
    Some(rest.trim().to_string())
}

fn error_response(e: AppError) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status": "error", "error": e})))
}

fn guard(state: &AppState, headers: &HeaderMap, required: Role) -> AppResult<Subject> {
    let bearer = bearer_token(headers);
    AccessGuard::new(required).authenticate(&state.tokens, bearer.as_deref())
}

#[derive(Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    match security::authenticate(&state.store, &payload.username, &payload.password) {
        Ok(Some(user)) => {
            let subject = Subject { user_id: user.id, username: user.username, role: user.role };
            match state.tokens.login(&subject) {
                Ok((access, refresh)) => (
                    StatusCode::OK,
                    Json(json!({
                        "status": "ok",
                        "access_token": access.value,
                        "refresh_token": refresh.value,
                        "user_id": subject.user_id,
                        "role": subject.role,
                    })),
                ),
                Err(e) => error_response(e),
            }
        }
        Ok(None) => (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"}))),
        Err(e) => {
            error!("login error: {e}");
            error_response(e)
        }
    }
}

async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(raw) = bearer_token(&headers) else {
        return error_response(AppError::unauthenticated("missing bearer credential"));
    };
    match state.tokens.refresh(&raw) {
        Ok(access) => (StatusCode::OK, Json(json!({"status": "ok", "access_token": access.value}))),
        Err(e) => error_response(e),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let subject = match guard(&state, &headers, Role::User) {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    match state.tokens.deactivate(&subject.user_id, None) {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => error_response(e),
    }
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    match guard(&state, &headers, Role::User) {
        Ok(subject) => (StatusCode::OK, Json(json!({"status": "ok", "subject": subject}))),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct CreateUserPayload {
    username: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserPayload>,
) -> impl IntoResponse {
    if let Err(e) = guard(&state, &headers, Role::Admin) {
        return error_response(e);
    }
    let role = match payload.role.as_deref() {
        None => Role::User,
        Some(s) => match Role::parse(s) {
            Some(r) => r,
            None => return error_response(AppError::user("bad_role", "unknown role name")),
        },
    };
    match security::add_user(&state.store, &payload.username, &payload.password, role) {
        Ok(user) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "user_id": user.id, "username": user.username, "role": user.role})),
        ),
        Err(e) => error_response(e),
    }
}

async fn remove_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    // Self-service deletion or admin; ownership is the caller-computed bit.
    let subject = match guard(&state, &headers, Role::User) {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    if let Err(e) = require_or(Some(&subject), Role::Admin, subject.user_id == id) {
        return error_response(e);
    }
    match security::delete_user(&state.store, &state.tokens, &id) {
        Ok(purged) => (StatusCode::OK, Json(json!({"status": "ok", "purged_tokens": purged}))),
        Err(e) => error_response(e),
    }
}

async fn purge_tokens(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(e) = guard(&state, &headers, Role::Admin) {
        return error_response(e);
    }
    match state.tokens.purge_inactive(None) {
        Ok(removed) => (StatusCode::OK, Json(json!({"status": "ok", "removed": removed}))),
        Err(e) => error_response(e),
    }
}

/// Translate raw query parameters into the entity's filter map. Values are
/// coerced per the field's semantic type; the literal `null` marks a key as
/// intentionally supplied-but-empty. Reserved paging/sort keys are skipped.
fn filters_from_params(spec: &FilterSpec, params: &HashMap<String, String>) -> HashMap<String, Value> {
    const RESERVED: [&str; 5] = ["sort_by", "sort_dir", "limit", "offset", "count_only"];
    let mut filters = HashMap::new();
    for (key, raw) in params {
        if RESERVED.contains(&key.as_str()) { continue; }
        let Some(fs) = spec.field(key) else { continue };
        if raw == "null" {
            filters.insert(key.clone(), Value::Null);
            continue;
        }
        let value = match fs.ty {
            FieldType::Int => match raw.parse::<i64>() {
                Ok(n) => json!(n),
                Err(_) => continue,
            },
            FieldType::Bool => match raw.as_str() {
                "true" | "1" => json!(true),
                "false" | "0" => json!(false),
                _ => continue,
            },
            FieldType::Str | FieldType::Id => json!(raw),
        };
        filters.insert(key.clone(), value);
    }
    filters
}

fn list_query_from_params(spec: &FilterSpec, params: &HashMap<String, String>) -> (ListQuery, bool) {
    let query = ListQuery {
        filters: filters_from_params(spec, params),
        sort_by: params.get("sort_by").cloned(),
        sort_dir: params.get("sort_dir").map(|s| SortDir::parse(s)).unwrap_or_default(),
        limit: params.get("limit").and_then(|s| s.parse::<usize>().ok()),
        offset: params.get("offset").and_then(|s| s.parse::<usize>().ok()).unwrap_or(0),
    };
    let count_only = params.get("count_only").map(|s| s == "true" || s == "1").unwrap_or(false);
    (query, count_only)
}

/// Shared list/count path: guard first, then hand the translated filter map
/// to the engine. Every entity's listing endpoint goes through here.
fn run_listing(
    state: &AppState,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
    spec: &FilterSpec,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = guard(state, headers, Role::User) {
        return error_response(e);
    }
    let (query, count_only) = list_query_from_params(spec, params);
    match filter::run(&state.store, spec, &query, count_only) {
        Ok(QueryOutcome::Count(n)) => (StatusCode::OK, Json(json!({"status": "ok", "count": n}))),
        Ok(QueryOutcome::Rows(rows)) => (StatusCode::OK, Json(json!({"status": "ok", "results": rows}))),
        Err(e) => error_response(e),
    }
}

async fn list_lobbies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    run_listing(&state, &headers, &params, &LOBBY_FILTERS)
}

async fn list_teams(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    run_listing(&state, &headers, &params, &TEAM_FILTERS)
}

async fn list_participants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    run_listing(&state, &headers, &params, &PARTICIPANT_FILTERS)
}

#[derive(Deserialize)]
struct CreateLobbyPayload {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_slots")]
    slots: i64,
    #[serde(default = "default_visibility")]
    visibility: String,
    #[serde(default)]
    ranked: bool,
    #[serde(default)]
    algorithm_id: Option<String>,
}

fn default_slots() -> i64 { 10 }
fn default_visibility() -> String { "public".to_string() }

async fn create_lobby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateLobbyPayload>,
) -> impl IntoResponse {
    let subject = match guard(&state, &headers, Role::User) {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    let row = lobby::new_row(
        &subject,
        &payload.name,
        &payload.description,
        payload.slots,
        &payload.visibility,
        payload.ranked,
        payload.algorithm_id.as_deref(),
    );
    match state.store.insert(LOBBIES_TABLE, row.clone()) {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok", "lobby": row}))),
        Err(e) => error_response(AppError::from(e)),
    }
}

#[derive(Deserialize)]
struct EditLobbyPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
}

async fn edit_lobby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<EditLobbyPayload>,
) -> impl IntoResponse {
    let subject = match guard(&state, &headers, Role::User) {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    if payload.name.is_none()
        && payload.description.is_none()
        && payload.status.is_none()
        && payload.visibility.is_none()
    {
        return error_response(AppError::no_data("no lobby fields supplied"));
    }
    let rows = match state.store.scan(LOBBIES_TABLE) {
        Ok(rows) => rows,
        Err(e) => return error_response(AppError::from(e)),
    };
    let Some(existing) = rows.iter().find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id.as_str()))
    else {
        return error_response(AppError::not_found("lobby_not_found", "no such lobby"));
    };
    // Only the host or a moderator-plus may edit
    let owned = existing.get("host_id").and_then(|v| v.as_str()) == Some(subject.user_id.as_str());
    if let Err(e) = require_or(Some(&subject), Role::Moderator, owned) {
        return error_response(e);
    }
    let res = state.store.update_where(
        LOBBIES_TABLE,
        |r| r.get("id").and_then(|v| v.as_str()) == Some(id.as_str()),
        |r| {
            if let Some(v) = &payload.name { r.insert("name".into(), json!(v)); }
            if let Some(v) = &payload.description { r.insert("description".into(), json!(v)); }
            if let Some(v) = &payload.status { r.insert("status".into(), json!(v)); }
            if let Some(v) = &payload.visibility { r.insert("visibility".into(), json!(v)); }
        },
    );
    match res {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => error_response(AppError::from(e)),
    }
}
