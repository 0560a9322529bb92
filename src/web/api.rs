//! Defines the Axum API routes and handlers.
//!
//! Handlers only decode requests, pull credentials out of headers and map
//! `ChirpyError` onto status codes. The core is synchronous, so every call
//! into it runs on the blocking pool.

use crate::auth::SessionManager;
use crate::config::Config;
use crate::error::ChirpyError;
use crate::repository::Repository;
use crate::store::{Chirp, DocumentStore, UserView};
use crate::tokens::TokenService;
use crate::web::metrics::{count_hits_middleware, metrics_handler};
use crate::web::models::{
    ChirpRequest, ChirpsQuery, CredentialsRequest, LoginResponse, RevokeResponse,
    StatusResponse, TokenResponse, WebhookRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use std::path::Path as FsPath;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::error;

const UPGRADE_EVENT: &str = "user.upgraded";

/// Helper to create a JSON error response with a message and status code
fn json_error(message: &str, status: StatusCode) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

impl IntoResponse for ChirpyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChirpyError::NotFound(_) => StatusCode::NOT_FOUND,
            ChirpyError::Forbidden(_) => StatusCode::FORBIDDEN,
            ChirpyError::Conflict(_) => StatusCode::CONFLICT,
            ChirpyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ChirpyError::Validation(_) => StatusCode::BAD_REQUEST,
            ChirpyError::Io(_)
            | ChirpyError::Serialization(_)
            | ChirpyError::Hash(_)
            | ChirpyError::Token(_)
            | ChirpyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        json_error(&self.to_string(), status)
    }
}

pub struct AppStateInner {
    pub repo: Repository,
    pub sessions: SessionManager,
    pub polka_key: Option<String>,
    pub fileserver_hits: AtomicU64,
}
pub type AppState = Arc<AppStateInner>;

/// Open the document store named by `config` and wire up the services.
pub fn build_state(config: &Config) -> Result<AppState, ChirpyError> {
    let store = Arc::new(DocumentStore::open(&config.database.path)?);
    let repo = Repository::new(store.clone(), config.chirps.policy());
    let tokens = TokenService::new(config.auth.jwt_secret.as_bytes(), store);
    let sessions = SessionManager::new(repo.clone(), tokens, config.auth.token_policy());
    Ok(Arc::new(AppStateInner {
        repo,
        sessions,
        polka_key: config.auth.polka_key.clone(),
        fileserver_hits: AtomicU64::new(0),
    }))
}

/// Creates the Axum router with all the API endpoints.
pub fn create_router(state: AppState, filepath_root: &FsPath) -> Router {
    let app_files: Router = Router::new()
        .fallback_service(ServeDir::new(filepath_root))
        .layer(axum::middleware::from_fn_with_state(state.clone(), count_hits_middleware));
    Router::new()
        .route("/api/healthz", get(healthz))
        .route("/api/chirps", get(list_chirps).post(create_chirp))
        .route("/api/chirps/{chirp_id}", get(get_chirp).delete(delete_chirp))
        .route("/api/users", post(create_user).put(update_user))
        .route("/api/login", post(login))
        .route("/api/refresh", post(refresh))
        .route("/api/revoke", post(revoke))
        .route("/api/polka/webhooks", post(polka_webhook))
        .route("/admin/metrics", get(metrics_handler))
        .nest_service("/app", app_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// For tests: router over an existing state, serving files from the working directory.
pub fn app_with_state(state: AppState) -> Router {
    create_router(state, FsPath::new("."))
}

/// Run a synchronous core call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ChirpyError>
where
    F: FnOnce() -> Result<T, ChirpyError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ChirpyError::Internal(e.to_string()))?
}

/// Extract the raw token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<String, ChirpyError> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .ok_or_else(|| ChirpyError::unauthorized("jwt token missing"))
}

/// Authenticate the bearer access token and return its user ID.
async fn authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<u32, ChirpyError> {
    let token = bearer_token(headers)?;
    let sessions = state.sessions.clone();
    blocking(move || sessions.authenticate(&token)).await
}

/// GET /api/healthz
async fn healthz() -> &'static str {
    "OK"
}

/// GET /api/chirps
async fn list_chirps(
    State(state): State<AppState>,
    Query(query): Query<ChirpsQuery>,
) -> Result<Json<Vec<Chirp>>, ChirpyError> {
    let repo = state.repo.clone();
    let chirps = blocking(move || repo.list_chirps(query.author_id)).await?;
    Ok(Json(chirps))
}

/// GET /api/chirps/{chirp_id}
async fn get_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<u32>,
) -> Result<Json<Chirp>, ChirpyError> {
    let repo = state.repo.clone();
    let chirp = blocking(move || repo.get_chirp(chirp_id)).await?;
    Ok(Json(chirp))
}

/// POST /api/chirps
async fn create_chirp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChirpRequest>,
) -> Result<(StatusCode, Json<Chirp>), ChirpyError> {
    let author_id = authenticated_user(&state, &headers).await?;
    let repo = state.repo.clone();
    let chirp = blocking(move || repo.create_chirp(&payload.body, author_id)).await?;
    Ok((StatusCode::CREATED, Json(chirp)))
}

/// DELETE /api/chirps/{chirp_id}
async fn delete_chirp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chirp_id): Path<u32>,
) -> Result<Json<StatusResponse>, ChirpyError> {
    let author_id = authenticated_user(&state, &headers).await?;
    let repo = state.repo.clone();
    blocking(move || repo.delete_chirp(chirp_id, author_id)).await?;
    Ok(Json(StatusResponse { status: "ok".to_string() }))
}

/// POST /api/users
async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserView>), ChirpyError> {
    let repo = state.repo.clone();
    let user = blocking(move || repo.create_user(&payload.password, &payload.email)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users
async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<UserView>, ChirpyError> {
    let user_id = authenticated_user(&state, &headers).await?;
    let repo = state.repo.clone();
    let user =
        blocking(move || repo.update_user(&payload.email, &payload.password, user_id)).await?;
    Ok(Json(user))
}

/// POST /api/login
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ChirpyError> {
    let sessions = state.sessions.clone();
    let session = blocking(move || sessions.login(&payload.email, &payload.password)).await?;
    Ok(Json(LoginResponse {
        id: session.user.id,
        email: session.user.email,
        is_chirpy_red: session.user.is_chirpy_red,
        token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// POST /api/refresh
async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ChirpyError> {
    let raw = bearer_token(&headers)?;
    let sessions = state.sessions.clone();
    let token = blocking(move || sessions.refresh(&raw)).await?;
    Ok(Json(TokenResponse { token }))
}

/// POST /api/revoke
async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RevokeResponse>, ChirpyError> {
    let raw = bearer_token(&headers)?;
    let sessions = state.sessions.clone();
    let revoked_token = raw.clone();
    blocking(move || sessions.revoke(&raw)).await?;
    Ok(Json(RevokeResponse { revoked_token }))
}

/// POST /api/polka/webhooks
async fn polka_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookRequest>,
) -> Result<Json<serde_json::Value>, ChirpyError> {
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("ApiKey "))
        .ok_or_else(|| ChirpyError::unauthorized("missing api key"))?;
    if state.polka_key.as_deref() != Some(provided.trim()) {
        return Err(ChirpyError::unauthorized("invalid api key"));
    }
    if payload.event != UPGRADE_EVENT {
        return Ok(Json(serde_json::json!({})));
    }
    let repo = state.repo.clone();
    let user_id = payload.data.user_id;
    blocking(move || repo.upgrade_user(user_id)).await?;
    Ok(Json(serde_json::json!({})))
}
