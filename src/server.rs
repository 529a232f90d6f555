//!
//! policyhub HTTP server
//! ----------------------
//! This module defines the Axum-based HTTP API.
//!
//! Responsibilities:
//! - Account registration and login under `/auth`.
//! - Policy CRUD under `/policy`, gated by a bearer token.
//! - Translating service results into status codes and JSON bodies.
//! - Process-level startup: store selection, startup logs, graceful shutdown.

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::{ServerConfig, StoreKind};
use crate::error::{reason_phrase, AppError};
use crate::identity::{AuthService, RequestContext, TokenService};
use crate::model::{CredentialsInput, PolicyInput};
use crate::policy::PolicyService;
use crate::security::CredentialHasher;
use crate::storage::Stores;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub policies: PolicyService,
}

impl AppState {
    pub fn new(stores: Stores, tokens: TokenService, hasher: CredentialHasher) -> Self {
        Self {
            auth: AuthService::new(stores.users, tokens, hasher),
            policies: PolicyService::new(stores.policies),
        }
    }

    /// Open the configured store and build services from `cfg`.
    pub fn from_config(cfg: &ServerConfig) -> anyhow::Result<Self> {
        let stores = match cfg.store {
            StoreKind::Memory => Stores::memory(),
            StoreKind::File => Stores::open_documents(&cfg.db_root, &cfg.database)
                .with_context(|| format!("While opening document store at {}/{}", cfg.db_root.display(), cfg.database))?,
        };
        let tokens = TokenService::new(&cfg.jwt_secret, cfg.token_ttl_secs)?;
        let hasher = CredentialHasher::new(cfg.hash_cost)?;
        Ok(Self::new(stores, tokens, hasher))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_body())).into_response()
    }
}

/// 400 with a fixed body, used where any failure is reported as a bad request.
fn bad_request(message: serde_json::Value) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({
        "statusCode": 400,
        "message": message,
        "error": reason_phrase(400),
    }))).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({
        "statusCode": 401,
        "message": "Unauthorized",
        "error": reason_phrase(401),
    }))).into_response()
}

fn invalid_json(rejection: JsonRejection) -> AppError {
    AppError::user("invalid_json".to_string(), rejection.body_text())
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/policy", post(create_policy).get(get_all_policies))
        .route("/policy/{id}", get(get_policy).put(update_policy).delete(delete_policy))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/", get(|| async { "policyhub ok" }))
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .route("/auth/user", post(create_user))
        .route("/auth/login", post(login))
        .merge(protected)
        .with_state(state)
}

fn log_startup(cfg: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "policyhub starting: RUST_LOG='{}', cwd={:?}, bind={}, http_port={}, store={:?}, db_root={:?}, database={}, token_ttl_secs={}, hash_cost={}",
        rust_log, cwd, cfg.bind, cfg.http_port, cfg.store, cfg.db_root, cfg.database, cfg.token_ttl_secs, cfg.hash_cost
    );
    if cfg.store == StoreKind::Memory {
        warn!(target: "startup", "memory store selected; data is lost on exit");
    }
}

/// Start the HTTP server described by `cfg` and run until Ctrl-C.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    log_startup(&cfg);
    let state = AppState::from_config(&cfg)?;
    let addr: SocketAddr = format!("{}:{}", cfg.bind, cfg.http_port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cfg.bind, cfg.http_port))?;
    let listener = TcpListener::bind(addr).await.with_context(|| format!("While binding {}", addr))?;
    info!("Starting server on {}", addr);
    serve(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

/// `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() { return None; }
    Some(token.to_string())
}

async fn require_bearer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        debug!(target: "policyhub::server", path = %request.uri().path(), "missing bearer token");
        return unauthorized();
    };
    match state.auth.validate_token(&token) {
        Ok(claims) => {
            let ctx = RequestContext::authenticated(claims.into());
            debug!(
                target: "policyhub::server",
                request_id = %ctx.request_id(),
                user = %ctx.email(),
                expires_at = ctx.principal.as_ref().map(|p| p.expires_at).unwrap_or_default(),
                path = %request.uri().path(),
                "bearer accepted"
            );
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => {
            debug!(target: "policyhub::server", path = %request.uri().path(), "rejected token: {}", e);
            unauthorized()
        }
    }
}

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsInput>, JsonRejection>,
) -> Response {
    let creds = match payload.map_err(invalid_json).and_then(|Json(input)| input.into_credentials()) {
        Ok(c) => c,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(e.to_body())).into_response(),
    };
    match state.auth.create_user(&creds).await {
        Ok(new_user) => (StatusCode::CREATED, Json(json!({
            "message": "User has been created successfully",
            "newUser": new_user,
        }))).into_response(),
        Err(e) => {
            warn!(target: "policyhub::server", "registration failed: {e}");
            bad_request(json!(e.message()))
        }
    }
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsInput>, JsonRejection>,
) -> Response {
    let creds = match payload.map_err(invalid_json).and_then(|Json(input)| input.into_credentials()) {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };
    match state.auth.login(&creds).await {
        Ok(outcome) => {
            let status = StatusCode::from_u16(outcome.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
            // Same message for both outcomes; the status and token tell them apart.
            (status, Json(json!({
                "message": "Login sucessful",
                "access_token": outcome.access_token(),
            }))).into_response()
        }
        Err(e) => {
            error!(target: "policyhub::server", "login error: {e}");
            e.into_response()
        }
    }
}

async fn create_policy(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<PolicyInput>, JsonRejection>,
) -> Response {
    let fields = match payload.map_err(invalid_json).and_then(|Json(input)| input.into_new_policy()) {
        Ok(f) => f,
        Err(e) => return e.into_response(),
    };
    match state.policies.create_policy(fields).await {
        Ok(new_policy) => {
            debug!(target: "policyhub::server", request_id = %ctx.request_id(), user = %ctx.email(), id = %new_policy.id, "create_policy");
            (StatusCode::CREATED, Json(json!({
                "message": "Policy has been created successfully",
                "newPolicy": new_policy,
            }))).into_response()
        }
        Err(e) => {
            error!(target: "policyhub::server", "create_policy failed: {e}");
            bad_request(json!("Error: Policy not created!"))
        }
    }
}

async fn get_all_policies(State(state): State<AppState>) -> Response {
    match state.policies.get_all_policies().await {
        Ok(policies) => (StatusCode::OK, Json(json!({
            "message": "All policies data found successfully",
            "policies": policies,
        }))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_policy(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.policies.get_policy(&id).await {
        Ok(policy) => (StatusCode::OK, Json(json!({
            "message": "Policy found successfully",
            "policy": policy,
        }))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn update_policy(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<PolicyInput>, JsonRejection>,
) -> Response {
    let patch = match payload.map_err(invalid_json).and_then(|Json(input)| input.into_patch()) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };
    match state.policies.update_policy(&id, &patch).await {
        Ok(existing_policy) => {
            debug!(target: "policyhub::server", request_id = %ctx.request_id(), user = %ctx.email(), id = %id, "update_policy");
            (StatusCode::OK, Json(json!({
                "message": "Policy has been successfully updated",
                "existingPolicy": existing_policy,
            }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn delete_policy(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    match state.policies.delete_policy(&id).await {
        Ok(deleted_policy) => {
            debug!(target: "policyhub::server", request_id = %ctx.request_id(), user = %ctx.email(), id = %id, "delete_policy");
            (StatusCode::OK, Json(json!({
                "message": "Policy deleted successfully",
                "deletedPolicy": deleted_policy,
            }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), None);
        h.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&h).as_deref(), Some("abc.def.ghi"));
        h.insert("authorization", HeaderValue::from_static("bearer xyz"));
        assert_eq!(bearer_token(&h).as_deref(), Some("xyz"));
        h.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&h), None);
        h.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&h), None);
    }

    #[test]
    fn state_from_memory_config() {
        let mut cfg = ServerConfig::with_secret("s");
        cfg.store = StoreKind::Memory;
        cfg.hash_cost = 1;
        assert!(AppState::from_config(&cfg).is_ok());
    }
}
