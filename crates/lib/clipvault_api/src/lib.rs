//! # clipvault_api
//!
//! HTTP API library for ClipVault accounts and sessions.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, patch, post};
use clipvault_core::auth::{AuthError, AuthorizationGate, CredentialStore, SessionManager};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::handlers::{auth, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Login, refresh, logout, password change.
    pub sessions: SessionManager,
    /// Access-token check for protected routes.
    pub gate: AuthorizationGate,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the credential engine to a store. Fails on unusable auth config.
    pub fn new(config: ApiConfig, store: Arc<dyn CredentialStore>) -> Result<Self, AuthError> {
        let sessions = SessionManager::new(&config.auth, store)?;
        let gate = sessions.gate();
        Ok(Self {
            sessions,
            gate,
            config,
        })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_USERS_REGISTER, post(auth::register_handler))
        .route(routes::POST_USERS_LOGIN, post(auth::login_handler))
        .route(routes::POST_USERS_REFRESH_TOKEN, post(auth::refresh_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_USERS_LOGOUT, post(auth::logout_handler))
        .route(
            routes::POST_USERS_CHANGE_PASSWORD,
            post(auth::change_password_handler),
        )
        .route(
            routes::GET_USERS_CURRENT_USER,
            get(users::current_user_handler),
        )
        .route(
            routes::PATCH_USERS_UPDATE_ACCOUNT,
            patch(users::update_account_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::new();
    };
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        Err(_) => {
            warn!(origin, "ignoring unparseable CORS origin");
            CorsLayer::new()
        }
    }
}
