//! # Dashboard HTTP server
//!
//! axum router for the memory dashboard: memory CRUD, cached image serving, the static front end,
//! the Telegram webhook and the USPS e-mail hook.

mod assets;
mod hooks;
mod memories;

use crate::chain::HandlerChain;
use crate::importers::UspsProcessor;
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::http::{self, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono_tz::Tz;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use storage::MemoryRepository;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Chat entry point for `POST /telegram/webhook`.
#[derive(Clone)]
pub struct TelegramWebhook {
    pub chain: HandlerChain,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`; None disables the check.
    pub secret: Option<String>,
}

#[derive(Clone)]
pub struct DashboardState {
    pub memories: MemoryRepository,
    pub static_dir: PathBuf,
    pub image_dir: PathBuf,
    pub timezone: Tz,
    pub telegram: Option<TelegramWebhook>,
    pub usps: Option<UspsProcessor>,
}

impl DashboardState {
    pub fn new(
        memories: MemoryRepository,
        static_dir: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
        timezone: Tz,
    ) -> Self {
        Self {
            memories,
            static_dir: static_dir.into(),
            image_dir: image_dir.into(),
            timezone,
            telegram: None,
            usps: None,
        }
    }

    pub fn with_telegram(mut self, webhook: TelegramWebhook) -> Self {
        self.telegram = Some(webhook);
        self
    }

    pub fn with_usps(mut self, usps: UspsProcessor) -> Self {
        self.usps = Some(usps);
        self
    }
}

/// JSON error body: `{"error": ...}` plus `details` when given.
pub(crate) fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    let body = match details {
        Some(details) => json!({ "error": error, "details": details }),
        None => json!({ "error": error }),
    };
    (status, Json(body)).into_response()
}

/// Malformed or mistyped JSON bodies get the same `{error, details}` shape as other failures.
pub(crate) fn rejection_response(rejection: JsonRejection) -> Response {
    error_response(
        rejection.status(),
        "Invalid request body",
        Some(rejection.body_text()),
    )
}

pub fn build_router(state: DashboardState) -> Router {
    let public = ServeDir::new(&state.static_dir);
    let state = Arc::new(state);

    Router::new()
        .route("/", get(assets::index))
        .route("/health", get(health))
        .route(
            "/api/memories",
            get(memories::list_memories).post(memories::create_memory),
        )
        .route(
            "/api/memories/{id}",
            put(memories::update_memory).delete(memories::delete_memory),
        )
        .route("/api/images/{filename}", get(assets::image))
        .route("/api/email/usps", post(hooks::usps_email))
        .route("/telegram/webhook", post(hooks::telegram_webhook))
        .nest_service("/public", public)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                    http::Method::OPTIONS,
                ])
                .allow_headers([http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Binds `addr` and serves the dashboard until the process exits.
pub async fn serve(addr: &str, state: DashboardState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard on {addr}"))?;
    info!(addr = %addr, "Dashboard listening");
    axum::serve(listener, build_router(state))
        .await
        .context("dashboard server stopped")?;
    Ok(())
}
