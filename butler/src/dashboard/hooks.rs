//! Inbound hooks: Telegram updates and USPS e-mails.

use super::{error_response, rejection_response, DashboardState};
use crate::clock::today_in;
use crate::importers::EmailPayload;
use crate::telegram::{parse_update, secret_matches, SECRET_TOKEN_HEADER};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handles one update through the chat chain. Handler failures still answer 200 so Telegram does
/// not redeliver the update.
pub(super) async fn telegram_webhook(
    State(state): State<Arc<DashboardState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(webhook) = state.telegram.as_ref() else {
        return error_response(StatusCode::NOT_FOUND, "Telegram webhook is not enabled", None);
    };

    let header = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if !secret_matches(webhook.secret.as_deref(), header) {
        warn!("Telegram webhook secret mismatch");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let message = match parse_update(&body) {
        Ok(Some(message)) => message,
        Ok(None) => return StatusCode::OK.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to parse Telegram webhook");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    info!(chat_id = message.chat.id, "Telegram webhook message received");
    if let Err(e) = webhook.chain.handle(&message).await {
        error!(chat_id = message.chat.id, error = %e, "Handler chain failed");
    }
    StatusCode::OK.into_response()
}

pub(super) async fn usps_email(
    State(state): State<Arc<DashboardState>>,
    payload: Result<Json<EmailPayload>, JsonRejection>,
) -> Response {
    let Some(usps) = state.usps.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "USPS processing is not configured",
            None,
        );
    };
    let Json(email) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match usps.process(&email, today_in(state.timezone)).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = %e, "USPS e-mail processing failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process email",
                Some(format!("{e:#}")),
            )
        }
    }
}
