//! Webhook plumbing: secret-token derivation, update parsing and registration.

use crate::core::{Message, ToCoreMessage};
use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use tracing::{info, instrument};

use super::adapters::TelegramMessageWrapper;

/// Header Telegram sets on webhook calls when a secret token was registered.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Secret token derived from the bot token: the part after the first `:`.
pub fn webhook_secret(bot_token: &str) -> Option<String> {
    bot_token
        .split_once(':')
        .map(|(_, secret)| secret.to_string())
        .filter(|s| !s.is_empty())
}

/// Whether the header value matches the expected secret. No expected secret accepts anything.
pub fn secret_matches(expected: Option<&str>, header: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => header == Some(expected),
    }
}

/// Parses a webhook body. Returns the text message it carries, or None for any other update.
pub fn parse_update(body: &str) -> Result<Option<Message>> {
    let update: Update = serde_json::from_str(body).context("invalid Telegram update JSON")?;
    match update.kind {
        UpdateKind::Message(ref msg) if msg.text().is_some() => {
            Ok(Some(TelegramMessageWrapper(msg).to_core()))
        }
        _ => Ok(None),
    }
}

/// Points Telegram at `url`, attaching the derived secret token when available.
#[instrument(skip(bot, secret))]
pub async fn register_webhook(bot: &teloxide::Bot, url: &str, secret: Option<String>) -> Result<()> {
    let url = reqwest::Url::parse(url).context("invalid TELEGRAM_WEBHOOK_URL")?;
    let mut request = bot.set_webhook(url.clone());
    if let Some(secret) = secret {
        request = request.secret_token(secret);
    }
    request.await.context("setWebhook failed")?;
    info!(url = %url, "Webhook registered");
    Ok(())
}
