//! Wraps teloxide::Bot and implements [`crate::core::Bot`].

use crate::core::{Bot as CoreBot, ButlerError, Chat, Result};
use async_trait::async_trait;
use teloxide::{prelude::*, types::ChatId, types::ParseMode};
use tracing::{error, warn};

/// Builds a teloxide Bot, pointing it at `api_url` when given (e.g. a mock server in tests).
pub fn build_teloxide_bot(token: &str, api_url: Option<&str>) -> teloxide::Bot {
    let bot = teloxide::Bot::new(token);
    match api_url {
        Some(url_str) => match reqwest::Url::parse(url_str) {
            Ok(url) => bot.set_api_url(url),
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        },
        None => bot,
    }
}

/// Thin wrapper around teloxide::Bot that implements core's Bot trait.
#[derive(Clone)]
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use (polling, webhook registration).
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(|e| ButlerError::Bot(e.to_string()))?;
        Ok(())
    }

    /// Falls back to plain text when Telegram rejects the Markdown entities.
    #[allow(deprecated)]
    async fn send_markdown(&self, chat: &Chat, text: &str) -> Result<()> {
        let sent = self
            .bot
            .send_message(ChatId(chat.id), text.to_string())
            .parse_mode(ParseMode::Markdown)
            .await;
        if let Err(e) = sent {
            warn!(error = %e, chat_id = chat.id, "Markdown send failed, retrying as plain text");
            self.send_message(chat, text).await?;
        }
        Ok(())
    }
}
