//! Bot abstraction for sending messages.
//!
//! [`Bot`] is transport-agnostic; `TelegramBotAdapter` implements it via teloxide and tests
//! substitute a recording implementation.

use crate::core::error::Result;
use crate::core::types::{Chat, Message};
use async_trait::async_trait;

#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends plain text to the given chat.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()>;
    /// Sends text rendered with Telegram's legacy Markdown (`*bold*`, `_italic_`).
    async fn send_markdown(&self, chat: &Chat, text: &str) -> Result<()>;
    /// Sends a reply to the given message (same chat).
    async fn reply_to(&self, message: &Message, text: &str) -> Result<()> {
        self.send_message(&message.chat, text).await
    }
}
