//! Slash commands: `/start` introduces the butler; any other command is swallowed.

use crate::core::{Bot, Handler, HandlerResponse, Message, Result};
use crate::persona::INTRO_MESSAGE;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct CommandHandler {
    bot: Arc<dyn Bot>,
}

impl CommandHandler {
    pub fn new(bot: Arc<dyn Bot>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Handler for CommandHandler {
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if !message.is_command() {
            return Ok(HandlerResponse::Continue);
        }
        let command = message.content.split_whitespace().next().unwrap_or("");
        // Group chats send `/start@botname`.
        let command = command.split('@').next().unwrap_or(command);
        if command == "/start" {
            self.bot.reply_to(message, INTRO_MESSAGE).await?;
            return Ok(HandlerResponse::Reply(INTRO_MESSAGE.to_string()));
        }
        info!(command = %command, chat_id = message.chat.id, "Ignoring command");
        Ok(HandlerResponse::Stop)
    }
}
