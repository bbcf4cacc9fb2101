//! Handler that records chat turns: the incoming message in before(), the bot's reply in after().

use crate::core::{ButlerError, Handler, HandlerResponse, Message, Result};
use crate::persona::{BOT_SENDER_ID, BOT_SENDER_NAME};
use async_trait::async_trait;
use storage::{ChatMessageRecord, ChatRepository};
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct PersistenceHandler {
    chats: ChatRepository,
}

impl PersistenceHandler {
    pub fn new(chats: ChatRepository) -> Self {
        Self { chats }
    }
}

#[async_trait]
impl Handler for PersistenceHandler {
    #[instrument(skip(self, message))]
    async fn before(&self, message: &Message) -> Result<bool> {
        if message.content.trim().is_empty() {
            return Ok(true);
        }
        let record = ChatMessageRecord::new(
            message.chat.id,
            message.user.id.to_string(),
            message.user.display_name(),
            message.content.clone(),
            false,
        );
        self.chats.store(&record).await.map_err(|e| {
            error!(error = %e, chat_id = message.chat.id, "Failed to store incoming message");
            ButlerError::Database(e.to_string())
        })?;
        info!(chat_id = message.chat.id, "step: incoming message stored");
        Ok(true)
    }

    #[instrument(skip(self, message, response))]
    async fn after(&self, message: &Message, response: &HandlerResponse) -> Result<()> {
        if let HandlerResponse::Reply(text) = response {
            let record = ChatMessageRecord::new(
                message.chat.id,
                BOT_SENDER_ID,
                BOT_SENDER_NAME,
                text.clone(),
                true,
            );
            self.chats.store(&record).await.map_err(|e| {
                error!(error = %e, chat_id = message.chat.id, "Failed to store bot reply");
                ButlerError::Database(e.to_string())
            })?;
            info!(chat_id = message.chat.id, "step: bot reply stored");
        }
        Ok(())
    }
}
