//! Chat turn model for persistence.
//!
//! Maps to the `telegram_chats` table and is used by ChatRepository.

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessageRecord {
    /// Autoincrement row id; 0 until stored.
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: String,
    pub sender_name: String,
    pub message: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub is_bot: bool,
}

impl ChatMessageRecord {
    /// Creates a new turn stamped with the current time.
    pub fn new(
        chat_id: i64,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        message: impl Into<String>,
        is_bot: bool,
    ) -> Self {
        Self {
            id: 0,
            chat_id,
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            message: message.into(),
            timestamp: Utc::now().timestamp(),
            is_bot,
        }
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
