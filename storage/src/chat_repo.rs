//! Chat repository: raw Telegram turns kept as conversational context for the model.

use crate::error::StorageError;
use crate::models::ChatMessageRecord;
use crate::sqlite_pool::SqlitePoolManager;
use tracing::{error, info};

#[derive(Clone)]
pub struct ChatRepository {
    pool_manager: SqlitePoolManager,
}

impl ChatRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::with_pool(pool_manager).await
    }

    pub async fn with_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating telegram_chats table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS telegram_chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                sender_id TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                is_bot BOOLEAN NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_telegram_chats_chat_id ON telegram_chats(chat_id)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Stores one turn and returns its row id.
    pub async fn store(&self, record: &ChatMessageRecord) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO telegram_chats (chat_id, sender_id, sender_name, message, timestamp, is_bot)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.chat_id)
        .bind(&record.sender_id)
        .bind(&record.sender_name)
        .bind(&record.message)
        .bind(record.timestamp)
        .bind(record.is_bot)
        .execute(self.pool_manager.pool())
        .await
        .map_err(|e| {
            error!(error = %e, chat_id = record.chat_id, "Failed to store chat message");
            StorageError::from(e)
        })?;

        info!(
            chat_id = record.chat_id,
            sender_id = %record.sender_id,
            is_bot = record.is_bot,
            "Stored chat message"
        );
        Ok(result.last_insert_rowid())
    }

    /// The most recent `limit` turns of a chat, oldest first.
    pub async fn history(
        &self,
        chat_id: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessageRecord>, StorageError> {
        let messages = sqlx::query_as::<_, ChatMessageRecord>(
            r#"
            SELECT * FROM (
                SELECT id, chat_id, sender_id, sender_name, message, timestamp, is_bot
                FROM telegram_chats
                WHERE chat_id = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT ?
            )
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(self.pool_manager.pool())
        .await?;

        info!(
            chat_id = chat_id,
            count = messages.len(),
            "Retrieved chat history"
        );
        Ok(messages)
    }
}
