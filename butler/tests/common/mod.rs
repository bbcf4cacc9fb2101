//! Shared fixtures: a recording [`Bot`], a scripted [`LlmClient`] and in-memory repositories.

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use butler::{Bot, Chat, Message, MessageDirection, Result, User};
use chrono::Utc;
use llm_client::LlmClient;
use prompt::ChatMessage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use storage::{ChatRepository, MemoryRepository, MemoryTable, SqlitePoolManager};

/// One message the bot was asked to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub markdown: bool,
}

/// Bot that records every outgoing message instead of calling Telegram.
#[derive(Default)]
pub struct RecordingBot {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingBot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, chat: &Chat, text: &str, markdown: bool) {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat.id,
            text: text.to_string(),
            markdown,
        });
    }
}

#[async_trait]
impl Bot for RecordingBot {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.record(chat, text, false);
        Ok(())
    }

    async fn send_markdown(&self, chat: &Chat, text: &str) -> Result<()> {
        self.record(chat, text, true);
        Ok(())
    }
}

/// A `complete` call as seen by the scripted client.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
}

/// A `describe_image` call as seen by the scripted client.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// LLM client that returns queued replies in order. `Err` entries (and an empty queue) fail the call.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    image_replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<LlmRequest>>,
    image_requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let llm = Self::default();
        for reply in replies {
            llm.push_reply(reply);
        }
        Arc::new(llm)
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Err(error.into()));
    }

    pub fn push_image_reply(&self, reply: impl Into<String>) {
        self.image_replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_image_error(&self, error: impl Into<String>) {
        self.image_replies.lock().unwrap().push_back(Err(error.into()));
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.image_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(LlmRequest {
            system: system.to_string(),
            messages,
            max_tokens,
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }

    async fn describe_image(
        &self,
        media_type: &str,
        bytes: &[u8],
        _instruction: &str,
        _max_tokens: Option<u32>,
    ) -> anyhow::Result<String> {
        self.image_requests.lock().unwrap().push(ImageRequest {
            media_type: media_type.to_string(),
            bytes: bytes.to_vec(),
        });
        match self.image_replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Err(anyhow!("no scripted image reply left")),
        }
    }
}

/// Memory and chat repositories sharing one in-memory database.
pub async fn repositories() -> (MemoryRepository, ChatRepository) {
    let pool = SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create in-memory pool");
    let memories = MemoryRepository::with_pool(pool.clone(), MemoryTable::Production)
        .await
        .expect("Failed to create memory repository");
    let chats = ChatRepository::with_pool(pool)
        .await
        .expect("Failed to create chat repository");
    (memories, chats)
}

pub fn text_message(chat_id: i64, content: &str) -> Message {
    Message {
        id: "1".to_string(),
        user: User {
            id: 7,
            username: Some("margaret".to_string()),
            first_name: Some("Margaret".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: chat_id,
            chat_type: "private".to_string(),
        },
        content: content.to_string(),
        message_type: "text".to_string(),
        direction: MessageDirection::Incoming,
        created_at: Utc::now(),
    }
}
