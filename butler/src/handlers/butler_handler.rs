//! Butler chat handler: answers a message with the LLM and applies any memory directives.
//!
//! **External interactions:** ChatRepository (history), MemoryRepository (relevant memories and
//! directive writes), LlmClient (reply), Bot (send).

use crate::clock::today_in;
use crate::core::{Bot, Handler, HandlerResponse, Message, Result};
use crate::directives::{apply, parse_reply};
use crate::persona::{chat_system_prompt, APOLOGY_MESSAGE};
use async_trait::async_trait;
use chrono_tz::Tz;
use llm_client::LlmClient;
use prompt::{dedupe_memories, format_chat_history, format_memories_for_prompt, ChatMessage};
use std::sync::Arc;
use storage::{ChatRepository, MemoryRepository, RelevanceWindow};
use tracing::{error, info, instrument};

pub const CHAT_HISTORY_LIMIT: i64 = 50;
pub const CHAT_MAX_TOKENS: u32 = 4096;
pub const CREATED_BY_TELEGRAM: &str = "telegram";

#[derive(Clone)]
pub struct ButlerHandler {
    memories: MemoryRepository,
    chats: ChatRepository,
    llm: Arc<dyn LlmClient>,
    bot: Arc<dyn Bot>,
    timezone: Tz,
    window: RelevanceWindow,
}

impl ButlerHandler {
    pub fn new(
        memories: MemoryRepository,
        chats: ChatRepository,
        llm: Arc<dyn LlmClient>,
        bot: Arc<dyn Bot>,
        timezone: Tz,
    ) -> Self {
        Self {
            memories,
            chats,
            llm,
            bot,
            timezone,
            window: RelevanceWindow::default(),
        }
    }

    pub fn with_window(mut self, window: RelevanceWindow) -> Self {
        self.window = window;
        self
    }

    /// History (which already holds the current message), memories and prompt → model → directives.
    async fn respond(&self, message: &Message) -> anyhow::Result<String> {
        let history = self
            .chats
            .history(message.chat.id, CHAT_HISTORY_LIMIT)
            .await?;
        let mut conversation = format_chat_history(&history);
        if conversation.is_empty() {
            conversation.push(ChatMessage::user(format!(
                "{} says: {}",
                message.user.display_name(),
                message.content
            )));
        }

        let today = today_in(self.timezone);
        let memories = dedupe_memories(self.memories.relevant(today, self.window).await?);
        let system = chat_system_prompt(&format_memories_for_prompt(&memories), today);

        info!(
            chat_id = message.chat.id,
            history_len = conversation.len(),
            memory_count = memories.len(),
            "step: requesting chat reply"
        );
        let raw = self
            .llm
            .complete(&system, conversation, Some(CHAT_MAX_TOKENS))
            .await?;

        let parsed = parse_reply(&raw);
        if parsed.has_operations() {
            apply(&self.memories, &parsed, CREATED_BY_TELEGRAM).await;
        }
        Ok(parsed.reply)
    }
}

#[async_trait]
impl Handler for ButlerHandler {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if message.content.trim().is_empty() {
            return Ok(HandlerResponse::Ignore);
        }

        let reply = match self.respond(message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, chat_id = message.chat.id, "Chat reply failed");
                APOLOGY_MESSAGE.to_string()
            }
        };

        self.bot.reply_to(message, &reply).await?;
        Ok(HandlerResponse::Reply(reply))
    }
}
