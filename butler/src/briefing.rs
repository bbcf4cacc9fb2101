//! # Daily briefing
//!
//! Reads the relevant memories for a day, asks the briefing model for a Telegram-Markdown digest
//! and sends it in chunks that fit Telegram's message limit. Each chunk is also stored as a bot
//! chat turn so later conversation can refer to it.

use crate::core::{Bot, Chat};
use crate::persona::{briefing_request, BACKSTORY, BOT_SENDER_ID, BOT_SENDER_NAME};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use llm_client::LlmClient;
use prompt::{dedupe_memories, format_memories_for_prompt, week_days_guide, ChatMessage};
use std::sync::Arc;
use std::time::Duration;
use storage::{ChatMessageRecord, ChatRepository, MemoryRepository, RelevanceWindow};
use tracing::{info, instrument};

/// Below Telegram's 4096-character cap.
pub const TELEGRAM_CHUNK_LIMIT: usize = 4000;
pub const BRIEFING_MAX_TOKENS: u32 = 8000;
const CHUNK_PAUSE: Duration = Duration::from_millis(500);

/// Splits `text` on line boundaries into chunks of at most `limit` characters. Lines longer
/// than `limit` are hard-split on character boundaries. Blank chunks are dropped and no chunk
/// ends with a blank line.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let mut flush = |current: &mut String, current_len: &mut usize, chunks: &mut Vec<String>| {
        // Blank lines that fit before a boundary would otherwise trail the chunk.
        let kept = current.trim_end_matches('\n');
        if !kept.trim().is_empty() {
            chunks.push(kept.to_string());
            current.clear();
        } else {
            current.clear();
        }
        *current_len = 0;
    };

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > limit {
            flush(&mut current, &mut current_len, &mut chunks);
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                let piece: String = piece.iter().collect();
                if !piece.trim().is_empty() {
                    chunks.push(piece);
                }
            }
            continue;
        }

        let added = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + added > limit {
            flush(&mut current, &mut current_len, &mut chunks);
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    flush(&mut current, &mut current_len, &mut chunks);

    chunks
}

#[derive(Clone)]
pub struct Briefing {
    memories: MemoryRepository,
    chats: ChatRepository,
    llm: Arc<dyn LlmClient>,
    bot: Arc<dyn Bot>,
    window: RelevanceWindow,
    chunk_pause: Duration,
}

impl Briefing {
    pub fn new(
        memories: MemoryRepository,
        chats: ChatRepository,
        llm: Arc<dyn LlmClient>,
        bot: Arc<dyn Bot>,
    ) -> Self {
        Self {
            memories,
            chats,
            llm,
            bot,
            window: RelevanceWindow::default(),
            chunk_pause: CHUNK_PAUSE,
        }
    }

    pub fn with_chunk_pause(mut self, pause: Duration) -> Self {
        self.chunk_pause = pause;
        self
    }

    /// Briefing text for `today`, verbatim from the model.
    #[instrument(skip(self))]
    pub async fn generate(&self, today: NaiveDate) -> Result<String> {
        let memories = dedupe_memories(
            self.memories
                .relevant(today, self.window)
                .await
                .context("failed to load relevant memories")?,
        );
        let request = briefing_request(
            &format_memories_for_prompt(&memories),
            &week_days_guide(today),
        );
        info!(memory_count = memories.len(), "step: requesting briefing");
        let content = self
            .llm
            .complete(BACKSTORY, vec![ChatMessage::user(request)], Some(BRIEFING_MAX_TOKENS))
            .await
            .context("briefing generation failed")?;
        Ok(content)
    }

    /// Generates and sends the briefing to `chat_id`; returns the number of messages sent.
    #[instrument(skip(self))]
    pub async fn send(&self, chat_id: i64, today: NaiveDate) -> Result<usize> {
        let content = self.generate(today).await?;
        let chunks = split_message(&content, TELEGRAM_CHUNK_LIMIT);
        let chat = Chat::with_id(chat_id);

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.chunk_pause).await;
            }
            self.bot
                .send_markdown(&chat, chunk)
                .await
                .context("failed to send briefing chunk")?;
            let record =
                ChatMessageRecord::new(chat_id, BOT_SENDER_ID, BOT_SENDER_NAME, chunk.clone(), true);
            self.chats
                .store(&record)
                .await
                .context("failed to store briefing chunk")?;
        }

        info!(chat_id = chat_id, chunks = chunks.len(), "Daily briefing sent");
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_message("*Today*\nSunny.", 4000), vec!["*Today*\nSunny."]);
    }

    #[test]
    fn test_splits_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 9), vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_long_line_is_hard_split() {
        let text = format!("intro\n{}\noutro", "x".repeat(25));
        let chunks = split_message(&text, 10);
        assert_eq!(
            chunks,
            vec!["intro", "xxxxxxxxxx", "xxxxxxxxxx", "xxxxx", "outro"]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_multibyte_characters_are_not_broken() {
        let text = "☀️".repeat(30);
        let chunks = split_message(&text, 7);
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_no_empty_chunks() {
        assert!(split_message("", 10).is_empty());
        assert!(split_message("\n\n\n", 10).is_empty());
        let chunks = split_message("abc\n\n\n\ndef", 4);
        assert_eq!(chunks, vec!["abc", "def"]);
    }

    #[test]
    fn test_paragraph_breaks_do_not_trail_chunks() {
        let text = "*Today*\nSunny.\n\n*Mail*\nTwo letters.\n\n*Facts*\nOrchids live long.";
        let chunks = split_message(text, 20);
        assert_eq!(
            chunks,
            vec!["*Today*\nSunny.", "*Mail*\nTwo letters.", "*Facts*", "Orchids live long."]
        );
        assert!(chunks.iter().all(|c| !c.ends_with('\n') && !c.starts_with('\n')));
    }

    #[test]
    fn test_every_chunk_within_limit() {
        let text = (0..500)
            .map(|i| format!("line number {i} of the briefing"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = split_message(&text, TELEGRAM_CHUNK_LIMIT);
        assert!(chunks.len() > 1);
        assert!(chunks
            .iter()
            .all(|c| c.chars().count() <= TELEGRAM_CHUNK_LIMIT));
        assert_eq!(chunks.join("\n"), text);
    }
}
