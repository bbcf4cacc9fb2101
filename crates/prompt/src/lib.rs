//! # Prompt
//!
//! Formats stored memories and chat history into prompt text for AI models.
//!
//! ## Format
//!
//! - **Memories**: an `Undated memories:` section followed by a `Dated memories:` section
//!   sorted by day; every line ends with `[ID: …]` so the model can reference records
//!   when asking for edits or deletions.
//! - **Chat history**: bot turns become assistant messages; everyone else becomes a user
//!   message prefixed with `"{name} says: "`.
//! - **Week days**: a short guide mapping the next seven dates to "Today", "Tomorrow" and
//!   weekday names.
//!
//! ## External interactions
//!
//! - **AI models**: output is sent to OpenAI-compatible chat APIs.

use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use storage::{ChatMessageRecord, Memory};

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// System instruction (API `role: "system"`).
    System,
    /// User message (API `role: "user"`).
    User,
    /// Assistant message (API `role: "assistant"`).
    Assistant,
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Section title for memories without a date.
pub const SECTION_UNDATED: &str = "Undated memories:";

/// Section title for memories attached to a day.
pub const SECTION_DATED: &str = "Dated memories:";

/// Text used when there is nothing to show.
pub const NO_MEMORIES: &str = "No memories are currently stored.";

/// Drops memories repeating an earlier `(day, text)` pair; keeps the first occurrence and order.
/// Text is compared after trimming whitespace, case included.
pub fn dedupe_memories(memories: Vec<Memory>) -> Vec<Memory> {
    let mut seen: HashSet<(Option<String>, String)> = HashSet::new();
    memories
        .into_iter()
        .filter(|m| {
            let key = (m.day().map(str::to_string), m.text.trim().to_string());
            seen.insert(key)
        })
        .collect()
}

/// Renders memories for a prompt: undated first, then dated by day (stable within a day).
pub fn format_memories_for_prompt(memories: &[Memory]) -> String {
    if memories.is_empty() {
        return NO_MEMORIES.to_string();
    }

    let undated: Vec<&Memory> = memories.iter().filter(|m| m.is_undated()).collect();
    let mut dated: Vec<&Memory> = memories.iter().filter(|m| !m.is_undated()).collect();
    dated.sort_by(|a, b| a.day().cmp(&b.day()));

    let mut out = String::new();
    if !undated.is_empty() {
        out.push_str(SECTION_UNDATED);
        out.push('\n');
        for m in &undated {
            out.push_str(&format!("- {} [ID: {}]\n", m.text.trim(), m.id));
        }
    }
    if !dated.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(SECTION_DATED);
        out.push('\n');
        for m in &dated {
            out.push_str(&format!(
                "- {}: {} [ID: {}]\n",
                m.day().unwrap_or_default(),
                m.text.trim(),
                m.id
            ));
        }
    }
    out.trim_end().to_string()
}

/// Converts stored chat turns into role-tagged messages for the model.
pub fn format_chat_history(history: &[ChatMessageRecord]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|m| !m.message.trim().is_empty())
        .map(|m| {
            if m.is_bot {
                ChatMessage::assistant(m.message.clone())
            } else {
                ChatMessage::user(format!("{} says: {}", m.sender_name, m.message))
            }
        })
        .collect()
}

/// "* Today: Friday, April 11", "* Tomorrow: …", then the next five days.
pub fn week_days_guide(today: NaiveDate) -> String {
    (0..7)
        .map(|offset| {
            let day = today + Duration::days(offset);
            let label = day.format("%A, %B %-d");
            match offset {
                0 => format!("* Today: {}", label),
                1 => format!("* Tomorrow: {}", label),
                _ => format!("* {}", label),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
