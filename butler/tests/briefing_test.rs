//! Integration tests for [`butler::Briefing`].

mod common;

use butler::persona::{BACKSTORY, BOT_SENDER_ID};
use butler::Briefing;
use chrono::NaiveDate;
use common::{repositories, RecordingBot, ScriptedLlm};
use std::time::Duration;
use storage::NewMemory;

const CHAT_ID: i64 = -100200;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 11).unwrap()
}

/// **Test: The briefing prompt carries today's relevant memories and the week-day guide.**
///
/// **Setup:** One memory today, one undated, one next month (outside the window).
/// **Action:** `generate(2025-04-11)`.
/// **Expected:** Output is the model text verbatim; system prompt is the persona; the request lists
/// the in-window memories only and names Friday as today.
#[tokio::test]
async fn test_generate_uses_relevant_memories() {
    let (memories, chats) = repositories().await;
    memories
        .create(NewMemory::new("Piano lesson at 4pm").with_date(Some("2025-04-11".into())))
        .await
        .unwrap();
    memories
        .create(NewMemory::new("The family dog is called Biscuit"))
        .await
        .unwrap();
    memories
        .create(NewMemory::new("Passport renewal").with_date(Some("2025-05-20".into())))
        .await
        .unwrap();

    let llm = ScriptedLlm::with_replies(["Good morning, Sir and Madam.\n\n*Today*\nPiano at 4pm."]);
    let briefing = Briefing::new(memories, chats, llm.clone(), RecordingBot::new());

    let text = briefing.generate(day()).await.unwrap();

    assert_eq!(text, "Good morning, Sir and Madam.\n\n*Today*\nPiano at 4pm.");
    let request = &llm.requests()[0];
    assert_eq!(request.system, BACKSTORY);
    let prompt = &request.messages[0].content;
    assert!(prompt.contains("Piano lesson at 4pm"));
    assert!(prompt.contains("The family dog is called Biscuit"));
    assert!(!prompt.contains("Passport renewal"));
    assert!(prompt.contains("* Today: Friday, April 11"));
}

/// **Test: A long briefing is sent as several Markdown messages, each stored as a bot turn.**
#[tokio::test]
async fn test_send_splits_and_stores_chunks() {
    let (memories, chats) = repositories().await;
    let long = (0..300)
        .map(|i| format!("Item {i}: a reminder that is long enough to take some room."))
        .collect::<Vec<_>>()
        .join("\n");
    let llm = ScriptedLlm::with_replies([long.clone()]);
    let bot = RecordingBot::new();
    let briefing = Briefing::new(memories, chats.clone(), llm, bot.clone())
        .with_chunk_pause(Duration::ZERO);

    let sent_count = briefing.send(CHAT_ID, day()).await.unwrap();

    let sent = bot.sent();
    assert!(sent_count > 1);
    assert_eq!(sent.len(), sent_count);
    assert!(sent.iter().all(|m| m.markdown && m.chat_id == CHAT_ID));
    assert!(sent.iter().all(|m| m.text.chars().count() <= 4000));
    let rejoined = sent
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(rejoined, long);

    let history = chats.history(CHAT_ID, 50).await.unwrap();
    assert_eq!(history.len(), sent_count);
    assert!(history.iter().all(|h| h.is_bot && h.sender_id == BOT_SENDER_ID));
}

/// **Test: A model failure surfaces as an error and nothing is sent.**
#[tokio::test]
async fn test_send_propagates_generation_failure() {
    let (memories, chats) = repositories().await;
    let llm = ScriptedLlm::new();
    llm.push_error("rate limited");
    let bot = RecordingBot::new();
    let briefing = Briefing::new(memories, chats, llm, bot.clone());

    assert!(briefing.send(CHAT_ID, day()).await.is_err());
    assert!(bot.sent().is_empty());
}
