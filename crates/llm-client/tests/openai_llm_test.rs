//! Tests [`llm_client::OpenAILlmClient`] against a mock OpenAI-compatible server, and env config.

use llm_client::{EnvLlmConfig, LlmClient, OpenAILlmClient, DEFAULT_BASE_URL};
use prompt::ChatMessage;
use serial_test::serial;

fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1,
        "model": "butler-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// **Test: complete() sends the system prompt and the conversation with the configured model.**
#[tokio::test]
async fn complete_prepends_system_message() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::AllOf(vec![
            mockito::Matcher::PartialJson(serde_json::json!({ "model": "butler-model" })),
            mockito::Matcher::Regex(
                r#""role":"system","content":"You are a butler\."#.to_string(),
            ),
            mockito::Matcher::Regex("alice says: hi".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("At your service."))
        .create_async()
        .await;

    let client = OpenAILlmClient::with_base_url("sk-test".into(), server.url())
        .with_model("butler-model".into());
    let reply = client
        .complete(
            "You are a butler.",
            vec![
                ChatMessage::user("alice says: hi"),
                ChatMessage::assistant("Good day."),
            ],
            Some(500),
        )
        .await
        .unwrap();

    assert_eq!(reply, "At your service.");
    mock.assert_async().await;
}

/// **Test: Server errors surface as Err rather than an empty reply.**
#[tokio::test]
async fn complete_propagates_http_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"message":"bad request","type":"invalid_request_error","param":null,"code":null}}"#)
        .create_async()
        .await;

    let client = OpenAILlmClient::with_base_url("sk-test".into(), server.url());
    let result = client.complete("sys", vec![ChatMessage::user("x")], None).await;
    assert!(result.is_err());
}

/// **Test: describe_image() returns the model text for a vision request.**
#[tokio::test]
async fn describe_image_returns_text() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::Regex("image_url".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("a letter from the bank"))
        .create_async()
        .await;

    let client = OpenAILlmClient::with_base_url("sk-test".into(), server.url());
    let text = client
        .describe_image("image/png", &[0x89, 0x50], "What is this?", Some(300))
        .await
        .unwrap();
    assert_eq!(text, "a letter from the bank");
}

/// **Test: BRIEFING_MODEL falls back to MODEL; base URL has a default.**
#[test]
#[serial]
fn env_config_defaults() {
    std::env::set_var("OPENAI_API_KEY", "sk-env");
    std::env::remove_var("OPENAI_BASE_URL");
    std::env::set_var("MODEL", "chat-model");
    std::env::remove_var("BRIEFING_MODEL");

    let config = EnvLlmConfig::from_env().unwrap();
    assert_eq!(config.api_key, "sk-env");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.model, "chat-model");
    assert_eq!(config.briefing_model, "chat-model");

    std::env::set_var("BRIEFING_MODEL", "brief-model");
    let config = EnvLlmConfig::from_env().unwrap();
    assert_eq!(config.briefing_model, "brief-model");

    std::env::remove_var("MODEL");
    std::env::remove_var("BRIEFING_MODEL");
}

/// **Test: Missing OPENAI_API_KEY is an error.**
#[test]
#[serial]
fn env_config_requires_api_key() {
    let saved = std::env::var("OPENAI_API_KEY").ok();
    std::env::remove_var("OPENAI_API_KEY");
    assert!(EnvLlmConfig::from_env().is_err());
    if let Some(v) = saved {
        std::env::set_var("OPENAI_API_KEY", v);
    }
}
