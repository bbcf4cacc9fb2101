//! Tests [`openai_client::OpenAIClient::chat_completion`] against a mock OpenAI-compatible server.

use openai_client::{user_message_with_image, ChatCompletionRequestUserMessageArgs, OpenAIClient};

fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 }
    })
    .to_string()
}

/// **Test: Returns the first choice text and sends model and max_tokens.**
#[tokio::test]
async fn chat_completion_returns_first_choice() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "model": "test-model",
            "max_tokens": 150
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("Very good, sir."))
        .create_async()
        .await;

    let client = OpenAIClient::with_base_url("sk-test".to_string(), server.url());
    let messages = vec![ChatCompletionRequestUserMessageArgs::default()
        .content("Hello")
        .build()
        .unwrap()
        .into()];

    let reply = client
        .chat_completion("test-model", messages, Some(150))
        .await
        .unwrap();

    assert_eq!(reply, "Very good, sir.");
    mock.assert_async().await;
}

/// **Test: Image messages are sent as content parts with a data URL.**
#[tokio::test]
async fn chat_completion_sends_image_parts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::Regex(
            "data:image/jpeg;base64,AQID".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("{\"sender\":\"IRS\"}"))
        .create_async()
        .await;

    let client = OpenAIClient::with_base_url("sk-test".to_string(), server.url());
    let message = user_message_with_image("Describe", "image/jpeg", &[1, 2, 3]).unwrap();

    let reply = client
        .chat_completion("vision-model", vec![message], None)
        .await
        .unwrap();

    assert_eq!(reply, "{\"sender\":\"IRS\"}");
    mock.assert_async().await;
}
