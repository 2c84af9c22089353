//! Mock HTTP servers for testing provider clients offline
//!
//! Wiremock-based stand-ins for the Claude, OpenAI-compatible, and Gemini
//! upstream APIs, so tests run without real API keys.

use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Claude messages-API mock server
pub struct ClaudeMockServer {
    server: MockServer,
}

impl ClaudeMockServer {
    /// Create a new Claude mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the base URL of this mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Mount a successful messages response
    pub async fn mock_message(&self, content: &str, model: &str, input_tokens: u32, output_tokens: u32) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-mock",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": content}],
                "stop_reason": "end_turn",
                "model": model,
                "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens}
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a successful response delivered after `delay`
    pub async fn mock_message_with_delay(&self, content: &str, model: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(delay)
                    .set_body_json(serde_json::json!({
                        "content": [{"type": "text", "text": content}],
                        "model": model,
                        "usage": {"input_tokens": 1, "output_tokens": 1}
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount an error response with the given status and body
    pub async fn mock_error(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }
}

/// OpenAI-compatible chat-completions mock server, shared by the ChatGPT,
/// Moonshot, and Perplexity clients
pub struct OpenAiMockServer {
    server: MockServer,
}

impl OpenAiMockServer {
    /// Create a new OpenAI-compatible mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the base URL of this mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Mount a successful chat-completion response
    pub async fn mock_chat_completion(
        &self,
        content: &str,
        model: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
    ) {
        self.mock_chat_completion_raw(serde_json::json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": prompt_tokens,
                "completion_tokens": completion_tokens,
                "total_tokens": prompt_tokens + completion_tokens
            }
        }))
        .await;
    }

    /// Mount an arbitrary JSON body as the chat-completion response,
    /// for shaping citation locations or dropping usage fields
    pub async fn mock_chat_completion_raw(&self, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Mount an error response with the given status and body
    pub async fn mock_error(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }
}

/// Gemini generateContent mock server
pub struct GeminiMockServer {
    server: MockServer,
}

impl GeminiMockServer {
    /// Create a new Gemini mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the base URL of this mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Mount a successful generateContent response
    pub async fn mock_generate(
        &self,
        content: &str,
        finish_reason: &str,
        prompt_tokens: u32,
        candidate_tokens: u32,
    ) {
        self.mock_generate_raw(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": content}]},
                "finishReason": finish_reason
            }],
            "usageMetadata": {
                "promptTokenCount": prompt_tokens,
                "candidatesTokenCount": candidate_tokens
            }
        }))
        .await;
    }

    /// Mount a response whose candidate carries no text (safety block etc.)
    pub async fn mock_blocked(&self, finish_reason: &str) {
        self.mock_generate_raw(serde_json::json!({
            "candidates": [{"finishReason": finish_reason}],
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 0}
        }))
        .await;
    }

    /// Mount an arbitrary JSON body as the generateContent response
    pub async fn mock_generate_raw(&self, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/[^/]+:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Mount an error response with the given status and body
    pub async fn mock_error(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/[^/]+:generateContent$"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatGptClient, ClaudeClient, Client, GeminiClient, Message, PerplexityClient};

    #[tokio::test]
    async fn test_claude_mock_round_trip() {
        let mock = ClaudeMockServer::start().await;
        mock.mock_message("hello", "claude-x", 3, 2).await;

        let client = ClaudeClient::new("test-key", "claude-x", mock.base_url()).unwrap();
        let result = client
            .chat(&[Message::user("hi")], None, 10, 0.7)
            .await
            .unwrap();

        assert_eq!(result.content, "hello");
        assert_eq!(result.model, "claude-x");
        assert_eq!(result.provider, "claude");
        assert_eq!(result.usage.input_tokens, 3);
        assert_eq!(result.usage.output_tokens, 2);
    }

    #[tokio::test]
    async fn test_claude_mock_error_carries_status_and_body() {
        let mock = ClaudeMockServer::start().await;
        mock.mock_error(529, "overloaded").await;

        let client = ClaudeClient::new("test-key", "claude-x", mock.base_url()).unwrap();
        let err = client
            .chat(&[Message::user("hi")], None, 10, 0.7)
            .await
            .unwrap_err();

        match err {
            crate::Error::Api { provider, status, body } => {
                assert_eq!(provider, "claude");
                assert_eq!(status, 529);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chatgpt_mock_round_trip() {
        let mock = OpenAiMockServer::start().await;
        mock.mock_chat_completion("gpt says hi", "gpt-4o", 12, 4).await;

        let client = ChatGptClient::new("k", "gpt-4o", mock.base_url()).unwrap();
        let result = client
            .chat(&[Message::user("hi")], None, 10, 0.7)
            .await
            .unwrap();

        assert_eq!(result.content, "gpt says hi");
        assert_eq!(result.provider, "chatgpt");
        assert_eq!(result.usage.input_tokens, 12);
        assert_eq!(result.usage.output_tokens, 4);
    }

    #[tokio::test]
    async fn test_perplexity_mock_nested_citations() {
        let mock = OpenAiMockServer::start().await;
        mock.mock_chat_completion_raw(serde_json::json!({
            "model": "sonar",
            "choices": [{
                "message": {
                    "content": "cited answer",
                    "citations": ["https://example.com/a", "https://example.com/b"]
                }
            }]
        }))
        .await;

        let client = PerplexityClient::new("k", "sonar", mock.base_url()).unwrap();
        let result = client
            .chat(&[Message::user("hi")], None, 10, 0.7)
            .await
            .unwrap();

        assert_eq!(
            result.citations,
            Some(vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string()
            ])
        );
        // Missing usage fields default to zero
        assert_eq!(result.usage.input_tokens, 0);
        assert_eq!(result.usage.output_tokens, 0);
    }

    #[tokio::test]
    async fn test_gemini_mock_round_trip() {
        let mock = GeminiMockServer::start().await;
        mock.mock_generate("gemini says hi", "STOP", 9, 3).await;

        let client = GeminiClient::new("k", "gemini-1.5-pro", mock.base_url()).unwrap();
        let result = client
            .chat(&[Message::user("hi")], None, 10, 0.7)
            .await
            .unwrap();

        assert_eq!(result.content, "gemini says hi");
        assert_eq!(result.provider, "gemini");
        assert_eq!(result.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(result.usage.input_tokens, 9);
        assert_eq!(result.usage.output_tokens, 3);
    }

    #[tokio::test]
    async fn test_gemini_mock_safety_block_is_success() {
        let mock = GeminiMockServer::start().await;
        mock.mock_blocked("SAFETY").await;

        let client = GeminiClient::new("k", "gemini-1.5-pro", mock.base_url()).unwrap();
        let result = client
            .chat(&[Message::user("hi")], None, 10, 0.7)
            .await
            .unwrap();

        assert_eq!(result.content, "[Empty response: SAFETY]");
        assert_eq!(result.finish_reason.as_deref(), Some("SAFETY"));
    }
}
