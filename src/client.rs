//! Provider client implementations
//!
//! One client per upstream provider, each translating the normalized chat
//! shape into that provider's wire protocol and back. The wire formats are
//! fixed external contracts; header names, field names, and status-code
//! semantics must match them exactly.

use crate::message::{ChatResult, Message, MessageRole, Usage};
use crate::{Error, Result};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum characters of an upstream body kept in diagnostics
const DIAGNOSTIC_BODY_LIMIT: usize = 500;

/// Timeout for providers that run long generations (Claude, Gemini)
const LONG_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for the OpenAI-compatible providers
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Build an HTTP client with specified timeout
fn build_http_client(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}

/// Truncate a string to at most `limit` characters, on a char boundary
pub(crate) fn truncate_chars(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        s.to_string()
    } else {
        s.chars().take(limit).collect()
    }
}

/// Map a reqwest failure into the transport error taxonomy.
/// Timeouts are a distinct failure kind.
fn transport_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            provider: provider.to_string(),
        }
    } else {
        Error::Transport {
            provider: provider.to_string(),
            detail: err.to_string(),
        }
    }
}

fn api_error(provider: &str, status: u16, body: &str) -> Error {
    Error::Api {
        provider: provider.to_string(),
        status,
        body: truncate_chars(body, DIAGNOSTIC_BODY_LIMIT),
    }
}

fn parse_error(provider: &str, status: u16, err: serde_json::Error, body: &str) -> Error {
    Error::Api {
        provider: provider.to_string(),
        status,
        body: truncate_chars(&format!("failed to parse response: {}. Body: {}", err, body),
            DIAGNOSTIC_BODY_LIMIT),
    }
}

/// Trait for provider clients
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Send one chat request and return the normalized result.
    ///
    /// Performs exactly one upstream call; failures are never collapsed into
    /// a success value.
    async fn chat(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult>;
}

// ---------------------------------------------------------------------------
// Claude (Anthropic)
// ---------------------------------------------------------------------------

/// Anthropic Claude client
pub struct ClaudeClient {
    api_key: String,
    model: String,
    base_url: String,
    http_client: HttpClient,
}

impl ClaudeClient {
    /// Create a new Claude client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(ClaudeClient {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            http_client: build_http_client(LONG_TIMEOUT)?,
        })
    }

    pub(crate) fn request_body(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> ClaudeMessageRequest {
        ClaudeMessageRequest {
            model: self.model.clone(),
            max_tokens,
            temperature,
            messages: messages.to_vec(),
            system: system_prompt.map(str::to_string),
        }
    }
}

#[async_trait::async_trait]
impl Client for ClaudeClient {
    async fn chat(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let request = self.request_body(messages, system_prompt, max_tokens, temperature);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("claude", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("claude", e))?;

        if !status.is_success() {
            return Err(api_error("claude", status.as_u16(), &body));
        }

        let parsed: ClaudeMessageResponse = serde_json::from_str(&body)
            .map_err(|e| parse_error("claude", status.as_u16(), e, &body))?;

        let content = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| api_error("claude", status.as_u16(), "response contained no content blocks"))?;

        Ok(ChatResult {
            content,
            model: parsed.model,
            provider: "claude".to_string(),
            usage: Usage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
            citations: None,
            finish_reason: None,
        })
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible providers (ChatGPT, Moonshot, Perplexity)
// ---------------------------------------------------------------------------

/// Prepend the system prompt as a `system`-role message, the
/// OpenAI-compatible convention.
fn openai_compat_messages(messages: &[Message], system_prompt: Option<&str>) -> Vec<WireMessage> {
    let mut all = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = system_prompt {
        all.push(WireMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    all.extend(messages.iter().map(|m| WireMessage {
        role: match m.role {
            MessageRole::User => "user".to_string(),
            MessageRole::Assistant => "assistant".to_string(),
        },
        content: m.content.clone(),
    }));
    all
}

/// Perform one OpenAI-compatible chat-completions call with bearer auth
async fn openai_compat_call(
    http_client: &HttpClient,
    provider: &str,
    base_url: &str,
    api_key: &str,
    request: &CompletionRequest,
) -> Result<CompletionResponse> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let response = http_client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(request)
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    if !status.is_success() {
        return Err(api_error(provider, status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| parse_error(provider, status.as_u16(), e, &body))
}

fn completion_content(provider: &str, response: &CompletionResponse) -> Result<String> {
    response
        .choices
        .first()
        .map(|choice| choice.message.content.clone())
        .ok_or_else(|| api_error(provider, 200, "response contained no choices"))
}

/// OpenAI ChatGPT client
pub struct ChatGptClient {
    api_key: String,
    model: String,
    base_url: String,
    http_client: HttpClient,
}

impl ChatGptClient {
    /// Create a new ChatGPT client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(ChatGptClient {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            http_client: build_http_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub(crate) fn request_body(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: openai_compat_messages(messages, system_prompt),
            temperature,
            // Newest OpenAI models reject `max_tokens`
            max_tokens: None,
            max_completion_tokens: Some(max_tokens),
        }
    }
}

#[async_trait::async_trait]
impl Client for ChatGptClient {
    async fn chat(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult> {
        let request = self.request_body(messages, system_prompt, max_tokens, temperature);
        let response =
            openai_compat_call(&self.http_client, "chatgpt", &self.base_url, &self.api_key, &request)
                .await?;

        Ok(ChatResult {
            content: completion_content("chatgpt", &response)?,
            model: response.model.clone(),
            provider: "chatgpt".to_string(),
            usage: response.usage(),
            citations: None,
            finish_reason: None,
        })
    }
}

/// Moonshot (Kimi) client, OpenAI-compatible
pub struct MoonshotClient {
    api_key: String,
    model: String,
    base_url: String,
    http_client: HttpClient,
}

impl MoonshotClient {
    /// Create a new Moonshot client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(MoonshotClient {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            http_client: build_http_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub(crate) fn request_body(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: openai_compat_messages(messages, system_prompt),
            temperature,
            max_tokens: Some(max_tokens),
            max_completion_tokens: None,
        }
    }
}

#[async_trait::async_trait]
impl Client for MoonshotClient {
    async fn chat(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult> {
        let request = self.request_body(messages, system_prompt, max_tokens, temperature);
        let response =
            openai_compat_call(&self.http_client, "moonshot", &self.base_url, &self.api_key, &request)
                .await?;

        Ok(ChatResult {
            content: completion_content("moonshot", &response)?,
            model: response.model.clone(),
            provider: "moonshot".to_string(),
            usage: response.usage(),
            citations: None,
            finish_reason: None,
        })
    }
}

/// Perplexity client, OpenAI-compatible plus citation extraction
pub struct PerplexityClient {
    api_key: String,
    model: String,
    base_url: String,
    http_client: HttpClient,
}

impl PerplexityClient {
    /// Create a new Perplexity client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(PerplexityClient {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            http_client: build_http_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub(crate) fn request_body(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: openai_compat_messages(messages, system_prompt),
            temperature,
            max_tokens: Some(max_tokens),
            max_completion_tokens: None,
        }
    }
}

/// Citations appear at one of three locations depending on the upstream
/// revision: top-level, on the first choice, or on the first choice's
/// message. First non-empty location wins.
pub(crate) fn extract_citations(response: &CompletionResponse) -> Option<Vec<String>> {
    let first_choice = response.choices.first();
    let locations = [
        response.citations.as_ref(),
        first_choice.and_then(|c| c.citations.as_ref()),
        first_choice.and_then(|c| c.message.citations.as_ref()),
    ];
    locations
        .into_iter()
        .flatten()
        .find(|citations| !citations.is_empty())
        .cloned()
}

#[async_trait::async_trait]
impl Client for PerplexityClient {
    async fn chat(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult> {
        let request = self.request_body(messages, system_prompt, max_tokens, temperature);
        let response = openai_compat_call(
            &self.http_client,
            "perplexity",
            &self.base_url,
            &self.api_key,
            &request,
        )
        .await?;

        Ok(ChatResult {
            content: completion_content("perplexity", &response)?,
            model: response.model.clone(),
            provider: "perplexity".to_string(),
            usage: response.usage(),
            citations: extract_citations(&response),
            finish_reason: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Gemini (Google)
// ---------------------------------------------------------------------------

/// Google Gemini client
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http_client: HttpClient,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(GeminiClient {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            http_client: build_http_client(LONG_TIMEOUT)?,
        })
    }

    pub(crate) fn request_body(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> GeminiRequest {
        GeminiRequest {
            contents: build_gemini_contents(messages, system_prompt),
            generation_config: GeminiGenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
            safety_settings: gemini_safety_settings(),
        }
    }
}

/// Build Gemini turns from normalized messages.
///
/// Gemini forbids adjacent same-role turns, so consecutive messages with the
/// same mapped role are merged into one turn. Empty message contents are
/// skipped. A system prompt becomes a leading synthetic user turn; Gemini has
/// a native system field only in newer API revisions and the annotated-turn
/// form works across all of them.
pub(crate) fn build_gemini_contents(
    messages: &[Message],
    system_prompt: Option<&str>,
) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();

    if let Some(system) = system_prompt {
        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: format!("[System Instruction]\n{}\n\n[User Message]", system),
            }],
        });
    }

    for message in messages {
        let role = match message.role {
            MessageRole::Assistant => "model",
            MessageRole::User => "user",
        };

        if message.content.is_empty() {
            continue;
        }

        match contents.last_mut() {
            Some(last) if last.role == role => {
                let part = last.parts.first_mut().expect("gemini turn has a part");
                part.text.push_str("\n\n");
                part.text.push_str(&message.content);
            }
            _ => contents.push(GeminiContent {
                role: role.to_string(),
                parts: vec![GeminiPart {
                    text: message.content.clone(),
                }],
            }),
        }
    }

    contents
}

fn gemini_safety_settings() -> Vec<GeminiSafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .iter()
    .map(|category| GeminiSafetySetting {
        category: category.to_string(),
        threshold: "OFF".to_string(),
    })
    .collect()
}

/// Extract response text from a Gemini response.
///
/// Walks the first candidate's parts and joins their text with newlines.
/// When no usable text exists the result is a bracketed placeholder derived
/// from the finish reason; extraction never fails the call.
pub(crate) fn extract_gemini_content(response: &GeminiResponse) -> String {
    let Some(candidate) = response.candidates.first() else {
        return "[No content returned]".to_string();
    };

    let parts_text: Vec<&str> = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter(|part| !part.text.is_empty())
        .map(|part| part.text.as_str())
        .collect();

    if parts_text.is_empty() {
        let finish_reason = candidate.finish_reason.as_deref().unwrap_or("UNKNOWN");
        format!("[Empty response: {}]", finish_reason)
    } else {
        parts_text.join("\n")
    }
}

#[async_trait::async_trait]
impl Client for GeminiClient {
    async fn chat(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let request = self.request_body(messages, system_prompt, max_tokens, temperature);

        tracing::debug!(model = %self.model, turns = request.contents.len(), "calling Gemini");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", self.api_key.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("gemini", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("gemini", e))?;

        if !status.is_success() {
            return Err(api_error("gemini", status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| parse_error("gemini", status.as_u16(), e, &body))?;

        let content = extract_gemini_content(&parsed);
        let finish_reason = parsed
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let usage = parsed
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(ChatResult {
            content,
            model: self.model.clone(),
            provider: "gemini".to_string(),
            usage,
            citations: None,
            finish_reason: Some(finish_reason),
        })
    }
}

// Claude wire types

#[derive(Debug, Serialize)]
pub(crate) struct ClaudeMessageRequest {
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f32,
    pub(crate) messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeMessageResponse {
    content: Vec<ClaudeContentBlock>,
    model: String,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// OpenAI-compatible wire types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub(crate) role: String,
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<WireMessage>,
    pub(crate) temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    pub(crate) choices: Vec<CompletionChoice>,
    pub(crate) model: String,
    #[serde(default)]
    pub(crate) usage: Option<CompletionUsage>,
    #[serde(default)]
    pub(crate) citations: Option<Vec<String>>,
}

impl CompletionResponse {
    /// Normalized usage; missing fields default to zero
    fn usage(&self) -> Usage {
        self.usage
            .as_ref()
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChoice {
    pub(crate) message: CompletionMessage,
    #[serde(default)]
    pub(crate) citations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionMessage {
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) citations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionUsage {
    #[serde(default)]
    pub(crate) prompt_tokens: u32,
    #[serde(default)]
    pub(crate) completion_tokens: u32,
}

// Gemini wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    pub(crate) contents: Vec<GeminiContent>,
    pub(crate) generation_config: GeminiGenerationConfig,
    pub(crate) safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    pub(crate) role: String,
    pub(crate) parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default)]
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiGenerationConfig {
    pub(crate) temperature: f32,
    pub(crate) max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiSafetySetting {
    pub(crate) category: String,
    pub(crate) threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub(crate) usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiUsageMetadata {
    #[serde(default)]
    pub(crate) prompt_token_count: u32,
    #[serde(default)]
    pub(crate) candidates_token_count: u32,
}
