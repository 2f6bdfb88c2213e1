use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use pocketchat_logging::log_request_to_file;
use pocketchat_types::ChatError;

use crate::wire::{ChatRequest, ChatResponse, ErrorEnvelope, TokenUsage};

/// Request timeout for the chat-completion round trip
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The assistant text and usage metadata extracted from one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Unified transport seam for the chat-completion endpoint. The agent
/// facade only ever talks to this trait, so tests swap in scripted stubs.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<Completion, ChatError>;
}

/// Normalize an API URL by ensuring it carries the OpenAI-compatible
/// completions path.
pub fn normalize_api_url(url: &str) -> String {
    // Only the path decides whether the URL is already complete; a host
    // like chat.example.com must not suppress normalization.
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = after_scheme.find('/').map_or("", |i| &after_scheme[i..]);
    if path.contains("/completions") || path.contains("/chat") {
        return url.to_string();
    }

    if url.ends_with('/') {
        format!("{}v1/chat/completions", url)
    } else {
        format!("{}/v1/chat/completions", url)
    }
}

/// reqwest-backed transport speaking the OpenAI-compatible wire format.
pub struct HttpChatTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    /// When set, every outbound request body is dumped here with the key
    /// redacted (persistent debugging).
    request_log_dir: Option<PathBuf>,
}

impl HttpChatTransport {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::NotConfigured);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: normalize_api_url(base_url),
            api_key,
            request_log_dir: None,
        })
    }

    pub fn with_request_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.request_log_dir = Some(dir.into());
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn complete(&self, request: ChatRequest) -> Result<Completion, ChatError> {
        if let Some(dir) = &self.request_log_dir {
            if let Ok(body) = serde_json::to_value(&request) {
                let _ = log_request_to_file(dir, &self.api_url, &request.model, &self.api_key, &body);
            }
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_request_error)?;

        if !status.is_success() {
            return Err(api_error_from_body(status.as_u16(), &text));
        }

        let chat_response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ChatError::MalformedResponse(format!("invalid completion body: {e}")))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::MalformedResponse("no choices in response".to_string()))?;

        Ok(Completion {
            content: choice.message.content,
            usage: chat_response.usage,
        })
    }
}

fn classify_request_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Network(err.to_string())
    }
}

/// Map a non-2xx response to `ChatError::Api`. An unparseable error body
/// still yields a generic status-derived message.
fn api_error_from_body(status: u16, body: &str) -> ChatError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ChatError::Api {
            status,
            message: envelope.error.message,
        },
        Err(_) => ChatError::Api {
            status,
            message: format!("HTTP status {status}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_api_url() {
        assert_eq!(
            normalize_api_url("https://api.openai.com"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            normalize_api_url("http://localhost:8080/"),
            "http://localhost:8080/v1/chat/completions"
        );
        // Already-complete URLs pass through untouched
        assert_eq!(
            normalize_api_url("https://api.groq.com/openai/v1/chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        // "/chat" in the host must not count as a completions path
        assert_eq!(
            normalize_api_url("https://chat.example.com"),
            "https://chat.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_api_error_with_parseable_body() {
        let err = api_error_from_body(429, r#"{"error": {"message": "slow down"}}"#);
        assert_eq!(
            err,
            ChatError::Api {
                status: 429,
                message: "slow down".to_string()
            }
        );
    }

    #[test]
    fn test_api_error_with_garbage_body() {
        let err = api_error_from_body(502, "<html>Bad Gateway</html>");
        assert_eq!(
            err,
            ChatError::Api {
                status: 502,
                message: "HTTP status 502".to_string()
            }
        );
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let result = HttpChatTransport::new("https://api.openai.com", "  ".to_string());
        assert!(matches!(result, Err(ChatError::NotConfigured)));
    }
}
