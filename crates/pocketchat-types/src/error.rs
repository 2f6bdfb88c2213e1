use thiserror::Error;

/// Classified chat error — tells the caller *why* a call failed so it can
/// pick the right recovery strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Local validation failure (blank question, empty history, empty
    /// persona digest). Never reaches the network and never touches history.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No API key available. Fatal to the turn, not to the process.
    #[error("chat endpoint is not configured: missing API key")]
    NotConfigured,

    /// The HTTP round trip exceeded the client timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection refused, DNS failure, reset, etc.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response from the provider, with its message when the error
    /// body was parseable.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The completion text was not valid JSON or lacked the required field.
    /// Distinct from transport errors: "the model said something we can't
    /// parse" is not "the network failed".
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ChatError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ChatError::InvalidArgument(msg.into())
    }

    /// True for failures the caller may retry with the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Timeout | ChatError::Network(_) => true,
            ChatError::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Short summary suitable for rendering in the message list.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::InvalidArgument(msg) => msg.clone(),
            ChatError::NotConfigured => {
                "No API key configured. Set POCKETCHAT_API_KEY and restart.".to_string()
            }
            ChatError::Timeout => "The request timed out. Please try again.".to_string(),
            ChatError::Network(_) => "Cannot reach the chat endpoint (network error).".to_string(),
            ChatError::Api { status, message } => format!("Provider error ({status}): {message}"),
            ChatError::MalformedResponse(_) => {
                "The model returned something we could not parse.".to_string()
            }
        }
    }
}
