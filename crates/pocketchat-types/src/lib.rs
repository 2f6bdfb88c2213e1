//! Core types and structures for pocketchat
//!
//! This crate provides the foundational types used across all pocketchat crates.

use serde::{Deserialize, Serialize};

mod error;

pub use error::ChatError;

// ============================================================================
// Constants
// ============================================================================

/// Default model requested from the chat-completion endpoint
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default base URL for the OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion token cap per request
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default number of user/assistant exchanges between compactions
pub const DEFAULT_COMPACT_THRESHOLD: u32 = 10;

/// Prefix carried by the synthesized summary turn. A system turn starting
/// with this prefix is recognized as the live summary when a conversation
/// is rehydrated from the message log.
pub const SUMMARY_PREFIX: &str = "summary of prior conversation: ";

// ============================================================================
// Turns
// ============================================================================

/// Role of a single conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One logical message in a conversation. Turns are immutable once created
/// and form an append-only ordered sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Whether this turn is the live summary of compacted history.
    pub fn is_summary(&self) -> bool {
        self.role == Role::System && self.content.starts_with(SUMMARY_PREFIX)
    }
}

// ============================================================================
// Structured replies
// ============================================================================

/// The model's output decoded against the fixed single-field JSON schema.
///
/// Earlier experimental schemas carried several fields (question, summary,
/// explanation, sources, confidence); they were deprecated in favor of this
/// single field plus the transport-level usage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredReply {
    #[serde(rename = "agentMessage")]
    pub agent_message: String,
}

impl StructuredReply {
    pub fn new(agent_message: impl Into<String>) -> Self {
        Self {
            agent_message: agent_message.into(),
        }
    }

    /// Canonical serialization stored as assistant turn content.
    pub fn to_canonical_json(&self) -> String {
        // A single-string-field struct cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Capability interface for platform-specific API key retrieval.
/// Implementations are selected at composition time.
pub trait ApiKeyProvider: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Explicit configuration value object passed into the agent facade at
/// construction. Assembled once at startup; no shared mutable globals.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub compact_threshold: u32,
}

impl ChatConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Single initialization check, run before first use.
    pub fn validate(&self) -> Result<(), ChatError> {
        if !self.is_configured() {
            return Err(ChatError::NotConfigured);
        }
        if self.compact_threshold == 0 {
            return Err(ChatError::InvalidArgument(
                "compact_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
