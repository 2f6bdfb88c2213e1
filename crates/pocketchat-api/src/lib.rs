//! LLM API transport for pocketchat
//!
//! This crate provides the OpenAI-compatible chat-completion wire types,
//! the `ChatTransport` seam, the reqwest-backed client, and the
//! structured-reply parser.

mod reply;
mod transport;
mod wire;

pub use reply::decode_reply;
pub use transport::{normalize_api_url, ChatTransport, Completion, HttpChatTransport};
pub use wire::{ChatRequest, ChatResponse, Choice, TokenUsage, WireMessage};
