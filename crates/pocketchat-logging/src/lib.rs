//! Logging for pocketchat
//!
//! JSONL conversation logs plus per-request dump files for persistent
//! debugging of outbound API calls.

mod conversation_logger;
mod request_logger;

pub use conversation_logger::ConversationLogger;
pub use request_logger::log_request_to_file;
