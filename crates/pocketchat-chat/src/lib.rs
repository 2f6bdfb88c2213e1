//! Conversation management for pocketchat
//!
//! This crate provides the rolling conversation context, the compaction
//! policy that keeps multi-turn context bounded, failure rollback, the
//! append-only message log seam, and the session driver that ties the
//! agent facade to an observable view state.

pub mod context;
pub mod log;
pub mod session;
pub mod snapshot;
pub mod store;

pub use context::{ConversationContext, SUMMARIZER_PROMPT, SUMMARIZE_INSTRUCTION};
pub use log::{JsonlLog, MemoryLog, MessageLog};
pub use session::{ChatSession, ConsultOutcome, SendOutcome, SpreadOutcome};
pub use snapshot::SessionSnapshot;
pub use store::{ChatViewState, DisplayTurn, SessionPhase, StateStore};
