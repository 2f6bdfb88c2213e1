//! Agent facade for pocketchat
//!
//! Validated ask operations over an injected `ChatTransport`: single-turn
//! and with-history paths, per-call temperature overrides, persona
//! consultations with sequential fan-out, and synthesis of persona replies.

mod facade;
mod outcome;
mod persona;

pub use facade::{
    AgentFacade, AgentReply, SpreadReply, CANONICAL_SPREAD_TEMPERATURE, DEFAULT_SYSTEM_PROMPT,
    SPREAD_TEMPERATURES, SYNTHESIS_PROMPT,
};
pub use outcome::AskOutcome;
pub use persona::{Persona, PersonaReply};
