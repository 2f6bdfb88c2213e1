use serde::{Deserialize, Serialize};

use pocketchat_types::ChatError;

use crate::facade::AgentReply;

/// A named system-prompt variant used to obtain a specialized perspective
/// on the same user question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub prompt: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}

/// One persona's answer from a fan-out, successful or not. Failures are
/// tagged with the persona identity so they can be surfaced individually.
#[derive(Debug, Clone)]
pub struct PersonaReply {
    pub persona: String,
    pub result: Result<AgentReply, ChatError>,
}

impl PersonaReply {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
