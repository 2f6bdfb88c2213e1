use serde::Serialize;
use tokio::sync::watch;

use pocketchat_api::decode_reply;
use pocketchat_types::{Role, Turn};

/// Per-conversation request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    AwaitingReply,
    AwaitingSummary,
}

/// One rendered message-list entry. Assistant turns are decoded from their
/// canonical JSON payload; an undecodable payload falls back to raw text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTurn {
    pub role: Role,
    pub text: String,
}

/// Snapshot consumed by view layers: rendered message list plus the
/// loading/error flags. The core never depends on a UI framework; it only
/// emits these snapshots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatViewState {
    pub turns: Vec<DisplayTurn>,
    pub phase: SessionPhase,
    pub busy: bool,
    pub last_error: Option<String>,
    pub total_tokens: u64,
}

/// Single-writer observable state container. The session driver is the only
/// writer; any number of views subscribe for snapshots.
pub struct StateStore {
    tx: watch::Sender<ChatViewState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ChatViewState::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatViewState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ChatViewState {
        self.tx.borrow().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut ChatViewState)) {
        self.tx.send_modify(f);
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Project history into the display message list. System turns (the fixed
/// prompt, the summary) are context plumbing and are not rendered.
pub fn project(turns: &[Turn]) -> Vec<DisplayTurn> {
    turns
        .iter()
        .filter(|t| t.role != Role::System)
        .map(|t| DisplayTurn {
            role: t.role,
            text: display_text(t),
        })
        .collect()
}

fn display_text(turn: &Turn) -> String {
    if turn.role == Role::Assistant {
        match decode_reply(&turn.content) {
            Ok(reply) => reply.agent_message,
            Err(_) => turn.content.clone(),
        }
    } else {
        turn.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketchat_types::SUMMARY_PREFIX;

    #[test]
    fn test_projection_decodes_assistant_and_skips_system() {
        let turns = vec![
            Turn::system(format!("{SUMMARY_PREFIX}earlier stuff")),
            Turn::user("hi"),
            Turn::assistant(r#"{"agentMessage":"hello there"}"#),
        ];
        let view = project(&turns);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].text, "hi");
        assert_eq!(view[1].text, "hello there");
    }

    #[test]
    fn test_projection_falls_back_to_raw_text() {
        let turns = vec![Turn::assistant("plain text, not json")];
        let view = project(&turns);
        assert_eq!(view[0].text, "plain text, not json");
    }

    #[test]
    fn test_store_notifies_subscribers() {
        let store = StateStore::new();
        let rx = store.subscribe();
        store.update(|s| {
            s.busy = true;
            s.phase = SessionPhase::AwaitingReply;
        });
        let state = rx.borrow();
        assert!(state.busy);
        assert_eq!(state.phase, SessionPhase::AwaitingReply);
    }
}
