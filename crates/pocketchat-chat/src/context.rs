use pocketchat_types::{ChatError, Role, StructuredReply, Turn, SUMMARY_PREFIX};

/// System instruction for the summarization request. Same reply schema as a
/// normal turn so it can travel through the same request path.
pub const SUMMARIZER_PROMPT: &str = "You condense chat history for a mobile assistant. \
    Always reply with a single JSON object of the form {\"agentMessage\": \"<summary>\"} \
    and nothing else.";

/// Fixed instruction turn appended to the summarization request.
pub const SUMMARIZE_INSTRUCTION: &str = "Produce a single updated summary of the \
    conversation above in 2-3 concise sentences, merging the previous summary if one \
    is present. Focus on key context, decisions, and open questions.";

/// Owns the rolling message history for one conversation: the unsummarized
/// turns since the last compaction, the optional live summary turn, and the
/// exchange counter that triggers the next compaction.
///
/// Single-writer: only the session driver mutates this, under one lock.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    summary: Option<Turn>,
    unsummarized: Vec<Turn>,
    exchanges_since_compaction: u32,
    compact_threshold: u32,
}

impl ConversationContext {
    pub fn new(compact_threshold: u32) -> Self {
        Self {
            summary: None,
            unsummarized: Vec::new(),
            exchanges_since_compaction: 0,
            compact_threshold,
        }
    }

    /// Rebuild a context from the append-only message log. A leading system
    /// turn carrying the summary prefix is the live summary; everything
    /// after it is unsummarized history. The exchange counter is recovered
    /// from the number of assistant turns since the summary.
    pub fn rehydrate(turns: Vec<Turn>, compact_threshold: u32) -> Self {
        let mut iter = turns.into_iter().peekable();
        let summary = match iter.peek() {
            Some(turn) if turn.is_summary() => iter.next(),
            _ => None,
        };
        let unsummarized: Vec<Turn> = iter.collect();
        let exchanges_since_compaction = unsummarized
            .iter()
            .filter(|t| t.role == Role::Assistant)
            .count() as u32;
        Self {
            summary,
            unsummarized,
            exchanges_since_compaction,
            compact_threshold,
        }
    }

    pub fn summary_turn(&self) -> Option<&Turn> {
        self.summary.as_ref()
    }

    pub fn unsummarized(&self) -> &[Turn] {
        &self.unsummarized
    }

    pub fn exchanges_since_compaction(&self) -> u32 {
        self.exchanges_since_compaction
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.unsummarized.is_empty()
    }

    /// Append a user turn. Blank input is rejected before it can touch
    /// history; no network call happens here.
    pub fn append_user_turn(&mut self, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::invalid_argument("message must not be blank"));
        }
        self.unsummarized.push(Turn::user(text));
        Ok(())
    }

    /// The outbound message list: the live summary turn (when present)
    /// followed by exactly the unsummarized turns, in append order. Pure;
    /// calling it twice without intervening mutation yields identical output.
    pub fn compose_outbound(&self) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.unsummarized.len() + 1);
        if let Some(summary) = &self.summary {
            turns.push(summary.clone());
        }
        turns.extend(self.unsummarized.iter().cloned());
        turns
    }

    /// Record a successful reply: append the assistant turn (canonical
    /// single-field JSON) and bump the exchange counter. Returns true when
    /// the counter has reached the compaction threshold.
    pub fn on_success(&mut self, reply_text: &str) -> bool {
        let content = StructuredReply::new(reply_text).to_canonical_json();
        self.unsummarized.push(Turn::assistant(content));
        self.exchanges_since_compaction += 1;
        self.exchanges_since_compaction >= self.compact_threshold
    }

    /// Roll back the most recently appended user turn after a failed round,
    /// so no dangling unanswered user turn corrupts role alternation on the
    /// next call. Exact: removes one turn or nothing.
    pub fn on_failure(&mut self) {
        if self.unsummarized.last().map(|t| t.role) == Some(Role::User) {
            self.unsummarized.pop();
        }
    }

    /// Build the summarization request: existing summary (if any), all
    /// unsummarized turns, and the fixed instruction turn. Returns `None`
    /// when there is nothing to summarize — compaction of an empty set is
    /// a no-op.
    pub fn build_compaction_request(&self) -> Option<Vec<Turn>> {
        if self.unsummarized.is_empty() {
            return None;
        }
        let mut turns = self.compose_outbound();
        turns.push(Turn::user(SUMMARIZE_INSTRUCTION));
        Some(turns)
    }

    /// Install a fresh summary covering the first `summarized_len`
    /// unsummarized turns, then reset the counter. Turns appended after the
    /// summarization request was composed survive untouched.
    pub fn apply_summary(&mut self, summary_text: &str, summarized_len: usize) {
        self.summary = Some(Turn::system(format!("{SUMMARY_PREFIX}{summary_text}")));
        let keep = self.unsummarized.split_off(summarized_len.min(self.unsummarized.len()));
        self.unsummarized = keep;
        self.exchanges_since_compaction = 0;
    }

    /// Reset to an empty conversation: no history, no summary, counter at 0.
    pub fn clear(&mut self) {
        self.summary = None;
        self.unsummarized.clear();
        self.exchanges_since_compaction = 0;
    }
}
