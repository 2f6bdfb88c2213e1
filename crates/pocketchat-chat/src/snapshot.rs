use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use pocketchat_types::Turn;

use crate::context::ConversationContext;

/// Serializable snapshot of one conversation for saving/loading across runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub summary: Option<Turn>,
    pub turns: Vec<Turn>,
    pub exchanges_since_compaction: u32,
    pub total_tokens: u64,
    pub version: String,
}

impl SessionSnapshot {
    pub fn capture(context: &ConversationContext, total_tokens: u64) -> Self {
        Self {
            summary: context.summary_turn().cloned(),
            turns: context.unsummarized().to_vec(),
            exchanges_since_compaction: context.exchanges_since_compaction(),
            total_tokens,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Rebuild a context from this snapshot. The summary turn (when present)
    /// leads, so rehydration recognizes it the same way it does from the log.
    pub fn into_context(self, compact_threshold: u32) -> ConversationContext {
        let mut all = Vec::with_capacity(self.turns.len() + 1);
        if let Some(summary) = self.summary {
            all.push(summary);
        }
        all.extend(self.turns);
        ConversationContext::rehydrate(all, compact_threshold)
    }

    /// Full ordered turn list as it would appear in the message log.
    pub fn log_turns(&self) -> Vec<Turn> {
        let mut all = Vec::with_capacity(self.turns.len() + 1);
        if let Some(summary) = &self.summary {
            all.push(summary.clone());
        }
        all.extend(self.turns.iter().cloned());
        all
    }

    pub fn save(&self, path: &Path) -> Result<String> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        Ok(format!(
            "Saved conversation to {} ({} turns, {} total tokens)",
            path.display(),
            self.turns.len(),
            self.total_tokens
        ))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
        serde_json::from_str(&json).context("failed to deserialize snapshot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_round_trip() {
        let mut ctx = ConversationContext::new(5);
        ctx.append_user_turn("A").unwrap();
        ctx.on_success("a");
        ctx.apply_summary("covered A", 2);
        ctx.append_user_turn("B").unwrap();
        ctx.on_success("b");

        let dir = std::env::temp_dir();
        let path = dir.join(format!("pocketchat-snapshot-test-{}.json", std::process::id()));

        let snapshot = SessionSnapshot::capture(&ctx, 42);
        snapshot.save(&path).unwrap();

        let restored = SessionSnapshot::load(&path).unwrap();
        assert_eq!(restored.total_tokens, 42);
        let restored_ctx = restored.into_context(5);
        assert_eq!(restored_ctx.summary_turn(), ctx.summary_turn());
        assert_eq!(restored_ctx.unsummarized(), ctx.unsummarized());
        assert_eq!(
            restored_ctx.exchanges_since_compaction(),
            ctx.exchanges_since_compaction()
        );

        let _ = fs::remove_file(&path);
    }
}
