use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use pocketchat_types::Turn;

/// Append-only message log backing a conversation. The core treats this as
/// durable but depends only on append-then-read-back consistency.
pub trait MessageLog: Send {
    fn insert(&mut self, turn: &Turn) -> Result<()>;
    fn get_all(&self) -> Result<Vec<Turn>>;
    fn delete_all(&mut self) -> Result<()>;
}

/// In-memory log for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryLog {
    turns: Vec<Turn>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl MessageLog for MemoryLog {
    fn insert(&mut self, turn: &Turn) -> Result<()> {
        self.turns.push(turn.clone());
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Turn>> {
        Ok(self.turns.clone())
    }

    fn delete_all(&mut self) -> Result<()> {
        self.turns.clear();
        Ok(())
    }
}

/// Durable log: one JSON turn per line, appended in arrival order.
#[derive(Debug)]
pub struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageLog for JsonlLog {
    fn insert(&mut self, turn: &Turn) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log dir {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open message log {}", self.path.display()))?;
        let json = serde_json::to_string(turn).context("failed to serialize turn")?;
        writeln!(file, "{}", json)
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Turn>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read message log {}", self.path.display()))?;
        let mut turns = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let turn: Turn = serde_json::from_str(line)
                .with_context(|| format!("corrupt log line in {}", self.path.display()))?;
            turns.push(turn);
        }
        Ok(turns)
    }

    fn delete_all(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to delete {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_round_trip() {
        let mut log = MemoryLog::new();
        log.insert(&Turn::user("hi")).unwrap();
        log.insert(&Turn::assistant(r#"{"agentMessage":"hello"}"#)).unwrap();
        assert_eq!(log.get_all().unwrap().len(), 2);

        log.delete_all().unwrap();
        assert!(log.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_log_round_trip() {
        let dir = std::env::temp_dir().join(format!("pocketchat-jsonl-test-{}", std::process::id()));
        let mut log = JsonlLog::new(dir.join("history.jsonl"));

        // Missing file reads back as empty, not as an error
        assert!(log.get_all().unwrap().is_empty());

        log.insert(&Turn::user("A")).unwrap();
        log.insert(&Turn::assistant(r#"{"agentMessage":"a"}"#)).unwrap();
        let turns = log.get_all().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::user("A"));

        log.delete_all().unwrap();
        assert!(log.get_all().unwrap().is_empty());

        let _ = fs::remove_dir_all(&dir);
    }
}
