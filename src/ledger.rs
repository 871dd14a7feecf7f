use crate::conversation::Conversation;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub date: String,
    pub total_character_count: usize,
    pub conversation_id: String,
}

/// Append-only JSON-lines log of conversations already turned into videos.
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Ledger { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record, skipping lines that do not parse.
    pub fn records(&self) -> anyhow::Result<Vec<LedgerRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read ledger {}", self.path.display()))?;

        let mut records = Vec::new();
        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping ledger line {}: {}", i + 1, e),
            }
        }
        Ok(records)
    }

    pub fn is_used(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.records()?.iter().any(|r| r.conversation_id == id))
    }

    pub fn record(&self, conversation: &Conversation) -> anyhow::Result<()> {
        let record = LedgerRecord {
            date: chrono::Local::now().date_naive().to_string(),
            total_character_count: conversation.total_chars(),
            conversation_id: conversation.id.to_string(),
        };
        self.append(&record)
    }

    fn append(&self, record: &LedgerRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger {}", self.path.display()))?;
        writeln!(f, "{}", serde_json::to_string(record)?)?;
        debug!("Recorded conversation {} in ledger", record.conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::parse_dialogue;

    fn sample() -> Conversation {
        Conversation::new(parse_dialogue("A: Coucou!\nB: Comment vas-tu?", 11).turns)
    }

    #[test]
    fn missing_ledger_has_nothing_used() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("used.jsonl"));
        assert!(!ledger.is_used("42").unwrap());
        assert!(ledger.records().unwrap().is_empty());
    }

    #[test]
    fn recorded_conversation_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("config").join("used.jsonl"));
        let conv = sample();

        assert!(!ledger.is_used(&conv.id.to_string()).unwrap());
        ledger.record(&conv).unwrap();
        assert!(ledger.is_used(&conv.id.to_string()).unwrap());

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_character_count, 22);
    }

    #[test]
    fn records_are_camel_case_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("used.jsonl"));
        ledger.record(&sample()).unwrap();
        ledger.record(&sample()).unwrap();

        let raw = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert!(first.get("totalCharacterCount").is_some());
        assert!(first.get("conversationId").is_some());
        assert!(first.get("date").is_some());
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.jsonl");
        fs::write(
            &path,
            "garbage\n{\"date\":\"2024-03-01\",\"totalCharacterCount\":12,\"conversationId\":\"7\"}\n\n",
        )
        .unwrap();
        let ledger = Ledger::new(&path);
        assert!(ledger.is_used("7").unwrap());
        assert!(!ledger.is_used("8").unwrap());
    }
}
