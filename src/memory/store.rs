//! Storage backends behind the memory adapter.
//!
//! The engine only consumes the narrow `MemoryStore` contract; what sits
//! behind it (key-value, vector, graph) is not this crate's concern. Two
//! concrete stores ship here: an in-memory map for embedding and tests, and
//! a directory of JSON files for simple durable runs.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::phase::Phase;

/// Narrow storage contract consumed by the memory adapter.
///
/// Implementations may fail freely; the adapter converts every failure to a
/// sentinel and the cycle continues.
pub trait MemoryStore {
    /// Store a payload under a kind tag and phase; returns a handle.
    fn store_with_phase_tag(&mut self, payload: &Value, kind: &str, phase: Phase)
    -> Result<String>;

    /// Retrieve whatever the backend associates with the query and phase.
    /// The shape is backend-defined: list, object, scalar, or null.
    fn retrieve_with_phase_tag(&self, query: &str, phase: Phase) -> Result<Value>;

    /// Flush buffered writes, if the backend buffers at all.
    fn flush_pending_writes(&mut self) -> Result<()>;
}

/// A stored record with its tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub kind: String,
    pub phase: Phase,
    pub payload: Value,
}

fn record_key(kind: &str, phase: Phase) -> String {
    format!("{kind}:{phase}")
}

/// Map-backed store with a pending-writes buffer drained by flush.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    committed: HashMap<String, StoredRecord>,
    pending: Vec<(String, StoredRecord)>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed records (pending writes excluded).
    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl MemoryStore for InMemoryStore {
    fn store_with_phase_tag(
        &mut self,
        payload: &Value,
        kind: &str,
        phase: Phase,
    ) -> Result<String> {
        let key = record_key(kind, phase);
        self.pending.push((
            key.clone(),
            StoredRecord {
                kind: kind.to_string(),
                phase,
                payload: payload.clone(),
            },
        ));
        Ok(key)
    }

    fn retrieve_with_phase_tag(&self, query: &str, phase: Phase) -> Result<Value> {
        // Pending writes are visible to reads; the buffer only defers
        // commit bookkeeping, not visibility.
        let key = record_key(query, phase);
        if let Some((_, record)) = self.pending.iter().rev().find(|(k, _)| *k == key) {
            return Ok(record.payload.clone());
        }
        Ok(self
            .committed
            .get(&key)
            .map(|r| r.payload.clone())
            .unwrap_or(Value::Null))
    }

    fn flush_pending_writes(&mut self) -> Result<()> {
        for (key, record) in self.pending.drain(..) {
            self.committed.insert(key, record);
        }
        Ok(())
    }
}

/// One JSON file per record under a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn record_path(&self, kind: &str, phase: Phase) -> PathBuf {
        // Kind tags may carry separators (e.g. "context:<uuid>"); keep the
        // filename flat.
        let safe_kind = kind.replace(['/', ':'], "_");
        self.dir.join(format!("{safe_kind}__{phase}.json"))
    }
}

impl MemoryStore for JsonFileStore {
    fn store_with_phase_tag(
        &mut self,
        payload: &Value,
        kind: &str,
        phase: Phase,
    ) -> Result<String> {
        let record = StoredRecord {
            kind: kind.to_string(),
            phase,
            payload: payload.clone(),
        };
        let path = self.record_path(kind, phase);
        let json = serde_json::to_string_pretty(&record).context("Failed to serialize record")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write record file: {}", path.display()))?;
        Ok(path.display().to_string())
    }

    fn retrieve_with_phase_tag(&self, query: &str, phase: Phase) -> Result<Value> {
        let path = self.record_path(query, phase);
        if !path.exists() {
            return Ok(Value::Null);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read record file: {}", path.display()))?;
        let record: StoredRecord =
            serde_json::from_str(&content).context("Failed to parse record file")?;
        Ok(record.payload)
    }

    fn flush_pending_writes(&mut self) -> Result<()> {
        // Writes go straight to disk; nothing buffered.
        Ok(())
    }
}

/// Store that fails every call. Exercises the adapter's resilience paths.
#[derive(Debug, Default)]
pub struct FailingStore;

impl MemoryStore for FailingStore {
    fn store_with_phase_tag(&mut self, _: &Value, _: &str, _: Phase) -> Result<String> {
        bail!("storage backend unavailable")
    }

    fn retrieve_with_phase_tag(&self, _: &str, _: Phase) -> Result<Value> {
        bail!("storage backend unavailable")
    }

    fn flush_pending_writes(&mut self) -> Result<()> {
        bail!("storage backend unavailable")
    }
}
