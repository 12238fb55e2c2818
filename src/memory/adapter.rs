//! Failure-swallowing persistence glue.
//!
//! The adapter is the only place the engine touches storage. A missing or
//! failing backend degrades to sentinels (`None` / empty map) and a warn
//! event; it never blocks or fails cycle progress.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cycle::Cycle;
use crate::phase::Phase;

use super::store::MemoryStore;

pub struct MemoryAdapter {
    store: Option<Box<dyn MemoryStore>>,
}

impl MemoryAdapter {
    /// Adapter over a concrete backend.
    pub fn new(store: Box<dyn MemoryStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Adapter with no backend at all; every store is a silent no-op.
    pub fn disconnected() -> Self {
        Self { store: None }
    }

    pub fn has_backend(&self) -> bool {
        self.store.is_some()
    }

    /// Store a payload, returning the backend handle on success.
    ///
    /// `None` means no backend was configured or the backend failed; the
    /// caller continues either way. A successful store also flushes pending
    /// writes, with flush failures swallowed the same way.
    pub fn safe_store(&mut self, payload: &Value, kind: &str, phase: Phase) -> Option<String> {
        let store = self.store.as_mut()?;
        match store.store_with_phase_tag(payload, kind, phase) {
            Ok(handle) => {
                if let Err(e) = store.flush_pending_writes() {
                    warn!(kind, phase = %phase, error = %e, "flush after store failed");
                }
                Some(handle)
            }
            Err(e) => {
                warn!(kind, phase = %phase, error = %e, "store failed; continuing without persistence");
                None
            }
        }
    }

    /// Retrieve and normalize a backend result.
    ///
    /// A list becomes `{"items": [...]}`, an object passes through, and
    /// anything else (scalar, null, error, no backend) becomes an empty
    /// map. Callers only ever branch on "has items" / "is empty".
    pub fn safe_retrieve(&self, query: &str, phase: Phase) -> Map<String, Value> {
        let Some(store) = self.store.as_ref() else {
            return Map::new();
        };
        match store.retrieve_with_phase_tag(query, phase) {
            Ok(Value::Array(items)) => {
                let mut map = Map::new();
                map.insert("items".to_string(), Value::Array(items));
                map
            }
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                warn!(query, phase = %phase, error = %e, "retrieve failed; returning empty result");
                Map::new()
            }
        }
    }

    /// Persist a deep copy of the cycle's context, merged over any prior
    /// snapshot stored for the same cycle. No-op when the context is empty.
    pub fn persist_context_snapshot(&mut self, cycle: &Cycle) -> Option<String> {
        if cycle.context.is_empty() {
            return None;
        }
        let phase = cycle.current_phase().unwrap_or(Phase::Expand);
        let kind = Self::snapshot_kind(cycle);

        // Union of all earlier results: snapshots from every phase tag in
        // order, current context layered on top.
        let mut merged = self.load_context_snapshot(cycle);
        for (key, value) in cycle.context.clone() {
            merged.insert(key, value);
        }

        let snapshot = Value::Object(merged);
        let handle = self.safe_store(&snapshot, &kind, phase);
        if handle.is_some() {
            debug!(cycle_id = %cycle.cycle_id, phase = %phase, "context snapshot persisted");
        }
        handle
    }

    /// Load the union of persisted snapshots for a cycle across all phase
    /// tags, in phase order. Empty when nothing was stored.
    pub fn load_context_snapshot(&self, cycle: &Cycle) -> Map<String, Value> {
        let kind = Self::snapshot_kind(cycle);
        let mut merged = Map::new();
        for phase in Phase::ALL {
            let mut stored = self.safe_retrieve(&kind, phase);
            stored.remove("items");
            for (key, value) in stored {
                merged.insert(key, value);
            }
        }
        merged
    }

    fn snapshot_kind(cycle: &Cycle) -> String {
        format!("context:{}", cycle.cycle_id)
    }
}
