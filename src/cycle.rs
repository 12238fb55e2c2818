//! Cycle and task records.
//!
//! A `Cycle` is one instance of the EDRR state machine, root or nested. It
//! is mutated in place by the phase manager and the recursion manager, and
//! never deleted: retrospective and audit consumers read it after it reaches
//! Retrospect or after the caller aborts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::phase::{Phase, PhaseResult};

/// The unit of work a cycle is asked to solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    /// Free-form metadata carried into the team's elaboration calls.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One instance of the EDRR state machine.
///
/// `current_phase`, `child_cycles` and the manual override are private:
/// phase movement belongs to the phase manager and recursion-tree growth to
/// the micro-cycle manager. Everything else is plain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub cycle_id: Uuid,
    /// 0 for root cycles; strictly parent depth + 1 for micro-cycles.
    pub depth: u32,
    /// Id back-reference only; the child never owns the parent's lifetime.
    pub parent_cycle_id: Option<Uuid>,
    pub task: Task,
    pub created_at: DateTime<Utc>,
    /// Lead/worker map rebuilt on every phase entry; exactly one "primus".
    pub role_assignments: HashMap<String, String>,
    /// Per-phase results, keyed in progression order.
    pub results: BTreeMap<Phase, PhaseResult>,
    /// Accumulated working context, snapshotted across phase boundaries.
    pub context: Map<String, Value>,
    /// External cancellation signal; honored at the next decision point.
    pub cancel_requested: bool,
    /// When the current phase was entered, for timeout arithmetic.
    pub phase_entered_at: Option<DateTime<Utc>>,
    current_phase: Option<Phase>,
    /// Append-only list of spawned micro-cycle ids.
    child_cycles: Vec<Uuid>,
    /// One-shot override, cleared the instant the decision routine reads it.
    manual_next_phase: Option<Phase>,
}

impl Cycle {
    /// Create a root cycle at depth 0.
    pub fn new(task: Task) -> Self {
        Self::with_depth(task, 0, None)
    }

    /// Create a cycle at an explicit depth under a parent.
    pub(crate) fn with_depth(task: Task, depth: u32, parent_cycle_id: Option<Uuid>) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            depth,
            parent_cycle_id,
            task,
            created_at: Utc::now(),
            role_assignments: HashMap::new(),
            results: BTreeMap::new(),
            context: Map::new(),
            cancel_requested: false,
            phase_entered_at: None,
            current_phase: None,
            child_cycles: Vec::new(),
            manual_next_phase: None,
        }
    }

    /// The phase the cycle is currently in, or `None` before it starts.
    pub fn current_phase(&self) -> Option<Phase> {
        self.current_phase
    }

    /// Ids of micro-cycles spawned under this cycle, in spawn order.
    pub fn child_cycles(&self) -> &[Uuid] {
        &self.child_cycles
    }

    /// Set a one-shot override for the next transition decision.
    pub fn set_manual_next_phase(&mut self, phase: Phase) {
        self.manual_next_phase = Some(phase);
    }

    /// Whether an unconsumed manual override is pending.
    pub fn has_manual_next_phase(&self) -> bool {
        self.manual_next_phase.is_some()
    }

    /// Consume the manual override. Once read it cannot be replayed.
    pub(crate) fn take_manual_next_phase(&mut self) -> Option<Phase> {
        self.manual_next_phase.take()
    }

    /// Enter a phase. Only the phase manager calls this, after its guards.
    pub(crate) fn enter_phase(&mut self, phase: Phase) {
        self.current_phase = Some(phase);
        self.phase_entered_at = Some(Utc::now());
    }

    /// Append a spawned child id. Only the recursion manager calls this.
    pub(crate) fn push_child(&mut self, child_id: Uuid) {
        self.child_cycles.push(child_id);
    }

    /// Record the result for a phase, replacing any earlier record.
    pub fn record_result(&mut self, phase: Phase, result: PhaseResult) {
        self.results.insert(phase, result);
    }

    /// Result recorded for a phase, if any.
    pub fn phase_result(&self, phase: Phase) -> Option<&PhaseResult> {
        self.results.get(&phase)
    }

    pub(crate) fn phase_result_mut(&mut self, phase: Phase) -> Option<&mut PhaseResult> {
        self.results.get_mut(&phase)
    }

    /// Merge entries into the accumulated context, later values winning.
    pub fn merge_context(&mut self, entries: Map<String, Value>) {
        for (key, value) in entries {
            self.context.insert(key, value);
        }
    }

    /// Seconds elapsed since the current phase was entered.
    pub fn elapsed_in_phase(&self) -> Option<f64> {
        self.phase_entered_at
            .map(|entered| (Utc::now() - entered).num_milliseconds() as f64 / 1000.0)
    }

    /// Whether the cycle has reached and recorded its terminal phase.
    pub fn is_finished(&self) -> bool {
        self.current_phase == Some(Phase::Retrospect)
    }
}
