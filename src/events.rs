//! Structured observability records.
//!
//! The engine appends an `OrchestrationEvent` at every notable point and
//! mirrors it to `tracing`. It does not format or ship these records;
//! external logging and audit consumers read the journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Phase;

/// One orchestration event, tagged for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    PhaseEntered {
        cycle_id: Uuid,
        depth: u32,
        phase: Phase,
        timestamp: DateTime<Utc>,
    },
    /// What `decide_next_phase` returned, with the reason it held or moved.
    PhaseDecision {
        cycle_id: Uuid,
        depth: u32,
        current_phase: Phase,
        decision: Option<Phase>,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    PersistenceFailure {
        cycle_id: Uuid,
        kind: String,
        phase: Option<Phase>,
        timestamp: DateTime<Utc>,
    },
    RecoveryAttempted {
        cycle_id: Uuid,
        depth: u32,
        phase: Phase,
        recovered: bool,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
    RecursionAssessed {
        cycle_id: Uuid,
        depth: u32,
        terminate: bool,
        factors: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    MicroCycleSpawned {
        parent_cycle_id: Uuid,
        child_cycle_id: Uuid,
        depth: u32,
        timestamp: DateTime<Utc>,
    },
    CycleCancelled {
        cycle_id: Uuid,
        depth: u32,
        timestamp: DateTime<Utc>,
    },
    CycleCompleted {
        cycle_id: Uuid,
        depth: u32,
        timestamp: DateTime<Utc>,
    },
}

impl OrchestrationEvent {
    /// The cycle this event belongs to (the parent for spawn events).
    pub fn cycle_id(&self) -> Uuid {
        match self {
            OrchestrationEvent::PhaseEntered { cycle_id, .. }
            | OrchestrationEvent::PhaseDecision { cycle_id, .. }
            | OrchestrationEvent::PersistenceFailure { cycle_id, .. }
            | OrchestrationEvent::RecoveryAttempted { cycle_id, .. }
            | OrchestrationEvent::RecursionAssessed { cycle_id, .. }
            | OrchestrationEvent::CycleCancelled { cycle_id, .. }
            | OrchestrationEvent::CycleCompleted { cycle_id, .. } => *cycle_id,
            OrchestrationEvent::MicroCycleSpawned {
                parent_cycle_id, ..
            } => *parent_cycle_id,
        }
    }
}

/// Ordered, append-only collection of orchestration events.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EventJournal {
    events: Vec<OrchestrationEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and mirror it to `tracing`.
    pub fn record(&mut self, event: OrchestrationEvent) {
        match &event {
            OrchestrationEvent::PhaseEntered {
                cycle_id,
                depth,
                phase,
                ..
            } => {
                tracing::info!(cycle_id = %cycle_id, depth, phase = %phase, "phase entered");
            }
            OrchestrationEvent::PhaseDecision {
                cycle_id,
                current_phase,
                decision,
                reason,
                ..
            } => {
                tracing::debug!(
                    cycle_id = %cycle_id,
                    current = %current_phase,
                    decision = ?decision,
                    reason,
                    "phase decision"
                );
            }
            OrchestrationEvent::PersistenceFailure { cycle_id, kind, .. } => {
                tracing::warn!(cycle_id = %cycle_id, kind, "persistence failure");
            }
            OrchestrationEvent::RecoveryAttempted {
                cycle_id,
                phase,
                recovered,
                ..
            } => {
                tracing::warn!(cycle_id = %cycle_id, phase = %phase, recovered, "recovery attempted");
            }
            OrchestrationEvent::RecursionAssessed {
                cycle_id,
                terminate,
                factors,
                ..
            } => {
                tracing::info!(cycle_id = %cycle_id, terminate, ?factors, "recursion assessed");
            }
            OrchestrationEvent::MicroCycleSpawned {
                parent_cycle_id,
                child_cycle_id,
                depth,
                ..
            } => {
                tracing::info!(
                    parent = %parent_cycle_id,
                    child = %child_cycle_id,
                    depth,
                    "micro-cycle spawned"
                );
            }
            OrchestrationEvent::CycleCancelled { cycle_id, .. } => {
                tracing::info!(cycle_id = %cycle_id, "cycle cancelled");
            }
            OrchestrationEvent::CycleCompleted { cycle_id, .. } => {
                tracing::info!(cycle_id = %cycle_id, "cycle completed");
            }
        }
        self.events.push(event);
    }

    /// All recorded events in order.
    pub fn events(&self) -> &[OrchestrationEvent] {
        &self.events
    }

    /// Events belonging to one cycle, in order.
    pub fn events_for(&self, cycle_id: Uuid) -> Vec<&OrchestrationEvent> {
        self.events
            .iter()
            .filter(|e| e.cycle_id() == cycle_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_preserves_order() {
        let mut journal = EventJournal::new();
        let id = Uuid::new_v4();
        journal.record(OrchestrationEvent::PhaseEntered {
            cycle_id: id,
            depth: 0,
            phase: Phase::Expand,
            timestamp: Utc::now(),
        });
        journal.record(OrchestrationEvent::CycleCompleted {
            cycle_id: id,
            depth: 0,
            timestamp: Utc::now(),
        });

        assert_eq!(journal.len(), 2);
        assert!(matches!(
            journal.events()[0],
            OrchestrationEvent::PhaseEntered { .. }
        ));
        assert!(matches!(
            journal.events()[1],
            OrchestrationEvent::CycleCompleted { .. }
        ));
    }

    #[test]
    fn test_events_for_filters_by_cycle() {
        let mut journal = EventJournal::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        journal.record(OrchestrationEvent::CycleCancelled {
            cycle_id: a,
            depth: 0,
            timestamp: Utc::now(),
        });
        journal.record(OrchestrationEvent::CycleCompleted {
            cycle_id: b,
            depth: 0,
            timestamp: Utc::now(),
        });

        assert_eq!(journal.events_for(a).len(), 1);
        assert_eq!(journal.events_for(b).len(), 1);
    }

    #[test]
    fn test_spawn_event_belongs_to_parent() {
        let parent = Uuid::new_v4();
        let event = OrchestrationEvent::MicroCycleSpawned {
            parent_cycle_id: parent,
            child_cycle_id: Uuid::new_v4(),
            depth: 1,
            timestamp: Utc::now(),
        };
        assert_eq!(event.cycle_id(), parent);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = OrchestrationEvent::PhaseEntered {
            cycle_id: Uuid::new_v4(),
            depth: 0,
            phase: Phase::Expand,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"phase_entered\""));
        assert!(json.contains("\"phase\":\"expand\""));
    }
}
