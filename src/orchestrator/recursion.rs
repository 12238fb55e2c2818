//! Micro-cycle recursion manager.
//!
//! Spawning nested cycles, assessing whether recursion should stop, and the
//! single-retry recovery path for failed phase executions. The depth guard
//! runs strictly before the parent's recursion tree grows, so a failed
//! spawn attempt is invisible in `child_cycles`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::cycle::{Cycle, Task};
use crate::errors::OrchestrationError;
use crate::events::{EventJournal, OrchestrationEvent};
use crate::phase::{PhaseResult, RecoveryOutcome};

/// Word-count floor below which a task counts as minimally complex.
const MINIMAL_COMPLEXITY_WORDS: usize = 3;

/// Severity of a triggered termination factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One triggered termination factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationFactor {
    pub name: String,
    pub severity: Severity,
}

/// Structured verdict from `should_terminate_recursion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationAssessment {
    pub terminate: bool,
    /// Triggered factors, highest severity first.
    pub factors: Vec<TerminationFactor>,
}

/// Human-supplied override for recursion termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanOverride {
    /// Keep recursing even when automatic factors have triggered.
    Continue,
    /// Stop regardless of automatic factors.
    Terminate,
}

/// Outcome of the recovery path: either a usable phase result from the
/// retry, or a tagged failure the coordinator records and moves past.
#[derive(Debug, Clone)]
pub enum Recovery {
    Recovered(PhaseResult),
    Failed(RecoveryOutcome),
}

pub struct MicroCycleManager {
    max_depth: u32,
    max_iterations: u32,
}

impl MicroCycleManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_depth: config.max_recursion_depth,
            max_iterations: config.max_micro_cycle_iterations,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Spawn a micro-cycle under `parent`.
    ///
    /// Both limits are checked strictly before the append: on failure the
    /// parent's `child_cycles` list is untouched and the error names the
    /// limit that tripped. The iteration cap counts spawns per parent,
    /// independent of depth.
    pub fn create_micro_cycle(
        &self,
        task: Task,
        parent: &mut Cycle,
        journal: &mut EventJournal,
    ) -> Result<Cycle, OrchestrationError> {
        let child_depth = parent.depth + 1;
        if child_depth > self.max_depth {
            return Err(OrchestrationError::MaxDepthExceeded {
                depth: parent.depth,
                max_depth: self.max_depth,
            });
        }
        if parent.child_cycles().len() as u32 >= self.max_iterations {
            return Err(OrchestrationError::MicroCycleLimit {
                max_iterations: self.max_iterations,
            });
        }
        let child = Cycle::with_depth(task, child_depth, Some(parent.cycle_id));
        parent.push_child(child.cycle_id);
        journal.record(OrchestrationEvent::MicroCycleSpawned {
            parent_cycle_id: parent.cycle_id,
            child_cycle_id: child.cycle_id,
            depth: child_depth,
            timestamp: Utc::now(),
        });
        Ok(child)
    }

    /// Assess whether recursion under `cycle` should stop.
    ///
    /// Automatic factors are severity-ranked; a human override to continue
    /// beats every automatic factor, including a triggered depth limit.
    pub fn should_terminate_recursion(
        &self,
        cycle: &Cycle,
        human_override: Option<HumanOverride>,
        journal: &mut EventJournal,
    ) -> TerminationAssessment {
        let mut factors = Vec::new();

        if cycle.depth >= self.max_depth {
            factors.push(TerminationFactor {
                name: "max_depth".to_string(),
                severity: Severity::High,
            });
        }
        let words = cycle.task.description.split_whitespace().count();
        if words <= MINIMAL_COMPLEXITY_WORDS {
            factors.push(TerminationFactor {
                name: "minimal_complexity".to_string(),
                severity: Severity::Low,
            });
        }
        if let Some(HumanOverride::Terminate) = human_override {
            factors.push(TerminationFactor {
                name: "human_override".to_string(),
                severity: Severity::High,
            });
        }
        factors.sort_by(|a, b| b.severity.cmp(&a.severity));

        let terminate = match human_override {
            Some(HumanOverride::Continue) => false,
            Some(HumanOverride::Terminate) => true,
            None => !factors.is_empty(),
        };

        journal.record(OrchestrationEvent::RecursionAssessed {
            cycle_id: cycle.cycle_id,
            depth: cycle.depth,
            terminate,
            factors: factors.iter().map(|f| f.name.clone()).collect(),
            timestamp: Utc::now(),
        });
        TerminationAssessment { terminate, factors }
    }

    /// Retry a failed phase executor exactly once.
    ///
    /// A second failure becomes data instead of propagating, so the
    /// coordinator can log it and continue toward Retrospect.
    pub fn attempt_recovery<F>(
        &self,
        cycle: &Cycle,
        journal: &mut EventJournal,
        mut executor: F,
    ) -> Recovery
    where
        F: FnMut() -> anyhow::Result<PhaseResult>,
    {
        let phase = cycle.current_phase().unwrap_or(crate::phase::Phase::Expand);
        match executor() {
            Ok(mut result) => {
                result.recovery = Some(RecoveryOutcome::recovered());
                journal.record(OrchestrationEvent::RecoveryAttempted {
                    cycle_id: cycle.cycle_id,
                    depth: cycle.depth,
                    phase,
                    recovered: true,
                    reason: None,
                    timestamp: Utc::now(),
                });
                Recovery::Recovered(result)
            }
            Err(e) => {
                let reason = e.to_string();
                journal.record(OrchestrationEvent::RecoveryAttempted {
                    cycle_id: cycle.cycle_id,
                    depth: cycle.depth,
                    phase,
                    recovered: false,
                    reason: Some(reason.clone()),
                    timestamp: Utc::now(),
                });
                Recovery::Failed(RecoveryOutcome::failed(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn manager() -> MicroCycleManager {
        MicroCycleManager::new(&EngineConfig::default())
    }

    #[test]
    fn test_spawn_increments_depth_and_links_parent() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let mut parent = Cycle::new(Task::new("root task"));

        let child = manager
            .create_micro_cycle(Task::new("sub task"), &mut parent, &mut journal)
            .unwrap();
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_cycle_id, Some(parent.cycle_id));
        assert_eq!(parent.child_cycles(), &[child.cycle_id]);
    }

    #[test]
    fn test_depth_bound_enforced_without_mutation() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let mut root = Cycle::new(Task::new("root"));
        let mut c1 = manager
            .create_micro_cycle(Task::new("d1"), &mut root, &mut journal)
            .unwrap();
        let mut c2 = manager
            .create_micro_cycle(Task::new("d2"), &mut c1, &mut journal)
            .unwrap();
        let mut c3 = manager
            .create_micro_cycle(Task::new("d3"), &mut c2, &mut journal)
            .unwrap();
        assert_eq!(c3.depth, 3);

        let children_before = c3.child_cycles().len();
        let err = manager
            .create_micro_cycle(Task::new("d4"), &mut c3, &mut journal)
            .unwrap_err();
        assert!(
            err.to_string()
                .to_lowercase()
                .contains("maximum recursion depth")
        );
        assert_eq!(c3.child_cycles().len(), children_before);
    }

    #[test]
    fn test_iteration_cap_bounds_spawns_per_parent() {
        let config = EngineConfig::default().with_max_micro_cycle_iterations(2.0);
        let manager = MicroCycleManager::new(&config);
        let mut journal = EventJournal::new();
        let mut parent = Cycle::new(Task::new("root"));

        manager
            .create_micro_cycle(Task::new("first"), &mut parent, &mut journal)
            .unwrap();
        manager
            .create_micro_cycle(Task::new("second"), &mut parent, &mut journal)
            .unwrap();

        let err = manager
            .create_micro_cycle(Task::new("third"), &mut parent, &mut journal)
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::MicroCycleLimit { max_iterations: 2 }
        ));
        assert_eq!(parent.child_cycles().len(), 2);
    }

    #[test]
    fn test_termination_max_depth_is_high_severity() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let mut root = Cycle::new(Task::new("root"));
        let mut c1 = manager
            .create_micro_cycle(Task::new("a fairly involved sub task"), &mut root, &mut journal)
            .unwrap();
        let mut c2 = manager
            .create_micro_cycle(Task::new("another involved sub task"), &mut c1, &mut journal)
            .unwrap();
        let c3 = manager
            .create_micro_cycle(Task::new("yet another involved task"), &mut c2, &mut journal)
            .unwrap();

        let assessment = manager.should_terminate_recursion(&c3, None, &mut journal);
        assert!(assessment.terminate);
        let max_depth = assessment
            .factors
            .iter()
            .find(|f| f.name == "max_depth")
            .unwrap();
        assert_eq!(max_depth.severity, Severity::High);
        // High severity factors come first.
        assert_eq!(assessment.factors[0].severity, Severity::High);
    }

    #[test]
    fn test_termination_minimal_complexity() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let cycle = Cycle::new(Task::new("tidy up"));
        let assessment = manager.should_terminate_recursion(&cycle, None, &mut journal);
        assert!(assessment.terminate);
        assert!(
            assessment
                .factors
                .iter()
                .any(|f| f.name == "minimal_complexity" && f.severity == Severity::Low)
        );
    }

    #[test]
    fn test_no_factors_means_continue() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let cycle = Cycle::new(Task::new("a genuinely involved root task"));
        let assessment = manager.should_terminate_recursion(&cycle, None, &mut journal);
        assert!(!assessment.terminate);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_human_continue_beats_max_depth() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let mut root = Cycle::new(Task::new("root"));
        let mut c1 = manager
            .create_micro_cycle(Task::new("first level of nested work"), &mut root, &mut journal)
            .unwrap();
        let mut c2 = manager
            .create_micro_cycle(Task::new("second level of nested work"), &mut c1, &mut journal)
            .unwrap();
        let c3 = manager
            .create_micro_cycle(Task::new("third level of nested work"), &mut c2, &mut journal)
            .unwrap();

        let assessment =
            manager.should_terminate_recursion(&c3, Some(HumanOverride::Continue), &mut journal);
        assert!(!assessment.terminate);
        // The triggered factor is still reported.
        assert!(assessment.factors.iter().any(|f| f.name == "max_depth"));
    }

    #[test]
    fn test_human_terminate_stops_outright() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let cycle = Cycle::new(Task::new("a genuinely involved root task"));
        let assessment =
            manager.should_terminate_recursion(&cycle, Some(HumanOverride::Terminate), &mut journal);
        assert!(assessment.terminate);
        assert!(assessment.factors.iter().any(|f| f.name == "human_override"));
    }

    #[test]
    fn test_recovery_retry_succeeds() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let cycle = Cycle::new(Task::new("t"));

        let recovery = manager.attempt_recovery(&cycle, &mut journal, || {
            Ok(PhaseResult::new(true, 0.8))
        });
        match recovery {
            Recovery::Recovered(result) => {
                assert!(result.phase_complete);
                assert!(result.recovery.unwrap().recovered);
            }
            Recovery::Failed(_) => panic!("Expected recovery to succeed"),
        }
    }

    #[test]
    fn test_recovery_second_failure_becomes_data() {
        let manager = manager();
        let mut journal = EventJournal::new();
        let cycle = Cycle::new(Task::new("t"));

        let recovery = manager.attempt_recovery(&cycle, &mut journal, || {
            bail!("provider timed out")
        });
        match recovery {
            Recovery::Failed(outcome) => {
                assert!(!outcome.recovered);
                assert_eq!(outcome.reason.as_deref(), Some("provider timed out"));
            }
            Recovery::Recovered(_) => panic!("Expected recovery to fail"),
        }
    }
}
