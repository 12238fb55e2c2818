//! Top-level cycle coordinator.
//!
//! Composes the phase manager, the micro-cycle manager, the memory adapter
//! and the worker team behind one start/execute/advance/inspect API. The
//! coordinator never touches `current_phase` or `child_cycles` directly;
//! the two managers are the single points of truth for those invariants.

use chrono::Utc;
use serde_json::json;

use crate::config::EngineConfig;
use crate::cycle::{Cycle, Task};
use crate::errors::OrchestrationError;
use crate::events::{EventJournal, OrchestrationEvent};
use crate::manifest::Manifest;
use crate::memory::MemoryAdapter;
use crate::phase::{Phase, PhaseResult};
use crate::team::AgentTeam;

use super::recursion::{HumanOverride, MicroCycleManager, Recovery, TerminationAssessment};
use super::transitions::PhaseManager;

/// Upper bound on execute/advance rounds in `run`. A four-phase cycle
/// needs at most four; the bound guards against a decision implementation
/// that keeps yielding work.
const RUN_SAFETY_BOUND: usize = 10;

pub struct Coordinator {
    phases: PhaseManager,
    recursion: MicroCycleManager,
    memory: MemoryAdapter,
    team: Box<dyn AgentTeam>,
    journal: EventJournal,
}

impl Coordinator {
    /// Build a coordinator. Construction mutates no process-wide state.
    pub fn new(
        config: EngineConfig,
        manifest: Option<Manifest>,
        team: Box<dyn AgentTeam>,
        memory: MemoryAdapter,
    ) -> Self {
        let recursion = MicroCycleManager::new(&config);
        Self {
            phases: PhaseManager::new(config, manifest),
            recursion,
            memory,
            team,
            journal: EventJournal::new(),
        }
    }

    /// Start a root cycle: depth 0, manifest check for Expand, then enter
    /// Expand through the phase manager.
    pub fn start_cycle(&mut self, task: Task) -> Result<Cycle, OrchestrationError> {
        let mut cycle = Cycle::new(task);
        self.phases.progress_to_phase(
            &mut cycle,
            self.team.as_mut(),
            &mut self.memory,
            &mut self.journal,
            Phase::Expand,
        )?;
        Ok(cycle)
    }

    /// Execute the cycle's current phase through the worker team.
    ///
    /// A failing elaboration goes through the recovery path (one retry);
    /// either the team's result or a failed-recovery marker lands in
    /// `cycle.results` and the context, then gets persisted.
    pub fn execute_current_phase(
        &mut self,
        cycle: &mut Cycle,
    ) -> Result<(), OrchestrationError> {
        let Some(phase) = cycle.current_phase() else {
            return Err(OrchestrationError::Internal(anyhow::anyhow!(
                "cannot execute a cycle that has not started"
            )));
        };

        let result = match self.team.elaborate(&cycle.task, phase) {
            Ok(result) => result,
            Err(_) => {
                let task = cycle.task.clone();
                let team = self.team.as_mut();
                let recovery = self
                    .recursion
                    .attempt_recovery(cycle, &mut self.journal, || team.elaborate(&task, phase));
                match recovery {
                    Recovery::Recovered(result) => result,
                    Recovery::Failed(outcome) => PhaseResult::from_failed_recovery(outcome),
                }
            }
        };

        cycle.context.insert(
            format!("{phase}_result"),
            serde_json::to_value(&result).unwrap_or(serde_json::Value::Null),
        );
        cycle.record_result(phase, result.clone());

        let payload = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);
        self.memory.safe_store(&payload, "phase_result", phase);
        self.memory.persist_context_snapshot(cycle);
        Ok(())
    }

    /// Take one transition step: the cancellation short-circuit first,
    /// otherwise decide and progress. Returns the phase entered, or `None`
    /// when the engine holds position.
    pub fn advance(&mut self, cycle: &mut Cycle) -> Result<Option<Phase>, OrchestrationError> {
        if cycle.cancel_requested && !cycle.is_finished() {
            self.phases.cancel_to_retrospect(
                cycle,
                self.team.as_mut(),
                &mut self.memory,
                &mut self.journal,
            )?;
            cycle.record_result(Phase::Retrospect, PhaseResult::cancelled());
            self.journal.record(OrchestrationEvent::CycleCancelled {
                cycle_id: cycle.cycle_id,
                depth: cycle.depth,
                timestamp: Utc::now(),
            });
            return Ok(Some(Phase::Retrospect));
        }

        let Some(target) = self.phases.decide_next_phase(cycle, &mut self.journal) else {
            return Ok(None);
        };
        self.phases.progress_to_phase(
            cycle,
            self.team.as_mut(),
            &mut self.memory,
            &mut self.journal,
            target,
        )?;
        Ok(Some(target))
    }

    /// Drive the cycle until it holds or completes: execute the current
    /// phase, then advance, repeatedly. A quality-gate hold leaves the
    /// cycle parked in its current phase with `quality_issues` flagged.
    /// A pending cancellation takes the short-circuit and stops the loop,
    /// leaving the cancellation marker as the Retrospect result.
    pub fn run(&mut self, cycle: &mut Cycle) -> Result<(), OrchestrationError> {
        for _ in 0..RUN_SAFETY_BOUND {
            if cycle.cancel_requested {
                self.advance(cycle)?;
                break;
            }
            self.execute_current_phase(cycle)?;
            if self.advance(cycle)?.is_none() {
                break;
            }
        }
        if cycle.is_finished() {
            self.journal.record(OrchestrationEvent::CycleCompleted {
                cycle_id: cycle.cycle_id,
                depth: cycle.depth,
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// Spawn a micro-cycle under `parent` through the recursion manager.
    pub fn spawn_micro_cycle(
        &mut self,
        task: Task,
        parent: &mut Cycle,
    ) -> Result<Cycle, OrchestrationError> {
        self.recursion
            .create_micro_cycle(task, parent, &mut self.journal)
    }

    /// Spawn, start, and run a micro-cycle depth-first, then aggregate its
    /// results back into the parent's context.
    pub fn run_micro_cycle(
        &mut self,
        task: Task,
        parent: &mut Cycle,
    ) -> Result<Cycle, OrchestrationError> {
        let mut child = self.spawn_micro_cycle(task, parent)?;
        self.phases.progress_to_phase(
            &mut child,
            self.team.as_mut(),
            &mut self.memory,
            &mut self.journal,
            Phase::Expand,
        )?;
        self.run(&mut child)?;

        let aggregated = json!({
            "context": child.context,
            "results": child.results,
        });
        let bucket = parent
            .context
            .entry("micro_cycle_results".to_string())
            .or_insert_with(|| json!({}));
        if let Some(map) = bucket.as_object_mut() {
            map.insert(child.cycle_id.to_string(), aggregated);
        }
        self.memory.persist_context_snapshot(parent);
        Ok(child)
    }

    /// Ask the recursion manager whether recursion under `cycle` should
    /// stop, optionally under a human override.
    pub fn assess_recursion(
        &mut self,
        cycle: &Cycle,
        human_override: Option<HumanOverride>,
    ) -> TerminationAssessment {
        self.recursion
            .should_terminate_recursion(cycle, human_override, &mut self.journal)
    }

    /// Signal cancellation; the next transition decision short-circuits to
    /// Retrospect. In-flight phase execution is not interrupted.
    pub fn request_cancellation(&mut self, cycle: &mut Cycle) {
        cycle.cancel_requested = true;
    }

    /// Read-only view of the cycle's current role map.
    pub fn get_role_assignments<'a>(
        &self,
        cycle: &'a Cycle,
    ) -> &'a std::collections::HashMap<String, String> {
        &cycle.role_assignments
    }

    /// The journal of structured orchestration events recorded so far.
    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// The memory adapter, for callers that persist their own artifacts.
    pub fn memory_mut(&mut self) -> &mut MemoryAdapter {
        &mut self.memory
    }
}
