//! Phase management engine.
//!
//! Owns the legality of phase movement: manifest gating, forward-only
//! order, terminal absorption, primus rotation, and the persistence done on
//! every phase entry. The decision routine is separate from the transition
//! itself so callers can inspect "what would happen next" history in the
//! journal.

use chrono::Utc;
use serde_json::json;

use crate::config::EngineConfig;
use crate::cycle::Cycle;
use crate::errors::OrchestrationError;
use crate::events::{EventJournal, OrchestrationEvent};
use crate::manifest::Manifest;
use crate::memory::MemoryAdapter;
use crate::phase::Phase;
use crate::team::AgentTeam;

/// Safety bound on auto-progression, protecting against a misbehaving
/// decision implementation. Not expected to be hit in normal operation:
/// a four-phase cycle advances at most three times.
const AUTO_PROGRESS_SAFETY_BOUND: usize = 10;

pub struct PhaseManager {
    config: EngineConfig,
    manifest: Option<Manifest>,
}

impl PhaseManager {
    pub fn new(config: EngineConfig, manifest: Option<Manifest>) -> Self {
        Self { config, manifest }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Manifest gate for entering `phase`.
    ///
    /// A missing manifest counts as "no dependencies" only when the config
    /// says so explicitly; otherwise it is unmet.
    pub fn check_dependencies(
        &self,
        cycle: &Cycle,
        phase: Phase,
    ) -> Result<(), OrchestrationError> {
        match &self.manifest {
            Some(manifest) => manifest.check_phase_dependencies(cycle, phase),
            None if self.config.missing_manifest_means_no_deps => Ok(()),
            None => Err(OrchestrationError::MissingManifest { phase }),
        }
    }

    /// Transition the cycle into `target`.
    ///
    /// Guards run strictly before any mutation: terminal absorption,
    /// forward-only order, then the manifest gate. On success the lead role
    /// rotates, phase-entry metadata and the merged context snapshot are
    /// persisted (non-fatally), and the cycle enters the phase.
    pub fn progress_to_phase(
        &self,
        cycle: &mut Cycle,
        team: &mut dyn AgentTeam,
        memory: &mut MemoryAdapter,
        journal: &mut EventJournal,
        target: Phase,
    ) -> Result<(), OrchestrationError> {
        self.transition(cycle, team, memory, journal, target, true)
    }

    /// Force the cycle into Retrospect on cancellation.
    ///
    /// The terminal and forward-only guards still apply; the manifest gate
    /// does not, so a cycle cancelled early always reaches its terminal
    /// phase even under a dependency chain it never satisfied.
    pub fn cancel_to_retrospect(
        &self,
        cycle: &mut Cycle,
        team: &mut dyn AgentTeam,
        memory: &mut MemoryAdapter,
        journal: &mut EventJournal,
    ) -> Result<(), OrchestrationError> {
        self.transition(cycle, team, memory, journal, Phase::Retrospect, false)
    }

    fn transition(
        &self,
        cycle: &mut Cycle,
        team: &mut dyn AgentTeam,
        memory: &mut MemoryAdapter,
        journal: &mut EventJournal,
        target: Phase,
        enforce_dependencies: bool,
    ) -> Result<(), OrchestrationError> {
        if let Some(current) = cycle.current_phase() {
            if current.is_terminal() {
                return Err(OrchestrationError::TerminalPhase { attempted: target });
            }
            if target <= current {
                return Err(OrchestrationError::BackwardTransition {
                    from: current,
                    to: target,
                });
            }
        }
        if enforce_dependencies {
            self.check_dependencies(cycle, target)?;
        }

        cycle.role_assignments = team.rotate_primus(cycle);

        let entry_meta = json!({
            "phase": target.as_str(),
            "cycle_id": cycle.cycle_id,
            "started_at": Utc::now(),
        });
        if memory.safe_store(&entry_meta, "phase_entry", target).is_none() && memory.has_backend()
        {
            journal.record(OrchestrationEvent::PersistenceFailure {
                cycle_id: cycle.cycle_id,
                kind: "phase_entry".to_string(),
                phase: Some(target),
                timestamp: Utc::now(),
            });
        }
        memory.persist_context_snapshot(cycle);

        cycle.enter_phase(target);
        journal.record(OrchestrationEvent::PhaseEntered {
            cycle_id: cycle.cycle_id,
            depth: cycle.depth,
            phase: target,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Decide what the next phase should be, without transitioning.
    ///
    /// Priority order: manual override (consumed on read), auto-transition
    /// switch, completion gate, quality gate, terminal absorption, natural
    /// order. An exceeded phase timeout forces the advance past the
    /// completion and quality gates; it never advances out of Retrospect.
    pub fn decide_next_phase(
        &self,
        cycle: &mut Cycle,
        journal: &mut EventJournal,
    ) -> Option<Phase> {
        let (decision, reason) = self.evaluate_decision(cycle);
        if let Some(current) = cycle.current_phase() {
            journal.record(OrchestrationEvent::PhaseDecision {
                cycle_id: cycle.cycle_id,
                depth: cycle.depth,
                current_phase: current,
                decision,
                reason: reason.to_string(),
                timestamp: Utc::now(),
            });
        }
        decision
    }

    fn evaluate_decision(&self, cycle: &mut Cycle) -> (Option<Phase>, &'static str) {
        if let Some(overridden) = cycle.take_manual_next_phase() {
            return (Some(overridden), "manual_override");
        }
        if !self.config.auto_phase_transitions {
            return (None, "auto_transitions_disabled");
        }
        let Some(current) = cycle.current_phase() else {
            return (None, "cycle_not_started");
        };
        if current.is_terminal() {
            return (None, "terminal_phase");
        }

        let timeout_exceeded = match (self.config.phase_timeout(current), cycle.elapsed_in_phase())
        {
            (Some(budget), Some(elapsed)) => elapsed > budget,
            _ => false,
        };
        if timeout_exceeded {
            return (current.next(), "timeout_forced_advance");
        }

        let complete = cycle
            .phase_result(current)
            .map(|r| r.phase_complete)
            .unwrap_or(false);
        if !complete {
            return (None, "phase_incomplete");
        }

        if let Some(threshold) = self.config.quality_threshold(current) {
            let score = cycle
                .phase_result(current)
                .map(|r| r.quality_score)
                .unwrap_or(0.0);
            if score < threshold {
                if let Some(result) = cycle.phase_result_mut(current) {
                    result.quality_issues = true;
                }
                return (None, "quality_below_threshold");
            }
        }

        (current.next(), "phase_complete")
    }

    /// Repeatedly decide and progress until the decision is to hold.
    ///
    /// Skipped entirely when the team lacks elaboration capability or auto
    /// transitions are off. Returns the phases entered, in order.
    pub fn maybe_auto_progress(
        &self,
        cycle: &mut Cycle,
        team: &mut dyn AgentTeam,
        memory: &mut MemoryAdapter,
        journal: &mut EventJournal,
    ) -> Result<Vec<Phase>, OrchestrationError> {
        let mut entered = Vec::new();
        if !team.has_elaboration_capability() || !self.config.auto_phase_transitions {
            return Ok(entered);
        }
        for _ in 0..AUTO_PROGRESS_SAFETY_BOUND {
            let Some(target) = self.decide_next_phase(cycle, journal) else {
                break;
            };
            self.progress_to_phase(cycle, team, memory, journal, target)?;
            entered.push(target);
        }
        Ok(entered)
    }
}
