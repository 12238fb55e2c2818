//! Typed error hierarchy for the EDRR orchestration engine.
//!
//! A single enum covers every guard in the engine. Guard checks run strictly
//! before any mutation, so an `OrchestrationError` never leaves a cycle in a
//! partially-transitioned state. Persistence failures are deliberately absent
//! here: the memory adapter converts them to sentinels instead of raising.

use crate::phase::Phase;
use thiserror::Error;

/// Errors from orchestration guards. Fatal to the current operation, never
/// to the process: callers catch, log, and decide how to proceed.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Phase {phase} requires unmet dependency '{dependency}'")]
    UnmetDependency { phase: Phase, dependency: String },

    #[error("No manifest configured; dependencies for phase {phase} treated as unmet")]
    MissingManifest { phase: Phase },

    #[error("Cannot progress out of terminal phase retrospect (attempted {attempted})")]
    TerminalPhase { attempted: Phase },

    #[error("Cannot transition backward from {from} to {to}")]
    BackwardTransition { from: Phase, to: Phase },

    #[error("Maximum recursion depth {max_depth} exceeded (parent at depth {depth})")]
    MaxDepthExceeded { depth: u32, max_depth: u32 },

    #[error("Micro-cycle iteration limit {max_iterations} reached for this parent cycle")]
    MicroCycleLimit { max_iterations: u32 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
