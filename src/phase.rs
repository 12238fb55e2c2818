//! Phase definitions for the EDRR orchestration engine.
//!
//! This module provides:
//! - `Phase` enum covering the four EDRR phases in their total order
//! - `PhaseResult` struct recording what a phase execution reported
//! - `RecoveryOutcome` for phase executions that had to be retried

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One of the four EDRR phases, in progression order.
///
/// The derived `Ord` follows the declaration order, which is the total
/// order the engine advances along. `Retrospect` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Expand,
    Differentiate,
    Refine,
    Retrospect,
}

impl Phase {
    /// All phases in progression order.
    pub const ALL: [Phase; 4] = [
        Phase::Expand,
        Phase::Differentiate,
        Phase::Refine,
        Phase::Retrospect,
    ];

    /// The phase that follows this one, or `None` from `Retrospect`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Expand => Some(Phase::Differentiate),
            Phase::Differentiate => Some(Phase::Refine),
            Phase::Refine => Some(Phase::Retrospect),
            Phase::Retrospect => None,
        }
    }

    /// Whether this phase is the terminal one.
    pub fn is_terminal(self) -> bool {
        self == Phase::Retrospect
    }

    /// Stable lowercase name used in persistence tags and events.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Expand => "expand",
            Phase::Differentiate => "differentiate",
            Phase::Refine => "refine",
            Phase::Retrospect => "retrospect",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a recovery attempt after a failed phase execution.
///
/// Phase-execution failure is data, not an error: the coordinator inspects
/// this record to decide whether to keep advancing toward Retrospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    pub recovered: bool,
    /// Stringified failure reason when `recovered` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RecoveryOutcome {
    pub fn recovered() -> Self {
        Self {
            recovered: true,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            recovered: false,
            reason: Some(reason.into()),
        }
    }
}

/// What a single phase execution reported back to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Whether the team considers the phase's work done.
    pub phase_complete: bool,
    /// Self-reported quality in [0, 1]; clamped on construction.
    pub quality_score: f64,
    /// Set by the decision routine when a quality threshold held progression.
    #[serde(default)]
    pub quality_issues: bool,
    /// Set when a cancellation short-circuited the cycle into this phase.
    #[serde(default)]
    pub cancelled: bool,
    /// Present when the execution went through the recovery path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery: Option<RecoveryOutcome>,
    /// Free-form payload produced by the team for later phases.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl PhaseResult {
    /// Create a result, clamping the quality score into [0, 1].
    ///
    /// A NaN score collapses to 0.0 so threshold comparisons stay defined.
    pub fn new(phase_complete: bool, quality_score: f64) -> Self {
        let quality_score = if quality_score.is_nan() {
            0.0
        } else {
            quality_score.clamp(0.0, 1.0)
        };
        Self {
            phase_complete,
            quality_score,
            quality_issues: false,
            cancelled: false,
            recovery: None,
            data: Value::Null,
        }
    }

    /// Attach a data payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Result recorded when recovery failed: the phase is closed out as
    /// incomplete with the failure reason attached.
    pub fn from_failed_recovery(outcome: RecoveryOutcome) -> Self {
        let mut result = PhaseResult::new(false, 0.0);
        result.recovery = Some(outcome);
        result
    }

    /// Result recorded on the Retrospect entry forced by a cancellation.
    pub fn cancelled() -> Self {
        let mut result = PhaseResult::new(false, 0.0);
        result.cancelled = true;
        result
    }
}
