//! Orchestration core: phase management, micro-cycle recursion, and the
//! top-level coordinator composing them.

mod coordinator;
mod recursion;
mod transitions;

pub use coordinator::Coordinator;
pub use recursion::{
    HumanOverride, MicroCycleManager, Recovery, Severity, TerminationAssessment,
    TerminationFactor,
};
pub use transitions::PhaseManager;
