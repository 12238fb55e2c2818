//! Recursive EDRR orchestration engine.
//!
//! Drives a team of cooperating worker agents through the four-phase
//! Expand → Differentiate → Refine → Retrospect cycle: bounded recursion
//! into micro-cycles, role rotation on every phase entry, context snapshots
//! across phase boundaries, and persistence that degrades instead of
//! failing.

pub mod config;
pub mod cycle;
pub mod errors;
pub mod events;
pub mod manifest;
pub mod memory;
pub mod orchestrator;
pub mod phase;
pub mod sanitize;
pub mod team;

pub use config::EngineConfig;
pub use cycle::{Cycle, Task};
pub use errors::OrchestrationError;
pub use manifest::Manifest;
pub use orchestrator::Coordinator;
pub use phase::{Phase, PhaseResult};
