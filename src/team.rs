//! Worker-team capability contract.
//!
//! The engine never knows how a team produces content. It consumes three
//! capabilities: primus rotation on phase entry, phase elaboration, and a
//! feature probe gating auto-progression. Concrete team shapes (sizes,
//! strategies, consensus internals) live behind this trait.

use anyhow::{Result, bail};
use std::collections::HashMap;

use crate::cycle::{Cycle, Task};
use crate::phase::{Phase, PhaseResult};

/// Role string assigned to the team's decision-focal member.
pub const PRIMUS_ROLE: &str = "primus";
/// Role string assigned to every other member.
pub const WORKER_ROLE: &str = "worker";

pub trait AgentTeam {
    /// Rotate the lead role and return the full member-to-role map.
    /// Called on every phase entry; exactly one member maps to `PRIMUS_ROLE`.
    fn rotate_primus(&mut self, cycle: &Cycle) -> HashMap<String, String>;

    /// Perform the phase's work on the task and report completion/quality.
    fn elaborate(&mut self, task: &Task, phase: Phase) -> Result<PhaseResult>;

    /// Whether the team can elaborate at all; auto-progression is skipped
    /// when this is false.
    fn has_elaboration_capability(&self) -> bool {
        true
    }
}

/// Reference team: a fixed member list with the primus advancing one seat
/// per rotation. Elaboration reports a configurable flat result, which is
/// enough for embedding tests and dry runs.
#[derive(Debug, Clone)]
pub struct RoundRobinTeam {
    members: Vec<String>,
    next_primus: usize,
    /// Result template returned from `elaborate`.
    pub reported_result: PhaseResult,
}

impl RoundRobinTeam {
    pub fn new(members: Vec<String>) -> Self {
        Self {
            members,
            next_primus: 0,
            reported_result: PhaseResult::new(true, 1.0),
        }
    }

    pub fn with_reported_result(mut self, result: PhaseResult) -> Self {
        self.reported_result = result;
        self
    }

    /// Member currently holding the primus role, if any rotation happened.
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl AgentTeam for RoundRobinTeam {
    fn rotate_primus(&mut self, _cycle: &Cycle) -> HashMap<String, String> {
        let mut roles = HashMap::new();
        if self.members.is_empty() {
            return roles;
        }
        let primus = self.next_primus % self.members.len();
        self.next_primus = (self.next_primus + 1) % self.members.len();
        for (i, member) in self.members.iter().enumerate() {
            let role = if i == primus { PRIMUS_ROLE } else { WORKER_ROLE };
            roles.insert(member.clone(), role.to_string());
        }
        roles
    }

    fn elaborate(&mut self, task: &Task, _phase: Phase) -> Result<PhaseResult> {
        if task.description.trim().is_empty() {
            bail!("cannot elaborate an empty task description");
        }
        Ok(self.reported_result.clone())
    }

    fn has_elaboration_capability(&self) -> bool {
        !self.members.is_empty()
    }
}
