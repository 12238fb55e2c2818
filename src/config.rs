//! Engine configuration.
//!
//! Every numeric knob passes through the sanitizers on the way in, so a
//! misconfigured caller can degrade behavior but never break the engine's
//! termination guarantees.

use serde::Deserialize;
use std::collections::HashMap;

use crate::phase::Phase;
use crate::sanitize::{sanitize_positive_int, sanitize_threshold};

/// Default maximum recursion depth for micro-cycles.
pub const DEFAULT_MAX_RECURSION_DEPTH: u32 = 3;
/// Default cap on micro-cycle iterations under one parent.
pub const DEFAULT_MAX_MICRO_CYCLE_ITERATIONS: u32 = 10;
/// Hard ceiling accepted for either counter, sanitized or not.
const COUNTER_CEILING: u32 = 100;

/// Sanitized configuration consumed by the coordinator and its managers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum depth a micro-cycle may reach below its root.
    pub max_recursion_depth: u32,
    /// Maximum micro-cycle iterations per parent cycle.
    pub max_micro_cycle_iterations: u32,
    /// Per-phase quality gate; absent means the gate is open.
    pub quality_thresholds: HashMap<Phase, f64>,
    /// Per-phase wall-clock budget in seconds; absent means no timeout.
    pub phase_timeouts: HashMap<Phase, f64>,
    /// Whether `decide_next_phase` may advance automatically.
    pub auto_phase_transitions: bool,
    /// When true, a missing manifest means "no dependencies" instead of
    /// "every dependency unmet".
    pub missing_manifest_means_no_deps: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_micro_cycle_iterations: DEFAULT_MAX_MICRO_CYCLE_ITERATIONS,
            quality_thresholds: HashMap::new(),
            phase_timeouts: HashMap::new(),
            auto_phase_transitions: true,
            missing_manifest_means_no_deps: false,
        }
    }
}

impl EngineConfig {
    /// Set the maximum recursion depth from an unsanitized value.
    pub fn with_max_recursion_depth(mut self, depth: f64) -> Self {
        self.max_recursion_depth = sanitize_positive_int(
            depth,
            DEFAULT_MAX_RECURSION_DEPTH,
            Some(COUNTER_CEILING),
        );
        self
    }

    /// Set the micro-cycle iteration cap from an unsanitized value.
    pub fn with_max_micro_cycle_iterations(mut self, iterations: f64) -> Self {
        self.max_micro_cycle_iterations = sanitize_positive_int(
            iterations,
            DEFAULT_MAX_MICRO_CYCLE_ITERATIONS,
            Some(COUNTER_CEILING),
        );
        self
    }

    /// Set a quality threshold for a phase from an unsanitized value.
    ///
    /// Out-of-range values fall back to no gating at all rather than an
    /// arbitrary default threshold.
    pub fn with_quality_threshold(mut self, phase: Phase, threshold: f64) -> Self {
        // Negative sentinel cannot collide with a legal threshold, so the
        // sanitizer is the single range gate here.
        let sanitized = sanitize_threshold(threshold, -1.0);
        if sanitized >= 0.0 {
            self.quality_thresholds.insert(phase, sanitized);
        } else {
            self.quality_thresholds.remove(&phase);
        }
        self
    }

    /// Set a phase timeout in seconds; non-positive or non-finite values
    /// remove the timeout.
    pub fn with_phase_timeout(mut self, phase: Phase, seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            self.phase_timeouts.insert(phase, seconds);
        } else {
            self.phase_timeouts.remove(&phase);
        }
        self
    }

    /// Enable or disable automatic phase transitions.
    pub fn with_auto_phase_transitions(mut self, enabled: bool) -> Self {
        self.auto_phase_transitions = enabled;
        self
    }

    /// Treat a missing manifest as "no dependencies".
    pub fn with_missing_manifest_means_no_deps(mut self, enabled: bool) -> Self {
        self.missing_manifest_means_no_deps = enabled;
        self
    }

    /// Quality threshold configured for a phase, if any.
    pub fn quality_threshold(&self, phase: Phase) -> Option<f64> {
        self.quality_thresholds.get(&phase).copied()
    }

    /// Timeout in seconds configured for a phase, if any.
    pub fn phase_timeout(&self, phase: Phase) -> Option<f64> {
        self.phase_timeouts.get(&phase).copied()
    }

    /// Build a sanitized config from a raw deserialized form.
    pub fn from_raw(raw: RawEngineConfig) -> Self {
        let mut config = EngineConfig::default()
            .with_auto_phase_transitions(raw.auto_phase_transitions.unwrap_or(true))
            .with_missing_manifest_means_no_deps(
                raw.missing_manifest_means_no_deps.unwrap_or(false),
            );
        if let Some(depth) = raw.max_recursion_depth {
            config = config.with_max_recursion_depth(depth);
        }
        if let Some(iterations) = raw.max_micro_cycle_iterations {
            config = config.with_max_micro_cycle_iterations(iterations);
        }
        for (phase, threshold) in raw.quality_thresholds {
            config = config.with_quality_threshold(phase, threshold);
        }
        for (phase, seconds) in raw.phase_timeouts {
            config = config.with_phase_timeout(phase, seconds);
        }
        config
    }
}

/// Unsanitized configuration as it arrives from a file or an embedding
/// application. `EngineConfig::from_raw` is the only way in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub max_recursion_depth: Option<f64>,
    #[serde(default)]
    pub max_micro_cycle_iterations: Option<f64>,
    #[serde(default)]
    pub quality_thresholds: HashMap<Phase, f64>,
    #[serde(default)]
    pub phase_timeouts: HashMap<Phase, f64>,
    #[serde(default)]
    pub auto_phase_transitions: Option<bool>,
    #[serde(default)]
    pub missing_manifest_means_no_deps: Option<bool>,
}
