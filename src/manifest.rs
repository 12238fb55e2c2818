//! Dependency manifest for phase transitions.
//!
//! The manifest declares, per phase, which prerequisites must hold before
//! the engine may enter that phase. A dependency names either an earlier
//! phase (met when that phase's recorded result is complete) or a key in
//! the cycle's accumulated context (met when present).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::cycle::Cycle;
use crate::errors::OrchestrationError;
use crate::phase::Phase;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Dependency names required before entering each phase.
    #[serde(default)]
    pub dependencies: HashMap<Phase, Vec<String>>,
}

impl Manifest {
    /// A manifest with no dependencies for any phase.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The natural chain: each phase requires the preceding phase's
    /// completion; Expand requires nothing.
    pub fn default_dependencies() -> Self {
        let mut dependencies = HashMap::new();
        dependencies.insert(Phase::Differentiate, vec!["expand".to_string()]);
        dependencies.insert(Phase::Refine, vec!["differentiate".to_string()]);
        dependencies.insert(Phase::Retrospect, vec!["refine".to_string()]);
        Self { dependencies }
    }

    /// Add a dependency for a phase.
    pub fn require(mut self, phase: Phase, dependency: impl Into<String>) -> Self {
        self.dependencies
            .entry(phase)
            .or_default()
            .push(dependency.into());
        self
    }

    /// Load a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest JSON: {}", path.display()))?;
        Ok(manifest)
    }

    /// Save the manifest to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize manifest to JSON")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write manifest file: {}", path.display()))?;
        Ok(())
    }

    /// Check every dependency declared for `phase` against the cycle.
    ///
    /// Fails with the first unmet dependency by name; no partial evaluation
    /// state leaks into the cycle.
    pub fn check_phase_dependencies(
        &self,
        cycle: &Cycle,
        phase: Phase,
    ) -> Result<(), OrchestrationError> {
        let Some(deps) = self.dependencies.get(&phase) else {
            return Ok(());
        };
        for dependency in deps {
            if !self.dependency_met(cycle, dependency) {
                return Err(OrchestrationError::UnmetDependency {
                    phase,
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    fn dependency_met(&self, cycle: &Cycle, dependency: &str) -> bool {
        // Phase-name dependencies check the recorded result; anything else
        // is a context key.
        let as_phase = Phase::ALL.iter().find(|p| p.as_str() == dependency);
        match as_phase {
            Some(&phase) => cycle
                .phase_result(phase)
                .map(|r| r.phase_complete)
                .unwrap_or(false),
            None => cycle.context.contains_key(dependency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::Task;
    use crate::phase::PhaseResult;
    use tempfile::tempdir;

    #[test]
    fn test_empty_manifest_passes_everything() {
        let manifest = Manifest::empty();
        let cycle = Cycle::new(Task::new("t"));
        for phase in Phase::ALL {
            assert!(manifest.check_phase_dependencies(&cycle, phase).is_ok());
        }
    }

    #[test]
    fn test_default_chain_blocks_until_previous_phase_complete() {
        let manifest = Manifest::default_dependencies();
        let mut cycle = Cycle::new(Task::new("t"));

        let err = manifest
            .check_phase_dependencies(&cycle, Phase::Differentiate)
            .unwrap_err();
        match err {
            OrchestrationError::UnmetDependency { phase, dependency } => {
                assert_eq!(phase, Phase::Differentiate);
                assert_eq!(dependency, "expand");
            }
            other => panic!("Expected UnmetDependency, got {other:?}"),
        }

        cycle.record_result(Phase::Expand, PhaseResult::new(true, 0.9));
        assert!(
            manifest
                .check_phase_dependencies(&cycle, Phase::Differentiate)
                .is_ok()
        );
    }

    #[test]
    fn test_incomplete_phase_result_does_not_satisfy() {
        let manifest = Manifest::default_dependencies();
        let mut cycle = Cycle::new(Task::new("t"));
        cycle.record_result(Phase::Expand, PhaseResult::new(false, 0.9));
        assert!(
            manifest
                .check_phase_dependencies(&cycle, Phase::Differentiate)
                .is_err()
        );
    }

    #[test]
    fn test_context_key_dependency() {
        let manifest = Manifest::empty().require(Phase::Refine, "requirements");
        let mut cycle = Cycle::new(Task::new("t"));

        assert!(
            manifest
                .check_phase_dependencies(&cycle, Phase::Refine)
                .is_err()
        );

        let mut entries = serde_json::Map::new();
        entries.insert("requirements".into(), serde_json::json!(["r1"]));
        cycle.merge_context(entries);
        assert!(
            manifest
                .check_phase_dependencies(&cycle, Phase::Refine)
                .is_ok()
        );
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let manifest = Manifest::default_dependencies().require(Phase::Expand, "charter");

        manifest.save(&path).unwrap();
        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(
            loaded.dependencies[&Phase::Expand],
            vec!["charter".to_string()]
        );
        assert_eq!(
            loaded.dependencies[&Phase::Retrospect],
            vec!["refine".to_string()]
        );
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = Manifest::load(Path::new("/nonexistent/manifest.json"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read manifest file")
        );
    }
}
