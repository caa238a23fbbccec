//! Moves legacy, configuration-independent result files to canonical names.
//!
//! Old runs wrote `{stem}_results.csv` without recording which distribution
//! or arm order they used. The operator states it; the files are copied, never
//! moved or overwritten.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::algorithms::AlgorithmSet;
use crate::error::{DashboardError, Result};
use crate::resolver::{file_name, NamingScheme, TableKind};
use crate::selection::{ArmOrder, DistributionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Copy,
    SkipMissingSource,
    SkipTargetExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStep {
    pub from: PathBuf,
    pub to: PathBuf,
    pub action: StepAction,
}

pub fn plan(
    dir: &Path,
    distribution: DistributionId,
    arm_order: ArmOrder,
    algorithms: &AlgorithmSet,
) -> Vec<MigrationStep> {
    let mut steps = Vec::new();
    for algorithm in algorithms.algorithms() {
        for kind in [TableKind::Raw, TableKind::Averaged] {
            let from = dir.join(file_name(algorithm, kind, distribution, arm_order, NamingScheme::Legacy));
            let to = dir.join(file_name(algorithm, kind, distribution, arm_order, NamingScheme::Canonical));
            let action = if !from.exists() {
                StepAction::SkipMissingSource
            } else if to.exists() {
                StepAction::SkipTargetExists
            } else {
                StepAction::Copy
            };
            steps.push(MigrationStep { from, to, action });
        }
    }
    steps
}

/// Executes the `Copy` steps. Stops at the first I/O failure.
pub fn apply(steps: &[MigrationStep]) -> Result<usize> {
    let mut copied = 0;
    for step in steps.iter().filter(|s| s.action == StepAction::Copy) {
        std::fs::copy(&step.from, &step.to).map_err(|e| DashboardError::Io {
            path: step.to.clone(),
            message: e.to_string(),
        })?;
        copied += 1;
    }
    Ok(copied)
}
