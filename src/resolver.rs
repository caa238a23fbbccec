//! Selection → result table identifiers → file locations.
//!
//! Pure and I/O free. The store trusts that every id it receives came from
//! here, so all domain checks happen before a path is ever built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::algorithms::{Algorithm, AlgorithmSet};
use crate::chart::ChartSlot;
use crate::error::Result;
use crate::selection::{ArmOrder, DistributionId, ExperimentConfig, SelectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// One row per replicate and timestep.
    Raw,
    /// One row per timestep, averaged over replicates.
    Averaged,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Averaged => "averaged",
        }
    }

    fn file_infix(&self) -> &'static str {
        match self {
            Self::Raw => "results",
            Self::Averaged => "average_results",
        }
    }
}

/// File naming conventions seen upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// `{stem}_results_{order}_ver{dist}.csv`
    Canonical,
    /// `{stem}_results.csv`, written before runs were split by configuration.
    /// Only the migration tool reads these.
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultTableId {
    pub algorithm: Algorithm,
    pub config: ExperimentConfig,
    pub kind: TableKind,
}

impl ResultTableId {
    pub fn new(algorithm: Algorithm, config: ExperimentConfig, kind: TableKind) -> Self {
        Self {
            algorithm,
            config,
            kind,
        }
    }

    pub fn file_name(&self) -> String {
        file_name(
            self.algorithm,
            self.kind,
            self.config.distribution,
            self.config.arm_order,
            NamingScheme::Canonical,
        )
    }

    /// Storage location under `root`. Alpha does not take part: upstream
    /// writes one file per (algorithm, distribution, arm order, kind).
    pub fn location(&self, root: &Path) -> PathBuf {
        root.join(self.file_name())
    }
}

impl fmt::Display for ResultTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/dist{}/{}",
            self.algorithm,
            self.kind.as_str(),
            self.config.distribution.number(),
            self.config.arm_order.token()
        )
    }
}

pub fn file_name(
    algorithm: Algorithm,
    kind: TableKind,
    distribution: DistributionId,
    arm_order: ArmOrder,
    scheme: NamingScheme,
) -> String {
    match scheme {
        NamingScheme::Canonical => format!(
            "{}_{}_{}_ver{}.csv",
            algorithm.file_stem(),
            kind.file_infix(),
            arm_order.token(),
            distribution.number()
        ),
        NamingScheme::Legacy => format!("{}_{}.csv", algorithm.file_stem(), kind.file_infix()),
    }
}

/// Every table the full chart set needs: averaged tables in palette order,
/// then the focal algorithm's raw table.
pub fn resolve(selection: &SelectionState, algorithms: &AlgorithmSet) -> Result<Vec<ResultTableId>> {
    resolve_for_slots(selection, algorithms, &ChartSlot::all())
}

/// Tables needed by `slots` only, in the same order as [`resolve`].
pub fn resolve_for_slots(
    selection: &SelectionState,
    algorithms: &AlgorithmSet,
    slots: &BTreeSet<ChartSlot>,
) -> Result<Vec<ResultTableId>> {
    selection.validate(algorithms)?;

    let mut ids = Vec::with_capacity(algorithms.len() + 1);
    if slots.iter().any(|s| s.needs_averaged()) {
        for algorithm in algorithms.algorithms() {
            ids.push(ResultTableId::new(algorithm, selection.config, TableKind::Averaged));
        }
    }
    if slots.iter().any(|s| s.needs_focal_raw()) {
        let raw = ResultTableId::new(selection.focal, selection.config, TableKind::Raw);
        if !ids.contains(&raw) {
            ids.push(raw);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Alpha;

    fn all_selections() -> Vec<SelectionState> {
        let mut out = Vec::new();
        for d in DistributionId::ALL {
            for o in ArmOrder::ALL {
                for a in Alpha::ALL {
                    for f in Algorithm::ALL {
                        out.push(SelectionState::new(d, o, a, f));
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_canonical_file_names() {
        let cfg = ExperimentConfig {
            distribution: DistributionId::Two,
            arm_order: ArmOrder::SuboptimalFirst,
            alpha: Alpha::P05,
        };
        let raw = ResultTableId::new(Algorithm::Ucb, cfg, TableKind::Raw);
        let avg = ResultTableId::new(Algorithm::Ucb, cfg, TableKind::Averaged);
        assert_eq!(raw.file_name(), "3_UCB_results_other_ver2.csv");
        assert_eq!(avg.file_name(), "3_UCB_average_results_other_ver2.csv");
    }

    #[test]
    fn test_legacy_file_names() {
        let name = file_name(
            Algorithm::Etc,
            TableKind::Averaged,
            DistributionId::One,
            ArmOrder::OptimalFirst,
            NamingScheme::Legacy,
        );
        assert_eq!(name, "1_ETC_average_results.csv");
    }

    #[test]
    fn test_resolve_is_nonempty_unique_and_stable() {
        let set = AlgorithmSet::canonical();
        for sel in all_selections() {
            let a = resolve(&sel, &set).unwrap();
            let b = resolve(&sel, &set).unwrap();
            assert!(!a.is_empty());
            assert_eq!(a, b);
            let unique: BTreeSet<_> = a.iter().collect();
            assert_eq!(unique.len(), a.len());
            assert_eq!(a.len(), 10);
            assert_eq!(a.last().map(|id| id.kind), Some(TableKind::Raw));
            assert_eq!(a.last().map(|id| id.algorithm), Some(sel.focal));
        }
    }

    #[test]
    fn test_alpha_does_not_change_locations() {
        let set = AlgorithmSet::canonical();
        let root = Path::new("/data");
        let a = SelectionState::new(DistributionId::One, ArmOrder::OptimalFirst, Alpha::P01, Algorithm::Ucb);
        let b = SelectionState::new(DistributionId::One, ArmOrder::OptimalFirst, Alpha::P10, Algorithm::Ucb);
        let la: Vec<_> = resolve(&a, &set).unwrap().iter().map(|id| id.location(root)).collect();
        let lb: Vec<_> = resolve(&b, &set).unwrap().iter().map(|id| id.location(root)).collect();
        assert_eq!(la, lb);
    }

    #[test]
    fn test_focal_outside_set_fails_before_resolution() {
        let set = AlgorithmSet::with_default_colors(&[Algorithm::Etc]);
        let sel = SelectionState::new(DistributionId::One, ArmOrder::OptimalFirst, Alpha::P01, Algorithm::Ucb);
        let err = resolve(&sel, &set).unwrap_err();
        assert_eq!(err.kind(), "invalid_selection");
    }

    #[test]
    fn test_histogram_slot_needs_only_focal_raw() {
        let set = AlgorithmSet::canonical();
        let sel = SelectionState::new(DistributionId::One, ArmOrder::OptimalFirst, Alpha::P01, Algorithm::Greedy);
        let slots: BTreeSet<_> = [ChartSlot::RegretHistogram].into_iter().collect();
        let ids = resolve_for_slots(&sel, &set, &slots).unwrap();
        assert_eq!(ids, vec![ResultTableId::new(Algorithm::Greedy, sel.config, TableKind::Raw)]);
        assert!(resolve_for_slots(&sel, &set, &BTreeSet::new()).unwrap().is_empty());
    }
}
