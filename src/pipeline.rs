//! One recomputation: resolve → load → aggregate → build.
//!
//! Table failures are scoped per algorithm: a chart drops the algorithms whose
//! tables failed and lists their errors. A slot fails only when none of the
//! tables it reads loaded.
//! All loads for a recomputation finish before any panel is assembled.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::aggregate;
use crate::algorithms::{Algorithm, AlgorithmSet};
use crate::chart::{self, ChartSlot, ChartSpec};
use crate::error::{DashboardError, Result};
use crate::logging::{log_chart_failed, log_chart_partial, log_recompute, ProfileScope};
use crate::resolver::{resolve_for_slots, ResultTableId, TableKind};
use crate::selection::SelectionState;
use crate::store::{AveragedResultTable, ResultTable, TableStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelOutcome {
    Ready { spec: ChartSpec },
    Failed { errors: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    pub slot: ChartSlot,
    #[serde(flatten)]
    pub outcome: PanelOutcome,
}

impl ChartPanel {
    pub fn spec(&self) -> Option<&ChartSpec> {
        match &self.outcome {
            PanelOutcome::Ready { spec } => Some(spec),
            PanelOutcome::Failed { .. } => None,
        }
    }

    /// Failed panels carry every cause; ready panels carry the errors of
    /// algorithms that were left out.
    pub fn errors(&self) -> &[String] {
        match &self.outcome {
            PanelOutcome::Ready { spec } => &spec.errors,
            PanelOutcome::Failed { errors } => errors,
        }
    }

    fn failed(slot: ChartSlot, errors: Vec<String>) -> Self {
        log_chart_failed(slot.as_str(), &errors.join("; "));
        Self {
            slot,
            outcome: PanelOutcome::Failed { errors },
        }
    }

    fn ready(spec: ChartSpec) -> Self {
        Self {
            slot: spec.slot,
            outcome: PanelOutcome::Ready { spec },
        }
    }
}

pub type LoadedTables = HashMap<ResultTableId, Result<Arc<ResultTable>>>;

fn lookup<'a>(tables: &'a LoadedTables, id: &ResultTableId) -> std::result::Result<&'a ResultTable, String> {
    match tables.get(id) {
        Some(Ok(t)) => Ok(t.as_ref()),
        Some(Err(e)) => Err(e.to_string()),
        None => Err(format!("table {} was not loaded", id)),
    }
}

/// Averaged tables that loaded, in palette order, and the errors of those
/// that did not.
struct AveragedInputs<'a> {
    tables: Vec<(Algorithm, &'a AveragedResultTable)>,
    errors: Vec<String>,
}

fn averaged_inputs<'a>(
    selection: &SelectionState,
    algorithms: &AlgorithmSet,
    tables: &'a LoadedTables,
) -> AveragedInputs<'a> {
    let mut inputs = AveragedInputs {
        tables: Vec::with_capacity(algorithms.len()),
        errors: Vec::new(),
    };
    for algorithm in algorithms.algorithms() {
        let id = ResultTableId::new(algorithm, selection.config, TableKind::Averaged);
        match lookup(tables, &id) {
            Ok(t) => match t.averaged() {
                Some(avg) => inputs.tables.push((algorithm, avg)),
                None => inputs.errors.push(
                    DashboardError::malformed(&t.path, "expected an averaged table").to_string(),
                ),
            },
            Err(e) => inputs.errors.push(e),
        }
    }
    inputs
}

/// Builds the requested panels from already-loaded tables. Pure apart from logging.
pub fn assemble(
    selection: &SelectionState,
    slots: &BTreeSet<ChartSlot>,
    tables: &LoadedTables,
    algorithms: &AlgorithmSet,
    horizon: u64,
) -> Vec<ChartPanel> {
    let averaged = if slots.iter().any(|s| s.needs_averaged()) {
        Some(averaged_inputs(selection, algorithms, tables))
    } else {
        None
    };

    let mut panels = Vec::with_capacity(slots.len());
    for slot in slots {
        if slot.needs_focal_raw() {
            let id = ResultTableId::new(selection.focal, selection.config, TableKind::Raw);
            let panel = match lookup(tables, &id) {
                Ok(t) => match t.raw() {
                    Some(raw) => {
                        let hist = aggregate::regret_histogram(selection.focal, raw, horizon);
                        ChartPanel::ready(chart::histogram_chart(&hist, algorithms))
                    }
                    None => ChartPanel::failed(
                        *slot,
                        vec![DashboardError::malformed(&t.path, "expected a raw table").to_string()],
                    ),
                },
                Err(e) => ChartPanel::failed(*slot, vec![e]),
            };
            panels.push(panel);
            continue;
        }

        let (inputs, errors) = match &averaged {
            Some(a) if a.tables.is_empty() && !a.errors.is_empty() => {
                panels.push(ChartPanel::failed(*slot, a.errors.clone()));
                continue;
            }
            Some(a) => (a.tables.as_slice(), &a.errors),
            None => continue,
        };
        let mut spec = match slot {
            ChartSlot::Reward => chart::reward_chart(&aggregate::reward_series(inputs), algorithms),
            ChartSlot::Regret => chart::regret_chart(&aggregate::regret_series(inputs), algorithms),
            ChartSlot::TerminalOutcomes => {
                chart::terminal_outcomes_chart(&aggregate::terminal_outcomes(inputs), algorithms)
            }
            ChartSlot::TerminalRegret => {
                chart::terminal_regret_chart(&aggregate::terminal_regret(inputs), algorithms)
            }
            ChartSlot::SuboptimalRatio => {
                chart::suboptimal_chart(&aggregate::suboptimal_ratio(inputs), algorithms)
            }
            ChartSlot::RegretHistogram => continue,
        };
        if !errors.is_empty() {
            log_chart_partial(slot.as_str(), errors.len(), &errors.join("; "));
            spec.errors = errors.clone();
        }
        panels.push(ChartPanel::ready(spec));
    }
    panels
}

/// Resolver, store and builder wired together for one session.
#[derive(Debug, Clone)]
pub struct Pipeline {
    algorithms: AlgorithmSet,
    store: Arc<TableStore>,
    horizon: u64,
}

impl Pipeline {
    pub fn new(algorithms: AlgorithmSet, store: Arc<TableStore>, horizon: u64) -> Self {
        Self {
            algorithms,
            store,
            horizon,
        }
    }

    pub fn algorithms(&self) -> &AlgorithmSet {
        &self.algorithms
    }

    pub fn store(&self) -> &Arc<TableStore> {
        &self.store
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// Fails only with `InvalidSelection`; table problems end up in panels.
    pub async fn compute(
        &self,
        selection: &SelectionState,
        slots: &BTreeSet<ChartSlot>,
        generation: u64,
    ) -> Result<Vec<ChartPanel>> {
        let ids = resolve_for_slots(selection, &self.algorithms, slots)?;
        let slot_names: Vec<&str> = slots.iter().map(|s| s.as_str()).collect();
        log_recompute(generation, &slot_names, ids.len());
        let _scope = ProfileScope::new("recompute");

        let tables: LoadedTables = self.store.load_many(&ids).await.into_iter().collect();
        Ok(assemble(selection, slots, &tables, &self.algorithms, self.horizon))
    }
}
