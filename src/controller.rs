//! Reactive controller: owns the selection and decides what to recompute.
//!
//! One state, `Ready(selection)`. A change is validated by [`transition`];
//! invalid changes leave everything as it was and record a validation error.
//! Valid changes get a generation ticket; recomputation runs one at a time and
//! only the newest ticket may commit (last write wins).

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::algorithms::AlgorithmSet;
use crate::chart::ChartSlot;
use crate::error::{DashboardError, Result};
use crate::logging::{log_commit, log_validation_error};
use crate::pipeline::{ChartPanel, Pipeline};
use crate::selection::{ParamChange, Parameter, SelectionState};

/// Outcome of applying one change to a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SelectionState,
    pub changed: Vec<Parameter>,
    pub recompute: BTreeSet<ChartSlot>,
}

/// (old state, change) → (new state, slots to recompute). No I/O.
pub fn transition(
    old: &SelectionState,
    change: &ParamChange,
    algorithms: &AlgorithmSet,
) -> Result<Transition> {
    let next = change.apply(old, algorithms)?;
    next.validate(algorithms)?;
    let changed = old.diff(&next);
    let recompute = ChartSlot::affected_by(&changed);
    Ok(Transition {
        next,
        changed,
        recompute,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub selection: SelectionState,
    pub recompute: BTreeSet<ChartSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Committed { generation: u64, recomputed: Vec<ChartSlot> },
    Stale { generation: u64 },
    Rejected(DashboardError),
}

/// What the presentation layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSet {
    pub selection: SelectionState,
    pub displayed: Option<SelectionState>,
    pub generation: u64,
    pub panels: Vec<ChartPanel>,
    pub validation_error: Option<String>,
}

impl ChartSet {
    pub fn panel(&self, slot: ChartSlot) -> Option<&ChartPanel> {
        self.panels.iter().find(|p| p.slot == slot)
    }
}

#[derive(Debug)]
struct Inner {
    selection: SelectionState,
    displayed: Option<SelectionState>,
    panels: BTreeMap<ChartSlot, ChartPanel>,
    generation: u64,
    committed: u64,
    last_error: Option<DashboardError>,
}

#[derive(Debug)]
pub struct Controller {
    pipeline: Pipeline,
    inner: Mutex<Inner>,
    gate: tokio::sync::Mutex<()>,
}

impl Controller {
    pub fn new(pipeline: Pipeline, initial: SelectionState) -> Result<Self> {
        initial.validate(pipeline.algorithms())?;
        Ok(Self {
            pipeline,
            inner: Mutex::new(Inner {
                selection: initial,
                displayed: None,
                panels: BTreeMap::new(),
                generation: 0,
                committed: 0,
                last_error: None,
            }),
            gate: tokio::sync::Mutex::new(()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn selection(&self) -> SelectionState {
        self.lock().selection
    }

    pub fn last_error(&self) -> Option<DashboardError> {
        self.lock().last_error.clone()
    }

    pub fn snapshot(&self) -> ChartSet {
        let inner = self.lock();
        ChartSet {
            selection: inner.selection,
            displayed: inner.displayed,
            generation: inner.committed,
            panels: inner.panels.values().cloned().collect(),
            validation_error: inner.last_error.as_ref().map(|e| e.to_string()),
        }
    }

    /// Validates `change` against the latest accepted selection and issues a
    /// ticket. The ticket's scope is measured against what is on screen, so a
    /// superseded ticket never leaves stale slots behind.
    pub fn stage(&self, change: &ParamChange) -> Result<Ticket> {
        let mut inner = self.lock();
        let t = match transition(&inner.selection, change, self.pipeline.algorithms()) {
            Ok(t) => t,
            Err(err) => {
                if let DashboardError::InvalidSelection { parameter, value, reason } = &err {
                    log_validation_error(parameter, value, reason);
                }
                inner.last_error = Some(err.clone());
                return Err(err);
            }
        };
        inner.selection = t.next;
        inner.last_error = None;
        Ok(Self::issue(&mut inner, false))
    }

    /// Ticket that recomputes every slot for the current selection.
    pub fn stage_refresh(&self) -> Ticket {
        let mut inner = self.lock();
        Self::issue(&mut inner, true)
    }

    fn issue(inner: &mut Inner, full: bool) -> Ticket {
        inner.generation += 1;
        let recompute = match inner.displayed {
            Some(shown) if !full => ChartSlot::affected_by(&shown.diff(&inner.selection)),
            _ => ChartSlot::all(),
        };
        Ticket {
            generation: inner.generation,
            selection: inner.selection,
            recompute,
        }
    }

    pub fn is_stale(&self, ticket: &Ticket) -> bool {
        self.lock().generation != ticket.generation
    }

    /// Installs `panels` if `ticket` is still the newest one. Returns whether
    /// it committed.
    pub fn commit(&self, ticket: &Ticket, panels: Vec<ChartPanel>) -> bool {
        let mut inner = self.lock();
        let latest = inner.generation;
        if latest != ticket.generation {
            log_commit(ticket.generation, false, latest);
            return false;
        }
        for panel in panels {
            inner.panels.insert(panel.slot, panel);
        }
        inner.displayed = Some(ticket.selection);
        inner.committed = ticket.generation;
        log_commit(ticket.generation, true, latest);
        true
    }

    /// Runs a ticket to completion: waits its turn, skips work if superseded,
    /// computes the scoped slots and commits.
    pub async fn run(&self, ticket: Ticket) -> ApplyOutcome {
        let _turn = self.gate.lock().await;
        if self.is_stale(&ticket) {
            log_commit(ticket.generation, false, self.lock().generation);
            return ApplyOutcome::Stale {
                generation: ticket.generation,
            };
        }
        let panels = if ticket.recompute.is_empty() {
            Vec::new()
        } else {
            match self
                .pipeline
                .compute(&ticket.selection, &ticket.recompute, ticket.generation)
                .await
            {
                Ok(p) => p,
                Err(err) => {
                    self.lock().last_error = Some(err.clone());
                    return ApplyOutcome::Rejected(err);
                }
            }
        };
        if self.commit(&ticket, panels) {
            ApplyOutcome::Committed {
                generation: ticket.generation,
                recomputed: ticket.recompute.iter().copied().collect(),
            }
        } else {
            ApplyOutcome::Stale {
                generation: ticket.generation,
            }
        }
    }

    pub async fn apply(&self, change: ParamChange) -> ApplyOutcome {
        match self.stage(&change) {
            Ok(ticket) => self.run(ticket).await,
            Err(err) => ApplyOutcome::Rejected(err),
        }
    }

    /// Recomputes the full chart set for the current selection.
    pub async fn refresh(&self) -> ApplyOutcome {
        let ticket = self.stage_refresh();
        self.run(ticket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Algorithm;
    use crate::selection::{Alpha, ArmOrder, DistributionId};

    fn start() -> SelectionState {
        SelectionState::new(DistributionId::One, ArmOrder::OptimalFirst, Alpha::P01, Algorithm::Ucb)
    }

    #[test]
    fn test_alpha_change_recomputes_nothing() {
        let set = AlgorithmSet::canonical();
        let t = transition(&start(), &ParamChange::new(Parameter::Alpha, "0.05"), &set).unwrap();
        assert_eq!(t.next.config.alpha, Alpha::P05);
        assert_eq!(t.changed, vec![Parameter::Alpha]);
        assert!(t.recompute.is_empty());
    }

    #[test]
    fn test_focal_change_recomputes_histogram_only() {
        let set = AlgorithmSet::canonical();
        let t = transition(&start(), &ParamChange::new(Parameter::FocalAlgorithm, "ETC"), &set).unwrap();
        assert_eq!(t.recompute.into_iter().collect::<Vec<_>>(), vec![ChartSlot::RegretHistogram]);
    }

    #[test]
    fn test_same_value_is_noop() {
        let set = AlgorithmSet::canonical();
        let t = transition(&start(), &ParamChange::new(Parameter::Distribution, "dist1"), &set).unwrap();
        assert!(t.changed.is_empty());
        assert!(t.recompute.is_empty());
    }

    #[test]
    fn test_distribution_change_recomputes_everything() {
        let set = AlgorithmSet::canonical();
        let t = transition(&start(), &ParamChange::new(Parameter::Distribution, "dist3"), &set).unwrap();
        assert_eq!(t.recompute, ChartSlot::all());
    }

    #[test]
    fn test_invalid_change_is_rejected() {
        let set = AlgorithmSet::canonical();
        let err = transition(&start(), &ParamChange::new(Parameter::Alpha, "0.5"), &set).unwrap_err();
        assert_eq!(err.kind(), "invalid_selection");
    }
}
