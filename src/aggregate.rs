//! Per-chart data transforms over loaded tables.
//!
//! Every function is pure. Inputs arrive in palette order and outputs keep
//! it, so trace order never depends on map iteration. Rows are never assumed
//! sorted: series are sorted by timestep here, terminal values come from the
//! maximum timestep rather than the last row.

use serde::Serialize;

use crate::algorithms::Algorithm;
use crate::store::{AveragedResultTable, AveragedRow, RawResultTable};

pub const DEFAULT_HORIZON: u64 = 100_000;

/// One (timestep, value) curve for one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub algorithm: Algorithm,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.0).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.1).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Final-timestep summary values for one algorithm. Empty vectors mean the
/// table had no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalOutcome {
    pub algorithm: Algorithm,
    pub timestep: Option<u64>,
    pub zeros: Vec<f64>,
    pub ones: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalValue {
    pub algorithm: Algorithm,
    pub timestep: Option<u64>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub algorithm: Algorithm,
    pub horizon: u64,
    pub values: Vec<f64>,
}

/// Items plus human-readable notes about empty or skipped data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSet<T> {
    pub items: Vec<T>,
    pub notes: Vec<String>,
}

impl<T> SeriesSet<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            notes: Vec::new(),
        }
    }
}

fn sorted_rows(table: &AveragedResultTable) -> Vec<&AveragedRow> {
    let mut rows: Vec<&AveragedRow> = table.rows.iter().collect();
    rows.sort_by_key(|r| r.timestep);
    rows
}

fn time_series<F>(tables: &[(Algorithm, &AveragedResultTable)], value: F) -> SeriesSet<Series>
where
    F: Fn(&AveragedRow) -> f64,
{
    let mut out = SeriesSet::new();
    for (algorithm, table) in tables {
        if table.rows.is_empty() {
            out.notes.push(format!("{}: no rows", algorithm));
        }
        let points = sorted_rows(table)
            .into_iter()
            .map(|r| (r.timestep as f64, value(r)))
            .collect();
        out.items.push(Series {
            algorithm: *algorithm,
            points,
        });
    }
    out
}

pub fn reward_series(tables: &[(Algorithm, &AveragedResultTable)]) -> SeriesSet<Series> {
    time_series(tables, |r| r.avg_total_reward)
}

pub fn regret_series(tables: &[(Algorithm, &AveragedResultTable)]) -> SeriesSet<Series> {
    time_series(tables, |r| r.avg_regret)
}

/// Row with the maximum timestep, whatever its storage position.
pub fn terminal_row(table: &AveragedResultTable) -> Option<&AveragedRow> {
    table.rows.iter().max_by_key(|r| r.timestep)
}

pub fn terminal_outcomes(tables: &[(Algorithm, &AveragedResultTable)]) -> SeriesSet<TerminalOutcome> {
    let mut out = SeriesSet::new();
    for (algorithm, table) in tables {
        let item = match terminal_row(table) {
            Some(row) => TerminalOutcome {
                algorithm: *algorithm,
                timestep: Some(row.timestep),
                zeros: vec![row.avg_zeros],
                ones: vec![row.avg_ones],
            },
            None => {
                out.notes.push(format!("{}: no rows", algorithm));
                TerminalOutcome {
                    algorithm: *algorithm,
                    timestep: None,
                    zeros: Vec::new(),
                    ones: Vec::new(),
                }
            }
        };
        out.items.push(item);
    }
    out
}

pub fn terminal_regret(tables: &[(Algorithm, &AveragedResultTable)]) -> SeriesSet<TerminalValue> {
    let mut out = SeriesSet::new();
    for (algorithm, table) in tables {
        let row = terminal_row(table);
        if row.is_none() {
            out.notes.push(format!("{}: no rows", algorithm));
        }
        out.items.push(TerminalValue {
            algorithm: *algorithm,
            timestep: row.map(|r| r.timestep),
            values: row.map(|r| vec![r.avg_regret]).unwrap_or_default(),
        });
    }
    out
}

/// Total regret of every replicate that reached `horizon`. Empty when the
/// data stops short of it.
pub fn regret_histogram(algorithm: Algorithm, table: &RawResultTable, horizon: u64) -> Histogram {
    Histogram {
        algorithm,
        horizon,
        values: table
            .rows
            .iter()
            .filter(|r| r.timestep == horizon)
            .map(|r| r.total_regret)
            .collect(),
    }
}

/// Suboptimal pulls per timestep. Rows at timestep 0 are skipped.
pub fn suboptimal_ratio(tables: &[(Algorithm, &AveragedResultTable)]) -> SeriesSet<Series> {
    let mut out = SeriesSet::new();
    for (algorithm, table) in tables {
        if table.rows.is_empty() {
            out.notes.push(format!("{}: no rows", algorithm));
        }
        let mut skipped = 0usize;
        let mut points = Vec::with_capacity(table.rows.len());
        for r in sorted_rows(table) {
            let ratio = r.avg_suboptimal / r.timestep as f64;
            if r.timestep == 0 || !ratio.is_finite() {
                skipped += 1;
                continue;
            }
            points.push((r.timestep as f64, ratio));
        }
        if skipped > 0 {
            out.notes.push(format!("{}: skipped {} row(s) at timestep 0", algorithm, skipped));
        }
        out.items.push(Series {
            algorithm: *algorithm,
            points,
        });
    }
    out
}
