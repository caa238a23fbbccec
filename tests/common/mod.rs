#![allow(dead_code)]

use banditdash::algorithms::{Algorithm, AlgorithmSet};
use banditdash::pipeline::Pipeline;
use banditdash::resolver::{ResultTableId, TableKind};
use banditdash::selection::{Alpha, ArmOrder, DistributionId, ExperimentConfig, SelectionState};
use banditdash::store::{TableStore, AVERAGED_COLUMNS, RAW_COLUMNS};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const TIMESTEPS: [u64; 3] = [1, 10, 100];

pub fn write_csv(path: &Path, header: &[&str], rows: &[String]) {
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

pub fn config(distribution: DistributionId, arm_order: ArmOrder) -> ExperimentConfig {
    SelectionState::new(distribution, arm_order, Alpha::P05, Algorithm::Ucb).config
}

/// Averaged table with linear regret `slope * t` and suboptimal pulls `0.25 * t`.
pub fn write_averaged(root: &Path, algorithm: Algorithm, cfg: ExperimentConfig, slope: f64) {
    let rows: Vec<String> = TIMESTEPS
        .iter()
        .map(|t| {
            let t = *t as f64;
            format!(
                "{},{},{},{},{},{}",
                t,
                0.8 * t,
                slope * t,
                0.2 * t,
                0.8 * t,
                0.25 * t
            )
        })
        .collect();
    let id = ResultTableId::new(algorithm, cfg, TableKind::Averaged);
    write_csv(&id.location(root), &AVERAGED_COLUMNS, &rows);
}

/// Raw replicate table: three replicates at each timestep.
pub fn write_raw(root: &Path, algorithm: Algorithm, cfg: ExperimentConfig, horizon: u64) {
    let mut rows = Vec::new();
    for rep in 0..3u64 {
        rows.push(format!("{},{}", horizon / 2, rep));
        rows.push(format!("{},{}", horizon, 10 + rep));
    }
    let id = ResultTableId::new(algorithm, cfg, TableKind::Raw);
    write_csv(&id.location(root), &RAW_COLUMNS, &rows);
}

/// Every table for one configuration.
pub fn write_config(root: &Path, cfg: ExperimentConfig, horizon: u64) {
    for (i, algorithm) in Algorithm::ALL.iter().enumerate() {
        write_averaged(root, *algorithm, cfg, 0.1 * (i + 1) as f64);
        write_raw(root, *algorithm, cfg, horizon);
    }
}

pub fn pipeline(root: &Path, horizon: u64) -> Pipeline {
    let store = Arc::new(TableStore::with_concurrency(root, 4));
    Pipeline::new(AlgorithmSet::canonical(), store, horizon)
}
