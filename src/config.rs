use std::path::PathBuf;

use crate::aggregate::DEFAULT_HORIZON;
use crate::algorithms::AlgorithmSet;
use crate::error::Result;
use crate::selection::SelectionState;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub horizon: u64,
    pub port: u16,
    pub load_concurrency: usize,
    pub default_distribution: String,
    pub default_arm_order: String,
    pub default_alpha: String,
    pub default_algorithm: String,
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "2_algorithms_results".to_string())),
            horizon: std::env::var("HORIZON").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_HORIZON),
            port: std::env::var("DASH_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8050),
            load_concurrency: std::env::var("LOAD_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or_else(num_cpus::get),
            default_distribution: std::env::var("DEFAULT_DIST").unwrap_or_else(|_| "dist1".to_string()),
            default_arm_order: std::env::var("DEFAULT_ORDER").unwrap_or_else(|_| "optimal".to_string()),
            default_alpha: std::env::var("DEFAULT_ALPHA").unwrap_or_else(|_| "0.01".to_string()),
            default_algorithm: std::env::var("DEFAULT_ALGORITHM").unwrap_or_else(|_| "UCB".to_string()),
        }
    }

    /// Initial selection; fails if any default is outside its domain.
    pub fn initial_selection(&self, algorithms: &AlgorithmSet) -> Result<SelectionState> {
        SelectionState::parse(
            &self.default_distribution,
            &self.default_arm_order,
            &self.default_alpha,
            &self.default_algorithm,
            algorithms,
        )
    }
}
