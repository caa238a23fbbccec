//! Result table store: reads, validates and caches per-algorithm CSV tables.
//!
//! Columns are located by header name, so extra upstream columns (including
//! an unnamed index column) are tolerated. Nothing is defaulted: a table either
//! parses completely or the load fails with a typed error.

use csv::{ReaderBuilder, StringRecord, Trim};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

use crate::error::{DashboardError, Result};
use crate::logging::{log, log_table_failed, log_table_loaded, obj, v_str, Domain, Level, ProfileScope};
use crate::resolver::{ResultTableId, TableKind};

pub const TIMESTEP: &str = "Timestep";
pub const TOTAL_REGRET: &str = "Total Regret";
pub const AVG_TOTAL_REWARD: &str = "Average Total Reward";
pub const AVG_REGRET: &str = "Average Regret";
pub const AVG_ZEROS: &str = "Average Zeros Count";
pub const AVG_ONES: &str = "Average Ones Count";
pub const AVG_SUBOPTIMAL: &str = "Average Suboptimal Arms";

pub const RAW_COLUMNS: [&str; 2] = [TIMESTEP, TOTAL_REGRET];
pub const AVERAGED_COLUMNS: [&str; 6] = [
    TIMESTEP,
    AVG_TOTAL_REWARD,
    AVG_REGRET,
    AVG_ZEROS,
    AVG_ONES,
    AVG_SUBOPTIMAL,
];

pub fn required_columns(kind: TableKind) -> &'static [&'static str] {
    match kind {
        TableKind::Raw => &RAW_COLUMNS,
        TableKind::Averaged => &AVERAGED_COLUMNS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub timestep: u64,
    pub total_regret: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedRow {
    pub timestep: u64,
    pub avg_total_reward: f64,
    pub avg_regret: f64,
    pub avg_zeros: f64,
    pub avg_ones: f64,
    pub avg_suboptimal: f64,
}

/// Per-replicate rows. Timesteps repeat, one row per replicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResultTable {
    pub rows: Vec<RawRow>,
}

/// Per-timestep averages. Rows are kept in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AveragedResultTable {
    pub rows: Vec<AveragedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    Raw(RawResultTable),
    Averaged(AveragedResultTable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub path: PathBuf,
    pub sha256: String,
    pub columns: Vec<String>,
    pub data: TableData,
    pub warnings: Vec<String>,
}

impl ResultTable {
    pub fn kind(&self) -> TableKind {
        match self.data {
            TableData::Raw(_) => TableKind::Raw,
            TableData::Averaged(_) => TableKind::Averaged,
        }
    }

    pub fn raw(&self) -> Option<&RawResultTable> {
        match &self.data {
            TableData::Raw(t) => Some(t),
            TableData::Averaged(_) => None,
        }
    }

    pub fn averaged(&self) -> Option<&AveragedResultTable> {
        match &self.data {
            TableData::Averaged(t) => Some(t),
            TableData::Raw(_) => None,
        }
    }

    pub fn row_count(&self) -> usize {
        match &self.data {
            TableData::Raw(t) => t.rows.len(),
            TableData::Averaged(t) => t.rows.len(),
        }
    }

    fn timesteps(&self) -> Vec<u64> {
        match &self.data {
            TableData::Raw(t) => t.rows.iter().map(|r| r.timestep).collect(),
            TableData::Averaged(t) => t.rows.iter().map(|r| r.timestep).collect(),
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DashboardError::malformed(path, format!("missing column {:?}", name)))
}

fn field<'a>(record: &'a StringRecord, idx: usize, name: &str, line: u64, path: &Path) -> Result<&'a str> {
    record.get(idx).ok_or_else(|| {
        DashboardError::malformed(path, format!("line {}: no value for {:?}", line, name))
    })
}

/// 2^64; every integral float below it fits in a `u64`.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Integer timesteps; pandas may emit `100.0` for integral floats.
fn parse_timestep(raw: &str, line: u64, path: &Path) -> Result<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < U64_LIMIT => Ok(v as u64),
        _ => Err(DashboardError::malformed(
            path,
            format!("line {}: {} {:?} is not a non-negative integer", line, TIMESTEP, raw),
        )),
    }
}

fn parse_value(raw: &str, name: &str, line: u64, path: &Path) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DashboardError::malformed(
            path,
            format!("line {}: {} {:?} is not a finite number", line, name, raw),
        )),
    }
}

/// Parses table bytes of the given kind. `path` is used for error context only.
pub fn parse_table(bytes: &[u8], kind: TableKind, path: &Path) -> Result<ResultTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| DashboardError::malformed(path, format!("unreadable header: {}", e)))?
        .clone();

    let mut idx = Vec::with_capacity(required_columns(kind).len());
    for name in required_columns(kind) {
        idx.push(column_index(&headers, name, path)?);
    }

    let mut raw_rows = Vec::new();
    let mut avg_rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DashboardError::malformed(path, e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
        let ts = parse_timestep(field(&record, idx[0], TIMESTEP, line, path)?, line, path)?;
        match kind {
            TableKind::Raw => raw_rows.push(RawRow {
                timestep: ts,
                total_regret: parse_value(field(&record, idx[1], TOTAL_REGRET, line, path)?, TOTAL_REGRET, line, path)?,
            }),
            TableKind::Averaged => {
                let mut vals = [0.0f64; 5];
                for (k, name) in AVERAGED_COLUMNS[1..].iter().enumerate() {
                    vals[k] = parse_value(field(&record, idx[k + 1], name, line, path)?, name, line, path)?;
                }
                avg_rows.push(AveragedRow {
                    timestep: ts,
                    avg_total_reward: vals[0],
                    avg_regret: vals[1],
                    avg_zeros: vals[2],
                    avg_ones: vals[3],
                    avg_suboptimal: vals[4],
                });
            }
        }
    }

    let data = match kind {
        TableKind::Raw => TableData::Raw(RawResultTable { rows: raw_rows }),
        TableKind::Averaged => TableData::Averaged(AveragedResultTable { rows: avg_rows }),
    };
    let mut table = ResultTable {
        path: path.to_path_buf(),
        sha256: sha256_hex(bytes),
        columns: headers.iter().map(|s| s.to_string()).collect(),
        data,
        warnings: Vec::new(),
    };
    table.warnings = schedule_warnings(&table);
    Ok(table)
}

/// Averaged tables are expected strictly increasing. Violations are reported,
/// not rejected; aggregation sorts on its own.
fn schedule_warnings(table: &ResultTable) -> Vec<String> {
    let mut warnings = Vec::new();
    if table.row_count() == 0 {
        warnings.push("no_rows".to_string());
    }
    if table.kind() != TableKind::Averaged {
        return warnings;
    }
    let ts = table.timesteps();
    for pair in ts.windows(2) {
        if pair[1] == pair[0] {
            warnings.push(format!("duplicate_timestep: {}", pair[1]));
        } else if pair[1] < pair[0] {
            warnings.push(format!("non_monotonic_ts: prev={} current={}", pair[0], pair[1]));
        }
    }
    if ts.contains(&0) {
        warnings.push("zero_timestep_row".to_string());
    }
    warnings
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DashboardError::MissingTable {
            path: path.to_path_buf(),
        },
        _ => DashboardError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    })
}

pub fn read_table(path: &Path, kind: TableKind) -> Result<ResultTable> {
    let bytes = read_bytes(path)?;
    parse_table(&bytes, kind, path)
}

// =============================================================================
// Store
// =============================================================================

/// Per-session table cache keyed by storage location.
///
/// Failed loads are not cached. Successful ones stay for the lifetime of the
/// store; data files are assumed static.
#[derive(Debug)]
pub struct TableStore {
    root: PathBuf,
    concurrency: usize,
    cache: Mutex<HashMap<PathBuf, Arc<ResultTable>>>,
    reads: AtomicU64,
    loads: AtomicU64,
}

impl TableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_concurrency(root, num_cpus::get())
    }

    pub fn with_concurrency(root: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            root: root.into(),
            concurrency: concurrency.max(1),
            cache: Mutex::new(HashMap::new()),
            reads: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn location(&self, id: &ResultTableId) -> PathBuf {
        id.location(&self.root)
    }

    /// Number of times a file was actually read from disk.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `load` calls, cache hits included.
    pub fn load_calls(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn cached_tables(&self) -> usize {
        self.cache().len()
    }

    /// Entries are inserted whole; a poisoned cache stays usable.
    fn cache(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<ResultTable>>> {
        self.cache.lock().unwrap_or_else(|e| {
            log(
                Level::Warn,
                Domain::Store,
                "cache_poisoned",
                obj(&[("root", v_str(&self.root.display().to_string()))]),
            );
            e.into_inner()
        })
    }

    pub fn load(&self, id: &ResultTableId) -> Result<Arc<ResultTable>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let path = self.location(id);
        if let Some(hit) = self.cache().get(&path).cloned() {
            return Ok(hit);
        }

        let _scope = ProfileScope::with_context("table_load", &[("table", v_str(&id.to_string()))]);
        self.reads.fetch_add(1, Ordering::SeqCst);
        let table = match read_table(&path, id.kind) {
            Ok(t) => Arc::new(t),
            Err(err) => {
                log_table_failed(&id.to_string(), err.kind(), &err.to_string());
                return Err(err);
            }
        };
        log_table_loaded(
            &id.to_string(),
            &path.display().to_string(),
            table.row_count(),
            &table.sha256,
            table.warnings.len(),
        );

        let table = Arc::clone(self.cache().entry(path).or_insert(table));
        Ok(table)
    }

    /// Loads independent tables concurrently. Results come back in input
    /// order, one per id; a failure affects only its own entry.
    pub async fn load_many(
        self: &Arc<Self>,
        ids: &[ResultTableId],
    ) -> Vec<(ResultTableId, Result<Arc<ResultTable>>)> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let tasks = ids.iter().copied().map(|id| {
            let store = Arc::clone(self);
            let permits = Arc::clone(&permits);
            async move {
                let _permit = permits.acquire_owned().await.ok();
                let path = store.location(&id);
                let result = match tokio::task::spawn_blocking(move || store.load(&id)).await {
                    Ok(r) => r,
                    Err(e) => Err(DashboardError::Io {
                        path,
                        message: format!("load task failed: {}", e),
                    }),
                };
                (id, result)
            }
        });
        join_all(tasks).await
    }
}

// =============================================================================
// Manifest
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableManifest {
    pub path: String,
    pub kind: TableKind,
    pub hash_sha256: String,
    pub row_count: u64,
    pub timestep_min: Option<u64>,
    pub timestep_max: Option<u64>,
    pub distinct_timesteps: u64,
    pub columns: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at_epoch: u64,
}

pub fn analyze_table(path: &Path, kind: TableKind, now_ts: u64) -> Result<TableManifest> {
    let table = read_table(path, kind)?;
    let mut ts = table.timesteps();
    let min = ts.iter().copied().min();
    let max = ts.iter().copied().max();
    ts.sort_unstable();
    ts.dedup();
    Ok(TableManifest {
        path: path.display().to_string(),
        kind,
        hash_sha256: table.sha256.clone(),
        row_count: table.row_count() as u64,
        timestep_min: min,
        timestep_max: max,
        distinct_timesteps: ts.len() as u64,
        columns: table.columns.clone(),
        warnings: table.warnings.clone(),
        generated_at_epoch: now_ts,
    })
}

/// Infers the table kind from an upstream file name.
pub fn kind_from_file_name(path: &Path) -> Option<TableKind> {
    let name = path.file_name()?.to_str()?;
    if name.contains("_average_results") {
        Some(TableKind::Averaged)
    } else if name.contains("_results") {
        Some(TableKind::Raw)
    } else {
        None
    }
}

pub fn default_manifest_path(table_path: &Path) -> PathBuf {
    let mut p = table_path.to_path_buf();
    let fname = table_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("table.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}
