//! Computes the full chart set for one selection and prints it as JSON.
//!
//! Usage: banditdash [distribution] [arm_order] [alpha] [algorithm]
//! Missing arguments fall back to DEFAULT_* environment values.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use banditdash::algorithms::AlgorithmSet;
use banditdash::config::DashboardConfig;
use banditdash::controller::{ApplyOutcome, Controller};
use banditdash::logging::{log, obj, v_str, Domain, Level};
use banditdash::pipeline::Pipeline;
use banditdash::store::TableStore;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cfg = DashboardConfig::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    for (i, arg) in args.iter().enumerate() {
        match i {
            0 => cfg.default_distribution = arg.clone(),
            1 => cfg.default_arm_order = arg.clone(),
            2 => cfg.default_alpha = arg.clone(),
            3 => cfg.default_algorithm = arg.clone(),
            _ => return Err(anyhow!("unexpected argument {:?}", arg)),
        }
    }

    let algorithms = AlgorithmSet::canonical();
    let selection = cfg.initial_selection(&algorithms)?;
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("data_dir", v_str(&cfg.data_dir.display().to_string())),
            ("horizon", json!(cfg.horizon)),
            ("selection", serde_json::to_value(selection)?),
        ]),
    );

    let store = Arc::new(TableStore::with_concurrency(&cfg.data_dir, cfg.load_concurrency));
    let pipeline = Pipeline::new(algorithms, store, cfg.horizon);
    let controller = Controller::new(pipeline, selection)?;

    if let ApplyOutcome::Rejected(err) = controller.refresh().await {
        return Err(err.into());
    }
    let charts = controller.snapshot();
    println!("{}", serde_json::to_string_pretty(&charts)?);

    let failed = charts.panels.iter().filter(|p| p.spec().is_none()).count();
    if failed > 0 {
        eprintln!("{} of {} charts failed", failed, charts.panels.len());
        std::process::exit(2);
    }
    Ok(())
}
