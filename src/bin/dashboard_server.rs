//! Dashboard server
//!
//! Serves the chart set of one session as JSON for the rendering front-end.
//! Run with: cargo run --bin dashboard_server

use anyhow::Result;
use std::sync::Arc;

use banditdash::algorithms::AlgorithmSet;
use banditdash::config::DashboardConfig;
use banditdash::controller::{ApplyOutcome, Controller};
use banditdash::logging::{log, obj, v_str, Domain, Level};
use banditdash::pipeline::Pipeline;
use banditdash::server::serve;
use banditdash::store::TableStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = DashboardConfig::from_env();
    let algorithms = AlgorithmSet::canonical();
    let selection = cfg.initial_selection(&algorithms)?;

    let store = Arc::new(TableStore::with_concurrency(&cfg.data_dir, cfg.load_concurrency));
    let pipeline = Pipeline::new(algorithms, store, cfg.horizon);
    let controller = Arc::new(Controller::new(pipeline, selection)?);

    // A broken initial data set still serves; failed panels say why.
    if let ApplyOutcome::Rejected(err) = controller.refresh().await {
        log(
            Level::Error,
            Domain::System,
            "initial_refresh_failed",
            obj(&[("msg", v_str(&err.to_string()))]),
        );
    }

    println!("Dashboard server running at http://localhost:{}", cfg.port);
    println!();
    println!("Endpoints:");
    println!("  GET /api/charts                      - Current chart set");
    println!("  GET /api/options                     - Control options and legend");
    println!("  GET /api/set?param=alpha&value=0.05  - Apply a control change");
    println!("  GET /api/refresh                     - Recompute every chart");
    println!("  GET /api/health                      - Health check");
    println!();

    serve(controller, cfg.port).await
}
