mod common;

use banditdash::algorithms::Algorithm;
use banditdash::chart::ChartSlot;
use banditdash::controller::{ApplyOutcome, Controller};
use banditdash::selection::{Alpha, ArmOrder, DistributionId, ParamChange, Parameter, SelectionState};
use banditdash::server::handle_request;
use common::*;
use tempfile::TempDir;

fn start() -> SelectionState {
    SelectionState::new(DistributionId::One, ArmOrder::OptimalFirst, Alpha::P01, Algorithm::Ucb)
}

async fn ready_controller(dir: &TempDir) -> Controller {
    write_config(dir.path(), config(DistributionId::One, ArmOrder::OptimalFirst), 100);
    write_config(dir.path(), config(DistributionId::Three, ArmOrder::OptimalFirst), 100);
    let controller = Controller::new(pipeline(dir.path(), 100), start()).unwrap();
    assert!(matches!(controller.refresh().await, ApplyOutcome::Committed { .. }));
    controller
}

#[tokio::test]
async fn refresh_fills_every_slot() {
    let dir = TempDir::new().unwrap();
    let controller = ready_controller(&dir).await;
    let charts = controller.snapshot();
    assert_eq!(charts.panels.len(), 6);
    assert_eq!(charts.displayed, Some(start()));
    assert!(charts.validation_error.is_none());
    assert_eq!(controller.pipeline().store().read_count(), 10);
    assert_eq!(controller.pipeline().store().load_calls(), 10);
}

#[tokio::test]
async fn alpha_change_reads_nothing() {
    let dir = TempDir::new().unwrap();
    let controller = ready_controller(&dir).await;
    let before = controller.snapshot();

    let outcome = controller.apply(ParamChange::new(Parameter::Alpha, "0.1")).await;
    assert!(matches!(outcome, ApplyOutcome::Committed { ref recomputed, .. } if recomputed.is_empty()));
    // Not even cache hits: no table is requested at all.
    assert_eq!(controller.pipeline().store().load_calls(), 10);
    assert_eq!(controller.pipeline().store().read_count(), 10);

    let after = controller.snapshot();
    assert_eq!(after.selection.config.alpha, Alpha::P10);
    assert_eq!(after.panels, before.panels);
}

#[tokio::test]
async fn focal_change_loads_only_the_raw_table() {
    let dir = TempDir::new().unwrap();
    let controller = ready_controller(&dir).await;
    let outcome = controller
        .apply(ParamChange::new(Parameter::FocalAlgorithm, "EUCBV"))
        .await;
    match outcome {
        ApplyOutcome::Committed { recomputed, .. } => {
            assert_eq!(recomputed, vec![ChartSlot::RegretHistogram])
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(controller.pipeline().store().read_count(), 11);
    assert_eq!(controller.pipeline().store().load_calls(), 11);
    let hist = controller.snapshot();
    let spec = hist.panel(ChartSlot::RegretHistogram).unwrap().spec().unwrap();
    assert!(spec.title.ends_with("(EUCBV)"));
    assert_eq!(spec.traces[0].color, "purple");
}

#[tokio::test]
async fn invalid_change_keeps_charts() {
    let dir = TempDir::new().unwrap();
    let controller = ready_controller(&dir).await;
    let before = controller.snapshot();

    let outcome = controller.apply(ParamChange::new(Parameter::Distribution, "dist9")).await;
    assert!(matches!(outcome, ApplyOutcome::Rejected(_)));

    let after = controller.snapshot();
    assert_eq!(after.selection, before.selection);
    assert_eq!(after.panels, before.panels);
    assert!(after.validation_error.unwrap().contains("distribution"));

    // Next valid change clears it.
    controller.apply(ParamChange::new(Parameter::Alpha, "0.05")).await;
    assert!(controller.snapshot().validation_error.is_none());
}

#[tokio::test]
async fn missing_configuration_fails_panels_not_selection() {
    let dir = TempDir::new().unwrap();
    let controller = ready_controller(&dir).await;
    controller.apply(ParamChange::new(Parameter::ArmOrder, "other")).await;
    let charts = controller.snapshot();
    assert_eq!(charts.selection.config.arm_order, ArmOrder::SuboptimalFirst);
    assert!(charts.panels.iter().all(|p| p.spec().is_none()));
    assert!(charts.panels.iter().all(|p| p.errors()[0].contains("missing table")));
}

#[tokio::test]
async fn last_write_wins() {
    let dir = TempDir::new().unwrap();
    let controller = ready_controller(&dir).await;

    let a = controller
        .stage(&ParamChange::new(Parameter::Distribution, "dist3"))
        .unwrap();
    let b = controller
        .stage(&ParamChange::new(Parameter::FocalAlgorithm, "ETC"))
        .unwrap();
    assert!(b.generation > a.generation);
    // B is measured against what is on screen, so it carries A's slots too.
    assert_eq!(b.recompute, ChartSlot::all());

    assert!(matches!(controller.run(a.clone()).await, ApplyOutcome::Stale { .. }));
    assert!(!controller.commit(&a, Vec::new()));
    assert!(matches!(controller.run(b.clone()).await, ApplyOutcome::Committed { .. }));

    let charts = controller.snapshot();
    assert_eq!(charts.generation, b.generation);
    assert_eq!(charts.displayed, Some(b.selection));
    assert_eq!(charts.selection.config.distribution, DistributionId::Three);
    assert_eq!(charts.selection.focal, Algorithm::Etc);
}

#[tokio::test]
async fn set_endpoint_applies_and_rejects() {
    let dir = TempDir::new().unwrap();
    let controller = ready_controller(&dir).await;

    let ok = handle_request(&controller, "GET /api/set?param=alpha&value=0.05 HTTP/1.1").await;
    assert_eq!(ok.status, "200 OK");
    assert_eq!(ok.body["selection"]["config"]["alpha"], "0.05");

    let bad = handle_request(&controller, "GET /api/set?param=focal_algorithm&value=Nope HTTP/1.1").await;
    assert!(bad.status.starts_with("422"));
    assert_eq!(bad.body["charts"]["panels"].as_array().map(|p| p.len()), Some(6));

    let encoded = handle_request(&controller, "GET /api/set?param=selected_algorithm&value=UCB%2DV HTTP/1.1").await;
    assert_eq!(encoded.status, "200 OK");
    assert_eq!(encoded.body["selection"]["focal"], "UCB-V");

    let missing = handle_request(&controller, "GET /api/nothing HTTP/1.1").await;
    assert!(missing.status.starts_with("404"));
}

#[tokio::test]
async fn concurrent_changes_display_the_newest() {
    let dir = TempDir::new().unwrap();
    let controller = std::sync::Arc::new(ready_controller(&dir).await);

    let first = {
        let c = std::sync::Arc::clone(&controller);
        tokio::spawn(async move { c.apply(ParamChange::new(Parameter::Distribution, "dist3")).await })
    };
    let second = {
        let c = std::sync::Arc::clone(&controller);
        tokio::spawn(async move { c.apply(ParamChange::new(Parameter::FocalAlgorithm, "ETC")).await })
    };
    let (first, second) = tokio::join!(first, second);
    let outcomes = [first.unwrap(), second.unwrap()];

    // Whichever staged last commits; any earlier run is stale or superseded.
    let committed: Vec<u64> = outcomes
        .iter()
        .filter_map(|o| match o {
            ApplyOutcome::Committed { generation, .. } => Some(*generation),
            _ => None,
        })
        .collect();
    let charts = controller.snapshot();
    assert!(committed.contains(&charts.generation));
    assert_eq!(committed.iter().max(), Some(&charts.generation));
    assert_eq!(charts.displayed, Some(charts.selection));
    assert_eq!(charts.selection.config.distribution, DistributionId::Three);
    assert_eq!(charts.selection.focal, Algorithm::Etc);

    let hist = charts.panel(ChartSlot::RegretHistogram).unwrap().spec().unwrap();
    assert!(hist.title.ends_with("(ETC)"));
    assert!(charts.panels.iter().all(|p| p.spec().is_some()));
}
