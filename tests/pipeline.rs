mod common;

use banditdash::algorithms::Algorithm;
use banditdash::chart::{ChartSlot, TraceKind};
use banditdash::selection::{Alpha, ArmOrder, DistributionId, SelectionState};
use common::*;
use tempfile::TempDir;

fn selection() -> SelectionState {
    SelectionState::new(DistributionId::One, ArmOrder::OptimalFirst, Alpha::P05, Algorithm::Ucb)
}

#[tokio::test]
async fn full_chart_set_for_one_configuration() {
    let dir = TempDir::new().unwrap();
    let cfg = config(DistributionId::One, ArmOrder::OptimalFirst);
    write_config(dir.path(), cfg, 100);

    let pipeline = pipeline(dir.path(), 100);
    let panels = pipeline.compute(&selection(), &ChartSlot::all(), 1).await.unwrap();
    assert_eq!(panels.len(), 6);
    assert!(panels.iter().all(|p| p.spec().is_some()), "{:?}", panels);

    let regret = panels.iter().find(|p| p.slot == ChartSlot::Regret).unwrap().spec().unwrap();
    assert_eq!(regret.traces.len(), 9);
    for (trace, algorithm) in regret.traces.iter().zip(Algorithm::ALL.iter()) {
        assert_eq!(trace.label, algorithm.id());
        assert_eq!(trace.color, algorithm.default_color());
        assert_eq!(trace.x, vec![1.0, 10.0, 100.0]);
        assert_eq!(trace.kind, TraceKind::Line);
    }
    assert!((regret.traces[0].y[2] - 10.0).abs() < 1e-9);

    let ratio = panels.iter().find(|p| p.slot == ChartSlot::SuboptimalRatio).unwrap().spec().unwrap();
    assert!(ratio.traces.iter().all(|t| t.y.iter().all(|v| (v - 0.25).abs() < 1e-9)));

    let outcomes = panels.iter().find(|p| p.slot == ChartSlot::TerminalOutcomes).unwrap().spec().unwrap();
    assert_eq!(outcomes.traces.len(), 18);
    assert_eq!(outcomes.traces[0].label, "ETC - Zeros");
    assert_eq!(outcomes.traces[1].label, "ETC - Ones");
    assert!((outcomes.traces[1].y[0] - 80.0).abs() < 1e-9);

    let hist = panels.iter().find(|p| p.slot == ChartSlot::RegretHistogram).unwrap().spec().unwrap();
    assert_eq!(hist.title, "Distribution of Total Regret at Timestep 100 (UCB)");
    assert_eq!(hist.traces[0].x, vec![10.0, 11.0, 12.0]);
    assert_eq!(hist.traces[0].color, "red");
}

#[tokio::test]
async fn missing_table_drops_only_that_algorithm() {
    let dir = TempDir::new().unwrap();
    let cfg = config(DistributionId::One, ArmOrder::OptimalFirst);
    write_config(dir.path(), cfg, 100);
    let gone = banditdash::resolver::ResultTableId::new(
        Algorithm::Greedy,
        cfg,
        banditdash::resolver::TableKind::Averaged,
    );
    std::fs::remove_file(gone.location(dir.path())).unwrap();

    let pipeline = pipeline(dir.path(), 100);
    let panels = pipeline.compute(&selection(), &ChartSlot::all(), 1).await.unwrap();
    assert!(panels.iter().all(|p| p.spec().is_some()));
    for panel in &panels {
        if panel.slot == ChartSlot::RegretHistogram {
            assert!(panel.errors().is_empty());
            continue;
        }
        assert_eq!(panel.errors().len(), 1);
        assert!(panel.errors()[0].contains("2_Greedy_average_results_optimal_ver1.csv"));
        let spec = panel.spec().unwrap();
        assert!(spec.traces.iter().all(|t| !t.label.starts_with("Greedy")));
    }
    let regret = panels.iter().find(|p| p.slot == ChartSlot::Regret).unwrap().spec().unwrap();
    assert_eq!(regret.traces.len(), 8);
    assert_eq!(regret.traces[1].label, "UCB");
}

#[tokio::test]
async fn every_configuration_loads() {
    let dir = TempDir::new().unwrap();
    for d in DistributionId::ALL {
        for o in ArmOrder::ALL {
            write_config(dir.path(), config(d, o), 100);
        }
    }
    let pipeline = pipeline(dir.path(), 100);
    for d in DistributionId::ALL {
        for o in ArmOrder::ALL {
            for focal in Algorithm::ALL {
                let sel = SelectionState::new(d, o, Alpha::P01, focal);
                let panels = pipeline.compute(&sel, &ChartSlot::all(), 1).await.unwrap();
                assert!(panels.iter().all(|p| p.spec().is_some()), "{}/{}/{}", d.control_value(), o.token(), focal);
            }
        }
    }
    // 6 configurations × (9 averaged + 9 raw); repeat selections hit the cache.
    assert_eq!(pipeline.store().read_count(), 108);
}

#[tokio::test]
async fn histogram_without_horizon_rows_is_empty() {
    let dir = TempDir::new().unwrap();
    let cfg = config(DistributionId::One, ArmOrder::OptimalFirst);
    write_config(dir.path(), cfg, 100);

    let pipeline = pipeline(dir.path(), 100_000);
    let slots = [ChartSlot::RegretHistogram].into_iter().collect();
    let panels = pipeline.compute(&selection(), &slots, 1).await.unwrap();
    let spec = panels[0].spec().unwrap();
    assert!(spec.is_empty());
    assert_eq!(spec.notes.len(), 1);
    assert!(spec.title.contains("100,000"));
}

#[tokio::test]
async fn header_only_averaged_table_renders_empty_with_note() {
    let dir = TempDir::new().unwrap();
    let cfg = config(DistributionId::One, ArmOrder::OptimalFirst);
    write_config(dir.path(), cfg, 100);
    let empty = banditdash::resolver::ResultTableId::new(
        Algorithm::Etc,
        cfg,
        banditdash::resolver::TableKind::Averaged,
    );
    write_csv(&empty.location(dir.path()), &banditdash::store::AVERAGED_COLUMNS, &[]);

    let pipeline = pipeline(dir.path(), 100);
    let table = pipeline.store().load(&empty).unwrap();
    assert_eq!(table.row_count(), 0);
    assert!(table.warnings.iter().any(|w| w == "no_rows"));

    let panels = pipeline.compute(&selection(), &ChartSlot::all(), 1).await.unwrap();
    assert!(panels.iter().all(|p| p.spec().is_some() && p.errors().is_empty()));

    let reward = panels.iter().find(|p| p.slot == ChartSlot::Reward).unwrap().spec().unwrap();
    assert_eq!(reward.title, "Average Total Reward over Timesteps");
    assert_eq!(reward.traces.len(), 9);
    assert!(reward.traces[0].x.is_empty());
    assert_eq!(reward.traces[1].x.len(), 3);

    for slot in [ChartSlot::TerminalOutcomes, ChartSlot::TerminalRegret, ChartSlot::SuboptimalRatio] {
        let spec = panels.iter().find(|p| p.slot == slot).unwrap().spec().unwrap();
        assert!(spec.notes.iter().any(|n| n == "ETC: no rows"), "{:?}: {:?}", slot, spec.notes);
    }
}
