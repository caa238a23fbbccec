//! Copies legacy result files to canonical, configuration-specific names.
//!
//! Usage: migrate_legacy <dir> <distribution> <arm_order> [--dry-run]

use anyhow::{anyhow, Result};
use std::path::PathBuf;

use banditdash::algorithms::AlgorithmSet;
use banditdash::migrate::{apply, plan, StepAction};
use banditdash::selection::{ArmOrder, DistributionId};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        return Err(anyhow!("usage: migrate_legacy <dir> <distribution> <arm_order> [--dry-run]"));
    }
    let dir = PathBuf::from(&args[0]);
    let distribution = DistributionId::parse(&args[1])?;
    let arm_order = ArmOrder::parse(&args[2])?;
    let dry_run = args.iter().any(|a| a == "--dry-run");

    let steps = plan(&dir, distribution, arm_order, &AlgorithmSet::canonical());
    for step in &steps {
        let tag = match step.action {
            StepAction::Copy => "copy",
            StepAction::SkipMissingSource => "skip (no source)",
            StepAction::SkipTargetExists => "skip (target exists)",
        };
        println!("{:<22} {} -> {}", tag, step.from.display(), step.to.display());
    }

    if dry_run {
        return Ok(());
    }
    let copied = apply(&steps)?;
    println!("copied {} file(s)", copied);
    Ok(())
}
