//! Declarative chart descriptions, one per dashboard slot.
//!
//! Builders only attach labels, colors and layout to aggregated series; they
//! never touch the values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::aggregate::{Histogram, Series, SeriesSet, TerminalOutcome, TerminalValue};
use crate::algorithms::{Algorithm, AlgorithmSet};
use crate::selection::Parameter;

/// Dashboard grid positions, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSlot {
    Reward,
    Regret,
    TerminalOutcomes,
    RegretHistogram,
    TerminalRegret,
    SuboptimalRatio,
}

impl ChartSlot {
    pub const ALL: [ChartSlot; 6] = [
        Self::Reward,
        Self::Regret,
        Self::TerminalOutcomes,
        Self::RegretHistogram,
        Self::TerminalRegret,
        Self::SuboptimalRatio,
    ];

    pub fn all() -> BTreeSet<ChartSlot> {
        Self::ALL.iter().copied().collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reward => "reward",
            Self::Regret => "regret",
            Self::TerminalOutcomes => "terminal_outcomes",
            Self::RegretHistogram => "regret_histogram",
            Self::TerminalRegret => "terminal_regret",
            Self::SuboptimalRatio => "suboptimal_ratio",
        }
    }

    /// 1-based grid position.
    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).map(|i| i + 1).unwrap_or(0)
    }

    pub fn needs_averaged(&self) -> bool {
        !matches!(self, Self::RegretHistogram)
    }

    pub fn needs_focal_raw(&self) -> bool {
        matches!(self, Self::RegretHistogram)
    }

    /// Whether a change of `param` invalidates this slot. Alpha does not
    /// select any stored table, so no slot depends on it.
    pub fn depends_on(&self, param: Parameter) -> bool {
        match param {
            Parameter::Distribution | Parameter::ArmOrder => true,
            Parameter::FocalAlgorithm => matches!(self, Self::RegretHistogram),
            Parameter::Alpha => false,
        }
    }

    pub fn affected_by(params: &[Parameter]) -> BTreeSet<ChartSlot> {
        Self::ALL
            .iter()
            .copied()
            .filter(|s| params.iter().any(|p| s.depends_on(*p)))
            .collect()
    }

    /// Cross-sectional charts hide the legend; color already encodes algorithm.
    pub fn shows_legend(&self) -> bool {
        matches!(self, Self::Reward | Self::Regret | Self::SuboptimalRatio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Line,
    Box,
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub label: String,
    pub color: String,
    pub kind: TraceKind,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub slot: ChartSlot,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub show_legend: bool,
    pub background: String,
    pub traces: Vec<Trace>,
    pub notes: Vec<String>,
    /// Load errors of algorithms left out of an otherwise rendered chart.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ChartSpec {
    fn new(slot: ChartSlot, title: String, x_title: &str, y_title: &str) -> Self {
        Self {
            slot,
            title,
            x_title: x_title.to_string(),
            y_title: y_title.to_string(),
            show_legend: slot.shows_legend(),
            background: "white".to_string(),
            traces: Vec::new(),
            notes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.traces.iter().all(|t| t.x.is_empty() && t.y.is_empty())
    }
}

fn color(algorithms: &AlgorithmSet, algorithm: Algorithm) -> String {
    algorithms.color_of(algorithm).unwrap_or("gray").to_string()
}

/// `100000` → `100,000`
pub fn format_timestep(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn line_chart(
    slot: ChartSlot,
    title: &str,
    y_title: &str,
    set: &SeriesSet<Series>,
    algorithms: &AlgorithmSet,
) -> ChartSpec {
    let mut spec = ChartSpec::new(slot, title.to_string(), "Timestep", y_title);
    for s in &set.items {
        spec.traces.push(Trace {
            label: s.algorithm.id().to_string(),
            color: color(algorithms, s.algorithm),
            kind: TraceKind::Line,
            x: s.xs(),
            y: s.ys(),
        });
    }
    spec.notes = set.notes.clone();
    spec
}

pub fn reward_chart(set: &SeriesSet<Series>, algorithms: &AlgorithmSet) -> ChartSpec {
    line_chart(
        ChartSlot::Reward,
        "Average Total Reward over Timesteps",
        "Average Total Reward",
        set,
        algorithms,
    )
}

pub fn regret_chart(set: &SeriesSet<Series>, algorithms: &AlgorithmSet) -> ChartSpec {
    line_chart(
        ChartSlot::Regret,
        "Average Total Regret over Timesteps",
        "Average Regret",
        set,
        algorithms,
    )
}

pub fn suboptimal_chart(set: &SeriesSet<Series>, algorithms: &AlgorithmSet) -> ChartSpec {
    line_chart(
        ChartSlot::SuboptimalRatio,
        "Proportion of Suboptimal Arms pulled in comparison to all Arms pulled",
        "Suboptimal pulls / Timestep",
        set,
        algorithms,
    )
}

pub fn terminal_outcomes_chart(set: &SeriesSet<TerminalOutcome>, algorithms: &AlgorithmSet) -> ChartSpec {
    let mut spec = ChartSpec::new(
        ChartSlot::TerminalOutcomes,
        "Count of Zeros and Ones at the final Timestep".to_string(),
        "Algorithm",
        "Average Count",
    );
    for item in &set.items {
        let c = color(algorithms, item.algorithm);
        spec.traces.push(Trace {
            label: format!("{} - Zeros", item.algorithm),
            color: c.clone(),
            kind: TraceKind::Box,
            x: Vec::new(),
            y: item.zeros.clone(),
        });
        spec.traces.push(Trace {
            label: format!("{} - Ones", item.algorithm),
            color: c,
            kind: TraceKind::Box,
            x: Vec::new(),
            y: item.ones.clone(),
        });
    }
    spec.notes = set.notes.clone();
    spec
}

pub fn terminal_regret_chart(set: &SeriesSet<TerminalValue>, algorithms: &AlgorithmSet) -> ChartSpec {
    let mut spec = ChartSpec::new(
        ChartSlot::TerminalRegret,
        "Average Regret at the final Timestep".to_string(),
        "Algorithm",
        "Average Regret",
    );
    for item in &set.items {
        spec.traces.push(Trace {
            label: item.algorithm.id().to_string(),
            color: color(algorithms, item.algorithm),
            kind: TraceKind::Box,
            x: Vec::new(),
            y: item.values.clone(),
        });
    }
    spec.notes = set.notes.clone();
    spec
}

pub fn histogram_chart(hist: &Histogram, algorithms: &AlgorithmSet) -> ChartSpec {
    let mut spec = ChartSpec::new(
        ChartSlot::RegretHistogram,
        format!(
            "Distribution of Total Regret at Timestep {} ({})",
            format_timestep(hist.horizon),
            hist.algorithm
        ),
        "Total Regret",
        "Replicates",
    );
    spec.traces.push(Trace {
        label: hist.algorithm.id().to_string(),
        color: color(algorithms, hist.algorithm),
        kind: TraceKind::Histogram,
        x: hist.values.clone(),
        y: Vec::new(),
    });
    if hist.values.is_empty() {
        spec.notes.push(format!(
            "{}: no replicate reached timestep {}",
            hist.algorithm,
            format_timestep(hist.horizon)
        ));
    }
    spec
}
