//! The closed set of bandit algorithms shown on the dashboard.
//!
//! `Algorithm` is the fixed vocabulary. `AlgorithmSet` is the ordered,
//! immutable palette handed to every component: it decides trace order and
//! color assignment, so two sessions may run with different sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "ETC")]
    Etc,
    #[serde(rename = "Greedy")]
    Greedy,
    #[serde(rename = "UCB")]
    Ucb,
    #[serde(rename = "UCB-Normal")]
    UcbNormal,
    #[serde(rename = "UCB-V")]
    UcbV,
    #[serde(rename = "UCB-Tuned")]
    UcbTuned,
    #[serde(rename = "PAC-UCB")]
    PacUcb,
    #[serde(rename = "UCB-Improved")]
    UcbImproved,
    #[serde(rename = "EUCBV")]
    Eucbv,
}

impl Algorithm {
    pub const ALL: [Algorithm; 9] = [
        Algorithm::Etc,
        Algorithm::Greedy,
        Algorithm::Ucb,
        Algorithm::UcbNormal,
        Algorithm::UcbV,
        Algorithm::UcbTuned,
        Algorithm::PacUcb,
        Algorithm::UcbImproved,
        Algorithm::Eucbv,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Etc => "ETC",
            Self::Greedy => "Greedy",
            Self::Ucb => "UCB",
            Self::UcbNormal => "UCB-Normal",
            Self::UcbV => "UCB-V",
            Self::UcbTuned => "UCB-Tuned",
            Self::PacUcb => "PAC-UCB",
            Self::UcbImproved => "UCB-Improved",
            Self::Eucbv => "EUCBV",
        }
    }

    /// 1-based position in the upstream runner's numbering.
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|a| a == self).map(|i| i + 1).unwrap_or(0)
    }

    /// File name prefix the simulation runners write, e.g. `3_UCB`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.ordinal(), self.id())
    }

    pub fn default_color(&self) -> &'static str {
        match self {
            Self::Etc => "blue",
            Self::Greedy => "green",
            Self::Ucb => "red",
            Self::UcbNormal => "cyan",
            Self::UcbV => "magenta",
            Self::UcbTuned => "yellow",
            Self::PacUcb => "black",
            Self::UcbImproved => "orange",
            Self::Eucbv => "purple",
        }
    }

    /// Accepts the display id (`UCB`) or the file stem (`3_UCB`), case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL.iter().copied().find(|a| {
            a.id().eq_ignore_ascii_case(trimmed) || a.file_stem().eq_ignore_ascii_case(trimmed)
        })
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmEntry {
    pub algorithm: Algorithm,
    pub color: String,
}

/// Ordered algorithm palette. Cheap to clone, never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSet {
    entries: Arc<[AlgorithmEntry]>,
}

impl AlgorithmSet {
    /// All nine algorithms in runner order with their legend colors.
    pub fn canonical() -> Self {
        Self::with_default_colors(&Algorithm::ALL)
    }

    /// Keeps the given order and drops repeated algorithms.
    pub fn new(entries: Vec<AlgorithmEntry>) -> Self {
        let mut seen = Vec::with_capacity(entries.len());
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            if !seen.contains(&entry.algorithm) {
                seen.push(entry.algorithm);
                kept.push(entry);
            }
        }
        Self { entries: kept.into() }
    }

    pub fn with_default_colors(algorithms: &[Algorithm]) -> Self {
        Self::new(
            algorithms
                .iter()
                .map(|a| AlgorithmEntry {
                    algorithm: *a,
                    color: a.default_color().to_string(),
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlgorithmEntry> {
        self.entries.iter()
    }

    pub fn algorithms(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.entries.iter().map(|e| e.algorithm)
    }

    pub fn contains(&self, algorithm: Algorithm) -> bool {
        self.entries.iter().any(|e| e.algorithm == algorithm)
    }

    pub fn color_of(&self, algorithm: Algorithm) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.algorithm == algorithm)
            .map(|e| e.color.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AlgorithmSet {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stems_follow_runner_numbering() {
        assert_eq!(Algorithm::Etc.file_stem(), "1_ETC");
        assert_eq!(Algorithm::Ucb.file_stem(), "3_UCB");
        assert_eq!(Algorithm::Eucbv.file_stem(), "9_EUCBV");
    }

    #[test]
    fn test_parse_accepts_id_and_stem() {
        assert_eq!(Algorithm::parse("UCB"), Some(Algorithm::Ucb));
        assert_eq!(Algorithm::parse("3_UCB"), Some(Algorithm::Ucb));
        assert_eq!(Algorithm::parse("ucb-tuned"), Some(Algorithm::UcbTuned));
        assert_eq!(Algorithm::parse("Thompson"), None);
    }

    #[test]
    fn test_canonical_order_and_colors() {
        let set = AlgorithmSet::canonical();
        assert_eq!(set.len(), 9);
        let ids: Vec<_> = set.algorithms().map(|a| a.id()).collect();
        assert_eq!(ids[0], "ETC");
        assert_eq!(ids[8], "EUCBV");
        assert_eq!(set.color_of(Algorithm::Ucb), Some("red"));
    }

    #[test]
    fn test_subset_drops_duplicates() {
        let set = AlgorithmSet::with_default_colors(&[
            Algorithm::Ucb,
            Algorithm::Etc,
            Algorithm::Ucb,
        ]);
        let ids: Vec<_> = set.algorithms().collect();
        assert_eq!(ids, vec![Algorithm::Ucb, Algorithm::Etc]);
        assert!(!set.contains(Algorithm::Greedy));
    }
}
