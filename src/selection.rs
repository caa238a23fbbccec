//! Experiment selection: the enumerated control values and the session state.
//!
//! Raw control values arrive as strings. Everything past `parse_*` is typed,
//! so an out-of-domain value can never reach path resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::algorithms::{Algorithm, AlgorithmSet};
use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DistributionId {
    #[serde(rename = "dist1")]
    One,
    #[serde(rename = "dist2")]
    Two,
    #[serde(rename = "dist3")]
    Three,
}

impl DistributionId {
    pub const ALL: [DistributionId; 3] = [Self::One, Self::Two, Self::Three];

    pub fn number(&self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    pub fn control_value(&self) -> &'static str {
        match self {
            Self::One => "dist1",
            Self::Two => "dist2",
            Self::Three => "dist3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::One => "2 arms with Bernoulli rewards, means [0.9, 0.8]",
            Self::Two => "2 arms with Bernoulli rewards, means [0.9, 0.895]",
            Self::Three => "2 arms with Bernoulli rewards, means [0.5, 0.495]",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let v = raw.trim().to_lowercase();
        match v.strip_prefix("dist").unwrap_or(&v) {
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            "3" => Ok(Self::Three),
            _ => Err(DashboardError::invalid(
                Parameter::Distribution.as_str(),
                raw,
                "expected one of dist1, dist2, dist3",
            )),
        }
    }
}

/// Which arm the simulation pulled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArmOrder {
    #[serde(rename = "optimal")]
    OptimalFirst,
    #[serde(rename = "other")]
    SuboptimalFirst,
}

impl ArmOrder {
    pub const ALL: [ArmOrder; 2] = [Self::OptimalFirst, Self::SuboptimalFirst];

    /// Token used in control values and file names.
    pub fn token(&self) -> &'static str {
        match self {
            Self::OptimalFirst => "optimal",
            Self::SuboptimalFirst => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OptimalFirst => "Optimal arm first",
            Self::SuboptimalFirst => "Other arm first",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "optimal" | "optimal-first" => Ok(Self::OptimalFirst),
            "other" | "suboptimal" | "suboptimal-first" => Ok(Self::SuboptimalFirst),
            _ => Err(DashboardError::invalid(
                Parameter::ArmOrder.as_str(),
                raw,
                "expected optimal or other",
            )),
        }
    }
}

/// Risk parameter. Kept as an enum so equality and hashing stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Alpha {
    #[serde(rename = "0.01")]
    P01,
    #[serde(rename = "0.05")]
    P05,
    #[serde(rename = "0.1")]
    P10,
}

impl Alpha {
    pub const ALL: [Alpha; 3] = [Self::P01, Self::P05, Self::P10];

    pub fn value(&self) -> f64 {
        match self {
            Self::P01 => 0.01,
            Self::P05 => 0.05,
            Self::P10 => 0.1,
        }
    }

    pub fn control_value(&self) -> &'static str {
        match self {
            Self::P01 => "0.01",
            Self::P05 => "0.05",
            Self::P10 => "0.1",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let err = || {
            DashboardError::invalid(
                Parameter::Alpha.as_str(),
                raw,
                "expected one of 0.01, 0.05, 0.1",
            )
        };
        let v: f64 = raw.trim().parse().map_err(|_| err())?;
        Self::ALL
            .iter()
            .copied()
            .find(|a| (a.value() - v).abs() < 1e-9)
            .ok_or_else(err)
    }
}

impl fmt::Display for Alpha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.control_value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub distribution: DistributionId,
    pub arm_order: ArmOrder,
    pub alpha: Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionState {
    pub config: ExperimentConfig,
    pub focal: Algorithm,
}

impl SelectionState {
    pub fn new(distribution: DistributionId, arm_order: ArmOrder, alpha: Alpha, focal: Algorithm) -> Self {
        Self {
            config: ExperimentConfig {
                distribution,
                arm_order,
                alpha,
            },
            focal,
        }
    }

    /// Parses all four control values at once.
    pub fn parse(
        distribution: &str,
        arm_order: &str,
        alpha: &str,
        focal: &str,
        algorithms: &AlgorithmSet,
    ) -> Result<Self> {
        Ok(Self::new(
            DistributionId::parse(distribution)?,
            ArmOrder::parse(arm_order)?,
            Alpha::parse(alpha)?,
            parse_focal(focal, algorithms)?,
        ))
    }

    /// Ensures the focal algorithm belongs to the session's palette.
    pub fn validate(&self, algorithms: &AlgorithmSet) -> Result<()> {
        if algorithms.contains(self.focal) {
            Ok(())
        } else {
            Err(DashboardError::invalid(
                Parameter::FocalAlgorithm.as_str(),
                self.focal.id(),
                "algorithm not in the configured set",
            ))
        }
    }

    pub fn get(&self, param: Parameter) -> String {
        match param {
            Parameter::Distribution => self.config.distribution.control_value().to_string(),
            Parameter::ArmOrder => self.config.arm_order.token().to_string(),
            Parameter::Alpha => self.config.alpha.control_value().to_string(),
            Parameter::FocalAlgorithm => self.focal.id().to_string(),
        }
    }

    /// Parameters whose value differs between `self` and `other`.
    pub fn diff(&self, other: &SelectionState) -> Vec<Parameter> {
        Parameter::ALL
            .iter()
            .copied()
            .filter(|p| self.get(*p) != other.get(*p))
            .collect()
    }
}

pub fn parse_focal(raw: &str, algorithms: &AlgorithmSet) -> Result<Algorithm> {
    let algorithm = Algorithm::parse(raw).ok_or_else(|| {
        DashboardError::invalid(Parameter::FocalAlgorithm.as_str(), raw, "unknown algorithm")
    })?;
    if !algorithms.contains(algorithm) {
        return Err(DashboardError::invalid(
            Parameter::FocalAlgorithm.as_str(),
            raw,
            "algorithm not in the configured set",
        ));
    }
    Ok(algorithm)
}

/// One user-facing control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Distribution,
    ArmOrder,
    Alpha,
    FocalAlgorithm,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Self::Distribution,
        Self::ArmOrder,
        Self::Alpha,
        Self::FocalAlgorithm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distribution => "distribution",
            Self::ArmOrder => "arm_order",
            Self::Alpha => "alpha",
            Self::FocalAlgorithm => "focal_algorithm",
        }
    }

    /// Accepts the canonical name and the older page control ids.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "distribution" | "arm_distribution" | "dist" => Ok(Self::Distribution),
            "arm_order" | "first_move" | "order" => Ok(Self::ArmOrder),
            "alpha" => Ok(Self::Alpha),
            "focal_algorithm" | "selected_algorithm" | "algorithm" | "algo" => {
                Ok(Self::FocalAlgorithm)
            }
            _ => Err(DashboardError::invalid("parameter", raw, "unknown control")),
        }
    }
}

/// A single control change as delivered by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamChange {
    pub param: Parameter,
    pub value: String,
}

impl ParamChange {
    pub fn new(param: Parameter, value: impl Into<String>) -> Self {
        Self {
            param,
            value: value.into(),
        }
    }

    /// Applies the change to `current`, validating the new value only.
    pub fn apply(&self, current: &SelectionState, algorithms: &AlgorithmSet) -> Result<SelectionState> {
        let mut next = *current;
        match self.param {
            Parameter::Distribution => next.config.distribution = DistributionId::parse(&self.value)?,
            Parameter::ArmOrder => next.config.arm_order = ArmOrder::parse(&self.value)?,
            Parameter::Alpha => next.config.alpha = Alpha::parse(&self.value)?,
            Parameter::FocalAlgorithm => next.focal = parse_focal(&self.value, algorithms)?,
        }
        Ok(next)
    }
}
