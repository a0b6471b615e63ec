//! Signal types known to the modeller.
//!
//! Every time signal refers to one of a fixed set of metrics. The static properties of a metric
//! (numeric type, category, digitization behaviour) never change, while the hard limits used at
//! kernel export can be overridden once per run through [`SignalRegistry::with_hard_limits`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkloadError};

/// Metric identifier. The declaration order is the column order of clustering matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Flops,
    KbRead,
    KbWrite,
    NRead,
    NWrite,
    NPairwise,
    KbPairwise,
    NCollective,
    KbCollective,
}

/// Numeric type a metric is exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
}

impl ValueType {
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            ValueType::Int => value.trunc(),
            ValueType::Float => value,
        }
    }
}

/// Kind of resource a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalCategory {
    Cpu,
    Mpi,
    FileRead,
    FileWrite,
}

/// How samples falling into the same bin are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Sum,
    Mean,
}

impl SignalKind {
    pub const ALL: [SignalKind; 9] = [
        SignalKind::Flops,
        SignalKind::KbRead,
        SignalKind::KbWrite,
        SignalKind::NRead,
        SignalKind::NWrite,
        SignalKind::NPairwise,
        SignalKind::KbPairwise,
        SignalKind::NCollective,
        SignalKind::KbCollective,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Flops => "flops",
            SignalKind::KbRead => "kb_read",
            SignalKind::KbWrite => "kb_write",
            SignalKind::NRead => "n_read",
            SignalKind::NWrite => "n_write",
            SignalKind::NPairwise => "n_pairwise",
            SignalKind::KbPairwise => "kb_pairwise",
            SignalKind::NCollective => "n_collective",
            SignalKind::KbCollective => "kb_collective",
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            SignalKind::Flops
            | SignalKind::NRead
            | SignalKind::NWrite
            | SignalKind::NPairwise
            | SignalKind::NCollective => ValueType::Int,
            SignalKind::KbRead | SignalKind::KbWrite | SignalKind::KbPairwise | SignalKind::KbCollective => {
                ValueType::Float
            }
        }
    }

    pub fn category(&self) -> SignalCategory {
        match self {
            SignalKind::Flops => SignalCategory::Cpu,
            SignalKind::KbRead | SignalKind::NRead => SignalCategory::FileRead,
            SignalKind::KbWrite | SignalKind::NWrite => SignalCategory::FileWrite,
            SignalKind::NPairwise | SignalKind::KbPairwise | SignalKind::NCollective | SignalKind::KbCollective => {
                SignalCategory::Mpi
            }
        }
    }

    pub fn behaviour(&self) -> Behaviour {
        Behaviour::Sum
    }

    /// Hard limit used when no override is configured.
    pub fn default_max_value(&self) -> f64 {
        match self {
            SignalKind::Flops => 1e12,
            SignalKind::KbRead | SignalKind::KbWrite | SignalKind::KbPairwise | SignalKind::KbCollective => 1e6,
            SignalKind::NRead | SignalKind::NWrite | SignalKind::NPairwise | SignalKind::NCollective => 1e4,
        }
    }

    /// Position of the metric in [`SignalKind::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SignalKind {
    type Err = WorkloadError;

    fn from_str(s: &str) -> Result<Self> {
        SignalKind::ALL
            .iter()
            .find(|kind| kind.name() == s)
            .copied()
            .ok_or_else(|| WorkloadError::UnknownSignal(s.to_string()))
    }
}

/// Full description of a metric.
#[derive(Debug, Clone, Copy)]
pub struct SignalSpec {
    pub kind: SignalKind,
    pub value_type: ValueType,
    pub category: SignalCategory,
    pub behaviour: Behaviour,
    pub max_value: f64,
}

/// Immutable lookup table of metric descriptions.
///
/// Built once before a run and handed by reference to the stages that need hard limits.
#[derive(Debug, Clone)]
pub struct SignalRegistry {
    specs: [SignalSpec; 9],
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self {
            specs: SignalKind::ALL.map(|kind| SignalSpec {
                kind,
                value_type: kind.value_type(),
                category: kind.category(),
                behaviour: kind.behaviour(),
                max_value: kind.default_max_value(),
            }),
        }
    }

    /// Creates registry with `max_value` replaced for the given metrics.
    pub fn with_hard_limits(limits: &BTreeMap<SignalKind, f64>) -> Result<Self> {
        let mut registry = Self::new();
        for (kind, limit) in limits.iter() {
            if !limit.is_finite() || *limit < 1. {
                return Err(WorkloadError::Config(format!(
                    "hard limit for {} must be a finite number >= 1, got {}",
                    kind, limit
                )));
            }
            registry.specs[kind.index()].max_value = *limit;
        }
        Ok(registry)
    }

    pub fn get(&self, kind: SignalKind) -> &SignalSpec {
        &self.specs[kind.index()]
    }

    pub fn max_value(&self, kind: SignalKind) -> f64 {
        self.specs[kind.index()].max_value
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalSpec> {
        self.specs.iter()
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_in_declared_order() {
        for (i, kind) in SignalKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(kind.name().parse::<SignalKind>().unwrap(), *kind);
        }
        assert!("kb_scratch".parse::<SignalKind>().is_err());
    }

    #[test]
    fn hard_limits_override_defaults() {
        let limits = BTreeMap::from([(SignalKind::Flops, 100.)]);
        let registry = SignalRegistry::with_hard_limits(&limits).unwrap();
        assert_eq!(registry.max_value(SignalKind::Flops), 100.);
        assert_eq!(registry.max_value(SignalKind::KbRead), 1e6);
        assert!(SignalRegistry::with_hard_limits(&BTreeMap::from([(SignalKind::NRead, 0.)])).is_err());
    }
}
