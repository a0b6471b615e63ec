//! Model configuration.
//!
//! The configuration is read from YAML. Every section is a typed struct that rejects unknown
//! keys, and [`ModelConfig::validate`] checks value ranges before any workload is touched.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkloadError};
use crate::generation::schedule::ScheduleKind;
use crate::generation::GenerationStrategyKind;
use crate::job::JobAttribute;
use crate::signal::{SignalKind, SignalRegistry};
use crate::time_signal::MAX_PRIORITY;

fn one() -> f64 {
    1.
}

/// Available clustering engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringKind {
    Kmeans,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusteringConfig {
    /// Clustering engine.
    #[serde(rename = "type")]
    pub kind: ClusteringKind,
    /// Tags of the workloads to cluster.
    pub apply_to: Vec<String>,
    /// Seed of the clustering engine.
    pub rseed: u64,
    /// Maximum number of refinement iterations.
    pub max_iter: usize,
    /// Upper bound of the cluster count search.
    pub max_num_clusters: usize,
    /// Step of the cluster count search.
    pub delta_num_clusters: usize,
    /// Number of bins every signal is digitized into.
    pub num_timesignal_bins: usize,
    /// Reduce the cluster count instead of failing when there are fewer distinct jobs than clusters.
    #[serde(default)]
    pub ok_if_low_rank: bool,
    /// Fixed cluster count, disables the search.
    #[serde(default)]
    pub num_clusters: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Start time schedule strategy.
    #[serde(rename = "type")]
    pub schedule: ScheduleKind,
    /// Job generation strategy.
    #[serde(default)]
    pub strategy: GenerationStrategyKind,
    /// Number of bins of the empirical start time distribution.
    pub n_bins_for_pdf: usize,
    pub random_seed: u64,
    /// Per-metric tuning factors of the synthetic workload (missing metrics use 1.0).
    #[serde(default)]
    pub scaling_factors: BTreeMap<SignalKind, f64>,
    /// Multiplier of the job submission rate.
    pub submit_rate_factor: f64,
    /// CPU count of jobs created from cluster centroids.
    pub synthapp_n_cpu: u32,
    /// Node count of jobs created from cluster centroids.
    pub synthapp_n_nodes: u32,
    /// Length of the synthetic submission window in seconds.
    pub total_submit_interval: f64,
    /// Multiplier of cluster mean CPU/node counts for sampled jobs without their own counts.
    #[serde(default = "one")]
    pub global_scaling_factor: f64,
    /// Overrides of the metric hard limits applied at export.
    #[serde(default)]
    pub metrics_hard_limits: BTreeMap<SignalKind, f64>,
}

/// Creates a new workload out of the jobs of an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    /// Source workload.
    pub apply_to: String,
    /// Tag of the created workload.
    pub create_workload: String,
    /// Job attribute tested against the keywords.
    pub split_by: JobAttribute,
    #[serde(default)]
    pub keywords_in: Vec<String>,
    #[serde(default)]
    pub keywords_out: Vec<String>,
}

/// Operations completing the signals of workload jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum FillingOperation {
    /// Fills empty signal slots with constant one-sample signals.
    FillMissingEntries {
        apply_to: Vec<String>,
        #[serde(default)]
        default_values: BTreeMap<SignalKind, f64>,
        #[serde(default)]
        priority: Option<u8>,
    },
    /// Copies signals from jobs of other workloads whose attributes match.
    MatchByKeyword {
        apply_to: Vec<String>,
        source_workloads: Vec<String>,
        match_by: Vec<JobAttribute>,
        #[serde(default)]
        priority: Option<u8>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default)]
    pub workload_filling: Vec<FillingOperation>,
    #[serde(default)]
    pub workload_splitting: Vec<SplitConfig>,
    pub clustering: ClusteringConfig,
    pub generator: GenerationConfig,
}

impl ModelConfig {
    /// Reads and validates config from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Parses and validates config from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for op in self.workload_filling.iter() {
            op.validate()?;
        }
        for split in self.workload_splitting.iter() {
            if split.keywords_in.is_empty() && split.keywords_out.is_empty() {
                return Err(config_error(format!(
                    "splitting into {}: either keywords_in or keywords_out must be given",
                    split.create_workload
                )));
            }
        }
        self.clustering.validate()?;
        self.generator.validate()
    }
}

impl FillingOperation {
    pub fn apply_to(&self) -> &[String] {
        match self {
            FillingOperation::FillMissingEntries { apply_to, .. } => apply_to,
            FillingOperation::MatchByKeyword { apply_to, .. } => apply_to,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.apply_to().is_empty() {
            return Err(config_error("workload filling: apply_to must not be empty".to_string()));
        }
        match self {
            FillingOperation::FillMissingEntries {
                default_values,
                priority,
                ..
            } => {
                for (kind, value) in default_values.iter() {
                    if !value.is_finite() || *value < 0. {
                        return Err(config_error(format!(
                            "workload filling: default value of {} must be a non-negative number, got {}",
                            kind, value
                        )));
                    }
                }
                check_priority(*priority)
            }
            FillingOperation::MatchByKeyword {
                source_workloads,
                match_by,
                priority,
                ..
            } => {
                if source_workloads.is_empty() || match_by.is_empty() {
                    return Err(config_error(
                        "workload filling: match_by_keyword needs source_workloads and match_by".to_string(),
                    ));
                }
                check_priority(*priority)
            }
        }
    }
}

impl ClusteringConfig {
    fn validate(&self) -> Result<()> {
        if self.apply_to.is_empty() {
            return Err(config_error("clustering: apply_to must not be empty".to_string()));
        }
        if self.num_timesignal_bins == 0 {
            return Err(config_error("clustering: num_timesignal_bins must be positive".to_string()));
        }
        if self.max_iter == 0 {
            return Err(config_error("clustering: max_iter must be positive".to_string()));
        }
        if self.max_num_clusters == 0 {
            return Err(config_error("clustering: max_num_clusters must be positive".to_string()));
        }
        if self.delta_num_clusters == 0 {
            return Err(config_error("clustering: delta_num_clusters must be positive".to_string()));
        }
        if self.num_clusters == Some(0) {
            return Err(config_error("clustering: num_clusters must be positive".to_string()));
        }
        Ok(())
    }
}

impl GenerationConfig {
    fn validate(&self) -> Result<()> {
        if self.n_bins_for_pdf == 0 {
            return Err(config_error("generator: n_bins_for_pdf must be positive".to_string()));
        }
        check_positive("submit_rate_factor", self.submit_rate_factor)?;
        check_positive("total_submit_interval", self.total_submit_interval)?;
        check_positive("global_scaling_factor", self.global_scaling_factor)?;
        if self.synthapp_n_cpu == 0 || self.synthapp_n_nodes == 0 {
            return Err(config_error(
                "generator: synthapp_n_cpu and synthapp_n_nodes must be positive".to_string(),
            ));
        }
        for (kind, factor) in self.scaling_factors.iter() {
            check_positive(&format!("scaling factor of {}", kind), *factor)?;
        }
        SignalRegistry::with_hard_limits(&self.metrics_hard_limits)?;
        Ok(())
    }

    /// Registry with the configured hard limits applied.
    pub fn registry(&self) -> Result<SignalRegistry> {
        SignalRegistry::with_hard_limits(&self.metrics_hard_limits)
    }

    /// Tuning factors for all metrics, 1.0 where none is configured.
    pub fn tuning_factors(&self) -> BTreeMap<SignalKind, f64> {
        SignalKind::ALL
            .iter()
            .map(|kind| (*kind, self.scaling_factors.get(kind).copied().unwrap_or(1.)))
            .collect()
    }
}

fn config_error(message: String) -> WorkloadError {
    WorkloadError::Config(message)
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(config_error(format!("generator: {} must be a positive number, got {}", name, value)))
    }
}

fn check_priority(priority: Option<u8>) -> Result<()> {
    match priority {
        Some(p) if p > MAX_PRIORITY => Err(config_error(format!(
            "workload filling: priority {} out of range [0, {}]",
            p, MAX_PRIORITY
        ))),
        _ => Ok(()),
    }
}
