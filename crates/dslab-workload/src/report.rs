//! Summary of a modelling run.

use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use crate::error::Result;
use crate::signal::SignalKind;

/// Clustering and generation summary of one source workload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub workload: String,
    pub num_clusters: usize,
    pub source_jobs: usize,
    pub generated_jobs: usize,
    /// Generated jobs per source job.
    pub ratio: f64,
    pub source_r_gyration: Vec<f64>,
    pub generated_r_gyration: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelReport {
    pub clusters: Vec<ClusterReport>,
    /// Exported to modelled totals per metric.
    pub relative_totals: BTreeMap<SignalKind, f64>,
    pub total_source_jobs: usize,
    pub total_generated_jobs: usize,
}

impl ModelReport {
    pub fn new(clusters: Vec<ClusterReport>, relative_totals: BTreeMap<SignalKind, f64>) -> Self {
        Self {
            total_source_jobs: clusters.iter().map(|c| c.source_jobs).sum(),
            total_generated_jobs: clusters.iter().map(|c| c.generated_jobs).sum(),
            clusters,
            relative_totals,
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn log_summary(&self) {
        for c in self.clusters.iter() {
            info!(
                "{}: {} clusters, {} source jobs, {} generated jobs",
                c.workload, c.num_clusters, c.source_jobs, c.generated_jobs
            );
        }
        for (kind, ratio) in self.relative_totals.iter() {
            info!("{:>14}: exported/modelled = {:.4}", kind.name(), ratio);
        }
    }
}
