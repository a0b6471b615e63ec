use log::info;
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::clustering::ClusterResult;
use crate::error::{Result, WorkloadError};
use crate::generation::schedule::Schedule;
use crate::generation::{GeneratedJobs, GenerationStrategy};
use crate::job::ModelJob;
use crate::signal::SignalKind;
use crate::time_signal::TimeSignal;

/// Creates one job per schedule entry out of the centroid of a randomly chosen cluster.
pub struct StrategySpawn<'a> {
    clusters: &'a ClusterResult,
    schedule: &'a Schedule,
    n_bins: usize,
    ncpus: u32,
    nnodes: u32,
}

impl<'a> StrategySpawn<'a> {
    pub fn new(clusters: &'a ClusterResult, schedule: &'a Schedule, n_bins: usize, ncpus: u32, nnodes: u32) -> Self {
        Self {
            clusters,
            schedule,
            n_bins,
            ncpus,
            nnodes,
        }
    }

    fn centroid_job(&self, cluster: usize, time_start: f64) -> Result<ModelJob> {
        let row = self.clusters.cluster_matrix.row(cluster).to_vec();
        if row.len() != SignalKind::ALL.len() * self.n_bins {
            return Err(WorkloadError::Clustering {
                workload: self.clusters.source_workload.clone(),
                detail: format!(
                    "centroid has {} values, expected {} metrics of {} bins",
                    row.len(),
                    SignalKind::ALL.len(),
                    self.n_bins
                ),
            });
        }
        let mut job = ModelJob::new(time_start, Some(self.ncpus), Some(self.nnodes));
        job.label = Some(self.clusters.source_workload.clone());
        for (kind, values) in SignalKind::ALL.iter().zip(row.chunks(self.n_bins)) {
            let xvalues = (0..self.n_bins).map(|i| i as f64).collect();
            job.set_signal(TimeSignal::from_values(kind.name(), xvalues, values.to_vec(), None, None)?);
        }
        Ok(job)
    }
}

impl GenerationStrategy for StrategySpawn<'_> {
    fn generate_jobs(&self, rng: &mut Pcg64) -> Result<GeneratedJobs> {
        let k = self.clusters.num_clusters();
        let mut generated = GeneratedJobs::default();
        if k == 0 || self.n_bins == 0 {
            return Ok(generated);
        }
        for &time_start in self.schedule.start_times.iter() {
            let cluster = rng.gen_range(0..k);
            generated.jobs.push(self.centroid_job(cluster, time_start)?);
            generated.cluster_index.push(cluster);
        }
        info!(
            "Workload {}: spawned {} jobs from {} centroids (generated/source ratio {:.3})",
            self.clusters.source_workload,
            generated.len(),
            k,
            generated.len() as f64 / self.clusters.jobs_for_clustering.len().max(1) as f64
        );
        Ok(generated)
    }
}
