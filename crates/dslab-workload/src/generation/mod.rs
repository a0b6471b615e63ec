//! Synthetic job generation from clustered workloads.
//!
//! For every clustered workload a start time [`schedule`] is built from the source jobs, then a
//! [`GenerationStrategy`] creates the jobs and [`normalize`] rescales them to the source totals.

pub mod normalize;
pub mod schedule;
pub mod spawn;
pub mod spawn_random;

use log::info;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::clustering::{r_gyration, ClusterResult};
use crate::config::GenerationConfig;
use crate::error::Result;
use crate::job::ModelJob;
use crate::report::ClusterReport;
use crate::workload::features_matrix;

use normalize::normalize_jobs;
use schedule::{Schedule, ScheduleStrategy};
use spawn::StrategySpawn;
use spawn_random::StrategySpawnRand;

/// Job generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategyKind {
    /// Jobs are copies of cluster centroids.
    Spawn,
    /// Jobs are sampled from the cluster members.
    #[default]
    SpawnRandom,
}

/// Jobs created by a strategy with the cluster each of them comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedJobs {
    pub jobs: Vec<ModelJob>,
    pub cluster_index: Vec<usize>,
}

impl GeneratedJobs {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

pub trait GenerationStrategy {
    fn generate_jobs(&self, rng: &mut Pcg64) -> Result<GeneratedJobs>;
}

/// Generated jobs of all clustered workloads.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOutput {
    pub jobs: Vec<ModelJob>,
    pub reports: Vec<ClusterReport>,
}

pub struct SyntheticWorkloadGenerator<'a> {
    config: &'a GenerationConfig,
    n_bins: usize,
    window: (f64, f64),
}

impl<'a> SyntheticWorkloadGenerator<'a> {
    /// Creates generator for workloads observed within `window` whose signals are digitized into
    /// `n_bins` bins.
    pub fn new(config: &'a GenerationConfig, n_bins: usize, window: (f64, f64)) -> Self {
        Self { config, n_bins, window }
    }

    fn strategy<'b>(&self, clusters: &'b ClusterResult, schedule: &'b Schedule) -> Box<dyn GenerationStrategy + 'b> {
        let config = self.config;
        match config.strategy {
            GenerationStrategyKind::Spawn => Box::new(StrategySpawn::new(
                clusters,
                schedule,
                self.n_bins,
                config.synthapp_n_cpu,
                config.synthapp_n_nodes,
            )),
            GenerationStrategyKind::SpawnRandom => Box::new(StrategySpawnRand::new(
                clusters,
                schedule,
                config.synthapp_n_cpu,
                config.synthapp_n_nodes,
                config.global_scaling_factor,
            )),
        }
    }

    /// Generates jobs for every cluster result. All random draws come from one generator seeded
    /// with the configured seed.
    pub fn generate(&self, cluster_results: &[ClusterResult]) -> Result<GeneratorOutput> {
        let mut rng = Pcg64::seed_from_u64(self.config.random_seed);
        let mut output = GeneratorOutput::default();
        for clusters in cluster_results.iter() {
            let start_times = clusters.jobs_for_clustering.iter().map(|job| job.time_start).collect();
            let schedule = ScheduleStrategy::new(
                self.config.schedule,
                start_times,
                self.window,
                self.config.total_submit_interval,
                self.config.submit_rate_factor,
                self.config.n_bins_for_pdf,
            )
            .create_schedule(&mut rng);

            let generated = self.strategy(clusters, &schedule).generate_jobs(&mut rng)?;
            let jobs = normalize_jobs(&clusters.jobs_for_clustering, generated.jobs);
            let report = self.cluster_report(clusters, &jobs, &generated.cluster_index)?;
            info!(
                "Workload {}: {} source jobs, {} scheduled, {} generated",
                clusters.source_workload,
                clusters.jobs_for_clustering.len(),
                schedule.len(),
                jobs.len()
            );
            output.reports.push(report);
            output.jobs.extend(jobs);
        }
        Ok(output)
    }

    fn cluster_report(
        &self,
        clusters: &ClusterResult,
        jobs: &[ModelJob],
        cluster_index: &[usize],
    ) -> Result<ClusterReport> {
        let mut generated_r_gyration = Vec::with_capacity(clusters.num_clusters());
        for c in 0..clusters.num_clusters() {
            let members = jobs
                .iter()
                .zip(cluster_index.iter())
                .filter(|(_, &label)| label == c)
                .map(|(job, _)| job);
            generated_r_gyration.push(r_gyration(&features_matrix(members, self.n_bins)?));
        }
        let source_jobs = clusters.jobs_for_clustering.len();
        Ok(ClusterReport {
            workload: clusters.source_workload.clone(),
            num_clusters: clusters.num_clusters(),
            source_jobs,
            generated_jobs: jobs.len(),
            ratio: jobs.len() as f64 / source_jobs.max(1) as f64,
            source_r_gyration: clusters.r_gyration.clone(),
            generated_r_gyration,
        })
    }
}
