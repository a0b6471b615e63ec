use log::{debug, info};
use rand::seq::{index, SliceRandom};
use rand_pcg::Pcg64;

use crate::clustering::ClusterResult;
use crate::error::Result;
use crate::generation::schedule::Schedule;
use crate::generation::{GeneratedJobs, GenerationStrategy};
use crate::job::ModelJob;

/// Samples real jobs from every cluster in proportion to its size.
pub struct StrategySpawnRand<'a> {
    clusters: &'a ClusterResult,
    schedule: &'a Schedule,
    default_ncpus: u32,
    default_nnodes: u32,
    global_scaling_factor: f64,
}

struct PooledJob<'a> {
    job: &'a ModelJob,
    cluster: usize,
    mean_ncpus: f64,
    mean_nnodes: f64,
}

impl<'a> StrategySpawnRand<'a> {
    pub fn new(
        clusters: &'a ClusterResult,
        schedule: &'a Schedule,
        default_ncpus: u32,
        default_nnodes: u32,
        global_scaling_factor: f64,
    ) -> Self {
        Self {
            clusters,
            schedule,
            default_ncpus,
            default_nnodes,
            global_scaling_factor,
        }
    }

    /// Number of jobs drawn from a cluster of `size` members.
    pub fn jobs_per_cluster(size: usize, n_source: usize, n_schedule: usize) -> usize {
        if size == 0 || n_source == 0 {
            return 0;
        }
        let share = (size as f64 / n_source as f64 * n_schedule as f64).round() as usize;
        share.max(1).min(size)
    }

    fn scaled_count(&self, own: Option<u32>, mean: f64) -> u32 {
        own.unwrap_or_else(|| ((mean * self.global_scaling_factor).floor() as u32).max(1))
    }

    fn sample_pool(&self, rng: &mut Pcg64) -> Vec<PooledJob<'a>> {
        let clusters = self.clusters;
        let n_source = clusters.jobs_for_clustering.len();
        let mut pool = Vec::new();
        for c in 0..clusters.num_clusters() {
            let members = clusters.members(c);
            let n_c = Self::jobs_per_cluster(members.len(), n_source, self.schedule.len());
            if n_c == 0 {
                continue;
            }
            let sampled: Vec<&ModelJob> = index::sample(rng, members.len(), n_c)
                .into_iter()
                .map(|i| &clusters.jobs_for_clustering[members[i]])
                .collect();
            let mean_ncpus = mean_or(sampled.iter().filter_map(|j| j.ncpus), self.default_ncpus);
            let mean_nnodes = mean_or(sampled.iter().filter_map(|j| j.nnodes), self.default_nnodes);
            debug!(
                "Workload {} cluster {}: sampled {} of {} jobs",
                clusters.source_workload,
                c,
                n_c,
                members.len()
            );
            pool.extend(sampled.into_iter().map(|job| PooledJob {
                job,
                cluster: c,
                mean_ncpus,
                mean_nnodes,
            }));
        }
        pool
    }
}

impl GenerationStrategy for StrategySpawnRand<'_> {
    fn generate_jobs(&self, rng: &mut Pcg64) -> Result<GeneratedJobs> {
        let mut generated = GeneratedJobs::default();
        let n_schedule = self.schedule.len();
        if n_schedule == 0 {
            return Ok(generated);
        }
        let mut pool = self.sample_pool(rng);
        // the pool is grouped by cluster, mix it so clusters share the schedule
        pool.shuffle(rng);
        let start_times: Vec<f64> = if pool.len() <= n_schedule {
            let mut picked = index::sample(rng, n_schedule, pool.len()).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|i| self.schedule.start_times[i]).collect()
        } else {
            (0..pool.len()).map(|i| self.schedule.start_times[i % n_schedule]).collect()
        };

        for (entry, time_start) in pool.into_iter().zip(start_times) {
            let mut job = entry.job.clone();
            job.time_start = time_start;
            job.ncpus = Some(self.scaled_count(entry.job.ncpus, entry.mean_ncpus));
            job.nnodes = Some(self.scaled_count(entry.job.nnodes, entry.mean_nnodes));
            generated.jobs.push(job);
            generated.cluster_index.push(entry.cluster);
        }
        info!(
            "Workload {}: sampled {} jobs (generated/source ratio {:.3})",
            self.clusters.source_workload,
            generated.len(),
            generated.len() as f64 / self.clusters.jobs_for_clustering.len().max(1) as f64
        );
        Ok(generated)
    }
}

fn mean_or(values: impl Iterator<Item = u32>, default: u32) -> f64 {
    let (sum, count) = values.fold((0., 0usize), |(s, n), v| (s + v as f64, n + 1));
    if count == 0 {
        default as f64
    } else {
        sum / count as f64
    }
}
