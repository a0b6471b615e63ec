//! K-means clustering backed by `linfa-clustering`.
//!
//! The cluster count is either fixed or searched over `delta, 2 * delta, ..., max_num_clusters`,
//! keeping the count with the best mean silhouette.

use itertools::Itertools;
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans as KMeansModel;
use log::{debug, info, warn};
use ndarray::Array1;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::clustering::{squared_distance, Clustering, Clusters};
use crate::config::ClusteringConfig;
use crate::error::{Result, WorkloadError};
use crate::workload::Matrix;

const TOLERANCE: f64 = 1e-4;

pub struct KMeans {
    rseed: u64,
    max_iter: usize,
    max_num_clusters: usize,
    delta_num_clusters: usize,
    ok_if_low_rank: bool,
    num_clusters: Option<usize>,
}

impl KMeans {
    pub fn new(rseed: u64, max_iter: usize, max_num_clusters: usize, delta_num_clusters: usize) -> Self {
        Self {
            rseed,
            max_iter,
            max_num_clusters,
            delta_num_clusters,
            ok_if_low_rank: false,
            num_clusters: None,
        }
    }

    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self {
            rseed: config.rseed,
            max_iter: config.max_iter,
            max_num_clusters: config.max_num_clusters,
            delta_num_clusters: config.delta_num_clusters,
            ok_if_low_rank: config.ok_if_low_rank,
            num_clusters: config.num_clusters,
        }
    }

    /// Uses the given cluster count instead of searching for one.
    pub fn with_num_clusters(mut self, num_clusters: usize, ok_if_low_rank: bool) -> Self {
        self.num_clusters = Some(num_clusters);
        self.ok_if_low_rank = ok_if_low_rank;
        self
    }

    /// Fits k-means with exactly `k` clusters. Every fit starts from the configured seed.
    fn fit(&self, workload: &str, matrix: &Matrix, k: usize) -> Result<Clusters> {
        let dataset = DatasetBase::from(matrix.clone());
        let model: KMeansModel<f64, _> = KMeansModel::params_with_rng(k, Pcg64::seed_from_u64(self.rseed))
            .max_n_iterations(self.max_iter as u64)
            .tolerance(TOLERANCE)
            .fit(&dataset)
            .map_err(|e| WorkloadError::Clustering {
                workload: workload.to_string(),
                detail: e.to_string(),
            })?;
        // labels are taken from the final centroids so both always agree
        let labels: Array1<usize> = model.predict(matrix);
        Ok(Clusters {
            centroids: model.centroids().clone(),
            labels: labels.to_vec(),
        })
    }

    fn resolve_fixed(&self, workload: &str, k: usize, distinct: usize) -> Result<usize> {
        if k <= distinct {
            return Ok(k);
        }
        if self.ok_if_low_rank {
            warn!(
                "Workload {} has only {} distinct jobs, using {} clusters instead of {}",
                workload, distinct, distinct, k
            );
            Ok(distinct)
        } else {
            Err(WorkloadError::Clustering {
                workload: workload.to_string(),
                detail: format!("{} clusters requested but only {} distinct jobs", k, distinct),
            })
        }
    }
}

impl Clustering for KMeans {
    fn cluster(&mut self, workload: &str, matrix: &Matrix) -> Result<Clusters> {
        if matrix.nrows() == 0 {
            return Err(WorkloadError::Clustering {
                workload: workload.to_string(),
                detail: "empty feature matrix".to_string(),
            });
        }
        let distinct = matrix
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|x| x.to_bits()).collect::<Vec<_>>())
            .unique()
            .count();

        if let Some(k) = self.num_clusters {
            let k = self.resolve_fixed(workload, k, distinct)?;
            return self.fit(workload, matrix, k);
        }

        let mut best: Option<(f64, Clusters)> = None;
        for k in (self.delta_num_clusters..=self.max_num_clusters).step_by(self.delta_num_clusters.max(1)) {
            if k < 2 || k > distinct {
                continue;
            }
            let clusters = self.fit(workload, matrix, k)?;
            let score = silhouette(matrix, &clusters);
            debug!("Workload {}: k={} silhouette={:.4}", workload, k, score);
            if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                best = Some((score, clusters));
            }
        }
        match best {
            Some((score, clusters)) => {
                info!(
                    "Workload {}: selected {} clusters (silhouette {:.4})",
                    workload,
                    clusters.num_clusters(),
                    score
                );
                Ok(clusters)
            }
            None => {
                let k = usize::min(self.max_num_clusters, distinct).max(1);
                info!("Workload {}: no cluster count to search, using {}", workload, k);
                self.fit(workload, matrix, k)
            }
        }
    }
}

/// Mean silhouette coefficient of a clustering.
pub fn silhouette(matrix: &Matrix, clusters: &Clusters) -> f64 {
    let k = clusters.num_clusters();
    if matrix.nrows() < 2 || k < 2 {
        return 0.;
    }
    let mut total = 0.;
    for (i, row) in matrix.rows().into_iter().enumerate() {
        let mut dist_sums = vec![0.; k];
        let mut counts = vec![0usize; k];
        for (j, other) in matrix.rows().into_iter().enumerate() {
            if i == j {
                continue;
            }
            let label = clusters.labels[j];
            dist_sums[label] += squared_distance(row, other).sqrt();
            counts[label] += 1;
        }
        let own = clusters.labels[i];
        if counts[own] == 0 {
            continue;
        }
        let a = dist_sums[own] / counts[own] as f64;
        let b = (0..k)
            .filter(|&c| c != own && counts[c] > 0)
            .map(|c| dist_sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);
        if b.is_finite() && a.max(b) > 0. {
            total += (b - a) / a.max(b);
        }
    }
    total / matrix.nrows() as f64
}
