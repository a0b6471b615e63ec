//! Grouping of workload jobs by behavioural similarity.
//!
//! Any engine implementing [`Clustering`] can be used; the rest of the pipeline only sees the
//! resulting [`ClusterResult`].

pub mod kmeans;

use log::{info, warn};
use ndarray::{ArrayView1, Axis};

use crate::config::{ClusteringConfig, ClusteringKind};
use crate::error::{Result, WorkloadError};
use crate::job::ModelJob;
use crate::workload::{Matrix, WorkloadData};

use kmeans::KMeans;

/// Output of a clustering engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Clusters {
    /// One row per cluster.
    pub centroids: Matrix,
    /// Cluster index of every input row.
    pub labels: Vec<usize>,
}

impl Clusters {
    pub fn num_clusters(&self) -> usize {
        self.centroids.nrows()
    }
}

/// Clustering engine: groups the rows of a feature matrix.
pub trait Clustering {
    fn cluster(&mut self, workload: &str, matrix: &Matrix) -> Result<Clusters>;
}

/// Creates the engine selected in the config.
pub fn default_clustering_resolver(config: &ClusteringConfig) -> Box<dyn Clustering> {
    match config.kind {
        ClusteringKind::Kmeans => Box::new(KMeans::from_config(config)),
    }
}

/// Clusters of one workload, as consumed by job generation.
#[derive(Debug, Clone)]
pub struct ClusterResult {
    pub source_workload: String,
    pub jobs_for_clustering: Vec<ModelJob>,
    pub cluster_matrix: Matrix,
    /// Cluster index of every job in `jobs_for_clustering`.
    pub labels: Vec<usize>,
    /// Radius of gyration of the jobs of every cluster.
    pub r_gyration: Vec<f64>,
}

impl ClusterResult {
    pub fn num_clusters(&self) -> usize {
        self.cluster_matrix.nrows()
    }

    /// Indices of the jobs belonging to the cluster.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Clusters the jobs of a workload.
///
/// The workload must be complete (see [`WorkloadData::check_jobs`]). Negative centroid entries
/// produced by the engine are clamped to zero.
pub fn cluster_workload(engine: &mut dyn Clustering, workload: &WorkloadData, n_bins: usize) -> Result<ClusterResult> {
    let matrix = workload.jobs_to_matrix(n_bins)?;
    if matrix.nrows() == 0 {
        return Err(WorkloadError::Clustering {
            workload: workload.tag.clone(),
            detail: "workload has no jobs".to_string(),
        });
    }
    let Clusters { mut centroids, labels } = engine.cluster(&workload.tag, &matrix)?;
    check_clusters(&workload.tag, &matrix, &centroids, &labels)?;

    let clamped = clamp_negative_centroids(&mut centroids);
    if clamped > 0 {
        warn!(
            "Clamped {} negative centroid values to zero in workload {}",
            clamped, workload.tag
        );
    }

    let r_gyration = (0..centroids.nrows())
        .map(|c| {
            let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == c).collect();
            r_gyration(&matrix.select(Axis(0), &members))
        })
        .collect();
    info!(
        "Workload {}: {} jobs grouped into {} clusters",
        workload.tag,
        matrix.nrows(),
        centroids.nrows()
    );
    Ok(ClusterResult {
        source_workload: workload.tag.clone(),
        jobs_for_clustering: workload.jobs.clone(),
        cluster_matrix: centroids,
        labels,
        r_gyration,
    })
}

fn check_clusters(workload: &str, matrix: &Matrix, centroids: &Matrix, labels: &[usize]) -> Result<()> {
    let fail = |detail: String| {
        Err(WorkloadError::Clustering {
            workload: workload.to_string(),
            detail,
        })
    };
    if centroids.nrows() == 0 {
        return fail("engine produced no clusters".to_string());
    }
    if labels.len() != matrix.nrows() {
        return fail(format!("{} labels for {} jobs", labels.len(), matrix.nrows()));
    }
    if let Some(label) = labels.iter().find(|&&label| label >= centroids.nrows()) {
        return fail(format!("label {} exceeds cluster count {}", label, centroids.nrows()));
    }
    if centroids.ncols() != matrix.ncols() {
        return fail(format!(
            "centroid width {} differs from feature width {}",
            centroids.ncols(),
            matrix.ncols()
        ));
    }
    Ok(())
}

/// Sets negative entries of the centroid matrix to zero, returns how many were changed.
pub fn clamp_negative_centroids(matrix: &mut Matrix) -> usize {
    let mut clamped = 0;
    for value in matrix.iter_mut() {
        if *value < 0. {
            *value = 0.;
            clamped += 1;
        }
    }
    clamped
}

/// Root mean square distance of the rows from their centroid.
pub fn r_gyration(rows: &Matrix) -> f64 {
    if rows.nrows() <= 1 {
        return 0.;
    }
    let centroid = match rows.mean_axis(Axis(0)) {
        Some(centroid) => centroid,
        None => return 0.,
    };
    let sq_sum: f64 = rows
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, centroid.view()))
        .sum();
    (sq_sum / rows.nrows() as f64).sqrt()
}

pub(crate) fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
