//! Collections of jobs and the aggregate views used by clustering.

use std::collections::BTreeMap;

use log::info;
use ndarray::Array2;

use crate::config::SplitConfig;
use crate::error::{Result, WorkloadError};
use crate::job::ModelJob;
use crate::signal::SignalKind;
use crate::time_signal::TimeSignal;

/// Feature matrix, one row per job.
pub type Matrix = Array2<f64>;

/// Named, ordered collection of jobs.
#[derive(Debug, Clone, Default)]
pub struct WorkloadData {
    pub tag: String,
    pub jobs: Vec<ModelJob>,
}

impl WorkloadData {
    pub fn new(tag: &str, jobs: Vec<ModelJob>) -> Self {
        Self {
            tag: tag.to_string(),
            jobs,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Sum of every metric over all jobs. Missing signals count as zero.
    pub fn total_metrics_sum_dict(&self) -> BTreeMap<SignalKind, f64> {
        total_metrics_sum(&self.jobs)
    }

    /// Concatenation of every metric over all jobs, in absolute time.
    ///
    /// Metrics which no job carries are omitted.
    pub fn total_metrics_timesignals(&self) -> Result<BTreeMap<SignalKind, TimeSignal>> {
        let mut result = BTreeMap::new();
        for kind in SignalKind::ALL.iter() {
            let mut xvalues = Vec::new();
            let mut yvalues = Vec::new();
            let mut found = false;
            for job in self.jobs.iter() {
                if let Some(signal) = job.signal(*kind) {
                    found = true;
                    xvalues.extend(signal.xvalues().iter().map(|x| x + job.time_start));
                    yvalues.extend_from_slice(signal.yvalues());
                }
            }
            if found {
                result.insert(
                    *kind,
                    TimeSignal::from_values(kind.name(), xvalues, yvalues, None, None)?,
                );
            }
        }
        Ok(result)
    }

    /// Checks that every job carries all metrics.
    pub fn check_jobs(&self) -> Result<()> {
        for (i, job) in self.jobs.iter().enumerate() {
            job.check_job(&self.tag, i)?;
        }
        Ok(())
    }

    /// Builds the clustering feature matrix: each row concatenates the job's metrics, each
    /// digitized into `n_bins` bins, in declared metric order.
    pub fn jobs_to_matrix(&self, n_bins: usize) -> Result<Matrix> {
        self.check_jobs()?;
        features_matrix(self.jobs.iter(), n_bins)
    }

    /// Earliest and latest job start times.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.jobs.iter().fold(None, |range, job| match range {
            None => Some((job.time_start, job.time_start)),
            Some((t0, t1)) => Some((f64::min(t0, job.time_start), f64::max(t1, job.time_start))),
        })
    }

    /// Creates a new workload from the jobs whose attribute contains every `keywords_in` entry
    /// and no `keywords_out` entry. Jobs lacking the attribute are left out.
    pub fn split_by_keywords(&self, config: &SplitConfig) -> Result<WorkloadData> {
        if config.keywords_in.is_empty() && config.keywords_out.is_empty() {
            return Err(WorkloadError::Config(format!(
                "splitting of workload {} into {}: either keywords_in or keywords_out must be given",
                self.tag, config.create_workload
            )));
        }
        let jobs: Vec<ModelJob> = self
            .jobs
            .iter()
            .filter(|job| match job.attribute(config.split_by) {
                Some(value) => {
                    config.keywords_in.iter().all(|kw| value.contains(kw.as_str()))
                        && !config.keywords_out.iter().any(|kw| value.contains(kw.as_str()))
                }
                None => false,
            })
            .cloned()
            .collect();
        info!(
            "Split {} jobs by {} from workload {} into workload {}",
            jobs.len(),
            config.split_by,
            self.tag,
            config.create_workload
        );
        Ok(WorkloadData::new(&config.create_workload, jobs))
    }
}

/// Per-metric sums over a list of jobs.
pub fn total_metrics_sum(jobs: &[ModelJob]) -> BTreeMap<SignalKind, f64> {
    SignalKind::ALL
        .iter()
        .map(|kind| (*kind, jobs.iter().map(|job| job.signal_sum(*kind)).sum()))
        .collect()
}

/// Feature vector of one job, see [`WorkloadData::jobs_to_matrix`].
///
/// Missing signals contribute zero bins.
pub fn job_features(job: &ModelJob, n_bins: usize) -> Result<Vec<f64>> {
    let mut row = Vec::with_capacity(SignalKind::ALL.len() * n_bins);
    for kind in SignalKind::ALL.iter() {
        match job.signal(*kind) {
            Some(signal) => row.extend(signal.digitized(Some(n_bins))?.1),
            None => row.extend(std::iter::repeat(0.).take(n_bins)),
        }
    }
    Ok(row)
}

/// Stacks the feature vectors of the jobs into a matrix.
pub fn features_matrix<'a>(jobs: impl IntoIterator<Item = &'a ModelJob>, n_bins: usize) -> Result<Matrix> {
    let rows = jobs
        .into_iter()
        .map(|job| job_features(job, n_bins))
        .collect::<Result<Vec<_>>>()?;
    let mut matrix = Matrix::zeros((rows.len(), SignalKind::ALL.len() * n_bins));
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            matrix[[i, j]] = *value;
        }
    }
    Ok(matrix)
}
