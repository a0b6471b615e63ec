//! Start times of synthetic jobs.
//!
//! Source start times are treated as samples of an empirical distribution over the source time
//! window. The synthetic schedule reproduces its shape stretched over the configured submission
//! interval, with the job count scaled by the submission rate factor.

use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Schedule strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Start times are drawn at random from the empirical distribution.
    MatchJobPdf,
    /// Per-bin job counts follow the empirical distribution as closely as integers allow.
    MatchJobPdfExact,
}

/// Sorted start times of synthetic jobs (absolute, in seconds).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub start_times: Vec<f64>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.start_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_times.is_empty()
    }
}

pub struct ScheduleStrategy {
    kind: ScheduleKind,
    source_start_times: Vec<f64>,
    t0: f64,
    tend: f64,
    total_submit_interval: f64,
    submit_rate_factor: f64,
    n_bins: usize,
}

impl ScheduleStrategy {
    /// Creates strategy for the given source start times observed within `[t0, tend]`.
    pub fn new(
        kind: ScheduleKind,
        source_start_times: Vec<f64>,
        window: (f64, f64),
        total_submit_interval: f64,
        submit_rate_factor: f64,
        n_bins: usize,
    ) -> Self {
        Self {
            kind,
            source_start_times,
            t0: window.0,
            tend: window.1,
            total_submit_interval,
            submit_rate_factor,
            n_bins: n_bins.max(1),
        }
    }

    /// Number of synthetic jobs matching the scaled submission rate.
    pub fn num_jobs(&self) -> usize {
        let n = self.source_start_times.len();
        if n == 0 {
            return 0;
        }
        let span = self.tend - self.t0;
        let target = if span > 0. {
            n as f64 * self.submit_rate_factor * self.total_submit_interval / span
        } else {
            n as f64 * self.submit_rate_factor
        };
        (target.round() as usize).max(1)
    }

    /// Probability of a source job starting in each bin of the source window.
    pub fn pdf(&self) -> Vec<f64> {
        let mut counts = vec![0usize; self.n_bins];
        let span = self.tend - self.t0;
        for t in self.source_start_times.iter() {
            let bin = if span > 0. {
                ((t - self.t0) / span * self.n_bins as f64).floor().max(0.) as usize
            } else {
                0
            };
            counts[bin.min(self.n_bins - 1)] += 1;
        }
        let total = self.source_start_times.len().max(1) as f64;
        counts.iter().map(|&c| c as f64 / total).collect()
    }

    pub fn create_schedule(&self, rng: &mut Pcg64) -> Schedule {
        let n_jobs = self.num_jobs();
        if n_jobs == 0 {
            return Schedule::default();
        }
        let pdf = self.pdf();
        let width = self.total_submit_interval / self.n_bins as f64;
        let mut start_times = match self.kind {
            ScheduleKind::MatchJobPdf => {
                let mut cdf = Vec::with_capacity(pdf.len());
                let mut acc = 0.;
                for p in pdf.iter() {
                    acc += p;
                    cdf.push(acc);
                }
                (0..n_jobs)
                    .map(|_| {
                        let p: f64 = rng.gen();
                        let bin = cdf.iter().position(|&c| c > p).unwrap_or(self.n_bins - 1);
                        self.t0 + (bin as f64 + rng.gen::<f64>()) * width
                    })
                    .collect::<Vec<_>>()
            }
            ScheduleKind::MatchJobPdfExact => {
                let mut times = Vec::with_capacity(n_jobs);
                for (bin, count) in exact_bin_counts(&pdf, n_jobs).into_iter().enumerate() {
                    for i in 0..count {
                        times.push(self.t0 + (bin as f64 + (i as f64 + 0.5) / count as f64) * width);
                    }
                }
                times
            }
        };
        start_times.sort_by(|a, b| a.total_cmp(b));
        Schedule { start_times }
    }
}

/// Splits `n` items over bins proportionally to `pdf` using the largest remainder method.
pub fn exact_bin_counts(pdf: &[f64], n: usize) -> Vec<usize> {
    let quotas: Vec<f64> = pdf.iter().map(|p| p * n as f64).collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();
    let mut order: Vec<usize> = (0..pdf.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &bin in order.iter().take(n.saturating_sub(assigned)) {
        counts[bin] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn largest_remainder_preserves_total() {
        let counts = exact_bin_counts(&[0.5, 0.25, 0.25], 7);
        assert_eq!(counts.iter().sum::<usize>(), 7);
        assert_eq!(counts, vec![4, 2, 1]);
    }
}
