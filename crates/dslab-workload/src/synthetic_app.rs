use std::collections::BTreeMap;

use crate::error::Result;
use crate::job::ModelJob;
use crate::kernels::{KernelFrame, KernelKind};
use crate::signal::{SignalKind, SignalRegistry};

/// Generated job ready for export as a synthetic application.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticApp {
    pub job: ModelJob,
    pub job_name: String,
    tuning_factor: Option<BTreeMap<SignalKind, f64>>,
}

impl SyntheticApp {
    /// Wraps a generated job. Synthetic applications have no fixed duration.
    pub fn new(job_name: &str, mut job: ModelJob) -> Self {
        job.duration = None;
        job.job_name = Some(job_name.to_string());
        Self {
            job,
            job_name: job_name.to_string(),
            tuning_factor: None,
        }
    }

    pub fn tuning_factor(&self) -> Option<&BTreeMap<SignalKind, f64>> {
        self.tuning_factor.as_ref()
    }

    pub fn set_tuning_factor(&mut self, factors: BTreeMap<SignalKind, f64>) {
        self.tuning_factor = Some(factors);
    }

    pub fn time_start(&self) -> f64 {
        self.job.time_start
    }

    /// Exported frames: one list of kernel frames per non-empty bin, in chronological order.
    ///
    /// Kernels without work are skipped, as are kernel frames whose bin had only zero values.
    pub fn frame_data(&self, n_bins: usize, registry: &SignalRegistry) -> Result<Vec<Vec<KernelFrame>>> {
        let mut kernels = Vec::new();
        for kind in KernelKind::ALL.iter() {
            if kind.is_empty(&self.job)? {
                continue;
            }
            kernels.push(kind.synapp_config(&self.job, n_bins, self.tuning_factor.as_ref(), registry)?);
        }
        let frames = (0..n_bins)
            .map(|bin| {
                kernels
                    .iter()
                    .map(|frames| &frames[bin])
                    .filter(|frame| !frame.empty)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|bin| !bin.is_empty())
            .collect();
        Ok(frames)
    }
}
