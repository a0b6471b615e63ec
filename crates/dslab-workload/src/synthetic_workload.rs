//! Collection of synthetic applications and its export.

use std::collections::BTreeMap;

use crate::error::{Result, WorkloadError};
use crate::ksf::{KsfApp, KsfDocument, KsfMetadata, KSF_TAG, KSF_VERSION};
use crate::signal::{SignalKind, SignalRegistry};
use crate::synthetic_app::SyntheticApp;

pub struct SyntheticWorkload {
    pub app_list: Vec<SyntheticApp>,
    tuning_factor: Option<BTreeMap<SignalKind, f64>>,
    n_bins: usize,
    registry: SignalRegistry,
}

impl SyntheticWorkload {
    pub fn new(app_list: Vec<SyntheticApp>, n_bins: usize, registry: SignalRegistry) -> Self {
        Self {
            app_list,
            tuning_factor: None,
            n_bins,
            registry,
        }
    }

    pub fn len(&self) -> usize {
        self.app_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.app_list.is_empty()
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }

    pub fn tuning_factors(&self) -> Option<&BTreeMap<SignalKind, f64>> {
        self.tuning_factor.as_ref()
    }

    /// Sets per-metric tuning factors, metrics not listed get 1.0. Every application receives its
    /// own copy.
    pub fn set_tuning_factors(&mut self, factors: &BTreeMap<SignalKind, f64>) {
        let full: BTreeMap<SignalKind, f64> = SignalKind::ALL
            .iter()
            .map(|kind| (*kind, factors.get(kind).copied().unwrap_or(1.)))
            .collect();
        for app in self.app_list.iter_mut() {
            app.set_tuning_factor(full.clone());
        }
        self.tuning_factor = Some(full);
    }

    /// Per-metric sums of the application signals, optionally multiplied by the tuning factors.
    pub fn total_metrics_dict(&self, include_tuning_factors: bool) -> Result<BTreeMap<SignalKind, f64>> {
        if include_tuning_factors && self.tuning_factor.is_none() {
            return Err(WorkloadError::TuningFactorsNotSet);
        }
        let mut totals: BTreeMap<SignalKind, f64> = SignalKind::ALL.iter().map(|kind| (*kind, 0.)).collect();
        for app in self.app_list.iter() {
            for kind in SignalKind::ALL.iter() {
                let factor = match (include_tuning_factors, app.tuning_factor()) {
                    (true, Some(factors)) => factors.get(kind).copied().unwrap_or(1.),
                    (true, None) => return Err(WorkloadError::TuningFactorsNotSet),
                    (false, _) => 1.,
                };
                *totals.entry(*kind).or_insert(0.) += app.job.signal_sum(*kind) * factor;
            }
        }
        Ok(totals)
    }

    /// Per-metric sums of the values actually exported in application frames.
    pub fn total_metrics_apps(&self) -> Result<BTreeMap<SignalKind, f64>> {
        let mut totals: BTreeMap<SignalKind, f64> = SignalKind::ALL.iter().map(|kind| (*kind, 0.)).collect();
        for app in self.app_list.iter() {
            for frame in app.frame_data(self.n_bins, &self.registry)?.iter().flatten() {
                for (key, value) in frame.values.iter() {
                    let kind = key.parse::<SignalKind>()?;
                    *totals.entry(kind).or_insert(0.) += value.as_f64();
                }
            }
        }
        Ok(totals)
    }

    /// Ratio of exported to modelled totals per metric, 1.0 where the modelled total is zero.
    pub fn relative_totals(&self) -> Result<BTreeMap<SignalKind, f64>> {
        let modelled = self.total_metrics_dict(true)?;
        let exported = self.total_metrics_apps()?;
        Ok(SignalKind::ALL
            .iter()
            .map(|kind| {
                let ratio = if modelled[kind] != 0. {
                    exported[kind] / modelled[kind]
                } else {
                    1.
                };
                (*kind, ratio)
            })
            .collect())
    }

    pub fn export_ksf(&self, workload_name: &str) -> Result<KsfDocument> {
        let scaling_factors = self.tuning_factor.clone().ok_or(WorkloadError::TuningFactorsNotSet)?;
        let t0 = self
            .app_list
            .iter()
            .map(|app| app.time_start())
            .fold(f64::INFINITY, f64::min);
        let mut synthetic_apps = Vec::with_capacity(self.app_list.len());
        for app in self.app_list.iter() {
            synthetic_apps.push(KsfApp {
                num_procs: app.job.ncpus.unwrap_or(1),
                num_nodes: app.job.nnodes.unwrap_or(1),
                start_delay: app.time_start() - t0,
                frames: app.frame_data(self.n_bins, &self.registry)?,
                metadata: KsfMetadata {
                    job_name: app.job_name.clone(),
                    workload_name: workload_name.to_string(),
                },
            });
        }
        Ok(KsfDocument {
            tag: KSF_TAG.to_string(),
            version: KSF_VERSION,
            scaling_factors,
            unscaled_metrics_sums: self.total_metrics_dict(false)?,
            synthetic_apps,
        })
    }
}
