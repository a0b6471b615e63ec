//! End-to-end modelling pipeline.

use indexmap::IndexMap;
use log::{info, warn};

use crate::clustering::{cluster_workload, default_clustering_resolver, ClusterResult, Clustering};
use crate::config::ModelConfig;
use crate::error::{Result, WorkloadError};
use crate::filling::apply_filling;
use crate::generation::SyntheticWorkloadGenerator;
use crate::report::ModelReport;
use crate::signal::SignalRegistry;
use crate::synthetic_app::SyntheticApp;
use crate::synthetic_workload::SyntheticWorkload;
use crate::workload::WorkloadData;

pub struct ModelOutput {
    pub workload: SyntheticWorkload,
    pub report: ModelReport,
}

/// Turns source workloads into a synthetic workload.
pub struct WorkloadModel {
    config: ModelConfig,
    registry: SignalRegistry,
}

impl WorkloadModel {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let registry = config.generator.registry()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }

    /// Runs the pipeline with the clustering engine selected in the config.
    pub fn generate(&self, workloads: Vec<WorkloadData>) -> Result<ModelOutput> {
        let mut engine = default_clustering_resolver(&self.config.clustering);
        self.generate_with(workloads, engine.as_mut())
    }

    /// Runs the pipeline with the given clustering engine.
    pub fn generate_with(&self, workloads: Vec<WorkloadData>, engine: &mut dyn Clustering) -> Result<ModelOutput> {
        let mut workloads = self.prepare_workloads(workloads)?;
        let n_bins = self.config.clustering.num_timesignal_bins;

        let mut selected = Vec::with_capacity(self.config.clustering.apply_to.len());
        for tag in self.config.clustering.apply_to.iter() {
            let workload = workloads
                .swap_remove(tag.as_str())
                .ok_or_else(|| WorkloadError::UnknownWorkload(tag.clone()))?;
            workload.check_jobs()?;
            selected.push(workload);
        }
        let window = selected
            .iter()
            .filter_map(|w| w.time_range())
            .reduce(|a, b| (f64::min(a.0, b.0), f64::max(a.1, b.1)))
            .unwrap_or((0., 0.));
        info!("Global time window of clustered workloads: [{}, {}]", window.0, window.1);

        let cluster_results = selected
            .iter()
            .map(|workload| cluster_workload(&mut *engine, workload, n_bins))
            .collect::<Result<Vec<ClusterResult>>>()?;

        let generated =
            SyntheticWorkloadGenerator::new(&self.config.generator, n_bins, window).generate(&cluster_results)?;
        let mut jobs = generated.jobs;
        jobs.sort_by(|a, b| a.time_start.total_cmp(&b.time_start));
        let apps = jobs
            .into_iter()
            .enumerate()
            .map(|(i, job)| SyntheticApp::new(&format!("appgen-{}", i), job))
            .collect();

        let mut workload = SyntheticWorkload::new(apps, n_bins, self.registry.clone());
        workload.set_tuning_factors(&self.config.generator.tuning_factors());
        let report = ModelReport::new(generated.reports, workload.relative_totals()?);
        info!(
            "Generated {} synthetic apps from {} source jobs",
            report.total_generated_jobs, report.total_source_jobs
        );
        Ok(ModelOutput { workload, report })
    }

    /// Applies the filling and splitting operations.
    fn prepare_workloads(&self, workloads: Vec<WorkloadData>) -> Result<IndexMap<String, WorkloadData>> {
        let mut by_tag = IndexMap::new();
        for workload in workloads.into_iter() {
            if by_tag.contains_key(&workload.tag) {
                return Err(WorkloadError::Config(format!("duplicate workload tag {}", workload.tag)));
            }
            by_tag.insert(workload.tag.clone(), workload);
        }
        apply_filling(&mut by_tag, &self.config.workload_filling)?;
        for split in self.config.workload_splitting.iter() {
            let source = by_tag
                .get(&split.apply_to)
                .ok_or_else(|| WorkloadError::UnknownWorkload(split.apply_to.clone()))?;
            let created = source.split_by_keywords(split)?;
            if by_tag.insert(created.tag.clone(), created).is_some() {
                warn!("Workload {} replaced by the result of splitting", split.create_workload);
            }
        }
        Ok(by_tag)
    }
}
