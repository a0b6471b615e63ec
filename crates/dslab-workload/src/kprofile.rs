//! Profiled job traces in the JSON profile format.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::ModelJob;
use crate::time_signal::{TimeSignal, MAX_PRIORITY};
use crate::workload::WorkloadData;

/// Priority of signals read from profiles.
pub const PROFILE_PRIORITY: u8 = MAX_PRIORITY;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KProfile {
    #[serde(default)]
    pub tag: Option<String>,
    pub profiled_jobs: Vec<ProfiledJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfiledJob {
    #[serde(default)]
    pub ncpus: Option<u32>,
    #[serde(default)]
    pub nnodes: Option<u32>,
    pub time_start: f64,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub time_end: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub queue_type: Option<String>,
    /// Traces keyed by metric name.
    #[serde(default)]
    pub time_series: BTreeMap<String, ProfiledSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfiledSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    #[serde(default)]
    pub durations: Option<Vec<f64>>,
}

impl KProfile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts the profile into a workload tagged with the profile tag or `default_tag`.
    pub fn into_workload(self, default_tag: &str) -> Result<WorkloadData> {
        let tag = self.tag.clone().unwrap_or_else(|| default_tag.to_string());
        let jobs = self
            .profiled_jobs
            .into_iter()
            .map(ProfiledJob::into_model_job)
            .collect::<Result<Vec<_>>>()?;
        debug!("Read {} profiled jobs into workload {}", jobs.len(), tag);
        Ok(WorkloadData::new(&tag, jobs))
    }
}

impl ProfiledJob {
    pub fn into_model_job(self) -> Result<ModelJob> {
        let duration = self.duration.or_else(|| self.time_end.map(|end| end - self.time_start));
        let mut job = ModelJob {
            time_start: self.time_start,
            duration,
            ncpus: self.ncpus,
            nnodes: self.nnodes,
            label: self.label,
            job_name: self.job_name,
            user: self.user,
            queue_type: self.queue_type,
            ..Default::default()
        };
        for (name, series) in self.time_series.into_iter() {
            job.set_signal(TimeSignal::from_values(
                &name,
                series.times,
                series.values,
                series.durations,
                Some(PROFILE_PRIORITY),
            )?);
        }
        Ok(job)
    }
}

impl WorkloadData {
    /// Reads a workload from a profile file, tagged with the profile tag or the file stem.
    pub fn from_kprofile(path: &Path) -> Result<WorkloadData> {
        let default_tag = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workload".to_string());
        KProfile::from_file(path)?.into_workload(&default_tag)
    }
}
