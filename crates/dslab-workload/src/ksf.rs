//! Synthetic workload document consumed by the benchmark executor.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::kernels::KernelFrame;
use crate::signal::SignalKind;

pub const KSF_TAG: &str = "KSF";
pub const KSF_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct KsfDocument {
    pub tag: String,
    pub version: u32,
    pub scaling_factors: BTreeMap<SignalKind, f64>,
    pub unscaled_metrics_sums: BTreeMap<SignalKind, f64>,
    pub synthetic_apps: Vec<KsfApp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KsfApp {
    pub num_procs: u32,
    pub num_nodes: u32,
    /// Seconds after the start of the first application.
    pub start_delay: f64,
    pub frames: Vec<Vec<KernelFrame>>,
    pub metadata: KsfMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct KsfMetadata {
    pub job_name: String,
    pub workload_name: String,
}

impl KsfDocument {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
