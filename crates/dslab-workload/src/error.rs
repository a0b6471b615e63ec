//! Error type shared by all modelling stages.

use crate::signal::SignalKind;

/// Errors raised by the workload modelling pipeline.
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    #[error("signal {name}: {detail}")]
    SignalLength { name: String, detail: String },

    #[error("signal {name}: priority {priority} out of range [0, 10]")]
    InvalidPriority { name: String, priority: u8 },

    #[error("workload {workload}: job {job} has no {signal} signal")]
    MissingSignal {
        workload: String,
        job: String,
        signal: SignalKind,
    },

    #[error("unknown workload: {0}")]
    UnknownWorkload(String),

    #[error("unknown job attribute: {0}")]
    UnknownAttribute(String),

    #[error("clustering of workload {workload} failed: {detail}")]
    Clustering { workload: String, detail: String },

    #[error("tuning factors have not been set")]
    TuningFactorsNotSet,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, WorkloadError>;
