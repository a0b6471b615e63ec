//! Jobs as seen by the modeller.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkloadError};
use crate::signal::SignalKind;
use crate::time_signal::TimeSignal;

/// Per-metric signal slots of a job. Always holds an entry for every [`SignalKind`].
pub type SignalSet = BTreeMap<SignalKind, Option<TimeSignal>>;

/// Creates signal set with all slots empty.
pub fn empty_signal_set() -> SignalSet {
    SignalKind::ALL.iter().map(|kind| (*kind, None)).collect()
}

/// String attribute of a job usable for splitting and matching workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum JobAttribute {
    Label,
    JobName,
    User,
    QueueType,
}

impl FromStr for JobAttribute {
    type Err = WorkloadError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "label" => Ok(JobAttribute::Label),
            "job_name" => Ok(JobAttribute::JobName),
            "user" => Ok(JobAttribute::User),
            "queue_type" => Ok(JobAttribute::QueueType),
            _ => Err(WorkloadError::UnknownAttribute(s.to_string())),
        }
    }
}

impl TryFrom<String> for JobAttribute {
    type Error = WorkloadError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for JobAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobAttribute::Label => "label",
            JobAttribute::JobName => "job_name",
            JobAttribute::User => "user",
            JobAttribute::QueueType => "queue_type",
        };
        write!(f, "{}", name)
    }
}

/// A job: resource attributes plus one time signal per metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelJob {
    /// Start time (epoch seconds).
    pub time_start: f64,
    /// Run time in seconds, if known.
    pub duration: Option<f64>,
    pub ncpus: Option<u32>,
    pub nnodes: Option<u32>,
    /// Class or workload tag of the job.
    pub label: Option<String>,
    pub job_name: Option<String>,
    pub user: Option<String>,
    pub queue_type: Option<String>,
    pub timesignals: SignalSet,
}

impl Default for ModelJob {
    fn default() -> Self {
        Self {
            time_start: 0.,
            duration: None,
            ncpus: None,
            nnodes: None,
            label: None,
            job_name: None,
            user: None,
            queue_type: None,
            timesignals: empty_signal_set(),
        }
    }
}

impl ModelJob {
    pub fn new(time_start: f64, ncpus: Option<u32>, nnodes: Option<u32>) -> Self {
        Self {
            time_start,
            ncpus,
            nnodes,
            ..Default::default()
        }
    }

    /// Stores signal in the slot of its base metric, replacing the previous one.
    pub fn set_signal(&mut self, signal: TimeSignal) {
        self.timesignals.insert(signal.kind, Some(signal));
    }

    pub fn signal(&self, kind: SignalKind) -> Option<&TimeSignal> {
        self.timesignals.get(&kind).and_then(|s| s.as_ref())
    }

    pub fn signal_mut(&mut self, kind: SignalKind) -> Option<&mut TimeSignal> {
        self.timesignals.get_mut(&kind).and_then(|s| s.as_mut())
    }

    /// Sum of the metric over the job lifetime, zero when the signal is absent.
    pub fn signal_sum(&self, kind: SignalKind) -> f64 {
        self.signal(kind).map_or(0., |s| s.sum())
    }

    pub fn time_end(&self) -> Option<f64> {
        self.duration.map(|d| self.time_start + d)
    }

    pub fn attribute(&self, attribute: JobAttribute) -> Option<&str> {
        match attribute {
            JobAttribute::Label => self.label.as_deref(),
            JobAttribute::JobName => self.job_name.as_deref(),
            JobAttribute::User => self.user.as_deref(),
            JobAttribute::QueueType => self.queue_type.as_deref(),
        }
    }

    /// Short job description used in error messages.
    pub fn describe(&self, index: usize) -> String {
        match self.job_name.as_ref() {
            Some(name) => format!("#{} ({})", index, name),
            None => format!("#{}", index),
        }
    }

    /// Returns the first metric without a signal.
    pub fn first_missing_signal(&self) -> Option<SignalKind> {
        SignalKind::ALL.iter().copied().find(|kind| self.signal(*kind).is_none())
    }

    /// Checks that the job has a signal for every metric.
    pub fn check_job(&self, workload: &str, index: usize) -> Result<()> {
        match self.first_missing_signal() {
            Some(signal) => Err(WorkloadError::MissingSignal {
                workload: workload.to_string(),
                job: self.describe(index),
                signal,
            }),
            None => Ok(()),
        }
    }

    /// Takes signals from `other` where this job has none or where `other` has a strictly
    /// higher priority. A missing priority ranks below every explicit one.
    ///
    /// Returns the number of replaced slots.
    pub fn merge_signals(&mut self, other: &ModelJob) -> usize {
        let mut replaced = 0;
        for kind in SignalKind::ALL.iter() {
            let candidate = match other.signal(*kind) {
                Some(signal) => signal,
                None => continue,
            };
            let take = match self.signal(*kind) {
                None => true,
                Some(current) => candidate.priority > current.priority,
            };
            if take {
                self.timesignals.insert(*kind, Some(candidate.clone()));
                replaced += 1;
            }
        }
        replaced
    }
}
