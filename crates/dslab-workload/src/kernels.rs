//! Export of job signals as synthetic application kernels.
//!
//! A kernel groups the metrics of one resource kind. Each bin of the digitized job signals becomes
//! one [`KernelFrame`] per kernel, bounded by the hard limits of the [`SignalRegistry`].

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Result, WorkloadError};
use crate::job::ModelJob;
use crate::signal::{SignalKind, SignalRegistry, ValueType};
use crate::time_signal::TimeSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    Cpu,
    Mpi,
    FileRead,
    FileWrite,
}

/// Exported metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KernelValue {
    Int(i64),
    Float(f64),
}

impl KernelValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            KernelValue::Int(v) => *v as f64,
            KernelValue::Float(v) => *v,
        }
    }
}

/// Parameters of one kernel for one time bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelFrame {
    pub name: &'static str,
    #[serde(flatten)]
    pub values: IndexMap<&'static str, KernelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmap: Option<bool>,
    /// All values of the bin were zero before clamping.
    #[serde(skip)]
    pub empty: bool,
}

impl KernelFrame {
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).map(|v| v.as_f64())
    }
}

impl KernelKind {
    /// Kernels in export order.
    pub const ALL: [KernelKind; 4] = [KernelKind::Cpu, KernelKind::Mpi, KernelKind::FileRead, KernelKind::FileWrite];

    pub fn name(&self) -> &'static str {
        match self {
            KernelKind::Cpu => "cpu",
            KernelKind::Mpi => "mpi",
            KernelKind::FileRead => "file-read",
            KernelKind::FileWrite => "file-write",
        }
    }

    /// Metrics of the kernel with their output keys, in output order.
    pub fn signals(&self) -> &'static [(SignalKind, &'static str)] {
        match self {
            KernelKind::Cpu => &[(SignalKind::Flops, "flops")],
            KernelKind::Mpi => &[
                (SignalKind::NCollective, "n_collective"),
                (SignalKind::KbCollective, "kb_collective"),
                (SignalKind::NPairwise, "n_pairwise"),
                (SignalKind::KbPairwise, "kb_pairwise"),
            ],
            KernelKind::FileRead => &[(SignalKind::KbRead, "kb_read"), (SignalKind::NRead, "n_read")],
            KernelKind::FileWrite => &[(SignalKind::KbWrite, "kb_write"), (SignalKind::NWrite, "n_write")],
        }
    }

    /// Returns true if the job has nothing to do in this kernel.
    pub fn is_empty(&self, job: &ModelJob) -> Result<bool> {
        for (kind, _) in self.signals().iter() {
            if required_signal(job, *kind)?.sum() != 0. {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Builds one frame per bin from the job signals digitized into `n_bins` bins and multiplied
    /// by the stretching factors (1.0 for missing metrics).
    pub fn synapp_config(
        &self,
        job: &ModelJob,
        n_bins: usize,
        stretching: Option<&BTreeMap<SignalKind, f64>>,
        registry: &SignalRegistry,
    ) -> Result<Vec<KernelFrame>> {
        let mut columns = Vec::with_capacity(self.signals().len());
        for (kind, _) in self.signals().iter() {
            let factor = stretching.and_then(|s| s.get(kind)).copied().unwrap_or(1.);
            let (_, values) = required_signal(job, *kind)?.digitized(Some(n_bins))?;
            columns.push(values.into_iter().map(|v| v * factor).collect::<Vec<_>>());
        }

        let mut frames = Vec::with_capacity(n_bins);
        for bin in 0..n_bins {
            let mut values: BTreeMap<SignalKind, f64> = self
                .signals()
                .iter()
                .zip(columns.iter())
                .map(|((kind, _), column)| (*kind, column[bin]))
                .collect();
            let empty = values.values().all(|v| *v == 0.);
            self.clamp(&mut values, registry);
            frames.push(KernelFrame {
                name: self.name(),
                values: self
                    .signals()
                    .iter()
                    .map(|(kind, key)| (*key, export_value(*kind, values[kind])))
                    .collect(),
                mmap: match self {
                    KernelKind::FileRead | KernelKind::FileWrite => Some(false),
                    _ => None,
                },
                empty,
            });
        }
        Ok(frames)
    }

    fn clamp(&self, values: &mut BTreeMap<SignalKind, f64>, registry: &SignalRegistry) {
        match self {
            KernelKind::Cpu => {
                if values[&SignalKind::Flops] > 0. {
                    bound(values, registry, SignalKind::Flops, 0.);
                }
            }
            KernelKind::Mpi => {
                for (count, volume) in [
                    (SignalKind::NCollective, SignalKind::KbCollective),
                    (SignalKind::NPairwise, SignalKind::KbPairwise),
                ] {
                    if values[&volume] >= 0. {
                        bound(values, registry, count, 1.);
                        cap(values, registry, volume);
                    }
                }
            }
            KernelKind::FileRead => {
                if values[&SignalKind::KbRead] > 0. {
                    bound(values, registry, SignalKind::NRead, 1.);
                    cap(values, registry, SignalKind::KbRead);
                }
            }
            KernelKind::FileWrite => {
                if values[&SignalKind::NWrite] > 0. {
                    bound(values, registry, SignalKind::KbWrite, 1.);
                    cap(values, registry, SignalKind::NWrite);
                }
                if values[&SignalKind::KbWrite] > 0. {
                    bound(values, registry, SignalKind::NWrite, 1.);
                    cap(values, registry, SignalKind::KbWrite);
                }
            }
        }
    }
}

/// Clamps the value into `[min, max_value]`.
fn bound(values: &mut BTreeMap<SignalKind, f64>, registry: &SignalRegistry, kind: SignalKind, min: f64) {
    if let Some(v) = values.get_mut(&kind) {
        *v = v.clamp(min, registry.max_value(kind));
    }
}

fn cap(values: &mut BTreeMap<SignalKind, f64>, registry: &SignalRegistry, kind: SignalKind) {
    if let Some(v) = values.get_mut(&kind) {
        *v = v.min(registry.max_value(kind));
    }
}

fn export_value(kind: SignalKind, value: f64) -> KernelValue {
    match kind.value_type() {
        ValueType::Int => KernelValue::Int(value.trunc() as i64),
        ValueType::Float => KernelValue::Float(value),
    }
}

fn required_signal(job: &ModelJob, kind: SignalKind) -> Result<&TimeSignal> {
    job.signal(kind).ok_or_else(|| WorkloadError::MissingSignal {
        workload: job.label.clone().unwrap_or_default(),
        job: job.job_name.clone().unwrap_or_else(|| format!("starting at {}", job.time_start)),
        signal: kind,
    })
}
